use std::fmt;

use futures::StreamExt;
use tesharvest_client::{TaskInput, TaskRecord};
use tesharvest_config::HarvestConfig;
use tracing::{debug, instrument, warn};

use crate::datapoint::{APP_NAME, AppInputs, DataPoint, DataPointTags, NODE_COUNT};
use crate::error::ExtractError;
use crate::probe::SizeProbe;
use crate::timing::exec_time_seconds;

/// SKU recorded when the task does not name a VM size.
const UNKNOWN_SKU: &str = "unknown";

/// Why a COMPLETE task produced no data point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
  /// The task declares no inputs.
  NoInputs,
  /// The task's resources carry no backend parameters.
  NoBackendParameters,
}

impl fmt::Display for SkipReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      SkipReason::NoInputs => f.write_str("task has no inputs"),
      SkipReason::NoBackendParameters => f.write_str("task has no backend parameters"),
    }
  }
}

/// Successful extraction outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
  Extracted(DataPoint),
  Skipped(SkipReason),
}

/// Builds [`DataPoint`]s from COMPLETE task records.
pub struct MetricsExtractor<P: SizeProbe> {
  probe: P,
  deployment: String,
  probe_concurrency: usize,
}

impl<P: SizeProbe> MetricsExtractor<P> {
  pub fn new(probe: P, config: &HarvestConfig) -> Self {
    Self {
      probe,
      deployment: config.deployment.clone(),
      probe_concurrency: config.probe_concurrency,
    }
  }

  /// Extract a data point from `record`.
  ///
  /// Tasks without inputs or without backend parameters are skipped before
  /// anything else is looked at, including the remote size probes.
  #[instrument(name = "extract_metrics", skip(self, record), fields(task_id = %record.id))]
  pub async fn extract(&self, record: &TaskRecord) -> Result<Extraction, ExtractError> {
    if record.inputs.is_empty() {
      return Ok(Extraction::Skipped(SkipReason::NoInputs));
    }
    let Some(backend) = record.backend_parameters() else {
      return Ok(Extraction::Skipped(SkipReason::NoBackendParameters));
    };

    let total_cores = record
      .resources
      .as_ref()
      .and_then(|r| r.cpu_cores)
      .ok_or_else(|| ExtractError::MissingField {
        task_id: record.id.clone(),
        field: "resources.cpu_cores",
      })?;

    let sku = match backend.vm_size.as_deref().map(str::trim) {
      Some(vm_size) if !vm_size.is_empty() => vm_size.to_string(),
      _ => {
        warn!("backend parameters have no vm_size, recording sku as unknown");
        UNKNOWN_SKU.to_string()
      }
    };

    let exec_time = self.exec_time(record)?;
    let sequence_sizes = self.input_sizes(&record.inputs).await;

    debug!(
      total_cores,
      sku = %sku,
      exec_time,
      inputs = sequence_sizes.len(),
      "extracted data point"
    );

    Ok(Extraction::Extracted(DataPoint {
      deployment: self.deployment.clone(),
      appname: APP_NAME.to_string(),
      total_cores,
      sku,
      nnodes: NODE_COUNT,
      appinputs: AppInputs {
        num_sequences: record.inputs.len(),
        sequence_sizes,
      },
      exec_time,
      tags: DataPointTags {
        tes_experiment_id: record.id.clone(),
      },
    }))
  }

  /// Run time of the first executor in the first log group.
  fn exec_time(&self, record: &TaskRecord) -> Result<f64, ExtractError> {
    let missing = |field: &'static str| ExtractError::MissingField {
      task_id: record.id.clone(),
      field,
    };

    let log = record.first_executor_log().ok_or_else(|| missing("logs[0].logs[0]"))?;
    let start = log
      .start_time
      .as_deref()
      .ok_or_else(|| missing("logs[0].logs[0].start_time"))?;
    let end = log
      .end_time
      .as_deref()
      .ok_or_else(|| missing("logs[0].logs[0].end_time"))?;

    let seconds = exec_time_seconds(start, end)?;
    if seconds <= 0.0 {
      return Err(ExtractError::NonPositiveDuration {
        task_id: record.id.clone(),
        seconds,
      });
    }
    Ok(seconds)
  }

  /// Sizes of all inputs, in declaration order.
  async fn input_sizes(&self, inputs: &[TaskInput]) -> Vec<u64> {
    futures::stream::iter(inputs)
      .map(|input| self.input_size(input))
      .buffered(self.probe_concurrency)
      .collect()
      .await
  }

  async fn input_size(&self, input: &TaskInput) -> u64 {
    match (input.url.as_deref(), input.content.as_deref()) {
      (Some(url), _) if !url.is_empty() => self.probe.probe_size(url).await,
      (_, Some(content)) => content.len() as u64,
      _ => {
        warn!(
          input = input.name.as_deref().unwrap_or("<unnamed>"),
          "input has neither url nor content, recording 0"
        );
        0
      }
    }
  }
}
