//! Harvest pipeline implementation.

use futures::StreamExt;
use tesharvest_client::{ClientError, FetchOutcome, TesClient};
use tesharvest_config::HarvestConfig;
use tesharvest_metrics::{Extraction, HttpSizeProbe, MetricsExtractor, SizeProbe};
use tesharvest_store::{JsonFileStore, Store};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::PipelineError;
use crate::events::{HarvestEvent, HarvestNotifier, NoopNotifier};
use crate::mode::HarvestMode;
use crate::outcome::{HarvestSummary, TaskOutcome};

/// The harvest pipeline.
///
/// Generic over the size probe, the store and the notifier so each seam can be
/// swapped. [`HarvestPipeline::new`] wires the HTTP probe, the JSON file store
/// and no-op notifications from a [`HarvestConfig`].
pub struct HarvestPipeline<
  P: SizeProbe = HttpSizeProbe,
  S: Store = JsonFileStore,
  N: HarvestNotifier = NoopNotifier,
> {
  client: TesClient,
  extractor: MetricsExtractor<P>,
  store: S,
  notifier: N,
  task_concurrency: usize,
}

impl HarvestPipeline {
  /// Create a pipeline talking to the configured TES and store.
  pub fn new(config: &HarvestConfig) -> Result<Self, PipelineError> {
    let client = TesClient::new(config).map_err(PipelineError::Client)?;
    let probe =
      HttpSizeProbe::new(config).map_err(|e| PipelineError::Client(ClientError::Http(e)))?;
    let store = JsonFileStore::new(&config.store_path);

    Ok(Self::from_parts(config, client, probe, store, NoopNotifier))
  }
}

impl<P: SizeProbe, S: Store, N: HarvestNotifier> HarvestPipeline<P, S, N> {
  /// Assemble a pipeline from explicit parts.
  pub fn from_parts(
    config: &HarvestConfig,
    client: TesClient,
    probe: P,
    store: S,
    notifier: N,
  ) -> Self {
    Self {
      client,
      extractor: MetricsExtractor::new(probe, config),
      store,
      notifier,
      task_concurrency: config.task_concurrency,
    }
  }

  /// Replace the notifier.
  pub fn with_notifier<M: HarvestNotifier>(self, notifier: M) -> HarvestPipeline<P, S, M> {
    HarvestPipeline {
      client: self.client,
      extractor: self.extractor,
      store: self.store,
      notifier,
      task_concurrency: self.task_concurrency,
    }
  }

  /// Run one harvest.
  ///
  /// Data points are appended to the store once, in task order, after every
  /// task has been resolved. The store is checked before any remote call so a
  /// missing store fails fast.
  #[instrument(name = "harvest", skip(self, mode, cancel), fields(mode = %mode))]
  pub async fn run(
    &self,
    mode: HarvestMode,
    cancel: CancellationToken,
  ) -> Result<HarvestSummary, PipelineError> {
    self.store.ensure_exists().await?;

    let task_ids = match mode {
      HarvestMode::All => {
        let ids = tokio::select! {
          listed = self.client.list_complete_task_ids() => listed?,
          _ = cancel.cancelled() => {
            warn!("harvest cancelled during task listing");
            return Err(PipelineError::Cancelled);
          }
        };
        self.notifier.notify(HarvestEvent::TasksListed { count: ids.len() });
        ids
      }
      HarvestMode::Single(task_id) => vec![task_id],
    };

    info!(tasks = task_ids.len(), "harvesting tasks");

    let outcomes = tokio::select! {
      outcomes = self.harvest_tasks(&task_ids) => outcomes,
      _ = cancel.cancelled() => {
        warn!("harvest cancelled during task processing");
        return Err(PipelineError::Cancelled);
      }
    };

    let mut summary = HarvestSummary {
      listed: task_ids.len(),
      ..HarvestSummary::default()
    };
    let mut entries = Vec::new();
    for outcome in outcomes {
      summary.record(&outcome);
      if let TaskOutcome::Harvested(point) = outcome {
        entries.push(serde_json::to_value(&*point)?);
      }
    }

    if cancel.is_cancelled() {
      warn!("harvest cancelled before store write");
      return Err(PipelineError::Cancelled);
    }

    let report = self.store.append(entries).await?;
    summary.appended = report.appended;
    summary.store_total = report.total();
    self.notifier.notify(HarvestEvent::StoreUpdated {
      appended: report.appended,
      total: report.total(),
    });

    info!(
      listed = summary.listed,
      harvested = summary.harvested,
      not_ready = summary.not_ready,
      skipped = summary.skipped,
      failed = summary.failed,
      appended = summary.appended,
      "harvest completed"
    );

    Ok(summary)
  }

  /// Resolve every id with bounded concurrency. Outcomes keep the order of `task_ids`.
  async fn harvest_tasks(&self, task_ids: &[String]) -> Vec<TaskOutcome> {
    futures::stream::iter(task_ids)
      .map(|task_id| self.harvest_task(task_id))
      .buffered(self.task_concurrency)
      .collect()
      .await
  }

  /// Fetch and extract a single task. Never fails; problems become outcomes.
  pub async fn harvest_task(&self, task_id: &str) -> TaskOutcome {
    let outcome = match self.client.fetch_task(task_id).await {
      Ok(FetchOutcome::Complete(record)) => match self.extractor.extract(&record).await {
        Ok(Extraction::Extracted(point)) => TaskOutcome::Harvested(Box::new(point)),
        Ok(Extraction::Skipped(reason)) => TaskOutcome::Skipped(reason),
        Err(e) => TaskOutcome::Failed(e.into()),
      },
      Ok(FetchOutcome::NotReady(state)) => TaskOutcome::NotReady(state),
      Err(e) => TaskOutcome::Failed(e.into()),
    };

    self.report(task_id, &outcome);
    outcome
  }

  fn report(&self, task_id: &str, outcome: &TaskOutcome) {
    let event = match outcome {
      TaskOutcome::Harvested(point) => {
        info!(
          task_id = %task_id,
          sku = %point.sku,
          exec_time = point.exec_time,
          "task_harvested"
        );
        HarvestEvent::TaskHarvested {
          task_id: task_id.to_string(),
        }
      }
      TaskOutcome::NotReady(state) => {
        info!(task_id = %task_id, state = %state, "task_not_ready");
        HarvestEvent::TaskNotReady {
          task_id: task_id.to_string(),
          state: state.to_string(),
        }
      }
      TaskOutcome::Skipped(reason) => {
        info!(task_id = %task_id, reason = %reason, "task_skipped");
        HarvestEvent::TaskSkipped {
          task_id: task_id.to_string(),
          reason: reason.to_string(),
        }
      }
      TaskOutcome::Failed(e) => {
        error!(task_id = %task_id, error = %e, "task_failed");
        HarvestEvent::TaskFailed {
          task_id: task_id.to_string(),
          error: e.to_string(),
        }
      }
    };
    self.notifier.notify(event);
  }
}
