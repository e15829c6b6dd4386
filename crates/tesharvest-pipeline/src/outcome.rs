use std::fmt;

use serde::Serialize;
use tesharvest_client::TaskState;
use tesharvest_metrics::{DataPoint, SkipReason};

use crate::error::TaskError;

/// How one task id was resolved.
#[derive(Debug)]
pub enum TaskOutcome {
  Harvested(Box<DataPoint>),
  NotReady(TaskState),
  Skipped(SkipReason),
  Failed(TaskError),
}

/// Counts reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HarvestSummary {
  /// Task ids considered: the listing size in "all" mode, 1 otherwise.
  pub listed: usize,
  pub harvested: usize,
  pub not_ready: usize,
  pub skipped: usize,
  pub failed: usize,
  /// Data points written to the store by this run.
  pub appended: usize,
  /// Data points in the store after this run.
  pub store_total: usize,
}

impl HarvestSummary {
  pub(crate) fn record(&mut self, outcome: &TaskOutcome) {
    match outcome {
      TaskOutcome::Harvested(_) => self.harvested += 1,
      TaskOutcome::NotReady(_) => self.not_ready += 1,
      TaskOutcome::Skipped(_) => self.skipped += 1,
      TaskOutcome::Failed(_) => self.failed += 1,
    }
  }
}

impl fmt::Display for HarvestSummary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} task(s): {} harvested, {} not ready, {} skipped, {} failed; {} appended ({} in store)",
      self.listed,
      self.harvested,
      self.not_ready,
      self.skipped,
      self.failed,
      self.appended,
      self.store_total
    )
  }
}
