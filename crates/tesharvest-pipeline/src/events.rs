//! Harvest events and notifiers for observability.
//!
//! Events are emitted as each task is resolved and when the store is written,
//! so callers can stream progress or collect per-task results.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Events emitted during a harvest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HarvestEvent {
  /// The listing finished with this many COMPLETE task ids.
  TasksListed { count: usize },

  /// A data point was produced for the task.
  TaskHarvested { task_id: String },

  /// The task is not COMPLETE yet.
  TaskNotReady { task_id: String, state: String },

  /// The task is COMPLETE but has nothing worth recording.
  TaskSkipped { task_id: String, reason: String },

  /// Fetching or extracting the task failed.
  TaskFailed { task_id: String, error: String },

  /// The batch was appended to the store.
  StoreUpdated { appended: usize, total: usize },
}

/// Trait for receiving harvest events.
///
/// The pipeline calls `notify` for each event; implementations decide what to
/// do with them.
pub trait HarvestNotifier: Send + Sync {
  fn notify(&self, event: HarvestEvent);
}

/// A notifier that discards all events.
#[derive(Debug, Clone, Default)]
pub struct NoopNotifier;

impl HarvestNotifier for NoopNotifier {
  fn notify(&self, _event: HarvestEvent) {}
}

/// A notifier that forwards events to an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
  // Unbounded so a slow consumer never stalls task fan-out; volume is one
  // event per task.
  sender: mpsc::UnboundedSender<HarvestEvent>,
}

impl ChannelNotifier {
  pub fn new(sender: mpsc::UnboundedSender<HarvestEvent>) -> Self {
    Self { sender }
  }
}

impl HarvestNotifier for ChannelNotifier {
  fn notify(&self, event: HarvestEvent) {
    // Receiver may have been dropped.
    let _ = self.sender.send(event);
  }
}
