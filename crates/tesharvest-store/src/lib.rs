//! Tesharvest Store
//!
//! This crate provides the storage trait and the JSON file implementation for
//! harvested data points. The store is a single document of the form
//! `{"datapoints": [...]}` that is provisioned outside the harvester.
//!
//! The [`Store`] trait defines:
//! - Checking that the store has been provisioned
//! - Appending a batch of entries
//!
//! Appends are strictly additive. Nothing is deduplicated, so harvesting the
//! same task twice records it twice.

mod json;

pub use json::{DATAPOINTS_KEY, JsonFileStore};

use std::path::PathBuf;

use async_trait::async_trait;

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
  /// The store file does not exist. It is never created by the harvester.
  #[error("store file not found: {0}")]
  Missing(PathBuf),

  /// The store path exists but is not a regular file.
  #[error("store path is not a file: {0}")]
  NotAFile(PathBuf),

  /// The store document is not shaped like a data point store.
  #[error("malformed store {path}: {message}")]
  Malformed { path: PathBuf, message: String },

  /// An I/O error occurred.
  #[error("io error on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A blocking write task panicked or was cancelled.
  #[error("store write task failed: {0}")]
  Join(#[from] tokio::task::JoinError),
}

/// Counts reported by a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeReport {
  /// Entries in the store before the append.
  pub previous: usize,
  /// Entries added by this append.
  pub appended: usize,
}

impl MergeReport {
  pub fn total(&self) -> usize {
    self.previous + self.appended
  }
}

/// Storage trait for harvested data points.
#[async_trait]
pub trait Store: Send + Sync {
  /// Fail unless the store has been provisioned.
  async fn ensure_exists(&self) -> Result<(), Error>;

  /// Append `entries`, in order, after the existing data points.
  async fn append(&self, entries: Vec<serde_json::Value>) -> Result<MergeReport, Error>;
}
