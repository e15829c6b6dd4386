//! Error types for harvest runs.

use tesharvest_client::{ClientError, ListingError};
use tesharvest_metrics::ExtractError;
use thiserror::Error;

/// Errors that abort a whole harvest run.
#[derive(Debug, Error)]
pub enum PipelineError {
  /// The HTTP client could not be constructed.
  #[error("failed to create TES client: {0}")]
  Client(#[source] ClientError),

  /// The task listing failed. Nothing is written.
  #[error(transparent)]
  Listing(#[from] ListingError),

  /// The store is missing, malformed, or could not be written.
  #[error("store error: {0}")]
  Store(#[from] tesharvest_store::Error),

  /// A data point could not be serialized for the store.
  #[error("failed to serialize data point: {0}")]
  Serialize(#[from] serde_json::Error),

  /// The run was cancelled before the store write.
  #[error("harvest cancelled")]
  Cancelled,
}

/// Why a single task produced no data point. Recoverable.
#[derive(Debug, Error)]
pub enum TaskError {
  #[error("fetch failed: {0}")]
  Fetch(#[from] ClientError),

  #[error("extraction failed: {0}")]
  Extract(#[from] ExtractError),
}

/// The harvest target was blank.
#[derive(Debug, Error)]
#[error("harvest target must be a task id or \"all\"")]
pub struct InvalidTarget;
