use thiserror::Error;

/// A COMPLETE task whose data cannot be turned into a data point.
#[derive(Debug, Error)]
pub enum ExtractError {
  /// A field the data point needs is absent.
  #[error("task '{task_id}' is missing {field}")]
  MissingField {
    task_id: String,
    field: &'static str,
  },

  /// A log timestamp did not parse.
  #[error("invalid timestamp '{value}': {message}")]
  InvalidTimestamp { value: String, message: String },

  /// `end_time` is not after `start_time`.
  #[error("task '{task_id}' has non-positive execution time {seconds}s")]
  NonPositiveDuration { task_id: String, seconds: f64 },
}
