//! Tesharvest Client
//!
//! Thin async client over the GA4GH Task Execution Service API. It knows how
//! to page through the task listing keeping only COMPLETE tasks, and how to
//! fetch the FULL view of a single task.
//!
//! All requests go through [`send_with_retry`], which applies the configured
//! per-request timeout and retry-then-fail policy.

mod client;
mod error;
mod fetch;
mod list;
mod retry;
mod types;

pub use client::TesClient;
pub use error::{ClientError, ListingError};
pub use fetch::FetchOutcome;
pub use retry::send_with_retry;
pub use types::{
  BackendParameters, ExecutorLog, ListTasksResponse, Resources, TaskInput, TaskLog, TaskRecord,
  TaskState, TaskSummary,
};
