use thiserror::Error;

/// Errors talking to the TES.
#[derive(Debug, Error)]
pub enum ClientError {
  /// Transport failure, timeout, or a body that could not be read.
  #[error("http error: {0}")]
  Http(#[from] reqwest::Error),

  /// The TES answered with a non-success status.
  #[error("unexpected status {status}: {body}")]
  Status { status: u16, body: String },

  /// The response body was not the JSON we expected.
  #[error("malformed response from {url}: {source}")]
  Decode {
    url: String,
    #[source]
    source: serde_json::Error,
  },

  /// The base URL cannot carry a task id path segment.
  #[error("cannot append task id '{task_id}' to {base_url}")]
  InvalidTaskId { task_id: String, base_url: String },

  /// The listing kept returning continuation tokens past the page limit.
  #[error("task listing exceeded {max_pages} pages")]
  TooManyPages { max_pages: usize },
}

/// A listing that stopped early.
///
/// Carries the COMPLETE ids collected from the pages that did succeed so
/// callers can decide whether a partial listing is useful.
#[derive(Debug, Error)]
#[error("task listing failed after {pages} page(s): {source}")]
pub struct ListingError {
  pub partial_ids: Vec<String>,
  pub pages: usize,
  #[source]
  pub source: ClientError,
}
