use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tesharvest_config::{Credentials, HarvestConfig, RetryPolicy};
use url::Url;

use crate::error::ClientError;
use crate::retry::send_with_retry;

/// Client for a single TES tasks endpoint.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct TesClient {
  http: Client,
  base_url: Url,
  credentials: Credentials,
  retry: RetryPolicy,
  max_pages: usize,
}

impl TesClient {
  /// Create a client from the harvest configuration.
  pub fn new(config: &HarvestConfig) -> Result<Self, ClientError> {
    let http = Client::builder()
      .timeout(config.request_timeout)
      .build()?;

    Ok(Self::with_http_client(http, config))
  }

  /// Create a client around an existing [`reqwest::Client`].
  pub fn with_http_client(http: Client, config: &HarvestConfig) -> Self {
    Self {
      http,
      base_url: config.base_url.clone(),
      credentials: config.credentials.clone(),
      retry: config.retry.clone(),
      max_pages: config.max_pages,
    }
  }

  pub fn base_url(&self) -> &Url {
    &self.base_url
  }

  pub(crate) fn max_pages(&self) -> usize {
    self.max_pages
  }

  /// URL of the detail endpoint for `task_id`.
  ///
  /// The id is appended as a single path segment, so characters such as `/`,
  /// `?` or `#` are percent-encoded rather than changing the target.
  pub(crate) fn task_url(&self, task_id: &str) -> Result<Url, ClientError> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|()| ClientError::InvalidTaskId {
        task_id: task_id.to_string(),
        base_url: self.base_url.to_string(),
      })?
      .pop_if_empty()
      .push(task_id);
    Ok(url)
  }

  /// Authenticated GET with the retry policy applied.
  pub(crate) async fn get(
    &self,
    url: &Url,
    query: &[(&str, &str)],
  ) -> Result<Response, ClientError> {
    let build = || -> RequestBuilder {
      self
        .http
        .get(url.clone())
        .query(query)
        .basic_auth(&self.credentials.username, Some(&self.credentials.password))
    };

    let response = send_with_retry(&self.retry, build).await?;
    Ok(response)
  }

  /// Read a successful response body as JSON, turning anything else into an error.
  pub(crate) async fn read_json<T: DeserializeOwned>(
    &self,
    response: Response,
  ) -> Result<T, ClientError> {
    let status = response.status();
    let url = response.url().to_string();
    let body = response.text().await?;

    if !status.is_success() {
      return Err(ClientError::Status {
        status: status.as_u16(),
        body,
      });
    }

    serde_json::from_str(&body).map_err(|source| ClientError::Decode { url, source })
  }
}
