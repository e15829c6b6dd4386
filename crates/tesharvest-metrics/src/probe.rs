use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_LENGTH, HeaderMap};
use tesharvest_client::send_with_retry;
use tesharvest_config::{HarvestConfig, RetryPolicy};
use tracing::{debug, warn};

/// Resolves the byte size of a task input from its URL.
///
/// Probing never fails: sizes that cannot be determined are reported as `0`.
#[async_trait]
pub trait SizeProbe: Send + Sync {
  async fn probe_size(&self, url: &str) -> u64;
}

/// Probe that issues an unauthenticated `HEAD` request and reads `Content-Length`.
#[derive(Debug, Clone)]
pub struct HttpSizeProbe {
  http: Client,
  retry: RetryPolicy,
}

impl HttpSizeProbe {
  pub fn new(config: &HarvestConfig) -> Result<Self, reqwest::Error> {
    let http = Client::builder()
      .timeout(config.request_timeout)
      .build()?;
    Ok(Self {
      http,
      retry: config.retry.clone(),
    })
  }

  pub fn with_http_client(http: Client, retry: RetryPolicy) -> Self {
    Self { http, retry }
  }
}

#[async_trait]
impl SizeProbe for HttpSizeProbe {
  async fn probe_size(&self, url: &str) -> u64 {
    let response = match send_with_retry(&self.retry, || self.http.head(url)).await {
      Ok(response) => response,
      Err(e) => {
        warn!(url, error = %e, "input size probe failed, recording 0");
        return 0;
      }
    };

    if !response.status().is_success() {
      warn!(
        url,
        status = response.status().as_u16(),
        "input size probe returned non-success status, recording 0"
      );
      return 0;
    }

    // Read the header directly; reqwest's own content_length() reports the
    // (empty) body size for HEAD responses.
    match content_length(response.headers()) {
      Some(size) => {
        debug!(url, size, "probed input size");
        size
      }
      None => {
        warn!(url, "input has no usable content-length, recording 0");
        0
      }
    }
  }
}

/// Parse the `Content-Length` header, if present and a valid unsigned integer.
pub fn content_length(headers: &HeaderMap) -> Option<u64> {
  headers
    .get(CONTENT_LENGTH)?
    .to_str()
    .ok()?
    .trim()
    .parse()
    .ok()
}
