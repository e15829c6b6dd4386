use reqwest::{RequestBuilder, Response, StatusCode};
use tesharvest_config::RetryPolicy;
use tracing::warn;

/// Send a request, retrying transient failures according to `policy`.
///
/// `build` is called once per attempt since a [`RequestBuilder`] is consumed
/// by sending. Transport errors, timeouts, `429` and `5xx` responses are
/// retried; once retries are exhausted the last response or error is returned
/// unchanged so callers can inspect the status and body themselves.
pub async fn send_with_retry<F>(policy: &RetryPolicy, build: F) -> Result<Response, reqwest::Error>
where
  F: Fn() -> RequestBuilder,
{
  let mut attempt = 0;
  loop {
    let result = build().send().await;

    let retryable = match &result {
      Ok(response) => is_retryable_status(response.status()),
      Err(e) => e.is_timeout() || e.is_connect() || e.is_request(),
    };

    if !retryable || attempt >= policy.max_retries {
      return result;
    }

    let delay = policy.delay_for(attempt);
    match &result {
      Ok(response) => warn!(
        status = response.status().as_u16(),
        url = %response.url(),
        attempt = attempt + 1,
        delay_ms = delay.as_millis() as u64,
        "retrying request after transient status"
      ),
      Err(e) => warn!(
        error = %e,
        attempt = attempt + 1,
        delay_ms = delay.as_millis() as u64,
        "retrying request after transport error"
      ),
    }

    tokio::time::sleep(delay).await;
    attempt += 1;
  }
}

fn is_retryable_status(status: StatusCode) -> bool {
  status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}
