use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::error::ConfigError;
use crate::retry::RetryPolicy;

/// Deployment label used when the caller does not provide one.
pub const DEFAULT_DEPLOYMENT: &str = "unknown";

/// Basic-auth credentials for the TES.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
  pub username: String,
  pub password: String,
}

impl Credentials {
  pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
    Self {
      username: username.into(),
      password: password.into(),
    }
  }
}

impl fmt::Debug for Credentials {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Credentials")
      .field("username", &self.username)
      .field("password", &"<redacted>")
      .finish()
  }
}

/// Everything a harvest run needs, resolved up front.
#[derive(Debug, Clone)]
pub struct HarvestConfig {
  /// TES tasks endpoint. Always ends with `/` so task ids can be joined onto it.
  pub base_url: Url,
  pub credentials: Credentials,
  /// Label written into every data point's `deployment` field.
  pub deployment: String,
  /// Existing JSON store that data points are appended to.
  pub store_path: PathBuf,
  /// Per-request timeout for every remote call.
  pub request_timeout: Duration,
  pub retry: RetryPolicy,
  /// Tasks processed concurrently in "all" mode.
  pub task_concurrency: usize,
  /// Input size probes in flight per task.
  pub probe_concurrency: usize,
  /// Upper bound on listing pages followed in a single run.
  pub max_pages: usize,
}

impl HarvestConfig {
  pub const DEFAULT_TASK_CONCURRENCY: usize = 8;
  pub const DEFAULT_PROBE_CONCURRENCY: usize = 4;
  pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
  pub const DEFAULT_MAX_PAGES: usize = 10_000;

  /// Build a config with default tuning.
  ///
  /// Fails if any required value is empty or the base URL is not an http(s) URL.
  pub fn new(
    base_url: &str,
    credentials: Credentials,
    store_path: impl Into<PathBuf>,
  ) -> Result<Self, ConfigError> {
    let base_url = parse_base_url(base_url)?;

    if credentials.username.is_empty() {
      return Err(ConfigError::Missing { field: "tes_user" });
    }
    if credentials.password.is_empty() {
      return Err(ConfigError::Missing {
        field: "tes_password",
      });
    }

    let store_path = store_path.into();
    if store_path.as_os_str().is_empty() {
      return Err(ConfigError::Missing {
        field: "store_path",
      });
    }

    Ok(Self {
      base_url,
      credentials,
      deployment: DEFAULT_DEPLOYMENT.to_string(),
      store_path,
      request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
      retry: RetryPolicy::default(),
      task_concurrency: Self::DEFAULT_TASK_CONCURRENCY,
      probe_concurrency: Self::DEFAULT_PROBE_CONCURRENCY,
      max_pages: Self::DEFAULT_MAX_PAGES,
    })
  }

  /// Set the deployment label. Blank labels fall back to [`DEFAULT_DEPLOYMENT`].
  pub fn with_deployment(mut self, deployment: Option<String>) -> Self {
    self.deployment = deployment
      .map(|d| d.trim().to_string())
      .filter(|d| !d.is_empty())
      .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string());
    self
  }

  pub fn with_request_timeout(mut self, timeout: Duration) -> Result<Self, ConfigError> {
    if timeout.is_zero() {
      return Err(ConfigError::InvalidValue {
        field: "request_timeout",
        message: "must be greater than zero".to_string(),
      });
    }
    self.request_timeout = timeout;
    Ok(self)
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn with_task_concurrency(mut self, n: usize) -> Result<Self, ConfigError> {
    self.task_concurrency = non_zero("task_concurrency", n)?;
    Ok(self)
  }

  pub fn with_probe_concurrency(mut self, n: usize) -> Result<Self, ConfigError> {
    self.probe_concurrency = non_zero("probe_concurrency", n)?;
    Ok(self)
  }

  pub fn with_max_pages(mut self, n: usize) -> Result<Self, ConfigError> {
    self.max_pages = non_zero("max_pages", n)?;
    Ok(self)
  }
}

fn non_zero(field: &'static str, n: usize) -> Result<usize, ConfigError> {
  if n == 0 {
    return Err(ConfigError::InvalidValue {
      field,
      message: "must be at least 1".to_string(),
    });
  }
  Ok(n)
}

/// Parse the TES base URL, appending a trailing `/` when missing.
fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
  let raw = raw.trim();
  if raw.is_empty() {
    return Err(ConfigError::Missing { field: "tes_url" });
  }

  let mut url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
    url: raw.to_string(),
    source,
  })?;

  match url.scheme() {
    "http" | "https" => {}
    other => {
      return Err(ConfigError::UnsupportedScheme {
        scheme: other.to_string(),
      });
    }
  }

  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  url.set_query(None);
  url.set_fragment(None);

  Ok(url)
}
