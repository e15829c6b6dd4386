use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How the delay between retry attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryBackoff {
  Constant,
  Linear,
  Exponential,
}

/// Retry-then-fail policy applied to every remote request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
  /// Retries after the first attempt. Zero disables retrying.
  pub max_retries: u32,
  pub backoff: RetryBackoff,
  /// Delay before the first retry.
  pub base_delay: Duration,
}

impl RetryPolicy {
  /// Upper bound on any single computed delay.
  const MAX_DELAY: Duration = Duration::from_secs(30);

  /// A policy that never retries.
  pub fn none() -> Self {
    Self {
      max_retries: 0,
      backoff: RetryBackoff::Constant,
      base_delay: Duration::ZERO,
    }
  }

  /// Delay to wait before retry number `attempt` (zero-based).
  pub fn delay_for(&self, attempt: u32) -> Duration {
    let delay = match self.backoff {
      RetryBackoff::Constant => self.base_delay,
      RetryBackoff::Linear => self.base_delay.saturating_mul(attempt.saturating_add(1)),
      RetryBackoff::Exponential => {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
      }
    };
    delay.min(Self::MAX_DELAY)
  }
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_retries: 3,
      backoff: RetryBackoff::Exponential,
      base_delay: Duration::from_millis(500),
    }
  }
}
