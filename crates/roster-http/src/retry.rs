//! Bounded exponential backoff for transient HTTP failures.

use std::{future::Future, time::Duration};

use serde::Deserialize;
use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
  /// Total attempts, the first one included.
  pub max_attempts:       u32,
  pub initial_backoff_ms: u64,
  pub max_backoff_ms:     u64,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self {
      max_attempts:       3,
      initial_backoff_ms: 500,
      max_backoff_ms:     30_000,
    }
  }
}

impl RetryPolicy {
  /// No retries at all.
  pub fn none() -> Self {
    Self {
      max_attempts: 1,
      ..Self::default()
    }
  }

  /// Delay after the given (1-based) failed attempt:
  /// `min(initial * 2^(attempt - 1), max)`.
  pub fn delay_for(&self, attempt: u32) -> Duration {
    let factor = 2u64.saturating_pow(attempt.saturating_sub(1));
    Duration::from_millis(
      self
        .initial_backoff_ms
        .saturating_mul(factor)
        .min(self.max_backoff_ms),
    )
  }

  /// Run `f` until it succeeds, fails with a non-retryable error, or the
  /// attempts run out. `f` receives the 1-based attempt number.
  pub async fn execute<T, F, Fut>(&self, mut f: F) -> Result<T>
  where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
  {
    let mut attempt = 1;
    loop {
      match f(attempt).await {
        Err(error) if attempt < self.max_attempts && error.is_retryable() => {
          let delay = self.delay_for(attempt);
          debug!(
            attempt,
            max_attempts = self.max_attempts,
            delay_ms = delay.as_millis() as u64,
            %error,
            "transient failure, backing off"
          );
          tokio::time::sleep(delay).await;
          attempt += 1;
        }
        result => return result,
      }
    }
  }
}
