//! Bounded retry policy for generator calls.

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout};
use tracing::warn;

use crate::error::{GenerationError, GenerationResult};

/// Maximum attempts plus an exponential backoff function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total calls per chunk, first attempt included. Default: 2.
    pub max_attempts: u32,

    /// Delay before the second attempt. Default: 1000.
    pub initial_backoff_ms: u64,

    /// Backoff growth per attempt. Default: 2.0.
    pub multiplier: f64,

    /// Backoff ceiling. Default: 8000.
    pub max_backoff_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            initial_backoff_ms: 1000,
            multiplier: 2.0,
            max_backoff_ms: 8000,
        }
    }
}

/// Outcome of running an operation under a [`RetryPolicy`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryOutcome<T> {
    pub result: GenerationResult<T>,

    /// Calls made
    pub attempts: u32,
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Default::default()
        }
    }

    /// Set max attempts.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the initial backoff.
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff_ms = backoff.as_millis() as u64;
        self
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16) as i32;
        let millis = self.initial_backoff_ms as f64 * self.multiplier.max(1.0).powi(exponent);
        Duration::from_millis((millis as u64).min(self.max_backoff_ms))
    }

    /// Run `operation` until it succeeds, fails permanently or runs out of
    /// attempts. Each call is bounded by `call_timeout`.
    ///
    /// Only [`GenerationError::is_retryable`] errors are retried; a quota
    /// error returns immediately.
    pub async fn run<T, F, Fut>(&self, call_timeout: Duration, mut operation: F) -> RetryOutcome<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = GenerationResult<T>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let result = match timeout(call_timeout, operation(attempt)).await {
                Ok(result) => result,
                Err(_) => Err(GenerationError::Timeout(call_timeout)),
            };

            match result {
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        error = %e,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Generator call failed, retrying..."
                    );
                    sleep(delay).await;
                }
                result => {
                    return RetryOutcome {
                        result,
                        attempts: attempt,
                    }
                }
            }
        }
    }
}
