//! Bounded retry with linear backoff and cooperative cancellation.
//!
//! Every generative call (text, image, speech) goes through
//! [`retry_generation`]; modalities differ only in how the payload is decoded
//! afterwards.

use std::future::Future;
use std::time::Duration;

use storyreel_client::ClientResult;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::GenerationError;
use crate::metrics;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first dispatch.
    pub max_attempts: u32,
    /// Backoff unit; the wait after attempt `n` is `n * base_delay`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of attempts (at least one).
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Set the backoff unit.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay after a failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

/// Run `op` until it succeeds, attempts run out, or `token` is cancelled.
///
/// Cancellation is checked before every dispatch and raced against every
/// backoff sleep. An in-flight dispatch is not interrupted.
pub async fn retry_generation<F, Fut, T>(
    policy: &RetryPolicy,
    token: &CancellationToken,
    operation: &str,
    mut op: F,
) -> Result<T, GenerationError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ClientResult<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        if token.is_cancelled() {
            metrics::record_generation_cancelled(operation);
            return Err(GenerationError::Cancelled);
        }

        attempt += 1;
        metrics::record_generation_attempt(operation);

        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "Generation succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) if attempt < max_attempts => {
                let delay = policy.delay_for_attempt(attempt);
                warn!(
                    operation,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Generation attempt failed, retrying: {}",
                    e
                );

                if token.is_cancelled() {
                    metrics::record_generation_cancelled(operation);
                    return Err(GenerationError::Cancelled);
                }

                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        metrics::record_generation_cancelled(operation);
                        return Err(GenerationError::Cancelled);
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            Err(e) => {
                warn!(operation, attempts = attempt, "Generation failed: {}", e);
                metrics::record_generation_failure(operation);
                return Err(GenerationError::Failed {
                    attempts: attempt,
                    source: e,
                });
            }
        }
    }
}
