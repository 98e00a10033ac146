//! Shared bounded-retry policy for upstream calls.
//!
//! Every hosted-API call (embeddings, completions, weather) goes through
//! the same contract: at most `max_attempts` calls, a fixed delay between
//! attempts, and retries only for errors classified as retryable by
//! [`PipelineError::is_retryable`]. No exponential backoff, no jitter.

use std::future::Future;
use std::time::Duration;

use crate::error::PipelineError;

/// Fixed-delay retry policy. `max_attempts` counts the initial call,
/// so the minimum total wait on exhaustion is `(max_attempts - 1) * delay`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// the attempt cap is reached. The last retryable error is returned
    /// on exhaustion.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, PipelineError>>,
    {
        let mut last_err = None;

        for attempt in 0..self.max_attempts.max(1) {
            if attempt > 0 {
                tokio::time::sleep(self.delay).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err
            .unwrap_or_else(|| PipelineError::Transient("retries exhausted".to_string())))
    }
}
