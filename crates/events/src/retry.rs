//! Fixed-interval retry policy shared by publishers and consumers.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Retry policy configuration.
///
/// `max_retries` counts retries *after* the first attempt, so `fixed(3, 5s)` runs an
/// operation at most four times, sleeping five seconds between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (0 = no retries)
    pub max_retries: u32,
    /// Delay between attempts
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(3, Duration::from_secs(5))
    }
}

impl RetryPolicy {
    /// Create a policy with no retries.
    pub fn no_retry() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    /// Create a policy with fixed delays.
    pub fn fixed(max_retries: u32, interval: Duration) -> Self {
        Self { max_retries, interval }
    }

    /// Check if another retry is allowed after `retries_so_far` retries.
    pub fn should_retry(&self, retries_so_far: u32) -> bool {
        retries_so_far < self.max_retries
    }

    /// Total number of times an operation may run under this policy.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Run `op` until it succeeds or the policy is exhausted; the last error is returned.
    ///
    /// `op` receives the zero-based attempt number.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: core::fmt::Display,
    {
        let mut retries = 0;
        loop {
            match op(retries).await {
                Ok(value) => return Ok(value),
                Err(err) if self.should_retry(retries) => {
                    retries += 1;
                    warn!(
                        operation,
                        retry = retries,
                        max_retries = self.max_retries,
                        error = %err,
                        "operation failed; retrying"
                    );
                    tokio::time::sleep(self.interval).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
