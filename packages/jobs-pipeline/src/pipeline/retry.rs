//! Shared retry policy with exponential backoff.
//!
//! One policy covers every collaborator call the orchestrator makes, so
//! retry never compounds across layers: collaborators that retry
//! internally are simply given a single-attempt policy at this boundary.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Retry policy applied at the orchestrator boundary.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    attempts: u32,
    base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy. `attempts` is the total number of tries; 0 and 1
    /// both mean a single try with no retries.
    pub fn new(attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts,
            base_delay,
        }
    }

    /// A single try, no backoff.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Total tries this policy allows.
    pub fn attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    /// Backoff before the retry following `attempt` (1-based): the first
    /// retry waits `base_delay`, doubling after each failure.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(Duration::MAX)
    }

    /// Run `op` until it succeeds or attempts are exhausted, sleeping the
    /// backoff delay between tries. The final error is returned as-is.
    pub async fn run<T, E, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let tries = self.attempts();
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < tries => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "call failed, retrying: {}",
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
