//! Bounded retry with exponential backoff for ledger reads.
//!
//! Only idempotent calls go through here. Transaction submission is
//! never retried.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry settings for RPC reads.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum retries after the first attempt.
    pub max_retries: u32,
    /// Base delay between retries (exponential backoff).
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }

    /// Run `op` until it succeeds or the retries are spent; returns the
    /// last error.
    pub async fn run<T, F, Fut>(&self, what: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.delay_for(attempt);
                debug!(what, attempt, delay_ms = delay.as_millis() as u64, "Retrying ledger read");
                sleep(delay).await;
            }

            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(what, attempt, error = %e, "Ledger read failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("{what}: max retries exceeded"))
            .context(format!("{what} failed after {} attempts", self.max_retries + 1)))
    }
}
