use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Bounded exponential backoff.
///
/// Every failure is treated the same: there is no split between transient and
/// permanent errors, a failed attempt is retried until the budget runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Run `op` until it succeeds or `max_retries` extra attempts have failed.
    ///
    /// Waits `initial_delay` after the first failure and doubles the wait after
    /// each further one (1s, 2s, 4s by default). The last error is returned as-is.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut retries_left = self.max_retries;
        let mut delay = self.initial_delay;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if retries_left == 0 => return Err(e),
                Err(e) => {
                    warn!(
                        error = %e,
                        retries_left,
                        delay_ms = delay.as_millis() as u64,
                        "API call failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    retries_left -= 1;
                    delay *= 2;
                }
            }
        }
    }
}
