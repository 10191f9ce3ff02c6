//! Retry loop with exponential backoff for transient provider failures.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff schedule: the base delay doubles per retry up to a cap.
#[derive(Debug, Clone)]
pub struct Backoff {
    max_retries: u32,
    base: Duration,
    cap: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base: Duration::from_millis(500),
            cap: Duration::from_secs(8),
        }
    }
}

impl Backoff {
    /// Default schedule with `max_retries` retries (0 = single attempt).
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Override the base delay and cap.
    pub fn with_delays(mut self, base: Duration, cap: Duration) -> Self {
        self.base = base;
        self.cap = cap;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry `retry` (0-indexed).
    ///
    /// Successive retries shave 0-30% off the doubled delay so clients that
    /// failed together do not retry in lockstep.
    pub fn delay(&self, retry: u32) -> Duration {
        let doubled = self.base.saturating_mul(2u32.saturating_pow(retry));
        let capped = doubled.min(self.cap);
        let spread = 1.0 - 0.1 * f64::from(retry % 4);
        capped.mul_f64(spread)
    }

    /// Run `op` until it succeeds, fails permanently, or retries run out.
    pub async fn run<T, E, F, Fut>(&self, mut op: F, is_transient: impl Fn(&E) -> bool) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut retry = 0;
        loop {
            match op().await {
                Err(e) if is_transient(&e) && retry < self.max_retries => {
                    let delay = self.delay(retry);
                    warn!(
                        "Transient error ({}), retry {}/{} in {:?}",
                        e,
                        retry + 1,
                        self.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                result => return result,
            }
        }
    }
}
