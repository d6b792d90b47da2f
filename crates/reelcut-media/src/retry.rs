//! Retry utilities with backoff.
//!
//! The operation receives the zero-based attempt number, so callers can
//! degrade their request on each retry.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (not including the initial attempt).
    pub max_retries: u32,
    /// Base delay between attempts.
    pub base_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Double the delay after each attempt.
    pub exponential: bool,
    /// Operation name for logging.
    pub operation_name: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            exponential: true,
            operation_name: "operation".to_string(),
        }
    }
}

impl RetryConfig {
    pub fn new(operation_name: impl Into<String>) -> Self {
        Self {
            operation_name: operation_name.into(),
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Wait the same `delay` between every attempt.
    pub fn with_fixed_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self.max_delay = delay;
        self.exponential = false;
        self
    }

    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return self.base_delay;
        }
        let delay = self
            .base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)));
        delay.min(self.max_delay)
    }
}

/// Execute an async operation with retry logic.
///
/// Returns the last error together with the number of attempts made.
///
/// # Example
/// ```ignore
/// let config = RetryConfig::new("download").with_max_retries(2);
/// let result = retry_async(&config, |attempt| download(FORMATS[attempt as usize])).await;
/// ```
pub async fn retry_async<F, Fut, T, E>(config: &RetryConfig, operation: F) -> Result<T, (E, u32)>
where
    F: Fn(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;

    loop {
        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < config.max_retries => {
                attempt += 1;
                let delay = config.delay_for_attempt(attempt);
                warn!(
                    operation = %config.operation_name,
                    attempt = attempt,
                    "attempt failed, retrying in {:?}: {}",
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                debug!(
                    operation = %config.operation_name,
                    attempts = attempt + 1,
                    "giving up: {}",
                    e
                );
                return Err((e, attempt + 1));
            }
        }
    }
}
