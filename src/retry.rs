//! Bounded retry with exponential backoff.
//!
//! General-purpose retry loop for async operations that fail transiently.
//! The poller uses it for status queries against the control plane; it is
//! exposed because callers wrapping their own remote calls need the same
//! discipline.

use log::{error, warn};
use std::time::Duration;

/// Configuration for operations that may fail transiently.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first); must be at least 1
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound on the delay between retries
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each attempt
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Create a config with a specific attempt bound.
    pub fn with_max_attempts(attempts: u32) -> Self {
        Self {
            max_attempts: attempts.max(1),
            ..Default::default()
        }
    }
}

/// Execute an async operation, retrying on failure with exponential backoff
/// until it succeeds or the attempt bound is exhausted.
///
/// Returns the last error when attempts run out. The operation name is only
/// used for logging.
pub async fn retry_with_backoff<F, Fut, T, E>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut attempt = 0u32;
    let mut delay = config.initial_delay;

    loop {
        attempt += 1;

        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if attempt >= config.max_attempts.max(1) {
                    error!(
                        "{operation_name}: failed after {attempt} attempts, giving up: {e}"
                    );
                    return Err(e);
                }

                warn!(
                    "{operation_name}: attempt {attempt} failed ({e}), retrying in {}ms",
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;

                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * config.backoff_multiplier)
                        .min(config.max_delay.as_secs_f64()),
                );
            }
        }
    }
}
