//! Exponential backoff schedule for retryable remote failures.

use std::time::Duration;

use crate::config::BackoffConfig;

/// Computes the wait before each retry attempt.
///
/// The delay for attempt `n` (zero-based) is `base_delay * multiplier^n`,
/// capped at `max_delay`. A server-provided Retry-After raises the floor
/// for that attempt but never exceeds the cap. With a multiplier >= 1.0
/// the resulting sequence is non-decreasing.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    config: BackoffConfig,
}

impl BackoffPolicy {
    /// Create a policy from configuration.
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Maximum number of calls per operation, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Delay before retry number `attempt` (zero-based).
    ///
    /// `retry_after` is the server-requested minimum wait in seconds, if
    /// the failed response carried one.
    pub fn delay_for(&self, attempt: u32, retry_after: Option<u64>) -> Duration {
        let base_ms = self.config.base_delay.as_millis() as f64;
        let scaled_ms = base_ms * self.config.multiplier.powi(attempt as i32);
        let mut delay = Duration::from_millis(scaled_ms as u64);

        if let Some(secs) = retry_after {
            delay = delay.max(Duration::from_secs(secs));
        }

        delay.min(self.config.max_delay)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(BackoffConfig::default())
    }
}
