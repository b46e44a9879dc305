//! Polling cadence and retry budget.

use std::time::Duration;

/// Bounded exponential backoff plus a hard per-job deadline.
///
/// The n-th wait is `base_delay * 2^n`, capped at `max_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingPolicy {
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Wall-clock budget for one job, measured from the start of polling.
    pub deadline: Duration,
    /// Consecutive transient failures tolerated before the job is failed.
    pub max_transient_retries: u32,
}

impl Default for PollingPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(15),
            deadline: Duration::from_secs(15 * 60),
            max_transient_retries: 3,
        }
    }
}

impl PollingPolicy {
    /// Calculate exponential backoff delay.
    pub fn exponential_delay(&self, n_attempts: u32) -> Duration {
        let delay = self.base_delay.as_secs_f64() * 2_f64.powi(n_attempts.min(31) as i32);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    /// Delay before retrying after a transient failure.
    ///
    /// A provider's Retry-After hint wins when it asks for a longer wait.
    pub fn retry_delay(&self, n_attempts: u32, retry_after: Option<Duration>) -> Duration {
        let delay = self.exponential_delay(n_attempts);
        match retry_after {
            Some(hint) if hint > delay => hint,
            _ => delay,
        }
    }
}
