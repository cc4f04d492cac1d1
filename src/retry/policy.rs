use chrono::{DateTime, Duration, Utc};

/// Fixed delay between attempts on a retryable failure
pub const DEFAULT_RETRY_INTERVAL_HOURS: i64 = 12;

/// How failed submissions are retried
///
/// The interval is constant: every retry of an entry is scheduled the same
/// fixed delay after the previous attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// When false, failed entries get no `next_retry` and sweeps do nothing
    pub enabled: bool,

    /// Total attempts (the first submission included) before giving up
    pub max_attempts: u32,

    /// Delay from a failed attempt to the next one
    pub interval: Duration,

    /// Maximum entries handled per sweep
    pub sweep_limit: usize,
}

impl RetryPolicy {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// When an entry that failed at `now` becomes due again
    pub fn next_retry_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now + self.interval
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            interval: Duration::hours(DEFAULT_RETRY_INTERVAL_HOURS),
            sweep_limit: 100,
        }
    }
}
