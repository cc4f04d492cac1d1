//! Retry sweep over failed log entries
//!
//! Each sweep selects the failed entries whose retry time has passed,
//! re-submits each URL once, and moves the entry to its next state:
//!
//! | Attempt outcome | New status | next_retry |
//! |-----------------|------------|------------|
//! | success | success | cleared |
//! | 400 / 403 / 422 | permanent_fail | cleared |
//! | retryable, attempts reached the limit | permanent_fail (exhausted) | cleared |
//! | retryable, attempts left | failed | now + interval |

use crate::clock::{Clock, SystemClock};
use crate::retry::RetryPolicy;
use crate::state::SubmissionStatus;
use crate::storage::{lock_store, LogEntry, LogStore, SharedStore, StorageResult};
use crate::submit::{Classification, SubmissionResult, Submitter};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// The state an entry moves to after one more attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub status: SubmissionStatus,
    pub attempts: u32,
    pub next_retry: Option<DateTime<Utc>>,

    /// True when the entry gave up because it ran out of attempts
    pub exhausted: bool,
}

/// Decides the next state of an entry that had `previous_attempts` attempts
/// before this one
pub fn decide(
    result: &SubmissionResult,
    previous_attempts: u32,
    policy: &RetryPolicy,
    now: DateTime<Utc>,
) -> Transition {
    let attempts = previous_attempts.saturating_add(1);

    match result.classification() {
        Classification::Success => Transition {
            status: SubmissionStatus::Success,
            attempts,
            next_retry: None,
            exhausted: false,
        },
        Classification::Permanent => Transition {
            status: SubmissionStatus::PermanentFail,
            attempts,
            next_retry: None,
            exhausted: false,
        },
        Classification::Retryable if attempts >= policy.max_attempts => Transition {
            status: SubmissionStatus::PermanentFail,
            attempts,
            next_retry: None,
            exhausted: true,
        },
        Classification::Retryable => Transition {
            status: SubmissionStatus::Failed,
            attempts,
            next_retry: Some(policy.next_retry_after(now)),
            exhausted: false,
        },
    }
}

/// Counts from one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Entries that were due and picked up
    pub selected: usize,
    pub succeeded: usize,
    /// Still failing, scheduled again
    pub rescheduled: usize,
    /// Rejected with a permanent code
    pub permanent: usize,
    /// Gave up after the last allowed attempt
    pub exhausted: usize,
    /// Entries whose new state could not be saved
    pub errors: usize,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.selected == 0
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} due: {} succeeded, {} rescheduled, {} permanent, {} exhausted, {} errors",
            self.selected,
            self.succeeded,
            self.rescheduled,
            self.permanent,
            self.exhausted,
            self.errors
        )
    }
}

/// Re-submits failed entries on a fixed schedule
pub struct RetryScheduler<S: LogStore> {
    store: SharedStore<S>,
    submitter: Submitter,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl<S: LogStore> RetryScheduler<S> {
    pub fn new(store: SharedStore<S>, submitter: Submitter, policy: RetryPolicy) -> Self {
        Self {
            store,
            submitter,
            policy,
            clock: Arc::new(SystemClock),
        }
    }

    /// Uses `clock` when computing the next retry time
    ///
    /// Pass the same clock the store uses.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Runs one sweep
    ///
    /// Does nothing when retry is disabled. Entries are processed one at a
    /// time; a failure on one entry is counted and the sweep moves on.
    ///
    /// # Errors
    ///
    /// Only the initial selection of due entries can fail the sweep.
    pub async fn sweep(&self) -> StorageResult<SweepReport> {
        let mut report = SweepReport::default();
        if !self.policy.enabled {
            tracing::debug!("Retry disabled, skipping sweep");
            return Ok(report);
        }

        let due = {
            let store = lock_store(&self.store)?;
            store.select_due_for_retry(self.policy.max_attempts, self.policy.sweep_limit)?
        };

        if due.is_empty() {
            tracing::debug!("No submissions due for retry");
            return Ok(report);
        }

        report.selected = due.len();
        tracing::info!("Retrying {} failed submission(s)", due.len());

        for entry in &due {
            match self.retry_entry(entry).await {
                Ok(transition) => match transition.status {
                    SubmissionStatus::Success => report.succeeded += 1,
                    SubmissionStatus::Failed => report.rescheduled += 1,
                    _ if transition.exhausted => report.exhausted += 1,
                    _ => report.permanent += 1,
                },
                Err(e) => {
                    tracing::error!("Failed to record retry of entry {}: {}", entry.id, e);
                    report.errors += 1;
                }
            }
        }

        tracing::info!("Retry sweep finished: {}", report);
        Ok(report)
    }

    async fn retry_entry(&self, entry: &LogEntry) -> StorageResult<Transition> {
        let result = self.submitter.submit(std::slice::from_ref(&entry.url)).await;
        let transition = decide(&result, entry.attempts, &self.policy, self.clock.now());

        tracing::info!(
            action = "retry",
            url = %entry.url,
            code = result.code,
            attempt = transition.attempts,
            "Retry of entry {}: {}",
            entry.id,
            result
        );
        if transition.exhausted {
            tracing::warn!(
                url = %entry.url,
                "Giving up on entry {} after {} attempts",
                entry.id,
                transition.attempts
            );
        }

        let mut store = lock_store(&self.store)?;
        store.update(
            entry.id,
            transition.status,
            &result,
            transition.attempts,
            transition.next_retry,
        )?;

        Ok(transition)
    }
}
