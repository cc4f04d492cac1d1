//! Storage module for the submission log
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Recording submission attempts and their retry state
//! - Selecting entries that are due for another attempt
//! - Listing, counting and pruning log entries

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteLogStore;
pub use traits::{LogStore, StorageError, StorageResult};

use crate::retry::RetryPolicy;
use crate::state::{Action, SubmissionStatus};
use crate::submit::Origin;
use crate::IndexNowError;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Page sizes accepted by the log listing
pub const ALLOWED_PER_PAGE: [u32; 5] = [10, 25, 50, 100, 250];

/// Page size used when the requested one is not allowed
pub const DEFAULT_PER_PAGE: u32 = 50;

/// A store shared between the worker, the scheduler and the CLI
pub type SharedStore<S> = Arc<Mutex<S>>;

/// Initializes or opens a submission log database
pub fn open_log_store(path: &Path, policy: RetryPolicy) -> Result<SqliteLogStore, IndexNowError> {
    SqliteLogStore::new(path, policy)
}

/// Wraps a store for sharing across tasks
pub fn share<S>(store: S) -> SharedStore<S> {
    Arc::new(Mutex::new(store))
}

/// Locks a shared store
///
/// The guard must be dropped before the next `.await`.
pub fn lock_store<S>(store: &Mutex<S>) -> StorageResult<MutexGuard<'_, S>> {
    store.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Deletes entries created more than `retention_days` before `now`
///
/// A retention of 0 keeps everything. Returns the number of entries removed.
pub fn cleanup_old_logs(
    store: &mut dyn LogStore,
    retention_days: u32,
    now: DateTime<Utc>,
) -> StorageResult<u64> {
    if retention_days == 0 {
        return Ok(0);
    }

    let cutoff = now - Duration::days(i64::from(retention_days));
    let deleted = store.delete_created_before(cutoff)?;
    if deleted > 0 {
        tracing::info!("Removed {} log entries older than {} days", deleted, retention_days);
    }
    Ok(deleted)
}

/// Formats a timestamp the way it is stored: RFC 3339, UTC, milliseconds
pub fn format_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses a stored timestamp
pub fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidValue(format!("timestamp '{}': {}", raw, e)))
}

/// One row of the submission log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub origin: Origin,
    pub url: String,
    pub action: Action,
    pub status: SubmissionStatus,
    pub response_code: Option<u16>,
    pub response_message: Option<String>,
    pub attempts: u32,
    pub last_attempt: Option<DateTime<Utc>>,
    pub next_retry: Option<DateTime<Utc>>,
}

impl LogEntry {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Filter and page selection for log listings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFilter {
    pub status: Option<SubmissionStatus>,
    pub action: Option<Action>,
    page: u32,
    per_page: u32,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            status: None,
            action: None,
            page: 1,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: SubmissionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_action(mut self, action: Action) -> Self {
        self.action = Some(action);
        self
    }

    /// Selects a page; pages start at 1 and 0 is treated as 1
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    /// Selects a page size; sizes outside `ALLOWED_PER_PAGE` fall back to 50
    pub fn with_per_page(mut self, per_page: u32) -> Self {
        self.per_page = if ALLOWED_PER_PAGE.contains(&per_page) {
            per_page
        } else {
            DEFAULT_PER_PAGE
        };
        self
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    /// Row offset of the first entry on the selected page
    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}
