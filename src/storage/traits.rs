//! Storage traits and error types
//!
//! This module defines the interface for submission log backends and the
//! associated error types.

use crate::state::{Action, SubmissionStatus};
use crate::storage::{LogEntry, LogFilter};
use crate::submit::{Origin, SubmissionResult};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Log entry not found: {0}")]
    EntryNotFound(i64),

    #[error("Log entry {0} is terminal and cannot be updated")]
    TerminalEntry(i64),

    #[error("Invalid stored value: {0}")]
    InvalidValue(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Durable record of submission attempts and their retry state
///
/// `append` and `update` are single-row writes; every other method is a
/// read-only projection, except `delete_created_before`, which is retention
/// housekeeping.
pub trait LogStore {
    // ===== Attempt Recording =====

    /// Records the first attempt for a URL
    ///
    /// The status follows the result's classification: success,
    /// permanent_fail, or failed. `attempts` starts at 1. `next_retry` is set
    /// one retry interval ahead only for a failed entry while retry is enabled.
    fn append(
        &mut self,
        url: &str,
        action: Action,
        origin: &Origin,
        result: &SubmissionResult,
    ) -> StorageResult<LogEntry>;

    /// Records the first attempt for every URL of one submission
    ///
    /// Entries come back in the order of `urls`. The default appends one at a
    /// time; `SqliteLogStore` writes all rows in a single transaction, so
    /// either every URL is logged or none is.
    fn append_all(
        &mut self,
        urls: &[String],
        action: Action,
        origin: &Origin,
        result: &SubmissionResult,
    ) -> StorageResult<Vec<LogEntry>> {
        urls.iter()
            .map(|url| self.append(url, action, origin, result))
            .collect()
    }

    /// Overwrites the retry state of an entry after another attempt
    ///
    /// `last_attempt` becomes now; `next_retry` is cleared when `None`.
    ///
    /// # Errors
    ///
    /// * `EntryNotFound` - no entry with this id
    /// * `TerminalEntry` - the entry is already success or permanent_fail
    fn update(
        &mut self,
        id: i64,
        status: SubmissionStatus,
        result: &SubmissionResult,
        attempts: u32,
        next_retry: Option<DateTime<Utc>>,
    ) -> StorageResult<()>;

    /// Failed entries with attempts left whose retry time has come
    ///
    /// Ordered oldest first, at most `limit` entries.
    fn select_due_for_retry(&self, max_attempts: u32, limit: usize)
        -> StorageResult<Vec<LogEntry>>;

    // ===== Queries =====

    /// Gets an entry by id
    fn get_entry(&self, id: i64) -> StorageResult<LogEntry>;

    /// Lists entries matching the filter, newest first, one page at a time
    fn list_entries(&self, filter: &LogFilter) -> StorageResult<Vec<LogEntry>>;

    /// Counts all entries matching the filter's status and action
    fn count_entries(&self, filter: &LogFilter) -> StorageResult<u64>;

    /// Counts entries in any of `statuses`, created at or after `since`
    fn count_by_status_since(
        &self,
        statuses: &[SubmissionStatus],
        since: Option<DateTime<Utc>>,
    ) -> StorageResult<u64>;

    // ===== Housekeeping =====

    /// Deletes entries created before `cutoff`, returning how many were removed
    fn delete_created_before(&mut self, cutoff: DateTime<Utc>) -> StorageResult<u64>;
}
