//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the LogStore trait.

use crate::clock::{Clock, SystemClock};
use crate::retry::RetryPolicy;
use crate::state::{Action, SubmissionStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{LogStore, StorageError, StorageResult};
use crate::storage::{format_timestamp, parse_timestamp, LogEntry, LogFilter};
use crate::submit::{Origin, SubmissionResult};
use crate::IndexNowError;
use chrono::{DateTime, SubsecRound, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;

const ENTRY_COLUMNS: &str = "id, created_at, origin_table, origin_record, url, action, status, \
     response_code, response_message, attempts, last_attempt, next_retry";

/// SQLite storage backend
pub struct SqliteLogStore {
    conn: Connection,
    policy: RetryPolicy,
    clock: Arc<dyn Clock>,
}

impl SqliteLogStore {
    /// Creates a new SqliteLogStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `policy` - Retry policy used to schedule failed entries
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteLogStore)` - Successfully opened/created database
    /// * `Err(IndexNowError)` - Failed to open database
    pub fn new(path: &Path, policy: RetryPolicy) -> Result<Self, IndexNowError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn,
            policy,
            clock: Arc::new(SystemClock),
        })
    }

    /// Creates an in-memory database
    pub fn open_in_memory(policy: RetryPolicy) -> Result<Self, IndexNowError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn,
            policy,
            clock: Arc::new(SystemClock),
        })
    }

    /// Replaces the time source used for attempt timestamps and due checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Current time at the precision timestamps are stored with
    fn now(&self) -> DateTime<Utc> {
        self.clock.now().trunc_subsecs(3)
    }

    fn query_entries(
        &self,
        sql: &str,
        args: &[String],
    ) -> StorageResult<Vec<LogEntry>> {
        let mut stmt = self.conn.prepare(sql)?;
        let raw = stmt
            .query_map(params_from_iter(args.iter()), RawEntry::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        raw.into_iter().map(RawEntry::into_entry).collect()
    }
}

impl LogStore for SqliteLogStore {
    // ===== Attempt Recording =====

    fn append(
        &mut self,
        url: &str,
        action: Action,
        origin: &Origin,
        result: &SubmissionResult,
    ) -> StorageResult<LogEntry> {
        let now = self.now();
        insert_entry(&self.conn, &self.policy, now, url, action, origin, result)
    }

    fn append_all(
        &mut self,
        urls: &[String],
        action: Action,
        origin: &Origin,
        result: &SubmissionResult,
    ) -> StorageResult<Vec<LogEntry>> {
        let now = self.now();
        let policy = &self.policy;
        let tx = self.conn.transaction()?;
        let entries = urls
            .iter()
            .map(|url| insert_entry(&tx, policy, now, url, action, origin, result))
            .collect::<StorageResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(entries)
    }

    fn update(
        &mut self,
        id: i64,
        status: SubmissionStatus,
        result: &SubmissionResult,
        attempts: u32,
        next_retry: Option<DateTime<Utc>>,
    ) -> StorageResult<()> {
        let now = self.now();
        let changed = self.conn.execute(
            "UPDATE submission_log
             SET status = ?1, response_code = ?2, response_message = ?3,
                 attempts = ?4, last_attempt = ?5, next_retry = ?6
             WHERE id = ?7 AND status NOT IN ('success', 'permanent_fail')",
            params![
                status.to_db_string(),
                result.code,
                result.message,
                attempts,
                format_timestamp(now),
                next_retry.map(format_timestamp),
                id,
            ],
        )?;

        if changed == 0 {
            // Either the row is gone or it is terminal
            self.get_entry(id)?;
            return Err(StorageError::TerminalEntry(id));
        }

        Ok(())
    }

    fn select_due_for_retry(
        &self,
        max_attempts: u32,
        limit: usize,
    ) -> StorageResult<Vec<LogEntry>> {
        let sql = format!(
            "SELECT {} FROM submission_log
             WHERE status = 'failed' AND attempts < {}
               AND (next_retry IS NULL OR next_retry <= ?1)
             ORDER BY created_at ASC, id ASC
             LIMIT {}",
            ENTRY_COLUMNS, max_attempts, limit
        );

        self.query_entries(&sql, &[format_timestamp(self.now())])
    }

    // ===== Queries =====

    fn get_entry(&self, id: i64) -> StorageResult<LogEntry> {
        let sql = format!("SELECT {} FROM submission_log WHERE id = ?1", ENTRY_COLUMNS);
        let raw = self
            .conn
            .query_row(&sql, params![id], RawEntry::from_row)
            .optional()?
            .ok_or(StorageError::EntryNotFound(id))?;

        raw.into_entry()
    }

    fn list_entries(&self, filter: &LogFilter) -> StorageResult<Vec<LogEntry>> {
        let (where_clause, args) = filter_clause(filter);
        let sql = format!(
            "SELECT {} FROM submission_log{} ORDER BY created_at DESC, id DESC LIMIT {} OFFSET {}",
            ENTRY_COLUMNS,
            where_clause,
            filter.per_page(),
            filter.offset()
        );

        self.query_entries(&sql, &args)
    }

    fn count_entries(&self, filter: &LogFilter) -> StorageResult<u64> {
        let (where_clause, args) = filter_clause(filter);
        let sql = format!("SELECT COUNT(*) FROM submission_log{}", where_clause);
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(args.iter()), |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_by_status_since(
        &self,
        statuses: &[SubmissionStatus],
        since: Option<DateTime<Utc>>,
    ) -> StorageResult<u64> {
        if statuses.is_empty() {
            return Ok(0);
        }

        let mut args: Vec<String> = statuses
            .iter()
            .map(|s| s.to_db_string().to_string())
            .collect();
        let placeholders = vec!["?"; statuses.len()].join(", ");
        let mut sql = format!(
            "SELECT COUNT(*) FROM submission_log WHERE status IN ({})",
            placeholders
        );
        if let Some(since) = since {
            sql.push_str(" AND created_at >= ?");
            args.push(format_timestamp(since));
        }

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(args.iter()), |row| row.get(0))?;
        Ok(count as u64)
    }

    // ===== Housekeeping =====

    fn delete_created_before(&mut self, cutoff: DateTime<Utc>) -> StorageResult<u64> {
        let deleted = self.conn.execute(
            "DELETE FROM submission_log WHERE created_at < ?1",
            params![format_timestamp(cutoff)],
        )?;
        Ok(deleted as u64)
    }
}

/// Inserts the first-attempt row for `url`
fn insert_entry(
    conn: &Connection,
    policy: &RetryPolicy,
    now: DateTime<Utc>,
    url: &str,
    action: Action,
    origin: &Origin,
    result: &SubmissionResult,
) -> StorageResult<LogEntry> {
    let status = result.classification().status();
    let next_retry = if status == SubmissionStatus::Failed && policy.enabled {
        Some(policy.next_retry_after(now))
    } else {
        None
    };

    conn.execute(
        "INSERT INTO submission_log
            (created_at, origin_table, origin_record, url, action, status,
             response_code, response_message, attempts, last_attempt, next_retry)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1, ?1, ?9)",
        params![
            format_timestamp(now),
            origin.table,
            origin.record_id,
            url,
            action.to_db_string(),
            status.to_db_string(),
            result.code,
            result.message,
            next_retry.map(format_timestamp),
        ],
    )?;

    Ok(LogEntry {
        id: conn.last_insert_rowid(),
        created_at: now,
        origin: origin.clone(),
        url: url.to_string(),
        action,
        status,
        response_code: Some(result.code),
        response_message: Some(result.message.clone()),
        attempts: 1,
        last_attempt: Some(now),
        next_retry,
    })
}

fn filter_clause(filter: &LogFilter) -> (String, Vec<String>) {
    let mut conditions = Vec::new();
    let mut args = Vec::new();

    if let Some(status) = filter.status {
        conditions.push("status = ?");
        args.push(status.to_db_string().to_string());
    }
    if let Some(action) = filter.action {
        conditions.push("action = ?");
        args.push(action.to_db_string().to_string());
    }

    if conditions.is_empty() {
        (String::new(), args)
    } else {
        (format!(" WHERE {}", conditions.join(" AND ")), args)
    }
}

/// A row as SQLite returns it, before enum and timestamp parsing
struct RawEntry {
    id: i64,
    created_at: String,
    origin_table: Option<String>,
    origin_record: Option<i64>,
    url: String,
    action: String,
    status: String,
    response_code: Option<u16>,
    response_message: Option<String>,
    attempts: u32,
    last_attempt: Option<String>,
    next_retry: Option<String>,
}

impl RawEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            created_at: row.get(1)?,
            origin_table: row.get(2)?,
            origin_record: row.get(3)?,
            url: row.get(4)?,
            action: row.get(5)?,
            status: row.get(6)?,
            response_code: row.get(7)?,
            response_message: row.get(8)?,
            attempts: row.get(9)?,
            last_attempt: row.get(10)?,
            next_retry: row.get(11)?,
        })
    }

    fn into_entry(self) -> StorageResult<LogEntry> {
        let action = Action::from_db_string(&self.action)
            .ok_or_else(|| StorageError::InvalidValue(format!("action '{}'", self.action)))?;
        let status = SubmissionStatus::from_db_string(&self.status)
            .ok_or_else(|| StorageError::InvalidValue(format!("status '{}'", self.status)))?;

        Ok(LogEntry {
            id: self.id,
            created_at: parse_timestamp(&self.created_at)?,
            origin: Origin {
                table: self.origin_table,
                record_id: self.origin_record,
            },
            url: self.url,
            action,
            status,
            response_code: self.response_code,
            response_message: self.response_message,
            attempts: self.attempts,
            last_attempt: self.last_attempt.as_deref().map(parse_timestamp).transpose()?,
            next_retry: self.next_retry.as_deref().map(parse_timestamp).transpose()?,
        })
    }
}
