//! Database schema definitions
//!
//! This module contains the SQL schema for the submission log.

/// Current schema version, stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per submitted URL; retries update the row in place
CREATE TABLE IF NOT EXISTS submission_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    created_at TEXT NOT NULL,
    origin_table TEXT,
    origin_record INTEGER,
    url TEXT NOT NULL,
    action TEXT NOT NULL
        CHECK (action IN ('create', 'update', 'delete', 'manual', 'retry')),
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'success', 'failed', 'permanent_fail')),
    response_code INTEGER,
    response_message TEXT,
    attempts INTEGER NOT NULL DEFAULT 1,
    last_attempt TEXT,
    next_retry TEXT
);

CREATE INDEX IF NOT EXISTS idx_submission_log_created ON submission_log(created_at);
CREATE INDEX IF NOT EXISTS idx_submission_log_status ON submission_log(status);
CREATE INDEX IF NOT EXISTS idx_submission_log_next_retry ON submission_log(next_retry);
"#;

/// Initializes the database schema
///
/// Safe to run against an existing database.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

/// Reads the schema version recorded in the database
pub fn get_schema_version(conn: &rusqlite::Connection) -> Result<u32, rusqlite::Error> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
}
