//! IndexNow Notify: push content changes to search engines
//!
//! This crate submits changed URLs to the IndexNow protocol endpoint, records
//! every attempt in a SQLite submission log, and retries transient failures on
//! a fixed schedule until each entry reaches a terminal state.

pub mod clock;
pub mod config;
pub mod keyfile;
pub mod notify;
pub mod output;
pub mod retry;
pub mod state;
pub mod storage;
pub mod submit;
pub mod url;

use thiserror::Error;

/// Main error type for IndexNow Notify operations
#[derive(Debug, Error)]
pub enum IndexNowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Submission request contains no URLs")]
    EmptyRequest,

    #[error("Table '{0}' is not enabled for submission")]
    TableNotEnabled(String),

    #[error("No URLs found for table '{0}'")]
    NoTableUrls(String),

    #[error("Notification queue is full")]
    QueueFull,

    #[error("Notification queue is closed")]
    QueueClosed,

    #[error("No API key configured (set site.api-key or INDEXNOW_API_KEY)")]
    MissingApiKey,
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,

    #[error("URL host {found} does not belong to site {expected}")]
    ForeignHost { found: String, expected: String },
}

/// Result type alias for IndexNow Notify operations
pub type Result<T> = std::result::Result<T, IndexNowError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use state::{Action, SubmissionStatus};
pub use submit::{classify, Classification, SubmissionRequest, SubmissionResult, Submitter};
