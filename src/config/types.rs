use crate::retry::RetryPolicy;
use crate::IndexNowError;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Public IndexNow endpoint shared by participating search engines
pub const DEFAULT_ENDPOINT: &str = "https://api.indexnow.org/indexnow";

/// Largest URL list accepted in a single IndexNow POST
pub const MAX_BATCH_SIZE: usize = 10_000;

/// Environment variable consulted when the config file has no API key
pub const API_KEY_ENV: &str = "INDEXNOW_API_KEY";

/// Main configuration structure for IndexNow Notify
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub indexnow: EndpointConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

/// The site whose URLs are submitted
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Hostname used in batch bodies and the key-location URL
    pub host: String,

    /// IndexNow API key; falls back to `INDEXNOW_API_KEY` when absent
    #[serde(rename = "api-key", default)]
    pub api_key: Option<String>,

    /// Web root where `<api-key>.txt` is published
    #[serde(rename = "web-root", default)]
    pub web_root: Option<PathBuf>,
}

impl SiteConfig {
    /// Returns the configured API key, or the one from the environment
    pub fn resolve_api_key(&self) -> Result<String, IndexNowError> {
        if let Some(key) = self.api_key.as_deref().map(str::trim) {
            if !key.is_empty() {
                return Ok(key.to_string());
            }
        }

        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(IndexNowError::MissingApiKey),
        }
    }
}

/// IndexNow endpoint and HTTP client settings
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// URLs per POST request
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,

    /// Pause between consecutive batch requests (milliseconds)
    #[serde(rename = "batch-delay-ms", default = "default_batch_delay_ms")]
    pub batch_delay_ms: u64,

    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,

    #[serde(rename = "user-agent", default)]
    pub user_agent: Option<String>,
}

impl EndpointConfig {
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            batch_size: default_batch_size(),
            batch_delay_ms: default_batch_delay_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            timeout_secs: default_timeout_secs(),
            max_redirects: default_max_redirects(),
            user_agent: None,
        }
    }
}

/// Retry behavior for failed submissions
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(rename = "max-attempts", default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed delay before a failed entry becomes due again
    #[serde(rename = "interval-hours", default = "default_interval_hours")]
    pub interval_hours: u32,

    /// Maximum entries re-submitted per sweep
    #[serde(rename = "sweep-limit", default = "default_sweep_limit")]
    pub sweep_limit: usize,
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            enabled: self.enabled,
            max_attempts: self.max_attempts,
            interval: chrono::Duration::hours(i64::from(self.interval_hours)),
            sweep_limit: self.sweep_limit,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: default_max_attempts(),
            interval_hours: default_interval_hours(),
            sweep_limit: default_sweep_limit(),
        }
    }
}

/// Submission log storage
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,

    /// Entries older than this are removed by cleanup; 0 keeps everything
    #[serde(rename = "retention-days", default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            retention_days: default_retention_days(),
        }
    }
}

/// Content-change event handling
#[derive(Debug, Clone, Deserialize)]
pub struct EventsConfig {
    /// Submit automatically when monitored content changes
    #[serde(rename = "auto-submit", default = "default_true")]
    pub auto_submit: bool,

    /// Tables whose changes trigger submissions
    #[serde(rename = "enabled-tables", default)]
    pub enabled_tables: Vec<String>,

    /// Pending requests held by the background worker
    #[serde(rename = "queue-capacity", default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            auto_submit: true,
            enabled_tables: Vec::new(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_batch_size() -> usize {
    MAX_BATCH_SIZE
}

fn default_batch_delay_ms() -> u64 {
    100
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_redirects() -> usize {
    3
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    5
}

fn default_interval_hours() -> u32 {
    12
}

fn default_sweep_limit() -> usize {
    100
}

fn default_database_path() -> String {
    "indexnow.db".to_string()
}

fn default_retention_days() -> u32 {
    30
}

fn default_queue_capacity() -> usize {
    256
}
