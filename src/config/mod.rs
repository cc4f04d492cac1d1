//! Configuration module for IndexNow Notify
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use indexnow_notify::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("indexnow.toml")).unwrap();
//! println!("Submitting for host: {}", config.site.host);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    Config, EndpointConfig, EventsConfig, LogConfig, RetryConfig, SiteConfig, API_KEY_ENV,
    DEFAULT_ENDPOINT, MAX_BATCH_SIZE,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, config_hash, load_config, load_config_with_hash, parse_config, short_hash,
};
pub use validation::is_valid_api_key;
