use crate::config::types::{
    Config, EndpointConfig, EventsConfig, LogConfig, RetryConfig, SiteConfig, MAX_BATCH_SIZE,
};
use crate::ConfigError;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_endpoint_config(&config.indexnow)?;
    validate_retry_config(&config.retry)?;
    validate_log_config(&config.log)?;
    validate_events_config(&config.events)?;
    Ok(())
}

/// Returns true if `key` has the IndexNow key format
///
/// Keys are 8 to 128 characters of `a-z`, `A-Z`, `0-9` and `-`.
pub fn is_valid_api_key(key: &str) -> bool {
    (8..=128).contains(&key.len()) && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

/// Validates site configuration
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_host(&config.host)?;

    if let Some(key) = config.api_key.as_deref().map(str::trim) {
        if !key.is_empty() && !is_valid_api_key(key) {
            return Err(ConfigError::Validation(
                "api-key must be 8-128 characters of letters, digits and '-'".to_string(),
            ));
        }
    }

    if let Some(web_root) = &config.web_root {
        if web_root.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "web-root cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates endpoint configuration
fn validate_endpoint_config(config: &EndpointConfig) -> Result<(), ConfigError> {
    let endpoint = Url::parse(&config.endpoint).map_err(|e| {
        ConfigError::InvalidUrl(format!("Invalid endpoint '{}': {}", config.endpoint, e))
    })?;

    if !matches!(endpoint.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidUrl(format!(
            "Endpoint '{}' must use http or https",
            config.endpoint
        )));
    }

    if config.batch_size < 1 || config.batch_size > MAX_BATCH_SIZE {
        return Err(ConfigError::Validation(format!(
            "batch-size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE, config.batch_size
        )));
    }

    if config.connect_timeout_secs < 1 || config.timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs and timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.max_redirects > 10 {
        return Err(ConfigError::Validation(format!(
            "max-redirects must be <= 10, got {}",
            config.max_redirects
        )));
    }

    Ok(())
}

/// Validates retry configuration
fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 || config.max_attempts > 10 {
        return Err(ConfigError::Validation(format!(
            "max-attempts must be between 1 and 10, got {}",
            config.max_attempts
        )));
    }

    if config.interval_hours < 1 {
        return Err(ConfigError::Validation(
            "interval-hours must be >= 1".to_string(),
        ));
    }

    if config.sweep_limit < 1 {
        return Err(ConfigError::Validation(
            "sweep-limit must be >= 1".to_string(),
        ));
    }

    Ok(())
}

/// Validates log configuration
fn validate_log_config(config: &LogConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates event handling configuration
fn validate_events_config(config: &EventsConfig) -> Result<(), ConfigError> {
    if config.queue_capacity < 1 {
        return Err(ConfigError::Validation(
            "queue-capacity must be >= 1".to_string(),
        ));
    }

    if config.enabled_tables.iter().any(|t| t.trim().is_empty()) {
        return Err(ConfigError::Validation(
            "enabled-tables cannot contain empty names".to_string(),
        ));
    }

    Ok(())
}

/// Validates a bare hostname (no scheme, path or port)
fn validate_host(host: &str) -> Result<(), ConfigError> {
    if host.is_empty() {
        return Err(ConfigError::Validation("host cannot be empty".to_string()));
    }

    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "host '{}' must be a bare hostname (letters, digits, '.' and '-')",
            host
        )));
    }

    if host.starts_with('.') || host.ends_with('.') || host.starts_with('-') || host.ends_with('-')
    {
        return Err(ConfigError::Validation(format!(
            "host '{}' cannot start or end with '.' or '-'",
            host
        )));
    }

    if host.contains("..") {
        return Err(ConfigError::Validation(format!(
            "host '{}' cannot contain consecutive dots",
            host
        )));
    }

    Ok(())
}
