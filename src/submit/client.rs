//! HTTP client construction for IndexNow requests

use crate::config::EndpointConfig;
use reqwest::{redirect::Policy, Client};

/// Default user agent: `indexnow-notify/<crate version>`
pub fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

/// Builds an HTTP client with the endpoint's timeouts and redirect limit
///
/// Certificate verification is always on; there is no switch to disable it.
///
/// # Example
///
/// ```no_run
/// use indexnow_notify::config::EndpointConfig;
/// use indexnow_notify::submit::build_http_client;
///
/// let client = build_http_client(&EndpointConfig::default()).unwrap();
/// ```
pub fn build_http_client(config: &EndpointConfig) -> Result<Client, reqwest::Error> {
    let user_agent = config
        .user_agent
        .clone()
        .filter(|ua| !ua.trim().is_empty())
        .unwrap_or_else(default_user_agent);

    Client::builder()
        .user_agent(user_agent)
        .timeout(config.timeout())
        .connect_timeout(config.connect_timeout())
        .redirect(Policy::limited(config.max_redirects))
        .use_rustls_tls()
        .build()
}
