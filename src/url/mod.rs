//! URL handling module for IndexNow Notify
//!
//! Submitted URLs must be absolute http(s) URLs on the configured site.
//! This module validates them and removes duplicates before they reach the
//! submitter.

mod host;

use crate::{UrlError, UrlResult};
use std::collections::HashSet;
use url::Url;

pub use host::{extract_host, same_site};

/// Validates that `raw` is an http(s) URL belonging to `site_host`
///
/// A leading `www.` on either side is ignored, so `https://www.example.com/`
/// belongs to the site `example.com`.
///
/// # Examples
///
/// ```
/// use indexnow_notify::url::validate_site_url;
///
/// assert!(validate_site_url("https://www.example.com/news/", "example.com").is_ok());
/// assert!(validate_site_url("https://other.org/", "example.com").is_err());
/// ```
pub fn validate_site_url(raw: &str, site_host: &str) -> UrlResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = extract_host(&url).ok_or(UrlError::MissingHost)?;
    if !same_site(&host, site_host) {
        return Err(UrlError::ForeignHost {
            found: host,
            expected: site_host.to_string(),
        });
    }

    Ok(url)
}

/// Drops blank entries and duplicates, keeping first-seen order
pub fn dedupe_urls<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for url in urls {
        let url = url.as_ref().trim();
        if url.is_empty() {
            continue;
        }
        if seen.insert(url.to_string()) {
            unique.push(url.to_string());
        }
    }

    unique
}

/// Splits candidate URLs into those on the site and those rejected
pub fn partition_site_urls<I, S>(urls: I, site_host: &str) -> (Vec<String>, Vec<(String, UrlError)>)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut valid = Vec::new();
    let mut rejected = Vec::new();

    for url in dedupe_urls(urls) {
        match validate_site_url(&url, site_host) {
            Ok(_) => valid.push(url),
            Err(e) => rejected.push((url, e)),
        }
    }

    (valid, rejected)
}
