//! IndexNow request construction and delivery
//!
//! One URL is sent as `GET <endpoint>?url=<url>&key=<key>`; several URLs are
//! sent as a JSON `POST` carrying the host, key, key location and URL list.
//! Every outcome, including transport failures, comes back as a
//! `SubmissionResult`; nothing here returns an error to the caller.

use crate::config::{Config, MAX_BATCH_SIZE};
use crate::submit::client::build_http_client;
use crate::submit::result::SubmissionResult;
use crate::url::dedupe_urls;
use crate::IndexNowError;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Request};
use serde::Serialize;
use std::time::Duration;
use url::Url;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Response bodies longer than this are cut before logging
const BODY_LOG_LIMIT: usize = 512;

/// JSON body of a batch submission
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BatchPayload<'a> {
    host: &'a str,
    key: &'a str,
    key_location: String,
    url_list: &'a [String],
}

/// Sends URL submissions to an IndexNow endpoint
#[derive(Debug, Clone)]
pub struct Submitter {
    client: Client,
    endpoint: Url,
    host: String,
    api_key: String,
    batch_size: usize,
    batch_delay: Duration,
}

impl Submitter {
    /// Creates a submitter from a validated configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Submitter)` - Ready to submit
    /// * `Err(IndexNowError)` - No API key, unparsable endpoint, or client build failure
    pub fn from_config(config: &Config) -> Result<Self, IndexNowError> {
        let api_key = config.site.resolve_api_key()?;
        let endpoint = Url::parse(&config.indexnow.endpoint).map_err(|e| {
            crate::ConfigError::InvalidUrl(format!(
                "Invalid endpoint '{}': {}",
                config.indexnow.endpoint, e
            ))
        })?;
        let client = build_http_client(&config.indexnow)?;

        Ok(Self::new(client, endpoint, &config.site.host, api_key)
            .with_batching(config.indexnow.batch_size, config.indexnow.batch_delay()))
    }

    /// Creates a submitter with the default batch size and delay
    pub fn new(client: Client, endpoint: Url, host: &str, api_key: impl Into<String>) -> Self {
        Self {
            client,
            endpoint,
            host: host.to_string(),
            api_key: api_key.into(),
            batch_size: MAX_BATCH_SIZE,
            batch_delay: Duration::from_millis(100),
        }
    }

    /// Overrides the chunk size (clamped to 1..=10,000) and the inter-chunk pause
    pub fn with_batching(mut self, batch_size: usize, batch_delay: Duration) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_SIZE);
        self.batch_delay = batch_delay;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// The verification URL: `https://<host>/<api-key>.txt`
    pub fn key_location(&self) -> String {
        format!("https://{}/{}.txt", self.host, self.api_key)
    }

    /// Builds the HTTP request for a non-empty URL list
    ///
    /// A single URL becomes a GET with query parameters, anything longer a
    /// JSON POST.
    pub fn build_request(&self, urls: &[String]) -> Result<Request, reqwest::Error> {
        if let [url] = urls {
            return self
                .client
                .get(self.endpoint.clone())
                .query(&[("url", url.as_str()), ("key", self.api_key.as_str())])
                .build();
        }

        let payload = BatchPayload {
            host: &self.host,
            key: &self.api_key,
            key_location: self.key_location(),
            url_list: urls,
        };
        // Serializing a struct of strings cannot fail
        let body = serde_json::to_vec(&payload).unwrap_or_default();

        self.client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
            .body(body)
            .build()
    }

    /// Submits the URLs in one request
    ///
    /// Blank and duplicate URLs are dropped first; if nothing remains, no
    /// request is sent.
    pub async fn submit(&self, urls: &[String]) -> SubmissionResult {
        let urls = dedupe_urls(urls);
        if urls.is_empty() {
            return SubmissionResult::no_urls();
        }
        self.send(&urls).await
    }

    /// Submits the URLs in chunks of the configured batch size
    ///
    /// Chunks go out sequentially with a short pause between them. The first
    /// failing chunk stops the batch and its result is returned; later chunks
    /// are not sent.
    pub async fn submit_batch(&self, urls: &[String]) -> SubmissionResult {
        let urls = dedupe_urls(urls);
        if urls.is_empty() {
            return SubmissionResult::no_urls();
        }

        let chunks: Vec<&[String]> = urls.chunks(self.batch_size).collect();
        let total = chunks.len();

        for (index, chunk) in chunks.into_iter().enumerate() {
            if index > 0 && !self.batch_delay.is_zero() {
                tokio::time::sleep(self.batch_delay).await;
            }

            let result = self.send(chunk).await;
            if !result.success {
                tracing::warn!(
                    "Batch {}/{} failed ({} URLs): {}",
                    index + 1,
                    total,
                    chunk.len(),
                    result
                );
                return result;
            }

            if total == 1 {
                return result;
            }
            tracing::debug!("Batch {}/{} accepted ({} URLs)", index + 1, total, chunk.len());
        }

        SubmissionResult::all_batches_succeeded()
    }

    async fn send(&self, urls: &[String]) -> SubmissionResult {
        let request = match self.build_request(urls) {
            Ok(request) => request,
            Err(e) => return SubmissionResult::connection_error(e),
        };
        let method = request.method().clone();

        match self.client.execute(request).await {
            Ok(response) => {
                let result = SubmissionResult::from_status(response.status().as_u16());

                if result.success {
                    tracing::debug!("{} {} URL(s): {}", method, urls.len(), result);
                } else {
                    let body = response.text().await.unwrap_or_default();
                    let body: String = body.chars().take(BODY_LOG_LIMIT).collect();
                    tracing::debug!(
                        "{} {} URL(s) rejected: {} body={:?}",
                        method,
                        urls.len(),
                        result,
                        body
                    );
                }

                result
            }
            Err(e) => {
                let result = SubmissionResult::connection_error(describe_transport_error(&e));
                tracing::debug!("{} {} URL(s) failed: {}", method, urls.len(), result);
                result
            }
        }
    }
}

/// Short description of a transport-level failure
fn describe_transport_error(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        format!("request timed out ({})", e)
    } else if e.is_redirect() {
        format!("too many redirects ({})", e)
    } else if e.is_connect() {
        format!("could not connect ({})", e)
    } else {
        e.to_string()
    }
}
