//! Submits a request and records the outcome of every URL in it

use crate::notify::event::{ContentEvent, EventFilter, TableUrlSource, UrlResolver};
use crate::state::Action;
use crate::storage::{lock_store, LogEntry, LogStore, SharedStore, StorageResult};
use crate::submit::{Origin, SubmissionRequest, Submitter};
use crate::url::partition_site_urls;
use crate::IndexNowError;

/// Sends submission requests and writes one log entry per URL
pub struct Notifier<S: LogStore> {
    store: SharedStore<S>,
    submitter: Submitter,
}

impl<S: LogStore> Notifier<S> {
    pub fn new(store: SharedStore<S>, submitter: Submitter) -> Self {
        Self { store, submitter }
    }

    pub fn submitter(&self) -> &Submitter {
        &self.submitter
    }

    /// Submits the request as a batch and logs every URL with the batch outcome
    ///
    /// Failed URLs enter the retry cycle through their log entries; the
    /// submission outcome itself is never returned as an error. The entries
    /// are written in one go: on a storage error none of them is logged.
    pub async fn notify(&self, request: &SubmissionRequest) -> StorageResult<Vec<LogEntry>> {
        let result = self.submitter.submit_batch(request.urls()).await;

        if result.success {
            tracing::info!(
                action = %request.action(),
                code = result.code,
                "Submitted {} URL(s): {}",
                request.len(),
                result
            );
        } else {
            tracing::warn!(
                action = %request.action(),
                code = result.code,
                "Submission of {} URL(s) failed: {}",
                request.len(),
                result
            );
        }

        let mut store = lock_store(&self.store)?;
        store.append_all(request.urls(), request.action(), request.origin(), &result)
    }
}

/// Builds a manual request from user-supplied URLs
///
/// URLs that are not http(s) or belong to another host are skipped with a
/// warning. Fails with `EmptyRequest` if nothing valid remains.
pub fn manual_request<I, S>(urls: I, site_host: &str) -> Result<SubmissionRequest, IndexNowError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let (valid, rejected) = partition_site_urls(urls, site_host);
    for (url, reason) in &rejected {
        tracing::warn!("Skipping {}: {}", url, reason);
    }

    SubmissionRequest::new(valid, Action::Manual, Origin::none())
}

/// Builds a manual request covering every URL of an enabled table
///
/// The entries are logged with the table as origin and no record id.
///
/// # Errors
///
/// * `TableNotEnabled` - the table is internal or not in the enabled list
/// * `NoTableUrls` - the table has no record with a URL on the site
pub fn table_request(
    table: &str,
    source: &dyn TableUrlSource,
    filter: &EventFilter,
    site_host: &str,
) -> Result<SubmissionRequest, IndexNowError> {
    if !filter.monitors_table(table) {
        return Err(IndexNowError::TableNotEnabled(table.to_string()));
    }

    let (valid, rejected) = partition_site_urls(source.urls(table), site_host);
    for (url, reason) in &rejected {
        tracing::warn!("Skipping {} from {}: {}", url, table, reason);
    }

    SubmissionRequest::new(valid, Action::Manual, Origin::table(table)).map_err(|e| match e {
        IndexNowError::EmptyRequest => IndexNowError::NoTableUrls(table.to_string()),
        other => other,
    })
}

/// Builds the request for a content event, or `None` when it resolves to no URL
pub fn event_request(
    event: &ContentEvent,
    resolver: &dyn UrlResolver,
) -> Option<SubmissionRequest> {
    let urls = resolver.resolve(event);
    match SubmissionRequest::new(urls, event.kind.action(), event.origin()) {
        Ok(request) => Some(request),
        Err(_) => {
            tracing::debug!(
                "No URL for {} record {} in {}, skipping",
                event.kind.action(),
                event.record_id,
                event.table
            );
            None
        }
    }
}
