use crate::state::Action;
use crate::url::dedupe_urls;
use crate::IndexNowError;

/// Where a submitted URL came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    /// Source table, when the submission came from a content change
    pub table: Option<String>,

    /// Record id within `table`
    pub record_id: Option<i64>,
}

impl Origin {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn record(table: impl Into<String>, record_id: i64) -> Self {
        Self {
            table: Some(table.into()),
            record_id: Some(record_id),
        }
    }

    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: Some(table.into()),
            record_id: None,
        }
    }
}

/// A set of URLs to submit together, with what triggered them
///
/// The URL list is never empty and holds no duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRequest {
    urls: Vec<String>,
    action: Action,
    origin: Origin,
}

impl SubmissionRequest {
    /// Builds a request, dropping blank and duplicate URLs
    ///
    /// Returns `IndexNowError::EmptyRequest` if no URL remains.
    pub fn new<I, S>(urls: I, action: Action, origin: Origin) -> Result<Self, IndexNowError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let urls = dedupe_urls(urls);
        if urls.is_empty() {
            return Err(IndexNowError::EmptyRequest);
        }

        Ok(Self {
            urls,
            action,
            origin,
        })
    }

    pub fn single(url: impl AsRef<str>, action: Action, origin: Origin) -> Result<Self, IndexNowError> {
        Self::new([url], action, origin)
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    /// Always false for a constructed request
    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
