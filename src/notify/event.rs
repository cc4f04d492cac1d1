//! Content change events and the decision whether to act on them

use crate::config::EventsConfig;
use crate::state::Action;
use crate::submit::Origin;
use std::collections::HashSet;

/// What happened to a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEventKind {
    Created,
    Updated,
    Deleted,
}

impl ContentEventKind {
    pub fn action(&self) -> Action {
        match self {
            Self::Created => Action::Create,
            Self::Updated => Action::Update,
            Self::Deleted => Action::Delete,
        }
    }
}

/// A change to one record of a content table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentEvent {
    pub table: String,
    pub record_id: i64,
    pub kind: ContentEventKind,
}

impl ContentEvent {
    pub fn new(table: impl Into<String>, record_id: i64, kind: ContentEventKind) -> Self {
        Self {
            table: table.into(),
            record_id,
            kind,
        }
    }

    pub fn origin(&self) -> Origin {
        Origin::record(self.table.clone(), self.record_id)
    }
}

/// Maps a content event to the public URLs it affects
///
/// For a deleted record the resolver has to work without the record itself.
/// An empty result means the event has no public URL and is skipped.
pub trait UrlResolver: Send + Sync {
    fn resolve(&self, event: &ContentEvent) -> Vec<String>;
}

impl<F> UrlResolver for F
where
    F: Fn(&ContentEvent) -> Vec<String> + Send + Sync,
{
    fn resolve(&self, event: &ContentEvent) -> Vec<String> {
        self(event)
    }
}

/// Lists the public URLs of every record in a content table
///
/// Records without a public URL are left out.
pub trait TableUrlSource {
    fn urls(&self, table: &str) -> Vec<String>;
}

impl<F> TableUrlSource for F
where
    F: Fn(&str) -> Vec<String>,
{
    fn urls(&self, table: &str) -> Vec<String> {
        self(table)
    }
}

/// Decides which content events trigger a submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    auto_submit: bool,
    tables: HashSet<String>,
}

impl EventFilter {
    pub fn new<I, S>(auto_submit: bool, tables: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            auto_submit,
            tables: tables.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_config(config: &EventsConfig) -> Self {
        Self::new(config.auto_submit, config.enabled_tables.iter().cloned())
    }

    /// Returns true if changes to `table` are monitored
    ///
    /// Tables whose name starts with `_` are internal and never monitored.
    pub fn monitors_table(&self, table: &str) -> bool {
        !table.starts_with('_') && self.tables.contains(table)
    }

    pub fn accepts(&self, event: &ContentEvent) -> bool {
        self.auto_submit && event.record_id > 0 && self.monitors_table(&event.table)
    }
}
