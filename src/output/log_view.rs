//! Paged listing of the submission log

use crate::storage::{LogEntry, LogFilter, LogStore, StorageResult};
use chrono::SecondsFormat;

/// One page of log entries plus the totals needed to page through them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogPage {
    pub entries: Vec<LogEntry>,

    /// Entries matching the filter across all pages
    pub total: u64,

    pub page: u32,
    pub per_page: u32,
}

impl LogPage {
    pub fn total_pages(&self) -> u64 {
        if self.total == 0 {
            1
        } else {
            self.total.div_ceil(u64::from(self.per_page))
        }
    }
}

/// Loads the page of entries selected by `filter`
pub fn load_log_page(store: &dyn LogStore, filter: &LogFilter) -> StorageResult<LogPage> {
    Ok(LogPage {
        entries: store.list_entries(filter)?,
        total: store.count_entries(filter)?,
        page: filter.page(),
        per_page: filter.per_page(),
    })
}

/// Formats a page of entries as plain text, one entry per line
pub fn format_log_page(page: &LogPage) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== Submission Log (page {} of {}, {} entries) ===\n\n",
        page.page,
        page.total_pages(),
        page.total
    ));

    if page.entries.is_empty() {
        out.push_str("No submissions found.\n");
        return out;
    }

    for entry in &page.entries {
        let code = entry
            .response_code
            .map(|c| c.to_string())
            .unwrap_or_else(|| "-".to_string());

        out.push_str(&format!(
            "#{:<6} {}  {:<7} {:<15} {:>3}  attempts={}  {}\n",
            entry.id,
            entry.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            entry.action,
            entry.status,
            code,
            entry.attempts,
            entry.url
        ));

        if let Some(message) = &entry.response_message {
            out.push_str(&format!("        {}\n", message));
        }
        if let Some(next) = entry.next_retry {
            out.push_str(&format!(
                "        next retry {}\n",
                next.to_rfc3339_opts(SecondsFormat::Secs, true)
            ));
        }
        if let Some(table) = &entry.origin.table {
            match entry.origin.record_id {
                Some(id) => out.push_str(&format!("        from {} #{}\n", table, id)),
                None => out.push_str(&format!("        from {}\n", table)),
            }
        }
    }

    out
}

/// Prints a page of entries to stdout
pub fn print_log_page(page: &LogPage) {
    print!("{}", format_log_page(page));
}
