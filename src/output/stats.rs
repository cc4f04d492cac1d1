//! Submission statistics from the log
//!
//! Counts are grouped into the windows today, this week (from Monday),
//! this month, and all time. Window boundaries are midnight UTC.

use crate::state::SubmissionStatus;
use crate::storage::{LogStore, StorageResult};
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc};

/// Counts for one time window
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub success: u64,

    /// Failed and permanently failed entries together
    pub failed: u64,

    pub pending: u64,
}

impl StatusCounts {
    pub fn total(&self) -> u64 {
        self.success + self.failed + self.pending
    }
}

/// Submission statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionStatistics {
    pub today: StatusCounts,
    pub week: StatusCounts,
    pub month: StatusCounts,
    pub total: StatusCounts,
}

/// Start of each window containing `now`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowStarts {
    pub today: DateTime<Utc>,
    pub week: DateTime<Utc>,
    pub month: DateTime<Utc>,
}

impl WindowStarts {
    pub fn at(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let week = today - Duration::days(i64::from(today.weekday().num_days_from_monday()));
        let month = today.with_day(1).unwrap_or(today);

        let midnight = |date: chrono::NaiveDate| date.and_time(NaiveTime::MIN).and_utc();

        Self {
            today: midnight(today),
            week: midnight(week),
            month: midnight(month),
        }
    }
}

fn count_window(store: &dyn LogStore, since: Option<DateTime<Utc>>) -> StorageResult<StatusCounts> {
    Ok(StatusCounts {
        success: store.count_by_status_since(&[SubmissionStatus::Success], since)?,
        failed: store.count_by_status_since(
            &[SubmissionStatus::Failed, SubmissionStatus::PermanentFail],
            since,
        )?,
        pending: store.count_by_status_since(&[SubmissionStatus::Pending], since)?,
    })
}

/// Loads statistics from the log
///
/// # Arguments
///
/// * `store` - The log store to query
/// * `now` - Reference time for the windows
pub fn load_statistics(
    store: &dyn LogStore,
    now: DateTime<Utc>,
) -> StorageResult<SubmissionStatistics> {
    let starts = WindowStarts::at(now);

    Ok(SubmissionStatistics {
        today: count_window(store, Some(starts.today))?,
        week: count_window(store, Some(starts.week))?,
        month: count_window(store, Some(starts.month))?,
        total: count_window(store, None)?,
    })
}

/// Formats statistics as a plain-text table
pub fn format_statistics(stats: &SubmissionStatistics) -> String {
    let mut out = String::new();

    out.push_str("=== Submission Statistics ===\n\n");
    out.push_str(&format!(
        "  {:<10} {:>9} {:>9} {:>9}\n",
        "", "Success", "Failed", "Pending"
    ));

    for (label, counts) in [
        ("Today", &stats.today),
        ("This week", &stats.week),
        ("This month", &stats.month),
        ("All time", &stats.total),
    ] {
        out.push_str(&format!(
            "  {:<10} {:>9} {:>9} {:>9}\n",
            label, counts.success, counts.failed, counts.pending
        ));
    }

    let total = stats.total.total();
    if total > 0 {
        let rate = stats.total.success as f64 / total as f64 * 100.0;
        out.push_str(&format!(
            "\nSuccess Rate: {:.1}% ({} / {} submissions)\n",
            rate, stats.total.success, total
        ));
    }

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &SubmissionStatistics) {
    print!("{}", format_statistics(stats));
}
