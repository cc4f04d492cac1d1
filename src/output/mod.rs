//! Output module for reports on the submission log
//!
//! This module handles:
//! - Success / failure statistics per time window
//! - Paged listings of log entries

mod log_view;
pub mod stats;

pub use log_view::{format_log_page, load_log_page, print_log_page, LogPage};
pub use stats::{
    format_statistics, load_statistics, print_statistics, StatusCounts, SubmissionStatistics,
    WindowStarts,
};
