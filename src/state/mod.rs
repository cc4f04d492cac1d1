//! State module for submission log entries
//!
//! # Components
//!
//! - `SubmissionStatus`: lifecycle of a log entry (pending, success, failed, permanent_fail)
//! - `Action`: what triggered a submission (create, update, delete, manual, retry)

mod action;
mod submission_status;

pub use action::Action;
pub use submission_status::SubmissionStatus;
