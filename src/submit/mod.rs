//! Submission module: IndexNow requests and their outcomes
//!
//! This module contains:
//! - Response classification (success / retryable / permanent)
//! - The HTTP client with bounded timeouts and redirects
//! - The `Submitter`, which sends single and batched URL submissions
//! - Request and result types shared with the log store and scheduler

mod classify;
mod client;
mod request;
mod result;
mod submitter;

pub use classify::{classify, is_permanent_failure, response_message, Classification};
pub use client::{build_http_client, default_user_agent};
pub use request::{Origin, SubmissionRequest};
pub use result::SubmissionResult;
pub use submitter::Submitter;
