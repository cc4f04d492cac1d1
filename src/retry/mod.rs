//! Retry module for failed submissions
//!
//! # Components
//!
//! - `RetryPolicy`: whether to retry, how often and how many times
//! - `RetryScheduler`: the sweep that re-submits due entries
//! - `decide`: the state transition applied after each retry attempt

mod policy;
mod scheduler;

pub use policy::{RetryPolicy, DEFAULT_RETRY_INTERVAL_HOURS};
pub use scheduler::{decide, RetryScheduler, SweepReport, Transition};
