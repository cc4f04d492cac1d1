//! Response classification for IndexNow submissions
//!
//! | Code | Classification |
//! |------|----------------|
//! | 200, 202 | Success |
//! | 400, 403, 422 | Permanent (bad request, invalid key, host mismatch) |
//! | 0 (transport failure), 429, 5xx | Retryable |
//! | anything else | Retryable |

use crate::state::SubmissionStatus;

/// How a response code should be treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    /// The endpoint accepted the submission
    Success,

    /// A transient condition; an identical retry may succeed
    Retryable,

    /// The request itself is invalid; retrying cannot succeed
    Permanent,
}

impl Classification {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable)
    }

    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Permanent)
    }

    /// Log status recorded for an attempt with this outcome
    pub fn status(&self) -> SubmissionStatus {
        match self {
            Self::Success => SubmissionStatus::Success,
            Self::Retryable => SubmissionStatus::Failed,
            Self::Permanent => SubmissionStatus::PermanentFail,
        }
    }
}

/// Codes the endpoint uses to reject a request as malformed or unauthorized
const PERMANENT_FAILURE_CODES: [u16; 3] = [400, 403, 422];

/// Classifies an HTTP status code (0 for transport failure)
///
/// Codes outside the success and permanent sets are retryable, so an
/// unexpected response costs a bounded number of retries rather than a
/// silently dropped URL.
///
/// # Examples
///
/// ```
/// use indexnow_notify::{classify, Classification};
///
/// assert_eq!(classify(202), Classification::Success);
/// assert_eq!(classify(422), Classification::Permanent);
/// assert_eq!(classify(0), Classification::Retryable);
/// ```
pub fn classify(code: u16) -> Classification {
    match code {
        200 | 202 => Classification::Success,
        c if PERMANENT_FAILURE_CODES.contains(&c) => Classification::Permanent,
        _ => Classification::Retryable,
    }
}

/// Returns true if `code` must never be retried
pub fn is_permanent_failure(code: u16) -> bool {
    classify(code).is_permanent()
}

/// Human-readable description of an IndexNow response code
pub fn response_message(code: u16) -> String {
    let known = match code {
        200 => Some("URL submitted successfully"),
        202 => Some("URL received, pending processing"),
        400 => Some("Bad Request - Invalid format"),
        403 => Some("Forbidden - API key not valid for this URL"),
        422 => Some("Unprocessable Entity - URLs do not belong to host"),
        429 => Some("Too Many Requests - Rate limited"),
        500 => Some("Internal Server Error"),
        502 => Some("Bad Gateway"),
        503 => Some("Service Unavailable"),
        _ => None,
    };

    match known {
        Some(message) => message.to_string(),
        None if code >= 500 => format!("Server Error (HTTP {})", code),
        None if code >= 400 => format!("Client Error (HTTP {})", code),
        None => format!("Unknown response (HTTP {})", code),
    }
}
