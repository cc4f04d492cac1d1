use crate::submit::classify::{classify, response_message, Classification};
use std::fmt;

/// Outcome of one IndexNow request (or one batch of requests)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResult {
    /// True only for HTTP 200 and 202
    pub success: bool,

    /// HTTP status code, or 0 when the request never got a response
    pub code: u16,

    /// Human-readable description
    pub message: String,
}

impl SubmissionResult {
    /// Builds the result for an HTTP response with the given status code
    pub fn from_status(code: u16) -> Self {
        Self {
            success: classify(code).is_success(),
            code,
            message: response_message(code),
        }
    }

    /// Builds the result for a request that failed below HTTP
    /// (DNS, connect, TLS, timeout, redirect limit)
    pub fn connection_error(detail: impl fmt::Display) -> Self {
        Self {
            success: false,
            code: 0,
            message: format!("connection error: {}", detail),
        }
    }

    /// Result returned when there was nothing to submit
    pub fn no_urls() -> Self {
        Self {
            success: false,
            code: 0,
            message: "No URLs provided".to_string(),
        }
    }

    /// Result returned after every chunk of a multi-request batch succeeded
    pub fn all_batches_succeeded() -> Self {
        Self {
            success: true,
            code: 200,
            message: "All URLs submitted successfully".to_string(),
        }
    }

    pub fn classification(&self) -> Classification {
        if self.success {
            Classification::Success
        } else {
            classify(self.code)
        }
    }

    /// Returns true if the failure came from the transport rather than HTTP
    pub fn is_transport_error(&self) -> bool {
        !self.success && self.code == 0
    }
}

impl fmt::Display for SubmissionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}
