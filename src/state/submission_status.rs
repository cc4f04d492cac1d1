/// Submission status definitions for log entries
///
/// A log entry starts in the status derived from its first attempt and is
/// moved by the retry scheduler until it reaches a terminal status.
use std::fmt;
use std::str::FromStr;

/// Represents the current status of a submission log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubmissionStatus {
    /// Reserved; no current flow writes it
    Pending,

    /// Endpoint accepted the URL (HTTP 200 or 202)
    Success,

    /// Retryable failure awaiting the next sweep
    Failed,

    /// Rejected as invalid, or retries exhausted
    PermanentFail,
}

impl SubmissionStatus {
    /// Returns true if no further attempt will be made for this entry
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::PermanentFail)
    }

    /// Returns true if this status counts as a failure in statistics
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::PermanentFail)
    }

    /// Converts the status to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::PermanentFail => "permanent_fail",
        }
    }

    /// Parses a status from its database string representation
    ///
    /// Returns None if the string doesn't match any known status.
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            "permanent_fail" => Some(Self::PermanentFail),
            _ => None,
        }
    }

    /// Returns all possible statuses
    pub fn all_statuses() -> Vec<Self> {
        vec![
            Self::Pending,
            Self::Success,
            Self::Failed,
            Self::PermanentFail,
        ]
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.to_db_string())
    }
}

impl FromStr for SubmissionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_db_string(&s.to_ascii_lowercase())
            .ok_or_else(|| format!("unknown status '{}'", s))
    }
}
