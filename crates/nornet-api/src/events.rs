//! Job-log entries forwarded to an external audit sink

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Grouping key used when the caller does not provide one
pub const DEFAULT_GROUPING: &str = "main";

/// Severity of a job-log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Debug,
    Info,
    Success,
    Warning,
    Failure,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Debug => write!(f, "debug"),
            Severity::Info => write!(f, "info"),
            Severity::Success => write!(f, "success"),
            Severity::Warning => write!(f, "warning"),
            Severity::Failure => write!(f, "failure"),
        }
    }
}

/// One entry in a job result log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobLogEntry {
    /// Entry severity
    pub severity: Severity,
    /// Logical grouping (usually the host name)
    pub grouping: String,
    /// Display form of the subject record, absent for debug entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Message text
    pub message: String,
    /// When the entry was logged
    pub logged_at: DateTime<Utc>,
}

impl JobLogEntry {
    /// Create a new entry stamped with the current time
    pub fn new(
        severity: Severity,
        grouping: impl Into<String>,
        subject: Option<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            grouping: grouping.into(),
            subject,
            message: message.into(),
            logged_at: Utc::now(),
        }
    }
}
