//! Error types for nornet-exec

use std::time::Duration;

use thiserror::Error;

/// Errors raised by device transports
#[derive(Error, Debug, Clone)]
pub enum TransportError {
    /// Failed to connect to the device
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Authentication was rejected
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Operation timed out
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// Remote command exited non-zero
    #[error("command execution failed: {status} - {stderr}")]
    CommandFailed {
        /// Exit status code
        status: i32,
        /// Stderr output
        stderr: String,
    },

    /// The transport cannot perform the requested operation
    #[error("{transport} transport does not support {operation}")]
    Unsupported {
        /// Transport family
        transport: &'static str,
        /// Requested operation
        operation: String,
    },

    /// HTTP request answered with a non-success status
    #[error("HTTP {status}: {message}")]
    Http {
        /// Status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// HTTP request could not be completed
    #[error("request failed: {0}")]
    Request(String),

    /// A transport-level task failed; `detail` may span several lines
    #[error("{detail}")]
    Subtask {
        /// Full failure detail, last line is the most specific
        detail: String,
    },

    /// I/O error on an established session
    #[error("I/O error: {0}")]
    IoError(String),

    /// Connection not established
    #[error("not connected")]
    NotConnected,

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    ConfigError(String),
}

impl TransportError {
    /// Check if error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::ConnectionFailed(_) | TransportError::Timeout { .. }
        )
    }

    /// Whether the device rejected our credentials
    #[must_use]
    pub fn is_authentication(&self) -> bool {
        matches!(self, TransportError::AuthenticationFailed(_))
    }

    /// Whether the operation ran out of time
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let auth = TransportError::AuthenticationFailed("bad password".to_string());
        assert!(auth.is_authentication());
        assert!(!auth.is_retryable());

        let timeout = TransportError::Timeout {
            timeout: Duration::from_secs(10),
        };
        assert!(timeout.is_timeout());
        assert!(timeout.is_retryable());
    }

    #[test]
    fn test_subtask_displays_detail_verbatim() {
        let err = TransportError::Subtask {
            detail: "Traceback:\n  line 1\nConnectionRefused: port 22".to_string(),
        };
        assert_eq!(
            err.to_string().lines().last(),
            Some("ConnectionRefused: port 22")
        );
    }
}
