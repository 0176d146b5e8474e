//! Core error types for nornet-core

use nornet_credentials::CredentialError;
use nornet_exec::TransportError;
use nornet_inventory::InventoryError;
use thiserror::Error;

use crate::state::DispatchState;

/// Error classification callers branch on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unresolvable provider or driver reference, malformed parameters
    Configuration,
    /// A device record is missing required data
    DeviceData,
    /// No driver or method for a host's dispatch call
    DriverResolution,
    /// The device or its transport failed
    Transport,
    /// The secret backend failed
    RemoteStore,
}

/// Errors that can occur in core operations
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Neither a platform driver nor a default driver is mapped
    #[error("unable to find the driver for {operation} for platform: {platform}, preemptively failed")]
    DriverNotFound {
        /// Requested operation
        operation: String,
        /// Host platform
        platform: String,
    },

    /// The mapping names a driver that is not registered
    #[error("unable to locate the driver {0}, preemptively failed")]
    DriverUnresolvable(String),

    /// The operation name does not match any driver capability
    #[error("unable to locate the method {method} for {driver}, preemptively failed")]
    MethodNotFound {
        /// Requested operation
        method: String,
        /// Resolved driver
        driver: String,
    },

    /// The driver does not implement the capability
    #[error("{method} is not implemented for {driver}")]
    NotImplemented {
        /// Requested operation
        method: String,
        /// Resolved driver
        driver: String,
    },

    /// The operation failed on the device
    #[error("Subtask failed: {0}")]
    SubtaskFailed(String),

    /// Invalid dispatch state transition
    #[error("invalid state transition from {from} to {to}")]
    InvalidTransition {
        /// Current state
        from: DispatchState,
        /// Attempted target state
        to: DispatchState,
    },

    /// Inventory construction failed
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Opening a connection failed
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A worker task ended abnormally
    #[error("worker failed: {0}")]
    Worker(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl CoreError {
    /// Classification of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::DriverNotFound { .. }
            | CoreError::MethodNotFound { .. }
            | CoreError::NotImplemented { .. } => ErrorKind::DriverResolution,
            CoreError::DriverUnresolvable(_) | CoreError::ConfigError(_) => {
                ErrorKind::Configuration
            }
            CoreError::SubtaskFailed(_)
            | CoreError::Transport(_)
            | CoreError::InvalidTransition { .. }
            | CoreError::Worker(_) => ErrorKind::Transport,
            CoreError::Inventory(InventoryError::MissingPlatform { .. }) => ErrorKind::DeviceData,
            CoreError::Inventory(InventoryError::Credentials(CredentialError::RemoteStore(_))) => {
                ErrorKind::RemoteStore
            }
            CoreError::Inventory(_) => ErrorKind::Configuration,
        }
    }

    /// Whether the error only affects one host
    #[must_use]
    pub fn is_host_scoped(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::DriverResolution | ErrorKind::Transport
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let err = CoreError::Inventory(InventoryError::MissingPlatform {
            device: "SW1".to_string(),
        });
        assert_eq!(err.kind(), ErrorKind::DeviceData);

        let err = CoreError::Inventory(InventoryError::Credentials(
            CredentialError::RemoteStore("throttled".to_string()),
        ));
        assert_eq!(err.kind(), ErrorKind::RemoteStore);

        let err = CoreError::Inventory(InventoryError::Credentials(
            CredentialError::UnknownProvider("vault".to_string()),
        ));
        assert_eq!(err.kind(), ErrorKind::Configuration);

        assert_eq!(
            CoreError::DriverUnresolvable("nope".to_string()).kind(),
            ErrorKind::Configuration
        );
        assert!(CoreError::SubtaskFailed("boom".to_string()).is_host_scoped());
    }

    #[test]
    fn test_subtask_message() {
        let err = CoreError::SubtaskFailed("HTTP 401: Unauthorized".to_string());
        assert_eq!(err.to_string(), "Subtask failed: HTTP 401: Unauthorized");
    }
}
