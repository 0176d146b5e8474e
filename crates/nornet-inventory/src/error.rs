//! Error types for nornet-inventory

use nornet_credentials::CredentialError;
use thiserror::Error;

/// Errors that can occur while building an inventory
#[derive(Error, Debug, Clone)]
pub enum InventoryError {
    /// A device record has no platform assigned
    #[error("platform missing from device {device}, preemptively failed")]
    MissingPlatform {
        /// Device name
        device: String,
    },

    /// Credential resolution failed
    #[error(transparent)]
    Credentials(#[from] CredentialError),

    /// A host or group references a group that does not exist
    #[error("group `{group}` referenced by `{referenced_by}` does not exist")]
    UnknownGroup {
        /// Missing group
        group: String,
        /// Host or group holding the reference
        referenced_by: String,
    },

    /// Group parents form a cycle
    #[error("group `{0}` is its own ancestor")]
    GroupCycle(String),

    /// The asset source could not be read
    #[error("asset source error: {0}")]
    Source(String),

    /// Asset records could not be parsed
    #[error("parse error: {0}")]
    ParseError(String),

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    ConfigError(String),
}

impl InventoryError {
    /// Whether the error is tied to one device's data
    #[must_use]
    pub fn is_device_data(&self) -> bool {
        matches!(self, InventoryError::MissingPlatform { .. })
    }

    /// Whether the error stems from configuration
    #[must_use]
    pub fn is_config(&self) -> bool {
        match self {
            InventoryError::ConfigError(_) => true,
            InventoryError::Credentials(e) => e.is_config(),
            _ => false,
        }
    }
}
