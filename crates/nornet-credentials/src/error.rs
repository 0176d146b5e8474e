//! Error types for nornet-credentials

use thiserror::Error;

/// Errors that can occur while resolving credentials
#[derive(Error, Debug, Clone)]
pub enum CredentialError {
    /// Provider parameters are malformed
    #[error("invalid credentials configuration: {0}")]
    Config(String),

    /// No provider is registered under the configured name
    #[error("unknown credentials provider `{0}`")]
    UnknownProvider(String),

    /// The remote secret store call failed
    #[error("secret store error: {0}")]
    RemoteStore(String),
}

impl CredentialError {
    /// Whether the error stems from configuration rather than runtime state
    #[must_use]
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            CredentialError::Config(_) | CredentialError::UnknownProvider(_)
        )
    }
}
