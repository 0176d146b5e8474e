//! Credential provider trait

use async_trait::async_trait;
use nornet_api::DeviceRecord;

use crate::error::CredentialError;
use crate::types::{Credentials, ProviderParams};

/// Resolves login credentials for devices
///
/// One instance is shared by every worker of a run, so implementations must
/// be safe for concurrent use.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Resolve `(username, password, secret, key)` for a device
    ///
    /// `extra` carries per-call hints (e.g. `manufacturer`, `platform`)
    /// that take precedence over the record's own values.
    async fn resolve(
        &self,
        device: &DeviceRecord,
        extra: Option<&ProviderParams>,
    ) -> Result<Credentials, CredentialError>;

    /// Provider name for logging
    fn provider_type(&self) -> &'static str;
}
