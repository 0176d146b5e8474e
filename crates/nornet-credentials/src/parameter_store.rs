//! Credentials looked up in a remote parameter store
//!
//! Parameter names follow the layout
//!
//! ```text
//! /netbox/<device>/{username,password,secret,key}
//! /netbox/<manufacturer>_<platform>/{username,password,secret,key}
//! /netbox/device_default/{username,password,secret,key}
//! ```
//!
//! Device paths win over manufacturer/platform paths. The default paths are
//! only consulted when the store knows none of the device-scoped names.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use nornet_api::DeviceRecord;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::CredentialError;
use crate::traits::CredentialProvider;
use crate::types::{Credentials, ProviderParams};

/// Root of every credential parameter
pub const PARAMETER_PREFIX: &str = "/netbox";
/// Scope holding fleet-wide fallback credentials
pub const DEFAULT_SCOPE: &str = "device_default";

const FIELDS: [&str; 4] = ["username", "password", "secret", "key"];

/// A named value returned by the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parameter {
    /// Full parameter name
    pub name: String,
    /// Decrypted value
    pub value: String,
}

impl Parameter {
    /// Create a parameter
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Key-value secret backend
///
/// Names the store does not know are simply absent from the answer.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Fetch the given parameters in a single call
    async fn get_parameters(
        &self,
        names: &[String],
        with_decryption: bool,
    ) -> Result<Vec<Parameter>, CredentialError>;
}

/// Parameter-store backed credential provider
#[derive(Clone)]
pub struct ParameterStoreProvider {
    store: Arc<dyn ParameterStore>,
    prefix: String,
}

impl ParameterStoreProvider {
    /// Create a provider over a store
    pub fn new(store: Arc<dyn ParameterStore>) -> Self {
        Self {
            store,
            prefix: PARAMETER_PREFIX.to_string(),
        }
    }

    /// Use a different name prefix
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    fn scoped_names(&self, scope: &str) -> impl Iterator<Item = String> + '_ {
        let scope = scope.to_string();
        FIELDS
            .iter()
            .map(move |field| format!("{}/{scope}/{field}", self.prefix))
    }

    /// Ordered parameter names for a device
    ///
    /// Class paths are skipped when manufacturer or platform is unknown.
    #[must_use]
    pub fn build_parameter_names(
        &self,
        device_name: &str,
        manufacturer: Option<&str>,
        platform: Option<&str>,
    ) -> Vec<String> {
        let mut names: Vec<String> = self.scoped_names(device_name).collect();
        if let (Some(manufacturer), Some(platform)) = (manufacturer, platform) {
            let class = format!("{}_{}", manufacturer.to_lowercase(), platform.to_lowercase());
            names.extend(self.scoped_names(&class));
        }
        names
    }

    /// Fleet-wide fallback parameter names
    #[must_use]
    pub fn default_parameter_names(&self) -> Vec<String> {
        self.scoped_names(DEFAULT_SCOPE).collect()
    }

    /// First value among `names` (in order) ending in `/field`
    fn lookup(names: &[String], found: &HashMap<String, String>, field: &str) -> Option<String> {
        names
            .iter()
            .filter(|name| name.rsplit('/').next() == Some(field))
            .find_map(|name| found.get(name).cloned())
    }
}

fn hint<'a>(extra: Option<&'a ProviderParams>, key: &str) -> Option<&'a str> {
    extra?.get(key).and_then(Value::as_str)
}

#[async_trait]
impl CredentialProvider for ParameterStoreProvider {
    #[instrument(skip_all, fields(device = %device.name))]
    async fn resolve(
        &self,
        device: &DeviceRecord,
        extra: Option<&ProviderParams>,
    ) -> Result<Credentials, CredentialError> {
        let manufacturer = hint(extra, "manufacturer").or(Some(device.manufacturer()));
        let platform = hint(extra, "platform")
            .or_else(|| device.platform.as_ref().map(|p| p.slug.as_str()));

        let mut names = self.build_parameter_names(&device.name, manufacturer, platform);
        let mut parameters = self.store.get_parameters(&names, true).await?;

        if parameters.is_empty() {
            debug!("no device-scoped parameters, falling back to defaults");
            names = self.default_parameter_names();
            parameters = self.store.get_parameters(&names, true).await?;
        }

        let found: HashMap<String, String> =
            parameters.into_iter().map(|p| (p.name, p.value)).collect();

        debug!(matched = found.len(), "resolved credentials from parameter store");

        Ok(Credentials::new(
            Self::lookup(&names, &found, "username"),
            Self::lookup(&names, &found, "password"),
            Self::lookup(&names, &found, "secret"),
            Self::lookup(&names, &found, "key"),
        ))
    }

    fn provider_type(&self) -> &'static str {
        "parameter_store"
    }
}
