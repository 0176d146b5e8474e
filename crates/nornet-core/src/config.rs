//! Run settings

use std::collections::BTreeMap;
use std::path::PathBuf;

use nornet_inventory::{ConnectionOptionsTree, DeviceFilter};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CoreError;
use crate::registry::DriverMapping;

/// Hosts processed at once unless configured otherwise
pub const DEFAULT_NUM_WORKERS: usize = 20;

/// Settings for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Where device records come from
    #[serde(default)]
    pub inventory: InventorySettings,
    /// Credential provider name
    #[serde(default = "default_credentials")]
    pub credentials: String,
    /// Credential provider parameters
    #[serde(default)]
    pub credentials_params: Option<Value>,
    /// Worker pool settings
    #[serde(default)]
    pub runner: RunnerSettings,
    /// Global connection options; the default transports when unset
    #[serde(default)]
    pub connection_options: Option<ConnectionOptionsTree>,
    /// Platform to driver overrides
    #[serde(default)]
    pub dispatcher_mapping: BTreeMap<String, String>,
    /// Address hosts by `<name>.<fqdn>`
    #[serde(default)]
    pub use_fqdn: bool,
    /// Domain suffix used with `use_fqdn`
    #[serde(default)]
    pub fqdn: Option<String>,
    /// Forward debug messages to the job log
    #[serde(default)]
    pub debug: bool,
    /// Process log filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Job log file (JSON lines); no job log when unset
    #[serde(default)]
    pub job_log: Option<PathBuf>,
}

fn default_credentials() -> String {
    "env_vars".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            inventory: InventorySettings::default(),
            credentials: default_credentials(),
            credentials_params: None,
            runner: RunnerSettings::default(),
            connection_options: None,
            dispatcher_mapping: BTreeMap::new(),
            use_fqdn: false,
            fqdn: None,
            debug: false,
            log_level: default_log_level(),
            job_log: None,
        }
    }
}

impl Settings {
    /// Domain suffix to address hosts by, if enabled
    ///
    /// # Errors
    /// Returns `CoreError::ConfigError` if `use_fqdn` is set without `fqdn`
    pub fn fqdn_suffix(&self) -> Result<Option<&str>, CoreError> {
        if !self.use_fqdn {
            return Ok(None);
        }
        match self.fqdn.as_deref().filter(|f| !f.is_empty()) {
            Some(fqdn) => Ok(Some(fqdn)),
            None => Err(CoreError::ConfigError(
                "use_fqdn is set but fqdn is empty".to_string(),
            )),
        }
    }

    /// Built-in mapping with the configured overrides
    #[must_use]
    pub fn driver_mapping(&self) -> DriverMapping {
        DriverMapping::builtin().with_overrides(self.dispatcher_mapping.clone())
    }

    /// Global connection options
    #[must_use]
    pub fn connection_options(&self) -> ConnectionOptionsTree {
        self.connection_options
            .clone()
            .unwrap_or_else(ConnectionOptionsTree::with_default_transports)
    }
}

/// Asset source settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySettings {
    /// JSON export of device records
    #[serde(default)]
    pub assets: Option<PathBuf>,
    /// Record filter
    #[serde(default)]
    pub filter: DeviceFilter,
}

/// Worker pool settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunnerSettings {
    /// Pool options
    #[serde(default)]
    pub options: RunnerOptions,
}

/// Worker pool options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerOptions {
    /// Hosts processed at once
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,
}

fn default_num_workers() -> usize {
    DEFAULT_NUM_WORKERS
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            num_workers: DEFAULT_NUM_WORKERS,
        }
    }
}
