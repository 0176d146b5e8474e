//! Driver registry and platform mapping

use std::collections::BTreeMap;
use std::sync::Arc;

use nornet_exec::ApiSession;
use tracing::debug;

use crate::driver::command::COMMAND;
use crate::driver::fortinet::FORTINET;
use crate::driver::generic::GENERIC;
use crate::driver::paloalto::PALOALTO;
use crate::driver::restconf::RESTCONF;
use crate::driver::{
    CommandDriver, Driver, FortinetDriver, GenericDriver, PaloAltoDriver, RestconfDriver,
};
use crate::error::CoreError;

/// Mapping key used when a platform has no entry
pub const DEFAULT_PLATFORM: &str = "default";

/// Drivers available to the dispatcher, by identifier
#[derive(Clone, Default)]
pub struct DriverRegistry {
    drivers: BTreeMap<String, Arc<dyn Driver>>,
}

impl DriverRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the built-in drivers
    ///
    /// The HTTP drivers share `session`.
    #[must_use]
    pub fn with_builtin(session: ApiSession) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(GenericDriver));
        registry.register(Arc::new(CommandDriver));
        registry.register(Arc::new(RestconfDriver::new(session.clone())));
        registry.register(Arc::new(FortinetDriver::new(session.clone())));
        registry.register(Arc::new(PaloAltoDriver::new(session)));
        registry
    }

    /// Registry holding the built-in drivers with a default API session
    ///
    /// # Errors
    /// Returns `CoreError::ConfigError` if the HTTP client cannot be built
    pub fn builtin() -> Result<Self, CoreError> {
        let session = ApiSession::new().map_err(|e| CoreError::ConfigError(e.to_string()))?;
        Ok(Self::with_builtin(session))
    }

    /// Register a driver under its own name, replacing any previous one
    pub fn register(&mut self, driver: Arc<dyn Driver>) {
        debug!(driver = driver.name(), "registering driver");
        self.drivers.insert(driver.name().to_string(), driver);
    }

    /// Driver by identifier
    #[must_use]
    pub fn get(&self, id: &str) -> Option<Arc<dyn Driver>> {
        self.drivers.get(id).cloned()
    }

    /// Whether a driver is registered
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.drivers.contains_key(id)
    }

    /// Registered identifiers, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.drivers.keys().map(String::as_str)
    }
}

impl std::fmt::Debug for DriverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverRegistry")
            .field("drivers", &self.drivers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Platform identifier to driver identifier mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriverMapping {
    entries: BTreeMap<String, String>,
}

impl DriverMapping {
    /// Mapping without any entries
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Built-in platform mapping
    #[must_use]
    pub fn builtin() -> Self {
        let entries = [
            (DEFAULT_PLATFORM, GENERIC),
            ("default_netmiko", COMMAND),
            ("arista_eos", GENERIC),
            ("cisco_aireos", COMMAND),
            ("cisco_asa", COMMAND),
            ("cisco_ios", GENERIC),
            ("cisco_ios_restconf", RESTCONF),
            ("cisco_nxos", GENERIC),
            ("cisco_wlc", COMMAND),
            ("cisco_xr", GENERIC),
            ("fortinet_fortios", FORTINET),
            ("juniper_junos", GENERIC),
            ("netscaler", COMMAND),
            ("paloalto_panos", PALOALTO),
        ]
        .into_iter()
        .map(|(platform, driver)| (platform.to_string(), driver.to_string()))
        .collect();

        Self { entries }
    }

    /// Merge caller entries on top; caller entries win
    #[must_use]
    pub fn with_overrides<I, K, V>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (platform, driver) in overrides {
            self.entries.insert(platform.into(), driver.into());
        }
        self
    }

    /// Driver for a platform, falling back to the `default` entry
    #[must_use]
    pub fn resolve(&self, platform: &str) -> Option<&str> {
        self.entries
            .get(platform)
            .or_else(|| self.entries.get(DEFAULT_PLATFORM))
            .map(String::as_str)
    }

    /// Driver mapped for exactly this platform
    #[must_use]
    pub fn get(&self, platform: &str) -> Option<&str> {
        self.entries.get(platform).map(String::as_str)
    }

    /// Entries sorted by platform
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(platform, driver)| (platform.as_str(), driver.as_str()))
    }

    /// Check that every entry names a registered driver
    ///
    /// # Errors
    /// Returns `CoreError::DriverUnresolvable` for the first unknown driver
    pub fn validate(&self, registry: &DriverRegistry) -> Result<(), CoreError> {
        match self
            .entries
            .values()
            .find(|driver| !registry.contains(driver))
        {
            Some(driver) => Err(CoreError::DriverUnresolvable(driver.clone())),
            None => Ok(()),
        }
    }
}

impl Default for DriverMapping {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DriverRegistry {
        DriverRegistry::builtin().unwrap()
    }

    #[test]
    fn test_builtin_mapping_is_valid() {
        let mapping = DriverMapping::builtin();
        assert!(mapping.validate(&registry()).is_ok());
        assert_eq!(mapping.resolve("cisco_ios"), Some("generic"));
        assert_eq!(mapping.resolve("cisco_asa"), Some("command"));
        assert_eq!(mapping.resolve("paloalto_panos"), Some("paloalto_panos"));
    }

    #[test]
    fn test_unknown_platform_falls_back_to_default() {
        let mapping = DriverMapping::builtin();
        assert_eq!(mapping.resolve("mikrotik_routeros"), Some("generic"));
        assert_eq!(mapping.get("mikrotik_routeros"), None);
        assert_eq!(DriverMapping::empty().resolve("cisco_ios"), None);
    }

    #[test]
    fn test_overrides_replace_builtin() {
        let mapping = DriverMapping::builtin()
            .with_overrides([("cisco_ios", "command"), ("mikrotik_routeros", "command")]);

        assert_eq!(mapping.resolve("cisco_ios"), Some("command"));
        assert_eq!(mapping.resolve("mikrotik_routeros"), Some("command"));
        assert_eq!(mapping.resolve("arista_eos"), Some("generic"));
    }

    #[test]
    fn test_validate_rejects_unregistered_driver() {
        let mapping = DriverMapping::builtin().with_overrides([("cisco_ios", "vendor_magic")]);
        let err = mapping.validate(&registry()).unwrap_err();
        assert!(matches!(err, CoreError::DriverUnresolvable(ref d) if d == "vendor_magic"));
    }

    #[test]
    fn test_registry_names() {
        let reg = registry();
        let names: Vec<&str> = reg.names().collect();
        assert_eq!(
            names,
            vec![
                "cisco_ios_restconf",
                "command",
                "fortinet_fortios",
                "generic",
                "paloalto_panos"
            ]
        );
    }
}
