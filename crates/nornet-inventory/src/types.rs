//! Inventory types

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use nornet_api::DeviceRecord;
use serde_json::{Map, Value};

use crate::options::{ConnectionOptionsTree, TransportOptions};

/// Default management port
pub const DEFAULT_PORT: u16 = 22;

/// Inventory-wide fallback values
#[derive(Clone, Default, PartialEq)]
pub struct Defaults {
    /// Fallback hostname
    pub hostname: Option<String>,
    /// Fallback port
    pub port: Option<u16>,
    /// Fallback username
    pub username: Option<String>,
    /// Fallback password
    pub password: Option<String>,
    /// Fallback platform
    pub platform: Option<String>,
    /// Fallback data
    pub data: Map<String, Value>,
    /// Fallback connection options
    pub connection_options: ConnectionOptionsTree,
}

impl fmt::Debug for Defaults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Defaults")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("platform", &self.platform)
            .field("data", &self.data.keys().collect::<Vec<_>>())
            .field("connection_options", &self.connection_options)
            .finish()
    }
}

/// Named group of hosts
///
/// Derived groups carry no data of their own beyond the shared defaults;
/// parents exist for nested declarations.
#[derive(Debug, Clone)]
pub struct Group {
    name: String,
    groups: Vec<Arc<Group>>,
    defaults: Arc<Defaults>,
}

impl Group {
    /// Create a group without parents
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
            defaults: Arc::default(),
        }
    }

    /// Set parent groups
    #[must_use]
    pub fn with_parents(mut self, groups: Vec<Arc<Group>>) -> Self {
        self.groups = groups;
        self
    }

    /// Share the run's defaults
    #[must_use]
    pub fn with_defaults(mut self, defaults: Arc<Defaults>) -> Self {
        self.defaults = defaults;
        self
    }

    /// Group name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run defaults
    #[must_use]
    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Direct parents
    #[must_use]
    pub fn parents(&self) -> &[Arc<Group>] {
        &self.groups
    }

    /// Whether `name` is this group or one of its ancestors
    #[must_use]
    pub fn is_or_descends_from(&self, name: &str) -> bool {
        self.name == name || self.groups.iter().any(|g| g.is_or_descends_from(name))
    }
}

/// Device data carried by a host
#[derive(Clone)]
pub struct HostData {
    /// Asset database identifier
    pub id: u64,
    /// Device type slug
    pub device_type: String,
    /// Site slug
    pub site: String,
    /// Role slug
    pub role: String,
    /// Privileged-mode secret
    pub secret: Option<String>,
    /// Enable password
    pub enable_password: Option<String>,
    /// API key
    pub key: Option<String>,
    /// Source record
    pub record: Arc<DeviceRecord>,
}

impl HostData {
    /// Data derived from a record, without secrets
    #[must_use]
    pub fn from_record(record: Arc<DeviceRecord>) -> Self {
        Self {
            id: record.id,
            device_type: record.device_type.slug.clone(),
            site: record.site.slug.clone(),
            role: record.role.slug.clone(),
            secret: None,
            enable_password: None,
            key: None,
            record,
        }
    }
}

impl fmt::Debug for HostData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostData")
            .field("id", &self.id)
            .field("device_type", &self.device_type)
            .field("site", &self.site)
            .field("role", &self.role)
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field(
                "enable_password",
                &self.enable_password.as_ref().map(|_| "<redacted>"),
            )
            .field("key", &self.key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

/// A managed device ready for tasks
///
/// Hosts are immutable once placed in an inventory.
#[derive(Clone)]
pub struct Host {
    name: String,
    hostname: String,
    port: u16,
    platform: String,
    username: Option<String>,
    password: Option<String>,
    data: HostData,
    group_names: Vec<String>,
    groups: Vec<Arc<Group>>,
    connection_options: ConnectionOptionsTree,
    defaults: Arc<Defaults>,
}

impl Host {
    /// Create a host for a record
    pub fn new(
        record: Arc<DeviceRecord>,
        hostname: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            name: record.name.clone(),
            hostname: hostname.into(),
            port: DEFAULT_PORT,
            platform: platform.into(),
            username: None,
            password: None,
            data: HostData::from_record(record),
            group_names: Vec::new(),
            groups: Vec::new(),
            connection_options: ConnectionOptionsTree::new(),
            defaults: Arc::new(Defaults::default()),
        }
    }

    /// Set port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set login credentials
    #[must_use]
    pub fn with_login(mut self, username: Option<String>, password: Option<String>) -> Self {
        self.username = username;
        self.password = password;
        self
    }

    /// Set secret, enable password and API key
    #[must_use]
    pub fn with_secrets(
        mut self,
        secret: Option<String>,
        enable_password: Option<String>,
        key: Option<String>,
    ) -> Self {
        self.data.secret = secret;
        self.data.enable_password = enable_password;
        self.data.key = key;
        self
    }

    /// Set group names; parents are attached when the inventory resolves them
    #[must_use]
    pub fn with_group_names(mut self, names: Vec<String>) -> Self {
        self.group_names = names;
        self
    }

    /// Attach resolved parent groups
    #[must_use]
    pub fn with_groups(mut self, groups: Vec<Arc<Group>>) -> Self {
        self.groups = groups;
        self
    }

    /// Set connection options
    #[must_use]
    pub fn with_connection_options(mut self, options: ConnectionOptionsTree) -> Self {
        self.connection_options = options;
        self
    }

    /// Set inventory defaults
    #[must_use]
    pub fn with_defaults(mut self, defaults: Arc<Defaults>) -> Self {
        self.defaults = defaults;
        self
    }

    /// Unique host name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Address used to reach the device
    #[must_use]
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Management port
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Platform driver identifier
    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Login username, falling back to the inventory defaults
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.username
            .as_deref()
            .or(self.defaults.username.as_deref())
    }

    /// Login password, falling back to the inventory defaults
    #[must_use]
    pub fn password(&self) -> Option<&str> {
        self.password
            .as_deref()
            .or(self.defaults.password.as_deref())
    }

    /// Device data
    #[must_use]
    pub fn data(&self) -> &HostData {
        &self.data
    }

    /// Group names in membership order
    #[must_use]
    pub fn group_names(&self) -> &[String] {
        &self.group_names
    }

    /// Resolved parent groups
    #[must_use]
    pub fn groups(&self) -> &[Arc<Group>] {
        &self.groups
    }

    /// Connection options tree
    #[must_use]
    pub fn connection_options(&self) -> &ConnectionOptionsTree {
        &self.connection_options
    }

    /// Whether the host belongs to `name` directly or through a parent
    #[must_use]
    pub fn has_parent_group(&self, name: &str) -> bool {
        self.groups.iter().any(|g| g.is_or_descends_from(name))
    }

    /// Effective options for a transport
    ///
    /// The host's stanza wins over the inventory defaults. Unset typed
    /// fields fall back to the host's own.
    #[must_use]
    pub fn connection_parameters(&self, transport: &str) -> TransportOptions {
        let mut options = self
            .connection_options
            .get(transport)
            .or_else(|| self.defaults.connection_options.get(transport))
            .cloned()
            .unwrap_or_default();

        options.hostname.get_or_insert_with(|| self.hostname.clone());
        options.port.get_or_insert(self.port);
        options.platform.get_or_insert_with(|| self.platform.clone());
        if options.username.is_none() {
            options.username = self.username().map(str::to_string);
        }
        if options.password.is_none() {
            options.password = self.password().map(str::to_string);
        }
        options
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("name", &self.name)
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("platform", &self.platform)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("data", &self.data)
            .field("groups", &self.group_names)
            .field("connection_options", &self.connection_options)
            .finish()
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Hosts and groups for one run
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    hosts: IndexMap<String, Arc<Host>>,
    groups: IndexMap<String, Arc<Group>>,
    defaults: Arc<Defaults>,
}

impl Inventory {
    /// Assemble an inventory
    #[must_use]
    pub fn new(
        hosts: IndexMap<String, Arc<Host>>,
        groups: IndexMap<String, Arc<Group>>,
        defaults: Arc<Defaults>,
    ) -> Self {
        Self {
            hosts,
            groups,
            defaults,
        }
    }

    /// Inventory over the given hosts, without groups
    #[must_use]
    pub fn from_hosts(hosts: impl IntoIterator<Item = Host>) -> Self {
        let hosts = hosts
            .into_iter()
            .map(|host| (host.name().to_string(), Arc::new(host)))
            .collect();
        Self {
            hosts,
            ..Self::default()
        }
    }

    /// Hosts in record order
    #[must_use]
    pub fn hosts(&self) -> &IndexMap<String, Arc<Host>> {
        &self.hosts
    }

    /// Groups in first-reference order
    #[must_use]
    pub fn groups(&self) -> &IndexMap<String, Arc<Group>> {
        &self.groups
    }

    /// Inventory defaults
    #[must_use]
    pub fn defaults(&self) -> &Defaults {
        &self.defaults
    }

    /// Host by name
    #[must_use]
    pub fn host(&self, name: &str) -> Option<&Arc<Host>> {
        self.hosts.get(name)
    }

    /// Group by name
    #[must_use]
    pub fn group(&self, name: &str) -> Option<&Arc<Group>> {
        self.groups.get(name)
    }

    /// Number of hosts
    #[must_use]
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    /// Whether the inventory has no hosts
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    /// Inventory restricted to hosts matching a predicate
    #[must_use]
    pub fn filter<F>(&self, predicate: F) -> Self
    where
        F: Fn(&Host) -> bool,
    {
        Self {
            hosts: self
                .hosts
                .iter()
                .filter(|(_, host)| predicate(host))
                .map(|(name, host)| (name.clone(), Arc::clone(host)))
                .collect(),
            groups: self.groups.clone(),
            defaults: Arc::clone(&self.defaults),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nornet_api::DeviceTypeRecord;

    fn record(name: &str) -> Arc<DeviceRecord> {
        Arc::new(DeviceRecord::new(
            1,
            name,
            DeviceTypeRecord::new("c9300", "cisco"),
            "lon1",
            "access",
        ))
    }

    #[test]
    fn test_has_parent_group_is_transitive() {
        let region = Arc::new(Group::new("region__emea"));
        let site = Arc::new(Group::new("site__lon1").with_parents(vec![region]));
        let host = Host::new(record("SW1"), "10.0.0.5", "cisco_ios").with_groups(vec![site]);

        assert!(host.has_parent_group("site__lon1"));
        assert!(host.has_parent_group("region__emea"));
        assert!(!host.has_parent_group("site__ams1"));
    }

    #[test]
    fn test_connection_parameters_fall_back_to_host() {
        let options = ConnectionOptionsTree::new().with_transport(
            "netmiko",
            TransportOptions {
                port: Some(8022),
                ..TransportOptions::default()
            },
        );
        let host = Host::new(record("SW1"), "10.0.0.5", "cisco_ios")
            .with_login(Some("admin".to_string()), Some("pw".to_string()))
            .with_connection_options(options);

        let params = host.connection_parameters("netmiko");
        assert_eq!(params.hostname.as_deref(), Some("10.0.0.5"));
        assert_eq!(params.port, Some(8022));
        assert_eq!(params.username.as_deref(), Some("admin"));

        let params = host.connection_parameters("scrapli");
        assert_eq!(params.port, Some(DEFAULT_PORT));
        assert_eq!(params.platform.as_deref(), Some("cisco_ios"));
    }

    #[test]
    fn test_defaults_apply_when_host_has_no_stanza() {
        let defaults = Arc::new(Defaults {
            connection_options: ConnectionOptionsTree::new().with_transport(
                "napalm",
                TransportOptions {
                    username: Some("ro".to_string()),
                    ..TransportOptions::default()
                },
            ),
            ..Defaults::default()
        });
        let group = Arc::new(Group::new("global").with_defaults(Arc::clone(&defaults)));
        let host = Host::new(record("SW1"), "10.0.0.5", "cisco_ios")
            .with_login(Some("admin".to_string()), None)
            .with_groups(vec![group])
            .with_defaults(defaults);

        assert_eq!(
            host.connection_parameters("napalm").username.as_deref(),
            Some("ro")
        );
        assert_eq!(
            host.connection_parameters("netmiko").username.as_deref(),
            Some("admin")
        );
    }

    #[test]
    fn test_host_debug_redacts_secrets() {
        let host = Host::new(record("SW1"), "10.0.0.5", "cisco_ios")
            .with_login(Some("admin".to_string()), Some("hunter2".to_string()))
            .with_secrets(Some("en4ble".to_string()), None, Some("k3y".to_string()));

        let rendered = format!("{host:?}");
        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("en4ble"));
        assert!(!rendered.contains("k3y"));
    }

    #[test]
    fn test_filter_keeps_order() {
        let inventory = Inventory::from_hosts(vec![
            Host::new(record("SW1"), "10.0.0.1", "cisco_ios"),
            Host::new(record("FW1"), "10.0.0.2", "paloalto_panos"),
            Host::new(record("SW2"), "10.0.0.3", "cisco_ios"),
        ]);

        let switches = inventory.filter(|h| h.platform() == "cisco_ios");
        let names: Vec<&str> = switches.hosts().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["SW1", "SW2"]);
        assert_eq!(inventory.len(), 3);
    }
}
