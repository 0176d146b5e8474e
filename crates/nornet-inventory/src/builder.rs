//! Builds an inventory from asset records

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;
use nornet_api::DeviceRecord;
use nornet_credentials::{CredentialProvider, ProviderRegistry};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::InventoryError;
use crate::groups::host_groups;
use crate::options::{ConnectionOptionsTree, GETTER_TRANSPORT, SecretInjector, SecretKind};
use crate::source::{AssetSource, DeviceFilter};
use crate::types::{DEFAULT_PORT, Defaults, Group, Host, Inventory};

/// Inventory builder
///
/// Holds everything one load needs; the credential provider is created
/// up front so an unknown provider fails before any record is fetched.
pub struct InventoryBuilder {
    provider: Arc<dyn CredentialProvider>,
    source: Option<Arc<dyn AssetSource>>,
    records: Option<Vec<DeviceRecord>>,
    filter: DeviceFilter,
    connection_options: ConnectionOptionsTree,
    injector: SecretInjector,
    fqdn: Option<String>,
    declared_groups: IndexMap<String, Vec<String>>,
    defaults: Defaults,
}

impl InventoryBuilder {
    /// Create a builder around a credential provider
    pub fn new(provider: Arc<dyn CredentialProvider>) -> Self {
        Self {
            provider,
            source: None,
            records: None,
            filter: DeviceFilter::default(),
            connection_options: ConnectionOptionsTree::with_default_transports(),
            injector: SecretInjector::with_builtin(),
            fqdn: None,
            declared_groups: IndexMap::new(),
            defaults: Defaults::default(),
        }
    }

    /// Create a builder using a provider from the registry
    ///
    /// # Errors
    /// Returns an error if the provider is not registered or rejects its
    /// parameters
    pub fn from_registry(
        registry: &ProviderRegistry,
        provider: &str,
        params: Option<&Value>,
    ) -> Result<Self, InventoryError> {
        let provider = registry.create(provider, params)?;
        Ok(Self::new(provider))
    }

    /// Read records from a source
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn AssetSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Use records supplied by the caller instead of a source
    #[must_use]
    pub fn with_records(mut self, records: Vec<DeviceRecord>) -> Self {
        self.records = Some(records);
        self
    }

    /// Narrow the record set
    #[must_use]
    pub fn with_filter(mut self, filter: DeviceFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Replace the global connection options
    #[must_use]
    pub fn with_connection_options(mut self, options: ConnectionOptionsTree) -> Self {
        self.connection_options = options;
        self
    }

    /// Replace the secret injector
    #[must_use]
    pub fn with_injector(mut self, injector: SecretInjector) -> Self {
        self.injector = injector;
        self
    }

    /// Address hosts as `<name>.<suffix>` instead of by primary IP
    #[must_use]
    pub fn with_fqdn(mut self, suffix: impl Into<String>) -> Self {
        self.fqdn = Some(suffix.into());
        self
    }

    /// Declare a group with parents
    #[must_use]
    pub fn with_group(mut self, name: impl Into<String>, parents: Vec<String>) -> Self {
        self.declared_groups.insert(name.into(), parents);
        self
    }

    /// Set inventory defaults
    #[must_use]
    pub fn with_defaults(mut self, defaults: Defaults) -> Self {
        self.defaults = defaults;
        self
    }

    /// Build the inventory
    ///
    /// # Errors
    /// Fails on the first device without a platform, on credential
    /// failures, on unreadable sources and on invalid group declarations.
    #[instrument(skip(self), fields(provider = self.provider.provider_type()))]
    pub async fn load(&self) -> Result<Inventory, InventoryError> {
        let records = match (&self.records, &self.source) {
            (Some(records), _) => records.clone(),
            (None, Some(source)) => {
                debug!(source = source.source_type(), "Fetching asset records");
                source.devices().await?
            }
            (None, None) => {
                return Err(InventoryError::ConfigError(
                    "no asset source or records configured".to_string(),
                ));
            }
        };

        let total = records.len();
        let defaults = Arc::new(self.defaults.clone());
        let mut drafts: IndexMap<String, Host> = IndexMap::new();

        for record in records.into_iter().filter(|r| self.filter.matches(r)) {
            let host = self.create_host(Arc::new(record), &defaults).await?;
            let name = host.name().to_string();
            if drafts.insert(name.clone(), host).is_some() {
                warn!(host = %name, "Duplicate device name, keeping the later record");
            }
        }

        let mut raw_groups = self.declared_groups.clone();
        for host in drafts.values() {
            for name in host.group_names() {
                raw_groups.entry(name.clone()).or_default();
            }
        }

        let groups = resolve_groups(&raw_groups, &defaults)?;

        let mut hosts = IndexMap::with_capacity(drafts.len());
        for (name, host) in drafts {
            let parents = host
                .group_names()
                .iter()
                .map(|group| lookup_group(&groups, group, &name))
                .collect::<Result<Vec<_>, _>>()?;
            hosts.insert(name, Arc::new(host.with_groups(parents)));
        }

        info!(
            records = total,
            hosts = hosts.len(),
            groups = groups.len(),
            "Inventory loaded"
        );
        Ok(Inventory::new(hosts, groups, defaults))
    }

    async fn create_host(
        &self,
        record: Arc<DeviceRecord>,
        defaults: &Arc<Defaults>,
    ) -> Result<Host, InventoryError> {
        let platform = record
            .platform
            .as_ref()
            .ok_or_else(|| InventoryError::MissingPlatform {
                device: record.name.clone(),
            })?;

        let hostname = match &self.fqdn {
            Some(suffix) => format!("{}.{suffix}", record.name),
            None => record
                .primary_address()
                .map_or_else(|| record.name.clone(), str::to_string),
        };
        let port = record.access_port().unwrap_or(DEFAULT_PORT);

        let credentials = self.provider.resolve(&record, None).await?;

        let mut options = self.connection_options.clone();
        self.injector
            .inject(&mut options, SecretKind::Secret, credentials.secret.as_deref());
        self.injector.inject(
            &mut options,
            SecretKind::EnablePassword,
            credentials.secret.as_deref(),
        );
        if let Some(driver) = platform.driver() {
            options.entry(GETTER_TRANSPORT).platform = Some(driver.to_string());
        }

        debug!(host = %record.name, hostname = %hostname, port, "Built host");

        let platform = platform.identifier().to_string();
        let group_names = host_groups(&record);
        let (username, password, secret, key) = credentials.into_tuple();

        Ok(Host::new(Arc::clone(&record), hostname, platform)
            .with_port(port)
            .with_login(username, password)
            .with_secrets(secret.clone(), secret, key)
            .with_group_names(group_names)
            .with_connection_options(options)
            .with_defaults(Arc::clone(defaults)))
    }
}

fn lookup_group(
    groups: &IndexMap<String, Arc<Group>>,
    name: &str,
    referenced_by: &str,
) -> Result<Arc<Group>, InventoryError> {
    groups
        .get(name)
        .cloned()
        .ok_or_else(|| InventoryError::UnknownGroup {
            group: name.to_string(),
            referenced_by: referenced_by.to_string(),
        })
}

/// Resolve group parents depth-first, preserving first-reference order
fn resolve_groups(
    raw: &IndexMap<String, Vec<String>>,
    defaults: &Arc<Defaults>,
) -> Result<IndexMap<String, Arc<Group>>, InventoryError> {
    let mut resolved: HashMap<String, Arc<Group>> = HashMap::new();
    let mut visiting = HashSet::new();

    for name in raw.keys() {
        resolve_group(name, raw, defaults, &mut resolved, &mut visiting)?;
    }

    raw.keys()
        .map(|name| lookup_group_in(&resolved, name).map(|g| (name.clone(), g)))
        .collect()
}

fn lookup_group_in(
    resolved: &HashMap<String, Arc<Group>>,
    name: &str,
) -> Result<Arc<Group>, InventoryError> {
    resolved
        .get(name)
        .cloned()
        .ok_or_else(|| InventoryError::GroupCycle(name.to_string()))
}

fn resolve_group(
    name: &str,
    raw: &IndexMap<String, Vec<String>>,
    defaults: &Arc<Defaults>,
    resolved: &mut HashMap<String, Arc<Group>>,
    visiting: &mut HashSet<String>,
) -> Result<Arc<Group>, InventoryError> {
    if let Some(group) = resolved.get(name) {
        return Ok(Arc::clone(group));
    }
    if !visiting.insert(name.to_string()) {
        return Err(InventoryError::GroupCycle(name.to_string()));
    }

    let mut parents = Vec::new();
    for parent in raw.get(name).map(Vec::as_slice).unwrap_or_default() {
        if !raw.contains_key(parent) {
            return Err(InventoryError::UnknownGroup {
                group: parent.clone(),
                referenced_by: name.to_string(),
            });
        }
        parents.push(resolve_group(parent, raw, defaults, resolved, visiting)?);
    }

    visiting.remove(name);
    let group = Arc::new(
        Group::new(name)
            .with_parents(parents)
            .with_defaults(Arc::clone(defaults)),
    );
    resolved.insert(name.to_string(), Arc::clone(&group));
    Ok(group)
}
