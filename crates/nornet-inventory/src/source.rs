//! Asset record sources and filters

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use nornet_api::DeviceRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::InventoryError;

/// Supplies device records to the inventory builder
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Fetch all device records
    ///
    /// # Errors
    /// Returns an error if the records cannot be read or parsed
    async fn devices(&self) -> Result<Vec<DeviceRecord>, InventoryError>;

    /// Source type for logging
    fn source_type(&self) -> &'static str;
}

/// Records held in memory
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    devices: Vec<DeviceRecord>,
}

impl StaticSource {
    /// Create a source over the given records
    pub fn new(devices: Vec<DeviceRecord>) -> Self {
        Self { devices }
    }
}

#[async_trait]
impl AssetSource for StaticSource {
    async fn devices(&self) -> Result<Vec<DeviceRecord>, InventoryError> {
        Ok(self.devices.clone())
    }

    fn source_type(&self) -> &'static str {
        "static"
    }
}

/// Records exported from the asset database as a JSON array
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    /// Create a source reading the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the export
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl AssetSource for JsonFileSource {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn devices(&self) -> Result<Vec<DeviceRecord>, InventoryError> {
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| InventoryError::Source(format!("{}: {e}", self.path.display())))?;

        let devices: Vec<DeviceRecord> = serde_json::from_str(&content)
            .map_err(|e| InventoryError::ParseError(format!("{}: {e}", self.path.display())))?;

        debug!(count = devices.len(), "Loaded asset records");
        Ok(devices)
    }

    fn source_type(&self) -> &'static str {
        "json_file"
    }
}

/// Narrows the record set before hosts are built
///
/// Each field lists accepted slugs; an empty list accepts everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceFilter {
    /// Device names
    pub name: Vec<String>,
    /// Site slugs
    pub site: Vec<String>,
    /// Role slugs
    pub role: Vec<String>,
    /// Platform drivers or slugs
    pub platform: Vec<String>,
    /// Manufacturer slugs
    pub manufacturer: Vec<String>,
    /// Device type slugs
    pub device_type: Vec<String>,
    /// Tenant slugs
    pub tenant: Vec<String>,
}

impl DeviceFilter {
    /// Create a filter accepting every device
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a device name
    #[must_use]
    pub fn name(mut self, name: &str) -> Self {
        self.name.push(name.to_string());
        self
    }

    /// Accept a site
    #[must_use]
    pub fn site(mut self, slug: &str) -> Self {
        self.site.push(slug.to_string());
        self
    }

    /// Accept a role
    #[must_use]
    pub fn role(mut self, slug: &str) -> Self {
        self.role.push(slug.to_string());
        self
    }

    /// Accept a platform by driver or slug
    #[must_use]
    pub fn platform(mut self, slug: &str) -> Self {
        self.platform.push(slug.to_string());
        self
    }

    /// Accept a manufacturer
    #[must_use]
    pub fn manufacturer(mut self, slug: &str) -> Self {
        self.manufacturer.push(slug.to_string());
        self
    }

    /// Accept a device type
    #[must_use]
    pub fn device_type(mut self, slug: &str) -> Self {
        self.device_type.push(slug.to_string());
        self
    }

    /// Accept a tenant
    #[must_use]
    pub fn tenant(mut self, slug: &str) -> Self {
        self.tenant.push(slug.to_string());
        self
    }

    /// Whether the filter accepts everything
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
            && self.site.is_empty()
            && self.role.is_empty()
            && self.platform.is_empty()
            && self.manufacturer.is_empty()
            && self.device_type.is_empty()
            && self.tenant.is_empty()
    }

    /// Whether a device passes every populated criterion
    #[must_use]
    pub fn matches(&self, device: &DeviceRecord) -> bool {
        let platform_ok = self.platform.is_empty()
            || device.platform.as_ref().is_some_and(|p| {
                accepts(&self.platform, p.identifier()) || accepts(&self.platform, &p.slug)
            });
        let tenant_ok = self.tenant.is_empty()
            || device
                .tenant
                .as_ref()
                .is_some_and(|t| accepts(&self.tenant, &t.slug));

        platform_ok
            && tenant_ok
            && (self.name.is_empty() || accepts(&self.name, &device.name))
            && (self.site.is_empty() || accepts(&self.site, &device.site.slug))
            && (self.role.is_empty() || accepts(&self.role, &device.role.slug))
            && (self.manufacturer.is_empty() || accepts(&self.manufacturer, device.manufacturer()))
            && (self.device_type.is_empty() || accepts(&self.device_type, &device.device_type.slug))
    }
}

fn accepts(allowed: &[String], value: &str) -> bool {
    allowed.iter().any(|a| a == value)
}
