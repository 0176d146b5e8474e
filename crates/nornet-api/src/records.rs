//! Asset records as exported by the asset database

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Custom field carrying a per-device management port override
pub const ACCESS_PORT_FIELD: &str = "access_port";

/// Reference to a related object by slug (site, role, tenant, manufacturer)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlugRef {
    /// URL-safe identifier
    pub slug: String,
}

impl SlugRef {
    /// Create a new slug reference
    pub fn new(slug: impl Into<String>) -> Self {
        Self { slug: slug.into() }
    }
}

/// Software platform assigned to a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformRecord {
    /// Platform slug
    pub slug: String,
    /// Automation driver identifier (e.g. `cisco_ios`)
    #[serde(default)]
    pub driver: Option<String>,
}

impl PlatformRecord {
    /// Create a platform with a driver identifier
    pub fn new(slug: impl Into<String>, driver: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            driver: Some(driver.into()),
        }
    }

    /// Driver identifier, if one is declared and non-empty
    #[must_use]
    pub fn driver(&self) -> Option<&str> {
        self.driver.as_deref().filter(|d| !d.is_empty())
    }

    /// Identifier used for dispatching: the driver, else the slug
    #[must_use]
    pub fn identifier(&self) -> &str {
        self.driver().unwrap_or(&self.slug)
    }
}

/// Hardware model of a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTypeRecord {
    /// Device type slug
    pub slug: String,
    /// Manufacturer of the model
    pub manufacturer: SlugRef,
}

impl DeviceTypeRecord {
    /// Create a device type
    pub fn new(slug: impl Into<String>, manufacturer: impl Into<String>) -> Self {
        Self {
            slug: slug.into(),
            manufacturer: SlugRef::new(manufacturer),
        }
    }
}

/// A device as known to the asset database
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRecord {
    /// Database identifier
    pub id: u64,
    /// Unique device name
    pub name: String,
    /// Primary IP address, optionally in CIDR notation
    #[serde(default)]
    pub primary_ip: Option<String>,
    /// Assigned platform
    #[serde(default)]
    pub platform: Option<PlatformRecord>,
    /// Hardware model
    pub device_type: DeviceTypeRecord,
    /// Site the device is installed at
    pub site: SlugRef,
    /// Functional role
    pub role: SlugRef,
    /// Owning tenant
    #[serde(default)]
    pub tenant: Option<SlugRef>,
    /// Operator-defined custom fields
    #[serde(default)]
    pub custom_fields: Map<String, Value>,
}

impl DeviceRecord {
    /// Create a minimal device record
    pub fn new(
        id: u64,
        name: impl Into<String>,
        device_type: DeviceTypeRecord,
        site: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            primary_ip: None,
            platform: None,
            device_type,
            site: SlugRef::new(site),
            role: SlugRef::new(role),
            tenant: None,
            custom_fields: Map::new(),
        }
    }

    /// Set primary IP address
    #[must_use]
    pub fn with_primary_ip(mut self, ip: impl Into<String>) -> Self {
        self.primary_ip = Some(ip.into());
        self
    }

    /// Set platform
    #[must_use]
    pub fn with_platform(mut self, platform: PlatformRecord) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Set tenant
    #[must_use]
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(SlugRef::new(tenant));
        self
    }

    /// Set a custom field
    #[must_use]
    pub fn with_custom_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.custom_fields.insert(key.into(), value);
        self
    }

    /// Host part of the primary IP address (prefix length stripped)
    #[must_use]
    pub fn primary_address(&self) -> Option<&str> {
        self.primary_ip
            .as_deref()
            .map(|ip| ip.split('/').next().unwrap_or(ip))
            .filter(|ip| !ip.is_empty())
    }

    /// Management port override from custom fields
    ///
    /// Accepts an integer or a numeric string; anything else is ignored.
    #[must_use]
    pub fn access_port(&self) -> Option<u16> {
        let port = match self.custom_fields.get(ACCESS_PORT_FIELD)? {
            Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        };
        port.filter(|port| *port != 0)
    }

    /// Manufacturer slug
    #[must_use]
    pub fn manufacturer(&self) -> &str {
        &self.device_type.manufacturer.slug
    }
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
