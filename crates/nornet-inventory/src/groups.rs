//! Group membership derived from device attributes

use std::fmt;

use nornet_api::{DeviceRecord, PlatformRecord};

/// Group every host belongs to
pub const GLOBAL_GROUP: &str = "global";

/// Device attribute a group is derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupCategory {
    /// Installation site
    Site,
    /// Functional role
    Role,
    /// Hardware model
    DeviceType,
    /// Hardware vendor
    Manufacturer,
    /// Software platform
    Platform,
    /// Owning tenant
    Tenant,
}

impl GroupCategory {
    /// Prefix used in group names
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            GroupCategory::Site => "site",
            GroupCategory::Role => "role",
            GroupCategory::DeviceType => "type",
            GroupCategory::Manufacturer => "manufacturer",
            GroupCategory::Platform => "platform",
            GroupCategory::Tenant => "tenant",
        }
    }

    /// Group name for a slug in this category
    #[must_use]
    pub fn group_name(self, slug: &str) -> String {
        format!("{}__{slug}", self.prefix())
    }
}

impl fmt::Display for GroupCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Ordered group names for a device
///
/// `global` first, then site, role, type and manufacturer; platform only
/// when the device's platform declares a driver, tenant only when set.
#[must_use]
pub fn host_groups(device: &DeviceRecord) -> Vec<String> {
    let mut groups = vec![
        GLOBAL_GROUP.to_string(),
        GroupCategory::Site.group_name(&device.site.slug),
        GroupCategory::Role.group_name(&device.role.slug),
        GroupCategory::DeviceType.group_name(&device.device_type.slug),
        GroupCategory::Manufacturer.group_name(device.manufacturer()),
    ];

    if let Some(driver) = device.platform.as_ref().and_then(PlatformRecord::driver) {
        groups.push(GroupCategory::Platform.group_name(driver));
    }

    if let Some(tenant) = &device.tenant {
        groups.push(GroupCategory::Tenant.group_name(&tenant.slug));
    }

    groups
}
