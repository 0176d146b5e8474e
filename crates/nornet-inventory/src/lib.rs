//! nornet-inventory: Per-run device inventory
//!
//! Turns asset records into hosts and groups with resolved credentials and
//! per-transport connection options.

pub mod builder;
pub mod error;
pub mod groups;
pub mod options;
pub mod source;
pub mod types;

pub use builder::InventoryBuilder;
pub use error::InventoryError;
pub use groups::{GLOBAL_GROUP, GroupCategory, host_groups};
pub use options::{ConnectionOptionsTree, SecretInjector, SecretKind, TransportOptions};
pub use source::{AssetSource, DeviceFilter, JsonFileSource, StaticSource};
pub use types::{Defaults, Group, Host, HostData, Inventory};
