//! Device connection trait

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportError;

/// Structured data a getter-capable transport can return
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Getter {
    Config,
    Facts,
    Environment,
    Interfaces,
    InterfacesIp,
}

impl Getter {
    /// Key the getter's data is returned under
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Getter::Config => "config",
            Getter::Facts => "facts",
            Getter::Environment => "environment",
            Getter::Interfaces => "interfaces",
            Getter::InterfacesIp => "interfaces_ip",
        }
    }
}

impl fmt::Display for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live connection to one device
///
/// Owned by the worker running operations for that device.
#[async_trait]
pub trait DeviceConnection: Send + Sync {
    /// Run structured getters
    ///
    /// Returns a JSON object keyed by [`Getter::as_str`]. `retrieve` narrows
    /// the config getter to one variant (`running`, `startup`, ...).
    async fn get(&self, getters: &[Getter], retrieve: Option<&str>)
    -> Result<Value, TransportError> {
        let _ = retrieve;
        let names: Vec<&str> = getters.iter().map(Getter::as_str).collect();
        Err(TransportError::Unsupported {
            transport: self.transport_type(),
            operation: format!("getters [{}]", names.join(", ")),
        })
    }

    /// Send a free-text command and return its raw output
    async fn send_command(&self, command: &str) -> Result<String, TransportError>;

    /// Whether a session is currently open
    fn is_connected(&self) -> bool {
        false
    }

    /// Transport family name
    fn transport_type(&self) -> &'static str;
}
