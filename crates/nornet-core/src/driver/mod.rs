//! Platform drivers
//!
//! A driver implements the operation set for a family of platforms. Vendors
//! are onboarded by mapping their platform to one of the shared drivers.

pub mod command;
pub mod fortinet;
pub mod generic;
pub mod paloalto;
pub mod restconf;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use nornet_api::TaskResult;
use nornet_exec::{DeviceConnection, TransportError};
use nornet_inventory::Host;
use thiserror::Error;

use crate::logger::RunLogger;

pub use command::CommandDriver;
pub use fortinet::FortinetDriver;
pub use generic::GenericDriver;
pub use paloalto::PaloAltoDriver;
pub use restconf::RestconfDriver;

/// Marker some platforms print when they reject a command
pub const INVALID_INPUT_MARKER: &str = "ERROR: % Invalid input detected at";

/// Operation a driver can run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetConfig,
    GetFacts,
    GetEnvironment,
    GetInterfaces,
}

impl Operation {
    /// Canonical operation name
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::GetConfig => "get_config",
            Operation::GetFacts => "get_facts",
            Operation::GetEnvironment => "get_environment",
            Operation::GetInterfaces => "get_interfaces",
        }
    }

    /// Payload key of the operation's result
    #[must_use]
    pub fn result_key(self) -> &'static str {
        match self {
            Operation::GetConfig => "config",
            Operation::GetFacts => "facts",
            Operation::GetEnvironment => "environment",
            Operation::GetInterfaces => "interfaces",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get_config" | "get_configuration" => Ok(Operation::GetConfig),
            "get_facts" => Ok(Operation::GetFacts),
            "get_environment" => Ok(Operation::GetEnvironment),
            "get_interfaces" => Ok(Operation::GetInterfaces),
            other => Err(other.to_string()),
        }
    }
}

/// Everything a driver needs to run one operation against one host
#[derive(Clone, Copy)]
pub struct TaskContext<'a> {
    /// Target host
    pub host: &'a Host,
    /// Live connection owned by the calling worker
    pub connection: &'a dyn DeviceConnection,
    /// Run logger
    pub logger: &'a RunLogger,
    /// Record failures are logged against
    pub subject: &'a (dyn fmt::Display + Sync),
}

impl TaskContext<'_> {
    /// Grouping key for log entries about this host
    #[must_use]
    pub fn grouping(&self) -> Option<&str> {
        Some(self.host.name())
    }

    /// Log a debug message grouped under the host
    pub fn debug(&self, message: &str) {
        self.logger.debug(message, self.grouping());
    }

    /// Log a failure grouped under the host
    pub fn failure(&self, message: &str) {
        self.logger.failure(self.subject, message, self.grouping());
    }

    fn executing(&self, operation: &str) {
        self.debug(&format!(
            "Executing {operation} for {} on {}",
            self.host.name(),
            self.host.platform()
        ));
    }
}

/// Errors raised by drivers
#[derive(Error, Debug, Clone)]
pub enum DriverError {
    /// The transport failed and the driver classified the failure
    #[error("{message}")]
    Failed {
        /// Classified one-line message
        message: String,
        /// Underlying transport failure
        #[source]
        source: TransportError,
    },

    /// The transport failed and the driver passed it through
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The device rejected the command
    #[error("Discovered `{marker}` in the output", marker = INVALID_INPUT_MARKER)]
    InvalidInput,

    /// The driver does not offer the capability
    #[error("{method} is not implemented for {driver}")]
    NotImplemented {
        /// Operation name
        method: &'static str,
        /// Driver name
        driver: &'static str,
    },

    /// The host lacks data the driver needs
    #[error("host {host} has no {field}")]
    MissingData {
        /// Host name
        host: String,
        /// Missing field
        field: &'static str,
    },

    /// The device answered with data the driver cannot use
    #[error("unexpected payload: {0}")]
    Payload(String),
}

impl DriverError {
    /// Full failure detail; the last line is the most specific
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            DriverError::Failed { message, source } => format!("{source}\n{message}"),
            other => other.to_string(),
        }
    }

    /// Last non-empty line of the detail
    #[must_use]
    pub fn summary(&self) -> String {
        let detail = self.detail();
        detail
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_string()
    }
}

/// Operation set implemented by every driver
#[async_trait]
pub trait Driver: Send + Sync {
    /// Driver identifier
    fn name(&self) -> &'static str;

    /// Retrieve the running configuration
    ///
    /// # Errors
    /// Returns an error if the transport fails or the device rejects the request
    async fn get_config(&self, ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError>;

    /// Retrieve device facts
    ///
    /// # Errors
    /// Returns an error if the transport fails or the capability is missing
    async fn get_facts(&self, ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError>;

    /// Retrieve environment data
    ///
    /// # Errors
    /// Returns an error if the transport fails or the capability is missing
    async fn get_environment(&self, ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError>;

    /// Retrieve interfaces with their IP addresses
    ///
    /// # Errors
    /// Returns an error if the transport fails or the capability is missing
    async fn get_interfaces(&self, ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError>;

    /// Run an operation by kind
    ///
    /// # Errors
    /// Returns whatever the selected capability returns
    async fn execute(
        &self,
        operation: Operation,
        ctx: &TaskContext<'_>,
    ) -> Result<TaskResult, DriverError> {
        match operation {
            Operation::GetConfig => self.get_config(ctx).await,
            Operation::GetFacts => self.get_facts(ctx).await,
            Operation::GetEnvironment => self.get_environment(ctx).await,
            Operation::GetInterfaces => self.get_interfaces(ctx).await,
        }
    }
}

/// HTTPS port for API drivers: the SSH default maps to 443
#[must_use]
pub fn api_port(port: u16) -> u16 {
    if port == 22 { 443 } else { port }
}

/// `https://` URL for a host, bracketing IPv6 literals
fn https_url(hostname: &str, port: Option<u16>, path: &str) -> String {
    let host = if hostname.contains(':') && !hostname.starts_with('[') {
        format!("[{hostname}]")
    } else {
        hostname.to_string()
    };
    match port {
        Some(port) => format!("https://{host}:{port}{path}"),
        None => format!("https://{host}{path}"),
    }
}

/// API key of a host, required by token-authenticated drivers
fn api_key<'a>(ctx: &TaskContext<'a>) -> Result<&'a str, DriverError> {
    ctx.host
        .data()
        .key
        .as_deref()
        .ok_or_else(|| DriverError::MissingData {
            host: ctx.host.name().to_string(),
            field: "key",
        })
}

/// Log a getter failure line by line and wrap it
fn report_failure(ctx: &TaskContext<'_>, method: &str, err: TransportError) -> DriverError {
    let detail = err.to_string();
    let last = detail
        .lines()
        .rev()
        .find(|line| !line.trim().is_empty())
        .unwrap_or_default();
    let message = format!("`{method}` method failed with an unexpected issue: `{last}`");

    ctx.failure(&message);
    for line in detail.lines() {
        ctx.debug(line);
    }

    DriverError::Failed {
        message,
        source: err,
    }
}
