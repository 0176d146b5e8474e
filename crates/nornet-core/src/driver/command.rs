//! Driver for command-line transports

use async_trait::async_trait;
use nornet_api::TaskResult;
use nornet_exec::TransportError;
use serde_json::Value;

use super::{Driver, DriverError, INVALID_INPUT_MARKER, TaskContext};

/// Driver identifier
pub const COMMAND: &str = "command";

/// Command used when the platform has no entry of its own
pub const DEFAULT_COMMAND: &str = "show run";

/// Command that prints the running configuration on a platform
#[must_use]
pub fn config_command(platform: &str) -> &'static str {
    match platform {
        "cisco_aireos" => "show run-config commands",
        "cisco_wlc" => "show running-config",
        "juniper_junos" => "show configuration | display set",
        _ => DEFAULT_COMMAND,
    }
}

/// Retrieves configuration by sending a show command
///
/// Structured getters are not available over a plain command session.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandDriver;

impl CommandDriver {
    fn classify(ctx: &TaskContext<'_>, err: TransportError) -> DriverError {
        let message = if err.is_authentication() {
            format!("Failed with an authentication issue: `{err}`")
        } else if err.is_timeout() {
            format!("Failed with a timeout issue. `{err}`")
        } else {
            format!("Failed with an unknown issue. `{err}`")
        };

        ctx.failure(&message);
        DriverError::Failed {
            message,
            source: err,
        }
    }
}

#[async_trait]
impl Driver for CommandDriver {
    fn name(&self) -> &'static str {
        COMMAND
    }

    async fn get_config(&self, ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        ctx.executing("get_config");

        let command = config_command(ctx.host.platform());
        let output = ctx
            .connection
            .send_command(command)
            .await
            .map_err(|e| Self::classify(ctx, e))?;

        if output.contains(INVALID_INPUT_MARKER) {
            let err = DriverError::InvalidInput;
            ctx.failure(&err.to_string());
            return Err(err);
        }

        Ok(TaskResult::with_value(
            ctx.host.name(),
            "config",
            Value::String(output),
        ))
    }

    async fn get_facts(&self, _ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        Err(not_implemented("get_facts", COMMAND))
    }

    async fn get_environment(&self, _ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        Err(not_implemented("get_environment", COMMAND))
    }

    async fn get_interfaces(&self, _ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        Err(not_implemented("get_interfaces", COMMAND))
    }
}

pub(crate) fn not_implemented(method: &'static str, driver: &'static str) -> DriverError {
    DriverError::NotImplemented { method, driver }
}
