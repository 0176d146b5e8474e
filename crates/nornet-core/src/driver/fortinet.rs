//! Fortinet FortiOS configuration backup driver

use async_trait::async_trait;
use nornet_api::TaskResult;
use nornet_exec::{ApiAuth, ApiSession};
use serde_json::Value;

use super::command::not_implemented;
use super::{Driver, DriverError, TaskContext, api_key, api_port, https_url};

/// Driver identifier
pub const FORTINET: &str = "fortinet_fortios";

/// Global configuration backup endpoint
pub const BACKUP_PATH: &str = "/api/v2/monitor/system/config/backup";

/// Downloads the global configuration backup with the host's API token
#[derive(Debug, Clone)]
pub struct FortinetDriver {
    session: ApiSession,
}

impl FortinetDriver {
    /// Create a driver using the given session
    pub fn new(session: ApiSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Driver for FortinetDriver {
    fn name(&self) -> &'static str {
        FORTINET
    }

    async fn get_config(&self, ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        ctx.executing("get_config");

        let key = api_key(ctx)?;
        let base = https_url(
            ctx.host.hostname(),
            Some(api_port(ctx.host.port())),
            BACKUP_PATH,
        );
        let url = ApiSession::url(&base, &[("scope", "global"), ("access_token", key)])?;

        let body = self.session.get_text(url, &ApiAuth::None, None).await?;
        Ok(TaskResult::with_value(
            ctx.host.name(),
            "config",
            Value::String(body),
        ))
    }

    async fn get_facts(&self, _ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        Err(not_implemented("get_facts", FORTINET))
    }

    async fn get_environment(&self, _ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        Err(not_implemented("get_environment", FORTINET))
    }

    async fn get_interfaces(&self, _ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        Err(not_implemented("get_interfaces", FORTINET))
    }
}
