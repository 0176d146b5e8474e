//! Cisco IOS-XE RESTCONF driver

use async_trait::async_trait;
use nornet_api::TaskResult;
use nornet_exec::{ApiAuth, ApiSession};
use serde_json::Value;

use super::command::not_implemented;
use super::{Driver, DriverError, TaskContext, https_url};

/// Driver identifier
pub const RESTCONF: &str = "cisco_ios_restconf";

/// Native configuration datastore path
pub const NATIVE_CONFIG_PATH: &str = "/restconf/data/Cisco-IOS-XE-native:native";

/// Media type of RESTCONF JSON answers
pub const YANG_JSON: &str = "application/yang-data+json";

/// Retrieves the native configuration tree over RESTCONF
#[derive(Debug, Clone)]
pub struct RestconfDriver {
    session: ApiSession,
}

impl RestconfDriver {
    /// Create a driver using the given session
    pub fn new(session: ApiSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Driver for RestconfDriver {
    fn name(&self) -> &'static str {
        RESTCONF
    }

    async fn get_config(&self, ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        ctx.executing("get_config");

        let base = https_url(ctx.host.hostname(), None, NATIVE_CONFIG_PATH);
        let url = ApiSession::url(&base, &[("content", "config"), ("depth", "65535")])?;
        let auth = ApiAuth::Basic {
            username: ctx.host.username().unwrap_or_default().to_string(),
            password: ctx.host.password().map(str::to_string),
        };

        let body = self.session.get_text(url, &auth, Some(YANG_JSON)).await?;
        Ok(TaskResult::with_value(
            ctx.host.name(),
            "config",
            Value::String(body),
        ))
    }

    async fn get_facts(&self, _ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        Err(not_implemented("get_facts", RESTCONF))
    }

    async fn get_environment(&self, _ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        Err(not_implemented("get_environment", RESTCONF))
    }

    async fn get_interfaces(&self, _ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        Err(not_implemented("get_interfaces", RESTCONF))
    }
}
