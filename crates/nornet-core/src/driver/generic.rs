//! Driver for getter-capable transports

use async_trait::async_trait;
use nornet_api::TaskResult;
use nornet_exec::Getter;
use serde_json::{Map, Value};

use super::{Driver, DriverError, TaskContext, report_failure};

/// Driver identifier
pub const GENERIC: &str = "generic";

/// Reads structured data through the connection's getters
#[derive(Debug, Clone, Copy, Default)]
pub struct GenericDriver;

impl GenericDriver {
    async fn single_getter(
        &self,
        ctx: &TaskContext<'_>,
        getter: Getter,
        method: &str,
    ) -> Result<TaskResult, DriverError> {
        ctx.executing(method);

        let data = ctx
            .connection
            .get(&[getter], None)
            .await
            .map_err(|e| report_failure(ctx, method, e))?;

        let value = data.get(getter.as_str()).cloned().unwrap_or(Value::Null);
        Ok(TaskResult::with_value(
            ctx.host.name(),
            getter.as_str(),
            value,
        ))
    }
}

#[async_trait]
impl Driver for GenericDriver {
    fn name(&self) -> &'static str {
        GENERIC
    }

    async fn get_config(&self, ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        ctx.executing("get_config");

        let data = ctx
            .connection
            .get(&[Getter::Config], Some("running"))
            .await
            .map_err(|e| report_failure(ctx, "get_config", e))?;

        let running = data
            .get(Getter::Config.as_str())
            .and_then(|config| config.get("running"))
            .cloned()
            .unwrap_or(Value::Null);

        Ok(TaskResult::with_value(ctx.host.name(), "config", running))
    }

    async fn get_facts(&self, ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        self.single_getter(ctx, Getter::Facts, "get_facts").await
    }

    async fn get_environment(&self, ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        self.single_getter(ctx, Getter::Environment, "get_environment")
            .await
    }

    async fn get_interfaces(&self, ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        ctx.executing("get_interfaces");

        let data = ctx
            .connection
            .get(&[Getter::Interfaces, Getter::InterfacesIp], None)
            .await
            .map_err(|e| report_failure(ctx, "get_interfaces", e))?;

        let interfaces = merge_interfaces(&data)?;
        Ok(TaskResult::with_value(
            ctx.host.name(),
            "interfaces",
            Value::Object(interfaces),
        ))
    }
}

/// Overlay per-interface IP data onto interface details
///
/// Interfaces without IP data are returned unchanged; IP entries for
/// interfaces that are not listed are dropped.
pub fn merge_interfaces(data: &Value) -> Result<Map<String, Value>, DriverError> {
    let interfaces = data
        .get(Getter::Interfaces.as_str())
        .and_then(Value::as_object)
        .ok_or_else(|| DriverError::Payload("missing `interfaces` getter data".to_string()))?;
    let addresses = data
        .get(Getter::InterfacesIp.as_str())
        .and_then(Value::as_object);

    let merged = interfaces
        .iter()
        .map(|(name, details)| {
            let mut details = details.clone();
            let ip = addresses.and_then(|a| a.get(name)).and_then(Value::as_object);
            if let (Value::Object(target), Some(ip)) = (&mut details, ip) {
                target.extend(ip.iter().map(|(k, v)| (k.clone(), v.clone())));
            }
            (name.clone(), details)
        })
        .collect();

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_interfaces() {
        let data = json!({
            "interfaces": {
                "Gi1": {"is_up": true, "mtu": 1500},
                "Gi2": {"is_up": false}
            },
            "interfaces_ip": {
                "Gi1": {"ipv4": {"10.0.0.1": {"prefix_length": 24}}},
                "Lo99": {"ipv4": {"10.9.9.9": {"prefix_length": 32}}}
            }
        });

        let merged = merge_interfaces(&data).unwrap();
        assert_eq!(
            merged.get("Gi1"),
            Some(&json!({
                "is_up": true,
                "mtu": 1500,
                "ipv4": {"10.0.0.1": {"prefix_length": 24}}
            }))
        );
        assert_eq!(merged.get("Gi2"), Some(&json!({"is_up": false})));
        assert!(!merged.contains_key("Lo99"));
    }

    #[test]
    fn test_merge_without_ip_data() {
        let data = json!({"interfaces": {"Gi1": {"is_up": true}}});
        let merged = merge_interfaces(&data).unwrap();
        assert_eq!(merged.get("Gi1"), Some(&json!({"is_up": true})));
    }

    #[test]
    fn test_merge_requires_interfaces() {
        let err = merge_interfaces(&json!({"interfaces_ip": {}})).unwrap_err();
        assert!(matches!(err, DriverError::Payload(_)));
    }
}
