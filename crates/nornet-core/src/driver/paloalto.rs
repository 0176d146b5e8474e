//! Palo Alto PAN-OS configuration export driver

use async_trait::async_trait;
use nornet_api::TaskResult;
use nornet_exec::{ApiAuth, ApiSession};
use quick_xml::events::Event;
use quick_xml::{Reader, Writer};
use serde_json::Value;

use super::command::not_implemented;
use super::{Driver, DriverError, TaskContext, api_key, api_port, https_url};

/// Driver identifier
pub const PALOALTO: &str = "paloalto_panos";

/// XML API endpoint
pub const API_PATH: &str = "/api/";

/// Exports the running configuration through the XML API
#[derive(Debug, Clone)]
pub struct PaloAltoDriver {
    session: ApiSession,
}

impl PaloAltoDriver {
    /// Create a driver using the given session
    pub fn new(session: ApiSession) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Driver for PaloAltoDriver {
    fn name(&self) -> &'static str {
        PALOALTO
    }

    async fn get_config(&self, ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        ctx.executing("get_config");

        let key = api_key(ctx)?;
        let base = https_url(
            ctx.host.hostname(),
            Some(api_port(ctx.host.port())),
            API_PATH,
        );
        let url = ApiSession::url(
            &base,
            &[
                ("type", "export"),
                ("category", "configuration"),
                ("key", key),
            ],
        )?;

        let body = self.session.get_text(url, &ApiAuth::None, None).await?;
        let config = pretty_xml(&body)?;
        Ok(TaskResult::with_value(
            ctx.host.name(),
            "config",
            Value::String(config),
        ))
    }

    async fn get_facts(&self, _ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        Err(not_implemented("get_facts", PALOALTO))
    }

    async fn get_environment(&self, _ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        Err(not_implemented("get_environment", PALOALTO))
    }

    async fn get_interfaces(&self, _ctx: &TaskContext<'_>) -> Result<TaskResult, DriverError> {
        Err(not_implemented("get_interfaces", PALOALTO))
    }
}

/// Re-indent an XML document with tabs, one element per line
///
/// # Errors
/// Returns `DriverError::Payload` for empty or malformed documents
pub fn pretty_xml(input: &str) -> Result<String, DriverError> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);
    let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
    let mut has_root = false;

    loop {
        match reader.read_event() {
            Ok(Event::Eof) => break,
            Ok(event) => {
                has_root |= matches!(event, Event::Start(_) | Event::Empty(_));
                writer
                    .write_event(event)
                    .map_err(|e| DriverError::Payload(format!("XML write failed: {e}")))?;
            }
            Err(e) => return Err(DriverError::Payload(format!("invalid XML: {e}"))),
        }
    }

    if !has_root {
        return Err(DriverError::Payload("XML document has no root element".to_string()));
    }

    let mut pretty = String::from_utf8(writer.into_inner())
        .map_err(|e| DriverError::Payload(format!("XML is not UTF-8: {e}")))?;
    pretty.push('\n');
    Ok(pretty)
}
