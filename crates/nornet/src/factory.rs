//! Connection factory for worker tasks

use std::time::Duration;

use async_trait::async_trait;
use nornet_core::ConnectionFactory;
use nornet_exec::{DeviceConnection, SshConnectionBuilder, TransportError};
use nornet_inventory::Host;
use tracing::debug;

/// Transport whose options describe the SSH session
pub const SSH_TRANSPORT: &str = "netmiko";

/// Default implementation of `ConnectionFactory`
///
/// Opens SSH sessions lazily; hosts without an SSH password get a
/// connection that refuses commands, which is enough for the HTTP drivers.
///
/// Neither connection implements the structured getters. Platforms mapped
/// to the generic driver fail with `Unsupported` unless the caller supplies
/// its own `ConnectionFactory` backed by a getter-capable transport.
#[derive(Debug, Clone, Default)]
pub struct DefaultConnectionFactory {
    timeout: Option<Duration>,
}

impl DefaultConnectionFactory {
    /// Create a new factory instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound SSH connect, authentication and each command
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[async_trait]
impl ConnectionFactory for DefaultConnectionFactory {
    async fn connect(&self, host: &Host) -> Result<Box<dyn DeviceConnection>, TransportError> {
        let params = host.connection_parameters(SSH_TRANSPORT);

        let hostname = params.hostname.unwrap_or_else(|| host.hostname().to_string());
        let Some(password) = params.password else {
            debug!(host = %host.name(), "no SSH password, using detached connection");
            return Ok(Box::new(DetachedConnection));
        };
        let username = params.username.ok_or_else(|| {
            TransportError::ConfigError(format!("host {} has no username", host.name()))
        })?;

        let mut builder = SshConnectionBuilder::new(hostname, username)
            .with_password(password)
            .with_port(params.port.unwrap_or(host.port()));
        if let Some(timeout) = self.timeout {
            builder = builder.with_timeout(timeout).with_connect_timeout(timeout);
        }
        Ok(Box::new(builder.build()?))
    }
}

/// Connection for hosts only reached over HTTP APIs
#[derive(Debug, Clone, Copy)]
struct DetachedConnection;

#[async_trait]
impl DeviceConnection for DetachedConnection {
    async fn send_command(&self, _command: &str) -> Result<String, TransportError> {
        Err(TransportError::NotConnected)
    }

    fn transport_type(&self) -> &'static str {
        "none"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use nornet_api::{DeviceRecord, DeviceTypeRecord};
    use nornet_exec::Getter;

    use super::*;

    fn host(password: Option<&str>) -> Host {
        let record = DeviceRecord::new(
            1,
            "SW1",
            DeviceTypeRecord::new("c9300", "cisco"),
            "lon1",
            "access",
        );
        Host::new(Arc::new(record), "10.0.0.1", "cisco_ios")
            .with_login(Some("netops".to_string()), password.map(str::to_string))
    }

    #[tokio::test]
    async fn test_password_gives_ssh_connection() {
        let factory = DefaultConnectionFactory::new();
        let connection = factory.connect(&host(Some("hunter2"))).await.unwrap();

        assert_eq!(connection.transport_type(), "ssh");
        assert!(!connection.is_connected());
    }

    #[tokio::test]
    async fn test_no_password_gives_detached_connection() {
        let factory = DefaultConnectionFactory::new();
        let connection = factory.connect(&host(None)).await.unwrap();

        assert_eq!(connection.transport_type(), "none");
        let err = connection.send_command("show run").await.unwrap_err();
        assert!(matches!(err, TransportError::NotConnected));
    }

    #[tokio::test]
    async fn test_timeout_bounds_unresponsive_device() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let record = DeviceRecord::new(
            3,
            "SW3",
            DeviceTypeRecord::new("c9300", "cisco"),
            "lon1",
            "access",
        );
        let host = Host::new(Arc::new(record), "127.0.0.1", "cisco_ios")
            .with_port(port)
            .with_login(Some("netops".to_string()), Some("hunter2".to_string()));

        let factory = DefaultConnectionFactory::new().with_timeout(Duration::from_millis(200));
        let connection = factory.connect(&host).await.unwrap();
        let result = connection.send_command("show run").await;

        assert!(matches!(result, Err(TransportError::Timeout { .. })));
        drop(listener);
    }

    #[tokio::test]
    async fn test_connections_refuse_getters() {
        let factory = DefaultConnectionFactory::new();
        for password in [Some("hunter2"), None] {
            let connection = factory.connect(&host(password)).await.unwrap();
            let result = connection.get(&[Getter::Facts], None).await;
            assert!(matches!(result, Err(TransportError::Unsupported { .. })));
        }
    }

    #[tokio::test]
    async fn test_missing_username_is_error() {
        let record = DeviceRecord::new(
            2,
            "SW2",
            DeviceTypeRecord::new("c9300", "cisco"),
            "lon1",
            "access",
        );
        let host = Host::new(Arc::new(record), "10.0.0.2", "cisco_ios")
            .with_login(None, Some("hunter2".to_string()));

        let result = DefaultConnectionFactory::new().connect(&host).await;
        assert!(matches!(result, Err(TransportError::ConfigError(_))));
    }
}
