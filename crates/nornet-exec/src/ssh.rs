//! SSH command transport using russh crate

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use russh::keys::ssh_key;
use russh::{ChannelMsg, Disconnect, client};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument};

use crate::error::TransportError;
use crate::result::ConnectionInfo;
use crate::traits::DeviceConnection;

/// SSH client handler for russh
#[derive(Debug)]
struct SshClientHandler;

impl client::Handler for SshClientHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &ssh_key::PublicKey,
    ) -> Result<bool, Self::Error> {
        // Network devices regenerate host keys on reload; accept them
        Ok(true)
    }
}

/// Command-only SSH connection to a network device
///
/// The session is opened on first use and kept until [`SshConnection::disconnect`].
pub struct SshConnection {
    /// Connection configuration
    conn_info: ConnectionInfo,
    /// SSH session (initialized on first use)
    session: Mutex<Option<client::Handle<SshClientHandler>>>,
}

impl std::fmt::Debug for SshConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SshConnection")
            .field("conn_info", &self.conn_info)
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

impl SshConnection {
    /// Create a new SSH connection
    ///
    /// # Errors
    /// Returns `TransportError::ConfigError` if no password is configured
    pub fn new(conn_info: ConnectionInfo) -> Result<Self, TransportError> {
        if conn_info.password.is_none() {
            return Err(TransportError::ConfigError(format!(
                "no password configured for {}",
                conn_info.host
            )));
        }

        Ok(Self {
            conn_info,
            session: Mutex::new(None),
        })
    }

    /// Get connection info
    pub fn connection_info(&self) -> &ConnectionInfo {
        &self.conn_info
    }

    /// Connect and authenticate
    #[instrument(skip(self), fields(host = %self.conn_info.host))]
    async fn connect(&self) -> Result<(), TransportError> {
        let mut session_lock = self.session.lock().await;

        if session_lock.is_some() {
            return Ok(());
        }

        info!(
            host = %self.conn_info.host,
            port = self.conn_info.port,
            user = %self.conn_info.user,
            "connecting to SSH"
        );

        let limit = self.conn_info.connect_timeout;
        let config = Arc::new(client::Config::default());

        let mut session = timeout(
            limit,
            client::connect(
                config,
                (&self.conn_info.host[..], self.conn_info.port),
                SshClientHandler,
            ),
        )
        .await
        .map_err(|_| {
            error!(timeout = ?limit, "SSH connect timed out");
            TransportError::Timeout { timeout: limit }
        })?
        .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let password = self.conn_info.password.clone().unwrap_or_default();
        let auth_res = timeout(
            limit,
            session.authenticate_password(&self.conn_info.user, password),
        )
        .await
        .map_err(|_| TransportError::Timeout { timeout: limit })?
        .map_err(|e| TransportError::AuthenticationFailed(e.to_string()))?;

        if !auth_res.success() {
            return Err(TransportError::AuthenticationFailed(format!(
                "password authentication rejected for {}@{}",
                self.conn_info.user, self.conn_info.host
            )));
        }

        info!(host = %self.conn_info.host, "SSH connected and authenticated");

        *session_lock = Some(session);
        Ok(())
    }

    /// Execute command on the device
    #[instrument(skip(self, cmd), fields(host = %self.conn_info.host))]
    async fn execute_remote(&self, cmd: &str) -> Result<String, TransportError> {
        let mut session_lock = self.session.lock().await;

        let session = session_lock.as_mut().ok_or(TransportError::NotConnected)?;

        debug!(command = %cmd, "executing remote command");

        let start = Instant::now();

        let mut channel = session
            .channel_open_session()
            .await
            .map_err(|e| TransportError::IoError(e.to_string()))?;

        channel
            .exec(true, cmd)
            .await
            .map_err(|e| TransportError::IoError(e.to_string()))?;

        let mut status = 0;
        let mut stdout = Vec::new();
        let mut stderr = Vec::new();

        loop {
            match channel.wait().await {
                Some(ChannelMsg::Data { data }) => {
                    stdout.extend_from_slice(&data);
                }
                Some(ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        stderr.extend_from_slice(&data);
                    }
                }
                Some(ChannelMsg::ExitStatus { exit_status }) => {
                    status = exit_status.cast_signed();
                }
                Some(ChannelMsg::Eof) | None => break,
                _ => {}
            }
        }

        debug!(
            command = %cmd,
            status = status,
            duration = ?start.elapsed(),
            "remote command completed"
        );

        // Most network OSes never send an exit status; only a non-zero one is a failure
        if status != 0 {
            return Err(TransportError::CommandFailed {
                status,
                stderr: String::from_utf8_lossy(&stderr).to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&stdout).to_string())
    }

    /// Disconnect from the device
    ///
    /// # Errors
    /// Returns `TransportError::IoError` if disconnection fails
    pub async fn disconnect(&self) -> Result<(), TransportError> {
        let mut session_lock = self.session.lock().await;

        if let Some(session) = session_lock.take() {
            session
                .disconnect(Disconnect::ByApplication, "", "English")
                .await
                .map_err(|e| TransportError::IoError(e.to_string()))?;
            info!(host = %self.conn_info.host, "SSH disconnected");
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceConnection for SshConnection {
    #[instrument(skip(self), fields(host = %self.conn_info.host))]
    async fn send_command(&self, command: &str) -> Result<String, TransportError> {
        self.connect().await?;

        let Some(timeout_duration) = self.conn_info.timeout else {
            return self.execute_remote(command).await;
        };

        let start = Instant::now();
        match timeout(timeout_duration, self.execute_remote(command)).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    command = %command,
                    timeout = ?timeout_duration,
                    elapsed = ?start.elapsed(),
                    "command timed out"
                );
                Err(TransportError::Timeout {
                    timeout: timeout_duration,
                })
            }
        }
    }

    fn is_connected(&self) -> bool {
        // Only a best-effort check; a busy lock reads as disconnected
        self.session
            .try_lock()
            .map(|s| s.is_some())
            .unwrap_or(false)
    }

    fn transport_type(&self) -> &'static str {
        "ssh"
    }
}

/// Builder for `SshConnection`
pub struct SshConnectionBuilder {
    conn_info: ConnectionInfo,
}

impl SshConnectionBuilder {
    /// Create builder with required fields
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            conn_info: ConnectionInfo::new(host, user),
        }
    }

    /// Set password
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.conn_info.password = Some(password.into());
        self
    }

    /// Set custom port
    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.conn_info.port = port;
        self
    }

    /// Set per-command timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.conn_info.timeout = Some(timeout);
        self
    }

    /// Set connect timeout
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.conn_info.connect_timeout = timeout;
        self
    }

    /// Build the connection
    ///
    /// # Errors
    /// Returns `TransportError::ConfigError` if no password was set
    pub fn build(self) -> Result<SshConnection, TransportError> {
        SshConnection::new(self.conn_info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::Getter;

    #[test]
    fn test_builder_requires_password() {
        let result = SshConnectionBuilder::new("10.0.0.5", "admin").build();
        assert!(matches!(result, Err(TransportError::ConfigError(_))));

        let conn = SshConnectionBuilder::new("10.0.0.5", "admin")
            .with_password("secret")
            .with_port(2222)
            .build()
            .unwrap();
        assert_eq!(conn.connection_info().port, 2222);
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_getters_unsupported() {
        let conn = SshConnectionBuilder::new("10.0.0.5", "admin")
            .with_password("secret")
            .build()
            .unwrap();

        let result = conn.get(&[Getter::Facts], None).await;
        assert!(matches!(
            result,
            Err(TransportError::Unsupported { transport: "ssh", .. })
        ));
    }

    #[tokio::test]
    async fn test_silent_server_times_out() {
        // Accepts TCP but never sends an SSH banner
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let conn = SshConnectionBuilder::new("127.0.0.1", "admin")
            .with_password("secret")
            .with_port(port)
            .with_connect_timeout(Duration::from_millis(200))
            .build()
            .unwrap();

        let start = Instant::now();
        let result = conn.send_command("show version").await;

        assert!(matches!(result, Err(TransportError::Timeout { .. })));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(!conn.is_connected());
        drop(listener);
    }

    #[tokio::test]
    #[ignore = "requires SSH-reachable device"]
    async fn test_send_command() {
        let conn = SshConnectionBuilder::new("192.0.2.10", "admin")
            .with_password("admin")
            .build()
            .unwrap();
        let output = conn.send_command("show version").await.unwrap();
        assert!(!output.is_empty());
    }
}
