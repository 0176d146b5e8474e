//! HTTPS session for API-based device drivers

use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::{Client, Url};
use tracing::{debug, instrument};

use crate::error::TransportError;

/// Timeout applied to every API request
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(10);

/// Authentication attached to an API request
#[derive(Clone, Default)]
pub enum ApiAuth {
    /// No request-level authentication (token carried in the query)
    #[default]
    None,
    /// HTTP basic authentication
    Basic {
        /// Username
        username: String,
        /// Password
        password: Option<String>,
    },
}

impl std::fmt::Debug for ApiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiAuth::None => write!(f, "None"),
            ApiAuth::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
        }
    }
}

/// Direct HTTPS session to a device management API
///
/// Device certificates are self-signed in practice, so certificate
/// validation is disabled. Proxy settings from the environment are ignored.
#[derive(Debug, Clone)]
pub struct ApiSession {
    client: Client,
    timeout: Duration,
    endpoint: Option<Url>,
}

impl ApiSession {
    /// Create a session with the default timeout
    ///
    /// # Errors
    /// Returns `TransportError::ConfigError` if the HTTP client cannot be built
    pub fn new() -> Result<Self, TransportError> {
        Self::with_timeout(DEFAULT_API_TIMEOUT)
    }

    /// Create a session with a custom timeout
    ///
    /// # Errors
    /// Returns `TransportError::ConfigError` if the HTTP client cannot be built
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| TransportError::ConfigError(e.to_string()))?;

        Ok(Self {
            client,
            timeout,
            endpoint: None,
        })
    }

    /// Send every request to `endpoint` instead of the device
    ///
    /// Scheme, host and port are taken from `endpoint`; path and query stay
    /// as the driver built them.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Build a request URL with query parameters
    ///
    /// # Errors
    /// Returns `TransportError::ConfigError` if the URL is malformed
    pub fn url(base: &str, params: &[(&str, &str)]) -> Result<Url, TransportError> {
        Url::parse_with_params(base, params).map_err(|e| TransportError::ConfigError(e.to_string()))
    }

    /// GET a URL and return the response body
    ///
    /// # Errors
    /// Returns `TransportError::Http` for non-2xx answers, `Timeout` or
    /// `ConnectionFailed` when the device is unreachable, `Request` otherwise
    #[instrument(skip_all, fields(host = url.host_str().unwrap_or_default()))]
    pub async fn get_text(
        &self,
        url: Url,
        auth: &ApiAuth,
        accept: Option<&str>,
    ) -> Result<String, TransportError> {
        // The URL may carry an access token; only the path is logged
        debug!(path = %url.path(), "sending API request");
        let url = self.route(url)?;

        let mut request = self.client.get(url);
        if let ApiAuth::Basic { username, password } = auth {
            request = request.basic_auth(username, password.as_ref());
        }
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }

        let response = request.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .ok()
                .filter(|body| !body.trim().is_empty())
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("error").to_string());
            return Err(TransportError::Http {
                status: status.as_u16(),
                message,
            });
        }

        response.text().await.map_err(|e| self.classify(e))
    }

    fn route(&self, mut url: Url) -> Result<Url, TransportError> {
        let Some(endpoint) = &self.endpoint else {
            return Ok(url);
        };
        let invalid = || TransportError::ConfigError(format!("cannot route request to {endpoint}"));

        url.set_scheme(endpoint.scheme()).map_err(|()| invalid())?;
        url.set_host(endpoint.host_str()).map_err(|_| invalid())?;
        url.set_port(endpoint.port()).map_err(|()| invalid())?;
        Ok(url)
    }

    /// Map a client error, dropping the URL and its query string
    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            return TransportError::Timeout {
                timeout: self.timeout,
            };
        }

        let connect = err.is_connect();
        let message = describe(&err.without_url());
        if connect {
            TransportError::ConnectionFailed(message)
        } else {
            TransportError::Request(message)
        }
    }
}

/// Error message with its causes, outermost first
fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
