//! Credentials read from environment variables
//!
//! Every device gets the same credentials.

use async_trait::async_trait;
use nornet_api::DeviceRecord;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::CredentialError;
use crate::traits::CredentialProvider;
use crate::types::{Credentials, ProviderParams};

/// Variable holding the username unless overridden
pub const USERNAME_ENV_VAR_NAME: &str = "NAPALM_USERNAME";
/// Variable holding the password unless overridden
pub const PASSWORD_ENV_VAR_NAME: &str = "NAPALM_PASSWORD";
/// Variable holding the enable secret unless overridden
pub const SECRET_ENV_VAR_NAME: &str = "DEVICE_SECRET";

/// Environment-variable credential provider
#[derive(Clone)]
pub struct EnvVarsProvider {
    credentials: Credentials,
}

impl std::fmt::Debug for EnvVarsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvVarsProvider")
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl EnvVarsProvider {
    /// Create a provider reading the process environment
    ///
    /// `params` may rename the variables via the `username`, `password` and
    /// `secret` keys.
    ///
    /// # Errors
    /// Returns `CredentialError::Config` if `params` is not a mapping
    pub fn new(params: Option<&Value>) -> Result<Self, CredentialError> {
        Self::from_lookup(params, |name| std::env::var(name).ok())
    }

    /// Create a provider with a custom variable lookup
    ///
    /// # Errors
    /// Returns `CredentialError::Config` if `params` is not a mapping
    pub fn from_lookup<F>(params: Option<&Value>, lookup: F) -> Result<Self, CredentialError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let params = match params {
            None | Some(Value::Null) => ProviderParams::new(),
            Some(Value::Object(map)) => map.clone(),
            Some(other) => {
                return Err(CredentialError::Config(format!(
                    "params must be a mapping, got {other}"
                )));
            }
        };

        let var_name = |key: &str, default: &str| -> Result<String, CredentialError> {
            match params.get(key) {
                None => Ok(default.to_string()),
                Some(Value::String(name)) => Ok(name.clone()),
                Some(other) => Err(CredentialError::Config(format!(
                    "`{key}` must name an environment variable, got {other}"
                ))),
            }
        };

        let read = |name: String| lookup(&name).filter(|v| !v.is_empty());

        let username = read(var_name("username", USERNAME_ENV_VAR_NAME)?);
        let password = read(var_name("password", PASSWORD_ENV_VAR_NAME)?);
        let secret = read(var_name("secret", SECRET_ENV_VAR_NAME)?).or_else(|| password.clone());

        debug!(
            username_set = username.is_some(),
            password_set = password.is_some(),
            secret_set = secret.is_some(),
            "loaded credentials from environment"
        );

        Ok(Self {
            credentials: Credentials::new(username, password, secret, None),
        })
    }
}

#[async_trait]
impl CredentialProvider for EnvVarsProvider {
    #[instrument(skip_all, fields(device = %device.name))]
    async fn resolve(
        &self,
        device: &DeviceRecord,
        _extra: Option<&ProviderParams>,
    ) -> Result<Credentials, CredentialError> {
        Ok(self.credentials.clone())
    }

    fn provider_type(&self) -> &'static str {
        "env_vars"
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use nornet_api::DeviceTypeRecord;
    use serde_json::json;

    use super::*;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    fn device() -> DeviceRecord {
        DeviceRecord::new(1, "SW1", DeviceTypeRecord::new("c9300", "cisco"), "lon1", "access")
    }

    #[tokio::test]
    async fn test_only_username_set() {
        let provider =
            EnvVarsProvider::from_lookup(None, env(&[("NAPALM_USERNAME", "admin")])).unwrap();

        let creds = provider.resolve(&device(), None).await.unwrap();
        assert_eq!(
            creds.into_tuple(),
            (Some("admin".to_string()), None, None, None)
        );
    }

    #[tokio::test]
    async fn test_secret_falls_back_to_password() {
        let provider = EnvVarsProvider::from_lookup(
            None,
            env(&[
                ("NAPALM_USERNAME", "admin"),
                ("NAPALM_PASSWORD", "pw"),
                ("DEVICE_SECRET", ""),
            ]),
        )
        .unwrap();

        let creds = provider.resolve(&device(), None).await.unwrap();
        assert_eq!(creds.secret.as_deref(), Some("pw"));
    }

    #[tokio::test]
    async fn test_renamed_variables() {
        let params = json!({"username": "NET_USER", "password": "NET_PASS", "secret": "NET_ENABLE"});
        let provider = EnvVarsProvider::from_lookup(
            Some(&params),
            env(&[
                ("NET_USER", "ops"),
                ("NET_PASS", "pw"),
                ("NET_ENABLE", "en"),
                ("NAPALM_USERNAME", "ignored"),
            ]),
        )
        .unwrap();

        let creds = provider.resolve(&device(), None).await.unwrap();
        assert_eq!(creds.username.as_deref(), Some("ops"));
        assert_eq!(creds.secret.as_deref(), Some("en"));
        assert!(creds.key.is_none());
    }

    #[test]
    fn test_non_mapping_params_rejected() {
        let params = json!(["username"]);
        let result = EnvVarsProvider::from_lookup(Some(&params), env(&[]));
        assert!(matches!(result, Err(CredentialError::Config(_))));
    }
}
