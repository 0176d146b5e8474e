//! AWS SSM Parameter Store backend

use std::time::Duration;

use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_ssm::Client;
use aws_sdk_ssm::error::DisplayErrorContext;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};

use crate::error::CredentialError;
use crate::parameter_store::{Parameter, ParameterStore};

/// Region used when neither params nor `AWS_REGION` name one
pub const DEFAULT_REGION: &str = "eu-west-2";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// SSM client wrapper
///
/// The SDK client is built on first use. Retries are disabled: a failed
/// call surfaces immediately.
#[derive(Debug)]
pub struct SsmParameterStore {
    region: String,
    endpoint: Option<String>,
    client: OnceCell<Client>,
}

impl SsmParameterStore {
    /// Create a store for a region
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            endpoint: None,
            client: OnceCell::new(),
        }
    }

    /// Create a store from provider parameters (`region`, `endpoint`)
    ///
    /// # Errors
    /// Returns `CredentialError::Config` if `params` is not a mapping of strings
    pub fn from_params(params: Option<&Value>) -> Result<Self, CredentialError> {
        let map = match params {
            None | Some(Value::Null) => None,
            Some(Value::Object(map)) => Some(map),
            Some(other) => {
                return Err(CredentialError::Config(format!(
                    "params must be a mapping, got {other}"
                )));
            }
        };
        let get = |key: &str| -> Result<Option<String>, CredentialError> {
            match map.and_then(|m| m.get(key)) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(other) => Err(CredentialError::Config(format!(
                    "`{key}` must be a string, got {other}"
                ))),
            }
        };

        let region = get("region")?
            .or_else(|| std::env::var("AWS_REGION").ok())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());

        let mut store = Self::new(region);
        store.endpoint = get("endpoint")?;
        Ok(store)
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                let mut loader = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.region.clone()))
                    .retry_config(RetryConfig::disabled())
                    .timeout_config(
                        TimeoutConfig::builder()
                            .connect_timeout(CONNECT_TIMEOUT)
                            .build(),
                    );
                if let Some(endpoint) = &self.endpoint {
                    loader = loader.endpoint_url(endpoint);
                }
                debug!(region = %self.region, "building SSM client");
                Client::new(&loader.load().await)
            })
            .await
    }
}

#[async_trait]
impl ParameterStore for SsmParameterStore {
    #[instrument(skip_all, fields(count = names.len()))]
    async fn get_parameters(
        &self,
        names: &[String],
        with_decryption: bool,
    ) -> Result<Vec<Parameter>, CredentialError> {
        let output = self
            .client()
            .await
            .get_parameters()
            .set_names(Some(names.to_vec()))
            .with_decryption(with_decryption)
            .send()
            .await
            .map_err(|e| CredentialError::RemoteStore(DisplayErrorContext(&e).to_string()))?;

        Ok(output
            .parameters()
            .iter()
            .filter_map(|p| Some(Parameter::new(p.name()?, p.value()?)))
            .collect())
    }
}
