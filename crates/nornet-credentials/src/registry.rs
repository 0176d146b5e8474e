//! Registry of credential providers selectable by name

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::env_vars::EnvVarsProvider;
use crate::error::CredentialError;
use crate::traits::CredentialProvider;

/// Constructor for a provider, taking the configured parameters
pub type ProviderFactory = Arc<
    dyn Fn(Option<&Value>) -> Result<Arc<dyn CredentialProvider>, CredentialError> + Send + Sync,
>;

/// Name of the environment-variable provider
pub const ENV_VARS: &str = "env_vars";
/// Name of the AWS SSM parameter-store provider
pub const AWS_SSM: &str = "aws_ssm";

/// Maps configuration names to provider constructors
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in providers
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();

        let env_vars: ProviderFactory = Arc::new(|params: Option<&Value>| {
            let provider = EnvVarsProvider::new(params)?;
            Ok(Arc::new(provider) as Arc<dyn CredentialProvider>)
        });
        registry.register(ENV_VARS, env_vars.clone());
        registry.register("nornet_credentials::EnvVarsProvider", env_vars);

        #[cfg(feature = "ssm")]
        registry.register(
            AWS_SSM,
            Arc::new(|params: Option<&Value>| {
                let store = crate::ssm::SsmParameterStore::from_params(params)?;
                let provider = crate::parameter_store::ParameterStoreProvider::new(Arc::new(store));
                Ok(Arc::new(provider) as Arc<dyn CredentialProvider>)
            }),
        );

        registry
    }

    /// Register (or replace) a provider constructor
    pub fn register(&mut self, name: impl Into<String>, factory: ProviderFactory) {
        let name = name.into();
        debug!(provider = %name, "registering credentials provider");
        self.factories.insert(name, factory);
    }

    /// Look up a constructor by name
    ///
    /// # Errors
    /// Returns `CredentialError::UnknownProvider` if nothing is registered under `name`
    pub fn factory(&self, name: &str) -> Result<ProviderFactory, CredentialError> {
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| CredentialError::UnknownProvider(name.to_string()))
    }

    /// Construct the provider registered under `name`
    ///
    /// # Errors
    /// Returns `UnknownProvider` for unregistered names and whatever the
    /// provider constructor returns for bad parameters
    pub fn create(
        &self,
        name: &str,
        params: Option<&Value>,
    ) -> Result<Arc<dyn CredentialProvider>, CredentialError> {
        (self.factory(name)?)(params)
    }

    /// Registered provider names
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_builtin_env_vars() {
        let registry = ProviderRegistry::with_builtin();
        let provider = registry.create(ENV_VARS, None).unwrap();
        assert_eq!(provider.provider_type(), "env_vars");
        assert!(registry.names().any(|n| n == ENV_VARS));
    }

    #[test]
    fn test_unknown_provider() {
        let registry = ProviderRegistry::with_builtin();
        let result = registry.factory("vault");
        assert!(matches!(result, Err(CredentialError::UnknownProvider(name)) if name == "vault"));
    }

    #[test]
    fn test_bad_params_surface_from_constructor() {
        let registry = ProviderRegistry::with_builtin();
        let params = json!("not-a-map");
        let result = registry.create(ENV_VARS, Some(&params));
        assert!(matches!(result, Err(CredentialError::Config(_))));
    }
}
