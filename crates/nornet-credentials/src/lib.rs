//! nornet-credentials: Device credential resolution
//!
//! Provides the credential provider trait and its implementations
//! (environment variables, remote parameter store), plus the registry the
//! run configuration selects a provider from.

pub mod env_vars;
pub mod error;
pub mod parameter_store;
pub mod registry;
#[cfg(feature = "ssm")]
pub mod ssm;
pub mod traits;
pub mod types;

pub use env_vars::EnvVarsProvider;
pub use error::CredentialError;
pub use parameter_store::{Parameter, ParameterStore, ParameterStoreProvider};
pub use registry::{ProviderFactory, ProviderRegistry};
#[cfg(feature = "ssm")]
pub use ssm::SsmParameterStore;
pub use traits::CredentialProvider;
pub use types::{Credentials, ProviderParams};
