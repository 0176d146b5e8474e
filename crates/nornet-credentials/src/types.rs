//! Credential types

use std::fmt;

use serde_json::{Map, Value};

/// Free-form provider parameters from the run configuration
pub type ProviderParams = Map<String, Value>;

/// Resolved credentials for one device
///
/// `Debug` output never contains the secret values.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Login username
    pub username: Option<String>,
    /// Login password
    pub password: Option<String>,
    /// Enable / secondary secret
    pub secret: Option<String>,
    /// API key
    pub key: Option<String>,
}

impl Credentials {
    /// Create credentials from their four parts
    #[must_use]
    pub fn new(
        username: Option<String>,
        password: Option<String>,
        secret: Option<String>,
        key: Option<String>,
    ) -> Self {
        Self {
            username,
            password,
            secret,
            key,
        }
    }

    /// Destructure into `(username, password, secret, key)`
    #[must_use]
    pub fn into_tuple(
        self,
    ) -> (
        Option<String>,
        Option<String>,
        Option<String>,
        Option<String>,
    ) {
        (self.username, self.password, self.secret, self.key)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mask = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &mask(&self.password))
            .field("secret", &mask(&self.secret))
            .field("key", &mask(&self.key))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts() {
        let creds = Credentials::new(
            Some("admin".to_string()),
            Some("pw".to_string()),
            Some("enable".to_string()),
            None,
        );
        let rendered = format!("{creds:?}");

        assert!(rendered.contains("admin"));
        assert!(!rendered.contains("pw\""));
        assert!(!rendered.contains("enable"));
    }
}
