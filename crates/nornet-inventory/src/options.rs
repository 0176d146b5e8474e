//! Per-transport connection options and secret injection

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Transport that receives the platform driver for getter-style access
pub const GETTER_TRANSPORT: &str = "napalm";

/// Transports present in a freshly initialised options tree
pub const DEFAULT_TRANSPORTS: [&str; 3] = ["netmiko", "napalm", "scrapli"];

/// Connection options for one transport
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransportOptions {
    /// Hostname override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Port override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Username override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// Password override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Platform override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Transport-specific extras
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub extras: Map<String, Value>,
    /// Where to write the secret instead of the transport default
    #[serde(default, rename = "connection_secret_path", skip_serializing)]
    pub secret_path: Option<String>,
    /// Where to write the enable password instead of the transport default
    #[serde(
        default,
        rename = "connection_enable_password_path",
        skip_serializing
    )]
    pub enable_password_path: Option<String>,
    /// Secret override already taken out of the stanza
    #[serde(skip)]
    pub(crate) consumed_secret_path: Option<String>,
    /// Enable-password override already taken out of the stanza
    #[serde(skip)]
    pub(crate) consumed_enable_password_path: Option<String>,
}

impl TransportOptions {
    /// Take the override path declared for a secret kind
    ///
    /// The declared key is removed from the stanza. The location is kept
    /// so later injections of the same kind write to the same place.
    pub fn take_override_path(&mut self, kind: SecretKind) -> Option<String> {
        let (declared, consumed) = match kind {
            SecretKind::Secret => (&mut self.secret_path, &mut self.consumed_secret_path),
            SecretKind::EnablePassword => (
                &mut self.enable_password_path,
                &mut self.consumed_enable_password_path,
            ),
        };
        if let Some(path) = declared.take() {
            *consumed = Some(path);
        }
        consumed.clone()
    }

    /// Write a value below `extras`, creating intermediate objects
    ///
    /// Intermediate values that are not objects are replaced.
    pub fn set_extra(&mut self, keys: &[&str], value: Option<&str>) {
        let Some((last, parents)) = keys.split_last() else {
            return;
        };

        let mut node = &mut self.extras;
        for key in parents {
            let slot = node
                .entry((*key).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            node = match slot {
                Value::Object(map) => map,
                _ => return,
            };
        }

        let value = value.map_or(Value::Null, |v| Value::String(v.to_string()));
        node.insert((*last).to_string(), value);
    }

    /// Look up a value below `extras`
    #[must_use]
    pub fn extra(&self, keys: &[&str]) -> Option<&Value> {
        let (first, rest) = keys.split_first()?;
        rest.iter()
            .try_fold(self.extras.get(*first)?, |node, key| node.get(*key))
    }

    /// Write a value at a path relative to this stanza
    ///
    /// Single-segment paths naming a typed field set that field; a leading
    /// `extras` segment descends into the extras; anything else lands in
    /// the extras as given.
    pub fn set_path(&mut self, keys: &[&str], value: Option<&str>) {
        let owned = value.map(str::to_string);
        match keys {
            [] => {}
            ["hostname"] => self.hostname = owned,
            ["username"] => self.username = owned,
            ["password"] => self.password = owned,
            ["platform"] => self.platform = owned,
            ["extras", rest @ ..] => self.set_extra(rest, value),
            _ => self.set_extra(keys, value),
        }
    }
}

impl fmt::Debug for TransportOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportOptions")
            .field("hostname", &self.hostname)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("platform", &self.platform)
            .field("extras", &self.extras.keys().collect::<Vec<_>>())
            .field("secret_path", &self.secret_path)
            .field("enable_password_path", &self.enable_password_path)
            .finish()
    }
}

/// Connection options keyed by transport name, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionOptionsTree(IndexMap<String, TransportOptions>);

impl ConnectionOptionsTree {
    /// Create an empty tree
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tree holding an empty stanza for each default transport
    #[must_use]
    pub fn with_default_transports() -> Self {
        Self(
            DEFAULT_TRANSPORTS
                .iter()
                .map(|name| ((*name).to_string(), TransportOptions::default()))
                .collect(),
        )
    }

    /// Add or replace a transport stanza
    #[must_use]
    pub fn with_transport(mut self, name: impl Into<String>, options: TransportOptions) -> Self {
        self.0.insert(name.into(), options);
        self
    }

    /// Stanza for a transport
    #[must_use]
    pub fn get(&self, transport: &str) -> Option<&TransportOptions> {
        self.0.get(transport)
    }

    /// Mutable stanza for a transport
    pub fn get_mut(&mut self, transport: &str) -> Option<&mut TransportOptions> {
        self.0.get_mut(transport)
    }

    /// Stanza for a transport, created empty when missing
    pub fn entry(&mut self, transport: &str) -> &mut TransportOptions {
        self.0.entry(transport.to_string()).or_default()
    }

    /// Transport names in declaration order
    pub fn transports(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Iterate over stanzas in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TransportOptions)> {
        self.0.iter().map(|(name, options)| (name.as_str(), options))
    }

    /// Number of stanzas
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the tree has no stanzas
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Write a value at an absolute dotted path
    ///
    /// The first segment names the transport; its stanza is created when
    /// missing. A path naming only a transport is ignored.
    pub fn set_path(&mut self, path: &str, value: Option<&str>) {
        let segments: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
        match segments.split_first() {
            Some((_, [])) | None => {
                warn!(path = %path, "Secret path does not address a field, skipped");
            }
            Some((transport, rest)) => self.entry(transport).set_path(rest, value),
        }
    }
}

/// Kind of secret written into the options tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SecretKind {
    /// Privileged-mode secret
    Secret,
    /// Enable password
    EnablePassword,
}

impl SecretKind {
    /// Stanza key that overrides the default write location
    #[must_use]
    pub fn override_key(self) -> &'static str {
        match self {
            SecretKind::Secret => "connection_secret_path",
            SecretKind::EnablePassword => "connection_enable_password_path",
        }
    }
}

impl fmt::Display for SecretKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretKind::Secret => write!(f, "secret"),
            SecretKind::EnablePassword => write!(f, "enable_password"),
        }
    }
}

/// Writes a secret into one transport's stanza
pub type InjectFn = Arc<dyn Fn(&mut TransportOptions, Option<&str>) + Send + Sync>;

/// Places secrets into the transport-specific locations of an options tree
#[derive(Clone)]
pub struct SecretInjector {
    adapters: HashMap<(SecretKind, String), InjectFn>,
}

impl SecretInjector {
    /// Injector without any transport adapters
    #[must_use]
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Injector with adapters for netmiko, napalm and scrapli
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut injector = Self::empty();
        injector.register_path(SecretKind::Secret, "netmiko", &["secret"]);
        injector.register_path(SecretKind::EnablePassword, "netmiko", &["enable_password"]);
        injector.register_path(SecretKind::Secret, "napalm", &["optional_args", "secret"]);
        injector.register_path(
            SecretKind::EnablePassword,
            "napalm",
            &["optional_args", "enable_password"],
        );
        injector.register_path(SecretKind::Secret, "scrapli", &["auth_secondary"]);
        injector.register_path(SecretKind::EnablePassword, "scrapli", &["enable_password"]);
        injector
    }

    /// Register a custom adapter for a transport
    pub fn register<F>(&mut self, kind: SecretKind, transport: impl Into<String>, inject: F)
    where
        F: Fn(&mut TransportOptions, Option<&str>) + Send + Sync + 'static,
    {
        self.adapters
            .insert((kind, transport.into()), Arc::new(inject));
    }

    /// Register an adapter writing to a fixed location below `extras`
    pub fn register_path(&mut self, kind: SecretKind, transport: &str, keys: &[&str]) {
        let keys: Vec<String> = keys.iter().map(|k| (*k).to_string()).collect();
        self.register(kind, transport, move |options, value| {
            let keys: Vec<&str> = keys.iter().map(String::as_str).collect();
            options.set_extra(&keys, value);
        });
    }

    /// Whether an adapter exists for a transport
    #[must_use]
    pub fn supports(&self, kind: SecretKind, transport: &str) -> bool {
        self.adapters.contains_key(&(kind, transport.to_string()))
    }

    /// Inject a secret into every stanza of the tree
    ///
    /// A stanza's override path wins over the transport adapter. Stanzas
    /// with neither are left untouched. Injecting the same value twice
    /// yields the same tree.
    pub fn inject(&self, tree: &mut ConnectionOptionsTree, kind: SecretKind, value: Option<&str>) {
        let transports: Vec<String> = tree.transports().map(str::to_string).collect();

        for transport in transports {
            let override_path = tree
                .get_mut(&transport)
                .and_then(|options| options.take_override_path(kind));

            if let Some(path) = override_path {
                debug!(transport = %transport, kind = %kind, path = %path, "Injecting at override path");
                tree.set_path(&path, value);
                continue;
            }

            match self.adapters.get(&(kind, transport.clone())) {
                Some(adapter) => {
                    debug!(transport = %transport, kind = %kind, "Injecting at transport default");
                    adapter(tree.entry(&transport), value);
                }
                None => {
                    debug!(transport = %transport, kind = %kind, "No secret location, skipped");
                }
            }
        }
    }
}

impl Default for SecretInjector {
    fn default() -> Self {
        Self::with_builtin()
    }
}

impl fmt::Debug for SecretInjector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut adapters: Vec<String> = self
            .adapters
            .keys()
            .map(|(kind, transport)| format!("{transport}.{kind}"))
            .collect();
        adapters.sort();
        f.debug_struct("SecretInjector")
            .field("adapters", &adapters)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn inject_both(tree: &mut ConnectionOptionsTree, value: Option<&str>) {
        let injector = SecretInjector::with_builtin();
        injector.inject(tree, SecretKind::Secret, value);
        injector.inject(tree, SecretKind::EnablePassword, value);
    }

    #[test]
    fn test_builtin_locations() {
        let mut tree = ConnectionOptionsTree::with_default_transports();
        inject_both(&mut tree, Some("en4ble"));

        let netmiko = tree.get("netmiko").unwrap();
        assert_eq!(netmiko.extra(&["secret"]), Some(&json!("en4ble")));
        assert_eq!(netmiko.extra(&["enable_password"]), Some(&json!("en4ble")));

        let napalm = tree.get("napalm").unwrap();
        assert_eq!(
            napalm.extra(&["optional_args", "secret"]),
            Some(&json!("en4ble"))
        );
        assert_eq!(
            napalm.extra(&["optional_args", "enable_password"]),
            Some(&json!("en4ble"))
        );

        let scrapli = tree.get("scrapli").unwrap();
        assert_eq!(scrapli.extra(&["auth_secondary"]), Some(&json!("en4ble")));
        assert_eq!(scrapli.extra(&["enable_password"]), Some(&json!("en4ble")));
    }

    #[test]
    fn test_override_path_wins() {
        let tree: ConnectionOptionsTree = serde_json::from_value(json!({
            "napalm": {
                "extras": {"optional_args": {"transport": "ssh"}},
                "connection_secret_path": "napalm.extras.optional_args.enable_secret"
            }
        }))
        .unwrap();
        let mut tree = tree;
        SecretInjector::with_builtin().inject(&mut tree, SecretKind::Secret, Some("s3"));

        let napalm = tree.get("napalm").unwrap();
        assert_eq!(
            napalm.extra(&["optional_args", "enable_secret"]),
            Some(&json!("s3"))
        );
        assert_eq!(napalm.extra(&["optional_args", "secret"]), None);
        assert_eq!(
            napalm.extra(&["optional_args", "transport"]),
            Some(&json!("ssh"))
        );
    }

    #[test]
    fn test_override_key_never_serialized() {
        let tree: ConnectionOptionsTree = serde_json::from_value(json!({
            "netmiko": {"connection_secret_path": "netmiko.password"}
        }))
        .unwrap();
        let mut tree = tree;
        SecretInjector::with_builtin().inject(&mut tree, SecretKind::Secret, Some("s3"));

        assert_eq!(tree.get("netmiko").unwrap().password.as_deref(), Some("s3"));
        let rendered = serde_json::to_value(&tree).unwrap();
        assert_eq!(rendered, json!({"netmiko": {"password": "s3"}}));
    }

    #[test]
    fn test_override_key_taken_from_stanza() {
        let mut tree: ConnectionOptionsTree = serde_json::from_value(json!({
            "napalm": {
                "connection_secret_path": "napalm.extras.optional_args.secret_pw",
                "connection_enable_password_path": "napalm.extras.optional_args.enable_pw"
            }
        }))
        .unwrap();
        inject_both(&mut tree, Some("s3"));

        let napalm = tree.get("napalm").unwrap();
        assert_eq!(napalm.secret_path, None);
        assert_eq!(napalm.enable_password_path, None);

        inject_both(&mut tree, Some("s4"));
        let napalm = tree.get("napalm").unwrap();
        assert_eq!(
            napalm.extra(&["optional_args", "secret_pw"]),
            Some(&json!("s4"))
        );
        assert_eq!(
            napalm.extra(&["optional_args", "enable_pw"]),
            Some(&json!("s4"))
        );
        assert_eq!(napalm.extra(&["optional_args", "secret"]), None);
        assert_eq!(napalm.extra(&["optional_args", "enable_password"]), None);
    }

    #[test]
    fn test_override_path_creates_missing_transport() {
        let tree: ConnectionOptionsTree = serde_json::from_value(json!({
            "netmiko": {"connection_secret_path": "custom.extras.auth.secret"}
        }))
        .unwrap();
        let mut tree = tree;
        SecretInjector::with_builtin().inject(&mut tree, SecretKind::Secret, Some("s3"));

        let custom = tree.get("custom").unwrap();
        assert_eq!(custom.extra(&["auth", "secret"]), Some(&json!("s3")));
        assert_eq!(tree.get("netmiko").unwrap().extra(&["secret"]), None);
    }

    #[test]
    fn test_unknown_transport_skipped() {
        let mut tree = ConnectionOptionsTree::new()
            .with_transport("ncclient", TransportOptions::default());
        inject_both(&mut tree, Some("s3"));

        assert_eq!(tree.get("ncclient"), Some(&TransportOptions::default()));
    }

    #[test]
    fn test_custom_adapter() {
        let mut injector = SecretInjector::with_builtin();
        injector.register(SecretKind::Secret, "ncclient", |options, value| {
            options.password = value.map(str::to_string);
        });
        assert!(injector.supports(SecretKind::Secret, "ncclient"));
        assert!(!injector.supports(SecretKind::EnablePassword, "ncclient"));

        let mut tree = ConnectionOptionsTree::new()
            .with_transport("ncclient", TransportOptions::default());
        injector.inject(&mut tree, SecretKind::Secret, Some("s3"));

        assert_eq!(tree.get("ncclient").unwrap().password.as_deref(), Some("s3"));
    }

    #[test]
    fn test_none_secret_written_as_null() {
        let mut tree = ConnectionOptionsTree::with_default_transports();
        inject_both(&mut tree, None);

        assert_eq!(
            tree.get("netmiko").unwrap().extra(&["secret"]),
            Some(&Value::Null)
        );
    }

    #[test]
    fn test_injection_is_idempotent() {
        let mut tree: ConnectionOptionsTree = serde_json::from_value(json!({
            "netmiko": {},
            "napalm": {"connection_enable_password_path": "napalm.extras.enable"},
            "scrapli": {"extras": {"auth_secondary": "stale"}}
        }))
        .unwrap();

        inject_both(&mut tree, Some("s3"));
        let once = tree.clone();
        inject_both(&mut tree, Some("s3"));

        assert_eq!(tree, once);
    }

    #[test]
    fn test_set_extra_replaces_scalar_parent() {
        let mut options = TransportOptions::default();
        options.extras.insert("optional_args".to_string(), json!("flat"));
        options.set_extra(&["optional_args", "secret"], Some("s3"));

        assert_eq!(
            options.extra(&["optional_args", "secret"]),
            Some(&json!("s3"))
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let mut options = TransportOptions {
            password: Some("hunter2".to_string()),
            ..TransportOptions::default()
        };
        options.set_extra(&["secret"], Some("en4ble"));

        let rendered = format!("{options:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(!rendered.contains("en4ble"));
    }
}
