//! Result envelope returned by dispatched operations

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome of one operation against one host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResult {
    /// Name of the host the operation ran against
    pub host: String,
    /// Payload keyed by the operation's well-known result key
    pub result: Map<String, Value>,
    /// Error message, if the operation failed softly
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskResult {
    /// Create a successful result with an empty payload
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            result: Map::new(),
            error: None,
        }
    }

    /// Create a successful result carrying a single payload key
    pub fn with_value(host: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        let mut result = Self::new(host);
        result.result.insert(key.into(), value);
        result
    }

    /// Get a payload value by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.result.get(key)
    }

    /// Whether the result carries an error
    #[must_use]
    pub fn failed(&self) -> bool {
        self.error.is_some()
    }
}
