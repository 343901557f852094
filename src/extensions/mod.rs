//! Request policies layered on top of the orchestrator
//!
//! [`UniqueRequests`] aborts an in-flight request when a newer one with the
//! same uniqueness key starts. [`AbortRegistry`] aborts every abortable
//! in-flight request at once.

pub mod abort;
pub mod unique;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use abort::{AbortRegistry, ABORT_ATTRIBUTE};
pub use unique::{UniqueRequests, UNIQUE_ATTRIBUTE};

const DEFAULT_UNIQUE_KEY: &str = "default";

/// Uniqueness key of a request. Serialized as `false` or the key string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum UniqueKey {
    Disabled,
    Key(String),
}

impl UniqueKey {
    pub fn key(key: impl Into<String>) -> Self {
        UniqueKey::Key(key.into())
    }

    /// Parse an attribute or config string. `off`/`false` disable the policy.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "true" => Self::default(),
            "off" | "false" => UniqueKey::Disabled,
            key => UniqueKey::Key(key.to_string()),
        }
    }

    pub fn as_key(&self) -> Option<&str> {
        match self {
            UniqueKey::Disabled => None,
            UniqueKey::Key(key) => Some(key),
        }
    }
}

impl Default for UniqueKey {
    fn default() -> Self {
        UniqueKey::Key(DEFAULT_UNIQUE_KEY.to_string())
    }
}

impl From<Value> for UniqueKey {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(false) => UniqueKey::Disabled,
            Value::String(text) => Self::parse(&text),
            _ => Self::default(),
        }
    }
}

impl From<UniqueKey> for Value {
    fn from(key: UniqueKey) -> Self {
        match key {
            UniqueKey::Disabled => Value::Bool(false),
            UniqueKey::Key(key) => Value::String(key),
        }
    }
}

/// Read an on/off attribute; anything but `off`/`false` counts as on.
pub(crate) fn parse_flag(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "off" | "false")
}
