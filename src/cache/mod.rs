//! Snippet cache
//!
//! Stores a snapshot of the page's fragments alongside every history entry
//! and restores it when the user navigates back or forward to that entry.

pub mod events;
pub mod snippet_cache;
pub mod storage;
pub mod updater;

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use events::{CacheEvent, CacheEventKind, FetchEvent, RestoreEvent, StoreEvent};
pub use snippet_cache::{SnippetCache, SNIPPET_CACHE_ATTRIBUTE};
pub use storage::{
    HistoryStorage, OffStorage, SessionStorage, SnippetStorage, StorageKind, TabStore,
};
pub use updater::{SnippetUpdater, SNIPPETS_FIELD};

/// Fragment id → markup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot(BTreeMap<String, String>);

impl Snapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read the `{id: markup}` object a server sends; non-string values are skipped.
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        Some(
            object
                .iter()
                .filter_map(|(id, markup)| markup.as_str().map(|m| (id.clone(), m.to_string())))
                .collect(),
        )
    }

    pub fn insert(&mut self, id: impl Into<String>, markup: impl Into<String>) {
        self.0.insert(id.into(), markup.into());
    }

    pub fn get(&self, id: &str) -> Option<&str> {
        self.0.get(id).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for Snapshot {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Backend-specific handle to a stored snapshot. Only the backend that
/// produced a key can interpret it.
///
/// Variants are tagged on the wire so a consumer key shaped like an id or a
/// snapshot still comes back as [`CacheKey::Other`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum CacheKey {
    /// Nothing stored.
    Empty,
    /// Opaque identifier into external storage.
    Id(String),
    /// The snapshot itself.
    Inline(Snapshot),
    /// Anything a consumer backend chooses.
    Other(Value),
}

/// Backend selector carried in options, e.g. `"history"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct StorageTag(String);

impl StorageTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Parse an attribute or config value. `off`/`false` disable caching.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "" | "true" => Self::default(),
            "false" | "off" => StorageKind::Off.into(),
            other => Self(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn kind(&self) -> Option<StorageKind> {
        StorageKind::parse(&self.0)
    }
}

impl Default for StorageTag {
    fn default() -> Self {
        StorageKind::History.into()
    }
}

impl fmt::Display for StorageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<StorageKind> for StorageTag {
    fn from(kind: StorageKind) -> Self {
        Self(kind.as_str().to_string())
    }
}

impl From<&str> for StorageTag {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<bool> for StorageTag {
    fn from(enabled: bool) -> Self {
        if enabled {
            Self::default()
        } else {
            StorageKind::Off.into()
        }
    }
}

impl From<Value> for StorageTag {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(enabled) => enabled.into(),
            Value::String(text) => Self::parse(&text),
            _ => Self::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("tab storage quota of {0} bytes exceeded")]
    QuotaExceeded(usize),

    #[error("tab storage unavailable: {0}")]
    Unavailable(String),

    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("cannot refresh `{0}` outside an async runtime")]
    NoRuntime(String),
}
