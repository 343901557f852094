use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cache::CacheKey;

/// Marker written into every entry this crate pushes.
pub const HISTORY_SOURCE: &str = "pagewire";

/// Which cache backend stored an entry's fragments, and under what key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnippetTag {
    pub storage: String,
    pub key: CacheKey,
}

/// State object handed to the native history stack.
///
/// Once pushed the entry belongs to the browser; it comes back unmodified
/// on pop navigation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub source: String,
    pub cursor: i64,
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snippets: Option<SnippetTag>,
}

impl HistoryEntry {
    pub fn new(cursor: i64, href: impl Into<String>) -> Self {
        Self {
            source: HISTORY_SOURCE.to_string(),
            cursor,
            href: href.into(),
            snippets: None,
        }
    }

    /// Read back a native state object. Foreign or malformed states yield `None`.
    pub fn from_state(state: &Value) -> Option<Self> {
        if state.get("source")?.as_str()? != HISTORY_SOURCE {
            return None;
        }
        serde_json::from_value(state.clone()).ok()
    }

    pub fn to_state(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}
