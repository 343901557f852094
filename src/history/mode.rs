use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How a successful request is mirrored into native history.
///
/// Serialized as `true`, `"replace"` or `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum HistoryMode {
    #[default]
    Push,
    Replace,
    Disabled,
}

impl HistoryMode {
    /// Parse an attribute or config string. Unknown values fall back to `Push`.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "replace" => HistoryMode::Replace,
            "off" | "false" => HistoryMode::Disabled,
            _ => HistoryMode::Push,
        }
    }

    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Bool(false) => HistoryMode::Disabled,
            Value::String(text) => Self::parse(text),
            _ => HistoryMode::Push,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self, HistoryMode::Disabled)
    }
}

impl From<Value> for HistoryMode {
    fn from(value: Value) -> Self {
        Self::from_json(&value)
    }
}

impl From<HistoryMode> for Value {
    fn from(mode: HistoryMode) -> Self {
        match mode {
            HistoryMode::Push => Value::Bool(true),
            HistoryMode::Replace => Value::String("replace".into()),
            HistoryMode::Disabled => Value::Bool(false),
        }
    }
}

impl From<bool> for HistoryMode {
    fn from(enabled: bool) -> Self {
        if enabled {
            HistoryMode::Push
        } else {
            HistoryMode::Disabled
        }
    }
}
