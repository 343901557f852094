//! Request data encoding
//!
//! Structured data is flattened with bracket notation (`a[b]=1`, `c[0]=2`)
//! and either folded into the query string (read verbs) or sent as a
//! form-encoded body (write verbs).

use serde_json::{Map, Value};
use url::form_urlencoded;
use url::Url;

pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Parsed JSON response body.
pub type Payload = Value;

/// The payload callers receive for suppressed or cancelled requests.
pub fn empty_payload() -> Payload {
    Value::Object(Map::new())
}

/// Request body bytes plus their content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestBody {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl RequestBody {
    pub fn new(content_type: Option<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type,
            bytes: bytes.into(),
        }
    }

    pub fn form(fields: &Value) -> Self {
        Self::new(
            Some(FORM_CONTENT_TYPE.to_string()),
            encode_pairs(&flatten_fields(fields)),
        )
    }
}

/// Data supplied with an interaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestData {
    #[default]
    Empty,
    /// Key/value structure, possibly nested.
    Fields(Value),
    /// Pre-encoded body passed through untouched.
    Raw(RequestBody),
}

impl RequestData {
    pub fn fields(value: Value) -> Self {
        RequestData::Fields(value)
    }

    /// Build field data from ordered `(name, value)` pairs, as a form submission yields.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = Map::new();
        for (name, value) in pairs {
            let name = name.into();
            let value = Value::String(value.into());
            match map.get_mut(&name) {
                Some(Value::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(name, value);
                }
            }
        }
        RequestData::Fields(Value::Object(map))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RequestData::Empty)
    }
}

/// Flatten nested data into ordered `(key, value)` pairs using bracket notation.
pub fn flatten_fields(value: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                flatten_into(key.clone(), nested, &mut pairs);
            }
        }
        Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                flatten_into(index.to_string(), nested, &mut pairs);
            }
        }
        _ => {}
    }
    pairs
}

fn flatten_into(key: String, value: &Value, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (sub, nested) in map {
                flatten_into(format!("{key}[{sub}]"), nested, pairs);
            }
        }
        Value::Array(items) => {
            for (index, nested) in items.iter().enumerate() {
                flatten_into(format!("{key}[{index}]"), nested, pairs);
            }
        }
        Value::Null => pairs.push((key, String::new())),
        Value::String(text) => pairs.push((key, text.clone())),
        scalar => pairs.push((key, scalar.to_string())),
    }
}

/// Form-encode pairs, keeping bracket notation in keys readable.
pub fn encode_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", encode_key(key), encode_component(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn encode_component(text: &str) -> String {
    form_urlencoded::byte_serialize(text.as_bytes()).collect()
}

fn encode_key(key: &str) -> String {
    encode_component(key).replace("%5B", "[").replace("%5D", "]")
}

/// Append flattened `fields` to the query string of `url`, after any existing query.
pub fn append_query(url: &mut Url, fields: &Value) {
    let pairs = flatten_fields(fields);
    if pairs.is_empty() {
        return;
    }

    let mut query = url.query().map(str::to_owned).unwrap_or_default();
    if !query.is_empty() {
        query.push('&');
    }
    query.push_str(&encode_pairs(&pairs));
    url.set_query(Some(&query));
}
