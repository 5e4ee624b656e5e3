//! SQL value type shared by rendering, binding and result extraction
//!
//! Bound arguments and raw driver cells live in the same type so the
//! coercion layer can run over its own output without special cases.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;

/// Generic SQL value for parameter binding and result extraction
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SqlValue {
    Null,
    Bool(bool),
    BigInt(i64),
    UnsignedBigInt(u64),
    Double(f64),
    String(String),
    /// Weakly typed driver payload (text protocol cells, BIT, BLOB)
    Bytes(Vec<u8>),
    Json(JsonValue),
    /// Driver-native date/time value
    Timestamp(DateTime<FixedOffset>),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Build a bind value from a request operand
    ///
    /// Scalars map to their native variant; arrays and objects stay JSON.
    pub fn from_json(value: &JsonValue) -> Self {
        match value {
            JsonValue::Null => SqlValue::Null,
            JsonValue::Bool(b) => SqlValue::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SqlValue::BigInt(i)
                } else if let Some(u) = n.as_u64() {
                    SqlValue::UnsignedBigInt(u)
                } else {
                    SqlValue::Double(n.as_f64().unwrap_or_default())
                }
            }
            JsonValue::String(s) => SqlValue::String(s.clone()),
            JsonValue::Array(_) | JsonValue::Object(_) => SqlValue::Json(value.clone()),
        }
    }

    /// Convert to the JSON representation returned to callers
    pub fn to_json(&self) -> JsonValue {
        match self {
            SqlValue::Null => JsonValue::Null,
            SqlValue::Bool(b) => JsonValue::Bool(*b),
            SqlValue::BigInt(i) => JsonValue::from(*i),
            SqlValue::UnsignedBigInt(u) => JsonValue::from(*u),
            SqlValue::Double(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            SqlValue::String(s) => JsonValue::String(s.clone()),
            SqlValue::Bytes(bytes) => JsonValue::String(base64_encode(bytes)),
            SqlValue::Json(j) => j.clone(),
            SqlValue::Timestamp(ts) => JsonValue::String(ts.to_rfc3339()),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SqlValue::BigInt(i) => Some(*i),
            SqlValue::UnsignedBigInt(u) => i64::try_from(*u).ok(),
            SqlValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Text view of string-like cells
    pub fn as_text(&self) -> Option<std::borrow::Cow<'_, str>> {
        match self {
            SqlValue::String(s) => Some(std::borrow::Cow::Borrowed(s.as_str())),
            SqlValue::Bytes(b) => Some(String::from_utf8_lossy(b)),
            _ => None,
        }
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::BigInt(value as i64)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::BigInt(value)
    }
}

impl From<u64> for SqlValue {
    fn from(value: u64) -> Self {
        SqlValue::UnsignedBigInt(value)
    }
}

impl From<f64> for SqlValue {
    fn from(value: f64) -> Self {
        SqlValue::Double(value)
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::String(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::String(value.to_string())
    }
}

impl From<&JsonValue> for SqlValue {
    fn from(value: &JsonValue) -> Self {
        SqlValue::from_json(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => SqlValue::Null,
        }
    }
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => write!(f, "NULL"),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::BigInt(i) => write!(f, "{}", i),
            SqlValue::UnsignedBigInt(u) => write!(f, "{}", u),
            SqlValue::Double(v) => write!(f, "{}", v),
            SqlValue::String(s) => write!(f, "'{}'", s),
            SqlValue::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            SqlValue::Json(j) => write!(f, "{}", j),
            SqlValue::Timestamp(ts) => write!(f, "{}", ts.to_rfc3339()),
        }
    }
}

fn base64_encode(data: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.encode(data)
}
