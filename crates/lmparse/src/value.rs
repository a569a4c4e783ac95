//! Values produced by [crate::schema::to_structure].

use indexmap::IndexMap;

/// Structured result of a decode: output keys mapped to values, in schema order.
pub type Record = IndexMap<String, Value>;

/// A decoded value in the structured result.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize), serde(untagged))]
pub enum Value {
    /// Decimal integer, possibly scaled.
    Int(u128),
    /// Uppercase hex, timestamp, `NA`, or a `0x`/`0b` prefixed raw string.
    Text(String),
    /// Nested result of a child layout.
    Record(Record),
}

impl Value {
    pub fn as_int(&self) -> Option<u128> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }
}

impl From<u128> for Value {
    fn from(value: u128) -> Self {
        Value::Int(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<Record> for Value {
    fn from(value: Record) -> Self {
        Value::Record(value)
    }
}
