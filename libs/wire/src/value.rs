//! The transport-neutral structured value
//!
//! [`WireValue`] is the intermediate representation every argument and
//! return value passes through on its way across a process boundary.
//! Records preserve insertion order so composite values keep their
//! field-declaration order on the wire.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A value in transport-safe structured form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WireValue {
    /// Absent value
    Null,
    /// Boolean
    Bool(bool),
    /// Double-precision number; the only scalar numeric kind on the wire
    Number(f64),
    /// UTF-8 text
    Text(String),
    /// Ordered heterogeneous sequence
    List(Vec<WireValue>),
    /// String-keyed map in insertion order
    Record(Vec<(String, WireValue)>),
    /// Packed homogeneous array of doubles
    F64Array(Vec<f64>),
    /// Packed homogeneous array of 64-bit integers; keeps full integer
    /// precision that scalar `Number`s cannot
    I64Array(Vec<i64>),
    /// Opaque byte buffer, already transport-native
    Bytes(Bytes),
}

impl WireValue {
    /// Kind name for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            WireValue::Null => "null",
            WireValue::Bool(_) => "bool",
            WireValue::Number(_) => "number",
            WireValue::Text(_) => "text",
            WireValue::List(_) => "list",
            WireValue::Record(_) => "record",
            WireValue::F64Array(_) => "f64array",
            WireValue::I64Array(_) => "i64array",
            WireValue::Bytes(_) => "bytes",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, WireValue::Null)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            WireValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            WireValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Look up a record field by key
    pub fn get(&self, key: &str) -> Option<&WireValue> {
        match self {
            WireValue::Record(entries) => entries
                .iter()
                .find_map(|(k, v)| (k == key).then_some(v)),
            _ => None,
        }
    }
}

impl From<f64> for WireValue {
    fn from(n: f64) -> Self {
        WireValue::Number(n)
    }
}

impl From<bool> for WireValue {
    fn from(b: bool) -> Self {
        WireValue::Bool(b)
    }
}

impl From<&str> for WireValue {
    fn from(s: &str) -> Self {
        WireValue::Text(s.to_string())
    }
}

impl From<String> for WireValue {
    fn from(s: String) -> Self {
        WireValue::Text(s)
    }
}
