//! The JSON value tree.

use std::fmt;

use bytes::Bytes;
use uuid::Uuid;

use super::{Number64, Utf8Bytes};

/// Ordered object members. Duplicate names are preserved in order.
pub type JsonObject = Vec<(Utf8Bytes, JsonValue)>;

/// A JSON value, plus the typed extensions the binary format can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Null,
    Bool(bool),
    Number(Number64),
    String(Utf8Bytes),
    Array(Vec<JsonValue>),
    Object(JsonObject),
    // Typed extensions
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    Float32(f32),
    Float64(f64),
    Guid(Uuid),
    Binary(Bytes),
}

impl JsonValue {
    /// Builds an object from `(name, value)` pairs.
    pub fn object<K, I>(members: I) -> Self
    where
        K: Into<Utf8Bytes>,
        I: IntoIterator<Item = (K, JsonValue)>,
    {
        Self::Object(members.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&JsonObject> {
        match self {
            Self::Object(members) => Some(members),
            _ => None,
        }
    }

    /// Returns the first member named `name`, if this is an object.
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.as_object()?
            .iter()
            .find(|(k, _)| k.as_str() == name)
            .map(|(_, v)| v)
    }
}

// -- Convenience conversions --

impl From<bool> for JsonValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for JsonValue {
    fn from(i: i64) -> Self {
        Self::Number(Number64::Integer(i))
    }
}

impl From<i32> for JsonValue {
    fn from(i: i32) -> Self {
        Self::Number(Number64::from(i))
    }
}

impl From<f64> for JsonValue {
    fn from(f: f64) -> Self {
        Self::Number(Number64::Double(f))
    }
}

impl From<Number64> for JsonValue {
    fn from(n: Number64) -> Self {
        Self::Number(n)
    }
}

impl From<String> for JsonValue {
    fn from(s: String) -> Self {
        Self::String(s.into())
    }
}

impl From<&str> for JsonValue {
    fn from(s: &str) -> Self {
        Self::String(s.into())
    }
}

impl From<Utf8Bytes> for JsonValue {
    fn from(s: Utf8Bytes) -> Self {
        Self::String(s)
    }
}

impl From<Uuid> for JsonValue {
    fn from(g: Uuid) -> Self {
        Self::Guid(g)
    }
}

impl From<Vec<JsonValue>> for JsonValue {
    fn from(v: Vec<JsonValue>) -> Self {
        Self::Array(v)
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = crate::text::to_json_text(self).map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_lookup_returns_first_match() {
        let v = JsonValue::object([
            ("id", JsonValue::from("a")),
            ("n", JsonValue::from(1)),
            ("id", JsonValue::from("b")),
        ]);
        assert_eq!(v.get("id").and_then(JsonValue::as_str), Some("a"));
        assert_eq!(v.get("missing"), None);
    }

    #[test]
    fn numbers_compare_across_tags() {
        assert_eq!(JsonValue::from(2), JsonValue::from(2.0));
        assert_ne!(JsonValue::from(2), JsonValue::Int64(2));
    }
}
