//! Transport-neutral value representation for encoded component fields.
//!
//! A [`Value`] is what a [`ValueCodec`](crate::codec::ValueCodec) produces
//! from a raw field value and consumes when decoding. It knows nothing about
//! component types; it is the shared vocabulary between codecs and the
//! [`ComponentRecord`](crate::record::ComponentRecord) container.
//!
//! Use [`to_value`] and [`from_value`] to bridge arbitrary serde types.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Encoded field value.
///
/// `Null` only appears nested inside [`Value::List`] or [`Value::Map`]. A
/// record never carries a top-level null field: absent values are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Short name of the variant, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::UInt(_) => "uint",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Numeric view; integers are widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            Value::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert into a `serde_json::Value`.
    ///
    /// Non-finite floats have no JSON form and become `null`. Bytes become an
    /// array of numbers, which is also what serde produces for `Vec<u8>`.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::UInt(u) => Json::from(*u),
            Value::Float(f) => serde_json::Number::from_f64(*f).map_or(Json::Null, Json::Number),
            Value::String(s) => Json::String(s.clone()),
            Value::Bytes(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;

        match json {
            Json::Null => Value::Null,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => {
                if let Some(u) = n.as_u64() {
                    Value::UInt(u)
                } else if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else {
                    n.as_f64().map_or(Value::Null, Value::Float)
                }
            }
            Json::String(s) => Value::String(s),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Json::Object(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::UInt(v as u64)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_owned())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::List(v)
    }
}

// ---------------------------------------------------------------------------
// serde bridge
// ---------------------------------------------------------------------------

/// Convert any `T: Serialize` into a [`Value`].
///
/// Fails for shapes JSON cannot express, such as maps with non-string keys.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(value).map(Value::from)
}

/// Convert a [`Value`] back into any `T: DeserializeOwned`.
pub fn from_value<T: DeserializeOwned>(value: &Value) -> Result<T, serde_json::Error> {
    serde_json::from_value(value.to_json())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Inner {
        label: String,
        weights: Vec<f32>,
    }

    #[test]
    fn float_stays_float() {
        assert_eq!(to_value(&1.0f64).unwrap(), Value::Float(1.0));
        assert_eq!(to_value(&-2.5f64).unwrap(), Value::Float(-2.5));
    }

    #[test]
    fn integers_pick_signedness() {
        assert_eq!(to_value(&7u32).unwrap(), Value::UInt(7));
        assert_eq!(to_value(&-7i32).unwrap(), Value::Int(-7));
    }

    #[test]
    fn nested_struct_roundtrip() {
        let inner = Inner {
            label: "core".to_owned(),
            weights: vec![0.1, 0.25, 3.0],
        };
        let value = to_value(&inner).unwrap();
        assert!(matches!(value, Value::Map(_)));
        let back: Inner = from_value(&value).unwrap();
        assert_eq!(back, inner);
    }

    #[test]
    fn option_none_is_nested_null() {
        let value = to_value(&vec![Some(1u8), None]).unwrap();
        assert_eq!(value, Value::List(vec![Value::UInt(1), Value::Null]));
    }

    #[test]
    fn non_string_map_keys_are_rejected() {
        let mut map = BTreeMap::new();
        map.insert(vec![1u8], 2u8);
        assert!(to_value(&map).is_err());
    }

    #[test]
    fn non_finite_float_has_no_json_form() {
        assert_eq!(Value::Float(f64::NAN).to_json(), serde_json::Value::Null);
        assert!(from_value::<f64>(&Value::Float(f64::INFINITY)).is_err());
    }

    #[test]
    fn integer_decodes_into_float_field() {
        let x: f64 = from_value(&Value::UInt(3)).unwrap();
        assert_eq!(x, 3.0);
    }

    #[test]
    fn bytes_decode_as_u8_vec() {
        let bytes: Vec<u8> = from_value(&Value::Bytes(vec![1, 2, 255])).unwrap();
        assert_eq!(bytes, vec![1, 2, 255]);
    }

    #[test]
    fn accessors() {
        assert_eq!(Value::UInt(5).as_i64(), Some(5));
        assert_eq!(Value::Int(-1).as_u64(), None);
        assert_eq!(Value::from("a").as_str(), Some("a"));
        assert_eq!(Value::Int(2).as_f64(), Some(2.0));
        assert_eq!(Value::Bool(true).kind(), "bool");
    }
}
