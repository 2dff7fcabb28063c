//! Schema-free JSON value model
//!
//! The structured output of a result message has a shape only the caller
//! knows, so it is captured as a [`JsonValue`] tree and re-encoded to a
//! canonical string before being decoded into the caller's type.
//!
//! Canonical form is compact JSON with object keys in sorted order. Two
//! values that compare equal always produce the same canonical string.
//!
//! Non-finite floats have no JSON representation and encode as `null`.
//! Integral floats survive a round trip through this crate (`1.0` stays
//! `1.0`), but producers are free to renormalize them to integers.

use crate::error::{ProtocolError, Result};
use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A JSON number, keeping integers exact
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JsonNumber {
    /// Integer that fits in `i64`
    Int(i64),

    /// Positive integer above `i64::MAX`
    UInt(u64),

    /// Anything with a fraction or exponent
    Float(f64),
}

impl JsonNumber {
    /// Value as `f64` (may lose precision for large integers)
    pub fn as_f64(&self) -> f64 {
        match *self {
            Self::Int(n) => n as f64,
            Self::UInt(n) => n as f64,
            Self::Float(n) => n,
        }
    }

    /// Value as `i64`, if it is an integer in range
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            Self::Int(n) => Some(n),
            Self::UInt(n) => i64::try_from(n).ok(),
            Self::Float(_) => None,
        }
    }

    /// Value as `u64`, if it is a non-negative integer
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Self::Int(n) => u64::try_from(n).ok(),
            Self::UInt(n) => Some(n),
            Self::Float(_) => None,
        }
    }
}

impl Serialize for JsonNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match *self {
            Self::Int(n) => serializer.serialize_i64(n),
            Self::UInt(n) => serializer.serialize_u64(n),
            Self::Float(n) if n.is_finite() => serializer.serialize_f64(n),
            Self::Float(_) => serializer.serialize_unit(),
        }
    }
}

/// Any JSON document
#[derive(Debug, Clone, PartialEq, Default)]
pub enum JsonValue {
    /// `null`
    #[default]
    Null,

    /// `true` / `false`
    Bool(bool),

    /// Numeric literal
    Number(JsonNumber),

    /// String literal
    String(String),

    /// Ordered array
    Array(Vec<JsonValue>),

    /// Object; key order is not significant
    Object(BTreeMap<String, JsonValue>),
}

impl JsonValue {
    /// Re-encode to the canonical compact string
    ///
    /// # Errors
    ///
    /// Only fails if the underlying serializer fails, which does not happen
    /// for string-keyed trees in practice.
    pub fn to_canonical_string(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ProtocolError::from)
    }

    /// Name of the JSON type, for diagnostics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Look up an object member
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        match self {
            Self::Object(map) => map.get(key),
            _ => None,
        }
    }

    /// Look up an array element
    pub fn get_index(&self, index: usize) -> Option<&JsonValue> {
        match self {
            Self::Array(items) => items.get(index),
            _ => None,
        }
    }

    /// Whether this is `null`
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// String contents, if this is a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean value, if this is a bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value, if this is an integer in `i64` range
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Integer value, if this is a non-negative integer
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Self::Number(n) => n.as_u64(),
            _ => None,
        }
    }

    /// Numeric value as `f64`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n.as_f64()),
            _ => None,
        }
    }

    /// Array elements, if this is an array
    pub fn as_array(&self) -> Option<&[JsonValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Object members, if this is an object
    pub fn as_object(&self) -> Option<&BTreeMap<String, JsonValue>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }
}

impl Serialize for JsonValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Self::Object(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, value) in map {
                    out.serialize_entry(key, value)?;
                }
                out.end()
            }
        }
    }
}

struct JsonValueVisitor;

impl<'de> Visitor<'de> for JsonValueVisitor {
    type Value = JsonValue;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Number(JsonNumber::Int(v)))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<JsonValue, E> {
        let number = match i64::try_from(v) {
            Ok(n) => JsonNumber::Int(n),
            Err(_) => JsonNumber::UInt(v),
        };
        Ok(JsonValue::Number(number))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Number(JsonNumber::Float(v)))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::String(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::String(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<JsonValue, E> {
        Ok(JsonValue::Null)
    }

    fn visit_some<D: Deserializer<'de>>(
        self,
        deserializer: D,
    ) -> std::result::Result<JsonValue, D::Error> {
        JsonValue::deserialize(deserializer)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<JsonValue, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<JsonValue>()? {
            items.push(item);
        }
        Ok(JsonValue::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<JsonValue, A::Error> {
        let mut members = BTreeMap::new();
        // Duplicate keys: last one wins, as in serde_json::Value
        while let Some((key, value)) = map.next_entry::<String, JsonValue>()? {
            members.insert(key, value);
        }
        Ok(JsonValue::Object(members))
    }
}

impl<'de> Deserialize<'de> for JsonValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(JsonValueVisitor)
    }
}

impl fmt::Display for JsonValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self.to_canonical_string().map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl FromStr for JsonValue {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(ProtocolError::from)
    }
}

impl From<serde_json::Value> for JsonValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Number(JsonNumber::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Self::Number(JsonNumber::UInt(u))
                } else {
                    n.as_f64()
                        .map_or(Self::Null, |f| Self::Number(JsonNumber::Float(f)))
                }
            }
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::Array(items.into_iter().map(Self::from).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<JsonValue> for serde_json::Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(JsonNumber::Int(n)) => Self::from(n),
            JsonValue::Number(JsonNumber::UInt(n)) => Self::from(n),
            JsonValue::Number(JsonNumber::Float(n)) => {
                serde_json::Number::from_f64(n).map_or(Self::Null, Self::Number)
            }
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(items) => Self::Array(items.into_iter().map(Self::from).collect()),
            JsonValue::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from(v))).collect())
            }
        }
    }
}

impl From<bool> for JsonValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for JsonValue {
    fn from(value: i64) -> Self {
        Self::Number(JsonNumber::Int(value))
    }
}

impl From<f64> for JsonValue {
    fn from(value: f64) -> Self {
        Self::Number(JsonNumber::Float(value))
    }
}

impl From<&str> for JsonValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for JsonValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Vec<JsonValue>> for JsonValue {
    fn from(items: Vec<JsonValue>) -> Self {
        Self::Array(items)
    }
}

impl From<BTreeMap<String, JsonValue>> for JsonValue {
    fn from(members: BTreeMap<String, JsonValue>) -> Self {
        Self::Object(members)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[test]
    fn test_decode_nested_document() {
        let value: JsonValue =
            r#"{"name":"x","tags":["a","b"],"meta":{"n":3,"ok":true,"none":null}}"#
                .parse()
                .unwrap();

        assert_eq!(value.get("name").and_then(JsonValue::as_str), Some("x"));
        assert_eq!(value.get("tags").and_then(|t| t.as_array()).map(<[_]>::len), Some(2));
        let meta = value.get("meta").unwrap();
        assert_eq!(meta.get("n").and_then(JsonValue::as_i64), Some(3));
        assert_eq!(meta.get("ok").and_then(JsonValue::as_bool), Some(true));
        assert!(meta.get("none").unwrap().is_null());
        assert!(meta.get("missing").is_none());
    }

    #[test]
    fn test_canonical_string_sorts_keys() {
        let a: JsonValue = r#"{"b":1,"a":{"d":[1,2],"c":"x"}}"#.parse().unwrap();
        let b: JsonValue = r#"{ "a": { "c": "x", "d": [1, 2] }, "b": 1 }"#.parse().unwrap();

        assert_eq!(a, b);
        assert_eq!(
            a.to_canonical_string().unwrap(),
            r#"{"a":{"c":"x","d":[1,2]},"b":1}"#
        );
        assert_eq!(a.to_string(), b.to_string());
    }

    #[rstest]
    #[case("0", JsonNumber::Int(0))]
    #[case("-42", JsonNumber::Int(-42))]
    #[case("18446744073709551615", JsonNumber::UInt(u64::MAX))]
    #[case("2.5", JsonNumber::Float(2.5))]
    #[case("1e3", JsonNumber::Float(1000.0))]
    fn test_number_classification(#[case] input: &str, #[case] expected: JsonNumber) {
        let value: JsonValue = input.parse().unwrap();
        assert_eq!(value, JsonValue::Number(expected));
    }

    #[test]
    fn test_integral_float_keeps_float_form() {
        let value = JsonValue::from(1.0);
        let encoded = value.to_canonical_string().unwrap();
        assert_eq!(encoded, "1.0");
        assert_eq!(encoded.parse::<JsonValue>().unwrap(), value);
    }

    #[test]
    fn test_non_finite_float_encodes_as_null() {
        let value = JsonValue::Array(vec![JsonValue::from(f64::NAN), JsonValue::from(f64::INFINITY)]);
        assert_eq!(value.to_canonical_string().unwrap(), "[null,null]");
    }

    #[test]
    fn test_duplicate_keys_last_wins() {
        let value: JsonValue = r#"{"k":1,"k":2}"#.parse().unwrap();
        assert_eq!(value.get("k").and_then(JsonValue::as_i64), Some(2));
    }

    #[test]
    fn test_serde_json_value_conversion() {
        let original = serde_json::json!({"a": [1, -2, 3.5, u64::MAX], "b": null, "c": "s"});
        let ours = JsonValue::from(original.clone());
        assert_eq!(ours.get("a").and_then(|a| a.get_index(3)).and_then(JsonValue::as_u64), Some(u64::MAX));

        let back = serde_json::Value::from(ours);
        assert_eq!(back, original);
    }

    #[test]
    fn test_decode_into_typed_struct_via_serde_json() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct Answer {
            done: bool,
            count: u32,
        }

        let value: JsonValue = r#"{"done":true,"count":7}"#.parse().unwrap();
        let canonical = value.to_canonical_string().unwrap();
        let answer: Answer = serde_json::from_str(&canonical).unwrap();
        assert_eq!(answer, Answer { done: true, count: 7 });
    }

    #[test]
    fn test_invalid_document_is_error() {
        assert!("{\"unterminated\":".parse::<JsonValue>().is_err());
        assert!("".parse::<JsonValue>().is_err());
    }

    fn arb_json() -> impl Strategy<Value = JsonValue> {
        let leaf = prop_oneof![
            Just(JsonValue::Null),
            any::<bool>().prop_map(JsonValue::Bool),
            any::<i64>().prop_map(|n| JsonValue::Number(JsonNumber::Int(n))),
            ((i64::MAX as u64 + 1)..=u64::MAX).prop_map(|n| JsonValue::Number(JsonNumber::UInt(n))),
            (-1_000_000i32..1_000_000)
                .prop_map(|n| JsonValue::Number(JsonNumber::Float(f64::from(n) / 4.0))),
            "\\PC{0,16}".prop_map(JsonValue::String),
        ];
        leaf.prop_recursive(4, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(JsonValue::Array),
                prop::collection::btree_map("[a-z_]{0,8}", inner, 0..6).prop_map(JsonValue::Object),
            ]
        })
    }

    proptest! {
        /// Property: decoding the canonical encoding yields an equal value
        #[test]
        fn prop_canonical_round_trip(value in arb_json()) {
            let encoded = value.to_canonical_string().unwrap();
            let decoded: JsonValue = encoded.parse().unwrap();
            prop_assert_eq!(&decoded, &value);
            prop_assert_eq!(decoded.to_canonical_string().unwrap(), encoded);
        }
    }
}
