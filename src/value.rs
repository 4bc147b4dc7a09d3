//! The owned value tree shared by the decoder and encoder (§3, §4.4, §4.5).
//!
//! The teacher's `Value<'a>` (`types.rs`) borrows its scalars as `Cow<'a,
//! str>` and keeps tables as `Rc<Vec<(Cow<'a, str>, Value<'a>)>>` — a flat
//! association list, not a map, so lookups are linear and duplicate keys are
//! only caught by a separate pass. This codec's `Value` is the bridge
//! between the parsed [`crate::ast::Document`] and `serde`: it owns its
//! data, and represents tables as an [`indexmap::IndexMap`] so lookups are
//! O(1) while still preserving first-insertion order for the encoder (§4.5
//! rule 9).

use std::fmt;

use indexmap::IndexMap;
use serde::de::{self, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::datetime::{Datetime, MARKER_FIELD};

/// A fully resolved TOML value, detached from the source document.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Datetime(Datetime),
    Array(Vec<Value>),
    Table(Table),
}

/// An ordered table: insertion order is preserved so the encoder can emit
/// keys in the order a `serde::Serialize` impl provided them (§4.5 rule 9).
pub type Table = IndexMap<String, Value>;

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Value::Table(t) => Some(t),
            _ => None,
        }
    }

    /// A short, human-readable name for this value's kind, used in
    /// conversion error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::Datetime(_) => "datetime",
            Value::Array(_) => "array",
            Value::Table(_) => "table",
        }
    }
}

/// `Value` is the "dynamic-any" target §4.4/§9 describes: a sum type a
/// caller can decode anything into without knowing its shape up front, and
/// encode back out unchanged. Its own `Serialize`/`Deserialize` impls go
/// through ordinary `serde` calls — [`crate::ser::ValueSerializer`] and
/// [`crate::de::ValueDeserializer`] special-case `Value` no more than they
/// do any other type — so a `Value` nested inside a caller's struct field
/// round-trips the same way a concrete field would.
impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Boolean(b) => serializer.serialize_bool(*b),
            Value::Datetime(dt) => dt.serialize(serializer),
            Value::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Table(table) => {
                let mut map = serializer.serialize_map(Some(table.len()))?;
                for (k, v) in table {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// A map key that is either the hidden datetime marker field or an
/// ordinary string key, used by [`ValueVisitor::visit_map`] to recognize a
/// datetime smuggled in through `serde`'s struct hooks (§9, [`crate::datetime`]).
enum KeyOrMarker {
    Marker,
    Other(String),
}

impl<'de> Deserialize<'de> for KeyOrMarker {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct KeyVisitor;
        impl<'de> Visitor<'de> for KeyVisitor {
            type Value = KeyOrMarker;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table key")
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<KeyOrMarker, E> {
                if s == MARKER_FIELD {
                    Ok(KeyOrMarker::Marker)
                } else {
                    Ok(KeyOrMarker::Other(s.to_string()))
                }
            }
        }
        deserializer.deserialize_str(KeyVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any TOML value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Value, E> {
        Ok(Value::Boolean(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Value, E> {
        Ok(Value::Integer(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Value, E> {
        i64::try_from(v).map(Value::Integer).map_err(|_| de::Error::custom("integer out of i64 range"))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Value, E> {
        Ok(Value::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Value, E> {
        Ok(Value::String(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Value, E> {
        Ok(Value::String(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
        match map.next_key::<KeyOrMarker>()? {
            None => Ok(Value::Table(Table::new())),
            Some(KeyOrMarker::Marker) => {
                let s: String = map.next_value()?;
                s.parse::<Datetime>().map(Value::Datetime).map_err(de::Error::custom)
            }
            Some(KeyOrMarker::Other(first_key)) => {
                let mut table = Table::new();
                table.insert(first_key, map.next_value()?);
                while let Some((k, v)) = map.next_entry()? {
                    table.insert(k, v);
                }
                Ok(Value::Table(table))
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_preserves_insertion_order() {
        let mut t = Table::new();
        t.insert("z".to_string(), Value::Integer(1));
        t.insert("a".to_string(), Value::Integer(2));
        let keys: Vec<&str> = t.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn float_widens_from_integer() {
        assert_eq!(Value::Integer(4).as_float(), Some(4.0));
    }
}
