//! Dynamically-typed wire values
//!
//! Prediction endpoints exchange loosely-typed instances and parameters.
//! [`StructuredValue`] models that shape as an explicit tagged union so the
//! rest of the system stays strongly typed; conversion to and from
//! `serde_json::Value` happens only at the client boundary.

use std::collections::BTreeMap;

/// A dynamically-typed value exchanged with inference endpoints.
///
/// All JSON numbers map through `f64`; integers above 2^53 lose precision,
/// which the prediction wire format never carries.
#[derive(Debug, Clone, PartialEq)]
pub enum StructuredValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<StructuredValue>),
    Map(BTreeMap<String, StructuredValue>),
}

impl StructuredValue {
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => StructuredValue::Null,
            serde_json::Value::Bool(b) => StructuredValue::Bool(*b),
            serde_json::Value::Number(n) => {
                StructuredValue::Number(n.as_f64().unwrap_or_default())
            }
            serde_json::Value::String(s) => StructuredValue::String(s.clone()),
            serde_json::Value::Array(items) => {
                StructuredValue::List(items.iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => StructuredValue::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            StructuredValue::Null => serde_json::Value::Null,
            StructuredValue::Bool(b) => serde_json::Value::Bool(*b),
            StructuredValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            StructuredValue::String(s) => serde_json::Value::String(s.clone()),
            StructuredValue::List(items) => {
                serde_json::Value::Array(items.iter().map(Self::to_json).collect())
            }
            StructuredValue::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }

    /// Field lookup on a map value; `None` for any other variant.
    pub fn get(&self, key: &str) -> Option<&StructuredValue> {
        match self {
            StructuredValue::Map(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StructuredValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// String field lookup on a map value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(StructuredValue::as_str)
    }
}

impl From<bool> for StructuredValue {
    fn from(b: bool) -> Self {
        StructuredValue::Bool(b)
    }
}

impl From<f64> for StructuredValue {
    fn from(n: f64) -> Self {
        StructuredValue::Number(n)
    }
}

impl From<i64> for StructuredValue {
    fn from(n: i64) -> Self {
        StructuredValue::Number(n as f64)
    }
}

impl From<&str> for StructuredValue {
    fn from(s: &str) -> Self {
        StructuredValue::String(s.to_string())
    }
}

impl From<String> for StructuredValue {
    fn from(s: String) -> Self {
        StructuredValue::String(s)
    }
}

impl FromIterator<(String, StructuredValue)> for StructuredValue {
    fn from_iter<T: IntoIterator<Item = (String, StructuredValue)>>(iter: T) -> Self {
        StructuredValue::Map(iter.into_iter().collect())
    }
}
