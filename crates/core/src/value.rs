//! Tagged argument values for tool calls.
//!
//! Tool arguments cross a process boundary as JSON, but inside the core
//! they carry explicit value-kind tags so nothing degrades to an untyped
//! bag. `ArgValue` round-trips losslessly through `serde_json::Value`
//! (integers wider than 53 bits excepted, as with any JSON number).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A schema-validated key/value argument map, ordered for determinism.
pub type ArgMap = BTreeMap<String, ArgValue>;

/// A single tool-call argument value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArgValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<ArgValue>),
    Map(ArgMap),
}

impl ArgValue {
    /// The kind tag, for validation messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ArgValue::Null => "null",
            ArgValue::Bool(_) => "bool",
            ArgValue::Number(_) => "number",
            ArgValue::String(_) => "string",
            ArgValue::List(_) => "list",
            ArgValue::Map(_) => "map",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<serde_json::Value> for ArgValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => ArgValue::Null,
            serde_json::Value::Bool(b) => ArgValue::Bool(b),
            serde_json::Value::Number(n) => ArgValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => ArgValue::String(s),
            serde_json::Value::Array(items) => {
                ArgValue::List(items.into_iter().map(ArgValue::from).collect())
            }
            serde_json::Value::Object(entries) => ArgValue::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, ArgValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl From<&ArgValue> for serde_json::Value {
    fn from(value: &ArgValue) -> Self {
        match value {
            ArgValue::Null => serde_json::Value::Null,
            ArgValue::Bool(b) => serde_json::Value::Bool(*b),
            ArgValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ArgValue::String(s) => serde_json::Value::String(s.clone()),
            ArgValue::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            ArgValue::Map(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Convert a JSON object into an `ArgMap`. Returns `None` for non-objects.
pub fn arg_map_from_json(value: serde_json::Value) -> Option<ArgMap> {
    match ArgValue::from(value) {
        ArgValue::Map(map) => Some(map),
        _ => None,
    }
}

/// Render an `ArgMap` back to a JSON object.
pub fn arg_map_to_json(map: &ArgMap) -> serde_json::Value {
    serde_json::Value::from(&ArgValue::Map(map.clone()))
}
