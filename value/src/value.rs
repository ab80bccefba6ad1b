use std::fmt::{Display, Formatter};

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

/// Scalar value a filter can compare against.
///
/// Ordering is total: values of the same variant compare naturally, values of
/// different variants compare by variant order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(OrderedFloat<f64>),
    Bool(bool),
    Text(String),
    Null,
}

impl Value {
    pub fn int(int: i64) -> Value {
        Value::Int(int)
    }

    pub fn float(float: f64) -> Value {
        Value::Float(OrderedFloat(float))
    }

    pub fn bool(bool: bool) -> Value {
        Value::Bool(bool)
    }

    pub fn text(string: &str) -> Value {
        Value::Text(string.to_string())
    }

    pub fn null() -> Value {
        Value::Null
    }

    /// Turns raw query text into the most specific value it can represent.
    pub fn infer(raw: &str) -> Value {
        let trimmed = raw.trim();
        if trimmed.eq_ignore_ascii_case("null") {
            return Value::Null;
        }
        if let Ok(int) = trimmed.parse::<i64>() {
            return Value::int(int);
        }
        if let Ok(float) = trimmed.parse::<f64>() {
            return Value::float(float);
        }
        if let Ok(bool) = trimmed.parse::<bool>() {
            return Value::bool(bool);
        }
        Value::text(trimmed)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(int) => Some(*int),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(bool) => Some(*bool),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(int) => write!(f, "{}", int),
            Value::Float(float) => write!(f, "{}", float),
            Value::Bool(bool) => write!(f, "{}", bool),
            Value::Text(text) => write!(f, "{}", text),
            Value::Null => f.write_str("null"),
        }
    }
}

impl From<i64> for Value {
    fn from(int: i64) -> Self {
        Value::int(int)
    }
}

impl From<f64> for Value {
    fn from(float: f64) -> Self {
        Value::float(float)
    }
}

impl From<bool> for Value {
    fn from(bool: bool) -> Self {
        Value::bool(bool)
    }
}

impl From<&str> for Value {
    fn from(string: &str) -> Self {
        Value::text(string)
    }
}

impl From<String> for Value {
    fn from(string: String) -> Self {
        Value::Text(string)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(bool) => Value::bool(bool),
            serde_json::Value::Number(number) => number
                .as_i64()
                .map(Value::int)
                .or_else(|| number.as_f64().map(Value::float))
                .unwrap_or(Value::Null),
            serde_json::Value::String(string) => Value::Text(string),
            other => Value::text(&other.to_string()),
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(value: &Value) -> Self {
        match value {
            Value::Int(int) => serde_json::Value::from(*int),
            Value::Float(float) => serde_json::Value::from(float.0),
            Value::Bool(bool) => serde_json::Value::from(*bool),
            Value::Text(text) => serde_json::Value::from(text.as_str()),
            Value::Null => serde_json::Value::Null,
        }
    }
}
