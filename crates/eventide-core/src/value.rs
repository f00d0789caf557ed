//! Resolved value types produced by dynamic-value resolution

use crate::data::TableKind;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A resolved runtime value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Value {
    /// No value / failed resolution
    #[default]
    Null,
    /// Boolean value (switches, flags)
    Bool(bool),
    /// Integer value (counts, ids, key codes)
    Int(i64),
    /// Floating point value (positions, volumes, stats)
    Float(f64),
    /// String value (messages, names)
    String(String),
    /// 2D vector
    Vec2(f64, f64),
    /// 3D vector
    Vec3(f64, f64, f64),
    /// List of values
    List(Vec<Value>),
    /// Map of string keys to values
    Map(ValueMap),
    /// Reference into a read-only data table
    Entity(TableKind, i64),
}

/// A map of string keys to values
///
/// Uses IndexMap to preserve insertion order (deterministic iteration)
pub type ValueMap = IndexMap<String, Value>;

impl Value {
    /// Check if this value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Try to get this value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get this value as an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::Float(f) => Some(*f as i64),
            Value::Entity(_, id) => Some(*id),
            _ => None,
        }
    }

    /// Try to get this value as a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as a string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a list
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    /// Try to get this value as a map
    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Try to get this value as a data-table reference
    pub fn as_entity(&self) -> Option<(TableKind, i64)> {
        match self {
            Value::Entity(kind, id) => Some((*kind, *id)),
            _ => None,
        }
    }

    /// Check if this value is truthy
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::Vec2(..) | Value::Vec3(..) | Value::Entity(..) => true,
            Value::List(list) => !list.is_empty(),
            Value::Map(map) => !map.is_empty(),
        }
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Vec2(..) => "vec2",
            Value::Vec3(..) => "vec3",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Entity(..) => "entity",
        }
    }

    /// Render as a display string (used by messages and name changes)
    pub fn to_display_string(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            other => format!("{:?}", other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coercions() {
        assert_eq!(Value::Int(3).as_float(), Some(3.0));
        assert_eq!(Value::Float(3.9).as_int(), Some(3));
        assert_eq!(Value::Entity(TableKind::Item, 5).as_int(), Some(5));
        assert_eq!(Value::String("x".into()).as_float(), None);
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Null.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Float(0.5).is_truthy());
        assert!(!Value::String(String::new()).is_truthy());
    }
}
