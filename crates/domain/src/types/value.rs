//! Property bag values
//!
//! A closed sum type instead of an open dynamic map, so serialization and
//! navigation rules stay exhaustive.

use indexmap::IndexMap;
use serde_json::{Map, Number};

use super::handles::{CollectionId, EntityId, ObjectRef};

/// Insertion-ordered nested value object (a complex type without identity).
pub type ValueObject = IndexMap<String, Value>;

/// A value stored in a proxy property bag.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    List(Vec<Value>),
    Object(ValueObject),
    /// Nested proxy, owned by the runtime context arena.
    Entity(EntityId),
    /// Nested collection, owned by the runtime context arena.
    Collection(CollectionId),
}

impl Value {
    /// Convert a JSON payload value. Never produces proxy references.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(b),
            serde_json::Value::Number(n) => Self::Number(n),
            serde_json::Value::String(s) => Self::String(s),
            serde_json::Value::Array(items) => {
                Self::List(items.into_iter().map(Self::from_json).collect())
            }
            serde_json::Value::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from_json(v))).collect())
            }
        }
    }

    /// JSON rendering of a value that holds no proxy references.
    ///
    /// Returns `None` when a proxy or collection reference is reachable;
    /// those need the arena to serialize.
    pub fn to_plain_json(&self) -> Option<serde_json::Value> {
        Some(match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => serde_json::Value::Number(n.clone()),
            Self::String(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::Array(
                items.iter().map(Self::to_plain_json).collect::<Option<Vec<_>>>()?,
            ),
            Self::Object(map) => {
                let mut out = Map::new();
                for (k, v) in map {
                    out.insert(k.clone(), v.to_plain_json()?);
                }
                serde_json::Value::Object(out)
            }
            Self::Entity(_) | Self::Collection(_) => return None,
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ValueObject> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_entity(&self) -> Option<EntityId> {
        match self {
            Self::Entity(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<CollectionId> {
        match self {
            Self::Collection(id) => Some(*id),
            _ => None,
        }
    }

    /// Text form of a scalar usable as an entity key in a resource path.
    pub fn as_key(&self) -> Option<String> {
        match self {
            Self::String(s) if !s.is_empty() => Some(s.clone()),
            Self::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Number::from_f64(value).map_or(Self::Null, Self::Number)
    }
}

impl From<EntityId> for Value {
    fn from(value: EntityId) -> Self {
        Self::Entity(value)
    }
}

impl From<CollectionId> for Value {
    fn from(value: CollectionId) -> Self {
        Self::Collection(value)
    }
}

impl From<ObjectRef> for Value {
    fn from(value: ObjectRef) -> Self {
        match value {
            ObjectRef::Entity(id) => Self::Entity(id),
            ObjectRef::Collection(id) => Self::Collection(id),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Self::from_json(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn from_json_keeps_field_order() {
        let value = Value::from_json(json!({"zeta": 1, "alpha": {"b": true, "a": null}}));
        let map = value.as_object().unwrap();
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);

        let nested: Vec<_> = map["alpha"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(nested, vec!["b", "a"]);
    }

    #[test]
    fn plain_json_refuses_proxy_references() {
        let value = Value::List(vec![Value::from("a"), Value::Entity(EntityId::new(3, 0))]);
        assert!(value.to_plain_json().is_none());

        let plain = Value::from_json(json!(["a", 1, {"k": false}]));
        assert_eq!(plain.to_plain_json().unwrap(), json!(["a", 1, {"k": false}]));
    }

    #[test]
    fn key_text_for_strings_and_numbers() {
        assert_eq!(Value::from("42").as_key().as_deref(), Some("42"));
        assert_eq!(Value::from(42_i64).as_key().as_deref(), Some("42"));
        assert_eq!(Value::from("").as_key(), None);
        assert_eq!(Value::Null.as_key(), None);
    }

    #[test]
    fn option_conversion_maps_none_to_null() {
        let none: Option<&str> = None;
        assert!(Value::from(none).is_null());
        assert_eq!(Value::from(Some("x")).as_str(), Some("x"));
    }
}
