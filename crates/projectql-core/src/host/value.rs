//! [`HostValue`]: the runtime value type every projection reads and
//! produces. Host object graphs are reflected eagerly into this enum; the
//! [`crate::expr`] interpreter never touches a host type directly, only
//! through this value and the [`HostObject`] trait.

use std::cmp::Ordering;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::exec::ExecutionError;

/// A live host entity reachable from the root context. Implemented by the
/// embedder for every object-kind host type; field access is dispatched by
/// GraphQL field name (already camelCased by [`crate::host::reflect`]).
pub trait HostObject: std::fmt::Debug + Send + Sync {
    /// The reflected schema type name this object is an instance of.
    fn host_type_name(&self) -> &str;

    /// Read one field by its schema (camelCase) name.
    fn get_field(&self, field_name: &str) -> Result<HostValue, ExecutionError>;
}

#[derive(Clone, Debug)]
pub enum HostValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Enum(String),
    List(Vec<HostValue>),
    /// An anonymous record produced by the expression builder, as opposed
    /// to a live [`HostObject`] reflected from the host graph.
    Record(IndexMap<String, HostValue>),
    Object(Arc<dyn HostObject>),
}

impl HostValue {
    pub fn get_field(&self, name: &str) -> Result<Self, ExecutionError> {
        match self {
            Self::Object(obj) => obj.get_field(name),
            Self::Record(map) => map
                .get(name)
                .cloned()
                .ok_or_else(|| ExecutionError::Internal(format!("no field '{name}' on record"))),
            Self::Null => Ok(Self::Null),
            other => Err(ExecutionError::Internal(format!(
                "cannot access field '{name}' on {other:?}"
            ))),
        }
    }

    pub fn as_list(&self) -> Result<&[Self], ExecutionError> {
        match self {
            Self::List(items) => Ok(items.as_slice()),
            Self::Null => Ok(&[]),
            other => Err(ExecutionError::Internal(format!(
                "expected a collection, found {other:?}"
            ))),
        }
    }

    pub fn into_list(self) -> Result<Vec<Self>, ExecutionError> {
        match self {
            Self::List(items) => Ok(items),
            Self::Null => Ok(Vec::new()),
            other => Err(ExecutionError::Internal(format!(
                "expected a collection, found {other:?}"
            ))),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Null => false,
            _ => true,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(n) => Some(*n as f64),
            Self::Float(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) | Self::Enum(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Ordering used by the `OrderBy`/`OrderByDescending` projection nodes
    /// and the filter sub-language's relational operators. Cross-type
    /// comparisons (e.g. string vs int) are treated as unordered/unequal.
    pub fn partial_compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Null, Self::Null) => Some(Ordering::Equal),
            (Self::Bool(a), Self::Bool(b)) => a.partial_cmp(b),
            (Self::String(a), Self::String(b)) | (Self::Enum(a), Self::Enum(b)) => {
                a.partial_cmp(b)
            }
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b),
                _ => None,
            },
        }
    }

    pub fn value_eq(&self, other: &Self) -> bool {
        self.partial_compare(other) == Some(Ordering::Equal)
    }
}

impl std::fmt::Display for HostValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) | Self::Enum(s) => write!(f, "{s}"),
            Self::List(_) => write!(f, "<list>"),
            Self::Record(_) => write!(f, "<record>"),
            Self::Object(obj) => write!(f, "<{}>", obj.host_type_name()),
        }
    }
}

/// Converts a projected [`HostValue`] tree into a `serde_json::Value`, the
/// shape the executor hands back to callers as `data`.
impl From<&HostValue> for serde_json::Value {
    fn from(value: &HostValue) -> Self {
        match value {
            HostValue::Null => serde_json::Value::Null,
            HostValue::Bool(b) => serde_json::Value::Bool(*b),
            HostValue::Int(n) => serde_json::Value::from(*n),
            HostValue::Float(n) => serde_json::json!(n),
            HostValue::String(s) | HostValue::Enum(s) => serde_json::Value::String(s.clone()),
            HostValue::List(items) => {
                serde_json::Value::Array(items.iter().map(serde_json::Value::from).collect())
            }
            HostValue::Record(map) => serde_json::Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), serde_json::Value::from(v)))
                    .collect(),
            ),
            HostValue::Object(_) => {
                serde_json::Value::String("<unprojected host object>".to_string())
            }
        }
    }
}

/// Converts a request's raw JSON variable value into a [`HostValue`],
/// ahead of any schema type-checking.
impl From<&serde_json::Value> for HostValue {
    fn from(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            serde_json::Value::String(s) => Self::String(s.clone()),
            serde_json::Value::Array(items) => Self::List(items.iter().map(Self::from).collect()),
            serde_json::Value::Object(map) => {
                Self::Record(map.iter().map(|(k, v)| (k.clone(), Self::from(v))).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_field_reads_through_a_record_but_passes_through_null() {
        let mut map = IndexMap::new();
        map.insert("name".to_string(), HostValue::String("Ada".to_string()));
        let record = HostValue::Record(map);

        assert_eq!(record.get_field("name").unwrap().as_str(), Some("Ada"));
        assert!(record.get_field("missing").is_err());
        assert!(matches!(HostValue::Null.get_field("name"), Ok(HostValue::Null)));
    }

    #[test]
    fn as_list_treats_null_as_an_empty_collection() {
        assert_eq!(HostValue::Null.as_list().unwrap().len(), 0);
        assert_eq!(HostValue::List(vec![HostValue::Int(1)]).as_list().unwrap().len(), 1);
        assert!(HostValue::Int(1).as_list().is_err());
    }

    #[test]
    fn truthy_treats_only_false_and_null_as_falsy() {
        assert!(!HostValue::Bool(false).truthy());
        assert!(!HostValue::Null.truthy());
        assert!(HostValue::Bool(true).truthy());
        assert!(HostValue::Int(0).truthy());
        assert!(HostValue::String(String::new()).truthy());
    }

    #[test]
    fn partial_compare_orders_numerics_across_int_and_float() {
        assert_eq!(HostValue::Int(1).partial_compare(&HostValue::Float(2.0)), Some(Ordering::Less));
        assert!(HostValue::String("a".to_string()).partial_compare(&HostValue::Int(1)).is_none());
        assert!(HostValue::Int(1).value_eq(&HostValue::Float(1.0)));
    }

    #[test]
    fn json_round_trips_through_host_value_for_scalars_lists_and_objects() {
        let json = serde_json::json!({"name": "Ada", "age": 36, "tags": ["a", "b"], "nickname": null});
        let value = HostValue::from(&json);
        match &value {
            HostValue::Record(map) => {
                assert_eq!(map.get("name").unwrap().as_str(), Some("Ada"));
                assert_eq!(map.get("age").unwrap().as_i64(), Some(36));
                assert!(matches!(map.get("nickname"), Some(HostValue::Null)));
                assert_eq!(map.get("tags").unwrap().as_list().unwrap().len(), 2);
            }
            other => panic!("expected Record, got {other:?}"),
        }

        let back: serde_json::Value = (&value).into();
        assert_eq!(back["name"], serde_json::Value::String("Ada".to_string()));
    }
}
