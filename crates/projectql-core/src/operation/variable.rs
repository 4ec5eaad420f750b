//! Variable definitions declared on an operation, and the request-supplied
//! values they're resolved against.

use indexmap::IndexMap;

use crate::schema::model::TypeAnnotation;
use crate::value::Value;

#[derive(Clone, Debug)]
pub struct VariableDefinition {
    pub name: String,
    pub type_annotation: TypeAnnotation,
    pub default_value: Option<Value>,
}

/// The raw `variables` map of a request, before type validation.
pub type RequestVariables = IndexMap<String, serde_json::Value>;
