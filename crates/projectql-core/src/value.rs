//! [`Value`]: the literal/variable-reference form an argument or default
//! value takes in the AST, before binding resolves variables against a
//! request's variable map and produces a [`crate::host::HostValue`].
//!
//! Variable references are resolved directly against the bound operation's
//! variable map during compilation; schema types, by contrast, address
//! each other by stable name (see [`crate::schema::model::TypeAnnotation`])
//! since host graphs can be cyclic.

use indexmap::IndexMap;

use crate::ast;
use crate::host::value::HostValue;

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Variable(String),
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
    Enum(String),
    List(Vec<Value>),
    Object(IndexMap<String, Value>),
}

impl Value {
    pub fn from_ast(ast_value: &ast::Value) -> Self {
        match ast_value {
            ast::Value::Variable(name) => Self::Variable(name.clone()),
            ast::Value::Int(n) => Self::Int(n.as_i64().unwrap_or_default()),
            ast::Value::Float(n) => Self::Float(*n),
            ast::Value::String(s) => Self::String(s.clone()),
            ast::Value::Boolean(b) => Self::Bool(*b),
            ast::Value::Null => Self::Null,
            ast::Value::Enum(e) => Self::Enum(e.clone()),
            ast::Value::List(values) => {
                Self::List(values.iter().map(Self::from_ast).collect())
            }
            ast::Value::Object(entries) => Self::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), Self::from_ast(v)))
                    .collect(),
            ),
        }
    }

    pub fn as_variable_name(&self) -> Option<&str> {
        if let Self::Variable(name) = self {
            Some(name.as_str())
        } else {
            None
        }
    }

    /// Resolves this AST-level value into a runtime [`HostValue`],
    /// substituting `$name` variable references from `variables`. On
    /// failure, returns the name of the missing variable (without the
    /// leading `$`).
    pub fn resolve(&self, variables: &IndexMap<String, HostValue>) -> Result<HostValue, String> {
        Ok(match self {
            Self::Variable(name) => variables.get(name).cloned().ok_or_else(|| name.clone())?,
            Self::Int(n) => HostValue::Int(*n),
            Self::Float(n) => HostValue::Float(*n),
            Self::String(s) => HostValue::String(s.clone()),
            Self::Bool(b) => HostValue::Bool(*b),
            Self::Null => HostValue::Null,
            Self::Enum(e) => HostValue::Enum(e.clone()),
            Self::List(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.resolve(variables)?);
                }
                HostValue::List(out)
            }
            Self::Object(entries) => {
                let mut map = IndexMap::new();
                for (k, v) in entries {
                    map.insert(k.clone(), v.resolve(variables)?);
                }
                HostValue::Record(map)
            }
        })
    }
}
