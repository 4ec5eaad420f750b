//! The Schema Model: named types, their fields, and each field's argument
//! schema and resolve expression.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::ast;
use crate::expr::ProjectionFragment;
use crate::extension::FieldExtensionBox;
use crate::value::Value;

/// A GraphQL type annotation: a named type, optionally wrapped in `List`
/// and/or `NonNull`, mirroring `graphql_parser::query::Type`'s shape but
/// addressing schema types by stable name rather than by AST reference,
/// since host graphs can be cyclic.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TypeAnnotation {
    Named(String),
    List(Box<TypeAnnotation>),
    NonNull(Box<TypeAnnotation>),
}

impl TypeAnnotation {
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Converts a parsed document's type reference (e.g. a variable
    /// definition's `var_type`) into a [`TypeAnnotation`].
    pub fn from_ast(ty: &ast::operation::Type) -> Self {
        use graphql_parser::query::Type as GqlType;
        match ty {
            GqlType::NamedType(name) => Self::Named(name.clone()),
            GqlType::ListType(inner) => Self::List(Box::new(Self::from_ast(inner))),
            GqlType::NonNullType(inner) => Self::NonNull(Box::new(Self::from_ast(inner))),
        }
    }

    pub fn list(self) -> Self {
        Self::List(Box::new(self))
    }

    pub fn non_null(self) -> Self {
        Self::NonNull(Box::new(self))
    }

    pub fn is_nullable(&self) -> bool {
        !matches!(self, Self::NonNull(_))
    }

    pub fn is_list(&self) -> bool {
        match self {
            Self::List(_) => true,
            Self::NonNull(inner) => inner.is_list(),
            Self::Named(_) => false,
        }
    }

    /// The innermost named type, stripping `List`/`NonNull` wrappers.
    pub fn inner_name(&self) -> &str {
        match self {
            Self::Named(name) => name.as_str(),
            Self::List(inner) | Self::NonNull(inner) => inner.inner_name(),
        }
    }
}

impl std::fmt::Display for TypeAnnotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{name}"),
            Self::List(inner) => write!(f, "[{inner}]"),
            Self::NonNull(inner) => write!(f, "{inner}!"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Scalar,
    Object,
    Input,
    Enum,
    Interface,
    Union,
}

#[derive(Clone, Debug)]
pub struct Argument {
    pub name: String,
    pub input_type: TypeAnnotation,
    pub default_value: Option<Value>,
}

impl Argument {
    pub fn new(name: impl Into<String>, input_type: TypeAnnotation) -> Self {
        Self {
            name: name.into(),
            input_type,
            default_value: None,
        }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn is_required(&self) -> bool {
        !self.input_type.is_nullable() && self.default_value.is_none()
    }
}

/// How a field's value is produced from its parent context. `Member` is
/// the common case synthesized by reflection (plain member access);
/// `Custom` lets hand-written schema code supply an arbitrary projection
/// builder, e.g. for a computed or renamed field.
#[derive(Clone)]
pub enum ResolveExpr {
    Member(String),
    Custom(Arc<dyn Fn(ProjectionFragment) -> ProjectionFragment + Send + Sync>),
}

impl ResolveExpr {
    /// Build this field's base projection by substituting the
    /// already-built parent expression in for `parent`.
    pub fn apply(&self, parent: ProjectionFragment) -> ProjectionFragment {
        match self {
            Self::Member(name) => ProjectionFragment::Member {
                base: Box::new(parent),
                name: name.clone(),
            },
            Self::Custom(f) => f(parent),
        }
    }
}

impl std::fmt::Debug for ResolveExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Member(name) => write!(f, "ResolveExpr::Member({name:?})"),
            Self::Custom(_) => write!(f, "ResolveExpr::Custom(..)"),
        }
    }
}

#[derive(Clone)]
pub struct Field {
    pub name: String,
    pub return_type: TypeAnnotation,
    pub arguments: IndexMap<String, Argument>,
    pub resolver: ResolveExpr,
    pub extensions: Vec<FieldExtensionBox>,
    pub required_authorization: Vec<String>,
    pub description: Option<String>,
    pub deprecation_reason: Option<String>,
}

impl std::fmt::Debug for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .field("arguments", &self.arguments.keys().collect::<Vec<_>>())
            .field("resolver", &self.resolver)
            .field("extensions", &self.extensions.len())
            .finish()
    }
}

impl Field {
    pub fn new(name: impl Into<String>, return_type: TypeAnnotation, resolver: ResolveExpr) -> Self {
        Self {
            name: name.into(),
            return_type,
            arguments: IndexMap::new(),
            resolver,
            extensions: Vec::new(),
            required_authorization: Vec::new(),
            description: None,
            deprecation_reason: None,
        }
    }

    pub fn is_deprecated(&self) -> bool {
        self.deprecation_reason.is_some()
    }

    /// Clones this field with its return type replaced, for extensions
    /// (`UseOffsetPaging`, `UseConnection`) that rewrite a field's return
    /// type during `configure`.
    pub fn clone_for_return_type(&self, return_type: TypeAnnotation) -> Self {
        let mut clone = self.clone();
        clone.return_type = return_type;
        clone
    }
}

pub struct SchemaType {
    pub name: String,
    pub kind: Kind,
    pub fields: IndexMap<String, Field>,
    pub enum_values: Vec<String>,
    pub description: Option<String>,
    pub required_authorization: Vec<String>,
}

impl std::fmt::Debug for SchemaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaType")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("fields", &self.fields.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl SchemaType {
    pub fn new(name: impl Into<String>, kind: Kind) -> Self {
        Self {
            name: name.into(),
            kind,
            fields: IndexMap::new(),
            enum_values: Vec::new(),
            description: None,
            required_authorization: Vec::new(),
        }
    }

    pub fn get_field(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }
}

/// Built-in scalar names, recognised by the reflector and the binder
/// without needing a registered `SchemaType`.
pub const BUILTIN_SCALARS: &[&str] = &["Int", "Float", "String", "Boolean", "ID"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_annotation_strips_wrappers_down_to_the_named_type() {
        let ty = TypeAnnotation::named("Person").non_null().list().non_null();
        assert_eq!(ty.inner_name(), "Person");
        assert!(!ty.is_nullable());
        assert!(ty.is_list());
        assert_eq!(ty.to_string(), "[Person!]!");
    }

    #[test]
    fn a_bare_named_type_is_nullable_and_not_a_list() {
        let ty = TypeAnnotation::named("Int");
        assert!(ty.is_nullable());
        assert!(!ty.is_list());
    }

    #[test]
    fn argument_is_required_only_when_non_null_and_without_a_default() {
        let required = Argument::new("name", TypeAnnotation::named("String").non_null());
        assert!(required.is_required());

        let defaulted = Argument::new("age", TypeAnnotation::named("Int").non_null()).with_default(Value::Int(0));
        assert!(!defaulted.is_required());

        let nullable = Argument::new("nickname", TypeAnnotation::named("String"));
        assert!(!nullable.is_required());
    }

    #[test]
    fn resolve_expr_member_wraps_the_parent_in_a_member_access() {
        let resolver = ResolveExpr::Member("name".to_string());
        match resolver.apply(ProjectionFragment::Context) {
            ProjectionFragment::Member { name, base } => {
                assert_eq!(name, "name");
                assert!(matches!(*base, ProjectionFragment::Context));
            }
            other => panic!("expected Member, got {other:?}"),
        }
    }

    #[test]
    fn schema_type_looks_up_fields_by_name() {
        let mut ty = SchemaType::new("Person", Kind::Object);
        ty.fields.insert(
            "name".to_string(),
            Field::new("name", TypeAnnotation::named("String").non_null(), ResolveExpr::Member("name".to_string())),
        );
        assert!(ty.get_field("name").is_some());
        assert!(ty.get_field("age").is_none());
    }
}
