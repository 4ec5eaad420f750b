//! The Schema Model's mutation surface. A [`Schema`] is built up through a
//! [`SchemaBuilder`], then frozen and shared read-only across concurrent
//! requests.

use indexmap::IndexMap;
use tracing::debug;

use crate::host::reflect::HostTypeDescriptor;
use crate::schema::model::{Argument, Field, Kind, ResolveExpr, SchemaType, TypeAnnotation, BUILTIN_SCALARS};

#[derive(Clone, Debug, thiserror::Error)]
pub enum SchemaConflict {
    #[error("type '{0}' is already defined")]
    DuplicateType(String),

    #[error("field '{field}' is already defined on type '{type_name}'")]
    DuplicateField { type_name: String, field: String },

    #[error("type '{0}' is not defined")]
    UnknownType(String),

    #[error("field '{field}' is not defined on type '{type_name}'")]
    UnknownField { type_name: String, field: String },
}

/// The frozen, queryable schema. Constructed via [`SchemaBuilder`].
#[derive(Debug, Default)]
pub struct Schema {
    pub(crate) types: IndexMap<String, SchemaType>,
    pub query_type_name: Option<String>,
    pub mutation_type_name: Option<String>,
}

impl Schema {
    pub fn get_type(&self, name: &str) -> Option<&SchemaType> {
        self.types.get(name)
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn get_field(&self, type_name: &str, field_name: &str) -> Option<&Field> {
        self.types.get(type_name)?.get_field(field_name)
    }

    pub fn is_builtin_scalar(&self, name: &str) -> bool {
        BUILTIN_SCALARS.contains(&name)
    }

    pub fn types(&self) -> impl Iterator<Item = &SchemaType> {
        self.types.values()
    }

    pub fn query_type(&self) -> Option<&SchemaType> {
        self.query_type_name.as_deref().and_then(|n| self.get_type(n))
    }

    pub fn mutation_type(&self) -> Option<&SchemaType> {
        self.mutation_type_name.as_deref().and_then(|n| self.get_type(n))
    }
}

/// Wraps a [`Schema`] under construction, exposing an additive,
/// administrative API: add types and fields, attach extensions, then
/// freeze. Schema edits are expected to complete before the schema is
/// shared for execution.
pub struct SchemaBuilder {
    schema: Schema,
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema::default(),
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn set_query_type(&mut self, name: impl Into<String>) {
        self.schema.query_type_name = Some(name.into());
    }

    pub fn set_mutation_type(&mut self, name: impl Into<String>) {
        self.schema.mutation_type_name = Some(name.into());
    }

    /// Registers a fresh, empty type by name and kind. Reflected types
    /// (with members already known) go through [`Self::add_reflected_type`]
    /// instead.
    pub fn add_type(&mut self, name: impl Into<String>, kind: Kind) -> Result<&mut SchemaType, SchemaConflict> {
        let name = name.into();
        if self.schema.types.contains_key(&name) {
            return Err(SchemaConflict::DuplicateType(name));
        }
        debug!(type_name = %name, ?kind, "adding schema type");
        self.schema.types.insert(name.clone(), SchemaType::new(&name, kind));
        Ok(self.schema.types.get_mut(&name).expect("just inserted"))
    }

    pub fn add_reflected_type(&mut self, descriptor: &HostTypeDescriptor) -> Result<(), SchemaConflict> {
        let ty = self.add_type(descriptor.name.clone(), descriptor.kind)?;
        ty.description = descriptor.description.clone();
        ty.required_authorization = descriptor.required_authorization.clone();
        ty.enum_values = descriptor.enum_values.clone();
        let type_name = descriptor.name.clone();

        for member in &descriptor.members {
            if member.obsolete {
                continue;
            }
            let mut field = Field::new(
                member.name.clone(),
                member.type_annotation.clone(),
                ResolveExpr::Member(member.name.clone()),
            );
            field.description = member.description.clone();
            field.required_authorization = member.required_authorization.clone();
            self.add_field_raw(&type_name, field)?;
        }
        Ok(())
    }

    pub fn has_type(&self, name: &str) -> bool {
        self.schema.has_type(name)
    }

    pub fn get_field(&self, type_name: &str, field_name: &str) -> Option<&Field> {
        self.schema.get_field(type_name, field_name)
    }

    fn type_mut(&mut self, type_name: &str) -> Result<&mut SchemaType, SchemaConflict> {
        self.schema
            .types
            .get_mut(type_name)
            .ok_or_else(|| SchemaConflict::UnknownType(type_name.to_string()))
    }

    fn add_field_raw(&mut self, type_name: &str, field: Field) -> Result<(), SchemaConflict> {
        let ty = self.type_mut(type_name)?;
        if ty.fields.contains_key(&field.name) {
            return Err(SchemaConflict::DuplicateField {
                type_name: type_name.to_string(),
                field: field.name,
            });
        }
        ty.fields.insert(field.name.clone(), field);
        Ok(())
    }

    /// `SchemaType.AddField(name, resolveExpr, description)`.
    pub fn add_field(
        &mut self,
        type_name: &str,
        name: impl Into<String>,
        return_type: TypeAnnotation,
        resolver: ResolveExpr,
    ) -> Result<(), SchemaConflict> {
        self.add_field_raw(type_name, Field::new(name, return_type, resolver))
    }

    pub fn add_argument(
        &mut self,
        type_name: &str,
        field_name: &str,
        argument: Argument,
    ) -> Result<(), SchemaConflict> {
        let ty = self.type_mut(type_name)?;
        let field = ty
            .fields
            .get_mut(field_name)
            .ok_or_else(|| SchemaConflict::UnknownField {
                type_name: type_name.to_string(),
                field: field_name.to_string(),
            })?;
        field.arguments.insert(argument.name.clone(), argument);
        Ok(())
    }

    pub fn replace_field(&mut self, type_name: &str, field: Field) -> Result<(), SchemaConflict> {
        let ty = self.type_mut(type_name)?;
        if !ty.fields.contains_key(&field.name) {
            return Err(SchemaConflict::UnknownField {
                type_name: type_name.to_string(),
                field: field.name,
            });
        }
        ty.fields.insert(field.name.clone(), field);
        Ok(())
    }

    pub fn remove_field(&mut self, type_name: &str, field_name: &str) -> Result<(), SchemaConflict> {
        let ty = self.type_mut(type_name)?;
        ty.fields
            .shift_remove(field_name)
            .map(|_| ())
            .ok_or_else(|| SchemaConflict::UnknownField {
                type_name: type_name.to_string(),
                field: field_name.to_string(),
            })
    }

    pub fn deprecate(
        &mut self,
        type_name: &str,
        field_name: &str,
        reason: impl Into<String>,
    ) -> Result<(), SchemaConflict> {
        let ty = self.type_mut(type_name)?;
        let field = ty
            .fields
            .get_mut(field_name)
            .ok_or_else(|| SchemaConflict::UnknownField {
                type_name: type_name.to_string(),
                field: field_name.to_string(),
            })?;
        field.deprecation_reason = Some(reason.into());
        Ok(())
    }

    pub fn build(self) -> Schema {
        self.schema
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_type_rejects_duplicates() {
        let mut builder = SchemaBuilder::new();
        builder.add_type("Person", Kind::Object).unwrap();
        let err = builder.add_type("Person", Kind::Object).unwrap_err();
        assert!(matches!(err, SchemaConflict::DuplicateType(name) if name == "Person"));
    }

    #[test]
    fn add_field_rejects_unknown_type_and_duplicate_field() {
        let mut builder = SchemaBuilder::new();
        let err = builder
            .add_field("Person", "name", TypeAnnotation::named("String"), ResolveExpr::Member("name".to_string()))
            .unwrap_err();
        assert!(matches!(err, SchemaConflict::UnknownType(name) if name == "Person"));

        builder.add_type("Person", Kind::Object).unwrap();
        builder
            .add_field("Person", "name", TypeAnnotation::named("String"), ResolveExpr::Member("name".to_string()))
            .unwrap();
        let err = builder
            .add_field("Person", "name", TypeAnnotation::named("String"), ResolveExpr::Member("name".to_string()))
            .unwrap_err();
        assert!(matches!(err, SchemaConflict::DuplicateField { .. }));
    }

    #[test]
    fn add_argument_and_replace_field_round_trip() {
        let mut builder = SchemaBuilder::new();
        builder.add_type("Query", Kind::Object).unwrap();
        builder
            .add_field("Query", "person", TypeAnnotation::named("Person"), ResolveExpr::Member("person".to_string()))
            .unwrap();
        builder
            .add_argument("Query", "person", Argument::new("id", TypeAnnotation::named("ID").non_null()))
            .unwrap();

        let field = builder.get_field("Query", "person").unwrap().clone();
        assert!(field.arguments.contains_key("id"));

        builder.replace_field("Query", field).unwrap();
        assert!(builder.get_field("Query", "person").unwrap().arguments.contains_key("id"));
    }

    #[test]
    fn remove_field_and_deprecate_require_an_existing_field() {
        let mut builder = SchemaBuilder::new();
        builder.add_type("Query", Kind::Object).unwrap();
        builder
            .add_field("Query", "old", TypeAnnotation::named("String"), ResolveExpr::Member("old".to_string()))
            .unwrap();

        builder.deprecate("Query", "old", "no longer used").unwrap();
        assert!(builder.get_field("Query", "old").unwrap().is_deprecated());

        builder.remove_field("Query", "old").unwrap();
        assert!(builder.get_field("Query", "old").is_none());

        let err = builder.remove_field("Query", "old").unwrap_err();
        assert!(matches!(err, SchemaConflict::UnknownField { .. }));
    }

    #[test]
    fn is_builtin_scalar_recognizes_the_standard_scalars() {
        let builder = SchemaBuilder::new();
        assert!(builder.schema().is_builtin_scalar("String"));
        assert!(builder.schema().is_builtin_scalar("Int"));
        assert!(!builder.schema().is_builtin_scalar("Person"));
    }
}
