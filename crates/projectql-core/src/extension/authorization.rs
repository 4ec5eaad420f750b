//! Authorization extension (`UseAuthorization`). The
//! required-authorization set itself lives directly on
//! [`crate::schema::model::SchemaType`]/[`crate::schema::model::Field`]
//! (copied there by the reflector or by hand-written schema code), so this
//! extension's `Configure` is a no-op; its only job is the execute-time
//! check, run before the rest of the pipeline builds an expression for the
//! selection. Attach it first in a field's extension list so a denial
//! short-circuits filter/sort/paging work for that field.

use crate::compile::error::CompileError;
use crate::expr::ProjectionFragment;
use crate::extension::{ExtensionContext, FieldExtension};
use crate::loc::SourceLocation;
use crate::schema::builder::{SchemaBuilder, SchemaConflict};

#[derive(Debug, Default)]
pub struct UseAuthorization;

impl FieldExtension for UseAuthorization {
    fn configure(&self, _schema: &mut SchemaBuilder, _type_name: &str, _field_name: &str) -> Result<(), SchemaConflict> {
        Ok(())
    }

    fn build_expression(
        &self,
        ctx: &ExtensionContext<'_>,
        current: ProjectionFragment,
    ) -> Result<ProjectionFragment, CompileError> {
        if ctx.principal.satisfies_all(&ctx.field.required_authorization) {
            Ok(current)
        } else {
            Err(CompileError::Unauthorized {
                location: SourceLocation::BuiltIn,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::authz::RoleSetPrincipal;
    use crate::host::value::HostValue;
    use crate::operation::selection::SelectionNode;
    use crate::schema::builder::SchemaBuilder;
    use crate::schema::model::{Field, Kind, ResolveExpr, TypeAnnotation};

    #[test]
    fn a_principal_holding_the_required_role_passes_through_unchanged() {
        let mut builder = SchemaBuilder::new();
        builder.add_type("Project", Kind::Object).unwrap();
        let schema = builder.schema();

        let mut field = Field::new("budget", TypeAnnotation::named("Int"), ResolveExpr::Member("budget".to_string()));
        field.required_authorization = vec!["admin".to_string()];
        let selection = SelectionNode::new("budget");
        let arguments: IndexMap<String, HostValue> = IndexMap::new();
        let principal = RoleSetPrincipal::new(["admin".to_string()]);

        let ctx = ExtensionContext {
            schema,
            type_name: "Project",
            field: &field,
            selection: &selection,
            argument_values: &arguments,
            principal: &principal,
        };

        let result = UseAuthorization.build_expression(&ctx, ProjectionFragment::Context).unwrap();
        assert!(matches!(result, ProjectionFragment::Context));
    }

    #[test]
    fn a_principal_missing_the_required_role_is_rejected() {
        let mut builder = SchemaBuilder::new();
        builder.add_type("Project", Kind::Object).unwrap();
        let schema = builder.schema();

        let mut field = Field::new("budget", TypeAnnotation::named("Int"), ResolveExpr::Member("budget".to_string()));
        field.required_authorization = vec!["admin".to_string()];
        let selection = SelectionNode::new("budget");
        let arguments: IndexMap<String, HostValue> = IndexMap::new();
        let principal = RoleSetPrincipal::new(std::iter::empty());

        let ctx = ExtensionContext {
            schema,
            type_name: "Project",
            field: &field,
            selection: &selection,
            argument_values: &arguments,
            principal: &principal,
        };

        let err = UseAuthorization.build_expression(&ctx, ProjectionFragment::Context).unwrap_err();
        assert!(matches!(err, CompileError::Unauthorized { .. }));
    }

    #[test]
    fn a_field_with_no_authorization_requirement_always_passes() {
        let mut builder = SchemaBuilder::new();
        builder.add_type("Project", Kind::Object).unwrap();
        let schema = builder.schema();

        let field = Field::new("name", TypeAnnotation::named("String"), ResolveExpr::Member("name".to_string()));
        let selection = SelectionNode::new("name");
        let arguments: IndexMap<String, HostValue> = IndexMap::new();
        let principal = RoleSetPrincipal::new(std::iter::empty());

        let ctx = ExtensionContext {
            schema,
            type_name: "Project",
            field: &field,
            selection: &selection,
            argument_values: &arguments,
            principal: &principal,
        };

        let result = UseAuthorization.build_expression(&ctx, ProjectionFragment::Context).unwrap();
        assert!(matches!(result, ProjectionFragment::Context));
    }
}
