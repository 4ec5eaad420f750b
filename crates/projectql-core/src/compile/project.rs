//! Expression Builder: the bottom-up composition of a bound
//! [`OperationPlan`]'s selections into [`ProjectionFragment`] trees.
//!
//! Every recursive call builds a field's expression against an implicit
//! `Context` as its parent (`field.resolver.apply(ProjectionFragment::Context)`),
//! relying on [`crate::expr`]'s `Select`/`NullGuard` nodes to rebind what
//! `Context` means at each nesting level. This is what lets extension
//! wrapper types (`<T>Page`, `<T>Connection`) be projected by the same
//! recursion used for ordinary reflected fields: once an extension's
//! `Configure` registers the wrapper as ordinary `SchemaType`/`Field`s,
//! this function doesn't need to know a field came from an extension at
//! all.

use crate::authz::PrincipalAdapter;
use crate::compile::error::CompileError;
use crate::expr::ProjectionFragment;
use crate::extension::ExtensionContext;
use crate::operation::selection::SelectionNode;
use crate::schema::builder::Schema;

/// Builds the composed projection for every top-level selection in
/// `OperationPlan.selections`, collecting every field's compile failure
/// rather than stopping at the first.
pub fn build_operation(
    schema: &Schema,
    root_type_name: &str,
    selections: &[SelectionNode],
    principal: &dyn PrincipalAdapter,
) -> Result<Vec<(String, ProjectionFragment)>, Vec<CompileError>> {
    let mut fields = Vec::new();
    let mut errors = Vec::new();

    for selection in selections {
        match build_field(schema, root_type_name, selection, principal) {
            Ok(expr) => fields.push((selection.output_name().to_string(), expr)),
            Err(err) => errors.push(err),
        }
    }

    if errors.is_empty() {
        Ok(fields)
    } else {
        Err(errors)
    }
}

/// Builds one selection's projection: resolve, apply the extension
/// pipeline, then — if the selection has sub-fields — compose a record
/// over the (possibly list- or null-guarded) result.
fn build_field(
    schema: &Schema,
    parent_type_name: &str,
    selection: &SelectionNode,
    principal: &dyn PrincipalAdapter,
) -> Result<ProjectionFragment, CompileError> {
    let field = schema
        .get_field(parent_type_name, &selection.field_name)
        .expect("field reference was validated during binding");

    let mut current = field.resolver.apply(ProjectionFragment::Context);
    for extension in &field.extensions {
        let ctx = ExtensionContext {
            schema,
            type_name: parent_type_name,
            field,
            selection,
            argument_values: &selection.arguments,
            principal,
        };
        current = extension.build_expression(&ctx, current)?;
    }

    if selection.is_leaf() {
        return Ok(current);
    }

    let sub_type_name = field.return_type.inner_name();
    let record = build_record(schema, sub_type_name, &selection.selection_set, principal)?;

    Ok(if field.return_type.is_list() {
        ProjectionFragment::Select {
            base: Box::new(current),
            project: Box::new(record),
        }
    } else {
        ProjectionFragment::NullGuard {
            base: Box::new(current),
            project: Box::new(record),
        }
    })
}

fn build_record(
    schema: &Schema,
    type_name: &str,
    selections: &[SelectionNode],
    principal: &dyn PrincipalAdapter,
) -> Result<ProjectionFragment, CompileError> {
    let mut fields = Vec::with_capacity(selections.len());
    for selection in selections {
        let expr = build_field(schema, type_name, selection, principal)?;
        fields.push((selection.output_name().to_string(), expr));
    }
    Ok(ProjectionFragment::Record(fields))
}
