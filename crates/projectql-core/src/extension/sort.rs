//! Sort extension (`UseSort`): adds a `order: String`
//! argument naming a sortable field, optionally suffixed `_DESC`, and
//! inserts an `OrderBy`/`OrderByDescending` node ahead of any selection.

use crate::compile::error::CompileError;
use crate::expr::ProjectionFragment;
use crate::extension::{ExtensionContext, FieldExtension};
use crate::schema::builder::{SchemaBuilder, SchemaConflict};
use crate::schema::model::{Argument, TypeAnnotation};

#[derive(Debug, Default)]
pub struct UseSort;

impl FieldExtension for UseSort {
    fn configure(&self, schema: &mut SchemaBuilder, type_name: &str, field_name: &str) -> Result<(), SchemaConflict> {
        schema.add_argument(
            type_name,
            field_name,
            Argument::new("order", TypeAnnotation::named("String")),
        )
    }

    fn build_expression(
        &self,
        ctx: &ExtensionContext<'_>,
        current: ProjectionFragment,
    ) -> Result<ProjectionFragment, CompileError> {
        let Some(order_value) = ctx.argument_values.get("order") else {
            return Ok(current);
        };
        let Some(order_src) = order_value.as_str() else {
            return Ok(current);
        };

        let (field_name, descending) = match order_src.strip_suffix("_DESC") {
            Some(stripped) => (stripped.to_string(), true),
            None => (order_src.to_string(), false),
        };
        if field_name.is_empty() {
            return Err(CompileError::InvalidArgument {
                field: ctx.field.name.clone(),
                argument: "order".to_string(),
                reason: "empty sort field name".to_string(),
                location: crate::loc::SourceLocation::BuiltIn,
            });
        }

        Ok(ProjectionFragment::OrderBy {
            base: Box::new(current),
            key: Box::new(ProjectionFragment::Member {
                base: Box::new(ProjectionFragment::Context),
                name: field_name,
            }),
            descending,
        })
    }
}
