//! Offset paging extension (`UseOffsetPaging`): wraps a list
//! field's return in a `{items, hasPreviousPage, hasNextPage, totalItems}`
//! record. `Configure` registers the wrapper type once; `build_expression`
//! only needs to produce that record's raw data — the generic per-field
//! recursion in `compile::project` handles whichever of those sub-fields
//! the query actually selected (including projecting `items`' element
//! type), since they're ordinary `Field`s on the wrapper `SchemaType`.

use crate::compile::error::CompileError;
use crate::expr::{BinOp, Literal, ProjectionFragment};
use crate::extension::{ExtensionContext, FieldExtension};
use crate::loc::SourceLocation;
use crate::schema::builder::{SchemaBuilder, SchemaConflict};
use crate::schema::model::{Argument, Kind, ResolveExpr, TypeAnnotation};

#[derive(Debug, Default)]
pub struct UseOffsetPaging;

fn page_type_name(element_type: &str) -> String {
    format!("{element_type}Page")
}

impl FieldExtension for UseOffsetPaging {
    fn configure(&self, schema: &mut SchemaBuilder, type_name: &str, field_name: &str) -> Result<(), SchemaConflict> {
        let field = schema
            .get_field(type_name, field_name)
            .ok_or_else(|| SchemaConflict::UnknownField {
                type_name: type_name.to_string(),
                field: field_name.to_string(),
            })?;
        let element_type = field.return_type.inner_name().to_string();
        let page_type = page_type_name(&element_type);

        if !schema.has_type(&page_type) {
            schema.add_type(page_type.clone(), Kind::Object)?;
            schema.add_field(
                &page_type,
                "items",
                TypeAnnotation::named(element_type.clone()).non_null().list().non_null(),
                ResolveExpr::Member("items".to_string()),
            )?;
            schema.add_field(
                &page_type,
                "hasPreviousPage",
                TypeAnnotation::named("Boolean").non_null(),
                ResolveExpr::Member("hasPreviousPage".to_string()),
            )?;
            schema.add_field(
                &page_type,
                "hasNextPage",
                TypeAnnotation::named("Boolean").non_null(),
                ResolveExpr::Member("hasNextPage".to_string()),
            )?;
            schema.add_field(
                &page_type,
                "totalItems",
                TypeAnnotation::named("Int").non_null(),
                ResolveExpr::Member("totalItems".to_string()),
            )?;
        }

        schema.add_argument(type_name, field_name, Argument::new("skip", TypeAnnotation::named("Int")))?;
        schema.add_argument(type_name, field_name, Argument::new("take", TypeAnnotation::named("Int")))?;

        let field = schema
            .get_field(type_name, field_name)
            .expect("field just configured")
            .clone_for_return_type(TypeAnnotation::named(page_type).non_null());
        schema.replace_field(type_name, field)
    }

    fn build_expression(
        &self,
        ctx: &ExtensionContext<'_>,
        current: ProjectionFragment,
    ) -> Result<ProjectionFragment, CompileError> {
        let skip = match ctx.argument_values.get("skip").and_then(|v| v.as_i64()) {
            Some(n) if n < 0 => {
                return Err(invalid_argument(ctx, "skip", "must not be negative"));
            }
            Some(n) => n as usize,
            None => 0,
        };
        let take = match ctx.argument_values.get("take").and_then(|v| v.as_i64()) {
            Some(n) if n < 0 => {
                return Err(invalid_argument(ctx, "take", "must not be negative"));
            }
            Some(n) => n as usize,
            None => usize::MAX,
        };

        let items = ProjectionFragment::Take {
            base: Box::new(ProjectionFragment::Skip {
                base: Box::new(current.clone()),
                count: Box::new(crate::expr::literal_usize(skip)),
            }),
            count: Box::new(crate::expr::literal_usize(take)),
        };
        let total_var = ProjectionFragment::Var("total".to_string());
        let has_previous = ProjectionFragment::BinOp {
            op: BinOp::Gt,
            lhs: Box::new(ProjectionFragment::Literal(Literal::Int(skip as i64))),
            rhs: Box::new(ProjectionFragment::Literal(Literal::Int(0))),
        };
        let has_next = ProjectionFragment::BinOp {
            op: BinOp::Lt,
            lhs: Box::new(ProjectionFragment::Literal(Literal::Int(
                skip.saturating_add(take).min(i64::MAX as usize) as i64,
            ))),
            rhs: Box::new(total_var.clone()),
        };

        Ok(ProjectionFragment::Let {
            name: "total".to_string(),
            value: Box::new(ProjectionFragment::Count(Box::new(current))),
            body: Box::new(ProjectionFragment::Record(vec![
                ("items".to_string(), items),
                ("hasPreviousPage".to_string(), has_previous),
                ("hasNextPage".to_string(), has_next),
                ("totalItems".to_string(), total_var),
            ])),
        })
    }
}

fn invalid_argument(ctx: &ExtensionContext<'_>, argument: &str, reason: &str) -> CompileError {
    CompileError::InvalidArgument {
        field: ctx.field.name.clone(),
        argument: argument.to_string(),
        reason: reason.to_string(),
        location: SourceLocation::BuiltIn,
    }
}
