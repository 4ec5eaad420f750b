//! Connection (cursor) paging extension (`UseConnection`) — the
//! archetypal and most intricate extension. Registers `PageInfo` and
//! per-element-type `Edge`/`Connection` wrapper types, the way the
//! offset-paging extension registers its own `Page` wrapper, and composes
//! `edges`/`pageInfo`/`totalCount` as an ordinary record whose sub-fields
//! the generic per-field recursion in `compile::project` projects.

use crate::compile::error::CompileError;
use crate::expr::{BinOp, Literal, ProjectionFragment};
use crate::extension::{ExtensionContext, FieldExtension};
use crate::loc::SourceLocation;
use crate::schema::builder::{SchemaBuilder, SchemaConflict};
use crate::schema::model::{Argument, Kind, ResolveExpr, TypeAnnotation};

/// Configured page-size bounds, clamping requested page sizes to a cap.
#[derive(Clone, Copy, Debug)]
pub struct PagingLimits {
    pub max_page_size: usize,
    pub default_page_size: usize,
}

impl Default for PagingLimits {
    fn default() -> Self {
        Self {
            max_page_size: 100,
            default_page_size: 20,
        }
    }
}

#[derive(Debug)]
pub struct UseConnection {
    pub limits: PagingLimits,
}

impl UseConnection {
    pub fn new(limits: PagingLimits) -> Self {
        Self { limits }
    }
}

fn edge_type_name(element_type: &str) -> String {
    format!("{element_type}Edge")
}

fn connection_type_name(element_type: &str) -> String {
    format!("{element_type}Connection")
}

const PAGE_INFO_TYPE: &str = "PageInfo";

impl FieldExtension for UseConnection {
    fn configure(&self, schema: &mut SchemaBuilder, type_name: &str, field_name: &str) -> Result<(), SchemaConflict> {
        let field = schema
            .get_field(type_name, field_name)
            .ok_or_else(|| SchemaConflict::UnknownField {
                type_name: type_name.to_string(),
                field: field_name.to_string(),
            })?;
        if !field.return_type.is_list() {
            return Err(SchemaConflict::UnknownType(format!(
                "connection extension requires a list-returning field, '{}.{}' is not one",
                type_name, field_name
            )));
        }
        let element_type = field.return_type.inner_name().to_string();
        let edge_type = edge_type_name(&element_type);
        let connection_type = connection_type_name(&element_type);

        if !schema.has_type(PAGE_INFO_TYPE) {
            schema.add_type(PAGE_INFO_TYPE, Kind::Object)?;
            for name in ["hasNextPage", "hasPreviousPage"] {
                schema.add_field(
                    PAGE_INFO_TYPE,
                    name,
                    TypeAnnotation::named("Boolean").non_null(),
                    ResolveExpr::Member(name.to_string()),
                )?;
            }
            schema.add_field(
                PAGE_INFO_TYPE,
                "startCursor",
                TypeAnnotation::named("String"),
                ResolveExpr::Member("startCursor".to_string()),
            )?;
            schema.add_field(
                PAGE_INFO_TYPE,
                "endCursor",
                TypeAnnotation::named("String"),
                ResolveExpr::Member("endCursor".to_string()),
            )?;
        }

        if !schema.has_type(&edge_type) {
            schema.add_type(edge_type.clone(), Kind::Object)?;
            schema.add_field(
                &edge_type,
                "node",
                TypeAnnotation::named(element_type.clone()),
                ResolveExpr::Member("node".to_string()),
            )?;
            schema.add_field(
                &edge_type,
                "cursor",
                TypeAnnotation::named("String").non_null(),
                ResolveExpr::Member("cursor".to_string()),
            )?;
        }

        if !schema.has_type(&connection_type) {
            schema.add_type(connection_type.clone(), Kind::Object)?;
            schema.add_field(
                &connection_type,
                "edges",
                TypeAnnotation::named(edge_type).non_null().list().non_null(),
                ResolveExpr::Member("edges".to_string()),
            )?;
            schema.add_field(
                &connection_type,
                "totalCount",
                TypeAnnotation::named("Int").non_null(),
                ResolveExpr::Member("totalCount".to_string()),
            )?;
            schema.add_field(
                &connection_type,
                "pageInfo",
                TypeAnnotation::named(PAGE_INFO_TYPE).non_null(),
                ResolveExpr::Member("pageInfo".to_string()),
            )?;
        }

        schema.add_argument(type_name, field_name, Argument::new("first", TypeAnnotation::named("Int")))?;
        schema.add_argument(type_name, field_name, Argument::new("after", TypeAnnotation::named("String")))?;
        schema.add_argument(type_name, field_name, Argument::new("last", TypeAnnotation::named("Int")))?;
        schema.add_argument(type_name, field_name, Argument::new("before", TypeAnnotation::named("String")))?;

        let field = schema
            .get_field(type_name, field_name)
            .expect("field just configured")
            .clone_for_return_type(TypeAnnotation::named(connection_type).non_null());
        schema.replace_field(type_name, field)
    }

    fn build_expression(
        &self,
        ctx: &ExtensionContext<'_>,
        current: ProjectionFragment,
    ) -> Result<ProjectionFragment, CompileError> {
        let first = read_nonneg_arg(ctx, "first")?;
        let last = read_nonneg_arg(ctx, "last")?;
        let after = ctx.argument_values.get("after").and_then(|v| v.as_str());
        let before = ctx.argument_values.get("before").and_then(|v| v.as_str());

        if after.is_some() && before.is_some() {
            return Err(invalid_argument(ctx, "before", "'before' and 'after' are mutually exclusive"));
        }
        for (name, n) in [("first", first), ("last", last)] {
            if let Some(n) = n {
                if n > self.limits.max_page_size as i64 {
                    return Err(invalid_argument(
                        ctx,
                        name,
                        &format!("must not exceed the configured page size cap of {}", self.limits.max_page_size),
                    ));
                }
            }
        }

        let after_offset = crate::cursor::decode(after).map_err(|e| CompileError::InvalidCursor(e.0))?;
        let before_offset = crate::cursor::decode(before).map_err(|e| CompileError::InvalidCursor(e.0))?;

        let lit = |n: i64| ProjectionFragment::Literal(Literal::Int(n));
        let sub = |a: ProjectionFragment, b: ProjectionFragment| ProjectionFragment::BinOp {
            op: BinOp::Sub,
            lhs: Box::new(a),
            rhs: Box::new(b),
        };

        // Offsets derived from (first, after, last, before).
        let (skip_expr, take_expr): (ProjectionFragment, ProjectionFragment) =
            match (after_offset, before_offset, first, last) {
                (Some(a), _, Some(n), _) => (lit(a + 1), lit(n)),
                (_, Some(b), _, Some(n)) => (lit((b - n).max(0)), lit(n.min(b.max(0)))),
                (None, None, Some(n), _) => (lit(0), lit(n)),
                (None, None, None, Some(n)) => (sub(ProjectionFragment::Var("total".to_string()), lit(n)), lit(n)),
                _ => (lit(0), lit(self.limits.default_page_size as i64)),
            };

        let edges_expr = ProjectionFragment::Select {
            base: Box::new(ProjectionFragment::Take {
                base: Box::new(ProjectionFragment::Skip {
                    base: Box::new(current.clone()),
                    count: Box::new(skip_expr.clone()),
                }),
                count: Box::new(take_expr.clone()),
            }),
            project: Box::new(ProjectionFragment::Record(vec![
                ("node".to_string(), ProjectionFragment::Context),
                (
                    "cursor".to_string(),
                    ProjectionFragment::Cursor(Box::new(ProjectionFragment::BinOp {
                        op: BinOp::Add,
                        lhs: Box::new(ProjectionFragment::ElementIndex),
                        rhs: Box::new(skip_expr.clone()),
                    })),
                ),
            ])),
        };

        let has_previous = ProjectionFragment::BinOp {
            op: BinOp::Gt,
            lhs: Box::new(skip_expr.clone()),
            rhs: Box::new(lit(0)),
        };
        let has_next = ProjectionFragment::BinOp {
            op: BinOp::Lt,
            lhs: Box::new(ProjectionFragment::BinOp {
                op: BinOp::Add,
                lhs: Box::new(skip_expr.clone()),
                rhs: Box::new(ProjectionFragment::Count(Box::new(ProjectionFragment::Var(
                    "edges".to_string(),
                )))),
            }),
            rhs: Box::new(ProjectionFragment::Var("total".to_string())),
        };
        let edges_empty = ProjectionFragment::BinOp {
            op: BinOp::Eq,
            lhs: Box::new(ProjectionFragment::Count(Box::new(ProjectionFragment::Var(
                "edges".to_string(),
            )))),
            rhs: Box::new(lit(0)),
        };
        let start_cursor = ProjectionFragment::If {
            cond: Box::new(edges_empty.clone()),
            then: Box::new(ProjectionFragment::Literal(Literal::Null)),
            els: Box::new(ProjectionFragment::Cursor(Box::new(skip_expr.clone()))),
        };
        let end_cursor = ProjectionFragment::If {
            cond: Box::new(edges_empty),
            then: Box::new(ProjectionFragment::Literal(Literal::Null)),
            els: Box::new(ProjectionFragment::Cursor(Box::new(sub(
                ProjectionFragment::BinOp {
                    op: BinOp::Add,
                    lhs: Box::new(skip_expr),
                    rhs: Box::new(ProjectionFragment::Count(Box::new(ProjectionFragment::Var(
                        "edges".to_string(),
                    )))),
                },
                lit(1),
            )))),
        };

        let body = ProjectionFragment::Let {
            name: "edges".to_string(),
            value: Box::new(edges_expr),
            body: Box::new(ProjectionFragment::Record(vec![
                ("edges".to_string(), ProjectionFragment::Var("edges".to_string())),
                ("totalCount".to_string(), ProjectionFragment::Var("total".to_string())),
                (
                    "pageInfo".to_string(),
                    ProjectionFragment::Record(vec![
                        ("hasPreviousPage".to_string(), has_previous),
                        ("hasNextPage".to_string(), has_next),
                        ("startCursor".to_string(), start_cursor),
                        ("endCursor".to_string(), end_cursor),
                    ]),
                ),
            ])),
        };

        Ok(ProjectionFragment::Let {
            name: "total".to_string(),
            value: Box::new(ProjectionFragment::Count(Box::new(current))),
            body: Box::new(body),
        })
    }
}

fn read_nonneg_arg(ctx: &ExtensionContext<'_>, name: &str) -> Result<Option<i64>, CompileError> {
    match ctx.argument_values.get(name).and_then(|v| v.as_i64()) {
        Some(n) if n < 0 => Err(invalid_argument(ctx, name, "must not be negative")),
        other => Ok(other),
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

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use super::*;
    use crate::authz::AllowAll;
    use crate::host::value::HostValue;
    use crate::operation::selection::SelectionNode;

    fn schema_with_people_field() -> SchemaBuilder {
        let mut builder = SchemaBuilder::new();
        builder.add_type("Person", Kind::Object).unwrap();
        builder.add_type("Query", Kind::Object).unwrap();
        builder
            .add_field(
                "Query",
                "people",
                TypeAnnotation::named("Person").non_null().list().non_null(),
                ResolveExpr::Member("people".to_string()),
            )
            .unwrap();
        builder
    }

    fn connection(builder: &mut SchemaBuilder) -> UseConnection {
        let conn = UseConnection::new(PagingLimits::default());
        conn.configure(builder, "Query", "people").unwrap();
        conn
    }

    #[test]
    fn configure_registers_page_info_edge_and_connection_wrapper_types() {
        let mut builder = schema_with_people_field();
        connection(&mut builder);

        assert!(builder.schema().has_type("PageInfo"));
        assert!(builder.schema().has_type("PersonEdge"));
        assert!(builder.schema().has_type("PersonConnection"));
        assert!(builder.get_field("PersonEdge", "node").is_some());
        assert!(builder.get_field("PersonConnection", "edges").is_some());
        assert!(builder.get_field("PersonConnection", "pageInfo").is_some());

        let field = builder.get_field("Query", "people").unwrap();
        assert_eq!(field.return_type.inner_name(), "PersonConnection");
        assert!(field.arguments.contains_key("first"));
        assert!(field.arguments.contains_key("after"));
    }

    #[test]
    fn configure_rejects_a_non_list_field() {
        let mut builder = SchemaBuilder::new();
        builder.add_type("Person", Kind::Object).unwrap();
        builder.add_type("Query", Kind::Object).unwrap();
        builder
            .add_field("Query", "firstPerson", TypeAnnotation::named("Person"), ResolveExpr::Member("firstPerson".to_string()))
            .unwrap();

        let conn = UseConnection::new(PagingLimits::default());
        let err = conn.configure(&mut builder, "Query", "firstPerson").unwrap_err();
        assert!(matches!(err, SchemaConflict::UnknownType(_)));
    }

    #[test]
    fn first_and_last_together_with_after_and_before_are_mutually_exclusive() {
        let mut builder = schema_with_people_field();
        let conn = connection(&mut builder);
        let field = builder.get_field("Query", "people").unwrap().clone();
        let schema = builder.schema();
        let selection = SelectionNode::new("people");
        let mut arguments: IndexMap<String, HostValue> = IndexMap::new();
        arguments.insert("after".to_string(), HostValue::String(crate::cursor::encode(0)));
        arguments.insert("before".to_string(), HostValue::String(crate::cursor::encode(5)));
        let principal = AllowAll;

        let ctx = ExtensionContext {
            schema,
            type_name: "Query",
            field: &field,
            selection: &selection,
            argument_values: &arguments,
            principal: &principal,
        };

        let err = conn.build_expression(&ctx, ProjectionFragment::Context).unwrap_err();
        assert!(matches!(err, CompileError::InvalidArgument { argument, .. } if argument == "before"));
    }

    #[test]
    fn first_exceeding_the_page_size_cap_is_rejected() {
        let mut builder = schema_with_people_field();
        let conn = UseConnection::new(PagingLimits { max_page_size: 10, default_page_size: 5 });
        conn.configure(&mut builder, "Query", "people").unwrap();
        let field = builder.get_field("Query", "people").unwrap().clone();
        let schema = builder.schema();
        let selection = SelectionNode::new("people");
        let mut arguments: IndexMap<String, HostValue> = IndexMap::new();
        arguments.insert("first".to_string(), HostValue::Int(50));
        let principal = AllowAll;

        let ctx = ExtensionContext {
            schema,
            type_name: "Query",
            field: &field,
            selection: &selection,
            argument_values: &arguments,
            principal: &principal,
        };

        let err = conn.build_expression(&ctx, ProjectionFragment::Context).unwrap_err();
        assert!(matches!(err, CompileError::InvalidArgument { argument, .. } if argument == "first"));
    }

    #[test]
    fn with_no_paging_arguments_build_expression_produces_a_total_let_binding() {
        let mut builder = schema_with_people_field();
        let conn = connection(&mut builder);
        let field = builder.get_field("Query", "people").unwrap().clone();
        let schema = builder.schema();
        let selection = SelectionNode::new("people");
        let arguments: IndexMap<String, HostValue> = IndexMap::new();
        let principal = AllowAll;

        let ctx = ExtensionContext {
            schema,
            type_name: "Query",
            field: &field,
            selection: &selection,
            argument_values: &arguments,
            principal: &principal,
        };

        let result = conn.build_expression(&ctx, ProjectionFragment::Context).unwrap();
        assert!(matches!(result, ProjectionFragment::Let { name, .. } if name == "total"));
    }
}
