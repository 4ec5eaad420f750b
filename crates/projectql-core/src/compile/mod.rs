//! Validator & Binder + Expression Builder: turns a parsed document plus a
//! schema and request variables into a [`CompiledOperation`] ready for
//! [`crate::exec`].

pub mod bind;
pub mod error;
pub mod project;

pub use error::CompileError;

use tracing::warn;

use crate::ast;
use crate::authz::PrincipalAdapter;
use crate::expr::ProjectionFragment;
use crate::operation::plan::OperationKind;
use crate::operation::variable::RequestVariables;
use crate::schema::builder::Schema;

/// A bound, expression-built operation: one composed [`ProjectionFragment`]
/// per top-level selection, named by its output name. Cacheable and
/// shareable since it holds no per-request state.
pub struct CompiledOperation {
    pub kind: OperationKind,
    pub fields: Vec<(String, ProjectionFragment)>,
}

/// Runs binding then expression building for `document` against `schema`.
pub fn compile(
    document: &ast::operation::Document,
    schema: &Schema,
    request_variables: &RequestVariables,
    operation_name: Option<&str>,
    principal: &dyn PrincipalAdapter,
) -> Result<CompiledOperation, Vec<CompileError>> {
    let plan = bind::bind(document, schema, request_variables, operation_name)?;

    let root_type_name = match plan.kind {
        OperationKind::Query => schema
            .query_type_name
            .as_deref()
            .expect("schema must have a configured query root type"),
        OperationKind::Mutation => schema
            .mutation_type_name
            .as_deref()
            .expect("schema must have a configured mutation root type"),
    };

    warn!(?operation_name, kind = ?plan.kind, "compiling operation");
    let fields = project::build_operation(schema, root_type_name, &plan.selections, principal)?;

    Ok(CompiledOperation { kind: plan.kind, fields })
}
