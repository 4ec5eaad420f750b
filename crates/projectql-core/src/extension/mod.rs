//! The Field Extension Pipeline: ordered, stateful-per-field compile-time
//! transformers attached to a [`crate::schema::model::Field`].

pub mod authorization;
pub mod connection;
pub mod filter;
pub mod offset_paging;
pub mod sort;

use std::sync::Arc;

use indexmap::IndexMap;

use crate::compile::error::CompileError;
use crate::expr::ProjectionFragment;
use crate::host::value::HostValue;
use crate::operation::selection::SelectionNode;
use crate::schema::builder::{Schema, SchemaBuilder, SchemaConflict};
use crate::schema::model::Field;

pub use authorization::UseAuthorization;
pub use connection::{PagingLimits, UseConnection};
pub use filter::UseFilter;
pub use offset_paging::UseOffsetPaging;
pub use sort::UseSort;

/// Everything a [`FieldExtension::build_expression`] call needs besides the
/// expression it's rewriting: the field and selection it's attached to, and
/// the evaluated argument values. Extensions construct a raw data shape
/// (a `Record`/`List`); the generic per-field recursion in
/// `compile::project` is what turns any requested sub-selection (e.g. a
/// connection's `edges.node`) into its own projected record, so an
/// extension never needs to build nested selections itself.
pub struct ExtensionContext<'a> {
    pub schema: &'a Schema,
    pub type_name: &'a str,
    pub field: &'a Field,
    pub selection: &'a SelectionNode,
    pub argument_values: &'a IndexMap<String, HostValue>,
    pub principal: &'a dyn crate::authz::PrincipalAdapter,
}

pub trait FieldExtension: std::fmt::Debug + Send + Sync {
    /// Mutates field metadata once, at schema-build time: adds arguments,
    /// changes the return type, registers auxiliary types.
    fn configure(&self, schema: &mut SchemaBuilder, type_name: &str, field_name: &str) -> Result<(), SchemaConflict>;

    /// Rewrites the field's in-progress projection expression at compile
    /// time. Extensions observe each other's rewrites in pipeline order.
    fn build_expression(
        &self,
        ctx: &ExtensionContext<'_>,
        current: ProjectionFragment,
    ) -> Result<ProjectionFragment, CompileError>;
}

pub type FieldExtensionBox = Arc<dyn FieldExtension>;

/// Attaches `extension` to a field: runs its `configure` step against the
/// schema under construction, then appends it to the field's pipeline.
/// Extensions observe each other's rewrites in attach order, so callers
/// should attach `UseAuthorization` first and paging extensions
/// (`UseConnection`/`UseOffsetPaging`) after `UseFilter`/`UseSort`.
pub fn attach(
    builder: &mut SchemaBuilder,
    type_name: &str,
    field_name: &str,
    extension: FieldExtensionBox,
) -> Result<(), SchemaConflict> {
    extension.configure(builder, type_name, field_name)?;
    let mut field = builder
        .get_field(type_name, field_name)
        .ok_or_else(|| SchemaConflict::UnknownField {
            type_name: type_name.to_string(),
            field: field_name.to_string(),
        })?
        .clone();
    field.extensions.push(extension);
    builder.replace_field(type_name, field)
}
