//! The Schema Model.

pub mod builder;
pub mod model;

pub use builder::{Schema, SchemaBuilder, SchemaConflict};
pub use model::{Argument, Field, Kind, ResolveExpr, SchemaType, TypeAnnotation};
