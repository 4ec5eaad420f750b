//! The host object graph: the opaque, embedder-supplied data this engine
//! projects over. See [`value::HostValue`]/[`value::HostObject`] for the
//! runtime value side and [`reflect`] for how host types become schema
//! types.

pub mod reflect;
pub mod value;

pub use reflect::{HostType, HostTypeDescriptor, MemberDescriptor, Reflector, ReflectionError};
pub use value::{HostObject, HostValue};
