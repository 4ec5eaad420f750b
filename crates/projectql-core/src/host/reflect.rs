//! Host Type Reflector.
//!
//! Rust has no runtime reflection, so a host type cannot be "inspected" the
//! way a reflection-based host language would inspect it. Instead each host
//! type supplies its own [`HostTypeDescriptor`] describing its members; the
//! [`Reflector`] walks the reachable graph of descriptors starting from a
//! root and registers a [`crate::schema::model::SchemaType`] plus a `Field`
//! per member into a [`crate::schema::builder::SchemaBuilder`], applying the
//! same name-munging, nullability and collection-detection rules a
//! reflection-based implementation would apply by inspecting live type
//! metadata.

use std::collections::VecDeque;

use indexmap::IndexSet;

use crate::schema::builder::{SchemaBuilder, SchemaConflict};
use crate::schema::model::{Kind, TypeAnnotation};

/// Describes one host-type member for reflection purposes: its GraphQL
/// name (already camelCased by the describer), its declared type, whether
/// it's been marked obsolete, and the authorization requirements copied
/// onto the generated Field.
#[derive(Clone, Debug)]
pub struct MemberDescriptor {
    pub name: String,
    pub type_annotation: TypeAnnotation,
    pub description: Option<String>,
    pub obsolete: bool,
    pub required_authorization: Vec<String>,
}

impl MemberDescriptor {
    pub fn new(name: impl Into<String>, type_annotation: TypeAnnotation) -> Self {
        Self {
            name: name.into(),
            type_annotation,
            description: None,
            obsolete: false,
            required_authorization: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn obsolete(mut self) -> Self {
        self.obsolete = true;
        self
    }

    pub fn requires_authorization(mut self, role: impl Into<String>) -> Self {
        self.required_authorization.push(role.into());
        self
    }
}

/// What a single host type looks like for reflection purposes. Object host
/// types describe member fields; enum host types describe variant names.
#[derive(Clone, Debug)]
pub struct HostTypeDescriptor {
    pub name: String,
    pub kind: Kind,
    pub description: Option<String>,
    pub required_authorization: Vec<String>,
    /// Object-kind members, each returning a named type that must itself
    /// be reachable (either a built-in scalar or another registered
    /// descriptor supplied to the [`Reflector`]).
    pub members: Vec<MemberDescriptor>,
    /// Enum-kind variant names, in declaration order.
    pub enum_values: Vec<String>,
}

impl HostTypeDescriptor {
    pub fn object(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: Kind::Object,
            description: None,
            required_authorization: Vec::new(),
            members: Vec::new(),
            enum_values: Vec::new(),
        }
    }

    pub fn r#enum(name: impl Into<String>, values: impl IntoIterator<Item = String>) -> Self {
        Self {
            name: name.into(),
            kind: Kind::Enum,
            description: None,
            required_authorization: Vec::new(),
            members: Vec::new(),
            enum_values: values.into_iter().collect(),
        }
    }

    pub fn with_member(mut self, member: MemberDescriptor) -> Self {
        self.members.push(member);
        self
    }

    pub fn requires_authorization(mut self, role: impl Into<String>) -> Self {
        self.required_authorization.push(role.into());
        self
    }
}

/// Implemented by every host type the embedder wants auto-reflected via
/// [`SchemaBuilder::add_all_fields`]/[`Reflector::reflect`], in place of the
/// runtime type inspection a reflection-capable host language would use.
pub trait HostType {
    fn describe() -> HostTypeDescriptor
    where
        Self: Sized;
}

#[derive(Debug, thiserror::Error)]
pub enum ReflectionError {
    #[error("host type '{0}' is reachable from the root but was not supplied to the reflector")]
    UnknownType(String),

    #[error(transparent)]
    SchemaConflict(#[from] SchemaConflict),
}

/// Walks a set of [`HostTypeDescriptor`]s reachable from a root type,
/// registering a [`crate::schema::model::SchemaType`] and one `Field` per
/// member into the builder. Cyclic host graphs (Person ↔ Project) are
/// handled by tracking already-visited type names.
pub struct Reflector<'a> {
    descriptors: Vec<&'a HostTypeDescriptor>,
}

impl<'a> Reflector<'a> {
    pub fn new(descriptors: Vec<&'a HostTypeDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn reflect(
        &self,
        builder: &mut SchemaBuilder,
        root_type_name: &str,
    ) -> Result<(), ReflectionError> {
        let mut visited: IndexSet<String> = IndexSet::new();
        let mut queue: VecDeque<String> = VecDeque::new();
        queue.push_back(root_type_name.to_string());

        while let Some(type_name) = queue.pop_front() {
            if builder.schema().is_builtin_scalar(&type_name) {
                continue;
            }
            if !visited.insert(type_name.clone()) {
                continue;
            }

            let descriptor = self
                .descriptors
                .iter()
                .find(|d| d.name == type_name)
                .ok_or_else(|| ReflectionError::UnknownType(type_name.clone()))?;

            builder.add_reflected_type(descriptor)?;

            for member in &descriptor.members {
                if member.obsolete {
                    continue;
                }
                queue.push_back(member.type_annotation.inner_name().to_string());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::model::Kind as SchemaKind;

    #[test]
    fn reflects_object_fields_skipping_obsolete_members() {
        let query = HostTypeDescriptor::object("Query")
            .with_member(MemberDescriptor::new("name", TypeAnnotation::named("String").non_null()))
            .with_member(MemberDescriptor::new("oldName", TypeAnnotation::named("String")).obsolete());

        let mut builder = SchemaBuilder::new();
        Reflector::new(vec![&query]).reflect(&mut builder, "Query").unwrap();

        assert!(builder.schema().has_type("Query"));
        assert!(builder.get_field("Query", "name").is_some());
        assert!(builder.get_field("Query", "oldName").is_none());
    }

    #[test]
    fn follows_a_cycle_between_two_object_types_exactly_once() {
        let person = HostTypeDescriptor::object("Person")
            .with_member(MemberDescriptor::new("name", TypeAnnotation::named("String").non_null()))
            .with_member(MemberDescriptor::new("bestFriend", TypeAnnotation::named("Person")));

        let mut builder = SchemaBuilder::new();
        Reflector::new(vec![&person]).reflect(&mut builder, "Person").unwrap();

        assert_eq!(builder.schema().types().count(), 1);
        assert!(builder.get_field("Person", "bestFriend").is_some());
    }

    #[test]
    fn unreachable_descriptor_for_a_member_type_is_an_error() {
        let query = HostTypeDescriptor::object("Query")
            .with_member(MemberDescriptor::new("person", TypeAnnotation::named("Person")));

        let mut builder = SchemaBuilder::new();
        let err = Reflector::new(vec![&query]).reflect(&mut builder, "Query").unwrap_err();
        assert!(matches!(err, ReflectionError::UnknownType(name) if name == "Person"));
    }

    #[test]
    fn enum_descriptor_carries_its_variants_through() {
        let status = HostTypeDescriptor::r#enum("Status", ["ACTIVE".to_string(), "INACTIVE".to_string()]);
        assert_eq!(status.kind, SchemaKind::Enum);

        let mut builder = SchemaBuilder::new();
        Reflector::new(vec![&status]).reflect(&mut builder, "Status").unwrap();
        assert_eq!(builder.schema().get_type("Status").unwrap().enum_values, vec!["ACTIVE", "INACTIVE"]);
    }
}
