//! A small in-memory host graph (`Query { people, projects }`, `Mutation
//! { addPerson }`) used to exercise the engine end to end: reflection,
//! the filter/sort/connection/offset-paging/authorization extensions, and
//! introspection.

use std::sync::{Arc, Mutex};

use projectql::authz::RoleSetPrincipal;
use projectql::compile::error::CompileError;
use projectql::exec::ExecutionError;
use projectql::expr::ProjectionFragment;
use projectql::extension::{self, ExtensionContext, FieldExtension, PagingLimits, UseAuthorization, UseConnection, UseFilter, UseOffsetPaging, UseSort};
use projectql::host::{HostObject, HostType, HostTypeDescriptor, HostValue, MemberDescriptor, Reflector};
use projectql::loc::SourceLocation;
use projectql::schema::{Argument, Kind, ResolveExpr, Schema, SchemaBuilder, TypeAnnotation};

#[derive(Clone, Debug)]
pub struct PersonRecord {
    pub id: i64,
    pub name: String,
    pub age: i64,
}

#[derive(Clone, Debug)]
pub struct ProjectRecord {
    pub id: i64,
    pub name: String,
    pub budget: i64,
    pub owner_id: Option<i64>,
}

/// The mutable backing store behind `people`; `projects` are fixed at
/// startup since the demo has no project-mutating operation.
#[derive(Clone, Debug, Default)]
pub struct Store(Arc<Mutex<Vec<PersonRecord>>>);

impl Store {
    pub fn seeded() -> Self {
        Self(Arc::new(Mutex::new(vec![
            PersonRecord { id: 1, name: "Ada Lovelace".to_string(), age: 36 },
            PersonRecord { id: 2, name: "Grace Hopper".to_string(), age: 85 },
            PersonRecord { id: 3, name: "Alan Turing".to_string(), age: 41 },
        ])))
    }

    fn snapshot(&self) -> Vec<PersonRecord> {
        self.0.lock().expect("store mutex poisoned").clone()
    }

    fn add(&self, name: String, age: i64) -> PersonRecord {
        let mut people = self.0.lock().expect("store mutex poisoned");
        let id = people.iter().map(|p| p.id).max().unwrap_or(0) + 1;
        let record = PersonRecord { id, name, age };
        people.push(record.clone());
        record
    }
}

#[derive(Debug)]
struct Person(PersonRecord);

impl HostObject for Person {
    fn host_type_name(&self) -> &str {
        "Person"
    }

    fn get_field(&self, field_name: &str) -> Result<HostValue, ExecutionError> {
        match field_name {
            "id" => Ok(HostValue::String(self.0.id.to_string())),
            "name" => Ok(HostValue::String(self.0.name.clone())),
            "age" => Ok(HostValue::Int(self.0.age)),
            other => Err(ExecutionError::Internal(format!("unknown field '{other}' on Person"))),
        }
    }
}

impl HostType for Person {
    fn describe() -> HostTypeDescriptor {
        HostTypeDescriptor::object("Person")
            .with_member(MemberDescriptor::new("id", TypeAnnotation::named("ID").non_null()))
            .with_member(MemberDescriptor::new("name", TypeAnnotation::named("String").non_null()))
            .with_member(MemberDescriptor::new("age", TypeAnnotation::named("Int").non_null()))
    }
}

#[derive(Debug)]
struct Project(ProjectRecord);

impl HostObject for Project {
    fn host_type_name(&self) -> &str {
        "Project"
    }

    fn get_field(&self, field_name: &str) -> Result<HostValue, ExecutionError> {
        match field_name {
            "id" => Ok(HostValue::String(self.0.id.to_string())),
            "name" => Ok(HostValue::String(self.0.name.clone())),
            "budget" => Ok(HostValue::Int(self.0.budget)),
            "ownerId" => Ok(self.0.owner_id.map(|id| HostValue::String(id.to_string())).unwrap_or(HostValue::Null)),
            other => Err(ExecutionError::Internal(format!("unknown field '{other}' on Project"))),
        }
    }
}

impl HostType for Project {
    fn describe() -> HostTypeDescriptor {
        HostTypeDescriptor::object("Project")
            .with_member(MemberDescriptor::new("id", TypeAnnotation::named("ID").non_null()))
            .with_member(MemberDescriptor::new("name", TypeAnnotation::named("String").non_null()))
            .with_member(
                MemberDescriptor::new("budget", TypeAnnotation::named("Int").non_null())
                    .requires_authorization("admin"),
            )
            .with_member(MemberDescriptor::new("ownerId", TypeAnnotation::named("ID")))
    }
}

fn root_descriptor() -> HostTypeDescriptor {
    HostTypeDescriptor::object("Query")
        .with_member(MemberDescriptor::new(
            "people",
            TypeAnnotation::named("Person").non_null().list().non_null(),
        ))
        .with_member(MemberDescriptor::new(
            "projects",
            TypeAnnotation::named("Project").non_null().list().non_null(),
        ))
}

/// Registers `Query`/`Person`/`Project` via reflection, wires the filter,
/// sort, connection and offset-paging extensions onto `people`/`projects`
/// respectively, attaches `UseAuthorization` directly to `Project.budget`
/// (a field's own authorization requirement is only enforced by an
/// extension attached to that same field), adds `Mutation.addPerson`
/// against `store`, and installs introspection last.
pub fn build_schema(store: &Store) -> Schema {
    let mut builder = SchemaBuilder::new();
    builder.set_query_type("Query");
    builder.set_mutation_type("Mutation");

    let root = root_descriptor();
    let person = Person::describe();
    let project = Project::describe();
    let descriptors = vec![&root, &person, &project];
    Reflector::new(descriptors)
        .reflect(&mut builder, "Query")
        .expect("demo schema's reflected types are internally consistent");

    extension::attach(&mut builder, "Query", "people", Arc::new(UseFilter)).expect("attach UseFilter to people");
    extension::attach(&mut builder, "Query", "people", Arc::new(UseSort)).expect("attach UseSort to people");
    extension::attach(
        &mut builder,
        "Query",
        "people",
        Arc::new(UseConnection::new(PagingLimits::default())),
    )
    .expect("attach UseConnection to people");

    extension::attach(&mut builder, "Project", "budget", Arc::new(UseAuthorization))
        .expect("attach UseAuthorization to Project.budget");
    extension::attach(&mut builder, "Query", "projects", Arc::new(UseFilter)).expect("attach UseFilter to projects");
    extension::attach(&mut builder, "Query", "projects", Arc::new(UseOffsetPaging))
        .expect("attach UseOffsetPaging to projects");

    builder.add_type("Mutation", Kind::Object).expect("Mutation type is fresh");
    builder
        .add_field(
            "Mutation",
            "addPerson",
            TypeAnnotation::named("Person").non_null(),
            ResolveExpr::Custom(Arc::new(|_parent| ProjectionFragment::Context)),
        )
        .expect("add Mutation.addPerson");
    extension::attach(
        &mut builder,
        "Mutation",
        "addPerson",
        Arc::new(AddPersonExtension::new(store.clone())),
    )
    .expect("attach AddPersonExtension");

    projectql::introspection::install(&mut builder, "Query").expect("install introspection meta-types");

    builder.build()
}

/// Mutates the shared [`Store`] and returns the newly created `Person`,
/// entirely bypassing `Context` — the engine has no first-class notion of
/// a "current host graph being mutated", so side effects live behind the
/// same [`ProjectionFragment::Native`] escape hatch a custom scalar
/// coercion would use.
#[derive(Debug)]
struct AddPersonExtension {
    store: Store,
}

impl AddPersonExtension {
    fn new(store: Store) -> Self {
        Self { store }
    }
}

impl FieldExtension for AddPersonExtension {
    fn configure(
        &self,
        schema: &mut SchemaBuilder,
        type_name: &str,
        field_name: &str,
    ) -> Result<(), projectql::schema::SchemaConflict> {
        schema.add_argument(type_name, field_name, Argument::new("name", TypeAnnotation::named("String").non_null()))?;
        schema.add_argument(type_name, field_name, Argument::new("age", TypeAnnotation::named("Int").non_null()))
    }

    fn build_expression(
        &self,
        ctx: &ExtensionContext<'_>,
        _current: ProjectionFragment,
    ) -> Result<ProjectionFragment, CompileError> {
        let name = ctx
            .argument_values
            .get("name")
            .and_then(HostValue::as_str)
            .ok_or_else(|| CompileError::MissingVariable {
                name: "name".to_string(),
                location: SourceLocation::BuiltIn,
            })?
            .to_string();
        let age = ctx
            .argument_values
            .get("age")
            .and_then(HostValue::as_i64)
            .ok_or_else(|| CompileError::MissingVariable {
                name: "age".to_string(),
                location: SourceLocation::BuiltIn,
            })?;

        let store = self.store.clone();
        Ok(ProjectionFragment::Native(Arc::new(move |_root| {
            let record = store.add(name.clone(), age);
            Ok(HostValue::Object(Arc::new(Person(record))))
        })))
    }
}

/// Builds the demo's fixed project list. A plain function rather than a
/// `const`/`static` since `ProjectRecord` isn't `Copy` and carries an
/// `Option<i64>`.
pub fn seed_projects() -> Vec<ProjectRecord> {
    vec![
        ProjectRecord { id: 1, name: "Analytical Engine".to_string(), budget: 1_000_000, owner_id: Some(1) },
        ProjectRecord { id: 2, name: "Bombe".to_string(), budget: 250_000, owner_id: Some(3) },
    ]
}

/// Builds the root `Query`/`Mutation` context value from the store's
/// current state. Called fresh before every request so mutations made by
/// a prior request are visible in the eagerly-snapshotted host graph.
pub fn build_root(store: &Store, projects: &[ProjectRecord]) -> HostValue {
    let people = store
        .snapshot()
        .into_iter()
        .map(|record| HostValue::Object(Arc::new(Person(record)) as Arc<dyn HostObject>))
        .collect();
    let projects = projects
        .iter()
        .cloned()
        .map(|record| HostValue::Object(Arc::new(Project(record)) as Arc<dyn HostObject>))
        .collect();

    let mut map = indexmap::IndexMap::new();
    map.insert("people".to_string(), HostValue::List(people));
    map.insert("projects".to_string(), HostValue::List(projects));
    HostValue::Record(map)
}

/// A principal with the `admin` role, used when the CLI is run with
/// `--admin` to demonstrate `UseAuthorization` and `budget`'s
/// authorization requirement passing.
pub fn admin_principal() -> RoleSetPrincipal {
    RoleSetPrincipal::new(["admin".to_string()])
}
