//! projectql-core: compiles a parsed GraphQL operation document into
//! composed projections over a host object graph, and executes them.
//!
//! [`execute_request`] strings together every stage: [`parser::parse_document`]
//! → [`compile::compile`] → [`exec::Executor::execute`]. Embedders that want
//! to cache a bound/compiled operation across requests can call
//! [`compile::compile`] themselves and drive [`exec::Executor`] directly.

pub mod ast;
pub mod authz;
pub mod compile;
pub mod cursor;
pub mod error;
pub mod exec;
pub mod expr;
pub mod extension;
pub mod host;
pub mod introspection;
pub mod loc;
pub mod operation;
pub mod parser;
pub mod schema;
pub mod value;

use authz::PrincipalAdapter;
use error::{EngineError, GraphQLError, Response};
use exec::{CancellationToken, Cancelled, Executor};
use host::value::HostValue;
use operation::variable::RequestVariables;
use schema::builder::Schema;

/// A single GraphQL request: operation document text, optional operation
/// name (required when the document defines more than one operation), and
/// the request's variable values.
#[derive(Clone, Debug, Default)]
pub struct Request {
    pub query: String,
    pub operation_name: Option<String>,
    pub variables: RequestVariables,
}

impl Request {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            operation_name: None,
            variables: RequestVariables::new(),
        }
    }

    pub fn with_operation_name(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    pub fn with_variables(mut self, variables: RequestVariables) -> Self {
        self.variables = variables;
        self
    }
}

/// Parses, compiles and executes `request` against `schema`/`root`. Parse
/// and compile failures produce an errors-only [`Response`]; execution
/// failures are isolated per field, so a `Response` with both `data` and
/// `errors` set is the normal shape for a partially-failed query.
pub fn execute_request(
    schema: &Schema,
    root: &HostValue,
    request: &Request,
    principal: &dyn PrincipalAdapter,
    cancellation: &dyn CancellationToken,
) -> Response {
    let document = match parser::parse_document(&request.query) {
        Ok(document) => document,
        Err(err) => return Response::errors_only(vec![GraphQLError::from(err)]),
    };

    let operation = match compile::compile(
        &document,
        schema,
        &request.variables,
        request.operation_name.as_deref(),
        principal,
    ) {
        Ok(operation) => operation,
        Err(errors) => {
            return Response::errors_only(errors.iter().map(GraphQLError::from).collect());
        }
    };

    match Executor::execute(&operation, root, cancellation) {
        Ok(response) => response,
        Err(Cancelled) => Response::errors_only(vec![GraphQLError::new("operation was cancelled")]),
    }
}

/// Like [`execute_request`], but surfaces a parse, compile, or cancellation
/// failure as a typed [`EngineError`] instead of folding it into an
/// errors-only [`Response`]. Per-field execution failures still land in the
/// returned `Response`'s `errors`, never here.
pub fn try_execute_request(
    schema: &Schema,
    root: &HostValue,
    request: &Request,
    principal: &dyn PrincipalAdapter,
    cancellation: &dyn CancellationToken,
) -> Result<Response, EngineError> {
    let document = parser::parse_document(&request.query)?;
    let operation = compile::compile(
        &document,
        schema,
        &request.variables,
        request.operation_name.as_deref(),
        principal,
    )?;

    match Executor::execute(&operation, root, cancellation) {
        Ok(response) => Ok(response),
        Err(Cancelled) => Err(EngineError::Cancelled),
    }
}

/// Concrete end-to-end scenarios against the public API, exercising the
/// whole parse → compile → execute pipeline rather than any one stage in
/// isolation.
#[cfg(test)]
mod end_to_end_tests {
    use std::sync::Arc;

    use crate::authz::{AllowAll, PrincipalAdapter, RoleSetPrincipal};
    use crate::exec::ExecutionError;
    use crate::extension::{self, PagingLimits, UseAuthorization, UseConnection, UseFilter};
    use crate::host::{HostObject, HostType, HostTypeDescriptor, HostValue, MemberDescriptor, Reflector};
    use crate::schema::{Schema, SchemaBuilder, TypeAnnotation};
    use crate::{Request, execute_request};
    use pretty_assertions::assert_eq;

    #[derive(Debug)]
    struct Person {
        id: i64,
        name: String,
        last_name: String,
    }

    impl HostObject for Person {
        fn host_type_name(&self) -> &str {
            "Person"
        }

        fn get_field(&self, field_name: &str) -> Result<HostValue, ExecutionError> {
            match field_name {
                "id" => Ok(HostValue::Int(self.id)),
                "name" => Ok(HostValue::String(self.name.clone())),
                "lastName" => Ok(HostValue::String(self.last_name.clone())),
                other => Err(ExecutionError::Internal(format!("unknown field '{other}' on Person"))),
            }
        }
    }

    impl HostType for Person {
        fn describe() -> HostTypeDescriptor {
            HostTypeDescriptor::object("Person")
                .with_member(MemberDescriptor::new("id", TypeAnnotation::named("Int").non_null()))
                .with_member(MemberDescriptor::new("name", TypeAnnotation::named("String").non_null()))
                .with_member(MemberDescriptor::new("lastName", TypeAnnotation::named("String").non_null()))
        }
    }

    fn people_schema() -> Schema {
        let root = HostTypeDescriptor::object("Query").with_member(MemberDescriptor::new(
            "people",
            TypeAnnotation::named("Person").non_null().list().non_null(),
        ));
        let person = Person::describe();

        let mut builder = SchemaBuilder::new();
        builder.set_query_type("Query");
        Reflector::new(vec![&root, &person]).reflect(&mut builder, "Query").unwrap();
        extension::attach(&mut builder, "Query", "people", Arc::new(UseFilter)).unwrap();
        builder.build()
    }

    fn people_root(people: Vec<Person>) -> HostValue {
        let mut map = indexmap::IndexMap::new();
        map.insert(
            "people".to_string(),
            HostValue::List(people.into_iter().map(|p| HostValue::Object(Arc::new(p) as Arc<dyn HostObject>)).collect()),
        );
        HostValue::Record(map)
    }

    fn run(schema: &Schema, root: &HostValue, query: &str) -> serde_json::Value {
        run_as(schema, root, query, &AllowAll)
    }

    fn run_as(schema: &Schema, root: &HostValue, query: &str, principal: &dyn PrincipalAdapter) -> serde_json::Value {
        let response = execute_request(schema, root, &Request::new(query), principal, &());
        serde_json::to_value(&response).unwrap()
    }

    #[test]
    fn scenario_1_selects_only_the_requested_fields() {
        let schema = people_schema();
        let root = people_root(vec![Person { id: 99, name: "Luke".to_string(), last_name: "Last Name".to_string() }]);

        let result = run(&schema, &root, "{ people { id name } }");
        assert_eq!(result["data"], serde_json::json!({"people": [{"id": 99, "name": "Luke"}]}));
        assert!(result.get("errors").is_none());
    }

    #[test]
    fn scenario_2_total_people_over_a_count_field() {
        let root_descriptor = HostTypeDescriptor::object("Query")
            .with_member(MemberDescriptor::new("totalPeople", TypeAnnotation::named("Int").non_null()));
        let mut builder = SchemaBuilder::new();
        builder.set_query_type("Query");
        Reflector::new(vec![&root_descriptor]).reflect(&mut builder, "Query").unwrap();
        let schema = builder.build();

        let mut map = indexmap::IndexMap::new();
        map.insert("totalPeople".to_string(), HostValue::Int(15));
        let root = HostValue::Record(map);

        let result = run(&schema, &root, "{ totalPeople }");
        assert_eq!(result["data"], serde_json::json!({"totalPeople": 15}));
    }

    #[test]
    fn scenario_3_removed_field_fails_at_compile_with_no_data() {
        let root = HostTypeDescriptor::object("Query").with_member(MemberDescriptor::new(
            "people",
            TypeAnnotation::named("Person").non_null().list().non_null(),
        ));
        let person = Person::describe();

        let mut builder = SchemaBuilder::new();
        builder.set_query_type("Query");
        Reflector::new(vec![&root, &person]).reflect(&mut builder, "Query").unwrap();
        builder.remove_field("Person", "id").unwrap();
        let schema = builder.build();

        let root_value = people_root(vec![Person { id: 1, name: "A".to_string(), last_name: "B".to_string() }]);
        let result = run(&schema, &root_value, "{ people { id } }");
        assert!(result.get("data").is_none());
        let message = result["errors"][0]["message"].as_str().unwrap();
        assert!(message.contains("id"), "expected the error to name the missing field, got: {message}");
    }

    #[test]
    fn scenario_6_filter_with_an_or_expression() {
        let schema = people_schema();
        let root = people_root(vec![
            Person { id: 10, name: "A".to_string(), last_name: "Z".to_string() },
            Person { id: 11, name: "B".to_string(), last_name: "Y".to_string() },
            Person { id: 12, name: "C".to_string(), last_name: "X".to_string() },
        ]);

        let result = run(&schema, &root, r#"{ people(filter: "id == 12 || id == 10") { id } }"#);
        let ids: Vec<i64> =
            result["data"]["people"].as_array().unwrap().iter().map(|p| p["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![10, 12]);
    }

    #[test]
    fn scenario_5_connection_paging_over_five_actors() {
        let root = HostTypeDescriptor::object("Query").with_member(MemberDescriptor::new(
            "actors",
            TypeAnnotation::named("Person").non_null().list().non_null(),
        ));
        let person = Person::describe();
        let mut builder = SchemaBuilder::new();
        builder.set_query_type("Query");
        Reflector::new(vec![&root, &person]).reflect(&mut builder, "Query").unwrap();
        extension::attach(&mut builder, "Query", "actors", Arc::new(UseConnection::new(PagingLimits::default())))
            .unwrap();
        let schema = builder.build();

        let actors = (0..5)
            .map(|i| Person { id: i, name: format!("Actor{i}"), last_name: String::new() })
            .collect::<Vec<_>>();
        let mut map = indexmap::IndexMap::new();
        map.insert(
            "actors".to_string(),
            HostValue::List(actors.into_iter().map(|p| HostValue::Object(Arc::new(p) as Arc<dyn HostObject>)).collect()),
        );
        let root_value = HostValue::Record(map);

        let query = "{ actors(first: 2) { totalCount edges { cursor node { id } } pageInfo { hasNextPage } } }";
        let result = run(&schema, &root_value, query);
        let actors = &result["data"]["actors"];
        assert_eq!(actors["totalCount"], 5);
        assert_eq!(actors["edges"].as_array().unwrap().len(), 2);
        assert_eq!(actors["edges"][0]["cursor"], serde_json::json!(crate::cursor::encode(0)));
        assert_eq!(actors["pageInfo"]["hasNextPage"], true);
    }

    #[test]
    fn unauthorized_principal_fails_the_whole_operation() {
        let root = HostTypeDescriptor::object("Query").with_member(
            MemberDescriptor::new("secret", TypeAnnotation::named("String").non_null())
                .requires_authorization("admin"),
        );
        let mut builder = SchemaBuilder::new();
        builder.set_query_type("Query");
        Reflector::new(vec![&root]).reflect(&mut builder, "Query").unwrap();
        extension::attach(&mut builder, "Query", "secret", Arc::new(UseAuthorization)).unwrap();
        let schema = builder.build();

        let mut map = indexmap::IndexMap::new();
        map.insert("secret".to_string(), HostValue::String("shh".to_string()));
        let root_value = HostValue::Record(map);

        let anonymous = RoleSetPrincipal::new(std::iter::empty());
        let result = run_as(&schema, &root_value, "{ secret }", &anonymous);
        assert!(result.get("data").is_none());

        let admin = RoleSetPrincipal::new(["admin".to_string()]);
        let result = run_as(&schema, &root_value, "{ secret }", &admin);
        assert_eq!(result["data"], serde_json::json!({"secret": "shh"}));
    }

    #[test]
    fn introspection_reports_registered_types_and_field_names() {
        let root = HostTypeDescriptor::object("Query").with_member(MemberDescriptor::new(
            "people",
            TypeAnnotation::named("Person").non_null().list().non_null(),
        ));
        let person = Person::describe();

        let mut builder = SchemaBuilder::new();
        builder.set_query_type("Query");
        Reflector::new(vec![&root, &person]).reflect(&mut builder, "Query").unwrap();
        crate::introspection::install(&mut builder, "Query").unwrap();
        let schema = builder.build();

        let root_value = people_root(vec![]);
        let result = run(&schema, &root_value, r#"{ __type(name: "Person") { name fields { name } } }"#);
        assert_eq!(result["data"]["__type"]["name"], "Person");
        let field_names: Vec<String> = result["data"]["__type"]["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["name"].as_str().unwrap().to_string())
            .collect();
        assert!(field_names.contains(&"id".to_string()));
        assert!(field_names.contains(&"name".to_string()));

        let result = run(&schema, &root_value, r#"{ __type(name: "DoesNotExist") { name } }"#);
        assert_eq!(result["data"]["__type"], serde_json::Value::Null);
    }

    #[test]
    fn try_execute_request_surfaces_a_parse_failure_as_an_engine_error() {
        let schema = people_schema();
        let root = people_root(vec![]);

        let err = crate::try_execute_request(&schema, &root, &Request::new("{ people {"), &AllowAll, &())
            .unwrap_err();
        assert!(matches!(err, crate::error::EngineError::Parse(_)));
    }

    #[test]
    fn try_execute_request_surfaces_a_compile_failure_as_an_engine_error() {
        let schema = people_schema();
        let root = people_root(vec![]);

        let err = crate::try_execute_request(&schema, &root, &Request::new("{ doesNotExist }"), &AllowAll, &())
            .unwrap_err();
        assert!(matches!(err, crate::error::EngineError::Compile(_)));
    }

    #[test]
    fn try_execute_request_returns_the_response_on_success() {
        let schema = people_schema();
        let root = people_root(vec![Person { id: 1, name: "Ada".to_string(), last_name: "Lovelace".to_string() }]);

        let response =
            crate::try_execute_request(&schema, &root, &Request::new("{ people { id } }"), &AllowAll, &()).unwrap();
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"], serde_json::json!({"people": [{"id": 1}]}));
    }
}
