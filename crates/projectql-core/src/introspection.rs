//! `__schema`/`__type` introspection: registers the standard meta-types as
//! ordinary [`SchemaType`]s/[`Field`]s, so the same
//! generic per-field recursion in [`crate::compile::project`] that
//! projects ordinary host fields also projects introspection queries.
//! There is no live reflection at query time — [`install`] takes a
//! one-time snapshot of the schema as it stands when called, so embedders
//! should call it last, after every host type and extension has been
//! registered.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::compile::error::CompileError;
use crate::expr::ProjectionFragment;
use crate::extension::{attach, ExtensionContext, FieldExtension};
use crate::host::value::HostValue;
use crate::loc::SourceLocation;
use crate::schema::builder::{Schema, SchemaBuilder, SchemaConflict};
use crate::schema::model::{Argument, Field, Kind, ResolveExpr, TypeAnnotation};

/// Registers `__Schema`/`__Type`/`__Field`/`__InputValue`/`__EnumValue`/
/// `__Directive` and attaches `__schema`/`__type(name:)` to `query_type_name`.
pub fn install(builder: &mut SchemaBuilder, query_type_name: &str) -> Result<(), SchemaConflict> {
    register_meta_types(builder)?;

    let snapshot = Arc::new(schema_snapshot(builder.schema()));

    let schema_value = (*snapshot).clone();
    builder.add_field(
        query_type_name,
        "__schema",
        TypeAnnotation::named("__Schema").non_null(),
        ResolveExpr::Custom(Arc::new(move |_parent| {
            let value = schema_value.clone();
            ProjectionFragment::Native(Arc::new(move |_ctx| Ok(value.clone())))
        })),
    )?;

    builder.add_field(
        query_type_name,
        "__type",
        TypeAnnotation::named("__Type"),
        ResolveExpr::Custom(Arc::new(|_parent| ProjectionFragment::Literal(crate::expr::Literal::Null))),
    )?;
    attach(
        builder,
        query_type_name,
        "__type",
        Arc::new(TypeByNameExtension { snapshot }),
    )?;

    Ok(())
}

fn register_meta_types(builder: &mut SchemaBuilder) -> Result<(), SchemaConflict> {
    let kind_type = builder.add_type("__TypeKind", Kind::Enum)?;
    kind_type.enum_values = [
        "SCALAR",
        "OBJECT",
        "INTERFACE",
        "UNION",
        "ENUM",
        "INPUT_OBJECT",
        "LIST",
        "NON_NULL",
    ]
    .into_iter()
    .map(String::from)
    .collect();

    builder.add_type("__EnumValue", Kind::Object)?;
    builder.add_field(
        "__EnumValue",
        "name",
        TypeAnnotation::named("String").non_null(),
        ResolveExpr::Member("name".into()),
    )?;
    builder.add_field(
        "__EnumValue",
        "description",
        TypeAnnotation::named("String"),
        ResolveExpr::Member("description".into()),
    )?;
    builder.add_field(
        "__EnumValue",
        "isDeprecated",
        TypeAnnotation::named("Boolean").non_null(),
        ResolveExpr::Member("isDeprecated".into()),
    )?;
    builder.add_field(
        "__EnumValue",
        "deprecationReason",
        TypeAnnotation::named("String"),
        ResolveExpr::Member("deprecationReason".into()),
    )?;

    builder.add_type("__InputValue", Kind::Object)?;
    builder.add_field(
        "__InputValue",
        "name",
        TypeAnnotation::named("String").non_null(),
        ResolveExpr::Member("name".into()),
    )?;
    builder.add_field(
        "__InputValue",
        "description",
        TypeAnnotation::named("String"),
        ResolveExpr::Member("description".into()),
    )?;
    builder.add_field(
        "__InputValue",
        "type",
        TypeAnnotation::named("__Type").non_null(),
        ResolveExpr::Member("type".into()),
    )?;
    builder.add_field(
        "__InputValue",
        "defaultValue",
        TypeAnnotation::named("String"),
        ResolveExpr::Member("defaultValue".into()),
    )?;

    builder.add_type("__Field", Kind::Object)?;
    builder.add_field(
        "__Field",
        "name",
        TypeAnnotation::named("String").non_null(),
        ResolveExpr::Member("name".into()),
    )?;
    builder.add_field(
        "__Field",
        "description",
        TypeAnnotation::named("String"),
        ResolveExpr::Member("description".into()),
    )?;
    builder.add_field(
        "__Field",
        "args",
        TypeAnnotation::named("__InputValue").non_null().list().non_null(),
        ResolveExpr::Member("args".into()),
    )?;
    builder.add_field(
        "__Field",
        "type",
        TypeAnnotation::named("__Type").non_null(),
        ResolveExpr::Member("type".into()),
    )?;
    builder.add_field(
        "__Field",
        "isDeprecated",
        TypeAnnotation::named("Boolean").non_null(),
        ResolveExpr::Member("isDeprecated".into()),
    )?;
    builder.add_field(
        "__Field",
        "deprecationReason",
        TypeAnnotation::named("String"),
        ResolveExpr::Member("deprecationReason".into()),
    )?;

    builder.add_type("__Directive", Kind::Object)?;
    builder.add_field(
        "__Directive",
        "name",
        TypeAnnotation::named("String").non_null(),
        ResolveExpr::Member("name".into()),
    )?;
    builder.add_field(
        "__Directive",
        "description",
        TypeAnnotation::named("String"),
        ResolveExpr::Member("description".into()),
    )?;
    builder.add_field(
        "__Directive",
        "locations",
        TypeAnnotation::named("String").non_null().list().non_null(),
        ResolveExpr::Member("locations".into()),
    )?;
    builder.add_field(
        "__Directive",
        "args",
        TypeAnnotation::named("__InputValue").non_null().list().non_null(),
        ResolveExpr::Member("args".into()),
    )?;

    builder.add_type("__Type", Kind::Object)?;
    builder.add_field(
        "__Type",
        "kind",
        TypeAnnotation::named("__TypeKind").non_null(),
        ResolveExpr::Member("kind".into()),
    )?;
    builder.add_field(
        "__Type",
        "name",
        TypeAnnotation::named("String"),
        ResolveExpr::Member("name".into()),
    )?;
    builder.add_field(
        "__Type",
        "description",
        TypeAnnotation::named("String"),
        ResolveExpr::Member("description".into()),
    )?;
    builder.add_field(
        "__Type",
        "fields",
        TypeAnnotation::named("__Field").non_null().list(),
        ResolveExpr::Member("fields".into()),
    )?;
    builder.add_field(
        "__Type",
        "interfaces",
        TypeAnnotation::named("__Type").non_null().list(),
        ResolveExpr::Member("interfaces".into()),
    )?;
    builder.add_field(
        "__Type",
        "possibleTypes",
        TypeAnnotation::named("__Type").non_null().list(),
        ResolveExpr::Member("possibleTypes".into()),
    )?;
    builder.add_field(
        "__Type",
        "enumValues",
        TypeAnnotation::named("__EnumValue").non_null().list(),
        ResolveExpr::Member("enumValues".into()),
    )?;
    builder.add_field(
        "__Type",
        "inputFields",
        TypeAnnotation::named("__InputValue").non_null().list(),
        ResolveExpr::Member("inputFields".into()),
    )?;
    builder.add_field(
        "__Type",
        "ofType",
        TypeAnnotation::named("__Type"),
        ResolveExpr::Member("ofType".into()),
    )?;

    builder.add_type("__Schema", Kind::Object)?;
    builder.add_field(
        "__Schema",
        "types",
        TypeAnnotation::named("__Type").non_null().list().non_null(),
        ResolveExpr::Member("types".into()),
    )?;
    builder.add_field(
        "__Schema",
        "queryType",
        TypeAnnotation::named("__Type").non_null(),
        ResolveExpr::Member("queryType".into()),
    )?;
    builder.add_field(
        "__Schema",
        "mutationType",
        TypeAnnotation::named("__Type"),
        ResolveExpr::Member("mutationType".into()),
    )?;
    builder.add_field(
        "__Schema",
        "subscriptionType",
        TypeAnnotation::named("__Type"),
        ResolveExpr::Member("subscriptionType".into()),
    )?;
    builder.add_field(
        "__Schema",
        "directives",
        TypeAnnotation::named("__Directive").non_null().list().non_null(),
        ResolveExpr::Member("directives".into()),
    )?;

    Ok(())
}

fn opt_string(value: Option<&String>) -> HostValue {
    value.cloned().map(HostValue::String).unwrap_or(HostValue::Null)
}

fn record(entries: Vec<(&'static str, HostValue)>) -> HostValue {
    HostValue::Record(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

fn kind_name(kind: Kind) -> &'static str {
    match kind {
        Kind::Scalar => "SCALAR",
        Kind::Object => "OBJECT",
        Kind::Input => "INPUT_OBJECT",
        Kind::Enum => "ENUM",
        Kind::Interface => "INTERFACE",
        Kind::Union => "UNION",
    }
}

/// Builds the `__Type` record for a wrapped (`List`/`NonNull`) or bare
/// named type reference, following `ofType` chains inward.
fn build_type_ref(ty: &TypeAnnotation, schema: &Schema) -> HostValue {
    match ty {
        TypeAnnotation::NonNull(inner) => wrap_kind("NON_NULL", build_type_ref(inner, schema)),
        TypeAnnotation::List(inner) => wrap_kind("LIST", build_type_ref(inner, schema)),
        TypeAnnotation::Named(name) => build_named_type(name, schema),
    }
}

fn wrap_kind(kind: &'static str, of_type: HostValue) -> HostValue {
    record(vec![
        ("kind", HostValue::Enum(kind.to_string())),
        ("name", HostValue::Null),
        ("description", HostValue::Null),
        ("fields", HostValue::Null),
        ("interfaces", HostValue::Null),
        ("possibleTypes", HostValue::Null),
        ("enumValues", HostValue::Null),
        ("inputFields", HostValue::Null),
        ("ofType", of_type),
    ])
}

fn build_named_type(name: &str, schema: &Schema) -> HostValue {
    let Some(schema_type) = schema.get_type(name) else {
        return record(vec![
            ("kind", HostValue::Enum("SCALAR".to_string())),
            ("name", HostValue::String(name.to_string())),
            ("description", HostValue::Null),
            ("fields", HostValue::Null),
            ("interfaces", HostValue::Null),
            ("possibleTypes", HostValue::Null),
            ("enumValues", HostValue::Null),
            ("inputFields", HostValue::Null),
            ("ofType", HostValue::Null),
        ]);
    };

    let is_field_holder = matches!(schema_type.kind, Kind::Object | Kind::Interface);
    let fields = if is_field_holder {
        HostValue::List(
            schema_type
                .fields
                .values()
                .map(|f| build_field_meta(f, schema))
                .collect(),
        )
    } else {
        HostValue::Null
    };

    let input_fields = if matches!(schema_type.kind, Kind::Input) {
        HostValue::List(
            schema_type
                .fields
                .values()
                .map(|f| build_input_field_meta(f, schema))
                .collect(),
        )
    } else {
        HostValue::Null
    };

    let enum_values = if matches!(schema_type.kind, Kind::Enum) {
        HostValue::List(schema_type.enum_values.iter().map(|v| build_enum_value(v)).collect())
    } else {
        HostValue::Null
    };

    let possible_types = if matches!(schema_type.kind, Kind::Interface | Kind::Union) {
        HostValue::List(Vec::new())
    } else {
        HostValue::Null
    };

    let interfaces = if matches!(schema_type.kind, Kind::Object) {
        HostValue::List(Vec::new())
    } else {
        HostValue::Null
    };

    record(vec![
        ("kind", HostValue::Enum(kind_name(schema_type.kind).to_string())),
        ("name", HostValue::String(schema_type.name.clone())),
        ("description", opt_string(schema_type.description.as_ref())),
        ("fields", fields),
        ("interfaces", interfaces),
        ("possibleTypes", possible_types),
        ("enumValues", enum_values),
        ("inputFields", input_fields),
        ("ofType", HostValue::Null),
    ])
}

fn build_field_meta(field: &Field, schema: &Schema) -> HostValue {
    record(vec![
        ("name", HostValue::String(field.name.clone())),
        ("description", opt_string(field.description.as_ref())),
        (
            "args",
            HostValue::List(field.arguments.values().map(|a| build_input_value(a, schema)).collect()),
        ),
        ("type", build_type_ref(&field.return_type, schema)),
        ("isDeprecated", HostValue::Bool(field.is_deprecated())),
        ("deprecationReason", opt_string(field.deprecation_reason.as_ref())),
    ])
}

fn build_input_field_meta(field: &Field, schema: &Schema) -> HostValue {
    record(vec![
        ("name", HostValue::String(field.name.clone())),
        ("description", opt_string(field.description.as_ref())),
        ("type", build_type_ref(&field.return_type, schema)),
        ("defaultValue", HostValue::Null),
    ])
}

fn build_input_value(arg: &Argument, schema: &Schema) -> HostValue {
    record(vec![
        ("name", HostValue::String(arg.name.clone())),
        ("description", HostValue::Null),
        ("type", build_type_ref(&arg.input_type, schema)),
        ("defaultValue", HostValue::Null),
    ])
}

fn build_enum_value(name: &str) -> HostValue {
    record(vec![
        ("name", HostValue::String(name.to_string())),
        ("description", HostValue::Null),
        ("isDeprecated", HostValue::Bool(false)),
        ("deprecationReason", HostValue::Null),
    ])
}

fn schema_snapshot(schema: &Schema) -> HostValue {
    let types = schema.types().map(|t| build_named_type(&t.name, schema)).collect();
    let query_type = schema
        .query_type_name
        .as_deref()
        .map(|n| build_named_type(n, schema))
        .unwrap_or(HostValue::Null);
    let mutation_type = schema
        .mutation_type_name
        .as_deref()
        .map(|n| build_named_type(n, schema))
        .unwrap_or(HostValue::Null);

    record(vec![
        ("types", HostValue::List(types)),
        ("queryType", query_type),
        ("mutationType", mutation_type),
        ("subscriptionType", HostValue::Null),
        ("directives", HostValue::List(Vec::new())),
    ])
}

/// Resolves `__type(name: "...")` by looking the name up in the `types`
/// list of a precomputed `__Schema` snapshot taken at [`install`] time.
#[derive(Debug)]
struct TypeByNameExtension {
    snapshot: Arc<HostValue>,
}

impl FieldExtension for TypeByNameExtension {
    fn configure(&self, schema: &mut SchemaBuilder, type_name: &str, field_name: &str) -> Result<(), SchemaConflict> {
        schema.add_argument(
            type_name,
            field_name,
            Argument::new("name", TypeAnnotation::named("String").non_null()),
        )
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

        let snapshot = self.snapshot.clone();
        Ok(ProjectionFragment::Native(Arc::new(move |_ctx| {
            let types = snapshot.get_field("types")?.into_list()?;
            for candidate in types {
                if let Ok(candidate_name) = candidate.get_field("name") {
                    if candidate_name.as_str() == Some(name.as_str()) {
                        return Ok(candidate);
                    }
                }
            }
            Ok(HostValue::Null)
        })))
    }
}
