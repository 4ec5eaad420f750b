//! Validator & Binder: walks the parsed document against
//! the schema and the document's fragments, resolving fragment spreads,
//! honouring `@skip`/`@include`, binding field and argument references,
//! and producing an [`OperationPlan`] ready for the Expression Builder.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::ast;
use crate::compile::error::CompileError;
use crate::host::value::HostValue;
use crate::loc::SourceLocation;
use crate::operation::fragment::{FragmentRegistry, FragmentRegistryError};
use crate::operation::plan::{OperationKind, OperationPlan};
use crate::operation::selection::SelectionNode;
use crate::operation::variable::RequestVariables;
use crate::schema::builder::Schema;
use crate::schema::model::{Argument, Kind, TypeAnnotation};
use crate::value::Value;

/// Binds a parsed `document` against `schema`, selecting the operation
/// named by `operation_name` (or the document's sole operation, if there
/// is exactly one) and resolving `request_variables` against its variable
/// definitions.
pub fn bind(
    document: &ast::operation::Document,
    schema: &Schema,
    request_variables: &RequestVariables,
    operation_name: Option<&str>,
) -> Result<OperationPlan, Vec<CompileError>> {
    let fragments = FragmentRegistry::build(document).map_err(convert_fragment_errors)?;

    let operations: Vec<&ast::operation::OperationDefinition> = document
        .definitions
        .iter()
        .filter_map(|def| match def {
            ast::operation::Definition::Operation(op) => Some(op),
            ast::operation::Definition::Fragment(_) => None,
        })
        .collect();

    let chosen = match operation_name {
        Some(name) => operations
            .iter()
            .find(|op| operation_name_of(op) == Some(name))
            .copied()
            .ok_or_else(|| vec![CompileError::OperationNotFound(name.to_string())])?,
        None => match operations.as_slice() {
            [op] => *op,
            [] => return Err(vec![CompileError::OperationNotFound(String::new())]),
            _ => return Err(vec![CompileError::AmbiguousOperation]),
        },
    };

    let (kind, variable_defs, selection_set) = operation_parts(chosen)?;

    let mut errors = Vec::new();
    let variables = bind_variables(variable_defs, request_variables, schema, &mut errors);

    let root_type_name = match kind {
        OperationKind::Query => schema
            .query_type_name
            .as_deref()
            .expect("schema must have a configured query root type"),
        OperationKind::Mutation => schema
            .mutation_type_name
            .as_deref()
            .expect("schema must have a configured mutation root type"),
    };

    let selections = bind_selection_set(
        selection_set,
        root_type_name,
        schema,
        &fragments,
        &variables,
        &mut errors,
    );

    if errors.is_empty() {
        Ok(OperationPlan::new(kind, selections))
    } else {
        Err(errors)
    }
}

fn convert_fragment_errors(errors: Vec<FragmentRegistryError>) -> Vec<CompileError> {
    errors
        .into_iter()
        .map(|err| match err {
            FragmentRegistryError::DuplicateDefinition(name) => CompileError::DuplicateFragment(name),
            FragmentRegistryError::Cycle(names) => CompileError::FragmentCycle(names.join(" -> ")),
            FragmentRegistryError::UndefinedFragment(name) => CompileError::UndefinedFragment(name),
        })
        .collect()
}

fn operation_name_of(op: &ast::operation::OperationDefinition) -> Option<&str> {
    use graphql_parser::query::OperationDefinition as Op;
    match op {
        Op::SelectionSet(_) => None,
        Op::Query(q) => q.name.as_deref(),
        Op::Mutation(m) => m.name.as_deref(),
        Op::Subscription(s) => s.name.as_deref(),
    }
}

type OperationParts<'a> = (
    OperationKind,
    &'a [ast::operation::VariableDefinition],
    &'a ast::operation::SelectionSet,
);

fn operation_parts(op: &ast::operation::OperationDefinition) -> Result<OperationParts<'_>, Vec<CompileError>> {
    use graphql_parser::query::OperationDefinition as Op;
    match op {
        Op::SelectionSet(selection_set) => Ok((OperationKind::Query, &[], selection_set)),
        Op::Query(q) => Ok((OperationKind::Query, &q.variable_definitions, &q.selection_set)),
        Op::Mutation(m) => Ok((OperationKind::Mutation, &m.variable_definitions, &m.selection_set)),
        Op::Subscription(_) => Err(vec![CompileError::SubscriptionsUnsupported]),
    }
}

fn bind_variables(
    variable_defs: &[ast::operation::VariableDefinition],
    request_variables: &RequestVariables,
    schema: &Schema,
    errors: &mut Vec<CompileError>,
) -> IndexMap<String, HostValue> {
    let mut variables = IndexMap::new();
    for var_def in variable_defs {
        let location = SourceLocation::from_ast_pos(var_def.position);
        let type_annotation = TypeAnnotation::from_ast(&var_def.var_type);

        let value = if let Some(json) = request_variables.get(&var_def.name) {
            HostValue::from(json)
        } else if let Some(default) = &var_def.default_value {
            match Value::from_ast(default).resolve(&IndexMap::new()) {
                Ok(value) => value,
                Err(name) => {
                    errors.push(CompileError::MissingVariable { name, location });
                    continue;
                }
            }
        } else if !type_annotation.is_nullable() {
            errors.push(CompileError::MissingVariable {
                name: var_def.name.clone(),
                location,
            });
            continue;
        } else {
            HostValue::Null
        };

        if let Err(reason) = check_value_type(&value, &type_annotation, schema) {
            errors.push(CompileError::InvalidArgument {
                field: format!("${}", var_def.name),
                argument: var_def.name.clone(),
                reason,
                location,
            });
            continue;
        }

        variables.insert(var_def.name.clone(), value);
    }
    variables
}

/// Binds one selection set against `parent_type_name`, inlining fragment
/// spreads and merging duplicate output names.
fn bind_selection_set(
    selection_set: &ast::operation::SelectionSet,
    parent_type_name: &str,
    schema: &Schema,
    fragments: &FragmentRegistry,
    variables: &IndexMap<String, HostValue>,
    errors: &mut Vec<CompileError>,
) -> Vec<SelectionNode> {
    let mut by_output: IndexMap<String, (SelectionNode, String)> = IndexMap::new();
    collect_selections(
        selection_set,
        parent_type_name,
        schema,
        fragments,
        variables,
        errors,
        &mut by_output,
    );
    by_output.into_values().map(|(node, _)| node).collect()
}

fn collect_selections(
    selection_set: &ast::operation::SelectionSet,
    parent_type_name: &str,
    schema: &Schema,
    fragments: &FragmentRegistry,
    variables: &IndexMap<String, HostValue>,
    errors: &mut Vec<CompileError>,
    by_output: &mut IndexMap<String, (SelectionNode, String)>,
) {
    for selection in &selection_set.items {
        match selection {
            ast::operation::Selection::Field(field) => {
                if directive_excludes(&field.directives, variables, errors) {
                    continue;
                }
                bind_field(field, parent_type_name, schema, fragments, variables, errors, by_output);
            }
            ast::operation::Selection::FragmentSpread(spread) => {
                if directive_excludes(&spread.directives, variables, errors) {
                    continue;
                }
                let location = SourceLocation::from_ast_pos(spread.position);
                match fragments.get(&spread.fragment_name) {
                    Some(fragment) => {
                        let ast::operation::TypeCondition::On(condition) = &fragment.type_condition;
                        if type_condition_compatible(condition, parent_type_name, schema) {
                            collect_selections(
                                &fragment.selection_set,
                                parent_type_name,
                                schema,
                                fragments,
                                variables,
                                errors,
                                by_output,
                            );
                        } else {
                            errors.push(CompileError::IncompatibleFragment {
                                condition: condition.clone(),
                                parent: parent_type_name.to_string(),
                                location,
                            });
                        }
                    }
                    None => errors.push(CompileError::UndefinedFragment(spread.fragment_name.clone())),
                }
            }
            ast::operation::Selection::InlineFragment(inline) => {
                if directive_excludes(&inline.directives, variables, errors) {
                    continue;
                }
                let condition = match &inline.type_condition {
                    Some(ast::operation::TypeCondition::On(name)) => name.clone(),
                    None => parent_type_name.to_string(),
                };
                if type_condition_compatible(&condition, parent_type_name, schema) {
                    collect_selections(
                        &inline.selection_set,
                        parent_type_name,
                        schema,
                        fragments,
                        variables,
                        errors,
                        by_output,
                    );
                } else {
                    errors.push(CompileError::IncompatibleFragment {
                        condition,
                        parent: parent_type_name.to_string(),
                        location: SourceLocation::from_ast_pos(inline.position),
                    });
                }
            }
        }
    }
}

/// An inline/spread fragment's type condition is compatible with the
/// parent type if it names the parent type itself, or an interface/union
/// (this engine has no implementor registry to check membership against,
/// so any interface/union condition is accepted).
fn type_condition_compatible(condition: &str, parent_type_name: &str, schema: &Schema) -> bool {
    if condition == parent_type_name {
        return true;
    }
    matches!(
        schema.get_type(condition).map(|ty| ty.kind),
        Some(Kind::Interface) | Some(Kind::Union)
    )
}

fn bind_field(
    field: &ast::operation::Field,
    parent_type_name: &str,
    schema: &Schema,
    fragments: &FragmentRegistry,
    variables: &IndexMap<String, HostValue>,
    errors: &mut Vec<CompileError>,
    by_output: &mut IndexMap<String, (SelectionNode, String)>,
) {
    let location = SourceLocation::from_ast_pos(field.position);
    let output_name = field.alias.clone().unwrap_or_else(|| field.name.clone());

    let Some(schema_field) = schema.get_field(parent_type_name, &field.name) else {
        errors.push(CompileError::UnknownField {
            type_name: parent_type_name.to_string(),
            field: field.name.clone(),
            location,
        });
        return;
    };

    let mut provided: HashSet<&str> = HashSet::new();
    let mut arguments = IndexMap::new();
    for (argument_name, ast_value) in &field.arguments {
        provided.insert(argument_name.as_str());
        let Some(argument_def) = schema_field.arguments.get(argument_name) else {
            errors.push(CompileError::UnknownArgument {
                field: field.name.clone(),
                argument: argument_name.clone(),
                location: location.clone(),
            });
            continue;
        };
        match bind_argument_value(ast_value, variables, argument_def, &field.name, &location, schema) {
            Ok(value) => {
                arguments.insert(argument_name.clone(), value);
            }
            Err(err) => errors.push(err),
        }
    }
    for (name, argument_def) in &schema_field.arguments {
        if provided.contains(name.as_str()) {
            continue;
        }
        if let Some(default) = &argument_def.default_value {
            match default.resolve(variables) {
                Ok(value) => {
                    arguments.insert(name.clone(), value);
                }
                Err(missing) => errors.push(CompileError::MissingVariable {
                    name: missing,
                    location: location.clone(),
                }),
            }
        } else if argument_def.is_required() {
            errors.push(CompileError::MissingVariable {
                name: name.clone(),
                location: location.clone(),
            });
        }
    }

    let sub_type_name = schema_field.return_type.inner_name().to_string();
    let child_selections = if field.selection_set.items.is_empty() {
        Vec::new()
    } else {
        bind_selection_set(
            &field.selection_set,
            &sub_type_name,
            schema,
            fragments,
            variables,
            errors,
        )
    };

    let mut node = SelectionNode::new(field.name.clone());
    node.alias = field.alias.clone();
    node.arguments = arguments;
    node.selection_set = child_selections;

    let signature = format!("{}:{:?}", field.name, field.arguments);

    match by_output.get_mut(&output_name) {
        Some((existing, existing_signature)) => {
            if *existing_signature == signature {
                merge_selection_nodes(existing, node);
            } else {
                errors.push(CompileError::FieldConflict { output_name, location });
            }
        }
        None => {
            by_output.insert(output_name, (node, signature));
        }
    }
}

/// Unions two selection nodes known (by signature) to refer to the same
/// field/arguments, recursively merging their sub-selections by output
/// name.
fn merge_selection_nodes(existing: &mut SelectionNode, incoming: SelectionNode) {
    let mut merged: IndexMap<String, SelectionNode> = existing
        .selection_set
        .drain(..)
        .map(|node| (node.output_name().to_string(), node))
        .collect();
    for node in incoming.selection_set {
        let key = node.output_name().to_string();
        match merged.get_mut(&key) {
            Some(existing_child) => merge_selection_nodes(existing_child, node),
            None => {
                merged.insert(key, node);
            }
        }
    }
    existing.selection_set = merged.into_values().collect();
}

fn bind_argument_value(
    ast_value: &ast::Value,
    variables: &IndexMap<String, HostValue>,
    argument_def: &Argument,
    field_name: &str,
    location: &SourceLocation,
    schema: &Schema,
) -> Result<HostValue, CompileError> {
    let value = Value::from_ast(ast_value)
        .resolve(variables)
        .map_err(|name| CompileError::MissingVariable {
            name,
            location: location.clone(),
        })?;
    check_value_type(&value, &argument_def.input_type, schema).map_err(|reason| CompileError::InvalidArgument {
        field: field_name.to_string(),
        argument: argument_def.name.clone(),
        reason,
        location: location.clone(),
    })?;
    Ok(value)
}

/// A deliberately loose structural check against argument type mismatch
/// after variable substitution: scalars are checked by kind, enums accept
/// any string-shaped value, and input objects accept any
/// record. This engine does not walk input object field definitions.
fn check_value_type(value: &HostValue, type_annotation: &TypeAnnotation, schema: &Schema) -> Result<(), String> {
    match type_annotation {
        TypeAnnotation::NonNull(inner) => {
            if value.is_null() {
                return Err("must not be null".to_string());
            }
            check_value_type(value, inner, schema)
        }
        TypeAnnotation::List(inner) => match value {
            HostValue::Null => Ok(()),
            HostValue::List(items) => items.iter().try_for_each(|item| check_value_type(item, inner, schema)),
            other => Err(format!("expected a list, found {other}")),
        },
        TypeAnnotation::Named(name) => {
            if value.is_null() {
                return Ok(());
            }
            match name.as_str() {
                "Int" => match value {
                    HostValue::Int(_) => Ok(()),
                    other => Err(format!("expected Int, found {other}")),
                },
                "Float" => match value {
                    HostValue::Int(_) | HostValue::Float(_) => Ok(()),
                    other => Err(format!("expected Float, found {other}")),
                },
                "String" => match value {
                    HostValue::String(_) => Ok(()),
                    other => Err(format!("expected String, found {other}")),
                },
                "Boolean" => match value {
                    HostValue::Bool(_) => Ok(()),
                    other => Err(format!("expected Boolean, found {other}")),
                },
                "ID" => match value {
                    HostValue::String(_) | HostValue::Int(_) => Ok(()),
                    other => Err(format!("expected ID, found {other}")),
                },
                _ => match schema.get_type(name).map(|ty| ty.kind) {
                    Some(Kind::Enum) => match value {
                        HostValue::Enum(_) | HostValue::String(_) => Ok(()),
                        other => Err(format!("expected a value of enum '{name}', found {other}")),
                    },
                    Some(Kind::Input) => match value {
                        HostValue::Record(_) => Ok(()),
                        other => Err(format!("expected an input object of type '{name}', found {other}")),
                    },
                    _ => Ok(()),
                },
            }
        }
    }
}

/// `@skip(if: Bool!)`/`@include(if: Bool!)`. An unrecognised
/// directive, or one missing its `if` argument, has no effect.
fn directive_excludes(
    directives: &[ast::operation::Directive],
    variables: &IndexMap<String, HostValue>,
    errors: &mut Vec<CompileError>,
) -> bool {
    for directive in directives {
        let negate = match directive.name.as_str() {
            "skip" => false,
            "include" => true,
            _ => continue,
        };
        let Some((_, ast_value)) = directive.arguments.iter().find(|(name, _)| name == "if") else {
            continue;
        };
        let truthy = match Value::from_ast(ast_value).resolve(variables) {
            Ok(value) => value.truthy(),
            Err(name) => {
                errors.push(CompileError::MissingVariable {
                    name,
                    location: SourceLocation::from_ast_pos(directive.position),
                });
                continue;
            }
        };
        let excluded = if negate { !truthy } else { truthy };
        if excluded {
            return true;
        }
    }
    false
}
