//! Top-level error taxonomy and the wire shapes returned to a client.
//!
//! Every fallible stage of the pipeline (parse, compile, execute) has its
//! own error enum; this module collects the ones that can fail the whole
//! request behind one [`EngineError`], returned by
//! [`crate::try_execute_request`] for callers who want to branch on which
//! stage failed instead of reading an errors-only [`Response`]. It also
//! defines the [`GraphQLError`]/[`Response`] wire shapes used to report
//! results the way a GraphQL HTTP endpoint is expected to.

use crate::compile::CompileError;
use crate::loc::SourceLocation;

/// Failures that abort a request before or instead of producing a partial
/// [`Response`]. Per-field execution failures are never collected here:
/// they're isolated into `Response.errors` alongside whatever data did
/// resolve, the normal shape for a partially-failed query.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to parse operation document")]
    Parse(#[from] crate::ast::operation::ParseError),

    #[error("{0} error(s) compiling operation")]
    Compile(Vec<CompileError>),

    #[error("operation was cancelled")]
    Cancelled,
}

impl From<Vec<CompileError>> for EngineError {
    fn from(errors: Vec<CompileError>) -> Self {
        Self::Compile(errors)
    }
}

/// A single entry in a GraphQL response's `errors` array.
#[derive(Clone, Debug, serde::Serialize)]
pub struct GraphQLError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<PathSegment>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locations: Option<Vec<ErrorLocation>>,
}

#[derive(Clone, Debug, serde::Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct ErrorLocation {
    pub line: usize,
    pub column: usize,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            locations: None,
        }
    }

    pub fn with_path(mut self, path: Vec<PathSegment>) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_location(mut self, loc: &SourceLocation) -> Self {
        if let SourceLocation::Document { line, column } = loc {
            self.locations = Some(vec![ErrorLocation {
                line: *line,
                column: *column,
            }]);
        }
        self
    }
}

/// The top-level shape of a GraphQL response: `data` is present whenever
/// execution started (even if individual fields failed), and absent only
/// when the request never reached execution (parse/compile failure).
#[derive(Debug, serde::Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<GraphQLError>,
}

impl Response {
    pub fn data_only(data: serde_json::Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn errors_only(errors: Vec<GraphQLError>) -> Self {
        Self {
            data: None,
            errors,
        }
    }

    pub fn with_field_errors(data: serde_json::Value, errors: Vec<GraphQLError>) -> Self {
        Self {
            data: Some(data),
            errors,
        }
    }
}

impl From<crate::ast::operation::ParseError> for GraphQLError {
    fn from(err: crate::ast::operation::ParseError) -> Self {
        Self::new(format!("parse error: {err}"))
    }
}

impl From<&CompileError> for GraphQLError {
    fn from(err: &CompileError) -> Self {
        Self::new(err.to_string()).with_location(err.location())
    }
}
