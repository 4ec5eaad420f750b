//! Source locations used for error reporting.
//!
//! Trimmed to the two kinds of source this engine actually parses text
//! from: GraphQL operation documents, and the engine's own built-ins
//! (reflected schema entries have no textual source at all).

use graphql_parser::Pos;

/// Where something was defined, for error messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SourceLocation {
    /// A built-in construct with no source text (e.g. a reflected schema
    /// field, or the synthetic `__schema` field).
    BuiltIn,

    /// Somewhere in the operation document being compiled, at a known
    /// line/column.
    Document { line: usize, column: usize },
}

impl SourceLocation {
    pub(crate) fn from_ast_pos(pos: Pos) -> Self {
        Self::Document {
            line: pos.line,
            column: pos.column,
        }
    }
}

impl std::fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BuiltIn => write!(f, "<builtin>"),
            Self::Document { line, column } => write!(f, "{line}:{column}"),
        }
    }
}
