//! Document Parser: a thin, named seam over whichever
//! conforming GraphQL parser is wired up (`graphql_parser` here — see
//! [`crate::ast`]), so the rest of the engine depends only on the AST
//! shape in [`crate::ast::operation`], not on a specific parser crate.

use crate::ast;

pub use ast::operation::ParseError;

/// Parses a GraphQL operation document. Fails with the parser's own
/// `{line, col, msg}`-shaped error on malformed syntax.
pub fn parse_document(source: &str) -> Result<ast::operation::Document, ParseError> {
    ast::operation::parse(source)
}
