//! # brane-syntax
//!
//! Lexer, token set, parse tree, and recursive-descent parser for
//! BraneScript source text.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod token;

#[cfg(test)]
mod tests;

pub use parser::{ParseError, ParseErrorKind, Parser};

use ast::Program;

/// Parse a compilation unit. Always returns a tree; syntax errors are
/// accumulated alongside whatever could still be parsed.
pub fn parse(source: &str) -> (Program, Vec<ParseError>) {
    Parser::new(source).parse_program()
}
