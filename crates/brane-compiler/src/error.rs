//! Compile errors.
//!
//! Errors accumulate during a compile; the statement that produced one
//! yields no node and is skipped, so several diagnostics can be reported
//! per run.

use brane_common::{Diagnostic, FileId, SourceMap, Span};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub kind: ErrorKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    /// The lexer could not form a token.
    UnknownToken(String),
    /// The parser rejected a construction.
    SyntaxError(String),
    UndefinedIdentifier(String),
    NameInUse(String),
    UndefinedType(String),
    TypeMismatch { expected: String, found: String },
    /// `ref` applied to a non-object type.
    InvalidRefQualifier(String),
    /// Assignment to a const-qualified value.
    AssignToConst(String),
    /// Non-void function falls through without returning.
    MissingReturn(String),
    UnknownLibrary(String),
    UnknownFunction(String),
    VoidArgument,
    NonObjectDelete(String),
    NonObjectNew(String),
    /// `link` seen without a configured linker.
    LinkerUnset,
    /// Parsed but deliberately unimplemented construct.
    UnsupportedConstruct(String),
}

impl CompileError {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn undefined(name: &str, span: Span) -> Self {
        Self::new(ErrorKind::UndefinedIdentifier(name.to_string()), span)
    }

    pub fn name_in_use(name: &str, span: Span) -> Self {
        Self::new(ErrorKind::NameInUse(name.to_string()), span)
    }

    pub fn undefined_type(name: &str, span: Span) -> Self {
        Self::new(ErrorKind::UndefinedType(name.to_string()), span)
    }

    pub fn type_mismatch(expected: &str, found: &str, span: Span) -> Self {
        Self::new(
            ErrorKind::TypeMismatch {
                expected: expected.to_string(),
                found: found.to_string(),
            },
            span,
        )
    }

    /// Render as `Compile Error at [line:col] message`.
    pub fn render(&self, sources: &SourceMap, file: FileId) -> String {
        let (line, col) = sources.location(file, self.span.start).unwrap_or((0, 0));
        format!("Compile Error at [{}:{}] {}", line, col, self)
    }

    pub fn to_diagnostic(&self, file: FileId) -> Diagnostic {
        Diagnostic::error(self.to_string()).with_label(file, self.span, "here")
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::UnknownToken(text) => write!(f, "unknown token {}", text),
            ErrorKind::SyntaxError(msg) => write!(f, "{}", msg),
            ErrorKind::UndefinedIdentifier(name) => write!(f, "undefined identifier `{}`", name),
            ErrorKind::NameInUse(name) => write!(f, "identifier `{}` is already in use", name),
            ErrorKind::UndefinedType(name) => write!(f, "undefined type `{}`", name),
            ErrorKind::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            ErrorKind::InvalidRefQualifier(name) => {
                write!(f, "only object types can be marked as references, `{}` is not one", name)
            }
            ErrorKind::AssignToConst(name) => {
                write!(f, "cannot assign to const value `{}`", name)
            }
            ErrorKind::MissingReturn(name) => {
                write!(f, "function `{}` is missing a call to return", name)
            }
            ErrorKind::UnknownLibrary(name) => write!(f, "library `{}` not found", name),
            ErrorKind::UnknownFunction(signature) => {
                write!(f, "could not find function with signature `{}`", signature)
            }
            ErrorKind::VoidArgument => write!(f, "cannot pass a void value as an argument"),
            ErrorKind::NonObjectDelete(name) => {
                write!(f, "can only delete objects, `{}` is not one", name)
            }
            ErrorKind::NonObjectNew(name) => {
                write!(f, "`{}` is not an object type", name)
            }
            ErrorKind::LinkerUnset => {
                write!(f, "a linker must be set to link libraries")
            }
            ErrorKind::UnsupportedConstruct(what) => {
                write!(f, "{} are not supported", what)
            }
        }
    }
}

impl std::error::Error for CompileError {}
