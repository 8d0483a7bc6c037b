//! # brane-common
//!
//! Shared infrastructure for the BraneScript compiler:
//! - Byte-offset spans for source locations
//! - A source-file registry with line/column resolution
//! - Diagnostic reporting rendered through codespan-reporting

pub mod diagnostic;
pub mod source;
pub mod span;

pub use diagnostic::{emit, Diagnostic, Severity};
pub use source::{FileId, SourceMap};
pub use span::Span;
