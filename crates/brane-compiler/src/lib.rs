//! # brane-compiler
//!
//! The BraneScript middle-end and backend: parse trees are lowered into a
//! typed expression-node graph, constant-folded, and emitted as linear
//! bytecode for a register machine, producing an [`brane_ir::IRScript`].

pub mod compiler;
pub mod context;
pub mod error;
pub mod linker;
pub mod node;
pub mod types;
pub mod value;

pub use compiler::{compile_source, Compiler};
pub use context::CompilerCtx;
pub use error::{CompileError, ErrorKind};
pub use linker::{Library, Linker};
pub use types::{native_type, StructDef, TypeDef};
pub use value::{AotValue, CompareType};
