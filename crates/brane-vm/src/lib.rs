//! # brane-vm
//!
//! Register-machine interpreter for compiled BraneScript. Loads an
//! [`brane_ir::IRScript`], decodes and validates each function's
//! instruction stream, and executes it against a pool of virtual
//! registers, with native extern functions dispatched by library and
//! mangled name.

pub mod error;
pub mod externs;
pub mod loader;
pub mod value;
pub mod vm;

pub use error::VmError;
pub use externs::ExternRegistry;
pub use loader::{decode_function, Instr, LoadedFunction};
pub use value::Value;
pub use vm::Runtime;
