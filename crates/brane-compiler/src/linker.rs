//! Linking contract.
//!
//! The compiler resolves types it does not know locally, and external
//! call targets, through these traits. The registry behind them lives
//! with the runtime embedding the compiler.

use crate::types::TypeDef;

/// A linked library: a named set of callable functions.
pub trait Library {
    /// The return type name of a function, looked up by mangled
    /// signature. `None` means the library has no such function.
    fn function_return_type(&self, mangled: &str) -> Option<String>;
}

/// Resolves names that are external to the compilation unit.
pub trait Linker {
    fn get_type(&self, name: &str) -> Option<TypeDef>;

    fn get_library(&self, name: &str) -> Option<&dyn Library>;
}
