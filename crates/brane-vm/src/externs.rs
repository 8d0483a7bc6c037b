//! Native extern-function registry for `EXT_CALL` dispatch.

use crate::value::Value;
use std::collections::HashMap;

pub type ExternFn = Box<dyn Fn(&[Value]) -> Value>;

/// Functions callable from scripts, keyed by library name and mangled
/// signature.
#[derive(Default)]
pub struct ExternRegistry {
    funcs: HashMap<(String, String), ExternFn>,
}

impl ExternRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        library: impl Into<String>,
        mangled: impl Into<String>,
        f: impl Fn(&[Value]) -> Value + 'static,
    ) {
        self.funcs
            .insert((library.into(), mangled.into()), Box::new(f));
    }

    pub fn get(&self, library: &str, mangled: &str) -> Option<&ExternFn> {
        self.funcs
            .get(&(library.to_string(), mangled.to_string()))
    }
}
