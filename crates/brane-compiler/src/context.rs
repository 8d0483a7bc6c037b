//! Compiler context: the function under construction and its value pools.

use crate::types::{primitive_of, TypeDef};
use crate::value::{AotValue, CompareType};
use brane_ir::{Constant, IRScript, Opcode, ScriptFunction, ValueIndex, ValueStorage, ValueType};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Mutable state for one compilation: the script being built, the current
/// function, and the per-function register / constant / mark counters.
pub struct CompilerCtx {
    pub script: IRScript,
    function: Option<usize>,
    reg_index: u32,
    mark_index: u32,
    /// Local id -> the register bound when the local was first emitted.
    lvalues: HashMap<u16, AotValue>,
    /// Alias -> index into `script.linked_libraries`. Insertion order is
    /// what the indices embedded in opcodes mean, so the map must keep it.
    pub library_aliases: IndexMap<String, u32>,
    pub return_called: bool,
}

impl CompilerCtx {
    pub fn new() -> Self {
        Self {
            script: IRScript::new(),
            function: None,
            reg_index: 0,
            mark_index: 0,
            lvalues: HashMap::new(),
            library_aliases: IndexMap::new(),
            return_called: false,
        }
    }

    /// Push a fresh function and reset the per-function counters.
    pub fn begin_function(&mut self, function: ScriptFunction) {
        self.script.local_functions.push(function);
        self.function = Some(self.script.local_functions.len() - 1);
        self.reg_index = 0;
        self.mark_index = 0;
        self.lvalues.clear();
    }

    pub fn function(&self) -> &ScriptFunction {
        let idx = self.function.expect("no function under construction");
        &self.script.local_functions[idx]
    }

    pub fn function_mut(&mut self) -> &mut ScriptFunction {
        let idx = self.function.expect("no function under construction");
        &mut self.script.local_functions[idx]
    }

    /// Allocate a fresh virtual register. Void values get no storage.
    pub fn new_reg(&mut self, ty: &TypeDef, flags: u8) -> AotValue {
        let vt = ty.value_type();
        if vt == ValueType::Void {
            return AotValue::null();
        }
        let storage = if vt == ValueType::ObjectRef {
            ValueStorage::Ptr
        } else {
            ValueStorage::Reg
        };
        let index = self.reg_index;
        self.reg_index += 1;
        AotValue {
            def: ty.clone(),
            flags,
            index: ValueIndex::new(storage, vt, index),
            compare: CompareType::None,
        }
    }

    /// Allocate a constant-pool slot in the current function.
    pub fn new_const(&mut self, value: Constant, flags: u8) -> AotValue {
        let vt = value.value_type();
        let slot = self.function_mut().add_constant(value);
        AotValue {
            def: primitive_of(vt),
            flags,
            index: ValueIndex::new(ValueStorage::Const, vt, slot),
            compare: CompareType::None,
        }
    }

    pub fn new_mark(&mut self) -> u32 {
        let mark = self.mark_index;
        self.mark_index += 1;
        mark
    }

    /// The register bound to a local, allocated on first use.
    pub fn local_value(&mut self, id: u16, ty: &TypeDef) -> AotValue {
        if let Some(value) = self.lvalues.get(&id) {
            return value.clone();
        }
        let value = self.new_reg(ty, 0);
        self.lvalues.insert(id, value.clone());
        value
    }

    /// Bind an argument register ahead of emission.
    pub fn bind_local(&mut self, id: u16, value: AotValue) {
        self.lvalues.insert(id, value);
    }

    /// Reify a deferred comparison; any stored value passes through.
    pub fn cast_value(&mut self, value: AotValue) -> AotValue {
        if value.is_compare() {
            return self.cast_reg(value);
        }
        debug_assert!(value.storage() != ValueStorage::Null || value.is_void());
        value
    }

    /// Force a value into the register file. Constants are copied with
    /// `MOV`; comparison flags are materialized with the matching `SET*`.
    pub fn cast_reg(&mut self, value: AotValue) -> AotValue {
        if value.storage().is_register() {
            return value;
        }
        let flags = AotValue::TEMP | (value.flags & AotValue::CONSTEXPR);
        if !value.is_compare() {
            let reg = self.new_reg(&value.def, flags);
            self.function_mut()
                .append_op2(Opcode::Mov, reg.index.value_type, reg.index, value.index);
            return reg;
        }
        let op = match value.compare {
            CompareType::Equal => Opcode::SetE,
            CompareType::NotEqual => Opcode::SetNe,
            CompareType::Above => Opcode::SetA,
            CompareType::Greater => Opcode::SetG,
            CompareType::AboveEqual => Opcode::SetAe,
            CompareType::GreaterEqual => Opcode::SetGe,
            CompareType::None => unreachable!(),
        };
        let reg = self.new_reg(&value.def, flags);
        self.function_mut().append_set(op, reg.index);
        reg
    }

    /// A register the caller may clobber: pass temps through, copy
    /// everything else.
    pub fn cast_temp(&mut self, value: AotValue) -> AotValue {
        if value.is_temp() {
            return value;
        }
        let flags = AotValue::TEMP | (value.flags & AotValue::CONSTEXPR);
        let temp = self.new_reg(&value.def, flags);
        self.function_mut()
            .append_op2(Opcode::Mov, temp.index.value_type, temp.index, value.index);
        temp
    }
}

impl Default for CompilerCtx {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::native_type;

    fn ctx_with_function() -> CompilerCtx {
        let mut ctx = CompilerCtx::new();
        ctx.begin_function(ScriptFunction::new("test()"));
        ctx
    }

    #[test]
    fn registers_are_fresh_and_typed() {
        let mut ctx = ctx_with_function();
        let int = native_type("int").unwrap();
        let a = ctx.new_reg(&int, 0);
        let b = ctx.new_reg(&int, AotValue::TEMP);
        assert_eq!(a.index.index, 0);
        assert_eq!(b.index.index, 1);
        assert_eq!(a.index.storage, ValueStorage::Reg);
        assert_eq!(a.index.value_type, ValueType::Int32);
        assert!(!a.is_temp());
        assert!(b.is_temp());
    }

    #[test]
    fn void_register_has_no_storage() {
        let mut ctx = ctx_with_function();
        let v = ctx.new_reg(&TypeDef::VOID, 0);
        assert_eq!(v.index.storage, ValueStorage::Null);
        assert!(v.is_void());
    }

    #[test]
    fn counters_reset_per_function() {
        let mut ctx = ctx_with_function();
        let int = native_type("int").unwrap();
        ctx.new_reg(&int, 0);
        ctx.new_mark();
        ctx.begin_function(ScriptFunction::new("next()"));
        let r = ctx.new_reg(&int, 0);
        assert_eq!(r.index.index, 0);
        assert_eq!(ctx.new_mark(), 0);
    }

    #[test]
    fn cast_temp_is_idempotent_for_temps() {
        let mut ctx = ctx_with_function();
        let int = native_type("int").unwrap();
        let t = ctx.new_reg(&int, AotValue::TEMP);
        let before = ctx.function().code.len();
        let same = ctx.cast_temp(t.clone());
        assert_eq!(same.index, t.index);
        assert_eq!(ctx.function().code.len(), before);
    }

    #[test]
    fn cast_reg_copies_constants() {
        let mut ctx = ctx_with_function();
        let c = ctx.new_const(Constant::I32(9), 0);
        assert_eq!(c.index.storage, ValueStorage::Const);
        let r = ctx.cast_reg(c);
        assert_eq!(r.index.storage, ValueStorage::Reg);
        assert!(r.is_temp());
        assert!(!ctx.function().code.is_empty());
    }
}
