//! The interpreter.
//!
//! One frame per call: a register file of raw `u64` slots plus the flag
//! state left by the last `CMP`. Arguments occupy registers `0..n-1`;
//! `RETV` hands its value to the caller, which writes it into the ret
//! slot named by the `CALL`.

use crate::error::VmError;
use crate::externs::ExternRegistry;
use crate::loader::{decode_function, Instr, LoadedFunction};
use crate::value::{value_type_of_name, Value};
use brane_ir::{IRScript, IRStructDef, Opcode, ValueIndex, ValueStorage, ValueType};
use std::cmp::Ordering;
use std::rc::Rc;

/// Flag state recorded by `CMP`. `signed` is `None` when a float compare
/// involved a NaN.
struct Flags {
    signed: Option<Ordering>,
    unsigned: Ordering,
}

struct Frame {
    regs: Vec<u64>,
    flags: Option<Flags>,
}

#[derive(Default)]
struct Heap {
    objects: Vec<Option<Vec<u8>>>,
}

impl Heap {
    /// Handles are slot index + 1 so that 0 is never a live object.
    fn alloc(&mut self, size: u32) -> u64 {
        let bytes = vec![0u8; size as usize];
        if let Some(idx) = self.objects.iter().position(|o| o.is_none()) {
            self.objects[idx] = Some(bytes);
            (idx + 1) as u64
        } else {
            self.objects.push(Some(bytes));
            self.objects.len() as u64
        }
    }

    fn get(&self, handle: u64) -> Result<&Vec<u8>, VmError> {
        self.objects
            .get(handle.wrapping_sub(1) as usize)
            .and_then(|o| o.as_ref())
            .ok_or(VmError::InvalidHandle(handle))
    }

    fn get_mut(&mut self, handle: u64) -> Result<&mut Vec<u8>, VmError> {
        self.objects
            .get_mut(handle.wrapping_sub(1) as usize)
            .and_then(|o| o.as_mut())
            .ok_or(VmError::InvalidHandle(handle))
    }

    fn free(&mut self, handle: u64) -> Result<(), VmError> {
        let slot = self
            .objects
            .get_mut(handle.wrapping_sub(1) as usize)
            .ok_or(VmError::InvalidHandle(handle))?;
        if slot.take().is_none() {
            return Err(VmError::InvalidHandle(handle));
        }
        Ok(())
    }

    fn live_objects(&self) -> usize {
        self.objects.iter().filter(|o| o.is_some()).count()
    }
}

pub struct Runtime {
    functions: Vec<Rc<LoadedFunction>>,
    structs: Vec<IRStructDef>,
    libraries: Vec<String>,
    externs: ExternRegistry,
    heap: Heap,
}

impl Runtime {
    /// Decode and validate every function of a script.
    pub fn load(script: &IRScript) -> Result<Self, VmError> {
        let mut functions = Vec::with_capacity(script.local_functions.len());
        for func in &script.local_functions {
            functions.push(Rc::new(decode_function(func)?));
        }
        Ok(Self {
            functions,
            structs: script.local_structs.clone(),
            libraries: script.linked_libraries.clone(),
            externs: ExternRegistry::new(),
            heap: Heap::default(),
        })
    }

    pub fn register_extern(
        &mut self,
        library: impl Into<String>,
        mangled: impl Into<String>,
        f: impl Fn(&[Value]) -> Value + 'static,
    ) {
        self.externs.register(library, mangled, f);
    }

    pub fn find_function(&self, mangled: &str) -> Option<usize> {
        self.functions.iter().position(|f| f.name == mangled)
    }

    pub fn functions(&self) -> impl Iterator<Item = &LoadedFunction> {
        self.functions.iter().map(|f| f.as_ref())
    }

    pub fn structs(&self) -> &[IRStructDef] {
        &self.structs
    }

    /// Objects currently allocated; useful for leak assertions.
    pub fn live_objects(&self) -> usize {
        self.heap.live_objects()
    }

    /// Invoke a function by mangled name with typed arguments.
    pub fn call(&mut self, mangled: &str, args: &[Value]) -> Result<Value, VmError> {
        let idx = self
            .find_function(mangled)
            .ok_or_else(|| VmError::UnknownFunction(mangled.to_string()))?;
        let func = self.functions[idx].clone();
        if args.len() != func.arguments.len() {
            return Err(VmError::ArityMismatch {
                expected: func.arguments.len(),
                found: args.len(),
            });
        }
        let raw_args: Vec<u64> = args
            .iter()
            .zip(&func.arguments)
            .map(|(v, ty)| v.convert(value_type_of_name(ty)).to_raw())
            .collect();
        let result = self.exec(idx, raw_args)?;
        let ret_vt = value_type_of_name(&func.return_type);
        Ok(match result {
            Some(v) => v.convert(ret_vt),
            None => Value::Void,
        })
    }

    fn exec(&mut self, func_idx: usize, args: Vec<u64>) -> Result<Option<Value>, VmError> {
        let func = self
            .functions
            .get(func_idx)
            .ok_or(VmError::BadFunctionIndex(func_idx as u32))?
            .clone();
        let mut frame = Frame {
            regs: vec![0; func.register_count.max(args.len())],
            flags: None,
        };
        frame.regs[..args.len()].copy_from_slice(&args);

        let mut pc = 0usize;
        while pc < func.code.len() {
            match &func.code[pc] {
                Instr::Op2 {
                    op: Opcode::Mov,
                    vt,
                    a,
                    b,
                } => {
                    let v = read(&func, &frame, b).convert(*vt);
                    write(&mut frame, a, v);
                }
                Instr::Op2 {
                    op: Opcode::Cmp,
                    vt,
                    a,
                    b,
                } => {
                    let lhs = read(&func, &frame, a).convert(*vt);
                    let rhs = read(&func, &frame, b).convert(*vt);
                    frame.flags = Some(compare(lhs, rhs, *vt));
                }
                Instr::Op2 { op, vt, a, b } => {
                    let lhs = read(&func, &frame, a).convert(*vt);
                    let rhs = read(&func, &frame, b).convert(*vt);
                    let result = arith(*op, *vt, lhs, rhs)?;
                    write(&mut frame, a, result);
                }
                Instr::Set { op, dst } => {
                    let v = Value::Bool(test(*op, &frame.flags));
                    write(&mut frame, dst, v);
                }
                Instr::Jump { op, target } => {
                    if *op == Opcode::Jmp || test(*op, &frame.flags) {
                        pc = *target;
                        continue;
                    }
                }
                Instr::Mark => {}
                Instr::Call {
                    function,
                    ret,
                    args: arg_ops,
                } => {
                    let callee = self
                        .functions
                        .get(*function as usize)
                        .ok_or(VmError::BadFunctionIndex(*function))?
                        .clone();
                    if arg_ops.len() != callee.arguments.len() {
                        return Err(VmError::ArityMismatch {
                            expected: callee.arguments.len(),
                            found: arg_ops.len(),
                        });
                    }
                    let raw_args: Vec<u64> = arg_ops
                        .iter()
                        .zip(&callee.arguments)
                        .map(|(op, ty)| {
                            read(&func, &frame, op)
                                .convert(value_type_of_name(ty))
                                .to_raw()
                        })
                        .collect();
                    if let Some(v) = self.exec(*function as usize, raw_args)? {
                        write(&mut frame, ret, v.convert(ret.value_type));
                    }
                }
                Instr::ExtCall {
                    library,
                    name,
                    ret,
                    args: arg_ops,
                } => {
                    let lib = self
                        .libraries
                        .get(*library as usize)
                        .ok_or(VmError::BadLibraryIndex(*library))?
                        .clone();
                    let call_args: Vec<Value> =
                        arg_ops.iter().map(|op| read(&func, &frame, op)).collect();
                    let result = {
                        let f = self.externs.get(&lib, name).ok_or_else(|| {
                            VmError::UnknownExtern {
                                library: lib.clone(),
                                name: name.clone(),
                            }
                        })?;
                        f(&call_args)
                    };
                    write(&mut frame, ret, result.convert(ret.value_type));
                }
                Instr::Malloc { dst, size } => {
                    let handle = self.heap.alloc(*size);
                    write(&mut frame, dst, Value::Object(handle));
                }
                Instr::Free { ptr } => {
                    let handle = read(&func, &frame, ptr).to_raw();
                    self.heap.free(handle)?;
                }
                Instr::Ret => return Ok(None),
                Instr::RetV { vt, src } => {
                    return Ok(Some(read(&func, &frame, src).convert(*vt)));
                }
                Instr::Load {
                    vt,
                    dst,
                    base,
                    offset,
                } => {
                    let handle = read(&func, &frame, base).to_raw();
                    let bytes = self.heap.get(handle)?;
                    let v = read_field(bytes, *offset, *vt)?;
                    write(&mut frame, dst, v);
                }
                Instr::Store {
                    vt,
                    base,
                    offset,
                    src,
                } => {
                    let v = read(&func, &frame, src).convert(*vt);
                    let handle = read(&func, &frame, base).to_raw();
                    let bytes = self.heap.get_mut(handle)?;
                    write_field(bytes, *offset, v)?;
                }
            }
            pc += 1;
        }
        Ok(None)
    }
}

fn read(func: &LoadedFunction, frame: &Frame, op: &ValueIndex) -> Value {
    match op.storage {
        ValueStorage::Const => Value::from_constant(&func.constants[op.index as usize]),
        ValueStorage::Null => Value::Void,
        _ => Value::from_raw(frame.regs[op.index as usize], op.value_type),
    }
}

fn write(frame: &mut Frame, op: &ValueIndex, v: Value) {
    if op.storage == ValueStorage::Null {
        return;
    }
    frame.regs[op.index as usize] = v.to_raw();
}

fn arith(op: Opcode, vt: ValueType, lhs: Value, rhs: Value) -> Result<Value, VmError> {
    match vt {
        ValueType::Float32 => {
            let (Value::F32(a), Value::F32(b)) = (lhs, rhs) else {
                return Ok(Value::F32(0.0));
            };
            Ok(Value::F32(match op {
                Opcode::Add => a + b,
                Opcode::Sub => a - b,
                Opcode::Mul => a * b,
                Opcode::Div => a / b,
                _ => a,
            }))
        }
        ValueType::Float64 => {
            let (Value::F64(a), Value::F64(b)) = (lhs, rhs) else {
                return Ok(Value::F64(0.0));
            };
            Ok(Value::F64(match op {
                Opcode::Add => a + b,
                Opcode::Sub => a - b,
                Opcode::Mul => a * b,
                Opcode::Div => a / b,
                _ => a,
            }))
        }
        _ => {
            // Integer arithmetic in i64; the final conversion truncates to
            // the instruction's width, matching two's-complement wrap.
            let a = lhs.convert(ValueType::Int64).to_raw() as i64;
            let b = rhs.convert(ValueType::Int64).to_raw() as i64;
            let r = match op {
                Opcode::Add => a.wrapping_add(b),
                Opcode::Sub => a.wrapping_sub(b),
                Opcode::Mul => a.wrapping_mul(b),
                Opcode::Div => {
                    if b == 0 {
                        return Err(VmError::DivideByZero);
                    }
                    a.wrapping_div(b)
                }
                _ => a,
            };
            Ok(Value::I64(r).convert(vt))
        }
    }
}

fn compare(lhs: Value, rhs: Value, vt: ValueType) -> Flags {
    let signed = match vt {
        ValueType::Float32 => {
            let (a, b) = (lhs.convert(ValueType::Float64), rhs.convert(ValueType::Float64));
            match (a, b) {
                (Value::F64(a), Value::F64(b)) => a.partial_cmp(&b),
                _ => None,
            }
        }
        ValueType::Float64 => match (lhs, rhs) {
            (Value::F64(a), Value::F64(b)) => a.partial_cmp(&b),
            _ => None,
        },
        _ => {
            let a = lhs.convert(ValueType::Int64).to_raw() as i64;
            let b = rhs.convert(ValueType::Int64).to_raw() as i64;
            Some(a.cmp(&b))
        }
    };
    let unsigned = lhs.to_raw().cmp(&rhs.to_raw());
    Flags { signed, unsigned }
}

fn test(op: Opcode, flags: &Option<Flags>) -> bool {
    let Some(flags) = flags else {
        return false;
    };
    match op {
        Opcode::Je | Opcode::SetE => flags.signed == Some(Ordering::Equal),
        Opcode::Jne | Opcode::SetNe => flags.signed != Some(Ordering::Equal),
        Opcode::Jg | Opcode::SetG => flags.signed == Some(Ordering::Greater),
        Opcode::Jge | Opcode::SetGe => {
            matches!(flags.signed, Some(Ordering::Greater | Ordering::Equal))
        }
        Opcode::Ja | Opcode::SetA => flags.unsigned == Ordering::Greater,
        Opcode::Jae | Opcode::SetAe => flags.unsigned != Ordering::Less,
        _ => false,
    }
}

fn read_field(bytes: &[u8], offset: u32, vt: ValueType) -> Result<Value, VmError> {
    let off = offset as usize;
    let size = field_size(vt);
    if off + size > bytes.len() {
        return Err(VmError::OutOfBoundsAccess {
            offset,
            size: bytes.len() as u32,
        });
    }
    let b = &bytes[off..off + size];
    Ok(match vt {
        ValueType::Bool => Value::Bool(b[0] != 0),
        ValueType::Char => Value::Char(b[0]),
        ValueType::Int32 => Value::I32(i32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        ValueType::Float32 => Value::F32(f32::from_le_bytes([b[0], b[1], b[2], b[3]])),
        ValueType::Int64 => Value::I64(i64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ])),
        ValueType::Float64 => Value::F64(f64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ])),
        ValueType::Struct | ValueType::ObjectRef => Value::Object(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ])),
        ValueType::Void => Value::Void,
    })
}

fn write_field(bytes: &mut [u8], offset: u32, v: Value) -> Result<(), VmError> {
    let off = offset as usize;
    let size = field_size(v.value_type());
    if off + size > bytes.len() {
        return Err(VmError::OutOfBoundsAccess {
            offset,
            size: bytes.len() as u32,
        });
    }
    match v {
        Value::Void => {}
        Value::Bool(b) => bytes[off] = b as u8,
        Value::Char(c) => bytes[off] = c,
        Value::I32(i) => bytes[off..off + 4].copy_from_slice(&i.to_le_bytes()),
        Value::F32(f) => bytes[off..off + 4].copy_from_slice(&f.to_le_bytes()),
        Value::I64(i) => bytes[off..off + 8].copy_from_slice(&i.to_le_bytes()),
        Value::F64(f) => bytes[off..off + 8].copy_from_slice(&f.to_le_bytes()),
        Value::Object(h) => bytes[off..off + 8].copy_from_slice(&h.to_le_bytes()),
    }
    Ok(())
}

fn field_size(vt: ValueType) -> usize {
    match vt {
        ValueType::Void => 0,
        ValueType::Bool | ValueType::Char => 1,
        ValueType::Int32 | ValueType::Float32 => 4,
        ValueType::Int64 | ValueType::Float64 | ValueType::Struct | ValueType::ObjectRef => 8,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brane_ir::{Constant, ScriptFunction};

    fn reg(vt: ValueType, index: u32) -> ValueIndex {
        ValueIndex::new(ValueStorage::Reg, vt, index)
    }

    fn cst(vt: ValueType, index: u32) -> ValueIndex {
        ValueIndex::new(ValueStorage::Const, vt, index)
    }

    #[test]
    fn add_two_arguments() {
        let mut func = ScriptFunction::new("add(int,int)");
        func.return_type = "int".into();
        func.arguments = vec!["int".into(), "int".into()];
        func.append_op2(
            Opcode::Add,
            ValueType::Int32,
            reg(ValueType::Int32, 0),
            reg(ValueType::Int32, 1),
        );
        func.append_retv(ValueType::Int32, reg(ValueType::Int32, 0));

        let script = IRScript {
            local_functions: vec![func],
            ..Default::default()
        };
        let mut rt = Runtime::load(&script).unwrap();
        let result = rt
            .call("add(int,int)", &[Value::I32(30), Value::I32(12)])
            .unwrap();
        assert_eq!(result, Value::I32(42));
    }

    #[test]
    fn mov_converts_between_value_types() {
        let mut func = ScriptFunction::new("toFloat(int)");
        func.return_type = "float".into();
        func.arguments = vec!["int".into()];
        func.append_op2(
            Opcode::Mov,
            ValueType::Float32,
            reg(ValueType::Float32, 1),
            reg(ValueType::Int32, 0),
        );
        func.append_retv(ValueType::Float32, reg(ValueType::Float32, 1));

        let script = IRScript {
            local_functions: vec![func],
            ..Default::default()
        };
        let mut rt = Runtime::load(&script).unwrap();
        assert_eq!(
            rt.call("toFloat(int)", &[Value::I32(3)]).unwrap(),
            Value::F32(3.0)
        );
    }

    #[test]
    fn compare_and_branch() {
        // max(a, b): CMP a,b; JG take_a; RETV b; take_a: RETV a
        let mut func = ScriptFunction::new("max(int,int)");
        func.return_type = "int".into();
        func.arguments = vec!["int".into(), "int".into()];
        func.append_op2(
            Opcode::Cmp,
            ValueType::Int32,
            reg(ValueType::Int32, 0),
            reg(ValueType::Int32, 1),
        );
        func.append_jump(Opcode::Jg, 0);
        func.append_retv(ValueType::Int32, reg(ValueType::Int32, 1));
        func.append_mark(0);
        func.append_retv(ValueType::Int32, reg(ValueType::Int32, 0));

        let script = IRScript {
            local_functions: vec![func],
            ..Default::default()
        };
        let mut rt = Runtime::load(&script).unwrap();
        assert_eq!(
            rt.call("max(int,int)", &[Value::I32(7), Value::I32(3)])
                .unwrap(),
            Value::I32(7)
        );
        assert_eq!(
            rt.call("max(int,int)", &[Value::I32(-7), Value::I32(3)])
                .unwrap(),
            Value::I32(3)
        );
    }

    #[test]
    fn setg_materializes_flag() {
        let mut func = ScriptFunction::new("gt(int,int)");
        func.return_type = "bool".into();
        func.arguments = vec!["int".into(), "int".into()];
        func.append_op2(
            Opcode::Cmp,
            ValueType::Int32,
            reg(ValueType::Int32, 0),
            reg(ValueType::Int32, 1),
        );
        func.append_set(Opcode::SetG, reg(ValueType::Bool, 2));
        func.append_retv(ValueType::Bool, reg(ValueType::Bool, 2));

        let script = IRScript {
            local_functions: vec![func],
            ..Default::default()
        };
        let mut rt = Runtime::load(&script).unwrap();
        assert_eq!(
            rt.call("gt(int,int)", &[Value::I32(5), Value::I32(2)])
                .unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            rt.call("gt(int,int)", &[Value::I32(2), Value::I32(2)])
                .unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn malloc_store_load_free() {
        let mut func = ScriptFunction::new("roundTrip(int)");
        func.return_type = "int".into();
        func.arguments = vec!["int".into()];
        let obj = reg(ValueType::ObjectRef, 1);
        func.append_malloc(obj, 8);
        func.append_store(ValueType::Int32, obj, 4, reg(ValueType::Int32, 0));
        func.append_load(ValueType::Int32, reg(ValueType::Int32, 2), obj, 4);
        func.append_free(obj);
        func.append_retv(ValueType::Int32, reg(ValueType::Int32, 2));

        let script = IRScript {
            local_functions: vec![func],
            ..Default::default()
        };
        let mut rt = Runtime::load(&script).unwrap();
        assert_eq!(
            rt.call("roundTrip(int)", &[Value::I32(99)]).unwrap(),
            Value::I32(99)
        );
        assert_eq!(rt.live_objects(), 0);
    }

    #[test]
    fn double_free_is_an_error() {
        let mut func = ScriptFunction::new("bad()");
        func.return_type = "void".into();
        let obj = reg(ValueType::ObjectRef, 0);
        func.append_malloc(obj, 4);
        func.append_free(obj);
        func.append_free(obj);
        func.append_ret();

        let script = IRScript {
            local_functions: vec![func],
            ..Default::default()
        };
        let mut rt = Runtime::load(&script).unwrap();
        assert!(matches!(
            rt.call("bad()", &[]),
            Err(VmError::InvalidHandle(_))
        ));
    }

    #[test]
    fn division_by_zero_reported() {
        let mut func = ScriptFunction::new("div(int,int)");
        func.return_type = "int".into();
        func.arguments = vec!["int".into(), "int".into()];
        func.append_op2(
            Opcode::Div,
            ValueType::Int32,
            reg(ValueType::Int32, 0),
            reg(ValueType::Int32, 1),
        );
        func.append_retv(ValueType::Int32, reg(ValueType::Int32, 0));

        let script = IRScript {
            local_functions: vec![func],
            ..Default::default()
        };
        let mut rt = Runtime::load(&script).unwrap();
        assert_eq!(
            rt.call("div(int,int)", &[Value::I32(1), Value::I32(0)]),
            Err(VmError::DivideByZero)
        );
    }

    #[test]
    fn constants_come_from_the_pool() {
        let mut func = ScriptFunction::new("seven()");
        func.return_type = "int".into();
        let slot = func.add_constant(Constant::I32(7));
        func.append_retv(ValueType::Int32, cst(ValueType::Int32, slot));

        let script = IRScript {
            local_functions: vec![func],
            ..Default::default()
        };
        let mut rt = Runtime::load(&script).unwrap();
        assert_eq!(rt.call("seven()", &[]).unwrap(), Value::I32(7));
    }
}
