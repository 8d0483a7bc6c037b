//! Bytecode decoding and validation.
//!
//! Each function's byte stream is decoded once at load time: marks are
//! resolved to instruction offsets, the register-file size is computed,
//! and operands are validated so execution never sees a malformed
//! instruction.

use crate::error::VmError;
use brane_ir::{
    ByteReader, Constant, DecodeError, Opcode, ScriptFunction, ValueIndex, ValueStorage, ValueType,
};
use std::collections::HashMap;

/// A decoded instruction. Jump targets are instruction indices.
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    /// `MOV`/`ADD`/`SUB`/`MUL`/`DIV`/`CMP`: `a <- a op b`.
    Op2 {
        op: Opcode,
        vt: ValueType,
        a: ValueIndex,
        b: ValueIndex,
    },
    /// `SET*`: materialize the last comparison into `dst`.
    Set { op: Opcode, dst: ValueIndex },
    /// `JMP`/`J*`.
    Jump { op: Opcode, target: usize },
    /// Branch target; a no-op at execution time.
    Mark,
    Call {
        function: u32,
        ret: ValueIndex,
        args: Vec<ValueIndex>,
    },
    ExtCall {
        library: u32,
        name: String,
        ret: ValueIndex,
        args: Vec<ValueIndex>,
    },
    Malloc { dst: ValueIndex, size: u32 },
    Free { ptr: ValueIndex },
    Ret,
    RetV { vt: ValueType, src: ValueIndex },
    Load {
        vt: ValueType,
        dst: ValueIndex,
        base: ValueIndex,
        offset: u32,
    },
    Store {
        vt: ValueType,
        base: ValueIndex,
        offset: u32,
        src: ValueIndex,
    },
}

/// A function ready to execute.
#[derive(Debug, Clone)]
pub struct LoadedFunction {
    pub name: String,
    pub return_type: String,
    pub arguments: Vec<String>,
    pub constants: Vec<Constant>,
    pub code: Vec<Instr>,
    pub register_count: usize,
}

pub fn decode_function(func: &ScriptFunction) -> Result<LoadedFunction, VmError> {
    let mut reader = ByteReader::new(&func.code);
    let mut code = Vec::new();
    let mut marks: HashMap<u32, usize> = HashMap::new();
    // Jump targets hold mark ids until the whole stream is decoded.
    let mut jumps: Vec<(usize, u32)> = Vec::new();

    while !reader.is_at_end() {
        let op_byte = reader.read_u8()?;
        let op = Opcode::from_u8(op_byte).ok_or(DecodeError::BadOpcode(op_byte))?;
        let vt_byte = reader.read_u8()?;
        let vt = ValueType::from_u8(vt_byte).ok_or(DecodeError::BadValueType(vt_byte))?;

        let instr = match op {
            Opcode::Mov
            | Opcode::Add
            | Opcode::Sub
            | Opcode::Mul
            | Opcode::Div
            | Opcode::Cmp => Instr::Op2 {
                op,
                vt,
                a: ValueIndex::decode(&mut reader)?,
                b: ValueIndex::decode(&mut reader)?,
            },
            Opcode::SetE
            | Opcode::SetNe
            | Opcode::SetA
            | Opcode::SetG
            | Opcode::SetAe
            | Opcode::SetGe => Instr::Set {
                op,
                dst: ValueIndex::decode(&mut reader)?,
            },
            Opcode::Jmp
            | Opcode::Je
            | Opcode::Jne
            | Opcode::Ja
            | Opcode::Jg
            | Opcode::Jae
            | Opcode::Jge => {
                let mark = reader.read_u32()?;
                jumps.push((code.len(), mark));
                Instr::Jump { op, target: 0 }
            }
            Opcode::Mark => {
                let mark = reader.read_u32()?;
                marks.insert(mark, code.len());
                Instr::Mark
            }
            Opcode::Call => {
                let function = reader.read_u32()?;
                let ret = ValueIndex::decode(&mut reader)?;
                let argc = reader.read_u8()? as usize;
                let mut args = Vec::with_capacity(argc);
                for _ in 0..argc {
                    args.push(ValueIndex::decode(&mut reader)?);
                }
                Instr::Call {
                    function,
                    ret,
                    args,
                }
            }
            Opcode::ExtCall => {
                let library = reader.read_u32()?;
                let name = reader.read_string()?;
                let ret = ValueIndex::decode(&mut reader)?;
                let argc = reader.read_u8()? as usize;
                let mut args = Vec::with_capacity(argc);
                for _ in 0..argc {
                    args.push(ValueIndex::decode(&mut reader)?);
                }
                Instr::ExtCall {
                    library,
                    name,
                    ret,
                    args,
                }
            }
            Opcode::Malloc => Instr::Malloc {
                dst: ValueIndex::decode(&mut reader)?,
                size: reader.read_u32()?,
            },
            Opcode::Free => Instr::Free {
                ptr: ValueIndex::decode(&mut reader)?,
            },
            Opcode::Ret => Instr::Ret,
            Opcode::RetV => Instr::RetV {
                vt,
                src: ValueIndex::decode(&mut reader)?,
            },
            Opcode::Load => Instr::Load {
                vt,
                dst: ValueIndex::decode(&mut reader)?,
                base: ValueIndex::decode(&mut reader)?,
                offset: reader.read_u32()?,
            },
            Opcode::Store => {
                let base = ValueIndex::decode(&mut reader)?;
                let offset = reader.read_u32()?;
                let src = ValueIndex::decode(&mut reader)?;
                Instr::Store {
                    vt,
                    base,
                    offset,
                    src,
                }
            }
        };
        code.push(instr);
    }

    for (at, mark) in jumps {
        let target = *marks.get(&mark).ok_or(VmError::UnknownMark(mark))?;
        if let Instr::Jump { target: t, .. } = &mut code[at] {
            *t = target;
        }
    }

    let register_count = validate(&code, func.constants.len())?;

    Ok(LoadedFunction {
        name: func.name.clone(),
        return_type: func.return_type.clone(),
        arguments: func.arguments.clone(),
        constants: func.constants.clone(),
        code,
        register_count,
    })
}

/// Check operand storages and constant indices; returns the register-file
/// size.
fn validate(code: &[Instr], constant_count: usize) -> Result<usize, VmError> {
    let mut max_reg: Option<u32> = None;
    let mut check = |op: &ValueIndex| -> Result<(), VmError> {
        match op.storage {
            ValueStorage::Reg | ValueStorage::Ptr | ValueStorage::StackPtr => {
                max_reg = Some(max_reg.map_or(op.index, |m| m.max(op.index)));
                Ok(())
            }
            ValueStorage::Const => {
                if (op.index as usize) < constant_count {
                    Ok(())
                } else {
                    Err(VmError::BadConstantIndex(op.index))
                }
            }
            ValueStorage::Null => Ok(()),
            ValueStorage::DerefPtr => {
                Err(VmError::Decode(DecodeError::BadStorage(op.storage as u8)))
            }
        }
    };

    for instr in code {
        match instr {
            Instr::Op2 { a, b, .. } => {
                check(a)?;
                check(b)?;
            }
            Instr::Set { dst, .. } => check(dst)?,
            Instr::Call { ret, args, .. } | Instr::ExtCall { ret, args, .. } => {
                check(ret)?;
                for arg in args {
                    check(arg)?;
                }
            }
            Instr::Malloc { dst, .. } => check(dst)?,
            Instr::Free { ptr } => check(ptr)?,
            Instr::RetV { src, .. } => check(src)?,
            Instr::Load { dst, base, .. } => {
                check(dst)?;
                check(base)?;
            }
            Instr::Store { base, src, .. } => {
                check(base)?;
                check(src)?;
            }
            Instr::Jump { .. } | Instr::Mark | Instr::Ret => {}
        }
    }

    Ok(max_reg.map_or(0, |m| m as usize + 1))
}
