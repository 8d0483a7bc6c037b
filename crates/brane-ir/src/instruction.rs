//! Instruction format: opcodes, value types, and operand triples.
//!
//! Every instruction starts with a `(u8 opcode, u8 value_type)` header.
//! Value operands are `ValueIndex` triples: `(u8 storage, u8 value_type,
//! u32 index)`, little-endian, 6 bytes on the wire. Jump targets, struct
//! sizes, and field offsets are raw `u32`s appended after the header.

use crate::serialize::{ByteReader, ByteWriter, DecodeError};

/// The type of a stored value.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Void = 0,
    Bool,
    Char,
    Int32,
    Int64,
    Float32,
    Float64,
    Struct,
    ObjectRef,
}

impl ValueType {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => ValueType::Void,
            1 => ValueType::Bool,
            2 => ValueType::Char,
            3 => ValueType::Int32,
            4 => ValueType::Int64,
            5 => ValueType::Float32,
            6 => ValueType::Float64,
            7 => ValueType::Struct,
            8 => ValueType::ObjectRef,
            _ => return None,
        })
    }

    /// Storage size in bytes. `Struct` has no fixed size here; aggregates
    /// carry their own layout.
    pub fn size(&self) -> u32 {
        match self {
            ValueType::Void => 0,
            ValueType::Bool | ValueType::Char => 1,
            ValueType::Int32 | ValueType::Float32 => 4,
            ValueType::Int64 | ValueType::Float64 | ValueType::ObjectRef => 8,
            ValueType::Struct => 0,
        }
    }

    pub fn is_float(&self) -> bool {
        matches!(self, ValueType::Float32 | ValueType::Float64)
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, ValueType::Char | ValueType::Int32 | ValueType::Int64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_float() || self.is_integer()
    }
}

/// Which pool an operand's index points into.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueStorage {
    Null = 0,
    Reg,
    Ptr,
    StackPtr,
    DerefPtr,
    Const,
}

impl ValueStorage {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => ValueStorage::Null,
            1 => ValueStorage::Reg,
            2 => ValueStorage::Ptr,
            3 => ValueStorage::StackPtr,
            4 => ValueStorage::DerefPtr,
            5 => ValueStorage::Const,
            _ => return None,
        })
    }

    /// Whether this storage indexes the register file.
    pub fn is_register(&self) -> bool {
        matches!(
            self,
            ValueStorage::Reg | ValueStorage::Ptr | ValueStorage::StackPtr
        )
    }
}

/// A value operand: storage pool, value type, and slot index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValueIndex {
    pub storage: ValueStorage,
    pub value_type: ValueType,
    pub index: u32,
}

impl ValueIndex {
    pub const NULL: ValueIndex = ValueIndex {
        storage: ValueStorage::Null,
        value_type: ValueType::Void,
        index: 0,
    };

    pub fn new(storage: ValueStorage, value_type: ValueType, index: u32) -> Self {
        Self {
            storage,
            value_type,
            index,
        }
    }

    pub fn encode(&self, w: &mut ByteWriter) {
        w.write_u8(self.storage as u8);
        w.write_u8(self.value_type as u8);
        w.write_u32(self.index);
    }

    pub fn decode(r: &mut ByteReader) -> Result<Self, DecodeError> {
        let storage = r.read_u8()?;
        let storage = ValueStorage::from_u8(storage).ok_or(DecodeError::BadStorage(storage))?;
        let vt = r.read_u8()?;
        let value_type = ValueType::from_u8(vt).ok_or(DecodeError::BadValueType(vt))?;
        let index = r.read_u32()?;
        Ok(Self {
            storage,
            value_type,
            index,
        })
    }
}

/// Register-machine opcodes.
///
/// Arithmetic and `MOV` are two-operand (`a <- a op b`); `MOV` converts
/// numerically when the operand value types differ. `CMP` records a typed
/// comparison consumed by the `SET*` and conditional-jump instructions.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Mov = 0,
    Add,
    Sub,
    Mul,
    Div,
    Cmp,
    SetE,
    SetNe,
    SetA,
    SetG,
    SetAe,
    SetGe,
    Jmp,
    Je,
    Jne,
    Ja,
    Jg,
    Jae,
    Jge,
    Mark,
    Call,
    ExtCall,
    Malloc,
    Free,
    Ret,
    RetV,
    Load,
    Store,
}

impl Opcode {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Opcode::Mov,
            1 => Opcode::Add,
            2 => Opcode::Sub,
            3 => Opcode::Mul,
            4 => Opcode::Div,
            5 => Opcode::Cmp,
            6 => Opcode::SetE,
            7 => Opcode::SetNe,
            8 => Opcode::SetA,
            9 => Opcode::SetG,
            10 => Opcode::SetAe,
            11 => Opcode::SetGe,
            12 => Opcode::Jmp,
            13 => Opcode::Je,
            14 => Opcode::Jne,
            15 => Opcode::Ja,
            16 => Opcode::Jg,
            17 => Opcode::Jae,
            18 => Opcode::Jge,
            19 => Opcode::Mark,
            20 => Opcode::Call,
            21 => Opcode::ExtCall,
            22 => Opcode::Malloc,
            23 => Opcode::Free,
            24 => Opcode::Ret,
            25 => Opcode::RetV,
            26 => Opcode::Load,
            27 => Opcode::Store,
            _ => return None,
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Opcode::Mov => "MOV",
            Opcode::Add => "ADD",
            Opcode::Sub => "SUB",
            Opcode::Mul => "MUL",
            Opcode::Div => "DIV",
            Opcode::Cmp => "CMP",
            Opcode::SetE => "SETE",
            Opcode::SetNe => "SETNE",
            Opcode::SetA => "SETA",
            Opcode::SetG => "SETG",
            Opcode::SetAe => "SETAE",
            Opcode::SetGe => "SETGE",
            Opcode::Jmp => "JMP",
            Opcode::Je => "JE",
            Opcode::Jne => "JNE",
            Opcode::Ja => "JA",
            Opcode::Jg => "JG",
            Opcode::Jae => "JAE",
            Opcode::Jge => "JGE",
            Opcode::Mark => "MARK",
            Opcode::Call => "CALL",
            Opcode::ExtCall => "EXT_CALL",
            Opcode::Malloc => "MALLOC",
            Opcode::Free => "FREE",
            Opcode::Ret => "RET",
            Opcode::RetV => "RETV",
            Opcode::Load => "LOAD",
            Opcode::Store => "STORE",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_round_trip() {
        for v in 0..=27u8 {
            let op = Opcode::from_u8(v).unwrap();
            assert_eq!(op as u8, v);
        }
        assert!(Opcode::from_u8(28).is_none());
    }

    #[test]
    fn value_index_round_trip() {
        let idx = ValueIndex::new(ValueStorage::Reg, ValueType::Int32, 0xDEAD);
        let mut w = ByteWriter::new();
        idx.encode(&mut w);
        let bytes = w.into_bytes();
        assert_eq!(bytes.len(), 6);
        let mut r = ByteReader::new(&bytes);
        assert_eq!(ValueIndex::decode(&mut r).unwrap(), idx);
    }
}
