//! The compiled artifact: functions, struct layouts, linked libraries.
//!
//! File format (`to_bytes`/`from_bytes`):
//! - Magic `"BSIR"` (4 bytes)
//! - Version: u32
//! - functions: [name, return_type, arguments, constants, code bytes]
//! - structs: [name, packed, members]
//! - linked libraries: [name]
//!
//! Indices into these lists are stable and are embedded in opcodes.

use crate::instruction::{Opcode, ValueIndex, ValueType};
use crate::serialize::{ByteReader, ByteWriter, DecodeError};

const MAGIC: &[u8; 4] = b"BSIR";
const VERSION: u32 = 1;

/// A typed literal in a function's constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Bool(bool),
    Char(u8),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
}

impl Constant {
    pub fn value_type(&self) -> ValueType {
        match self {
            Constant::Bool(_) => ValueType::Bool,
            Constant::Char(_) => ValueType::Char,
            Constant::I32(_) => ValueType::Int32,
            Constant::I64(_) => ValueType::Int64,
            Constant::F32(_) => ValueType::Float32,
            Constant::F64(_) => ValueType::Float64,
        }
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.write_u8(self.value_type() as u8);
        match self {
            Constant::Bool(v) => w.write_u8(*v as u8),
            Constant::Char(v) => w.write_u8(*v),
            Constant::I32(v) => w.write_i32(*v),
            Constant::I64(v) => w.write_i64(*v),
            Constant::F32(v) => w.write_f32(*v),
            Constant::F64(v) => w.write_f64(*v),
        }
    }

    fn decode(r: &mut ByteReader) -> Result<Self, DecodeError> {
        let tag = r.read_u8()?;
        Ok(match ValueType::from_u8(tag) {
            Some(ValueType::Bool) => Constant::Bool(r.read_u8()? != 0),
            Some(ValueType::Char) => Constant::Char(r.read_u8()?),
            Some(ValueType::Int32) => Constant::I32(r.read_i32()?),
            Some(ValueType::Int64) => Constant::I64(r.read_i64()?),
            Some(ValueType::Float32) => Constant::F32(r.read_f32()?),
            Some(ValueType::Float64) => Constant::F64(r.read_f64()?),
            _ => return Err(DecodeError::BadConstantTag(tag)),
        })
    }
}

impl std::fmt::Display for Constant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constant::Bool(v) => write!(f, "{}", v),
            Constant::Char(v) => write!(f, "'{}'", *v as char),
            Constant::I32(v) => write!(f, "{}", v),
            Constant::I64(v) => write!(f, "{}", v),
            Constant::F32(v) => write!(f, "{}f", v),
            Constant::F64(v) => write!(f, "{}", v),
        }
    }
}

/// A compiled function: mangled name, signature, constant pool, and the
/// encoded instruction stream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptFunction {
    /// Mangled as `base(argType,argType,...)`.
    pub name: String,
    pub return_type: String,
    pub arguments: Vec<String>,
    pub constants: Vec<Constant>,
    pub code: Vec<u8>,
}

impl ScriptFunction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_constant(&mut self, c: Constant) -> u32 {
        self.constants.push(c);
        (self.constants.len() - 1) as u32
    }

    fn header(&mut self, op: Opcode, vt: ValueType) -> ByteWriter {
        let mut w = ByteWriter::new();
        w.write_u8(op as u8);
        w.write_u8(vt as u8);
        w
    }

    fn commit(&mut self, w: ByteWriter) {
        self.code.extend_from_slice(&w.into_bytes());
    }

    /// Two-operand form: `a <- a op b` (also `MOV` and `CMP`).
    pub fn append_op2(&mut self, op: Opcode, vt: ValueType, a: ValueIndex, b: ValueIndex) {
        let mut w = self.header(op, vt);
        a.encode(&mut w);
        b.encode(&mut w);
        self.commit(w);
    }

    /// `SET*`: materialize the last comparison into `dst`.
    pub fn append_set(&mut self, op: Opcode, dst: ValueIndex) {
        let mut w = self.header(op, ValueType::Bool);
        dst.encode(&mut w);
        self.commit(w);
    }

    /// `JMP`/`J*`: jump to a mark.
    pub fn append_jump(&mut self, op: Opcode, mark: u32) {
        let mut w = self.header(op, ValueType::Void);
        w.write_u32(mark);
        self.commit(w);
    }

    pub fn append_mark(&mut self, mark: u32) {
        let mut w = self.header(Opcode::Mark, ValueType::Void);
        w.write_u32(mark);
        self.commit(w);
    }

    pub fn append_call(&mut self, function: u32, ret: ValueIndex, args: &[ValueIndex]) {
        let mut w = self.header(Opcode::Call, ret.value_type);
        w.write_u32(function);
        ret.encode(&mut w);
        w.write_u8(args.len() as u8);
        for arg in args {
            arg.encode(&mut w);
        }
        self.commit(w);
    }

    pub fn append_ext_call(
        &mut self,
        library: u32,
        name: &str,
        ret: ValueIndex,
        args: &[ValueIndex],
    ) {
        let mut w = self.header(Opcode::ExtCall, ret.value_type);
        w.write_u32(library);
        w.write_string(name);
        ret.encode(&mut w);
        w.write_u8(args.len() as u8);
        for arg in args {
            arg.encode(&mut w);
        }
        self.commit(w);
    }

    pub fn append_malloc(&mut self, dst: ValueIndex, size: u32) {
        let mut w = self.header(Opcode::Malloc, ValueType::ObjectRef);
        dst.encode(&mut w);
        w.write_u32(size);
        self.commit(w);
    }

    pub fn append_free(&mut self, ptr: ValueIndex) {
        let mut w = self.header(Opcode::Free, ValueType::ObjectRef);
        ptr.encode(&mut w);
        self.commit(w);
    }

    pub fn append_ret(&mut self) {
        let w = self.header(Opcode::Ret, ValueType::Void);
        self.commit(w);
    }

    pub fn append_retv(&mut self, vt: ValueType, src: ValueIndex) {
        let mut w = self.header(Opcode::RetV, vt);
        src.encode(&mut w);
        self.commit(w);
    }

    pub fn append_load(&mut self, vt: ValueType, dst: ValueIndex, base: ValueIndex, offset: u32) {
        let mut w = self.header(Opcode::Load, vt);
        dst.encode(&mut w);
        base.encode(&mut w);
        w.write_u32(offset);
        self.commit(w);
    }

    pub fn append_store(&mut self, vt: ValueType, base: ValueIndex, offset: u32, src: ValueIndex) {
        let mut w = self.header(Opcode::Store, vt);
        base.encode(&mut w);
        w.write_u32(offset);
        src.encode(&mut w);
        self.commit(w);
    }

    fn encode(&self, w: &mut ByteWriter) {
        w.write_string(&self.name);
        w.write_string(&self.return_type);
        w.write_u32(self.arguments.len() as u32);
        for arg in &self.arguments {
            w.write_string(arg);
        }
        w.write_u32(self.constants.len() as u32);
        for c in &self.constants {
            c.encode(w);
        }
        w.write_u32(self.code.len() as u32);
        w.write_raw(&self.code);
    }

    fn decode(r: &mut ByteReader) -> Result<Self, DecodeError> {
        let name = r.read_string()?;
        let return_type = r.read_string()?;
        let arg_count = r.read_u32()? as usize;
        let mut arguments = Vec::with_capacity(arg_count);
        for _ in 0..arg_count {
            arguments.push(r.read_string()?);
        }
        let const_count = r.read_u32()? as usize;
        let mut constants = Vec::with_capacity(const_count);
        for _ in 0..const_count {
            constants.push(Constant::decode(r)?);
        }
        let code_len = r.read_u32()? as usize;
        let mut code = Vec::with_capacity(code_len);
        for _ in 0..code_len {
            code.push(r.read_u8()?);
        }
        Ok(Self {
            name,
            return_type,
            arguments,
            constants,
            code,
        })
    }
}

/// Wire form of a struct layout, mirrored from the compiler's `StructDef`
/// so the runtime can reconstruct member offsets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IRStructDef {
    pub name: String,
    pub packed: bool,
    pub members: Vec<IRStructMember>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IRStructMember {
    pub name: String,
    pub offset: u32,
    pub type_name: String,
}

impl IRStructDef {
    fn encode(&self, w: &mut ByteWriter) {
        w.write_string(&self.name);
        w.write_u8(self.packed as u8);
        w.write_u32(self.members.len() as u32);
        for m in &self.members {
            w.write_string(&m.name);
            w.write_u32(m.offset);
            w.write_string(&m.type_name);
        }
    }

    fn decode(r: &mut ByteReader) -> Result<Self, DecodeError> {
        let name = r.read_string()?;
        let packed = r.read_u8()? != 0;
        let member_count = r.read_u32()? as usize;
        let mut members = Vec::with_capacity(member_count);
        for _ in 0..member_count {
            members.push(IRStructMember {
                name: r.read_string()?,
                offset: r.read_u32()?,
                type_name: r.read_string()?,
            });
        }
        Ok(Self {
            name,
            packed,
            members,
        })
    }
}

/// A complete compiled script.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IRScript {
    pub local_functions: Vec<ScriptFunction>,
    pub local_structs: Vec<IRStructDef>,
    pub linked_libraries: Vec<String>,
}

impl IRScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a local function index by mangled name.
    pub fn find_function(&self, mangled: &str) -> Option<usize> {
        self.local_functions.iter().position(|f| f.name == mangled)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut w = ByteWriter::new();
        w.write_raw(MAGIC);
        w.write_u32(VERSION);
        w.write_u32(self.local_functions.len() as u32);
        for func in &self.local_functions {
            func.encode(&mut w);
        }
        w.write_u32(self.local_structs.len() as u32);
        for def in &self.local_structs {
            def.encode(&mut w);
        }
        w.write_u32(self.linked_libraries.len() as u32);
        for lib in &self.linked_libraries {
            w.write_string(lib);
        }
        w.into_bytes()
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = ByteReader::new(bytes);
        let mut magic = [0u8; 4];
        for b in &mut magic {
            *b = r.read_u8()?;
        }
        if &magic != MAGIC {
            return Err(DecodeError::BadMagic);
        }
        let version = r.read_u32()?;
        if version != VERSION {
            return Err(DecodeError::UnsupportedVersion(version));
        }
        let func_count = r.read_u32()? as usize;
        let mut local_functions = Vec::with_capacity(func_count);
        for _ in 0..func_count {
            local_functions.push(ScriptFunction::decode(&mut r)?);
        }
        let struct_count = r.read_u32()? as usize;
        let mut local_structs = Vec::with_capacity(struct_count);
        for _ in 0..struct_count {
            local_structs.push(IRStructDef::decode(&mut r)?);
        }
        let lib_count = r.read_u32()? as usize;
        let mut linked_libraries = Vec::with_capacity(lib_count);
        for _ in 0..lib_count {
            linked_libraries.push(r.read_string()?);
        }
        Ok(Self {
            local_functions,
            local_structs,
            linked_libraries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::ValueStorage;

    fn reg(vt: ValueType, index: u32) -> ValueIndex {
        ValueIndex::new(ValueStorage::Reg, vt, index)
    }

    #[test]
    fn script_round_trip() {
        let mut func = ScriptFunction::new("add(int,int)");
        func.return_type = "int".into();
        func.arguments = vec!["int".into(), "int".into()];
        let slot = func.add_constant(Constant::I32(7));
        func.append_op2(
            Opcode::Add,
            ValueType::Int32,
            reg(ValueType::Int32, 0),
            ValueIndex::new(ValueStorage::Const, ValueType::Int32, slot),
        );
        func.append_retv(ValueType::Int32, reg(ValueType::Int32, 0));

        let script = IRScript {
            local_functions: vec![func],
            local_structs: vec![IRStructDef {
                name: "vec2".into(),
                packed: false,
                members: vec![
                    IRStructMember {
                        name: "x".into(),
                        offset: 0,
                        type_name: "float".into(),
                    },
                    IRStructMember {
                        name: "y".into(),
                        offset: 4,
                        type_name: "float".into(),
                    },
                ],
            }],
            linked_libraries: vec!["math".into()],
        };

        let bytes = script.to_bytes();
        let loaded = IRScript::from_bytes(&bytes).unwrap();
        assert_eq!(loaded, script);
    }

    #[test]
    fn rejects_wrong_magic() {
        assert_eq!(
            IRScript::from_bytes(b"GOXB\0\0\0\0"),
            Err(DecodeError::BadMagic)
        );
    }
}
