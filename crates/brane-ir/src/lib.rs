//! # brane-ir
//!
//! The BraneScript compilation artifact: typed opcodes for the register
//! machine, value-index operand triples, per-function constant pools, and
//! the `IRScript` container with its binary serialization.

pub mod instruction;
pub mod script;
pub mod serialize;

pub use instruction::{Opcode, ValueIndex, ValueStorage, ValueType};
pub use script::{Constant, IRScript, IRStructDef, IRStructMember, ScriptFunction};
pub use serialize::{ByteReader, ByteWriter, DecodeError};
