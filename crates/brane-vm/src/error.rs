//! Runtime errors.

use brane_ir::DecodeError;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum VmError {
    Decode(DecodeError),
    UnknownMark(u32),
    UnknownFunction(String),
    BadFunctionIndex(u32),
    BadLibraryIndex(u32),
    UnknownExtern { library: String, name: String },
    ArityMismatch { expected: usize, found: usize },
    DivideByZero,
    InvalidHandle(u64),
    BadConstantIndex(u32),
    OutOfBoundsAccess { offset: u32, size: u32 },
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::Decode(e) => write!(f, "{}", e),
            VmError::UnknownMark(mark) => write!(f, "jump to unknown mark {}", mark),
            VmError::UnknownFunction(name) => write!(f, "no function named `{}`", name),
            VmError::BadFunctionIndex(idx) => write!(f, "function index {} out of range", idx),
            VmError::BadLibraryIndex(idx) => write!(f, "library index {} out of range", idx),
            VmError::UnknownExtern { library, name } => {
                write!(f, "no extern function `{}` in library `{}`", name, library)
            }
            VmError::ArityMismatch { expected, found } => {
                write!(f, "expected {} arguments, got {}", expected, found)
            }
            VmError::DivideByZero => write!(f, "integer division by zero"),
            VmError::InvalidHandle(h) => write!(f, "invalid object handle {:#x}", h),
            VmError::BadConstantIndex(idx) => write!(f, "constant index {} out of range", idx),
            VmError::OutOfBoundsAccess { offset, size } => {
                write!(f, "field access at offset {} past object of {} bytes", offset, size)
            }
        }
    }
}

impl std::error::Error for VmError {}

impl From<DecodeError> for VmError {
    fn from(e: DecodeError) -> Self {
        VmError::Decode(e)
    }
}
