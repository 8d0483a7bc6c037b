//! Typed runtime values.
//!
//! Registers hold raw `u64` slots; a value type gives the slot meaning.
//! Conversions follow the operand's value type, so a `MOV` whose operand
//! types differ performs a numeric conversion.

use brane_ir::{Constant, ValueType};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    Void,
    Bool(bool),
    Char(u8),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    /// Heap object handle.
    Object(u64),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Void => ValueType::Void,
            Value::Bool(_) => ValueType::Bool,
            Value::Char(_) => ValueType::Char,
            Value::I32(_) => ValueType::Int32,
            Value::I64(_) => ValueType::Int64,
            Value::F32(_) => ValueType::Float32,
            Value::F64(_) => ValueType::Float64,
            Value::Object(_) => ValueType::ObjectRef,
        }
    }

    /// Decode a raw register slot.
    pub fn from_raw(raw: u64, vt: ValueType) -> Value {
        match vt {
            ValueType::Void => Value::Void,
            ValueType::Bool => Value::Bool(raw != 0),
            ValueType::Char => Value::Char(raw as u8),
            ValueType::Int32 => Value::I32(raw as u32 as i32),
            ValueType::Int64 => Value::I64(raw as i64),
            ValueType::Float32 => Value::F32(f32::from_bits(raw as u32)),
            ValueType::Float64 => Value::F64(f64::from_bits(raw)),
            ValueType::Struct | ValueType::ObjectRef => Value::Object(raw),
        }
    }

    /// Encode into a raw register slot.
    pub fn to_raw(&self) -> u64 {
        match self {
            Value::Void => 0,
            Value::Bool(v) => *v as u64,
            Value::Char(v) => *v as u64,
            Value::I32(v) => *v as u32 as u64,
            Value::I64(v) => *v as u64,
            Value::F32(v) => v.to_bits() as u64,
            Value::F64(v) => v.to_bits(),
            Value::Object(h) => *h,
        }
    }

    /// Numeric conversion to another value type. Bools convert to 0/1;
    /// object handles pass through untouched.
    pub fn convert(&self, to: ValueType) -> Value {
        if self.value_type() == to {
            return *self;
        }
        let as_i64 = |v: &Value| -> i64 {
            match v {
                Value::Bool(b) => *b as i64,
                Value::Char(c) => *c as i64,
                Value::I32(i) => *i as i64,
                Value::I64(i) => *i,
                Value::F32(f) => *f as i64,
                Value::F64(f) => *f as i64,
                Value::Object(h) => *h as i64,
                Value::Void => 0,
            }
        };
        let as_f64 = |v: &Value| -> f64 {
            match v {
                Value::Bool(b) => *b as u8 as f64,
                Value::Char(c) => *c as f64,
                Value::I32(i) => *i as f64,
                Value::I64(i) => *i as f64,
                Value::F32(f) => *f as f64,
                Value::F64(f) => *f,
                Value::Object(_) | Value::Void => 0.0,
            }
        };
        match to {
            ValueType::Void => Value::Void,
            ValueType::Bool => Value::Bool(as_i64(self) != 0),
            ValueType::Char => Value::Char(as_i64(self) as u8),
            ValueType::Int32 => Value::I32(as_i64(self) as i32),
            ValueType::Int64 => Value::I64(as_i64(self)),
            ValueType::Float32 => Value::F32(as_f64(self) as f32),
            ValueType::Float64 => Value::F64(as_f64(self)),
            ValueType::Struct | ValueType::ObjectRef => Value::Object(self.to_raw()),
        }
    }

    pub fn from_constant(c: &Constant) -> Value {
        match c {
            Constant::Bool(v) => Value::Bool(*v),
            Constant::Char(v) => Value::Char(*v),
            Constant::I32(v) => Value::I32(*v),
            Constant::I64(v) => Value::I64(*v),
            Constant::F32(v) => Value::F32(*v),
            Constant::F64(v) => Value::F64(*v),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Void => write!(f, "void"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "'{}'", *v as char),
            Value::I32(v) => write!(f, "{}", v),
            Value::I64(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
            Value::F64(v) => write!(f, "{}", v),
            Value::Object(h) => write!(f, "object({:#x})", h),
        }
    }
}

/// The value type a declared type name maps to at runtime. Anything that
/// is not a native primitive is a struct reference.
pub fn value_type_of_name(name: &str) -> ValueType {
    match name {
        "void" => ValueType::Void,
        "bool" => ValueType::Bool,
        "char" => ValueType::Char,
        "int" => ValueType::Int32,
        "long" => ValueType::Int64,
        "float" => ValueType::Float32,
        "double" => ValueType::Float64,
        _ => ValueType::ObjectRef,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_round_trip() {
        let cases = [
            Value::Bool(true),
            Value::Char(b'q'),
            Value::I32(-5),
            Value::I64(1 << 40),
            Value::F32(1.25),
            Value::F64(-0.5),
            Value::Object(3),
        ];
        for v in cases {
            assert_eq!(Value::from_raw(v.to_raw(), v.value_type()), v);
        }
    }

    #[test]
    fn numeric_conversions() {
        assert_eq!(Value::I32(3).convert(ValueType::Float64), Value::F64(3.0));
        assert_eq!(Value::F32(2.75).convert(ValueType::Int32), Value::I32(2));
        assert_eq!(Value::Char(7).convert(ValueType::Int64), Value::I64(7));
        assert_eq!(Value::Bool(true).convert(ValueType::Int32), Value::I32(1));
    }
}
