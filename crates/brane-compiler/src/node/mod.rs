//! The typed expression-node graph.
//!
//! Each node owns its operands outright; the graph is a strict tree.
//! A node answers three questions: what type it produces, whether it can
//! be rewritten into something cheaper (`optimize`), and how it lowers to
//! bytecode (`emit`, in the sibling module).

mod emit;

use crate::types::{primitive_of, unify_numeric, StructDef, TypeDef};
use crate::value::CompareType;
use brane_ir::{Constant, ValueType};
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

#[derive(Debug, Clone)]
pub enum AotNode {
    Const {
        value: Constant,
        ty: TypeDef,
    },
    ValueRef {
        id: u16,
        ty: TypeDef,
        is_const: bool,
        is_ref: bool,
    },
    Deref {
        base: Box<AotNode>,
        ty: TypeDef,
        offset: u32,
    },
    Assign {
        dest: Box<AotNode>,
        value: Box<AotNode>,
    },
    Scope {
        body: Vec<AotNode>,
    },
    If {
        cond: Box<AotNode>,
        body: Box<AotNode>,
    },
    While {
        cond: Box<AotNode>,
        body: Box<AotNode>,
    },
    ReturnVoid,
    ReturnValue {
        value: Box<AotNode>,
    },
    Cast {
        value: Box<AotNode>,
        ty: TypeDef,
    },
    Arith {
        op: ArithOp,
        left: Box<AotNode>,
        right: Box<AotNode>,
    },
    Compare {
        mode: CompareType,
        left: Box<AotNode>,
        right: Box<AotNode>,
    },
    Call {
        function: u32,
        ret: TypeDef,
        args: Vec<AotNode>,
    },
    ExtCall {
        library: u32,
        name: String,
        ret: TypeDef,
        args: Vec<AotNode>,
    },
    New {
        def: Rc<StructDef>,
    },
    Delete {
        ptr: Box<AotNode>,
    },
}

impl AotNode {
    /// The type this node's emission produces. Statements are `void`.
    pub fn result_type(&self) -> TypeDef {
        match self {
            AotNode::Const { ty, .. } => ty.clone(),
            AotNode::ValueRef { ty, .. } => ty.clone(),
            AotNode::Deref { ty, .. } => ty.clone(),
            AotNode::Cast { ty, .. } => ty.clone(),
            AotNode::Arith { left, right, .. } => {
                let lt = left.result_type().value_type();
                let rt = right.result_type().value_type();
                match unify_numeric(lt, rt) {
                    Some(vt) => primitive_of(vt),
                    None => left.result_type(),
                }
            }
            AotNode::Compare { .. } => primitive_of(ValueType::Bool),
            AotNode::Call { ret, .. } => ret.clone(),
            AotNode::ExtCall { ret, .. } => ret.clone(),
            AotNode::New { def } => TypeDef::Struct(def.clone()),
            AotNode::Assign { .. }
            | AotNode::Scope { .. }
            | AotNode::If { .. }
            | AotNode::While { .. }
            | AotNode::ReturnVoid
            | AotNode::ReturnValue { .. }
            | AotNode::Delete { .. } => TypeDef::VOID,
        }
    }

    /// Bottom-up rewrite. Constant arithmetic folds to the exact result on
    /// the unified numeric type; casts of constants fold to retyped
    /// constants; everything else optimizes its children and stays put.
    pub fn optimize(self) -> AotNode {
        match self {
            AotNode::Arith { op, left, right } => {
                let left = left.optimize();
                let right = right.optimize();
                if let (AotNode::Const { value: a, .. }, AotNode::Const { value: b, .. }) =
                    (&left, &right)
                {
                    if let Some(value) = fold_arith(op, a, b) {
                        let ty = primitive_of(value.value_type());
                        return AotNode::Const { value, ty };
                    }
                }
                AotNode::Arith {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            AotNode::Cast { value, ty } => {
                let value = value.optimize();
                if let AotNode::Const { value: c, .. } = &value {
                    if let Some(retyped) = retype_const(c, ty.value_type()) {
                        return AotNode::Const { value: retyped, ty };
                    }
                }
                AotNode::Cast {
                    value: Box::new(value),
                    ty,
                }
            }
            AotNode::Compare { mode, left, right } => AotNode::Compare {
                mode,
                left: Box::new(left.optimize()),
                right: Box::new(right.optimize()),
            },
            AotNode::Assign { dest, value } => AotNode::Assign {
                dest: Box::new(dest.optimize()),
                value: Box::new(value.optimize()),
            },
            AotNode::Deref { base, ty, offset } => AotNode::Deref {
                base: Box::new(base.optimize()),
                ty,
                offset,
            },
            AotNode::Scope { body } => AotNode::Scope {
                body: body.into_iter().map(AotNode::optimize).collect(),
            },
            AotNode::If { cond, body } => AotNode::If {
                cond: Box::new(cond.optimize()),
                body: Box::new(body.optimize()),
            },
            AotNode::While { cond, body } => AotNode::While {
                cond: Box::new(cond.optimize()),
                body: Box::new(body.optimize()),
            },
            AotNode::ReturnValue { value } => AotNode::ReturnValue {
                value: Box::new(value.optimize()),
            },
            AotNode::Call {
                function,
                ret,
                args,
            } => AotNode::Call {
                function,
                ret,
                args: args.into_iter().map(AotNode::optimize).collect(),
            },
            AotNode::ExtCall {
                library,
                name,
                ret,
                args,
            } => AotNode::ExtCall {
                library,
                name,
                ret,
                args: args.into_iter().map(AotNode::optimize).collect(),
            },
            AotNode::Delete { ptr } => AotNode::Delete {
                ptr: Box::new(ptr.optimize()),
            },
            other @ (AotNode::Const { .. }
            | AotNode::ValueRef { .. }
            | AotNode::ReturnVoid
            | AotNode::New { .. }) => other,
        }
    }
}

/// Widen a constant to a numeric value type.
fn retype_const(c: &Constant, target: ValueType) -> Option<Constant> {
    let as_i64 = |c: &Constant| -> Option<i64> {
        Some(match c {
            Constant::Char(v) => *v as i64,
            Constant::I32(v) => *v as i64,
            Constant::I64(v) => *v,
            Constant::F32(v) => *v as i64,
            Constant::F64(v) => *v as i64,
            Constant::Bool(_) => return None,
        })
    };
    let as_f64 = |c: &Constant| -> Option<f64> {
        Some(match c {
            Constant::Char(v) => *v as f64,
            Constant::I32(v) => *v as f64,
            Constant::I64(v) => *v as f64,
            Constant::F32(v) => *v as f64,
            Constant::F64(v) => *v,
            Constant::Bool(_) => return None,
        })
    };
    Some(match target {
        ValueType::Char => Constant::Char(as_i64(c)? as u8),
        ValueType::Int32 => Constant::I32(as_i64(c)? as i32),
        ValueType::Int64 => Constant::I64(as_i64(c)?),
        ValueType::Float32 => Constant::F32(as_f64(c)? as f32),
        ValueType::Float64 => Constant::F64(as_f64(c)?),
        _ => return None,
    })
}

/// Exact arithmetic on the unified type: two's-complement wrap for
/// integers, IEEE-754 for floats. Integer division by a zero constant is
/// left unfolded for the runtime to report.
fn fold_arith(op: ArithOp, a: &Constant, b: &Constant) -> Option<Constant> {
    let target = unify_numeric(a.value_type(), b.value_type())?;
    let a = retype_const(a, target)?;
    let b = retype_const(b, target)?;
    Some(match (a, b) {
        (Constant::Char(a), Constant::Char(b)) => Constant::Char(match op {
            ArithOp::Add => a.wrapping_add(b),
            ArithOp::Sub => a.wrapping_sub(b),
            ArithOp::Mul => a.wrapping_mul(b),
            ArithOp::Div => a.checked_div(b)?,
        }),
        (Constant::I32(a), Constant::I32(b)) => Constant::I32(match op {
            ArithOp::Add => a.wrapping_add(b),
            ArithOp::Sub => a.wrapping_sub(b),
            ArithOp::Mul => a.wrapping_mul(b),
            ArithOp::Div => a.checked_div(b)?,
        }),
        (Constant::I64(a), Constant::I64(b)) => Constant::I64(match op {
            ArithOp::Add => a.wrapping_add(b),
            ArithOp::Sub => a.wrapping_sub(b),
            ArithOp::Mul => a.wrapping_mul(b),
            ArithOp::Div => a.checked_div(b)?,
        }),
        (Constant::F32(a), Constant::F32(b)) => Constant::F32(match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
        }),
        (Constant::F64(a), Constant::F64(b)) => Constant::F64(match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
        }),
        _ => return None,
    })
}
