//! Bytecode emission.
//!
//! Emission appends typed opcodes to the function under construction and
//! returns an `AotValue` describing where each node's result lives.
//! Comparisons return a deferred flag; `if`/`while` branch straight off
//! the `CMP` and only `cast_reg` materializes a flag into a register.

use super::{AotNode, ArithOp};
use crate::context::CompilerCtx;
use crate::types::{primitive_of, unify_numeric, TypeDef};
use crate::value::{AotValue, CompareType};
use brane_ir::{Constant, Opcode, ValueType};

impl AotNode {
    pub fn emit(&self, ctx: &mut CompilerCtx) -> AotValue {
        match self {
            AotNode::Const { value, .. } => ctx.new_const(value.clone(), AotValue::CONSTEXPR),

            AotNode::ValueRef { id, ty, .. } => ctx.local_value(*id, ty),

            AotNode::Deref { base, ty, offset } => {
                let base = base.emit(ctx);
                let base = ctx.cast_value(base);
                let dst = ctx.new_reg(ty, AotValue::TEMP);
                ctx.function_mut()
                    .append_load(ty.value_type(), dst.index, base.index, *offset);
                dst
            }

            AotNode::Assign { dest, value } => {
                if let AotNode::Deref { base, ty, offset } = dest.as_ref() {
                    let src = value.emit(ctx);
                    let src = ctx.cast_reg(src);
                    let base = base.emit(ctx);
                    let base = ctx.cast_value(base);
                    ctx.function_mut()
                        .append_store(ty.value_type(), base.index, *offset, src.index);
                } else {
                    let src = value.emit(ctx);
                    let src = ctx.cast_value(src);
                    let dst = dest.emit(ctx);
                    ctx.function_mut().append_op2(
                        Opcode::Mov,
                        dst.index.value_type,
                        dst.index,
                        src.index,
                    );
                }
                AotValue::null()
            }

            AotNode::Scope { body } => {
                for stmt in body {
                    stmt.emit(ctx);
                }
                AotValue::null()
            }

            AotNode::If { cond, body } => {
                let end = ctx.new_mark();
                emit_inverse_branch(cond, ctx, end);
                body.emit(ctx);
                ctx.function_mut().append_mark(end);
                AotValue::null()
            }

            AotNode::While { cond, body } => {
                let head = ctx.new_mark();
                let end = ctx.new_mark();
                ctx.function_mut().append_mark(head);
                emit_inverse_branch(cond, ctx, end);
                body.emit(ctx);
                ctx.function_mut().append_jump(Opcode::Jmp, head);
                ctx.function_mut().append_mark(end);
                AotValue::null()
            }

            AotNode::ReturnVoid => {
                ctx.function_mut().append_ret();
                AotValue::null()
            }

            AotNode::ReturnValue { value } => {
                let value = value.emit(ctx);
                let value = ctx.cast_value(value);
                ctx.function_mut()
                    .append_retv(value.index.value_type, value.index);
                AotValue::null()
            }

            AotNode::Cast { value, ty } => {
                let src = value.emit(ctx);
                let src = ctx.cast_value(src);
                let dst = ctx.new_reg(ty, AotValue::TEMP | (src.flags & AotValue::CONSTEXPR));
                ctx.function_mut()
                    .append_op2(Opcode::Mov, ty.value_type(), dst.index, src.index);
                dst
            }

            AotNode::Arith { op, left, right } => emit_arith(*op, left, right, ctx),

            AotNode::Compare { mode, left, right } => {
                emit_cmp(left, right, ctx);
                AotValue {
                    def: primitive_of(ValueType::Bool),
                    flags: 0,
                    index: brane_ir::ValueIndex::NULL,
                    compare: *mode,
                }
            }

            AotNode::Call {
                function,
                ret,
                args,
            } => {
                let mut operands = Vec::with_capacity(args.len());
                for arg in args {
                    let value = arg.emit(ctx);
                    let value = ctx.cast_reg(value);
                    operands.push(value.index);
                }
                let ret = ctx.new_reg(ret, AotValue::TEMP);
                ctx.function_mut()
                    .append_call(*function, ret.index, &operands);
                ret
            }

            AotNode::ExtCall {
                library,
                name,
                ret,
                args,
            } => {
                let mut operands = Vec::with_capacity(args.len());
                for arg in args {
                    let value = arg.emit(ctx);
                    let value = ctx.cast_reg(value);
                    operands.push(value.index);
                }
                let ret = ctx.new_reg(ret, AotValue::TEMP);
                ctx.function_mut()
                    .append_ext_call(*library, name, ret.index, &operands);
                ret
            }

            AotNode::New { def } => {
                let ty = TypeDef::Struct(def.clone());
                let dst = ctx.new_reg(&ty, AotValue::TEMP);
                ctx.function_mut().append_malloc(dst.index, def.size());
                dst
            }

            AotNode::Delete { ptr } => {
                let ptr = ptr.emit(ctx);
                let ptr = ctx.cast_value(ptr);
                ctx.function_mut().append_free(ptr.index);
                AotValue::null()
            }
        }
    }
}

fn arith_opcode(op: ArithOp) -> Opcode {
    match op {
        ArithOp::Add => Opcode::Add,
        ArithOp::Sub => Opcode::Sub,
        ArithOp::Mul => Opcode::Mul,
        ArithOp::Div => Opcode::Div,
    }
}

/// Copy a value into a fresh temp of the widened type; `MOV` converts.
fn widen(ctx: &mut CompilerCtx, value: AotValue, target: ValueType) -> AotValue {
    let ty = primitive_of(target);
    let dst = ctx.new_reg(&ty, AotValue::TEMP | (value.flags & AotValue::CONSTEXPR));
    ctx.function_mut()
        .append_op2(Opcode::Mov, target, dst.index, value.index);
    dst
}

/// Two-operand form: the left operand becomes a clobberable temp holding
/// the result.
fn emit_arith(op: ArithOp, left: &AotNode, right: &AotNode, ctx: &mut CompilerCtx) -> AotValue {
    let lt = left.result_type().value_type();
    let rt = right.result_type().value_type();
    let target = unify_numeric(lt, rt).unwrap_or(lt);

    let l = left.emit(ctx);
    let l = ctx.cast_reg(l);
    let l = if lt != target {
        widen(ctx, l, target)
    } else {
        ctx.cast_temp(l)
    };

    let r = right.emit(ctx);
    let r = ctx.cast_reg(r);
    let r = if rt != target { widen(ctx, r, target) } else { r };

    ctx.function_mut()
        .append_op2(arith_opcode(op), target, l.index, r.index);
    l
}

/// Emit both operands and the typed `CMP`.
fn emit_cmp(left: &AotNode, right: &AotNode, ctx: &mut CompilerCtx) {
    let lt = left.result_type().value_type();
    let rt = right.result_type().value_type();
    let target = if lt == rt {
        lt
    } else {
        unify_numeric(lt, rt).unwrap_or(lt)
    };

    let l = left.emit(ctx);
    let l = ctx.cast_reg(l);
    let l = if lt != target { widen(ctx, l, target) } else { l };

    let r = right.emit(ctx);
    let r = ctx.cast_reg(r);
    let r = if rt != target { widen(ctx, r, target) } else { r };

    ctx.function_mut()
        .append_op2(Opcode::Cmp, target, l.index, r.index);
}

/// Branch to `mark` when the condition is false.
///
/// A comparison condition is negated at emission time so a single
/// conditional jump suffices: equality flips between `JE`/`JNE`, and the
/// order modes swap operands and toggle strictness (`!(a>b)` is `b>=a`).
/// Any other boolean value is compared against `false` and skipped with
/// `JE`.
fn emit_inverse_branch(cond: &AotNode, ctx: &mut CompilerCtx, mark: u32) {
    if let AotNode::Compare { mode, left, right } = cond {
        let op = match mode {
            CompareType::Equal => {
                emit_cmp(left, right, ctx);
                Opcode::Jne
            }
            CompareType::NotEqual => {
                emit_cmp(left, right, ctx);
                Opcode::Je
            }
            CompareType::Greater => {
                emit_cmp(right, left, ctx);
                Opcode::Jge
            }
            CompareType::GreaterEqual => {
                emit_cmp(right, left, ctx);
                Opcode::Jg
            }
            CompareType::Above => {
                emit_cmp(right, left, ctx);
                Opcode::Jae
            }
            CompareType::AboveEqual => {
                emit_cmp(right, left, ctx);
                Opcode::Ja
            }
            CompareType::None => unreachable!(),
        };
        ctx.function_mut().append_jump(op, mark);
        return;
    }

    let value = cond.emit(ctx);
    let value = ctx.cast_reg(value);
    let zero = ctx.new_const(Constant::Bool(false), 0);
    ctx.function_mut()
        .append_op2(Opcode::Cmp, ValueType::Bool, value.index, zero.index);
    ctx.function_mut().append_jump(Opcode::Je, mark);
}
