//! Shared helpers: walking an [`IROp`]'s operand/destination fields, and the
//! forward-cursor driver every pass runs its rewrite phase through.
//!
//! Passes that need liveness or value information first make a read-only
//! sweep with [`BasicBlock::iter`], then perform the actual rewrite through
//! an [`Emitter`] so erasing or overwriting an op never requires touching
//! `prev`/`next` links by hand.

use crate::ir::basic_block::BasicBlock;
use crate::ir::emitter::Emitter;
use crate::ir::op::{IROp, VarOrImm};
use crate::ir::variable::{OpIndex, Variable};

/// Invokes `f` on every value this op reads (never its destination(s)).
pub fn visit_operands(op: &IROp, mut f: impl FnMut(VarOrImm)) {
    match *op {
        IROp::GetRegister { .. }
        | IROp::GetCPSR { .. }
        | IROp::GetSPSR { .. }
        | IROp::LoadCopRegister { .. }
        | IROp::Constant { .. }
        | IROp::GetBaseVectorAddress { .. } => {}
        IROp::SetRegister { value, .. } | IROp::SetCPSR { value } | IROp::SetSPSR { value, .. } => f(value),
        IROp::MemRead { address, .. } | IROp::Preload { address } => f(address),
        IROp::MemWrite { address, value, .. } => {
            f(address);
            f(value);
        }
        IROp::LogicalShiftLeft { value, amount, .. }
        | IROp::LogicalShiftRight { value, amount, .. }
        | IROp::ArithmeticShiftRight { value, amount, .. }
        | IROp::RotateRight { value, amount, .. } => {
            f(value);
            f(amount);
        }
        IROp::RotateRightExtended { value, carry_in, .. } => {
            f(value);
            f(carry_in);
        }
        IROp::BitwiseAnd { lhs, rhs, .. }
        | IROp::BitwiseOr { lhs, rhs, .. }
        | IROp::BitwiseXor { lhs, rhs, .. }
        | IROp::BitClear { lhs, rhs, .. }
        | IROp::Add { lhs, rhs, .. }
        | IROp::AddCarry { lhs, rhs, .. }
        | IROp::Subtract { lhs, rhs, .. }
        | IROp::SubtractCarry { lhs, rhs, .. }
        | IROp::SaturatingAdd { lhs, rhs, .. }
        | IROp::SaturatingSubtract { lhs, rhs, .. } => {
            f(lhs);
            f(rhs);
        }
        IROp::CountLeadingZeros { value, .. } => f(value),
        IROp::Move { value, .. } | IROp::MoveNegated { value, .. } => f(value),
        IROp::Multiply { lhs, rhs, accumulate, .. } => {
            f(lhs);
            f(rhs);
            if let Some(acc) = accumulate {
                f(acc);
            }
        }
        IROp::MultiplyLong { lhs, rhs, acc_lo, acc_hi, .. } => {
            f(lhs);
            f(rhs);
            f(acc_lo);
            f(acc_hi);
        }
        IROp::StoreFlags { value, .. } => f(value),
        IROp::LoadFlags { cpsr_value, .. } => f(cpsr_value),
        IROp::LoadStickyOverflow { cpsr_value, value, .. } => {
            f(cpsr_value);
            f(value);
        }
        IROp::Branch { target } | IROp::BranchExchange { target } => f(target),
        IROp::StoreCopRegister { value, .. } => f(value),
        IROp::CopyVar { src, .. } => f(VarOrImm::Var(src)),
    }
}

/// Invokes `f` on every operand slot this op can rewrite in place, for
/// constant-propagation substitution. `CopyVar`'s source is a bare
/// [`Variable`], not a [`VarOrImm`] slot, so it is not visited here; callers
/// needing to fold it into a `Constant` must replace the whole op.
pub fn visit_operands_mut(op: &mut IROp, mut f: impl FnMut(&mut VarOrImm)) {
    match op {
        IROp::GetRegister { .. }
        | IROp::GetCPSR { .. }
        | IROp::GetSPSR { .. }
        | IROp::LoadCopRegister { .. }
        | IROp::Constant { .. }
        | IROp::GetBaseVectorAddress { .. }
        | IROp::CopyVar { .. } => {}
        IROp::SetRegister { value, .. } | IROp::SetCPSR { value } | IROp::SetSPSR { value, .. } => f(value),
        IROp::MemRead { address, .. } | IROp::Preload { address } => f(address),
        IROp::MemWrite { address, value, .. } => {
            f(address);
            f(value);
        }
        IROp::LogicalShiftLeft { value, amount, .. }
        | IROp::LogicalShiftRight { value, amount, .. }
        | IROp::ArithmeticShiftRight { value, amount, .. }
        | IROp::RotateRight { value, amount, .. } => {
            f(value);
            f(amount);
        }
        IROp::RotateRightExtended { value, carry_in, .. } => {
            f(value);
            f(carry_in);
        }
        IROp::BitwiseAnd { lhs, rhs, .. }
        | IROp::BitwiseOr { lhs, rhs, .. }
        | IROp::BitwiseXor { lhs, rhs, .. }
        | IROp::BitClear { lhs, rhs, .. }
        | IROp::Add { lhs, rhs, .. }
        | IROp::AddCarry { lhs, rhs, .. }
        | IROp::Subtract { lhs, rhs, .. }
        | IROp::SubtractCarry { lhs, rhs, .. }
        | IROp::SaturatingAdd { lhs, rhs, .. }
        | IROp::SaturatingSubtract { lhs, rhs, .. } => {
            f(lhs);
            f(rhs);
        }
        IROp::CountLeadingZeros { value, .. } => f(value),
        IROp::Move { value, .. } | IROp::MoveNegated { value, .. } => f(value),
        IROp::Multiply { lhs, rhs, accumulate, .. } => {
            f(lhs);
            f(rhs);
            if let Some(acc) = accumulate {
                f(acc);
            }
        }
        IROp::MultiplyLong { lhs, rhs, acc_lo, acc_hi, .. } => {
            f(lhs);
            f(rhs);
            f(acc_lo);
            f(acc_hi);
        }
        IROp::StoreFlags { value, .. } => f(value),
        IROp::LoadFlags { cpsr_value, .. } => f(cpsr_value),
        IROp::LoadStickyOverflow { cpsr_value, value, .. } => {
            f(cpsr_value);
            f(value);
        }
        IROp::Branch { target } | IROp::BranchExchange { target } => f(target),
        IROp::StoreCopRegister { value, .. } => f(value),
    }
}

/// The destination of ops that produce a second value alongside
/// `primary_dst`: a shift/rotate's optional carry-out, or `MultiplyLong`'s
/// high word.
pub fn secondary_dst(op: &IROp) -> Option<Variable> {
    match *op {
        IROp::LogicalShiftLeft { carry_out, .. }
        | IROp::LogicalShiftRight { carry_out, .. }
        | IROp::ArithmeticShiftRight { carry_out, .. }
        | IROp::RotateRight { carry_out, .. }
        | IROp::RotateRightExtended { carry_out, .. } => carry_out,
        IROp::MultiplyLong { dst_hi, .. } => Some(dst_hi),
        _ => None,
    }
}

/// Drives a rewrite phase forward over `block`, calling `step` once per live
/// op. `step` may erase or overwrite the op at the given cursor; it reports
/// whether it changed anything. Mirrors the fixed cursor-advance contract
/// `Emitter` exposes: a step that repositions the cursor itself is never
/// double-advanced.
pub fn drive(block: &mut BasicBlock, mut step: impl FnMut(&mut Emitter, OpIndex) -> bool) -> bool {
    let mut emitter = Emitter::new(block);
    let mut dirty = false;
    loop {
        let Some(index) = emitter.current() else { break };
        if step(&mut emitter, index) {
            dirty = true;
        }
        if !emitter.advance() {
            break;
        }
    }
    dirty
}
