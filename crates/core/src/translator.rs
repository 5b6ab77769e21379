//! ARM/Thumb guest code to IR translation.
//!
//! Fetches and decodes guest instructions from a [`LocationRef`] one at a
//! time, emitting IR into a fresh [`BasicBlock`] until control flow leaves
//! the block, the shared condition would have to change, or the configured
//! block-size limit is reached.
//!
//! Every arithmetic/logical [`IROp`] carries its own `set_flags` flag and is
//! responsible for NZCV on its own terms, the same way `arith.rs`'s flagged
//! primitives are. The one case an ALU op cannot account for on its own is
//! the barrel shifter's carry-out feeding into the C flag for logical
//! operations (AND/EOR/TST/TEQ/ORR/MOV/BIC/MVN) — the shift happens before
//! the op sees its operand, so the translator emits a follow-up
//! `StoreFlags` limited to C whenever a register-specified or immediate
//! shift produced a carry-out.
//!
//! A handful of rarely-hit encodings (atomic swap, saturating arithmetic,
//! the ARMv5TE DSP multiply extensions, coprocessor transfers, Thumb's long
//! branch-with-link, and Thumb's conditional branch — whose taken/not-taken
//! split the single-terminal block model cannot represent) are deliberately
//! not lowered to IR here: the translator closes the block with
//! [`Terminal::Return`] at that instruction instead, handing it back to the
//! scalar interpreter. This mirrors how the reference recompiler defers
//! genuinely rare or awkward-to-model paths to its interpreter fallback
//! rather than growing every pass to handle them.

use crate::common::mode::Mode;
use crate::config::{Config, CpuVariant};
use crate::ir::basic_block::{BasicBlock, LocationRef, Terminal};
use crate::ir::op::{Flag, FlagSet, GprArg, IROp, VarOrImm};
use crate::ir::variable::Variable;
use crate::isa::decode::{classify_arm_opcode, thumb_table, thumb_table_index};
use crate::isa::instruction::{AluOp, ArmOpKind, HalfwordKind, ImmediateOpKind, ShiftKind, ThumbOpKind};
use crate::memory::{AccessSize, MemoryInterface};

/// Translates guest code starting at a given location into one `BasicBlock`.
pub struct Translator<'m, M: MemoryInterface> {
    mem: &'m M,
    max_block_size: u32,
    cpu_variant: CpuVariant,
}

impl<'m, M: MemoryInterface> Translator<'m, M> {
    /// Builds a translator reading from `mem`, bounded by `config`'s
    /// translator settings.
    #[must_use]
    pub fn new(mem: &'m M, config: &Config) -> Self {
        Self { mem, max_block_size: config.translator.max_block_size, cpu_variant: config.cpu_variant }
    }

    /// Translates one basic block starting at `location`.
    #[must_use]
    pub fn translate(&self, location: LocationRef) -> BasicBlock {
        if location.thumb {
            self.translate_thumb(location)
        } else {
            self.translate_arm(location)
        }
    }

    fn translate_arm(&self, location: LocationRef) -> BasicBlock {
        let mut pc = location.pc;
        let mut block = BasicBlock::new(location, 0xE);
        let mut condition_fixed = false;

        loop {
            let opcode = self.mem.peek_word(pc);
            let cond = opcode >> 28;
            let kind = classify_arm_opcode(opcode, self.cpu_variant);

            if !condition_fixed {
                block = BasicBlock::new(location, cond);
                condition_fixed = true;
            } else if cond != block.condition() && cond != 0xF {
                block.set_terminal(Terminal::DirectLink(LocationRef { pc, ..location }));
                return block;
            }

            let next_pc = pc.wrapping_add(4);
            let outcome = translate_arm_op(&mut block, opcode, kind, next_pc);
            block.record_instruction();

            if let StepOutcome::Terminate(terminal) = outcome {
                block.set_terminal(terminal);
                return block;
            }

            pc = next_pc;
            if block.instruction_count() >= self.max_block_size {
                block.set_terminal(Terminal::DirectLink(LocationRef { pc, ..location }));
                return block;
            }
        }
    }

    fn translate_thumb(&self, location: LocationRef) -> BasicBlock {
        let mut pc = location.pc;
        let mut block = BasicBlock::new(location, 0xE);

        loop {
            let opcode = self.mem.peek_half(pc);
            let kind = thumb_table()[thumb_table_index(opcode)];
            let next_pc = pc.wrapping_add(2);

            let outcome = translate_thumb_op(&mut block, opcode, kind, next_pc);
            block.record_instruction();

            if let StepOutcome::Terminate(terminal) = outcome {
                block.set_terminal(terminal);
                return block;
            }

            pc = next_pc;
            if block.instruction_count() >= self.max_block_size {
                block.set_terminal(Terminal::DirectLink(LocationRef { pc, ..location }));
                return block;
            }
        }
    }
}

enum StepOutcome {
    Continue,
    Terminate(Terminal),
}

fn gpr(mode: Mode, index: u32) -> GprArg {
    GprArg { gpr: index as u8, mode }
}

fn emit_get_gpr(block: &mut BasicBlock, mode: Mode, index: u32) -> Variable {
    let dst = block.alloc_variable();
    block.push_back(IROp::GetRegister { dst, src: gpr(mode, index) });
    dst
}

fn emit_set_gpr(block: &mut BasicBlock, mode: Mode, index: u32, value: VarOrImm) {
    block.push_back(IROp::SetRegister { dst: gpr(mode, index), value });
}

/// Stores the shifter's carry-out into the host C flag. Only meaningful for
/// the logical/move family, whose own `set_flags` cannot see past its
/// already-shifted operand.
fn store_shifter_carry(block: &mut BasicBlock, carry_out: Variable) {
    block.push_back(IROp::StoreFlags { flags: FlagSet::NONE.with(Flag::C), value: VarOrImm::Var(carry_out) });
}

/// Emits the barrel shifter for a register operand, returning the shifted
/// value and its carry-out.
fn emit_shifted_operand(
    block: &mut BasicBlock,
    mode: Mode,
    shift: ShiftKind,
    rm: u32,
    amount: VarOrImm,
    imm_form: bool,
) -> (Variable, Variable) {
    let value = VarOrImm::Var(emit_get_gpr(block, mode, rm));
    let dst = block.alloc_variable();
    let carry_out = block.alloc_variable();
    let op = match shift {
        ShiftKind::Lsl => IROp::LogicalShiftLeft { dst, carry_out: Some(carry_out), value, amount, imm_form },
        ShiftKind::Lsr => IROp::LogicalShiftRight { dst, carry_out: Some(carry_out), value, amount, imm_form },
        ShiftKind::Asr => IROp::ArithmeticShiftRight { dst, carry_out: Some(carry_out), value, amount, imm_form },
        ShiftKind::Ror if imm_form && matches!(amount, VarOrImm::Imm(0)) => {
            let carry_in = current_carry_flag(block);
            IROp::RotateRightExtended { dst, carry_out: Some(carry_out), value, carry_in }
        }
        ShiftKind::Ror => IROp::RotateRight { dst, carry_out: Some(carry_out), value, amount, imm_form },
    };
    block.push_back(op);
    (dst, carry_out)
}

/// Reads the current host C flag as a lone 0/1 value, for RRX's carry-in.
fn current_carry_flag(block: &mut BasicBlock) -> VarOrImm {
    let dst = block.alloc_variable();
    block.push_back(IROp::LoadFlags { dst, flags: FlagSet::NONE.with(Flag::C), cpsr_value: VarOrImm::Imm(0) });
    VarOrImm::Var(dst)
}

/// Operand 2 of a data-processing instruction: immediate-with-rotate, or a
/// register optionally shifted by an immediate or register amount. Returns
/// the operand value and, if a shift occurred, its carry-out.
fn translate_operand2(block: &mut BasicBlock, mode: Mode, opcode: u32, immediate: bool) -> (VarOrImm, Option<Variable>) {
    if immediate {
        let imm = opcode & 0xFF;
        let rotate = (opcode >> 8) & 0xF;
        if rotate == 0 {
            (VarOrImm::Imm(imm), None)
        } else {
            let rotated = block.alloc_variable();
            let carry_out = block.alloc_variable();
            block.push_back(IROp::RotateRight {
                dst: rotated,
                carry_out: Some(carry_out),
                value: VarOrImm::Imm(imm),
                amount: VarOrImm::Imm(rotate * 2),
                imm_form: false,
            });
            (VarOrImm::Var(rotated), Some(carry_out))
        }
    } else {
        let rm = opcode & 0xF;
        let shift_kind = ShiftKind::from_bits(opcode >> 5);
        let (amount, imm_form) = if opcode & 0x10 != 0 {
            let rs = emit_get_gpr(block, mode, (opcode >> 8) & 0xF);
            let masked = block.alloc_variable();
            block.push_back(IROp::BitwiseAnd { dst: masked, lhs: VarOrImm::Var(rs), rhs: VarOrImm::Imm(0xFF), set_flags: false });
            (VarOrImm::Var(masked), false)
        } else {
            (VarOrImm::Imm((opcode >> 7) & 0x1F), true)
        };
        let (result, carry_out) = emit_shifted_operand(block, mode, shift_kind, rm, amount, imm_form);
        (VarOrImm::Var(result), Some(carry_out))
    }
}

fn translate_arm_op(block: &mut BasicBlock, opcode: u32, kind: ArmOpKind, next_pc: u32) -> StepOutcome {
    let mode = Mode::User; // GprArg banking resolves at execution time from the live mode; the
                            // IR itself only records which bank an access targets.
    match kind {
        ArmOpKind::DataProcessing { immediate, op, set_flags } => {
            let rn_idx = (opcode >> 16) & 0xF;
            let rd_idx = (opcode >> 12) & 0xF;
            let rn = VarOrImm::Var(emit_get_gpr(block, mode, rn_idx));
            let (op2, shifter_carry) = translate_operand2(block, mode, opcode, immediate);

            if rd_idx == 15 {
                // ALU write to PC leaves the block; the interpreter handles
                // the CPSR-restore-from-SPSR edge case directly.
                return StepOutcome::Terminate(Terminal::IndirectLink);
            }

            let dst = block.alloc_variable();
            let is_logical = matches!(
                op,
                AluOp::And | AluOp::Eor | AluOp::Tst | AluOp::Teq | AluOp::Orr | AluOp::Mov | AluOp::Bic | AluOp::Mvn
            );
            let ir_op = match op {
                AluOp::And | AluOp::Tst => IROp::BitwiseAnd { dst, lhs: rn, rhs: op2, set_flags },
                AluOp::Eor | AluOp::Teq => IROp::BitwiseXor { dst, lhs: rn, rhs: op2, set_flags },
                AluOp::Sub | AluOp::Cmp => IROp::Subtract { dst, lhs: rn, rhs: op2, set_flags },
                AluOp::Rsb => IROp::Subtract { dst, lhs: op2, rhs: rn, set_flags },
                AluOp::Add | AluOp::Cmn => IROp::Add { dst, lhs: rn, rhs: op2, set_flags },
                AluOp::Adc => IROp::AddCarry { dst, lhs: rn, rhs: op2, set_flags },
                AluOp::Sbc => IROp::SubtractCarry { dst, lhs: rn, rhs: op2, set_flags },
                AluOp::Rsc => IROp::SubtractCarry { dst, lhs: op2, rhs: rn, set_flags },
                AluOp::Orr => IROp::BitwiseOr { dst, lhs: rn, rhs: op2, set_flags },
                AluOp::Mov => IROp::Move { dst, value: op2, set_flags },
                AluOp::Bic => IROp::BitClear { dst, lhs: rn, rhs: op2, set_flags },
                AluOp::Mvn => IROp::MoveNegated { dst, value: op2, set_flags },
            };
            block.push_back(ir_op);

            if op.writes_result() {
                emit_set_gpr(block, mode, rd_idx, VarOrImm::Var(dst));
            }
            if set_flags && is_logical {
                if let Some(carry) = shifter_carry {
                    store_shifter_carry(block, carry);
                }
            }
            StepOutcome::Continue
        }
        ArmOpKind::Multiply { accumulate, set_flags } => {
            let rd_idx = (opcode >> 16) & 0xF;
            let rs = VarOrImm::Var(emit_get_gpr(block, mode, (opcode >> 8) & 0xF));
            let rm = VarOrImm::Var(emit_get_gpr(block, mode, opcode & 0xF));
            let acc = if accumulate { Some(VarOrImm::Var(emit_get_gpr(block, mode, (opcode >> 12) & 0xF))) } else { None };
            let dst = block.alloc_variable();
            block.push_back(IROp::Multiply { dst, lhs: rm, rhs: rs, accumulate: acc, set_flags });
            emit_set_gpr(block, mode, rd_idx, VarOrImm::Var(dst));
            StepOutcome::Continue
        }
        ArmOpKind::MultiplyLong { signed, accumulate, set_flags } => {
            let dst_lo_idx = (opcode >> 12) & 0xF;
            let dst_hi_idx = (opcode >> 16) & 0xF;
            let rs = VarOrImm::Var(emit_get_gpr(block, mode, (opcode >> 8) & 0xF));
            let rm = VarOrImm::Var(emit_get_gpr(block, mode, opcode & 0xF));
            let acc_lo = if accumulate { VarOrImm::Var(emit_get_gpr(block, mode, dst_lo_idx)) } else { VarOrImm::Imm(0) };
            let acc_hi = if accumulate { VarOrImm::Var(emit_get_gpr(block, mode, dst_hi_idx)) } else { VarOrImm::Imm(0) };
            let dst_lo = block.alloc_variable();
            let dst_hi = block.alloc_variable();
            block.push_back(IROp::MultiplyLong { dst_lo, dst_hi, lhs: rm, rhs: rs, signed, accumulate, acc_lo, acc_hi, set_flags });
            emit_set_gpr(block, mode, dst_lo_idx, VarOrImm::Var(dst_lo));
            emit_set_gpr(block, mode, dst_hi_idx, VarOrImm::Var(dst_hi));
            StepOutcome::Continue
        }
        ArmOpKind::BranchExchange { link } => {
            if link {
                emit_set_gpr(block, mode, 14, VarOrImm::Imm(next_pc));
            }
            StepOutcome::Terminate(Terminal::IndirectLink)
        }
        ArmOpKind::SingleDataTransfer { immediate_offset, pre_indexed, add, byte, writeback, load } => {
            translate_single_transfer(block, mode, opcode, immediate_offset, pre_indexed, add, byte, writeback, load)
        }
        ArmOpKind::BlockDataTransfer { pre_indexed, add, user_bank, writeback, load } => {
            translate_block_transfer(block, mode, opcode, pre_indexed, add, user_bank, writeback, load)
        }
        ArmOpKind::Branch { link } => {
            if link {
                emit_set_gpr(block, mode, 14, VarOrImm::Imm(next_pc));
            }
            let offset = sign_extend_24(opcode & 0xFF_FFFF) << 2;
            let target = (i64::from(next_pc) + i64::from(offset)) as u32;
            StepOutcome::Terminate(Terminal::DirectLink(LocationRef { pc: target, mode: Mode::Supervisor, thumb: false }))
        }
        ArmOpKind::BranchLinkExchange { h } => {
            emit_set_gpr(block, mode, 14, VarOrImm::Imm(next_pc));
            let offset = (sign_extend_24(opcode & 0xFF_FFFF) << 2) | if h { 2 } else { 0 };
            let target = (i64::from(next_pc) + i64::from(offset)) as u32;
            StepOutcome::Terminate(Terminal::DirectLink(LocationRef { pc: target, mode: Mode::Supervisor, thumb: true }))
        }
        ArmOpKind::SoftwareInterrupt | ArmOpKind::Undefined => StepOutcome::Terminate(Terminal::Return),
        ArmOpKind::CountLeadingZeros => {
            let rd_idx = (opcode >> 12) & 0xF;
            let rm = VarOrImm::Var(emit_get_gpr(block, mode, opcode & 0xF));
            let dst = block.alloc_variable();
            block.push_back(IROp::CountLeadingZeros { dst, value: rm });
            emit_set_gpr(block, mode, rd_idx, VarOrImm::Var(dst));
            StepOutcome::Continue
        }
        ArmOpKind::HalfwordTransfer { pre_indexed, add, immediate_offset, writeback, load, kind } => {
            if matches!(kind, HalfwordKind::Doubleword) {
                return StepOutcome::Terminate(Terminal::Return);
            }
            translate_halfword_transfer(block, mode, opcode, pre_indexed, add, immediate_offset, writeback, load, kind)
        }
        ArmOpKind::SingleDataSwap { .. }
        | ArmOpKind::SaturatingAddSub
        | ArmOpKind::SignedHalfwordMultiply
        | ArmOpKind::Preload
        | ArmOpKind::CoprocessorDataTransfer
        | ArmOpKind::CoprocessorOp => StepOutcome::Terminate(Terminal::Return),
    }
}

#[allow(clippy::too_many_arguments)]
fn translate_single_transfer(
    block: &mut BasicBlock,
    mode: Mode,
    opcode: u32,
    immediate_offset: bool,
    pre_indexed: bool,
    add: bool,
    byte: bool,
    writeback: bool,
    load: bool,
) -> StepOutcome {
    let rn_idx = (opcode >> 16) & 0xF;
    let rd_idx = (opcode >> 12) & 0xF;
    let base = emit_get_gpr(block, mode, rn_idx);
    let offset = if immediate_offset {
        VarOrImm::Imm(opcode & 0xFFF)
    } else {
        let rm = opcode & 0xF;
        let shift_kind = ShiftKind::from_bits(opcode >> 5);
        let amount = VarOrImm::Imm((opcode >> 7) & 0x1F);
        let (result, _) = emit_shifted_operand(block, mode, shift_kind, rm, amount, true);
        VarOrImm::Var(result)
    };

    let indexed = block.alloc_variable();
    block.push_back(if add {
        IROp::Add { dst: indexed, lhs: VarOrImm::Var(base), rhs: offset, set_flags: false }
    } else {
        IROp::Subtract { dst: indexed, lhs: VarOrImm::Var(base), rhs: offset, set_flags: false }
    });

    let effective = if pre_indexed { indexed } else { base };
    let size = if byte { AccessSize::Byte } else { AccessSize::Word };

    if load {
        let dst = block.alloc_variable();
        block.push_back(IROp::MemRead { dst, address: VarOrImm::Var(effective), size, sign_extend: false });
        if rd_idx == 15 {
            if !pre_indexed || writeback {
                emit_set_gpr(block, mode, rn_idx, VarOrImm::Var(indexed));
            }
            return StepOutcome::Terminate(Terminal::IndirectLink);
        }
        emit_set_gpr(block, mode, rd_idx, VarOrImm::Var(dst));
    } else {
        let value = VarOrImm::Var(emit_get_gpr(block, mode, rd_idx));
        block.push_back(IROp::MemWrite { address: VarOrImm::Var(effective), value, size });
    }

    if !pre_indexed || writeback {
        emit_set_gpr(block, mode, rn_idx, VarOrImm::Var(indexed));
    }
    StepOutcome::Continue
}

#[allow(clippy::too_many_arguments)]
fn translate_halfword_transfer(
    block: &mut BasicBlock,
    mode: Mode,
    opcode: u32,
    pre_indexed: bool,
    add: bool,
    immediate_offset: bool,
    writeback: bool,
    load: bool,
    kind: HalfwordKind,
) -> StepOutcome {
    let rn_idx = (opcode >> 16) & 0xF;
    let rd_idx = (opcode >> 12) & 0xF;
    let base = emit_get_gpr(block, mode, rn_idx);
    let offset = if immediate_offset {
        VarOrImm::Imm(((opcode >> 4) & 0xF0) | (opcode & 0xF))
    } else {
        VarOrImm::Var(emit_get_gpr(block, mode, opcode & 0xF))
    };
    let indexed = block.alloc_variable();
    block.push_back(if add {
        IROp::Add { dst: indexed, lhs: VarOrImm::Var(base), rhs: offset, set_flags: false }
    } else {
        IROp::Subtract { dst: indexed, lhs: VarOrImm::Var(base), rhs: offset, set_flags: false }
    });
    let effective = if pre_indexed { indexed } else { base };

    if load {
        let (size, sign_extend) = match kind {
            HalfwordKind::UnsignedHalf => (AccessSize::Half, false),
            HalfwordKind::SignedByte => (AccessSize::Byte, true),
            HalfwordKind::SignedHalf => (AccessSize::Half, true),
            HalfwordKind::Doubleword => unreachable!("filtered by caller"),
        };
        let dst = block.alloc_variable();
        block.push_back(IROp::MemRead { dst, address: VarOrImm::Var(effective), size, sign_extend });
        if rd_idx == 15 {
            if !pre_indexed || writeback {
                emit_set_gpr(block, mode, rn_idx, VarOrImm::Var(indexed));
            }
            return StepOutcome::Terminate(Terminal::IndirectLink);
        }
        emit_set_gpr(block, mode, rd_idx, VarOrImm::Var(dst));
    } else {
        let value = VarOrImm::Var(emit_get_gpr(block, mode, rd_idx));
        block.push_back(IROp::MemWrite { address: VarOrImm::Var(effective), value, size: AccessSize::Half });
    }

    if !pre_indexed || writeback {
        emit_set_gpr(block, mode, rn_idx, VarOrImm::Var(indexed));
    }
    StepOutcome::Continue
}

fn translate_block_transfer(
    block: &mut BasicBlock,
    mode: Mode,
    opcode: u32,
    pre_indexed: bool,
    add: bool,
    user_bank: bool,
    writeback: bool,
    load: bool,
) -> StepOutcome {
    let rn_idx = (opcode >> 16) & 0xF;
    let list = opcode & 0xFFFF;
    if list == 0 {
        return StepOutcome::Terminate(Terminal::Return);
    }

    let access_mode = if user_bank { Mode::User } else { mode };
    let mut cursor = emit_get_gpr(block, mode, rn_idx);
    let mut loads_pc = false;

    let step = |block: &mut BasicBlock, cursor: Variable, forward: bool| -> Variable {
        let dst = block.alloc_variable();
        let delta = VarOrImm::Imm(4);
        block.push_back(if forward {
            IROp::Add { dst, lhs: VarOrImm::Var(cursor), rhs: delta, set_flags: false }
        } else {
            IROp::Subtract { dst, lhs: VarOrImm::Var(cursor), rhs: delta, set_flags: false }
        });
        dst
    };

    let regs: Vec<u32> = (0..16).filter(|i| list & (1 << i) != 0).collect();
    let ordered: Vec<u32> = if add { regs } else { regs.into_iter().rev().collect() };

    for reg in ordered {
        if pre_indexed {
            cursor = step(block, cursor, add);
        }

        if load {
            let dst = block.alloc_variable();
            block.push_back(IROp::MemRead { dst, address: VarOrImm::Var(cursor), size: AccessSize::Word, sign_extend: false });
            if reg == 15 {
                loads_pc = true;
            }
            emit_set_gpr(block, access_mode, reg, VarOrImm::Var(dst));
        } else {
            let value = VarOrImm::Var(emit_get_gpr(block, access_mode, reg));
            block.push_back(IROp::MemWrite { address: VarOrImm::Var(cursor), value, size: AccessSize::Word });
        }

        if !pre_indexed {
            cursor = step(block, cursor, add);
        }
    }

    if writeback {
        emit_set_gpr(block, mode, rn_idx, VarOrImm::Var(cursor));
    }

    if loads_pc {
        StepOutcome::Terminate(Terminal::IndirectLink)
    } else {
        StepOutcome::Continue
    }
}

fn translate_thumb_op(block: &mut BasicBlock, opcode: u16, kind: ThumbOpKind, next_pc: u32) -> StepOutcome {
    let mode = Mode::User;
    let opcode = u32::from(opcode);
    match kind {
        ThumbOpKind::MoveShiftedRegister(shift) => {
            let rd_idx = opcode & 0x7;
            let rm = (opcode >> 3) & 0x7;
            let amount = VarOrImm::Imm((opcode >> 6) & 0x1F);
            let (result, carry) = emit_shifted_operand(block, mode, shift, rm, amount, true);
            emit_set_gpr(block, mode, rd_idx, VarOrImm::Var(result));
            store_shifter_carry(block, carry);
            StepOutcome::Continue
        }
        ThumbOpKind::AddSubtract { subtract, immediate } => {
            let rd_idx = opcode & 0x7;
            let rs = VarOrImm::Var(emit_get_gpr(block, mode, (opcode >> 3) & 0x7));
            let operand = if immediate {
                VarOrImm::Imm((opcode >> 6) & 0x7)
            } else {
                VarOrImm::Var(emit_get_gpr(block, mode, (opcode >> 6) & 0x7))
            };
            let dst = block.alloc_variable();
            block.push_back(if subtract {
                IROp::Subtract { dst, lhs: rs, rhs: operand, set_flags: true }
            } else {
                IROp::Add { dst, lhs: rs, rhs: operand, set_flags: true }
            });
            emit_set_gpr(block, mode, rd_idx, VarOrImm::Var(dst));
            StepOutcome::Continue
        }
        ThumbOpKind::ImmediateOp(op) => {
            let rd_idx = (opcode >> 8) & 0x7;
            let imm = VarOrImm::Imm(opcode & 0xFF);
            let rd = VarOrImm::Var(emit_get_gpr(block, mode, rd_idx));
            let dst = block.alloc_variable();
            let (ir_op, writes) = match op {
                ImmediateOpKind::Mov => (IROp::Move { dst, value: imm, set_flags: true }, true),
                ImmediateOpKind::Cmp => (IROp::Subtract { dst, lhs: rd, rhs: imm, set_flags: true }, false),
                ImmediateOpKind::Add => (IROp::Add { dst, lhs: rd, rhs: imm, set_flags: true }, true),
                ImmediateOpKind::Sub => (IROp::Subtract { dst, lhs: rd, rhs: imm, set_flags: true }, true),
            };
            block.push_back(ir_op);
            if writes {
                emit_set_gpr(block, mode, rd_idx, VarOrImm::Var(dst));
            }
            StepOutcome::Continue
        }
        ThumbOpKind::HiRegisterOpOrBranchExchange => {
            let h1 = opcode & 0x80 != 0;
            let rd_idx = (opcode & 0x7) | if h1 { 0x8 } else { 0 };
            let rs_idx = ((opcode >> 3) & 0x7) | ((opcode >> 3) & 0x8);
            let op = (opcode >> 8) & 0x3;
            match op {
                0b11 => StepOutcome::Terminate(Terminal::IndirectLink),
                0b00 => {
                    if rd_idx == 15 {
                        StepOutcome::Terminate(Terminal::IndirectLink)
                    } else {
                        let rd = VarOrImm::Var(emit_get_gpr(block, mode, rd_idx));
                        let rs = VarOrImm::Var(emit_get_gpr(block, mode, rs_idx));
                        let dst = block.alloc_variable();
                        block.push_back(IROp::Add { dst, lhs: rd, rhs: rs, set_flags: false });
                        emit_set_gpr(block, mode, rd_idx, VarOrImm::Var(dst));
                        StepOutcome::Continue
                    }
                }
                0b01 => {
                    let rd = VarOrImm::Var(emit_get_gpr(block, mode, rd_idx));
                    let rs = VarOrImm::Var(emit_get_gpr(block, mode, rs_idx));
                    let dst = block.alloc_variable();
                    block.push_back(IROp::Subtract { dst, lhs: rd, rhs: rs, set_flags: true });
                    StepOutcome::Continue
                }
                _ => {
                    if rd_idx == 15 {
                        StepOutcome::Terminate(Terminal::IndirectLink)
                    } else {
                        let rs = VarOrImm::Var(emit_get_gpr(block, mode, rs_idx));
                        emit_set_gpr(block, mode, rd_idx, rs);
                        StepOutcome::Continue
                    }
                }
            }
        }
        ThumbOpKind::PcRelativeLoad => {
            let rd_idx = (opcode >> 8) & 0x7;
            let imm = (opcode & 0xFF) * 4;
            let addr = (next_pc & !3).wrapping_add(imm);
            let dst = block.alloc_variable();
            block.push_back(IROp::MemRead { dst, address: VarOrImm::Imm(addr), size: AccessSize::Word, sign_extend: false });
            emit_set_gpr(block, mode, rd_idx, VarOrImm::Var(dst));
            StepOutcome::Continue
        }
        ThumbOpKind::LoadStoreRegisterOffset { byte, load } => {
            let rd_idx = opcode & 0x7;
            let base = VarOrImm::Var(emit_get_gpr(block, mode, (opcode >> 3) & 0x7));
            let offset = VarOrImm::Var(emit_get_gpr(block, mode, (opcode >> 6) & 0x7));
            let addr = block.alloc_variable();
            block.push_back(IROp::Add { dst: addr, lhs: base, rhs: offset, set_flags: false });
            emit_thumb_load_store(block, mode, rd_idx, VarOrImm::Var(addr), if byte { AccessSize::Byte } else { AccessSize::Word }, false, load);
            StepOutcome::Continue
        }
        ThumbOpKind::LoadStoreSignExtended { halfword, sign_extend } => {
            let rd_idx = opcode & 0x7;
            let base = VarOrImm::Var(emit_get_gpr(block, mode, (opcode >> 3) & 0x7));
            let offset = VarOrImm::Var(emit_get_gpr(block, mode, (opcode >> 6) & 0x7));
            let addr = block.alloc_variable();
            block.push_back(IROp::Add { dst: addr, lhs: base, rhs: offset, set_flags: false });
            let size = if halfword { AccessSize::Half } else { AccessSize::Byte };
            let dst = block.alloc_variable();
            block.push_back(IROp::MemRead { dst, address: VarOrImm::Var(addr), size, sign_extend });
            emit_set_gpr(block, mode, rd_idx, VarOrImm::Var(dst));
            StepOutcome::Continue
        }
        ThumbOpKind::LoadStoreImmediateOffset { byte, load } => {
            let rd_idx = opcode & 0x7;
            let base = VarOrImm::Var(emit_get_gpr(block, mode, (opcode >> 3) & 0x7));
            let imm = VarOrImm::Imm(((opcode >> 6) & 0x1F) * if byte { 1 } else { 4 });
            let addr = block.alloc_variable();
            block.push_back(IROp::Add { dst: addr, lhs: base, rhs: imm, set_flags: false });
            emit_thumb_load_store(block, mode, rd_idx, VarOrImm::Var(addr), if byte { AccessSize::Byte } else { AccessSize::Word }, false, load);
            StepOutcome::Continue
        }
        ThumbOpKind::LoadStoreHalfword { load } => {
            let rd_idx = opcode & 0x7;
            let base = VarOrImm::Var(emit_get_gpr(block, mode, (opcode >> 3) & 0x7));
            let imm = VarOrImm::Imm(((opcode >> 6) & 0x1F) * 2);
            let addr = block.alloc_variable();
            block.push_back(IROp::Add { dst: addr, lhs: base, rhs: imm, set_flags: false });
            emit_thumb_load_store(block, mode, rd_idx, VarOrImm::Var(addr), AccessSize::Half, false, load);
            StepOutcome::Continue
        }
        ThumbOpKind::SpRelativeLoadStore { load } => {
            let rd_idx = (opcode >> 8) & 0x7;
            let sp = VarOrImm::Var(emit_get_gpr(block, mode, 13));
            let imm = VarOrImm::Imm((opcode & 0xFF) * 4);
            let addr = block.alloc_variable();
            block.push_back(IROp::Add { dst: addr, lhs: sp, rhs: imm, set_flags: false });
            emit_thumb_load_store(block, mode, rd_idx, VarOrImm::Var(addr), AccessSize::Word, false, load);
            StepOutcome::Continue
        }
        ThumbOpKind::LoadAddress { stack_pointer } => {
            let rd_idx = (opcode >> 8) & 0x7;
            let imm = VarOrImm::Imm((opcode & 0xFF) * 4);
            let base = if stack_pointer { VarOrImm::Var(emit_get_gpr(block, mode, 13)) } else { VarOrImm::Imm(next_pc & !3) };
            let dst = block.alloc_variable();
            block.push_back(IROp::Add { dst, lhs: base, rhs: imm, set_flags: false });
            emit_set_gpr(block, mode, rd_idx, VarOrImm::Var(dst));
            StepOutcome::Continue
        }
        ThumbOpKind::AddOffsetToStackPointer => {
            let imm = VarOrImm::Imm((opcode & 0x7F) * 4);
            let sp = VarOrImm::Var(emit_get_gpr(block, mode, 13));
            let dst = block.alloc_variable();
            block.push_back(if opcode & 0x80 != 0 {
                IROp::Subtract { dst, lhs: sp, rhs: imm, set_flags: false }
            } else {
                IROp::Add { dst, lhs: sp, rhs: imm, set_flags: false }
            });
            emit_set_gpr(block, mode, 13, VarOrImm::Var(dst));
            StepOutcome::Continue
        }
        ThumbOpKind::PushPopRegisters { pop, store_lr_or_load_pc } => {
            translate_thumb_push_pop(block, mode, opcode, pop, store_lr_or_load_pc)
        }
        ThumbOpKind::MultipleLoadStore { load } => translate_thumb_multiple(block, mode, opcode, load),
        ThumbOpKind::ConditionalBranch => {
            // The taken/not-taken split a conditional branch needs cannot be
            // expressed by this block's single terminal; hand it back to the
            // interpreter rather than silently dropping the fall-through path.
            StepOutcome::Terminate(Terminal::Return)
        }
        ThumbOpKind::SoftwareInterrupt | ThumbOpKind::Undefined => StepOutcome::Terminate(Terminal::Return),
        ThumbOpKind::UnconditionalBranch => {
            let offset = sign_extend_11(opcode & 0x7FF) << 1;
            let target = (i64::from(next_pc) + i64::from(offset)) as u32;
            StepOutcome::Terminate(Terminal::DirectLink(LocationRef { pc: target, mode: Mode::Supervisor, thumb: true }))
        }
        ThumbOpKind::LongBranchWithLink => StepOutcome::Terminate(Terminal::Return),
        ThumbOpKind::AluOperation => translate_thumb_alu(block, mode, opcode),
    }
}

fn emit_thumb_load_store(
    block: &mut BasicBlock,
    mode: Mode,
    rd_idx: u32,
    addr: VarOrImm,
    size: AccessSize,
    sign_extend: bool,
    load: bool,
) {
    if load {
        let dst = block.alloc_variable();
        block.push_back(IROp::MemRead { dst, address: addr, size, sign_extend });
        emit_set_gpr(block, mode, rd_idx, VarOrImm::Var(dst));
    } else {
        let value = VarOrImm::Var(emit_get_gpr(block, mode, rd_idx));
        block.push_back(IROp::MemWrite { address: addr, value, size });
    }
}

fn translate_thumb_alu(block: &mut BasicBlock, mode: Mode, opcode: u32) -> StepOutcome {
    let rd_idx = opcode & 0x7;
    let rs = VarOrImm::Var(emit_get_gpr(block, mode, (opcode >> 3) & 0x7));
    let rd = VarOrImm::Var(emit_get_gpr(block, mode, rd_idx));
    let op = (opcode >> 6) & 0xF;
    let dst = block.alloc_variable();

    let (ir_op, writes, carry_out) = match op {
        0x0 => (IROp::BitwiseAnd { dst, lhs: rd, rhs: rs, set_flags: true }, true, None),
        0x1 => (IROp::BitwiseXor { dst, lhs: rd, rhs: rs, set_flags: true }, true, None),
        0x2 => {
            let carry = block.alloc_variable();
            (IROp::LogicalShiftLeft { dst, carry_out: Some(carry), value: rd, amount: rs, imm_form: false }, true, Some(carry))
        }
        0x3 => {
            let carry = block.alloc_variable();
            (IROp::LogicalShiftRight { dst, carry_out: Some(carry), value: rd, amount: rs, imm_form: false }, true, Some(carry))
        }
        0x4 => {
            let carry = block.alloc_variable();
            (IROp::ArithmeticShiftRight { dst, carry_out: Some(carry), value: rd, amount: rs, imm_form: false }, true, Some(carry))
        }
        0x5 => (IROp::AddCarry { dst, lhs: rd, rhs: rs, set_flags: true }, true, None),
        0x6 => (IROp::SubtractCarry { dst, lhs: rd, rhs: rs, set_flags: true }, true, None),
        0x7 => {
            let carry = block.alloc_variable();
            (IROp::RotateRight { dst, carry_out: Some(carry), value: rd, amount: rs, imm_form: false }, true, Some(carry))
        }
        0x8 => (IROp::BitwiseAnd { dst, lhs: rd, rhs: rs, set_flags: true }, false, None),
        0x9 => (IROp::Subtract { dst, lhs: VarOrImm::Imm(0), rhs: rs, set_flags: true }, true, None),
        0xA => (IROp::Subtract { dst, lhs: rd, rhs: rs, set_flags: true }, false, None),
        0xB => (IROp::Add { dst, lhs: rd, rhs: rs, set_flags: true }, false, None),
        0xC => (IROp::BitwiseOr { dst, lhs: rd, rhs: rs, set_flags: true }, true, None),
        0xD => (IROp::Multiply { dst, lhs: rd, rhs: rs, accumulate: None, set_flags: true }, true, None),
        0xE => (IROp::BitClear { dst, lhs: rd, rhs: rs, set_flags: true }, true, None),
        _ => (IROp::MoveNegated { dst, value: rs, set_flags: true }, true, None),
    };
    block.push_back(ir_op);
    if writes {
        emit_set_gpr(block, mode, rd_idx, VarOrImm::Var(dst));
    }
    if let Some(carry) = carry_out {
        store_shifter_carry(block, carry);
    }
    StepOutcome::Continue
}

fn translate_thumb_push_pop(block: &mut BasicBlock, mode: Mode, opcode: u32, pop: bool, store_lr_or_load_pc: bool) -> StepOutcome {
    let list = opcode & 0xFF;
    let regs: Vec<u32> = (0..8).filter(|i| list & (1 << i) != 0).collect();
    let mut cursor = emit_get_gpr(block, mode, 13);
    let mut loads_pc = false;

    let bump = |block: &mut BasicBlock, cursor: Variable, up: bool| -> Variable {
        let dst = block.alloc_variable();
        let delta = VarOrImm::Imm(4);
        block.push_back(if up {
            IROp::Add { dst, lhs: VarOrImm::Var(cursor), rhs: delta, set_flags: false }
        } else {
            IROp::Subtract { dst, lhs: VarOrImm::Var(cursor), rhs: delta, set_flags: false }
        });
        dst
    };

    if pop {
        for reg in regs {
            let dst = block.alloc_variable();
            block.push_back(IROp::MemRead { dst, address: VarOrImm::Var(cursor), size: AccessSize::Word, sign_extend: false });
            emit_set_gpr(block, mode, reg, VarOrImm::Var(dst));
            cursor = bump(block, cursor, true);
        }
        if store_lr_or_load_pc {
            let dst = block.alloc_variable();
            block.push_back(IROp::MemRead { dst, address: VarOrImm::Var(cursor), size: AccessSize::Word, sign_extend: false });
            emit_set_gpr(block, mode, 15, VarOrImm::Var(dst));
            cursor = bump(block, cursor, true);
            loads_pc = true;
        }
    } else {
        let total = regs.len() + usize::from(store_lr_or_load_pc);
        let mut base = cursor;
        for _ in 0..total {
            base = bump(block, base, false);
        }
        let mut write_cursor = base;
        for reg in &regs {
            let value = VarOrImm::Var(emit_get_gpr(block, mode, *reg));
            block.push_back(IROp::MemWrite { address: VarOrImm::Var(write_cursor), value, size: AccessSize::Word });
            write_cursor = bump(block, write_cursor, true);
        }
        if store_lr_or_load_pc {
            let lr = VarOrImm::Var(emit_get_gpr(block, mode, 14));
            block.push_back(IROp::MemWrite { address: VarOrImm::Var(write_cursor), value: lr, size: AccessSize::Word });
        }
        cursor = base;
    }

    emit_set_gpr(block, mode, 13, VarOrImm::Var(cursor));
    if loads_pc {
        StepOutcome::Terminate(Terminal::IndirectLink)
    } else {
        StepOutcome::Continue
    }
}

fn translate_thumb_multiple(block: &mut BasicBlock, mode: Mode, opcode: u32, load: bool) -> StepOutcome {
    let rb_idx = (opcode >> 8) & 0x7;
    let list = opcode & 0xFF;
    let regs: Vec<u32> = (0..8).filter(|i| list & (1 << i) != 0).collect();
    if regs.is_empty() {
        return StepOutcome::Terminate(Terminal::Return);
    }
    let mut cursor = emit_get_gpr(block, mode, rb_idx);

    for reg in &regs {
        if load {
            let dst = block.alloc_variable();
            block.push_back(IROp::MemRead { dst, address: VarOrImm::Var(cursor), size: AccessSize::Word, sign_extend: false });
            emit_set_gpr(block, mode, *reg, VarOrImm::Var(dst));
        } else {
            let value = VarOrImm::Var(emit_get_gpr(block, mode, *reg));
            block.push_back(IROp::MemWrite { address: VarOrImm::Var(cursor), value, size: AccessSize::Word });
        }
        let next = block.alloc_variable();
        block.push_back(IROp::Add { dst: next, lhs: VarOrImm::Var(cursor), rhs: VarOrImm::Imm(4), set_flags: false });
        cursor = next;
    }

    emit_set_gpr(block, mode, rb_idx, VarOrImm::Var(cursor));
    StepOutcome::Continue
}

const fn sign_extend_24(value: u32) -> i32 {
    ((value << 8) as i32) >> 8
}

const fn sign_extend_11(value: u32) -> i32 {
    ((value << 21) as i32) >> 21
}
