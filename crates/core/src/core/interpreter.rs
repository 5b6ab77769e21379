//! The scalar ARM7TDMI/ARM946E-S interpreter.
//!
//! `InterpreterCore` owns the register file, the two-slot fetch/decode
//! pipeline, and (on ARMv5TE) the CP15 coprocessor, and drives execution one
//! tick at a time against a host-provided [`MemoryInterface`]. This is the
//! reference execution path: the block cache and translator exist to skip
//! redundant decode work, never to change what gets executed.

use crate::arith;
use crate::common::error::GuestTrap;
use crate::common::mode::Mode;
use crate::config::Config;
use crate::cp15::Cp15;
use crate::isa::decode::{classify_arm_opcode, condition_table, thumb_table, thumb_table_index};
use crate::isa::instruction::{AluOp, ArmOpKind, HalfwordKind, ImmediateOpKind, ShiftKind, ThumbOpKind};
use crate::memory::{AccessKind, AccessSize, Bus, MemoryInterface};
use crate::reg::RegisterFile;

/// Width, in bytes, of one instruction in the current state.
const fn instruction_width(thumb: bool) -> u32 {
    if thumb { 2 } else { 4 }
}

/// The interpreter's run state, driving whether `run` advances at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ExecState {
    /// Normal execution.
    Run,
    /// Halted pending an interrupt (entered via CP15 WFI).
    Halt,
    /// Halted by an external caller; only an explicit `set_state` resumes it.
    Stop,
}

/// The two-slot fetch/decode pipeline. `slot1` always holds the most
/// recently fetched opcode at `pc`; `slot0` holds the opcode about to
/// execute, fetched one instruction width earlier. PC therefore always
/// points two instruction widths ahead of the executing instruction.
#[derive(Clone, Copy, Debug, Default)]
struct Pipeline {
    slot0: u32,
    slot1: u32,
}

/// The scalar interpreter over a host-provided memory bus.
pub struct InterpreterCore<M: MemoryInterface> {
    regs: RegisterFile,
    pipeline: Pipeline,
    state: ExecState,
    cp15: Option<Cp15>,
    config: Config,
    /// Cleared by any handler that retargets the pipeline (branches,
    /// exceptions, mode switches); read by the block-cache execution loop
    /// to decide whether to keep running the cached block.
    cache_valid: bool,
    mem: M,
}

impl<M: MemoryInterface> InterpreterCore<M> {
    /// Builds a fresh interpreter with the given memory bus and
    /// configuration, reset to the power-on state.
    #[must_use]
    pub fn new(mem: M, config: Config) -> Self {
        let cp15 = config.cpu_variant.has_cp15().then(Cp15::default);
        let mut core = Self {
            regs: RegisterFile::default(),
            pipeline: Pipeline::default(),
            state: ExecState::Run,
            cp15,
            config,
            cache_valid: true,
            mem,
        };
        core.enter_exception(GuestTrap::Reset);
        core
    }

    /// Returns the register file.
    #[must_use]
    pub fn regs(&self) -> &RegisterFile {
        &self.regs
    }

    /// Returns a mutable reference to the register file.
    pub fn regs_mut(&mut self) -> &mut RegisterFile {
        &mut self.regs
    }

    /// Returns the current run state.
    #[must_use]
    pub fn state(&self) -> ExecState {
        self.state
    }

    /// Sets the run state directly (external Stop/Run control).
    pub fn set_state(&mut self, state: ExecState) {
        self.state = state;
    }

    /// Whether the pipeline still matches the block the caller is iterating.
    /// Cleared by any handler that retargets the pipeline; read by the block
    /// cache's cached execution loop to decide whether to keep running.
    pub(crate) fn cache_valid(&self) -> bool {
        self.cache_valid
    }

    /// Re-arms `cache_valid` before resuming a cached block.
    pub(crate) fn set_cache_valid(&mut self, valid: bool) {
        self.cache_valid = valid;
    }

    /// Whether CPSR currently selects the Thumb instruction set.
    pub(crate) fn is_thumb(&self) -> bool {
        self.regs.cpsr().thumb()
    }

    /// The two fetch-pipeline slots, `[slot0, slot1]`.
    pub(crate) fn pipeline_slots(&self) -> [u32; 2] {
        [self.pipeline.slot0, self.pipeline.slot1]
    }

    /// Restores both fetch-pipeline slots directly, for snapshot restore.
    pub(crate) fn set_pipeline_slots(&mut self, slots: [u32; 2]) {
        self.pipeline.slot0 = slots[0];
        self.pipeline.slot1 = slots[1];
    }

    /// The CPU variant this core was configured for.
    #[must_use]
    pub fn cpu_variant(&self) -> crate::config::CpuVariant {
        self.config.cpu_variant
    }

    /// The opcode currently staged in the executing pipeline slot.
    pub(crate) fn pipeline_slot0(&self) -> u32 {
        self.pipeline.slot0
    }

    /// Address of the instruction about to execute: PC minus two
    /// instruction widths, per the pipeline's lookahead invariant.
    pub(crate) fn current_pc_address(&self) -> u32 {
        let width = instruction_width(self.is_thumb());
        self.regs.pc().wrapping_sub(2 * width)
    }

    /// Returns a reference to the host memory bus.
    #[must_use]
    pub fn memory(&self) -> &M {
        &self.mem
    }

    /// Returns a mutable reference to the host memory bus.
    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.mem
    }

    /// Returns CP15, if this core's variant has one.
    #[must_use]
    pub fn cp15(&self) -> Option<&Cp15> {
        self.cp15.as_ref()
    }

    /// Returns mutable CP15, if this core's variant has one.
    pub fn cp15_mut(&mut self) -> Option<&mut Cp15> {
        self.cp15.as_mut()
    }

    /// Runs up to `cycles` cycles, returning the number actually consumed.
    /// Returns 0 immediately while halted or stopped.
    pub fn run(&mut self, cycles: u64) -> u64 {
        if self.state != ExecState::Run {
            return 0;
        }
        let mut consumed = 0;
        while consumed < cycles && self.state == ExecState::Run {
            consumed += self.tick();
        }
        consumed
    }

    /// Executes exactly one instruction tick, returning its cycle cost.
    pub fn tick(&mut self) -> u64 {
        let thumb = self.regs.cpsr().thumb();
        let opcode = self.pipeline.slot0;
        self.advance_pipeline(thumb);

        if thumb {
            self.tick_thumb(opcode as u16)
        } else {
            self.tick_arm(opcode)
        }
    }

    /// Shifts the pipeline forward: the previously-fetched slot becomes the
    /// executing slot, and a fresh fetch fills the other slot from the
    /// current PC.
    pub(crate) fn advance_pipeline(&mut self, thumb: bool) {
        self.pipeline.slot0 = self.pipeline.slot1;
        let pc = self.regs.pc();
        self.pipeline.slot1 = if thumb {
            u32::from(self.mem.read_half(pc & !1))
        } else {
            self.mem.read_word(pc & !3)
        };
        let width = instruction_width(thumb);
        self.regs.set_pc(pc.wrapping_add(width));
    }

    /// Reloads both pipeline slots from `pc` (used after any retarget).
    /// Leaves `cache_valid` cleared so the caller's execution loop exits.
    fn reload_pipeline(&mut self, pc: u32) {
        let thumb = self.regs.cpsr().thumb();
        let width = instruction_width(thumb);
        let aligned = if thumb { pc & !1 } else { pc & !3 };
        if thumb {
            self.pipeline.slot0 = u32::from(self.mem.read_half(aligned));
            self.pipeline.slot1 = u32::from(self.mem.read_half(aligned.wrapping_add(width)));
        } else {
            self.pipeline.slot0 = self.mem.read_word(aligned);
            self.pipeline.slot1 = self.mem.read_word(aligned.wrapping_add(width));
        }
        self.regs.set_pc(aligned.wrapping_add(2 * width));
        self.cache_valid = false;
    }

    /// Branches to `target`, optionally switching Thumb state (bit 0 of
    /// `target` selects Thumb when `exchange` is set).
    fn branch_to(&mut self, target: u32, exchange: bool) {
        if exchange {
            let thumb = target & 1 != 0;
            self.regs.cpsr_mut().set_thumb(thumb);
        }
        self.reload_pipeline(target);
    }

    /// Returns the access-cycle cost for one access, consulting the memory
    /// interface's own timing model when configured to.
    fn access_cycles(&self, addr: u32, bus: Bus, kind: AccessKind, size: AccessSize) -> u64 {
        if self.config.use_memory_interface_access_timings {
            self.mem.access_cycles(addr, bus, kind, size)
        } else {
            1
        }
    }

    /// Enters an exception vector: banks CPSR into the target mode's SPSR,
    /// switches mode/state, computes the link-register offset, and branches
    /// to the vector address. See the module-level exception-entry contract.
    pub fn enter_exception(&mut self, trap: GuestTrap) {
        let info = trap.info();
        let thumb = self.regs.cpsr().thumb();
        let faulting_pc = self.regs.pc().wrapping_sub(2 * instruction_width(thumb));

        tracing::debug!(?trap, vector = trap.vector_number(), pc = faulting_pc, "entering exception");

        let old_cpsr = self.regs.cpsr();
        *self.regs.spsr_mut(info.mode.bank()) = old_cpsr;

        let mut new_cpsr = old_cpsr;
        new_cpsr.set_mode(info.mode);
        new_cpsr.set_thumb(false);
        new_cpsr.set_irq_disable(true);
        if info.sets_f {
            new_cpsr.set_fiq_disable(true);
        }
        *self.regs.cpsr_mut() = new_cpsr;

        let offset = if thumb { info.thumb_offset } else { info.arm_offset };
        *self.regs.gpr_mut(14, info.mode) = faulting_pc.wrapping_add(offset);

        let base = self.vector_base();
        self.reload_pipeline(base + trap.vector_number() * 4);
    }

    /// The exception vector base address: `0xFFFF0000` when CP15's high
    /// vector bit is set (ARMv5TE only), otherwise `0x00000000`.
    fn vector_base(&self) -> u32 {
        match &self.cp15 {
            Some(cp15) if cp15.high_vectors() => 0xFFFF_0000,
            _ => 0x0000_0000,
        }
    }

    /// Evaluates an ARM condition field against the current CPSR flags.
    pub(crate) fn condition_passes(&self, cond: u32) -> bool {
        if cond == 0xF {
            // `cond == 0xF` opcodes are unconditional by definition; their
            // kind is resolved by `classify_arm_opcode`'s special table
            // rather than the flag-test table this function wraps.
            return true;
        }
        let index = ((self.regs.cpsr().nzcv_nibble() << 4) | cond) as usize;
        condition_table()[index]
    }

    fn tick_arm(&mut self, opcode: u32) -> u64 {
        let cond = opcode >> 28;
        if !self.condition_passes(cond) {
            return self.access_cycles(self.regs.pc(), Bus::Code, AccessKind::Sequential, AccessSize::Word);
        }
        let kind = classify_arm_opcode(opcode, self.config.cpu_variant);
        self.execute_arm(kind, opcode)
    }

    fn tick_thumb(&mut self, opcode: u16) -> u64 {
        let kind = thumb_table()[thumb_table_index(opcode)];
        self.execute_thumb(kind, opcode)
    }

    /// Current processor mode, used for banked-register addressing.
    fn mode(&self) -> Mode {
        self.regs.cpsr().mode()
    }

    pub(crate) fn execute_arm(&mut self, kind: ArmOpKind, opcode: u32) -> u64 {
        match kind {
            ArmOpKind::DataProcessing { immediate, op, set_flags } => {
                self.exec_data_processing(opcode, immediate, op, set_flags)
            }
            ArmOpKind::Multiply { accumulate, set_flags } => self.exec_multiply(opcode, accumulate, set_flags),
            ArmOpKind::MultiplyLong { signed, accumulate, set_flags } => {
                self.exec_multiply_long(opcode, signed, accumulate, set_flags)
            }
            ArmOpKind::BranchExchange { link } => self.exec_branch_exchange(opcode, link),
            ArmOpKind::SingleDataTransfer { immediate_offset, pre_indexed, add, byte, writeback, load } => {
                self.exec_single_data_transfer(opcode, immediate_offset, pre_indexed, add, byte, writeback, load)
            }
            ArmOpKind::BlockDataTransfer { pre_indexed, add, user_bank, writeback, load } => {
                self.exec_block_data_transfer(opcode, pre_indexed, add, user_bank, writeback, load)
            }
            ArmOpKind::Branch { link } => self.exec_branch(opcode, link),
            ArmOpKind::BranchLinkExchange { h } => self.exec_branch_link_exchange(opcode, h),
            ArmOpKind::SoftwareInterrupt => {
                self.enter_exception(GuestTrap::SoftwareInterrupt);
                2
            }
            ArmOpKind::CountLeadingZeros => self.exec_clz(opcode),
            ArmOpKind::SingleDataSwap { byte } => self.exec_swap(opcode, byte),
            ArmOpKind::HalfwordTransfer { pre_indexed, add, immediate_offset, writeback, load, kind } => {
                self.exec_halfword_transfer(opcode, pre_indexed, add, immediate_offset, writeback, load, kind)
            }
            ArmOpKind::SaturatingAddSub => self.exec_saturating_add_sub(opcode),
            ArmOpKind::SignedHalfwordMultiply => self.exec_signed_halfword_multiply(opcode),
            ArmOpKind::Preload | ArmOpKind::CoprocessorDataTransfer | ArmOpKind::CoprocessorOp => {
                self.exec_coprocessor_or_extension(opcode, kind)
            }
            ArmOpKind::Undefined => {
                self.enter_exception(GuestTrap::UndefinedInstruction);
                2
            }
        }
    }

    /// Extracts the barrel-shifter's second operand for a data-processing
    /// instruction, returning the shifted value and its carry-out.
    fn operand2(&self, opcode: u32, immediate: bool) -> (u32, bool) {
        let carry_in = self.regs.cpsr().c();
        if immediate {
            let imm = opcode & 0xFF;
            let rotate = ((opcode >> 8) & 0xF) as u8;
            arith::rotate_imm_with_carry(imm, rotate, carry_in)
        } else {
            let rm = self.regs.gpr((opcode & 0xF) as usize, self.mode());
            let shift_kind = ShiftKind::from_bits(opcode >> 5);
            let (amount, imm_form) = if opcode & 0x10 != 0 {
                // Register-specified shift amount: low byte of Rs.
                let rs = self.regs.gpr(((opcode >> 8) & 0xF) as usize, self.mode());
                ((rs & 0xFF) as u8, false)
            } else {
                (((opcode >> 7) & 0x1F) as u8, true)
            };
            let result = match shift_kind {
                ShiftKind::Lsl => arith::lsl(rm, amount, carry_in),
                ShiftKind::Lsr => arith::lsr(rm, amount, carry_in, imm_form),
                ShiftKind::Asr => arith::asr(rm, amount, carry_in, imm_form),
                ShiftKind::Ror => arith::ror(rm, amount, carry_in, imm_form),
            };
            (result.result, result.carry_out)
        }
    }

    fn exec_data_processing(&mut self, opcode: u32, immediate: bool, op: AluOp, set_flags: bool) -> u64 {
        let rn_idx = ((opcode >> 16) & 0xF) as usize;
        let rd_idx = ((opcode >> 12) & 0xF) as usize;
        let mode = self.mode();
        let rn = self.regs.gpr(rn_idx, mode);
        let (op2, shifter_carry) = self.operand2(opcode, immediate);

        let (result, carry, overflow) = match op {
            AluOp::And | AluOp::Tst => (rn & op2, shifter_carry, self.regs.cpsr().v()),
            AluOp::Eor | AluOp::Teq => (rn ^ op2, shifter_carry, self.regs.cpsr().v()),
            AluOp::Sub | AluOp::Cmp => {
                let r = arith::sub(rn, op2);
                (r.result, r.carry, r.overflow)
            }
            AluOp::Rsb => {
                let r = arith::sub(op2, rn);
                (r.result, r.carry, r.overflow)
            }
            AluOp::Add | AluOp::Cmn => {
                let r = arith::add(rn, op2);
                (r.result, r.carry, r.overflow)
            }
            AluOp::Adc => {
                let r = arith::adc(rn, op2, self.regs.cpsr().c());
                (r.result, r.carry, r.overflow)
            }
            AluOp::Sbc => {
                let r = arith::sbc(rn, op2, self.regs.cpsr().c());
                (r.result, r.carry, r.overflow)
            }
            AluOp::Rsc => {
                let r = arith::sbc(op2, rn, self.regs.cpsr().c());
                (r.result, r.carry, r.overflow)
            }
            AluOp::Orr => (rn | op2, shifter_carry, self.regs.cpsr().v()),
            AluOp::Mov => (op2, shifter_carry, self.regs.cpsr().v()),
            AluOp::Bic => (rn & !op2, shifter_carry, self.regs.cpsr().v()),
            AluOp::Mvn => (!op2, shifter_carry, self.regs.cpsr().v()),
        };

        if op.writes_result() {
            if rd_idx == 15 {
                if set_flags {
                    // ALU write to PC with S set restores CPSR from SPSR.
                    let spsr = self.regs.spsr(mode.bank());
                    *self.regs.cpsr_mut() = spsr;
                }
                self.branch_to(result, set_flags && self.config.cpu_variant.has_cp15());
            } else {
                *self.regs.gpr_mut(rd_idx, mode) = result;
            }
        }

        if set_flags && rd_idx != 15 {
            let cpsr = self.regs.cpsr_mut();
            cpsr.set_n(result >> 31 != 0);
            cpsr.set_z(result == 0);
            cpsr.set_c(carry);
            if !matches!(op, AluOp::And | AluOp::Eor | AluOp::Tst | AluOp::Teq | AluOp::Orr | AluOp::Mov | AluOp::Bic | AluOp::Mvn) {
                cpsr.set_v(overflow);
            }
        }

        if rd_idx != 15 || !op.writes_result() {
            1
        } else {
            3
        }
    }

    fn exec_multiply(&mut self, opcode: u32, accumulate: bool, set_flags: bool) -> u64 {
        let mode = self.mode();
        let rd_idx = ((opcode >> 16) & 0xF) as usize;
        let rs = self.regs.gpr(((opcode >> 8) & 0xF) as usize, mode);
        let rm = self.regs.gpr((opcode & 0xF) as usize, mode);
        let mut result = rm.wrapping_mul(rs);
        if accumulate {
            let rn = self.regs.gpr(((opcode >> 12) & 0xF) as usize, mode);
            result = result.wrapping_add(rn);
        }
        *self.regs.gpr_mut(rd_idx, mode) = result;
        if set_flags {
            let cpsr = self.regs.cpsr_mut();
            cpsr.set_n(result >> 31 != 0);
            cpsr.set_z(result == 0);
        }
        if accumulate { 2 } else { 1 }
    }

    fn exec_multiply_long(&mut self, opcode: u32, signed: bool, accumulate: bool, set_flags: bool) -> u64 {
        let mode = self.mode();
        let rd_hi_idx = ((opcode >> 16) & 0xF) as usize;
        let rd_lo_idx = ((opcode >> 12) & 0xF) as usize;
        let rs = self.regs.gpr(((opcode >> 8) & 0xF) as usize, mode);
        let rm = self.regs.gpr((opcode & 0xF) as usize, mode);

        let mut result: u64 = if signed {
            ((i64::from(rm as i32)).wrapping_mul(i64::from(rs as i32))) as u64
        } else {
            u64::from(rm) * u64::from(rs)
        };
        if accumulate {
            let hi = self.regs.gpr(rd_hi_idx, mode);
            let lo = self.regs.gpr(rd_lo_idx, mode);
            let acc = (u64::from(hi) << 32) | u64::from(lo);
            result = result.wrapping_add(acc);
        }
        *self.regs.gpr_mut(rd_lo_idx, mode) = result as u32;
        *self.regs.gpr_mut(rd_hi_idx, mode) = (result >> 32) as u32;
        if set_flags {
            let cpsr = self.regs.cpsr_mut();
            cpsr.set_n(result >> 63 != 0);
            cpsr.set_z(result == 0);
        }
        if accumulate { 3 } else { 2 }
    }

    fn exec_branch_exchange(&mut self, opcode: u32, link: bool) -> u64 {
        let mode = self.mode();
        let target = self.regs.gpr((opcode & 0xF) as usize, mode);
        if link {
            let thumb = self.regs.cpsr().thumb();
            // The link register holds the address of the instruction
            // following this one, which is one more instruction width
            // behind the architectural PC (`current pc() - width`) this
            // function reads mid-tick.
            let ret = self.regs.pc().wrapping_sub(2 * instruction_width(thumb));
            *self.regs.gpr_mut(14, mode) = ret;
        }
        self.branch_to(target, true);
        3
    }

    fn exec_branch(&mut self, opcode: u32, link: bool) -> u64 {
        let offset = sign_extend_24(opcode & 0x00FF_FFFF) << 2;
        let mode = self.mode();
        if link {
            let ret = self.regs.pc().wrapping_sub(8);
            *self.regs.gpr_mut(14, mode) = ret;
        }
        let target = (self.regs.pc().wrapping_sub(4) as i64).wrapping_add(i64::from(offset)) as u32;
        self.branch_to(target, false);
        3
    }

    /// Immediate-offset `BLX` (ARMv5TE only): always links and always
    /// switches to Thumb state, unlike plain `B`/`BL`.
    fn exec_branch_link_exchange(&mut self, opcode: u32, h: bool) -> u64 {
        let offset = sign_extend_24(opcode & 0x00FF_FFFF) << 2 | if h { 2 } else { 0 };
        let mode = self.mode();
        let ret = self.regs.pc().wrapping_sub(8);
        *self.regs.gpr_mut(14, mode) = ret;
        let target = (self.regs.pc().wrapping_sub(4) as i64).wrapping_add(i64::from(offset)) as u32;
        self.branch_to(target | 1, true);
        3
    }

    fn exec_clz(&mut self, opcode: u32) -> u64 {
        let mode = self.mode();
        let rd_idx = ((opcode >> 12) & 0xF) as usize;
        let rm = self.regs.gpr((opcode & 0xF) as usize, mode);
        *self.regs.gpr_mut(rd_idx, mode) = rm.leading_zeros();
        1
    }

    fn exec_swap(&mut self, opcode: u32, byte: bool) -> u64 {
        let mode = self.mode();
        let rn_idx = ((opcode >> 16) & 0xF) as usize;
        let rd_idx = ((opcode >> 12) & 0xF) as usize;
        let rm_idx = (opcode & 0xF) as usize;
        let addr = self.regs.gpr(rn_idx, mode);
        let rm = self.regs.gpr(rm_idx, mode);
        let old = if byte {
            u32::from(self.mem.read_byte(addr))
        } else {
            self.mem.read_word(addr & !3)
        };
        if byte {
            self.mem.write_byte(addr, rm as u8);
        } else {
            self.mem.write_word(addr & !3, rm);
        }
        *self.regs.gpr_mut(rd_idx, mode) = old;
        4
    }

    fn exec_single_data_transfer(
        &mut self,
        opcode: u32,
        immediate_offset: bool,
        pre_indexed: bool,
        add: bool,
        byte: bool,
        writeback: bool,
        load: bool,
    ) -> u64 {
        let mode = self.mode();
        let rn_idx = ((opcode >> 16) & 0xF) as usize;
        let rd_idx = ((opcode >> 12) & 0xF) as usize;

        let offset = if immediate_offset {
            opcode & 0xFFF
        } else {
            let rm = self.regs.gpr((opcode & 0xF) as usize, mode);
            let shift_kind = ShiftKind::from_bits(opcode >> 5);
            let amount = ((opcode >> 7) & 0x1F) as u8;
            let carry_in = self.regs.cpsr().c();
            match shift_kind {
                ShiftKind::Lsl => arith::lsl(rm, amount, carry_in).result,
                ShiftKind::Lsr => arith::lsr(rm, amount, carry_in, true).result,
                ShiftKind::Asr => arith::asr(rm, amount, carry_in, true).result,
                ShiftKind::Ror => arith::ror(rm, amount, carry_in, true).result,
            }
        };

        let base = self.regs.gpr(rn_idx, mode);
        let offset = offset as i64;
        let offset = if add { offset } else { -offset };
        let transfer_addr = if pre_indexed { (base as i64 + offset) as u32 } else { base };

        if load {
            let value = if byte {
                u32::from(self.mem.read_byte(transfer_addr))
            } else {
                self.mem.read_word(transfer_addr & !3).rotate_right((transfer_addr & 3) * 8)
            };
            if rd_idx == 15 {
                self.branch_to(value, self.config.cpu_variant.has_cp15());
            } else {
                *self.regs.gpr_mut(rd_idx, mode) = value;
            }
        } else {
            let value = self.regs.gpr(rd_idx, mode);
            if byte {
                self.mem.write_byte(transfer_addr, value as u8);
            } else {
                self.mem.write_word(transfer_addr & !3, value);
            }
        }

        if writeback || !pre_indexed {
            let final_addr = if pre_indexed { transfer_addr } else { (base as i64 + offset) as u32 };
            *self.regs.gpr_mut(rn_idx, mode) = final_addr;
        }

        self.access_cycles(transfer_addr, Bus::Data, AccessKind::NonSequential, if byte { AccessSize::Byte } else { AccessSize::Word })
            + if load { 2 } else { 1 }
    }

    fn exec_block_data_transfer(
        &mut self,
        opcode: u32,
        pre_indexed: bool,
        add: bool,
        user_bank: bool,
        writeback: bool,
        load: bool,
    ) -> u64 {
        let mode = self.mode();
        let rn_idx = ((opcode >> 16) & 0xF) as usize;
        let list = opcode & 0xFFFF;
        let count = list.count_ones().max(1);
        let base = self.regs.gpr(rn_idx, mode);

        let start = if add { base } else { base.wrapping_sub(count * 4) };
        let mut addr = if pre_indexed == add { start.wrapping_add(4) } else { start };

        for i in 0..16u32 {
            if list & (1 << i) == 0 {
                continue;
            }
            let reg = i as usize;
            if load {
                let value = self.mem.read_word(addr & !3);
                if user_bank && reg != 15 {
                    *self.regs.user_mode_gpr_mut(reg) = value;
                } else if reg == 15 {
                    self.branch_to(value, self.config.cpu_variant.has_cp15());
                } else {
                    *self.regs.gpr_mut(reg, mode) = value;
                }
            } else {
                let value = if user_bank { self.regs.user_mode_gpr(reg) } else { self.regs.gpr(reg, mode) };
                self.mem.write_word(addr & !3, value);
            }
            addr = addr.wrapping_add(4);
        }

        if writeback {
            let new_base = if add { base.wrapping_add(count * 4) } else { base.wrapping_sub(count * 4) };
            *self.regs.gpr_mut(rn_idx, mode) = new_base;
        }

        1 + u64::from(count) * self.access_cycles(base, Bus::Data, AccessKind::Sequential, AccessSize::Word)
    }

    fn exec_halfword_transfer(
        &mut self,
        opcode: u32,
        pre_indexed: bool,
        add: bool,
        immediate_offset: bool,
        writeback: bool,
        load: bool,
        kind: HalfwordKind,
    ) -> u64 {
        let mode = self.mode();
        let rn_idx = ((opcode >> 16) & 0xF) as usize;
        let rd_idx = ((opcode >> 12) & 0xF) as usize;

        let offset = if immediate_offset {
            (((opcode >> 8) & 0xF) << 4) | (opcode & 0xF)
        } else {
            self.regs.gpr((opcode & 0xF) as usize, mode)
        };

        let base = self.regs.gpr(rn_idx, mode);
        let signed_offset = i64::from(offset);
        let signed_offset = if add { signed_offset } else { -signed_offset };
        let transfer_addr = if pre_indexed { (base as i64 + signed_offset) as u32 } else { base };

        if load {
            let value = match kind {
                HalfwordKind::UnsignedHalf => u32::from(self.mem.read_half(transfer_addr & !1)),
                HalfwordKind::SignedByte => i32::from(self.mem.read_byte(transfer_addr) as i8) as u32,
                HalfwordKind::SignedHalf => i32::from(self.mem.read_half(transfer_addr & !1) as i16) as u32,
                HalfwordKind::Doubleword => self.mem.read_word(transfer_addr & !3),
            };
            *self.regs.gpr_mut(rd_idx, mode) = value;
            if kind == HalfwordKind::Doubleword {
                let high = self.mem.read_word((transfer_addr & !3).wrapping_add(4));
                *self.regs.gpr_mut(rd_idx + 1, mode) = high;
            }
        } else {
            let value = self.regs.gpr(rd_idx, mode);
            match kind {
                HalfwordKind::Doubleword => {
                    self.mem.write_word(transfer_addr & !3, value);
                    let high = self.regs.gpr(rd_idx + 1, mode);
                    self.mem.write_word((transfer_addr & !3).wrapping_add(4), high);
                }
                _ => self.mem.write_half(transfer_addr & !1, value as u16),
            }
        }

        if writeback || !pre_indexed {
            let final_addr = if pre_indexed { transfer_addr } else { (base as i64 + signed_offset) as u32 };
            *self.regs.gpr_mut(rn_idx, mode) = final_addr;
        }

        if load { 3 } else { 2 }
    }

    /// `QADD`/`QSUB`/`QDADD`/`QDSUB` (ARMv5TE only): saturating add/subtract
    /// with the sticky-overflow (`Q`) flag set on saturation.
    fn exec_saturating_add_sub(&mut self, opcode: u32) -> u64 {
        if !self.config.cpu_variant.has_cp15() {
            self.enter_exception(GuestTrap::UndefinedInstruction);
            return 2;
        }
        let mode = self.mode();
        let rd_idx = ((opcode >> 12) & 0xF) as usize;
        let rm = self.regs.gpr((opcode & 0xF) as usize, mode) as i32;
        let rn = self.regs.gpr(((opcode >> 16) & 0xF) as usize, mode) as i32;
        let doubling = opcode & 0x0040_0000 != 0;
        let subtract = opcode & 0x0020_0000 != 0;

        let mut saturated_any = false;
        let mut operand = i64::from(rn);
        if doubling {
            let (doubled, sat) = arith::saturate(i64::from(rn) * 2);
            operand = i64::from(doubled);
            saturated_any |= sat;
        }
        let combined = if subtract { i64::from(rm) - operand } else { i64::from(rm) + operand };
        let (result, sat) = arith::saturate(combined);
        saturated_any |= sat;

        *self.regs.gpr_mut(rd_idx, mode) = result as u32;
        if saturated_any {
            self.regs.cpsr_mut().set_q(true);
        }
        1
    }

    /// `SMULxy`/`SMULWy` (ARMv5TE only): 16x16-bit signed multiply on a
    /// selected half of each operand.
    fn exec_signed_halfword_multiply(&mut self, opcode: u32) -> u64 {
        if !self.config.cpu_variant.has_cp15() {
            self.enter_exception(GuestTrap::UndefinedInstruction);
            return 2;
        }
        let mode = self.mode();
        let rd_idx = ((opcode >> 16) & 0xF) as usize;
        let rm = self.regs.gpr((opcode & 0xF) as usize, mode);
        let rs = self.regs.gpr(((opcode >> 8) & 0xF) as usize, mode);
        let x = opcode & 0x20 != 0;
        let y = opcode & 0x40 != 0;
        let half = |value: u32, top: bool| -> i32 {
            if top { (value >> 16) as i16 as i32 } else { value as i16 as i32 }
        };
        let product = half(rm, x) * half(rs, y);
        *self.regs.gpr_mut(rd_idx, mode) = product as u32;
        1
    }

    /// Handles CP15 register transfers, cache preload hints, and any other
    /// coprocessor traffic. On a v4T core, or for an opcode this model's
    /// CP15 doesn't implement, this enters the undefined-instruction
    /// exception — matching real silicon, which has no coprocessor attached
    /// to these opcodes outside the documented set.
    fn exec_coprocessor_or_extension(&mut self, opcode: u32, kind: ArmOpKind) -> u64 {
        if !self.config.cpu_variant.has_cp15() {
            self.enter_exception(GuestTrap::UndefinedInstruction);
            return 2;
        }
        match kind {
            ArmOpKind::Preload => 1,
            ArmOpKind::CoprocessorOp if opcode & 0x0100_0000 == 0 && (opcode >> 8) & 0xF == 15 => {
                self.exec_cp15_register_transfer(opcode)
            }
            _ => {
                self.enter_exception(GuestTrap::UndefinedInstruction);
                2
            }
        }
    }

    /// `MRC`/`MCR p15, ...`: CP15 register read/write, routed through the
    /// `(CRn, CRm, opcode2)` addressing scheme.
    fn exec_cp15_register_transfer(&mut self, opcode: u32) -> u64 {
        let mode = self.mode();
        let load = opcode & 0x0010_0000 != 0;
        let rd_idx = ((opcode >> 12) & 0xF) as usize;
        let crn = (opcode >> 16) & 0xF;
        let crm = opcode & 0xF;
        let opc2 = (opcode >> 5) & 0x7;
        let Some(cp15) = self.cp15.as_mut() else {
            self.enter_exception(GuestTrap::UndefinedInstruction);
            return 2;
        };
        if load {
            let value = cp15.read_register(crn, crm, opc2);
            *self.regs.gpr_mut(rd_idx, mode) = value;
        } else {
            let value = self.regs.gpr(rd_idx, mode);
            cp15.write_register(crn, crm, opc2, value);
        }
        2
    }

    pub(crate) fn execute_thumb(&mut self, kind: ThumbOpKind, opcode: u16) -> u64 {
        let mode = self.mode();
        match kind {
            ThumbOpKind::MoveShiftedRegister(shift) => {
                let rd_idx = (opcode & 0x7) as usize;
                let rs = self.regs.gpr(((opcode >> 3) & 0x7) as usize, mode);
                let amount = ((opcode >> 6) & 0x1F) as u8;
                let carry_in = self.regs.cpsr().c();
                let r = match shift {
                    ShiftKind::Lsl => arith::lsl(rs, amount, carry_in),
                    ShiftKind::Lsr => arith::lsr(rs, amount, carry_in, true),
                    ShiftKind::Asr => arith::asr(rs, amount, carry_in, true),
                    ShiftKind::Ror => arith::ror(rs, amount, carry_in, true),
                };
                *self.regs.gpr_mut(rd_idx, mode) = r.result;
                let cpsr = self.regs.cpsr_mut();
                cpsr.set_n(r.result >> 31 != 0);
                cpsr.set_z(r.result == 0);
                cpsr.set_c(r.carry_out);
                1
            }
            ThumbOpKind::AddSubtract { subtract, immediate } => {
                let rd_idx = (opcode & 0x7) as usize;
                let rs = self.regs.gpr(((opcode >> 3) & 0x7) as usize, mode);
                let operand = if immediate { u32::from((opcode >> 6) & 0x7) } else { self.regs.gpr(((opcode >> 6) & 0x7) as usize, mode) };
                let r = if subtract { arith::sub(rs, operand) } else { arith::add(rs, operand) };
                *self.regs.gpr_mut(rd_idx, mode) = r.result;
                let cpsr = self.regs.cpsr_mut();
                cpsr.set_n(r.result >> 31 != 0);
                cpsr.set_z(r.result == 0);
                cpsr.set_c(r.carry);
                cpsr.set_v(r.overflow);
                1
            }
            ThumbOpKind::ImmediateOp(op) => {
                let rd_idx = ((opcode >> 8) & 0x7) as usize;
                let imm = u32::from(opcode & 0xFF);
                let rd = self.regs.gpr(rd_idx, mode);
                let (result, carry, overflow) = match op {
                    ImmediateOpKind::Mov => (imm, self.regs.cpsr().c(), self.regs.cpsr().v()),
                    ImmediateOpKind::Cmp | ImmediateOpKind::Sub => {
                        let r = arith::sub(rd, imm);
                        (r.result, r.carry, r.overflow)
                    }
                    ImmediateOpKind::Add => {
                        let r = arith::add(rd, imm);
                        (r.result, r.carry, r.overflow)
                    }
                };
                if !matches!(op, ImmediateOpKind::Cmp) {
                    *self.regs.gpr_mut(rd_idx, mode) = result;
                }
                let cpsr = self.regs.cpsr_mut();
                cpsr.set_n(result >> 31 != 0);
                cpsr.set_z(result == 0);
                if !matches!(op, ImmediateOpKind::Mov) {
                    cpsr.set_c(carry);
                    cpsr.set_v(overflow);
                }
                1
            }
            ThumbOpKind::HiRegisterOpOrBranchExchange => {
                let rs_idx = (((opcode >> 3) & 0x7) | ((opcode >> 3) & 0x8)) as usize;
                let h1 = opcode & 0x80 != 0;
                let rd_idx = ((opcode & 0x7) | if h1 { 0x8 } else { 0 }) as usize;
                let op = (opcode >> 8) & 0x3;
                let rs = self.regs.gpr(rs_idx, mode);
                match op {
                    0b11 => {
                        self.branch_to(rs, true);
                        3
                    }
                    0b00 => {
                        let rd = self.regs.gpr(rd_idx, mode);
                        let result = rd.wrapping_add(rs);
                        if rd_idx == 15 {
                            self.branch_to(result & !1, false);
                        } else {
                            *self.regs.gpr_mut(rd_idx, mode) = result;
                        }
                        1
                    }
                    0b01 => {
                        let rd = self.regs.gpr(rd_idx, mode);
                        let r = arith::sub(rd, rs);
                        let cpsr = self.regs.cpsr_mut();
                        cpsr.set_n(r.result >> 31 != 0);
                        cpsr.set_z(r.result == 0);
                        cpsr.set_c(r.carry);
                        cpsr.set_v(r.overflow);
                        1
                    }
                    _ => {
                        if rd_idx == 15 {
                            self.branch_to(rs & !1, false);
                        } else {
                            *self.regs.gpr_mut(rd_idx, mode) = rs;
                        }
                        1
                    }
                }
            }
            ThumbOpKind::PcRelativeLoad => {
                let rd_idx = ((opcode >> 8) & 0x7) as usize;
                let imm = u32::from(opcode & 0xFF) * 4;
                let addr = (self.regs.pc().wrapping_sub(2) & !3).wrapping_add(imm);
                let value = self.mem.read_word(addr);
                *self.regs.gpr_mut(rd_idx, mode) = value;
                3
            }
            ThumbOpKind::LoadStoreRegisterOffset { byte, load } => {
                let rd_idx = (opcode & 0x7) as usize;
                let rb = self.regs.gpr(((opcode >> 3) & 0x7) as usize, mode);
                let ro = self.regs.gpr(((opcode >> 6) & 0x7) as usize, mode);
                let addr = rb.wrapping_add(ro);
                if load {
                    let value = if byte { u32::from(self.mem.read_byte(addr)) } else { self.mem.read_word(addr & !3) };
                    *self.regs.gpr_mut(rd_idx, mode) = value;
                } else {
                    let value = self.regs.gpr(rd_idx, mode);
                    if byte { self.mem.write_byte(addr, value as u8) } else { self.mem.write_word(addr & !3, value) }
                }
                if load { 3 } else { 2 }
            }
            ThumbOpKind::LoadStoreSignExtended { halfword, sign_extend } => {
                let rd_idx = (opcode & 0x7) as usize;
                let rb = self.regs.gpr(((opcode >> 3) & 0x7) as usize, mode);
                let ro = self.regs.gpr(((opcode >> 6) & 0x7) as usize, mode);
                let addr = rb.wrapping_add(ro);
                let value = match (halfword, sign_extend) {
                    (false, false) => u32::from(self.mem.read_byte(addr)),
                    (false, true) => i32::from(self.mem.read_byte(addr) as i8) as u32,
                    (true, false) => u32::from(self.mem.read_half(addr & !1)),
                    (true, true) => i32::from(self.mem.read_half(addr & !1) as i16) as u32,
                };
                *self.regs.gpr_mut(rd_idx, mode) = value;
                3
            }
            ThumbOpKind::LoadStoreImmediateOffset { byte, load } => {
                let rd_idx = (opcode & 0x7) as usize;
                let rb = self.regs.gpr(((opcode >> 3) & 0x7) as usize, mode);
                let imm = u32::from((opcode >> 6) & 0x1F) * if byte { 1 } else { 4 };
                let addr = rb.wrapping_add(imm);
                if load {
                    let value = if byte { u32::from(self.mem.read_byte(addr)) } else { self.mem.read_word(addr & !3) };
                    *self.regs.gpr_mut(rd_idx, mode) = value;
                } else {
                    let value = self.regs.gpr(rd_idx, mode);
                    if byte { self.mem.write_byte(addr, value as u8) } else { self.mem.write_word(addr & !3, value) }
                }
                if load { 3 } else { 2 }
            }
            ThumbOpKind::LoadStoreHalfword { load } => {
                let rd_idx = (opcode & 0x7) as usize;
                let rb = self.regs.gpr(((opcode >> 3) & 0x7) as usize, mode);
                let imm = u32::from((opcode >> 6) & 0x1F) * 2;
                let addr = rb.wrapping_add(imm);
                if load {
                    let value = u32::from(self.mem.read_half(addr & !1));
                    *self.regs.gpr_mut(rd_idx, mode) = value;
                } else {
                    let value = self.regs.gpr(rd_idx, mode);
                    self.mem.write_half(addr & !1, value as u16);
                }
                if load { 3 } else { 2 }
            }
            ThumbOpKind::SpRelativeLoadStore { load } => {
                let rd_idx = ((opcode >> 8) & 0x7) as usize;
                let sp = self.regs.gpr(13, mode);
                let addr = sp.wrapping_add(u32::from(opcode & 0xFF) * 4);
                if load {
                    let value = self.mem.read_word(addr & !3);
                    *self.regs.gpr_mut(rd_idx, mode) = value;
                } else {
                    let value = self.regs.gpr(rd_idx, mode);
                    self.mem.write_word(addr & !3, value);
                }
                if load { 3 } else { 2 }
            }
            ThumbOpKind::LoadAddress { stack_pointer } => {
                let rd_idx = ((opcode >> 8) & 0x7) as usize;
                let imm = u32::from(opcode & 0xFF) * 4;
                let base = if stack_pointer { self.regs.gpr(13, mode) } else { self.regs.pc().wrapping_sub(2) & !3 };
                *self.regs.gpr_mut(rd_idx, mode) = base.wrapping_add(imm);
                1
            }
            ThumbOpKind::AddOffsetToStackPointer => {
                let imm = u32::from(opcode & 0x7F) * 4;
                let sp = self.regs.gpr(13, mode);
                let new_sp = if opcode & 0x80 != 0 { sp.wrapping_sub(imm) } else { sp.wrapping_add(imm) };
                *self.regs.gpr_mut(13, mode) = new_sp;
                1
            }
            ThumbOpKind::PushPopRegisters { pop, store_lr_or_load_pc } => {
                self.exec_thumb_push_pop(opcode, pop, store_lr_or_load_pc)
            }
            ThumbOpKind::MultipleLoadStore { load } => self.exec_thumb_multiple(opcode, load),
            ThumbOpKind::ConditionalBranch => {
                let cond = u32::from((opcode >> 8) & 0xF);
                if cond == 0xF {
                    self.enter_exception(GuestTrap::SoftwareInterrupt);
                    return 2;
                }
                if self.condition_passes(cond) {
                    let offset = sign_extend_8(u32::from(opcode & 0xFF)) << 1;
                    let target = (self.regs.pc().wrapping_sub(2) as i64 + i64::from(offset)) as u32;
                    self.branch_to(target, false);
                    3
                } else {
                    1
                }
            }
            ThumbOpKind::SoftwareInterrupt => {
                self.enter_exception(GuestTrap::SoftwareInterrupt);
                2
            }
            ThumbOpKind::UnconditionalBranch => {
                let offset = sign_extend_11(u32::from(opcode & 0x7FF)) << 1;
                let target = (self.regs.pc().wrapping_sub(2) as i64 + i64::from(offset)) as u32;
                self.branch_to(target, false);
                3
            }
            ThumbOpKind::LongBranchWithLink => self.exec_thumb_long_branch(opcode),
            ThumbOpKind::AluOperation => self.exec_thumb_alu(opcode),
            ThumbOpKind::Undefined => {
                self.enter_exception(GuestTrap::UndefinedInstruction);
                2
            }
        }
    }

    fn exec_thumb_alu(&mut self, opcode: u16) -> u64 {
        let mode = self.mode();
        let rd_idx = (opcode & 0x7) as usize;
        let rs = self.regs.gpr(((opcode >> 3) & 0x7) as usize, mode);
        let rd = self.regs.gpr(rd_idx, mode);
        let op = (opcode >> 6) & 0xF;
        let carry_in = self.regs.cpsr().c();

        let (result, carry, overflow, writes) = match op {
            0x0 => (rd & rs, carry_in, self.regs.cpsr().v(), true), // AND
            0x1 => (rd ^ rs, carry_in, self.regs.cpsr().v(), true), // EOR
            0x2 => {
                let r = arith::lsl(rd, (rs & 0xFF) as u8, carry_in);
                (r.result, r.carry_out, self.regs.cpsr().v(), true)
            }
            0x3 => {
                let r = arith::lsr(rd, (rs & 0xFF) as u8, carry_in, false);
                (r.result, r.carry_out, self.regs.cpsr().v(), true)
            }
            0x4 => {
                let r = arith::asr(rd, (rs & 0xFF) as u8, carry_in, false);
                (r.result, r.carry_out, self.regs.cpsr().v(), true)
            }
            0x5 => {
                let r = arith::adc(rd, rs, carry_in);
                (r.result, r.carry, r.overflow, true)
            }
            0x6 => {
                let r = arith::sbc(rd, rs, carry_in);
                (r.result, r.carry, r.overflow, true)
            }
            0x7 => {
                let r = arith::ror(rd, (rs & 0xFF) as u8, carry_in, false);
                (r.result, r.carry_out, self.regs.cpsr().v(), true)
            }
            0x8 => (rd & rs, carry_in, self.regs.cpsr().v(), false), // TST
            0x9 => {
                let r = arith::sub(0, rs);
                (r.result, r.carry, r.overflow, true)
            }
            0xA => {
                let r = arith::sub(rd, rs);
                (r.result, r.carry, r.overflow, false)
            }
            0xB => {
                let r = arith::add(rd, rs);
                (r.result, r.carry, r.overflow, false)
            }
            0xC => (rd | rs, carry_in, self.regs.cpsr().v(), true),
            0xD => (rd.wrapping_mul(rs), carry_in, self.regs.cpsr().v(), true),
            0xE => (rd & !rs, carry_in, self.regs.cpsr().v(), true),
            _ => (!rs, carry_in, self.regs.cpsr().v(), true),
        };

        if writes {
            *self.regs.gpr_mut(rd_idx, mode) = result;
        }
        let cpsr = self.regs.cpsr_mut();
        cpsr.set_n(result >> 31 != 0);
        cpsr.set_z(result == 0);
        if matches!(op, 0x5 | 0x6 | 0x9 | 0xA | 0xB) {
            cpsr.set_c(carry);
            cpsr.set_v(overflow);
        } else if matches!(op, 0x2 | 0x3 | 0x4 | 0x7) {
            cpsr.set_c(carry);
        }
        if op == 0xD { 2 } else { 1 }
    }

    fn exec_thumb_push_pop(&mut self, opcode: u16, pop: bool, store_lr_or_load_pc: bool) -> u64 {
        let mode = self.mode();
        let list = opcode & 0xFF;
        let mut count = list.count_ones() + u32::from(store_lr_or_load_pc);
        if count == 0 {
            count = 1;
        }
        let sp = self.regs.gpr(13, mode);

        if pop {
            let mut addr = sp;
            for i in 0..8u32 {
                if list & (1 << i) == 0 {
                    continue;
                }
                let value = self.mem.read_word(addr & !3);
                *self.regs.gpr_mut(i as usize, mode) = value;
                addr = addr.wrapping_add(4);
            }
            if store_lr_or_load_pc {
                let value = self.mem.read_word(addr & !3);
                self.branch_to(value & !1, false);
                addr = addr.wrapping_add(4);
            }
            *self.regs.gpr_mut(13, mode) = addr;
        } else {
            let mut addr = sp.wrapping_sub(count * 4);
            let start = addr;
            for i in 0..8u32 {
                if list & (1 << i) == 0 {
                    continue;
                }
                let value = self.regs.gpr(i as usize, mode);
                self.mem.write_word(addr & !3, value);
                addr = addr.wrapping_add(4);
            }
            if store_lr_or_load_pc {
                let value = self.regs.gpr(14, mode);
                self.mem.write_word(addr & !3, value);
            }
            *self.regs.gpr_mut(13, mode) = start;
        }
        1 + count as u64
    }

    fn exec_thumb_multiple(&mut self, opcode: u16, load: bool) -> u64 {
        let mode = self.mode();
        let rb_idx = ((opcode >> 8) & 0x7) as usize;
        let list = opcode & 0xFF;
        let count = list.count_ones().max(1);
        let mut addr = self.regs.gpr(rb_idx, mode);
        for i in 0..8u32 {
            if list & (1 << i) == 0 {
                continue;
            }
            if load {
                let value = self.mem.read_word(addr & !3);
                *self.regs.gpr_mut(i as usize, mode) = value;
            } else {
                let value = self.regs.gpr(i as usize, mode);
                self.mem.write_word(addr & !3, value);
            }
            addr = addr.wrapping_add(4);
        }
        *self.regs.gpr_mut(rb_idx, mode) = addr;
        1 + u64::from(count)
    }

    fn exec_thumb_long_branch(&mut self, opcode: u16) -> u64 {
        let mode = self.mode();
        let high_half = opcode & 0x0800 == 0;
        if high_half {
            let offset = sign_extend_11(u32::from(opcode & 0x7FF)) << 12;
            let lr = (self.regs.pc().wrapping_sub(2) as i64 + i64::from(offset)) as u32;
            *self.regs.gpr_mut(14, mode) = lr;
            1
        } else {
            // Second half: bit 12 set is the BL suffix (stays in Thumb
            // state); clear is the BLX suffix (ARMv5TE only), which
            // exchanges to ARM state and word-aligns the target.
            let blx_suffix = opcode & 0x1000 == 0 && self.config.cpu_variant.has_cp15();
            let lr = self.regs.gpr(14, mode);
            let ret = self.regs.pc().wrapping_sub(4) | 1;
            let target = lr.wrapping_add(u32::from(opcode & 0x7FF) << 1);
            *self.regs.gpr_mut(14, mode) = ret;
            if blx_suffix {
                self.branch_to(target & !0b11, true);
            } else {
                self.branch_to(target, false);
            }
            3
        }
    }
}

/// Sign-extends a 24-bit branch offset to a 32-bit signed value.
fn sign_extend_24(value: u32) -> i32 {
    ((value << 8) as i32) >> 8
}

/// Sign-extends an 8-bit conditional-branch offset.
fn sign_extend_8(value: u32) -> i32 {
    ((value << 24) as i32) >> 24
}

/// Sign-extends an 11-bit unconditional-branch offset.
fn sign_extend_11(value: u32) -> i32 {
    ((value << 21) as i32) >> 21
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    struct TestMemory {
        bytes: Vec<u8>,
    }

    impl TestMemory {
        fn new() -> Self {
            Self { bytes: vec![0; 0x1_0000] }
        }
    }

    impl MemoryInterface for TestMemory {
        fn read_byte(&mut self, addr: u32) -> u8 {
            self.peek_byte(addr)
        }
        fn read_half(&mut self, addr: u32) -> u16 {
            self.peek_half(addr)
        }
        fn read_word(&mut self, addr: u32) -> u32 {
            self.peek_word(addr)
        }
        fn write_byte(&mut self, addr: u32, value: u8) {
            self.bytes[addr as usize] = value;
        }
        fn write_half(&mut self, addr: u32, value: u16) {
            self.bytes[addr as usize..addr as usize + 2].copy_from_slice(&value.to_le_bytes());
        }
        fn write_word(&mut self, addr: u32, value: u32) {
            self.bytes[addr as usize..addr as usize + 4].copy_from_slice(&value.to_le_bytes());
        }
        fn peek_byte(&self, addr: u32) -> u8 {
            self.bytes[addr as usize]
        }
        fn peek_half(&self, addr: u32) -> u16 {
            u16::from_le_bytes(self.bytes[addr as usize..addr as usize + 2].try_into().unwrap())
        }
        fn peek_word(&self, addr: u32) -> u32 {
            u32::from_le_bytes(self.bytes[addr as usize..addr as usize + 4].try_into().unwrap())
        }
        fn access_cycles(&self, _addr: u32, _bus: Bus, _kind: AccessKind, _size: AccessSize) -> u64 {
            1
        }
    }

    fn new_core() -> InterpreterCore<TestMemory> {
        InterpreterCore::new(TestMemory::new(), Config::default())
    }

    #[test]
    fn reset_enters_supervisor_mode_with_interrupts_masked() {
        let core = new_core();
        assert_eq!(core.regs.cpsr().mode(), Mode::Supervisor);
        assert!(core.regs.cpsr().irq_disable());
        assert!(core.regs.cpsr().fiq_disable());
        assert!(!core.regs.cpsr().thumb());
    }

    #[test]
    fn mov_immediate_sets_register_and_flags() {
        let mut core = new_core();
        // MOVS R0, #5 (cond=AL, I=1, opcode=MOV, S=1, Rd=0, rotate=0, imm=5)
        let opcode = 0xE3B0_0005u32;
        core.mem.write_word(0, opcode);
        core.reload_pipeline(0);
        core.tick();
        assert_eq!(core.regs.gpr(0, Mode::Supervisor), 5);
        assert!(!core.regs.cpsr().z());
        assert!(!core.regs.cpsr().n());
    }

    #[test]
    fn condition_failure_skips_execution_and_advances_pc() {
        let mut core = new_core();
        // MOVEQ R0, #5, with Z clear: should not execute.
        let opcode = 0x03B0_0005u32;
        core.mem.write_word(0, opcode);
        core.reload_pipeline(0);
        core.regs.cpsr_mut().set_z(false);
        core.tick();
        assert_eq!(core.regs.gpr(0, Mode::Supervisor), 0);
    }

    #[test]
    fn branch_updates_pc_and_reloads_pipeline() {
        let mut core = new_core();
        // B #0 (branch to itself + 8, offset=0): cond=AL, bits27:25=101, link=0
        let opcode = 0xEA00_0000u32;
        core.mem.write_word(0x100, opcode);
        core.reload_pipeline(0x100);
        core.tick();
        assert_eq!(core.regs.pc(), 0x100 + 8 + 8);
    }

    #[test]
    fn swi_enters_supervisor_exception_vector() {
        let mut core = new_core();
        core.regs.cpsr_mut().set_mode(Mode::User);
        let opcode = 0xEF00_0000u32; // SWI #0
        core.mem.write_word(0x200, opcode);
        core.reload_pipeline(0x200);
        core.tick();
        assert_eq!(core.regs.cpsr().mode(), Mode::Supervisor);
        assert_eq!(core.regs.pc(), 0x2 * 4 + 8);
    }

    #[test]
    fn data_processing_with_pc_as_destination_reloads_pipeline() {
        let mut core = new_core();
        // MOV PC, R0  => sets cache_valid false
        core.cache_valid = true;
        let opcode = 0xE1A0_F000u32;
        core.mem.write_word(0x300, opcode);
        core.reload_pipeline(0x300);
        *core.regs.gpr_mut(0, Mode::Supervisor) = 0x400;
        core.tick();
        assert!(!core.cache_valid);
    }
}
