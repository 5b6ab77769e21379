//! The banked general-purpose register file and program status registers.
//!
//! Mirrors the reference interpreter's `Registers` struct layout: a flat
//! `R0..=R15` array plus a `[Bank][BankedRegister]` table backing the banked
//! copies of R8..=R14 for FIQ, and R13..=R14 for every privileged mode.
//! `gpr`/`gpr_mut` redirect into that table exactly the way `Registers::GPR`
//! does; `user_mode_gpr`/`user_mode_gpr_mut` implement the separate
//! `Registers::UserModeGPR` redirect used by LDM/STM's `^` (user-bank)
//! addressing mode.

use crate::common::mode::{Bank, Mode, BANKED_REG_COUNT, BANK_COUNT};
use crate::common::psr::Psr;

/// The banked general-purpose register file plus CPSR/SPSR.
#[derive(Clone, Debug)]
pub struct RegisterFile {
    /// The sixteen currently-visible registers, R0 through R15 (PC).
    regs: [u32; 16],
    /// Banked copies of R8..=R14, indexed `[bank][reg - 8]`.
    bank_regs: [[u32; BANKED_REG_COUNT]; BANK_COUNT],
    /// Current program status register.
    cpsr: Psr,
    /// Saved program status registers, one per bank.
    spsr: [Psr; BANK_COUNT],
}

impl Default for RegisterFile {
    fn default() -> Self {
        let mut file = Self {
            regs: [0; 16],
            bank_regs: [[0; BANKED_REG_COUNT]; BANK_COUNT],
            cpsr: Psr::default(),
            spsr: [Psr::default(); BANK_COUNT],
        };
        file.reset();
        file
    }
}

impl RegisterFile {
    /// Resets every register to zero and CPSR to Supervisor mode, ARM state,
    /// interrupts disabled. Matches `Registers::Reset`.
    pub fn reset(&mut self) {
        self.regs = [0; 16];
        self.bank_regs = [[0; BANKED_REG_COUNT]; BANK_COUNT];
        self.spsr = [Psr::default(); BANK_COUNT];
        self.cpsr = Psr::reset(Mode::Supervisor);
    }

    /// Returns the current program status register.
    #[must_use]
    pub fn cpsr(&self) -> Psr {
        self.cpsr
    }

    /// Returns a mutable reference to the current program status register.
    pub fn cpsr_mut(&mut self) -> &mut Psr {
        &mut self.cpsr
    }

    /// Returns the saved program status register banked for `bank`.
    #[must_use]
    pub fn spsr(&self, bank: Bank) -> Psr {
        self.spsr[bank.index()]
    }

    /// Returns a mutable reference to the saved program status register
    /// banked for `bank`.
    pub fn spsr_mut(&mut self, bank: Bank) -> &mut Psr {
        &mut self.spsr[bank.index()]
    }

    /// Reads general-purpose register `index` (0..=15) as it would be seen
    /// from `mode`. If `mode` banks to the same register set as the current
    /// CPSR mode, this is just the flat register; otherwise it redirects
    /// into the banked R8..=R14 table.
    #[must_use]
    pub fn gpr(&self, index: usize, mode: Mode) -> u32 {
        self.gpr_slot(index, mode).map_or(self.regs[index], |(bank, off)| self.bank_regs[bank.index()][off])
    }

    /// Mutable counterpart of [`gpr`](Self::gpr).
    pub fn gpr_mut(&mut self, index: usize, mode: Mode) -> &mut u32 {
        match self.gpr_slot(index, mode) {
            Some((bank, off)) => &mut self.bank_regs[bank.index()][off],
            None => &mut self.regs[index],
        }
    }

    /// Computes the banked-register slot `(bank, offset)` for `index` as seen
    /// from `mode`, or `None` if it resolves to the flat register file.
    /// Matches `Registers::GPR`'s redirect logic exactly, including its
    /// restriction of the FIQ banking range to R8..=R12 and the
    /// R13..=R14-only banking for every other privileged mode.
    fn gpr_slot(&self, index: usize, mode: Mode) -> Option<(Bank, usize)> {
        let current_bank = self.cpsr.mode().bank();
        let mode_bank = mode.bank();
        if current_bank == mode_bank {
            return None;
        }
        if mode_bank == Bank::Fiq && (8..=12).contains(&index) {
            return Some((Bank::Fiq, index - 8));
        }
        if mode_bank != Bank::User && (13..=14).contains(&index) {
            return Some((mode_bank, index - 8));
        }
        None
    }

    /// Reads general-purpose register `index` as seen from User mode,
    /// regardless of the current CPSR mode. Used by the `^`-suffixed
    /// (user-bank) forms of LDM/STM.
    #[must_use]
    pub fn user_mode_gpr(&self, index: usize) -> u32 {
        self.user_mode_gpr_slot(index).map_or(self.regs[index], |off| self.bank_regs[Bank::User.index()][off])
    }

    /// Mutable counterpart of [`user_mode_gpr`](Self::user_mode_gpr).
    pub fn user_mode_gpr_mut(&mut self, index: usize) -> &mut u32 {
        match self.user_mode_gpr_slot(index) {
            Some(off) => &mut self.bank_regs[Bank::User.index()][off],
            None => &mut self.regs[index],
        }
    }

    /// Matches `Registers::UserModeGPR`'s redirect logic.
    fn user_mode_gpr_slot(&self, index: usize) -> Option<usize> {
        let current_bank = self.cpsr.mode().bank();
        if current_bank == Bank::Fiq && (8..=12).contains(&index) {
            return Some(index - 8);
        }
        if current_bank != Bank::User && (index == 13 || index == 14) {
            return Some(index - 8);
        }
        None
    }

    /// Returns the program counter, R15.
    #[must_use]
    pub fn pc(&self) -> u32 {
        self.regs[15]
    }

    /// Sets the program counter, R15.
    pub fn set_pc(&mut self, value: u32) {
        self.regs[15] = value;
    }

    /// Flattens every register array to plain `u32`s, for snapshot capture.
    pub(crate) fn raw_state(&self) -> RegisterRawState {
        RegisterRawState {
            regs: self.regs,
            bank_regs: self.bank_regs,
            cpsr: self.cpsr.raw(),
            spsr: self.spsr.map(Psr::raw),
        }
    }

    /// Restores every register array from a snapshot capture.
    pub(crate) fn restore_raw_state(&mut self, state: RegisterRawState) {
        self.regs = state.regs;
        self.bank_regs = state.bank_regs;
        self.cpsr = Psr(state.cpsr);
        self.spsr = state.spsr.map(Psr);
    }
}

/// Plain-`u32` mirror of [`RegisterFile`]'s internal arrays, used by
/// `snapshot.rs` to build its serializable [`PersistedState`](crate::snapshot::PersistedState)
/// without exposing `Psr`'s and the banked-register table's internal layout.
#[derive(Clone, Copy, Debug)]
pub(crate) struct RegisterRawState {
    pub regs: [u32; 16],
    pub bank_regs: [[u32; BANKED_REG_COUNT]; BANK_COUNT],
    pub cpsr: u32,
    pub spsr: [u32; BANK_COUNT],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_clears_registers_and_enters_supervisor_mode() {
        let mut file = RegisterFile::default();
        *file.gpr_mut(0, Mode::Supervisor) = 0xFFFF_FFFF;
        file.reset();
        assert_eq!(file.gpr(0, Mode::Supervisor), 0);
        assert_eq!(file.cpsr().mode(), Mode::Supervisor);
        assert!(file.cpsr().irq_disable());
    }

    #[test]
    fn same_bank_access_reads_flat_register() {
        let mut file = RegisterFile::default();
        file.cpsr_mut().set_mode(Mode::User);
        *file.gpr_mut(10, Mode::User) = 42;
        assert_eq!(file.gpr(10, Mode::User), 42);
    }

    #[test]
    fn fiq_banking_covers_r8_through_r12_only() {
        let mut file = RegisterFile::default();
        file.cpsr_mut().set_mode(Mode::User);
        *file.gpr_mut(9, Mode::Fiq) = 0xAAAA;
        assert_eq!(file.gpr(9, Mode::Fiq), 0xAAAA);
        // From User's perspective the flat register is untouched.
        assert_eq!(file.gpr(9, Mode::User), 0);

        // R13/R14 under FIQ mode bank separately from R8..=R12.
        *file.gpr_mut(13, Mode::Fiq) = 0xBEEF;
        assert_eq!(file.gpr(13, Mode::Fiq), 0xBEEF);
        assert_eq!(file.gpr(13, Mode::User), 0);
    }

    #[test]
    fn privileged_modes_bank_only_r13_and_r14() {
        let mut file = RegisterFile::default();
        file.cpsr_mut().set_mode(Mode::User);
        *file.gpr_mut(13, Mode::Irq) = 0x1000;
        *file.gpr_mut(14, Mode::Irq) = 0x2000;
        assert_eq!(file.gpr(13, Mode::Irq), 0x1000);
        assert_eq!(file.gpr(14, Mode::Irq), 0x2000);
        // R12 is not banked for IRQ, so it reads through to the flat register.
        *file.gpr_mut(12, Mode::User) = 0x99;
        assert_eq!(file.gpr(12, Mode::Irq), 0x99);
    }

    #[test]
    fn system_mode_shares_the_user_bank() {
        let mut file = RegisterFile::default();
        file.cpsr_mut().set_mode(Mode::System);
        *file.gpr_mut(13, Mode::System) = 0x5555;
        assert_eq!(file.gpr(13, Mode::User), 0x5555);
    }

    #[test]
    fn user_mode_gpr_redirects_from_fiq_context() {
        let mut file = RegisterFile::default();
        file.cpsr_mut().set_mode(Mode::Fiq);
        *file.gpr_mut(9, Mode::Fiq) = 111;
        *file.user_mode_gpr_mut(9) = 222;
        // The FIQ-banked R9 and the user-banked R9 are distinct storage.
        assert_eq!(file.gpr(9, Mode::Fiq), 111);
        assert_eq!(file.user_mode_gpr(9), 222);
    }

    #[test]
    fn user_mode_gpr_is_identity_when_already_in_user_mode() {
        let mut file = RegisterFile::default();
        file.cpsr_mut().set_mode(Mode::User);
        *file.gpr_mut(5, Mode::User) = 7;
        assert_eq!(file.user_mode_gpr(5), 7);
    }

    #[test]
    fn pc_accessors_round_trip() {
        let mut file = RegisterFile::default();
        file.set_pc(0x0800_0008);
        assert_eq!(file.pc(), 0x0800_0008);
    }
}
