//! Serializable snapshot of everything needed to resume an
//! [`InterpreterCore`] exactly where it left off: registers (flat and
//! banked), CPSR/SPSR, execution state, the two fetch-pipeline slots, and
//! (on ARMv5TE) CP15.
//!
//! Round-trips through `serde_json` in tests; no binary format is bundled,
//! matching the teacher's own preference for a self-describing wire format
//! over a hand-packed one. `serde`'s derived implementations already give
//! the little-endian-on-the-wire guarantee native integer fields need, so
//! nothing further is required for that.

use serde::{Deserialize, Serialize};

use crate::common::mode::{BANKED_REG_COUNT, BANK_COUNT};
use crate::core::{ExecState, InterpreterCore};
use crate::cp15::Cp15RawState;
use crate::memory::MemoryInterface;
use crate::reg::RegisterRawState;

/// CP15 state, flattened to plain fields for serialization.
///
/// TCM *contents* are deliberately not included: this crate never owns
/// guest memory (see `memory.rs`'s host-implemented bus contract), only the
/// sizing/base parameters CP15 itself tracks. Saving the bytes behind a TCM
/// window is the host's job, the same way it already owns saving the rest
/// of the guest address space.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct Cp15Snapshot {
    pub control: u32,
    pub cacheability: [u32; 2],
    pub write_buffer: u32,
    pub access_permission: [u32; 4],
    pub regions: [(u32, u32); 8],
    pub dtcm_params: u32,
    pub itcm_params: u32,
}

impl From<Cp15RawState> for Cp15Snapshot {
    fn from(raw: Cp15RawState) -> Self {
        Self {
            control: raw.control,
            cacheability: raw.cacheability,
            write_buffer: raw.write_buffer,
            access_permission: raw.access_permission,
            regions: raw.regions,
            dtcm_params: raw.dtcm_params,
            itcm_params: raw.itcm_params,
        }
    }
}

impl From<Cp15Snapshot> for Cp15RawState {
    fn from(snapshot: Cp15Snapshot) -> Self {
        Self {
            control: snapshot.control,
            cacheability: snapshot.cacheability,
            write_buffer: snapshot.write_buffer,
            access_permission: snapshot.access_permission,
            regions: snapshot.regions,
            dtcm_params: snapshot.dtcm_params,
            itcm_params: snapshot.itcm_params,
        }
    }
}

/// Everything needed to resume an [`InterpreterCore`] exactly where it left
/// off.
///
/// The SPSR array keeps all six [`Bank`](crate::common::mode::Bank) slots,
/// including `Bank::User`'s, rather than the five modes that can actually
/// bank an SPSR. Real hardware has no SPSR in User/System mode; that slot
/// is always zero and ignored on restore, kept only so this array indexes
/// the same way every other `[T; BANK_COUNT]` table in this crate does.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistedState {
    pub gprs: [u32; 16],
    pub bank_regs: [[u32; BANKED_REG_COUNT]; BANK_COUNT],
    pub cpsr: u32,
    pub spsr: [u32; BANK_COUNT],
    pub exec_state: ExecState,
    pub pipeline: [u32; 2],
    pub cp15: Option<Cp15Snapshot>,
}

impl PersistedState {
    /// Captures `core`'s full state.
    pub fn capture<M: MemoryInterface>(core: &InterpreterCore<M>) -> Self {
        let regs = core.regs().raw_state();
        Self {
            gprs: regs.regs,
            bank_regs: regs.bank_regs,
            cpsr: regs.cpsr,
            spsr: regs.spsr,
            exec_state: core.state(),
            pipeline: core.pipeline_slots(),
            cp15: core.cp15().map(|cp15| cp15.raw_state().into()),
        }
    }

    /// Restores `core` to this snapshot.
    ///
    /// A snapshot captured with `cp15: Some(..)` but restored onto a core
    /// configured without CP15 (`CpuVariant::Armv4T`) silently drops the
    /// CP15 portion: there is no coprocessor slot to restore it into, and
    /// a variant mismatch here is a host configuration error the caller is
    /// better placed to catch than this method is.
    pub fn restore<M: MemoryInterface>(&self, core: &mut InterpreterCore<M>) {
        core.regs_mut().restore_raw_state(RegisterRawState {
            regs: self.gprs,
            bank_regs: self.bank_regs,
            cpsr: self.cpsr,
            spsr: self.spsr,
        });
        core.set_state(self.exec_state);
        core.set_pipeline_slots(self.pipeline);
        if let (Some(snapshot), Some(cp15)) = (self.cp15, core.cp15_mut()) {
            cp15.restore_raw_state(snapshot.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::mode::Mode;
    use crate::config::{Config, CpuVariant};

    struct FlatMemory {
        bytes: Vec<u8>,
    }

    impl FlatMemory {
        fn new() -> Self {
            Self { bytes: vec![0; 0x1_0000] }
        }
    }

    impl MemoryInterface for FlatMemory {
        fn read_byte(&mut self, addr: u32) -> u8 {
            self.bytes[addr as usize]
        }
        fn read_half(&mut self, addr: u32) -> u16 {
            u16::from_le_bytes(self.bytes[addr as usize..addr as usize + 2].try_into().unwrap())
        }
        fn read_word(&mut self, addr: u32) -> u32 {
            u32::from_le_bytes(self.bytes[addr as usize..addr as usize + 4].try_into().unwrap())
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
        fn access_cycles(&self, _addr: u32, _bus: crate::memory::Bus, _kind: crate::memory::AccessKind, _size: crate::memory::AccessSize) -> u64 {
            1
        }
    }

    #[test]
    fn capture_then_restore_reproduces_register_state() {
        let mut core = InterpreterCore::new(FlatMemory::new(), Config::default());
        *core.regs_mut().gpr_mut(3, Mode::Supervisor) = 0xDEAD_BEEF;
        core.regs_mut().set_pc(0x8000);
        let snapshot = PersistedState::capture(&core);

        let mut restored = InterpreterCore::new(FlatMemory::new(), Config::default());
        snapshot.restore(&mut restored);

        assert_eq!(restored.regs().gpr(3, Mode::Supervisor), 0xDEAD_BEEF);
        assert_eq!(restored.regs().pc(), 0x8000);
        assert_eq!(restored.state(), core.state());
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let core = InterpreterCore::new(FlatMemory::new(), Config::default());
        let snapshot = PersistedState::capture(&core);
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: PersistedState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.gprs, snapshot.gprs);
        assert_eq!(parsed.cpsr, snapshot.cpsr);
    }

    #[test]
    fn armv4t_core_has_no_cp15_snapshot() {
        let config = Config { cpu_variant: CpuVariant::Armv4T, ..Config::default() };
        let core = InterpreterCore::new(FlatMemory::new(), config);
        let snapshot = PersistedState::capture(&core);
        assert!(snapshot.cp15.is_none());
    }

    #[test]
    fn armv5te_cp15_control_register_round_trips() {
        let config = Config { cpu_variant: CpuVariant::Armv5TE, ..Config::default() };
        let mut core = InterpreterCore::new(FlatMemory::new(), config.clone());
        core.cp15_mut().unwrap().write_register(1, 0, 0, 1 << 13); // control register, high-vector bit
        let snapshot = PersistedState::capture(&core);
        assert!(snapshot.cp15.is_some());

        let mut restored = InterpreterCore::new(FlatMemory::new(), config);
        snapshot.restore(&mut restored);
        assert_eq!(restored.cp15().unwrap().high_vectors(), core.cp15().unwrap().high_vectors());
    }
}
