//! CP15 system control coprocessor (ARMv5TE / ARM946E-S only).
//!
//! Registers are addressed by the packed key `(crn << 8) | (crm << 4) |
//! opcode2`, matching the field layout `MRC`/`MCR` encode directly. Only the
//! working register set a guest OS actually touches is modeled: identification
//! constants, the control register, the 8-region protection unit, TCM sizing,
//! and the cache-maintenance/wait-for-interrupt operations. Cache invalidation
//! has no cache to invalidate in this model — it only raises a notification
//! the block cache's owner is expected to consume.

/// One memory-protection region's data and instruction access words.
#[derive(Clone, Copy, Debug, Default)]
pub struct RegionConfig {
    /// Data-side access word: base, size, and enable packed together.
    pub data: u32,
    /// Instruction-side access word.
    pub inst: u32,
}

/// A tightly-coupled memory region's resolved sizing.
#[derive(Clone, Copy, Debug, Default)]
pub struct TcmConfig {
    /// Base address, 4 KiB aligned.
    pub base: u32,
    /// Size visible to writes, in bytes.
    pub write_size: u32,
    /// Size visible to reads (zero when the region is write-only/load-mode).
    pub read_size: u32,
}

/// Packs a `(CRn, CRm, opcode2)` triple into CP15's register address space.
const fn reg_addr(crn: u32, crm: u32, opcode2: u32) -> u32 {
    (crn << 8) | (crm << 4) | opcode2
}

/// Writable bits of the control register (`0x000FF085`).
const CONTROL_WRITABLE_MASK: u32 = 0x000F_F085;
/// Bit 13: selects the high (`0xFFFF0000`) exception vector base.
const CONTROL_V_BIT: u32 = 1 << 13;
/// Bit 17: DTCM load-mode (read-disabled while loading contents).
const CONTROL_DTCM_LOAD_BIT: u32 = 1 << 17;
/// Bit 16: ITCM load-mode.
const CONTROL_ITCM_LOAD_BIT: u32 = 1 << 16;

/// CP15 system control coprocessor state.
#[derive(Clone, Debug)]
pub struct Cp15 {
    control: u32,
    cacheability: [u32; 2],
    write_buffer: u32,
    access_permission: [u32; 4],
    regions: [RegionConfig; 8],
    dtcm_params: u32,
    itcm_params: u32,
    dtcm: TcmConfig,
    itcm: TcmConfig,
    wfi_requested: bool,
    invalidate_pending: bool,
}

impl Default for Cp15 {
    fn default() -> Self {
        Self {
            control: 0,
            cacheability: [0; 2],
            write_buffer: 0,
            access_permission: [0; 4],
            regions: [RegionConfig::default(); 8],
            dtcm_params: 0,
            itcm_params: 0,
            dtcm: TcmConfig::default(),
            itcm: TcmConfig::default(),
            wfi_requested: false,
            invalidate_pending: false,
        }
    }
}

impl Cp15 {
    /// Fixed Main ID register value (`0x000`): identifies an ARM946E-S core.
    const MAIN_ID: u32 = 0x4105_9461;
    /// Fixed Cache Type register value (`0x001`): 4-way, 8 KiB I/D caches,
    /// 32-byte lines — plausible ARM946E-S cache topology.
    const CACHE_TYPE: u32 = 0x0D13_0D13;
    /// Fixed TCM Size register value (`0x002`): reports 32 KiB ITCM/DTCM.
    const TCM_SIZE: u32 = 0x0003_0003;

    /// Whether the high exception vector base (`0xFFFF0000`) is selected.
    #[must_use]
    pub fn high_vectors(&self) -> bool {
        self.control & CONTROL_V_BIT != 0
    }

    /// Returns and clears the pending wait-for-interrupt request.
    pub fn take_wfi_request(&mut self) -> bool {
        std::mem::take(&mut self.wfi_requested)
    }

    /// Returns and clears the pending cache-invalidate notification. The
    /// caller (typically the block cache's owner) should treat this as "and
    /// clear whatever you've cached", since this model keeps no cache of its
    /// own to invalidate precisely.
    pub fn take_invalidate_pending(&mut self) -> bool {
        std::mem::take(&mut self.invalidate_pending)
    }

    /// Current DTCM configuration.
    #[must_use]
    pub fn dtcm(&self) -> TcmConfig {
        self.dtcm
    }

    /// Current ITCM configuration.
    #[must_use]
    pub fn itcm(&self) -> TcmConfig {
        self.itcm
    }

    /// Reads a CP15 register by its packed `(CRn, CRm, opcode2)` address.
    /// Unrecognized addresses read back zero, matching reserved-register
    /// behavior on real silicon rather than trapping.
    #[must_use]
    pub fn read_register(&self, crn: u32, crm: u32, opcode2: u32) -> u32 {
        match reg_addr(crn, crm, opcode2) {
            0x000 => Self::MAIN_ID,
            0x001 => Self::CACHE_TYPE,
            0x002 => Self::TCM_SIZE,
            0x100 => self.control,
            0x200 => self.cacheability[0],
            0x201 => self.cacheability[1],
            0x300 => self.write_buffer,
            0x500 | 0x501 => pack_backward_compatible_access(self.access_permission),
            0x502 => self.access_permission[2],
            0x503 => self.access_permission[3],
            addr @ 0x600..=0x671 => self.read_region(addr),
            0x910 => self.dtcm_params,
            0x911 => self.itcm_params,
            _ => 0,
        }
    }

    /// Writes a CP15 register by its packed `(CRn, CRm, opcode2)` address.
    /// Writes to unrecognized addresses, and to the cache-maintenance range
    /// outside the two WFI addresses, are accepted as no-ops.
    pub fn write_register(&mut self, crn: u32, crm: u32, opcode2: u32, value: u32) {
        match reg_addr(crn, crm, opcode2) {
            0x000 | 0x001 | 0x002 => {} // read-only identification registers
            0x100 => self.control = (self.control & !CONTROL_WRITABLE_MASK) | (value & CONTROL_WRITABLE_MASK),
            0x200 => self.cacheability[0] = value,
            0x201 => self.cacheability[1] = value,
            0x300 => self.write_buffer = value,
            0x500 | 0x501 => self.unpack_backward_compatible_access(value),
            0x502 => self.access_permission[2] = value,
            0x503 => self.access_permission[3] = value,
            addr @ 0x600..=0x671 => self.write_region(addr, value),
            0x704 | 0x782 => self.wfi_requested = true,
            addr @ 0x750..=0x7A2 => {
                // Cache/TLB maintenance operations: no cache is modeled, so
                // every form (invalidate-all, invalidate-line, clean, drain
                // write buffer) collapses to one notification.
                let _ = addr;
                self.invalidate_pending = true;
            }
            0x910 => {
                self.dtcm_params = value;
                self.configure_dtcm(value);
            }
            0x911 => {
                self.itcm_params = value;
                self.configure_itcm(value);
            }
            _ => {}
        }
    }

    fn read_region(&self, addr: u32) -> u32 {
        let index = ((addr >> 4) & 0xF) as usize;
        if index >= self.regions.len() {
            return 0;
        }
        if addr & 1 == 0 {
            self.regions[index].data
        } else {
            self.regions[index].inst
        }
    }

    fn write_region(&mut self, addr: u32, value: u32) {
        let index = ((addr >> 4) & 0xF) as usize;
        if index >= self.regions.len() {
            return;
        }
        if addr & 1 == 0 {
            self.regions[index].data = value;
        } else {
            self.regions[index].inst = value;
        }
    }

    /// Unpacks the backwards-compatible access-permission form: four 2-bit
    /// access fields packed into 4-bit slots across the eight regions.
    fn unpack_backward_compatible_access(&mut self, value: u32) {
        for (i, slot) in self.access_permission.iter_mut().enumerate() {
            let shift = i * 8;
            let two_bit = (value >> (shift)) & 0b11;
            *slot = (*slot & !0b11) | two_bit;
        }
    }

    /// Recomputes DTCM sizing from a `0x910` write. See the module-level
    /// formula: `write_size = 0x200 << ((params>>1)&0x1F)`, `read_size` is
    /// zero while the load-mode control bit is set, `base` is 4 KiB aligned.
    fn configure_dtcm(&mut self, params: u32) {
        let write_size = 0x200u32 << ((params >> 1) & 0x1F);
        let read_size = if self.control & CONTROL_DTCM_LOAD_BIT != 0 { 0 } else { write_size };
        self.dtcm = TcmConfig {
            base: params & 0xFFFF_F000,
            write_size,
            read_size,
        };
    }

    /// Recomputes ITCM sizing from a `0x911` write. ITCM has no independent
    /// base field — it is always anchored at `0x00000000`.
    fn configure_itcm(&mut self, params: u32) {
        let write_size = 0x200u32 << ((params >> 1) & 0x1F);
        let read_size = if self.control & CONTROL_ITCM_LOAD_BIT != 0 { 0 } else { write_size };
        self.itcm = TcmConfig {
            base: 0,
            write_size,
            read_size,
        };
    }

    /// Flattens this coprocessor's persisted fields for snapshot capture.
    /// `dtcm`/`itcm` are left out: both are fully determined by `control`,
    /// `dtcm_params`, and `itcm_params`, and `restore_raw_state` recomputes
    /// them the same way a guest write to `0x910`/`0x911` would.
    pub(crate) fn raw_state(&self) -> Cp15RawState {
        Cp15RawState {
            control: self.control,
            cacheability: self.cacheability,
            write_buffer: self.write_buffer,
            access_permission: self.access_permission,
            regions: self.regions.map(|r| (r.data, r.inst)),
            dtcm_params: self.dtcm_params,
            itcm_params: self.itcm_params,
        }
    }

    /// Restores persisted fields and recomputes `dtcm`/`itcm` sizing from
    /// them, in the order a guest's own register writes would (`control`
    /// before the TCM parameter registers, since sizing reads `control`'s
    /// load-mode bits).
    pub(crate) fn restore_raw_state(&mut self, state: Cp15RawState) {
        self.control = state.control;
        self.cacheability = state.cacheability;
        self.write_buffer = state.write_buffer;
        self.access_permission = state.access_permission;
        self.regions = state.regions.map(|(data, inst)| RegionConfig { data, inst });
        self.dtcm_params = state.dtcm_params;
        self.itcm_params = state.itcm_params;
        self.configure_dtcm(state.dtcm_params);
        self.configure_itcm(state.itcm_params);
    }
}

/// Plain-`u32` mirror of [`Cp15`]'s persisted fields, used by `snapshot.rs`
/// to build its serializable [`Cp15Snapshot`](crate::snapshot::Cp15Snapshot)
/// without exposing this module's internal `RegionConfig`/`TcmConfig` shapes.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Cp15RawState {
    pub control: u32,
    pub cacheability: [u32; 2],
    pub write_buffer: u32,
    pub access_permission: [u32; 4],
    pub regions: [(u32, u32); 8],
    pub dtcm_params: u32,
    pub itcm_params: u32,
}

/// Packs the four modern 2-bit access-permission fields into the legacy
/// backwards-compatible layout (4 bits per region, low 2 bits meaningful).
fn pack_backward_compatible_access(fields: [u32; 4]) -> u32 {
    fields.iter().enumerate().fold(0u32, |acc, (i, &field)| acc | ((field & 0b11) << (i * 8)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_id_and_cache_type_are_read_only() {
        let mut cp15 = Cp15::default();
        cp15.write_register(0, 0, 0, 0xFFFF_FFFF);
        assert_eq!(cp15.read_register(0, 0, 0), Cp15::MAIN_ID);
        assert_eq!(cp15.read_register(0, 0, 1), Cp15::CACHE_TYPE);
    }

    #[test]
    fn control_register_write_respects_mask() {
        let mut cp15 = Cp15::default();
        cp15.write_register(1, 0, 0, 0xFFFF_FFFF);
        assert_eq!(cp15.read_register(1, 0, 0), CONTROL_WRITABLE_MASK);
    }

    #[test]
    fn high_vectors_follows_control_v_bit() {
        let mut cp15 = Cp15::default();
        assert!(!cp15.high_vectors());
        cp15.write_register(1, 0, 0, CONTROL_V_BIT);
        assert!(cp15.high_vectors());
    }

    #[test]
    fn wait_for_interrupt_sets_and_consumes_request() {
        let mut cp15 = Cp15::default();
        cp15.write_register(7, 0, 4, 0);
        assert!(cp15.take_wfi_request());
        assert!(!cp15.take_wfi_request());
    }

    #[test]
    fn cache_maintenance_writes_set_invalidate_notification() {
        let mut cp15 = Cp15::default();
        cp15.write_register(7, 6, 0, 0);
        assert!(cp15.take_invalidate_pending());
        assert!(!cp15.take_invalidate_pending());
    }

    #[test]
    fn dtcm_configuration_computes_base_and_sizes() {
        let mut cp15 = Cp15::default();
        cp15.write_register(9, 1, 0, 0x0030_0006); // base=0x00300000, params>>1&0x1F = 3
        let dtcm = cp15.dtcm();
        assert_eq!(dtcm.base, 0x0030_0000);
        assert_eq!(dtcm.write_size, 0x200 << 3);
        assert_eq!(dtcm.read_size, dtcm.write_size);
    }

    #[test]
    fn dtcm_load_mode_disables_read_size() {
        let mut cp15 = Cp15::default();
        cp15.write_register(1, 0, 0, CONTROL_DTCM_LOAD_BIT);
        cp15.write_register(9, 1, 0, 0x0010_0002);
        assert_eq!(cp15.dtcm().read_size, 0);
    }

    #[test]
    fn region_registers_round_trip_by_crm_index() {
        let mut cp15 = Cp15::default();
        cp15.write_register(6, 3, 0, 0xABCD_0000);
        cp15.write_register(6, 3, 1, 0x1234_0000);
        assert_eq!(cp15.read_register(6, 3, 0), 0xABCD_0000);
        assert_eq!(cp15.read_register(6, 3, 1), 0x1234_0000);
    }
}
