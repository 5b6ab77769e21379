//! Builds and memoizes the ARM and Thumb decode-table contents, and the
//! condition-code truth table.
//!
//! Each table is a pure function of its index, built once behind a
//! [`std::sync::OnceLock`] rather than recomputed per lookup. The 12-bit ARM
//! index is `((opcode >> 16) & 0xFF0) | ((opcode >> 4) & 0xF)` — instruction
//! bits 27:20 and 7:4 — and the 10-bit Thumb index is `opcode >> 6`.

use std::sync::OnceLock;

use crate::config::CpuVariant;
use crate::isa::instruction::{AluOp, ArmOpKind, HalfwordKind, ImmediateOpKind, ShiftKind, ThumbOpKind};

/// Number of entries in the ARM decode table.
pub const ARM_TABLE_SIZE: usize = 4096;
/// Number of entries in the Thumb decode table.
pub const THUMB_TABLE_SIZE: usize = 1024;

/// Computes the 12-bit ARM decode-table index from a raw opcode.
#[must_use]
pub fn arm_table_index(opcode: u32) -> usize {
    (((opcode >> 16) & 0xFF0) | ((opcode >> 4) & 0xF)) as usize
}

/// Computes the 10-bit Thumb decode-table index from a raw opcode.
#[must_use]
pub fn thumb_table_index(opcode: u16) -> usize {
    (opcode >> 6) as usize
}

/// Returns the ARM decode table, building it on first use.
#[must_use]
pub fn arm_table() -> &'static [ArmOpKind; ARM_TABLE_SIZE] {
    static TABLE: OnceLock<[ArmOpKind; ARM_TABLE_SIZE]> = OnceLock::new();
    TABLE.get_or_init(|| std::array::from_fn(|i| classify_arm(i as u32)))
}

/// Returns the Thumb decode table, building it on first use.
#[must_use]
pub fn thumb_table() -> &'static [ThumbOpKind; THUMB_TABLE_SIZE] {
    static TABLE: OnceLock<[ThumbOpKind; THUMB_TABLE_SIZE]> = OnceLock::new();
    TABLE.get_or_init(|| std::array::from_fn(|i| classify_thumb(i as u16)))
}

/// Returns the "special condition" ARM decode table for one variant,
/// building it on first use.
///
/// `cond == 0xF` repurposes several conditional-instruction bit patterns for
/// unconditional instructions absent from the ordinary table (`PLD`, the
/// immediate-offset `BLX`, unconditional CP2 operations). The table is
/// per-[`CpuVariant`] because this whole encoding space is reserved on
/// ARMv4T, which has none of these instructions.
#[must_use]
pub fn arm_special_table(variant: CpuVariant) -> &'static [ArmOpKind; ARM_TABLE_SIZE] {
    static V4T: OnceLock<[ArmOpKind; ARM_TABLE_SIZE]> = OnceLock::new();
    static V5TE: OnceLock<[ArmOpKind; ARM_TABLE_SIZE]> = OnceLock::new();
    match variant {
        CpuVariant::Armv4T => V4T.get_or_init(|| std::array::from_fn(|i| classify_arm_special(i as u32, variant))),
        CpuVariant::Armv5TE => V5TE.get_or_init(|| std::array::from_fn(|i| classify_arm_special(i as u32, variant))),
    }
}

/// Classifies a raw ARM opcode into its coarse kind, routing through
/// [`arm_special_table`] whenever the condition nibble is `0xF`.
///
/// This is the single place that decides between the ordinary conditional
/// decode space and the unconditional "special condition" one; callers
/// should use this rather than indexing [`arm_table`] directly.
#[must_use]
pub fn classify_arm_opcode(opcode: u32, variant: CpuVariant) -> ArmOpKind {
    if opcode >> 28 == 0xF {
        arm_special_table(variant)[arm_table_index(opcode)]
    } else {
        arm_table()[arm_table_index(opcode)]
    }
}

/// Returns the 256-entry condition-pass truth table, indexed by
/// `(nzcv << 4) | cond`, building it on first use.
#[must_use]
pub fn condition_table() -> &'static [bool; 256] {
    static TABLE: OnceLock<[bool; 256]> = OnceLock::new();
    TABLE.get_or_init(|| std::array::from_fn(|i| classify_condition((i >> 4) as u32, (i & 0xF) as u32)))
}

/// Evaluates one ARM condition code (bits 31:28 of the instruction) against
/// a packed NZCV nibble.
fn classify_condition(nzcv: u32, cond: u32) -> bool {
    let n = nzcv & 0b1000 != 0;
    let z = nzcv & 0b0100 != 0;
    let c = nzcv & 0b0010 != 0;
    let v = nzcv & 0b0001 != 0;
    match cond {
        0x0 => z,
        0x1 => !z,
        0x2 => c,
        0x3 => !c,
        0x4 => n,
        0x5 => !n,
        0x6 => v,
        0x7 => !v,
        0x8 => c && !z,
        0x9 => !c || z,
        0xA => n == v,
        0xB => n != v,
        0xC => !z && (n == v),
        0xD => z || (n != v),
        0xE => true,
        // 0xF (AL-special) is resolved by the caller before reaching the
        // condition table; treat it as always-true here for completeness.
        _ => true,
    }
}

/// Classifies a 12-bit ARM decode index into its coarse instruction kind.
///
/// Follows the classical bit-layout breakdown of instruction bits 27:20
/// (`hi`) and 7:4 (`lo`): bits 27:26 select the primary format family, and
/// within the data-processing family (`00`), specific `hi`/`lo` patterns
/// carve out multiply, swap, halfword-transfer, and branch-exchange.
fn classify_arm(index: u32) -> ArmOpKind {
    let hi = (index >> 4) & 0xFF; // original bits 27:20
    let lo = index & 0xF; // original bits 7:4

    match hi >> 6 {
        0b00 => classify_arm_00(hi, lo),
        0b01 => {
            if hi & 0x20 != 0 && lo & 0x1 != 0 {
                // bit 25=1 (register offset) with bit 4=1: reserved
                // register-specified-shift-amount encoding, undefined.
                ArmOpKind::Undefined
            } else {
                ArmOpKind::SingleDataTransfer {
                    immediate_offset: hi & 0x20 == 0,
                    pre_indexed: hi & 0x10 != 0,
                    add: hi & 0x08 != 0,
                    byte: hi & 0x04 != 0,
                    writeback: hi & 0x10 == 0 || hi & 0x02 != 0,
                    load: hi & 0x01 != 0,
                }
            }
        }
        0b10 => {
            if hi & 0x20 == 0 {
                ArmOpKind::BlockDataTransfer {
                    pre_indexed: hi & 0x10 != 0,
                    add: hi & 0x08 != 0,
                    user_bank: hi & 0x04 != 0,
                    writeback: hi & 0x02 != 0,
                    load: hi & 0x01 != 0,
                }
            } else {
                ArmOpKind::Branch { link: hi & 0x10 != 0 }
            }
        }
        _ => classify_arm_11(hi, lo),
    }
}

/// Classifies a 12-bit ARM decode index within the `cond == 0xF` special
/// space, which redefines parts of the `01` and `10` families and all of
/// `11` for unconditional use. Undefined entirely on ARMv4T.
fn classify_arm_special(index: u32, variant: CpuVariant) -> ArmOpKind {
    if variant == CpuVariant::Armv4T {
        return ArmOpKind::Undefined;
    }

    let hi = (index >> 4) & 0xFF; // original bits 27:20
    let lo = index & 0xF; // original bits 7:4

    match hi >> 6 {
        // P=1, B=0, W=1, L=1 (U and I are don't-cares): PLD.
        0b01 if hi & 0x17 == 0x13 => ArmOpKind::Preload,
        // Branch sub-family (bit 25 set): immediate-offset BLX, with the
        // old "link" bit position repurposed as the H bit.
        0b10 if hi & 0x20 != 0 => ArmOpKind::BranchLinkExchange { h: hi & 0x10 != 0 },
        0b11 => classify_arm_11(hi, lo),
        _ => ArmOpKind::Undefined,
    }
}

/// The `00` primary family: data processing, multiply, swap, halfword
/// transfer, and branch-exchange all share this top-level bit pattern.
fn classify_arm_00(hi: u32, lo: u32) -> ArmOpKind {
    let immediate = hi & 0x20 != 0;

    if !immediate {
        if lo == 0b1001 {
            return classify_multiply_family(hi);
        }
        if lo == 0b0001 && hi == 0b0001_0010 {
            return ArmOpKind::BranchExchange { link: false };
        }
        if lo == 0b0011 && hi == 0b0001_0010 {
            return ArmOpKind::BranchExchange { link: true };
        }
        if lo == 0b0001 && hi == 0b0001_0110 {
            return ArmOpKind::CountLeadingZeros;
        }
        if (lo == 0b0101 || lo == 0b0111) && hi & 0x19 == 0x10 {
            return ArmOpKind::SaturatingAddSub;
        }
        if (lo & 0b1001) == 0b1000 && hi & 0x19 == 0x10 {
            return ArmOpKind::SignedHalfwordMultiply;
        }
        if lo & 0b1001 == 0b1001 && hi & 0x1B == 0x10 {
            return ArmOpKind::SingleDataSwap { byte: hi & 0x04 != 0 };
        }
        if (lo & 0b1001) == 0b1001 && lo != 0b1001 {
            return ArmOpKind::HalfwordTransfer {
                pre_indexed: hi & 0x10 != 0,
                add: hi & 0x08 != 0,
                immediate_offset: hi & 0x04 != 0,
                writeback: hi & 0x10 == 0 || hi & 0x02 != 0,
                load: hi & 0x01 != 0,
                kind: match lo & 0b0110 {
                    0b0010 => HalfwordKind::UnsignedHalf,
                    0b0100 => HalfwordKind::SignedByte,
                    0b0110 => HalfwordKind::SignedHalf,
                    _ => HalfwordKind::Doubleword,
                },
            };
        }
    }

    ArmOpKind::DataProcessing {
        immediate,
        op: AluOp::from_bits(hi >> 1),
        set_flags: hi & 0x01 != 0,
    }
}

/// Decodes the multiply/multiply-long family (`hi` bits 27:23 = `00001` or
/// `27:22 = 000000`, `lo == 1001`).
fn classify_multiply_family(hi: u32) -> ArmOpKind {
    if hi & 0x20 != 0 {
        ArmOpKind::MultiplyLong {
            signed: hi & 0x04 != 0,
            accumulate: hi & 0x02 != 0,
            set_flags: hi & 0x01 != 0,
        }
    } else {
        ArmOpKind::Multiply {
            accumulate: hi & 0x02 != 0,
            set_flags: hi & 0x01 != 0,
        }
    }
}

/// The `11` primary family: coprocessor operations and `SWI`.
fn classify_arm_11(hi: u32, lo: u32) -> ArmOpKind {
    if hi & 0x20 != 0 {
        return ArmOpKind::SoftwareInterrupt;
    }
    if hi & 0x10 != 0 {
        if lo & 0x1 != 0 {
            ArmOpKind::CoprocessorOp // MRC/MCR
        } else {
            ArmOpKind::CoprocessorOp // CDP
        }
    } else {
        ArmOpKind::CoprocessorDataTransfer
    }
}

/// Classifies a 10-bit Thumb decode index (`opcode >> 6`) into its coarse
/// instruction format, following the sixteen-ish canonical Thumb formats.
fn classify_thumb(index: u16) -> ThumbOpKind {
    let top5 = index >> 5; // original bits 15:11

    match top5 {
        0b000_00 | 0b000_01 | 0b000_10 => {
            ThumbOpKind::MoveShiftedRegister(ShiftKind::from_bits(u32::from(top5 & 0b11)))
        }
        0b000_11 => {
            let bits = index & 0b11111;
            ThumbOpKind::AddSubtract {
                subtract: bits & 0b00010 != 0,
                immediate: bits & 0b00100 != 0,
            }
        }
        0b001_00 | 0b001_01 | 0b001_10 | 0b001_11 => {
            let op = (index >> 3) & 0b11;
            ThumbOpKind::ImmediateOp(match op {
                0b00 => ImmediateOpKind::Mov,
                0b01 => ImmediateOpKind::Cmp,
                0b10 => ImmediateOpKind::Add,
                _ => ImmediateOpKind::Sub,
            })
        }
        0b010_00 => {
            if index & 0b11_1100 == 0 {
                ThumbOpKind::AluOperation
            } else if index & 0b11_0000 == 0b01_0000 {
                ThumbOpKind::HiRegisterOpOrBranchExchange
            } else {
                ThumbOpKind::PcRelativeLoad
            }
        }
        0b010_01 => ThumbOpKind::PcRelativeLoad,
        0b010_10 | 0b010_11 => {
            if index & 0b00100 == 0 {
                ThumbOpKind::LoadStoreRegisterOffset {
                    byte: index & 0b01000 != 0,
                    load: index & 0b10000 != 0,
                }
            } else {
                ThumbOpKind::LoadStoreSignExtended {
                    halfword: index & 0b01000 != 0,
                    sign_extend: index & 0b10000 != 0,
                }
            }
        }
        0b011_00 | 0b011_01 | 0b011_10 | 0b011_11 => ThumbOpKind::LoadStoreImmediateOffset {
            byte: top5 & 0b10 != 0,
            load: top5 & 0b01 != 0,
        },
        0b100_00 | 0b100_01 => ThumbOpKind::LoadStoreHalfword { load: top5 & 0b01 != 0 },
        0b100_10 | 0b100_11 => ThumbOpKind::SpRelativeLoadStore { load: top5 & 0b01 != 0 },
        0b101_00 | 0b101_01 => ThumbOpKind::LoadAddress { stack_pointer: top5 & 0b01 != 0 },
        0b101_10 => {
            if index & 0b10_0110 == 0 {
                ThumbOpKind::AddOffsetToStackPointer
            } else {
                ThumbOpKind::PushPopRegisters {
                    pop: false,
                    store_lr_or_load_pc: index & 0b00_0100 != 0,
                }
            }
        }
        0b101_11 => ThumbOpKind::PushPopRegisters {
            pop: true,
            store_lr_or_load_pc: index & 0b00_0100 != 0,
        },
        0b110_00 | 0b110_01 => ThumbOpKind::MultipleLoadStore { load: top5 & 0b01 != 0 },
        0b110_10 => {
            if index & 0b11111 == 0b11111 {
                ThumbOpKind::SoftwareInterrupt
            } else {
                ThumbOpKind::ConditionalBranch
            }
        }
        0b110_11 => ThumbOpKind::SoftwareInterrupt,
        0b111_00 => ThumbOpKind::UnconditionalBranch,
        0b111_01 => ThumbOpKind::Undefined,
        _ => ThumbOpKind::LongBranchWithLink,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    /// Every ARM condition code against a representative sample of NZCV
    /// combinations, cross-checked against the equivalent flag comparison
    /// written out by hand.
    #[rstest]
    #[case(0x0, 0b0100, true)] // EQ, Z set
    #[case(0x0, 0b0000, false)] // EQ, Z clear
    #[case(0x1, 0b0000, true)] // NE, Z clear
    #[case(0x2, 0b0010, true)] // CS, C set
    #[case(0x3, 0b0000, true)] // CC, C clear
    #[case(0x4, 0b1000, true)] // MI, N set
    #[case(0x5, 0b0000, true)] // PL, N clear
    #[case(0x6, 0b0001, true)] // VS, V set
    #[case(0x7, 0b0000, true)] // VC, V clear
    #[case(0x8, 0b0010, true)] // HI, C set and Z clear
    #[case(0x8, 0b0110, false)] // HI, C set but Z also set
    #[case(0x9, 0b0000, true)] // LS, C clear
    #[case(0xA, 0b0000, true)] // GE, N == V (both clear)
    #[case(0xA, 0b1001, true)] // GE, N == V (both set)
    #[case(0xB, 0b1000, true)] // LT, N != V
    #[case(0xC, 0b0000, true)] // GT, Z clear and N == V
    #[case(0xD, 0b0100, true)] // LE, Z set
    #[case(0xE, 0b0000, true)] // AL, always
    fn condition_matches_hand_evaluated_flags(#[case] cond: u32, #[case] nzcv: u32, #[case] expected: bool) {
        assert_eq!(classify_condition(nzcv, cond), expected);
    }

    #[test]
    fn arm_table_index_extracts_bits_27_20_and_7_4() {
        let opcode = 0b1110_00_1_0100_1_0001_0000_000000000000u32;
        let index = arm_table_index(opcode);
        assert_eq!(index, ((opcode >> 16) & 0xFF0) as usize | ((opcode >> 4) & 0xF) as usize);
    }

    #[test]
    fn thumb_table_index_is_top_ten_bits() {
        assert_eq!(thumb_table_index(0xFFFF), 0x3FF);
        assert_eq!(thumb_table_index(0x0000), 0);
    }

    #[test]
    fn condition_always_passes_for_al() {
        for nzcv in 0..16u32 {
            assert!(classify_condition(nzcv, 0xE));
        }
    }

    #[test]
    fn condition_eq_checks_zero_flag() {
        assert!(classify_condition(0b0100, 0x0));
        assert!(!classify_condition(0b0000, 0x0));
    }

    #[test]
    fn condition_table_matches_direct_evaluation() {
        let table = condition_table();
        for nzcv in 0..16u32 {
            for cond in 0..15u32 {
                let i = ((nzcv << 4) | cond) as usize;
                assert_eq!(table[i], classify_condition(nzcv, cond));
            }
        }
    }

    #[test]
    fn software_interrupt_occupies_the_top_sixteenth_of_the_arm_table() {
        let table = arm_table();
        let index = arm_table_index(0xFF00_0000);
        assert_eq!(table[index], ArmOpKind::SoftwareInterrupt);
    }

    #[test]
    fn branch_exchange_is_classified_from_its_fixed_bit_pattern() {
        let table = arm_table();
        let opcode = 0b0000_0001_0010_1111_1111_1111_0001_0000u32;
        let index = arm_table_index(opcode);
        assert_eq!(table[index], ArmOpKind::BranchExchange { link: false });
    }

    #[test]
    fn reserved_media_encoding_resolves_to_undefined() {
        let table = arm_table();
        let opcode = 0b0000_011_00000_0000_0000_0000_0001_0000u32;
        let index = arm_table_index(opcode);
        assert_eq!(table[index], ArmOpKind::Undefined);
    }

    #[test]
    fn pld_immediate_and_register_forms_both_classify_as_preload() {
        let immediate = 0xF530_0000u32; // cond=F, hi=0x53 (U=0)
        let register = 0xF5B0_0000u32; // cond=F, hi=0x5B (U=1)
        assert_eq!(classify_arm_opcode(immediate, CpuVariant::Armv5TE), ArmOpKind::Preload);
        assert_eq!(classify_arm_opcode(register, CpuVariant::Armv5TE), ArmOpKind::Preload);
    }

    #[test]
    fn pld_bit_pattern_would_otherwise_misclassify_as_single_data_transfer() {
        let opcode = 0xF530_0000u32;
        let index = arm_table_index(opcode);
        assert!(matches!(arm_table()[index], ArmOpKind::SingleDataTransfer { .. }));
    }

    #[test]
    fn blx_immediate_classifies_with_its_h_bit() {
        let without_h = 0xFA00_0000u32; // cond=F, bits27:24 = 1010
        let with_h = 0xFB00_0000u32; // cond=F, bits27:24 = 1011
        assert_eq!(classify_arm_opcode(without_h, CpuVariant::Armv5TE), ArmOpKind::BranchLinkExchange { h: false });
        assert_eq!(classify_arm_opcode(with_h, CpuVariant::Armv5TE), ArmOpKind::BranchLinkExchange { h: true });
    }

    #[test]
    fn special_condition_space_is_undefined_on_armv4t() {
        let pld = 0xF530_0000u32;
        let blx = 0xFA00_0000u32;
        assert_eq!(classify_arm_opcode(pld, CpuVariant::Armv4T), ArmOpKind::Undefined);
        assert_eq!(classify_arm_opcode(blx, CpuVariant::Armv4T), ArmOpKind::Undefined);
    }

    #[test]
    fn classify_arm_opcode_matches_ordinary_table_for_conditional_opcodes() {
        let opcode = 0xE320_F000u32; // cond=E (AL), NOP-ish data processing
        assert_eq!(
            classify_arm_opcode(opcode, CpuVariant::Armv5TE),
            arm_table()[arm_table_index(opcode)]
        );
    }
}
