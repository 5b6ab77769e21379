//! Coarse instruction classes produced by the decode tables.
//!
//! Each variant carries only the fields derivable from the table index
//! itself (the bits that select the table entry); register numbers, shift
//! amounts, and immediate values live in the lower opcode bits and are
//! re-extracted by the handler from the raw instruction word at execution
//! time. This mirrors the source decoder's split between "which handler"
//! (a compile-time decision baked into the table) and "which operands" (a
//! runtime decision made inside the handler).

/// The four-bit ALU opcode field of a data-processing instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum AluOp {
    And, Eor, Sub, Rsb, Add, Adc, Sbc, Rsc,
    Tst, Teq, Cmp, Cmn, Orr, Mov, Bic, Mvn,
}

impl AluOp {
    /// Decodes the 4-bit opcode field (instruction bits 24:21).
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0xF {
            0x0 => AluOp::And,
            0x1 => AluOp::Eor,
            0x2 => AluOp::Sub,
            0x3 => AluOp::Rsb,
            0x4 => AluOp::Add,
            0x5 => AluOp::Adc,
            0x6 => AluOp::Sbc,
            0x7 => AluOp::Rsc,
            0x8 => AluOp::Tst,
            0x9 => AluOp::Teq,
            0xA => AluOp::Cmp,
            0xB => AluOp::Cmn,
            0xC => AluOp::Orr,
            0xD => AluOp::Mov,
            0xE => AluOp::Bic,
            _ => AluOp::Mvn,
        }
    }

    /// Whether this opcode writes its result to `Rd` (the "test" ops
    /// TST/TEQ/CMP/CMN only update flags).
    #[must_use]
    pub fn writes_result(self) -> bool {
        !matches!(self, AluOp::Tst | AluOp::Teq | AluOp::Cmp | AluOp::Cmn)
    }
}

/// Barrel-shifter operation selected by instruction bits 6:5.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShiftKind {
    /// Logical shift left.
    Lsl,
    /// Logical shift right.
    Lsr,
    /// Arithmetic shift right.
    Asr,
    /// Rotate right (and RRX when the shift amount is zero in immediate form).
    Ror,
}

impl ShiftKind {
    /// Decodes the 2-bit shift-type field.
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0b11 {
            0b00 => ShiftKind::Lsl,
            0b01 => ShiftKind::Lsr,
            0b10 => ShiftKind::Asr,
            _ => ShiftKind::Ror,
        }
    }
}

/// Coarse classification of a 32-bit ARM-state instruction, as resolved
/// from its 12-bit decode-table index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArmOpKind {
    /// Data-processing (ALU) instruction: AND/EOR/SUB/.../MVN.
    DataProcessing {
        /// Whether operand 2 is an immediate (`I` bit) or a shifted register.
        immediate: bool,
        /// The ALU operation.
        op: AluOp,
        /// Whether this instruction updates the condition flags (`S` bit).
        set_flags: bool,
    },
    /// 32-bit multiply or multiply-accumulate (MUL/MLA).
    Multiply {
        /// Whether the result is accumulated into `Rn` (MLA) or not (MUL).
        accumulate: bool,
        /// Whether this instruction updates the condition flags.
        set_flags: bool,
    },
    /// 64-bit multiply family (UMULL/UMLAL/SMULL/SMLAL).
    MultiplyLong {
        /// Signed (SMULL/SMLAL) vs unsigned (UMULL/UMLAL).
        signed: bool,
        /// Whether the 64-bit result accumulates into `RdHi:RdLo`.
        accumulate: bool,
        /// Whether this instruction updates the condition flags.
        set_flags: bool,
    },
    /// `SWP`/`SWPB`: atomic load-then-store swap.
    SingleDataSwap {
        /// Byte (`true`) or word (`false`) swap.
        byte: bool,
    },
    /// `BX`/`BLX` (register form): branch (and link) with exchange to
    /// Thumb state if the target's bit 0 is set.
    BranchExchange {
        /// Whether this also links (writes the return address to R14).
        link: bool,
    },
    /// Halfword or signed byte load/store (`LDRH`/`STRH`/`LDRSB`/`LDRSH`),
    /// and on ARMv5TE, doubleword `LDRD`/`STRD`.
    HalfwordTransfer {
        /// Pre-indexed (`true`) vs post-indexed (`false`) addressing.
        pre_indexed: bool,
        /// Add (`true`) vs subtract (`false`) the offset.
        add: bool,
        /// Immediate offset (`true`) vs register offset (`false`).
        immediate_offset: bool,
        /// Write the computed address back to the base register.
        writeback: bool,
        /// Load (`true`) vs store (`false`).
        load: bool,
        /// The halfword/signed/doubleword access kind, from bits 6:5.
        kind: HalfwordKind,
    },
    /// Word or byte load/store (`LDR`/`STR`/`LDRB`/`STRB`), with an
    /// immediate or register-shifted-register offset.
    SingleDataTransfer {
        /// Immediate offset (`true`) vs register offset (`false`).
        immediate_offset: bool,
        /// Pre-indexed (`true`) vs post-indexed (`false`) addressing.
        pre_indexed: bool,
        /// Add (`true`) vs subtract (`false`) the offset.
        add: bool,
        /// Byte (`true`) vs word (`false`) access.
        byte: bool,
        /// Write the computed address back to the base register
        /// (always true for post-indexed forms).
        writeback: bool,
        /// Load (`true`) vs store (`false`).
        load: bool,
    },
    /// Block data transfer (`LDM`/`STM`).
    BlockDataTransfer {
        /// Pre-indexed (`true`) vs post-indexed (`false`).
        pre_indexed: bool,
        /// Add (`true`, increment) vs subtract (`false`, decrement).
        add: bool,
        /// Use the user-mode register bank regardless of current mode (`^`).
        user_bank: bool,
        /// Write the new base address back to the base register.
        writeback: bool,
        /// Load (`true`) vs store (`false`).
        load: bool,
    },
    /// Branch, or branch-with-link (`B`/`BL`).
    Branch {
        /// Whether this links (writes the return address to R14).
        link: bool,
    },
    /// `BLX` immediate-offset form (ARMv5TE only): unconditional
    /// branch-with-link that always switches to Thumb state. The `H` bit
    /// contributes an extra halfword to the target address.
    BranchLinkExchange {
        /// Bit 24 of the unconditional encoding, repurposed as the target
        /// address's bit 1.
        h: bool,
    },
    /// Coprocessor data transfer (`LDC`/`STC`).
    CoprocessorDataTransfer,
    /// Coprocessor data operation (`CDP`) or register transfer
    /// (`MRC`/`MCR`), disambiguated by instruction bit 4 at execution time.
    CoprocessorOp,
    /// Software interrupt (`SWI`/`SVC`).
    SoftwareInterrupt,
    /// Count leading zeros (`CLZ`, ARMv5TE only).
    CountLeadingZeros,
    /// Saturating add/subtract (`QADD`/`QSUB`/`QDADD`/`QDSUB`, ARMv5TE only).
    SaturatingAddSub,
    /// Signed halfword multiply family (`SMULxy`/`SMLAxy`/`SMULWy`/
    /// `SMLAWy`/`SMLALxy`, ARMv5TE only).
    SignedHalfwordMultiply,
    /// Cache preload hint (`PLD`, ARMv5TE only).
    Preload,
    /// Reserved encoding: enters the undefined-instruction exception.
    Undefined,
}

/// Access width/signedness for [`ArmOpKind::HalfwordTransfer`], from
/// instruction bits 6:5 (`SH`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HalfwordKind {
    /// Unsigned halfword.
    UnsignedHalf,
    /// Signed byte.
    SignedByte,
    /// Signed halfword.
    SignedHalf,
    /// ARMv5TE doubleword (two consecutive words).
    Doubleword,
}

/// Coarse classification of a 16-bit Thumb-state instruction, as resolved
/// from its 10-bit decode-table index (`opcode >> 6`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ThumbOpKind {
    /// Format 1: move shifted register.
    MoveShiftedRegister(ShiftKind),
    /// Format 2: add/subtract (register or 3-bit immediate).
    AddSubtract {
        /// Subtract instead of add.
        subtract: bool,
        /// Operand 2 is a 3-bit immediate instead of a register.
        immediate: bool,
    },
    /// Format 3: move/compare/add/subtract immediate.
    ImmediateOp(ImmediateOpKind),
    /// Format 4: ALU operation between two low registers.
    AluOperation,
    /// Format 5: hi-register operation or branch-exchange.
    HiRegisterOpOrBranchExchange,
    /// Format 6: PC-relative load.
    PcRelativeLoad,
    /// Format 7: load/store with register offset.
    LoadStoreRegisterOffset {
        /// Byte (`true`) vs word (`false`).
        byte: bool,
        /// Load (`true`) vs store (`false`).
        load: bool,
    },
    /// Format 8: load/store sign-extended byte/halfword.
    LoadStoreSignExtended {
        /// `H` bit: halfword (`true`) vs byte (`false`).
        halfword: bool,
        /// `S` bit: sign-extend on load.
        sign_extend: bool,
    },
    /// Format 9: load/store with 5-bit immediate offset.
    LoadStoreImmediateOffset {
        /// Byte (`true`) vs word (`false`).
        byte: bool,
        /// Load (`true`) vs store (`false`).
        load: bool,
    },
    /// Format 10: load/store halfword with 5-bit immediate offset.
    LoadStoreHalfword {
        /// Load (`true`) vs store (`false`).
        load: bool,
    },
    /// Format 11: SP-relative load/store.
    SpRelativeLoadStore {
        /// Load (`true`) vs store (`false`).
        load: bool,
    },
    /// Format 12: load address (into PC or SP).
    LoadAddress {
        /// Relative to SP (`true`) vs PC (`false`).
        stack_pointer: bool,
    },
    /// Format 13: add offset to stack pointer.
    AddOffsetToStackPointer,
    /// Format 14: push/pop registers.
    PushPopRegisters {
        /// Pop (`true`) vs push (`false`).
        pop: bool,
        /// Include PC (on pop) or LR (on push).
        store_lr_or_load_pc: bool,
    },
    /// Format 15: multiple load/store.
    MultipleLoadStore {
        /// Load (`true`) vs store (`false`).
        load: bool,
    },
    /// Format 16: conditional branch.
    ConditionalBranch,
    /// Format 17: software interrupt.
    SoftwareInterrupt,
    /// Format 18: unconditional branch.
    UnconditionalBranch,
    /// Format 19: long branch with link (both halves; disambiguated by bit
    /// 11 of the instruction at execution time), and on ARMv5TE `BLX`.
    LongBranchWithLink,
    /// Reserved encoding: enters the undefined-instruction exception.
    Undefined,
}

/// Format 3's sub-operation, from instruction bits 12:11.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ImmediateOpKind {
    Mov,
    Cmp,
    Add,
    Sub,
}
