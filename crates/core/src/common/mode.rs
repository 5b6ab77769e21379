//! Processor operating modes and the banked-register index derived from them.
//!
//! ARM modes are not a dense enumeration: the 5-bit CPSR mode field carries its
//! real hardware encoding (`0x10`..`0x1F`) because guest code inspects it
//! directly through MRS/MSR and CP15's `preARMv5` compatibility checks compare
//! against the raw value.

use std::fmt;

/// Processor operating mode, encoded with its real 5-bit CPSR value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Mode {
    /// Unprivileged mode used by normal program execution.
    User = 0x10,
    /// Fast interrupt mode, entered on FIQ.
    Fiq = 0x11,
    /// Normal interrupt mode, entered on IRQ.
    Irq = 0x12,
    /// Supervisor mode, entered on reset and SWI.
    Supervisor = 0x13,
    /// Abort mode, entered on prefetch/data abort.
    Abort = 0x17,
    /// Undefined mode, entered on an undefined instruction trap.
    Undefined = 0x1B,
    /// Privileged mode sharing the User register bank.
    System = 0x1F,
}

impl Mode {
    /// Decodes a 5-bit CPSR mode field.
    ///
    /// # Arguments
    ///
    /// * `bits` - The raw 5-bit mode value as read from CPSR bits `4:0`.
    ///
    /// # Returns
    ///
    /// The matching `Mode`, or `Mode::User` for any value without a defined
    /// encoding (invalid mode values are treated conservatively as User).
    #[must_use]
    pub fn from_bits(bits: u32) -> Self {
        match bits & 0x1F {
            0x10 => Mode::User,
            0x11 => Mode::Fiq,
            0x12 => Mode::Irq,
            0x13 => Mode::Supervisor,
            0x17 => Mode::Abort,
            0x1B => Mode::Undefined,
            0x1F => Mode::System,
            _ => Mode::User,
        }
    }

    /// Returns the raw 5-bit CPSR encoding of this mode.
    #[must_use]
    pub fn bits(self) -> u32 {
        self as u32
    }

    /// Returns the banked-register index for this mode.
    ///
    /// User and System modes share a bank: they never need to save/restore
    /// R13/R14 against each other since their visible registers are identical.
    #[must_use]
    pub fn bank(self) -> Bank {
        match self {
            Mode::User | Mode::System => Bank::User,
            Mode::Fiq => Bank::Fiq,
            Mode::Irq => Bank::Irq,
            Mode::Supervisor => Bank::Supervisor,
            Mode::Abort => Bank::Abort,
            Mode::Undefined => Bank::Undefined,
        }
    }

    /// Three-letter mnemonic used in trace output, matching the convention
    /// used by ARM disassemblers (`usr`, `fiq`, `irq`, `svc`, `abt`, `und`, `sys`).
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Mode::User => "usr",
            Mode::Fiq => "fiq",
            Mode::Irq => "irq",
            Mode::Supervisor => "svc",
            Mode::Abort => "abt",
            Mode::Undefined => "und",
            Mode::System => "sys",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Index into the banked-register table. User and System share `User`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum Bank {
    /// Shared User/System bank.
    User = 0,
    /// FIQ bank.
    Fiq = 1,
    /// Supervisor bank.
    Supervisor = 2,
    /// Abort bank.
    Abort = 3,
    /// IRQ bank.
    Irq = 4,
    /// Undefined bank.
    Undefined = 5,
}

/// Number of banks: User/FIQ/Supervisor/Abort/IRQ/Undefined.
pub const BANK_COUNT: usize = 6;

/// Number of banked registers per bank: R8 through R14.
pub const BANKED_REG_COUNT: usize = 7;

impl Bank {
    /// Returns the dense array index for this bank, for use indexing the
    /// `[[u32; BANKED_REG_COUNT]; BANK_COUNT]` table.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}
