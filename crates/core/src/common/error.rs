//! Guest exception vectors and host-side developer errors.
//!
//! `GuestTrap` is not propagated with `?` — it is returned as plain data from
//! handlers and consumed by the exception-entry routine, matching the rule
//! that the interpreter never uses exceptions for normal control flow. Only
//! genuine host mistakes (malformed configuration, a decode table miss) are
//! modeled as [`thiserror`]-derived `Result::Err` paths.

use std::fmt;

use crate::common::mode::Mode;

/// One of the eight ARM exception vectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuestTrap {
    /// Vector 0: power-on/hard reset.
    Reset,
    /// Vector 1: the decoder reached a reserved/undefined encoding.
    UndefinedInstruction,
    /// Vector 2: a `SWI`/`SVC` instruction executed.
    SoftwareInterrupt,
    /// Vector 3: the `MemoryInterface` reported a fetch failure.
    PrefetchAbort,
    /// Vector 4: the `MemoryInterface` reported a data access failure.
    DataAbort,
    /// Vector 5: legacy 26-bit address space exceeded (always unreachable on
    /// these cores, which are always 32-bit; retained for vector-table parity).
    AddressExceeds26Bit,
    /// Vector 6: normal (IRQ) interrupt line asserted.
    NormalInterrupt,
    /// Vector 7: fast (FIQ) interrupt line asserted.
    FastInterrupt,
}

/// Static metadata about one exception vector: the mode it's entered in,
/// whether it forces F=1, and its PC-relative link-register offsets.
#[derive(Clone, Copy, Debug)]
pub struct VectorInfo {
    /// Mode the processor switches to on entry.
    pub mode: Mode,
    /// Whether entry forces the FIQ-disable bit to 1 (Reset and FIQ only).
    pub sets_f: bool,
    /// Additional offset, in bytes, from the faulting PC when entered in ARM state.
    pub arm_offset: u32,
    /// Additional offset, in bytes, from the faulting PC when entered in Thumb state.
    pub thumb_offset: u32,
}

impl GuestTrap {
    /// Returns this vector's number (`V` in `base_vector_address + V * 4`).
    #[must_use]
    pub fn vector_number(self) -> u32 {
        match self {
            GuestTrap::Reset => 0,
            GuestTrap::UndefinedInstruction => 1,
            GuestTrap::SoftwareInterrupt => 2,
            GuestTrap::PrefetchAbort => 3,
            GuestTrap::DataAbort => 4,
            GuestTrap::AddressExceeds26Bit => 5,
            GuestTrap::NormalInterrupt => 6,
            GuestTrap::FastInterrupt => 7,
        }
    }

    /// Returns this vector's static entry metadata.
    #[must_use]
    pub fn info(self) -> VectorInfo {
        match self {
            GuestTrap::Reset => VectorInfo {
                mode: Mode::Supervisor,
                sets_f: true,
                arm_offset: 0,
                thumb_offset: 0,
            },
            GuestTrap::UndefinedInstruction => VectorInfo {
                mode: Mode::Undefined,
                sets_f: false,
                arm_offset: 4,
                thumb_offset: 2,
            },
            GuestTrap::SoftwareInterrupt => VectorInfo {
                mode: Mode::Supervisor,
                sets_f: false,
                arm_offset: 4,
                thumb_offset: 2,
            },
            GuestTrap::PrefetchAbort => VectorInfo {
                mode: Mode::Abort,
                sets_f: false,
                arm_offset: 4,
                thumb_offset: 4,
            },
            GuestTrap::DataAbort => VectorInfo {
                mode: Mode::Abort,
                sets_f: false,
                arm_offset: 8,
                thumb_offset: 8,
            },
            GuestTrap::AddressExceeds26Bit => VectorInfo {
                mode: Mode::Supervisor,
                sets_f: false,
                arm_offset: 4,
                thumb_offset: 2,
            },
            GuestTrap::NormalInterrupt => VectorInfo {
                mode: Mode::Irq,
                sets_f: false,
                arm_offset: 4,
                thumb_offset: 4,
            },
            GuestTrap::FastInterrupt => VectorInfo {
                mode: Mode::Fiq,
                sets_f: true,
                arm_offset: 4,
                thumb_offset: 4,
            },
        }
    }
}

impl fmt::Display for GuestTrap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GuestTrap::Reset => "Reset",
            GuestTrap::UndefinedInstruction => "UndefinedInstruction",
            GuestTrap::SoftwareInterrupt => "SoftwareInterrupt",
            GuestTrap::PrefetchAbort => "PrefetchAbort",
            GuestTrap::DataAbort => "DataAbort",
            GuestTrap::AddressExceeds26Bit => "AddressExceeds26Bit",
            GuestTrap::NormalInterrupt => "NormalInterrupt",
            GuestTrap::FastInterrupt => "FastInterrupt",
        };
        f.write_str(name)
    }
}

/// Host-side developer error: a genuine `Result::Err` path, never recovered
/// from by guest code.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The decode table was indexed with a value outside its valid range.
    /// This indicates a bug in the index computation, not a guest encoding
    /// issue (reserved guest encodings resolve to the undefined-instruction
    /// handler, not this error).
    #[error("decode table index {index} out of range (table size {size})")]
    TableIndexOutOfRange {
        /// The offending index.
        index: usize,
        /// The table's size.
        size: usize,
    },
}

/// Errors from constructing or applying a [`crate::config::Config`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// `optimizer.max_iterations` was zero, which would never let the
    /// optimizer run even its first pass.
    #[error("optimizer.max_iterations must be at least 1")]
    ZeroOptimizerIterations,
    /// `translator.max_block_size` was zero, which would make every
    /// translated block empty.
    #[error("translator.max_block_size must be at least 1")]
    ZeroMaxBlockSize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_and_fiq_are_the_only_vectors_that_set_f() {
        for trap in [
            GuestTrap::Reset,
            GuestTrap::UndefinedInstruction,
            GuestTrap::SoftwareInterrupt,
            GuestTrap::PrefetchAbort,
            GuestTrap::DataAbort,
            GuestTrap::AddressExceeds26Bit,
            GuestTrap::NormalInterrupt,
            GuestTrap::FastInterrupt,
        ] {
            let expects_f = matches!(trap, GuestTrap::Reset | GuestTrap::FastInterrupt);
            assert_eq!(trap.info().sets_f, expects_f, "{trap}");
        }
    }

    #[test]
    fn vector_numbers_are_sequential() {
        let traps = [
            GuestTrap::Reset,
            GuestTrap::UndefinedInstruction,
            GuestTrap::SoftwareInterrupt,
            GuestTrap::PrefetchAbort,
            GuestTrap::DataAbort,
            GuestTrap::AddressExceeds26Bit,
            GuestTrap::NormalInterrupt,
            GuestTrap::FastInterrupt,
        ];
        for (i, trap) in traps.iter().enumerate() {
            assert_eq!(trap.vector_number(), i as u32);
        }
    }

    #[test]
    fn data_abort_has_the_largest_link_register_offset() {
        assert_eq!(GuestTrap::DataAbort.info().arm_offset, 8);
        assert_eq!(GuestTrap::DataAbort.info().thumb_offset, 8);
    }
}
