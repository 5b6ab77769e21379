//! Instruction decoding: the ARM/Thumb dispatch tables, coarse instruction
//! classes, and the condition-code truth table.

/// Precomputed ARM/Thumb decode tables and the condition-code truth table.
pub mod decode;
/// Coarse instruction classes produced by the decode tables.
pub mod instruction;

pub use decode::{arm_table, arm_table_index, condition_table, thumb_table, thumb_table_index};
pub use instruction::{AluOp, ArmOpKind, HalfwordKind, ImmediateOpKind, ShiftKind, ThumbOpKind};
