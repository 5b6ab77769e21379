//! Intermediate representation produced by the translator and consumed by
//! the optimizer and (eventually) a code generator.
//!
//! 1. **Variable:** SSA-style value identity.
//! 2. **Op:** the op catalogue and their operand kinds.
//! 3. **BasicBlock:** the arena-owned op list, its terminal, and metadata.
//! 4. **Emitter:** the cursor facade optimizer passes and the translator use
//!    to mutate a block without touching arena indices directly.

/// The op catalogue: opcodes and the operand kinds they carry.
pub mod op;
/// `BasicBlock`: arena-owned op list, location, condition, and terminal.
pub mod basic_block;
/// Cursor-based mutation facade over a `BasicBlock`'s op list.
pub mod emitter;
/// SSA-style value identity.
pub mod variable;

pub use basic_block::{BasicBlock, LocationRef, Terminal};
pub use emitter::Emitter;
pub use op::{Flag, FlagSet, GprArg, IROp, VarOrImm};
pub use variable::{OpIndex, Variable};
