//! ARM7TDMI/ARM946E-S interpreter and IR-based dynamic-recompiler core.
//!
//! This crate implements a cycle-costed scalar interpreter for ARMv4T/ARMv5TE
//! guest code with the following pieces:
//! 1. **Common:** processor modes, the packed PSR layout, and guest/host error types.
//! 2. **Arith:** the barrel shifter and flagged ALU primitives shared by every handler.
//! 3. **Reg:** the banked general-purpose register file.
//! 4. **Isa:** the ARM/Thumb decode tables and the coarse instruction classes they resolve to.
//! 5. **Core:** `InterpreterCore`, the per-tick scalar execution engine.
//! 6. **Cp15:** the system control coprocessor (ARMv5TE only).
//! 7. **Memory:** the host-implemented guest memory bus contract.
//! 8. **Config:** hierarchical configuration for the CPU variant, translator, optimizer, and block cache.
//! 9. **Hooks:** host-registrable exec hooks and debug breakpoints, checked by the block cache's cached loop.
//! 10. **Snapshot:** a serializable capture/restore of an `InterpreterCore`'s full state.

/// Barrel-shifter and flagged-arithmetic primitives.
pub mod arith;
/// Two-level decoded-instruction cache sitting in front of the interpreter.
pub mod blockcache;
/// Common types: processor modes, packed PSR layout, guest/host error types.
pub mod common;
/// Hierarchical configuration for the CPU variant, translator, optimizer, and block cache.
pub mod config;
/// `InterpreterCore`, the per-tick scalar execution engine.
pub mod core;
/// CP15 system control coprocessor (ARMv5TE only).
pub mod cp15;
/// Host-registrable execution hooks and debug breakpoints.
pub mod hooks;
/// IR model: variables, ops, basic blocks, and the emitter cursor facade.
pub mod ir;
/// ARM/Thumb decode tables and coarse instruction classification.
pub mod isa;
/// Host-implemented guest memory bus contract.
pub mod memory;
/// The fixed-point IR optimizer: rewrite passes plus idle-loop detection.
pub mod optimizer;
/// Banked general-purpose register file.
pub mod reg;
/// Serializable snapshot of an `InterpreterCore`'s full state.
pub mod snapshot;
/// ARM/Thumb guest code to IR translation.
pub mod translator;

/// The decoded-instruction cache sitting in front of the interpreter.
pub use crate::blockcache::BlockCache;
/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// The per-tick scalar execution engine.
pub use crate::core::{ExecState, InterpreterCore};
/// CP15 system control coprocessor.
pub use crate::cp15::Cp15;
/// Host-registrable execution hooks and debug breakpoints.
pub use crate::hooks::Hooks;
/// The host-implemented guest memory bus contract.
pub use crate::memory::MemoryInterface;
/// The fixed-point IR optimizer entry point.
pub use crate::optimizer::optimize;
/// The banked general-purpose register file.
pub use crate::reg::RegisterFile;
/// Serializable snapshot of an `InterpreterCore`'s full state.
pub use crate::snapshot::PersistedState;
/// ARM/Thumb guest code to IR translation.
pub use crate::translator::Translator;
