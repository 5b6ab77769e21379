//! The scalar interpreter core: register file driver, pipeline model, and
//! exception entry.

/// `InterpreterCore`, the per-tick execution engine.
pub mod interpreter;

pub use interpreter::{ExecState, InterpreterCore};
