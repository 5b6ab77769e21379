//! Idle-loop detection through the full `optimize()` entry point (the
//! in-crate `idle_loop` unit tests exercise `detect` directly; this drives
//! it the way a host embedding actually would, via the pass pipeline).
//!
//! This block model encodes a self-branch as `Terminal::DirectLink` back to
//! the block's own entry location rather than a trailing `Branch` IR op, so
//! the idle-loop candidate is a block whose terminal already points at its
//! own entry, with a body that only reads registers.

use armcore::common::mode::Mode;
use armcore::config::OptimizerConfig;
use armcore::ir::{BasicBlock, GprArg, IROp, LocationRef, Terminal};
use armcore::optimize;

fn entry() -> LocationRef {
    LocationRef { pc: 0x2000, mode: Mode::System, thumb: false }
}

#[test]
fn a_read_only_self_branch_is_marked_idle() {
    let mut block = BasicBlock::new(entry(), 0xE);
    let v0 = block.alloc_variable();
    block.push_back(IROp::GetRegister { dst: v0, src: GprArg { gpr: 0, mode: Mode::System } });
    block.set_terminal(Terminal::DirectLink(entry()));

    let config = OptimizerConfig::default();
    optimize(&mut block, &config);

    assert!(matches!(block.terminal(), Terminal::IdleLoop));
}
