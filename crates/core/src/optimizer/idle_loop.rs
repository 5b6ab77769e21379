//! Detects a block that loops back to its own entry point without making
//! any externally observable progress, and marks it [`Terminal::IdleLoop`]
//! so the caller can fast-forward past it instead of re-executing the body
//! every iteration.
//!
//! Unlike the originating design (where the self-branch is an `IRBranchOp`
//! found while scanning the op list), this block model encodes the
//! block-ending branch as [`Terminal`] rather than a trailing IR op, so the
//! self-branch check is just a comparison against `block.terminal()` before
//! the body scan even starts.

use crate::ir::basic_block::{BasicBlock, Terminal};
use crate::ir::op::IROp;

/// Checks whether `block` is a no-progress loop back to its own entry, and
/// if so rewrites its terminal to [`Terminal::IdleLoop`].
pub fn detect(block: &mut BasicBlock) {
    let entry = block.location();
    let target = match block.terminal() {
        Terminal::DirectLink(target) => target,
        _ => return,
    };
    if target.pc != entry.pc || target.mode != entry.mode || target.thumb != entry.thumb {
        return;
    }

    let mut read_regs: u16 = 0;
    let mut written_regs: u16 = 0;
    let mut disallowed_regs: u16 = 0;

    for (_, op) in block.iter() {
        match *op {
            // Any of these make the next iteration observably different
            // from this one, or touch state this pass can't prove is inert.
            IROp::SetCPSR { .. } | IROp::SetSPSR { .. } | IROp::MemWrite { .. } | IROp::StoreCopRegister { .. } => {
                return;
            }
            IROp::GetRegister { src, .. } => {
                read_regs |= 1 << src.gpr;
            }
            IROp::SetRegister { dst, .. } => {
                let bit = 1u16 << dst.gpr;
                if disallowed_regs & bit != 0 {
                    return;
                }
                written_regs |= bit;
                disallowed_regs |= read_regs & !written_regs;
            }
            _ => {}
        }
    }

    block.set_terminal(Terminal::IdleLoop);
}
