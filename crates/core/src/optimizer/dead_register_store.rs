//! Erases a `SetRegister` whose value is guaranteed to be overwritten by a
//! later `SetRegister` to the same `(gpr, mode)` before anything reads it.
//!
//! A write that is never read again before the block ends is *not* dead:
//! the register file is live machine state, not block-local scratch.

use std::collections::HashSet;

use crate::ir::basic_block::BasicBlock;
use crate::ir::op::IROp;
use crate::ir::variable::OpIndex;

/// Runs one sweep of dead register store elimination over `block`.
pub fn run(block: &mut BasicBlock) -> bool {
    let events: Vec<(OpIndex, IROp)> = block.iter().map(|(i, op)| (i, *op)).collect();
    let mut dead: HashSet<OpIndex> = HashSet::new();

    for (pos, &(index, op)) in events.iter().enumerate() {
        let IROp::SetRegister { dst, .. } = op else { continue };
        for &(_, later) in &events[pos + 1..] {
            match later {
                IROp::GetRegister { src, .. } if src == dst => break,
                IROp::SetRegister { dst: later_dst, .. } if later_dst == dst => {
                    dead.insert(index);
                    break;
                }
                _ => {}
            }
        }
    }

    if dead.is_empty() {
        return false;
    }
    super::util::drive(block, |emitter, index| {
        if dead.contains(&index) {
            emitter.erase();
            true
        } else {
            false
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::mode::Mode;
    use crate::ir::basic_block::LocationRef;
    use crate::ir::op::{GprArg, VarOrImm};

    fn block() -> BasicBlock {
        BasicBlock::new(LocationRef { pc: 0, mode: Mode::Supervisor, thumb: false }, 0xE)
    }

    fn r(gpr: u8, mode: Mode) -> GprArg {
        GprArg { gpr, mode }
    }

    #[test]
    fn overwritten_before_any_read_is_erased() {
        let mut block = block();
        let v0 = block.alloc_variable();
        let v1 = block.alloc_variable();
        block.push_back(IROp::Constant { dst: v0, value: 1 });
        block.push_back(IROp::SetRegister { dst: r(0, Mode::Supervisor), value: VarOrImm::Var(v0) });
        block.push_back(IROp::Constant { dst: v1, value: 2 });
        block.push_back(IROp::SetRegister { dst: r(0, Mode::Supervisor), value: VarOrImm::Var(v1) });

        assert!(run(&mut block));
        assert_eq!(block.instruction_count(), 3);
    }

    #[test]
    fn read_before_overwrite_keeps_the_store() {
        let mut block = block();
        let v0 = block.alloc_variable();
        let v1 = block.alloc_variable();
        let v2 = block.alloc_variable();
        block.push_back(IROp::Constant { dst: v0, value: 1 });
        block.push_back(IROp::SetRegister { dst: r(0, Mode::Supervisor), value: VarOrImm::Var(v0) });
        block.push_back(IROp::GetRegister { dst: v1, src: r(0, Mode::Supervisor) });
        block.push_back(IROp::Constant { dst: v2, value: 2 });
        block.push_back(IROp::SetRegister { dst: r(0, Mode::Supervisor), value: VarOrImm::Var(v2) });

        assert!(!run(&mut block));
        assert_eq!(block.instruction_count(), 5);
    }

    #[test]
    fn store_surviving_to_block_end_is_not_dead() {
        let mut block = block();
        let v0 = block.alloc_variable();
        block.push_back(IROp::Constant { dst: v0, value: 1 });
        block.push_back(IROp::SetRegister { dst: r(0, Mode::Supervisor), value: VarOrImm::Var(v0) });

        assert!(!run(&mut block));
        assert_eq!(block.instruction_count(), 2);
    }
}
