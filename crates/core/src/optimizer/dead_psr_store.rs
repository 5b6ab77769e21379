//! The PSR analogue of [`super::dead_register_store`]: erases a `SetCPSR` or
//! `SetSPSR` guaranteed to be overwritten before any matching read.

use std::collections::HashSet;

use crate::ir::basic_block::BasicBlock;
use crate::ir::op::IROp;
use crate::ir::variable::OpIndex;

/// Runs one sweep of dead PSR store elimination over `block`.
pub fn run(block: &mut BasicBlock) -> bool {
    let events: Vec<(OpIndex, IROp)> = block.iter().map(|(i, op)| (i, *op)).collect();
    let mut dead: HashSet<OpIndex> = HashSet::new();

    for (pos, &(index, op)) in events.iter().enumerate() {
        match op {
            IROp::SetCPSR { .. } => {
                for &(_, later) in &events[pos + 1..] {
                    match later {
                        IROp::GetCPSR { .. } => break,
                        IROp::SetCPSR { .. } => {
                            dead.insert(index);
                            break;
                        }
                        _ => {}
                    }
                }
            }
            IROp::SetSPSR { mode, .. } => {
                for &(_, later) in &events[pos + 1..] {
                    match later {
                        IROp::GetSPSR { mode: m, .. } if m == mode => break,
                        IROp::SetSPSR { mode: m, .. } if m == mode => {
                            dead.insert(index);
                            break;
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
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
