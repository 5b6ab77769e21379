//! Erases a `StoreFlags` whose entire flag set is guaranteed to be
//! overwritten by later `StoreFlags` ops before any `LoadFlags` reads from
//! it. Scoped to `StoreFlags`/`LoadFlags`; `LoadStickyOverflow`'s read of a
//! prior CPSR snapshot is a generic variable use already covered by
//! [`super::dead_variable`], not a host-flag read in this pass's sense.
//!
//! This is whole-set, not per-bit: a `StoreFlags{N,Z}` is only erased when
//! *both* N and Z are later fully re-covered with no read in between, even
//! if in principle only one of the two bits ended up dead. Narrowing a
//! partially-dead flag store would require splitting it into two ops; this
//! pass stays conservative and leaves that case alone.

use std::collections::HashSet;

use crate::ir::basic_block::BasicBlock;
use crate::ir::op::{Flag, FlagSet, IROp};
use crate::ir::variable::OpIndex;

const ALL_FLAGS: [Flag; 5] = [Flag::N, Flag::Z, Flag::C, Flag::V, Flag::Q];

fn intersects(a: FlagSet, b: FlagSet) -> bool {
    ALL_FLAGS.iter().any(|&f| a.contains(f) && b.contains(f))
}

fn is_subset(a: FlagSet, b: FlagSet) -> bool {
    ALL_FLAGS.iter().all(|&f| !a.contains(f) || b.contains(f))
}

fn union(a: FlagSet, b: FlagSet) -> FlagSet {
    ALL_FLAGS.iter().fold(a, |acc, &f| if b.contains(f) { acc.with(f) } else { acc })
}

/// Runs one sweep of dead host-flag store elimination over `block`.
pub fn run(block: &mut BasicBlock) -> bool {
    let events: Vec<(OpIndex, IROp)> = block.iter().map(|(i, op)| (i, *op)).collect();
    let mut dead: HashSet<OpIndex> = HashSet::new();

    for (pos, &(index, op)) in events.iter().enumerate() {
        let IROp::StoreFlags { flags, .. } = op else { continue };
        if flags.is_empty() {
            continue;
        }
        let mut covered = FlagSet::NONE;
        for &(_, later) in &events[pos + 1..] {
            match later {
                IROp::LoadFlags { flags: read, .. } if intersects(flags, read) => break,
                IROp::StoreFlags { flags: written, .. } => {
                    covered = union(covered, written);
                    if is_subset(flags, covered) {
                        dead.insert(index);
                        break;
                    }
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
