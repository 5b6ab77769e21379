//! Merges two adjacent `StoreFlags` ops that store the same value into
//! disjoint flag sets, e.g. a `StoreFlags{N,Z}` immediately followed by a
//! `StoreFlags{C}` of the same value becomes one `StoreFlags{N,Z,C}`.
//!
//! Only strictly adjacent pairs are merged: reordering a flag store across
//! an intervening op (even a pure one) isn't this pass's job.

use crate::ir::basic_block::BasicBlock;
use crate::ir::op::{Flag, FlagSet, IROp, VarOrImm};
use crate::ir::variable::OpIndex;

const ALL_FLAGS: [Flag; 5] = [Flag::N, Flag::Z, Flag::C, Flag::V, Flag::Q];

fn intersects(a: FlagSet, b: FlagSet) -> bool {
    ALL_FLAGS.iter().any(|&f| a.contains(f) && b.contains(f))
}

fn union(a: FlagSet, b: FlagSet) -> FlagSet {
    ALL_FLAGS.iter().fold(a, |acc, &f| if b.contains(f) { acc.with(f) } else { acc })
}

/// Runs one sweep of host-flag store coalescence over `block`.
pub fn run(block: &mut BasicBlock) -> bool {
    let mut last: Option<(OpIndex, FlagSet, VarOrImm)> = None;
    super::util::drive(block, |emitter, index| {
        let op = *emitter.op().expect("cursor op");
        let IROp::StoreFlags { flags, value } = op else {
            last = None;
            return false;
        };
        if flags.is_empty() {
            last = Some((index, flags, value));
            return false;
        }
        if let Some((prev_index, prev_flags, prev_value)) = last {
            if prev_value == value && !intersects(prev_flags, flags) {
                let merged = union(prev_flags, flags);
                emitter.go_to(prev_index);
                emitter.overwrite(IROp::StoreFlags { flags: merged, value });
                let merged_index = emitter.current().expect("overwrite repositions cursor");
                emitter.go_to(index);
                emitter.erase();
                last = Some((merged_index, merged, value));
                return true;
            }
        }
        last = Some((index, flags, value));
        false
    })
}
