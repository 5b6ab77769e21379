//! Narrows a shift/rotate op's `carry_out` to `None` when nothing uses it,
//! without touching the op's primary result.
//!
//! This is distinct from [`super::dead_variable`], which only erases a whole
//! op once *every* value it produces is unused: a shift whose result feeds
//! later computation but whose carry-out nobody reads is common (most
//! Thumb shifts, and any ARM data-processing op executed unconditionally
//! with the `S` bit clear) and shouldn't force the shift itself to be kept
//! alive for a carry no one wants.

use std::collections::HashMap;

use crate::ir::basic_block::BasicBlock;
use crate::ir::op::{IROp, VarOrImm};
use crate::ir::variable::Variable;

use super::util;

/// Runs one sweep of dead carry-out narrowing over `block`.
pub fn run(block: &mut BasicBlock) -> bool {
    let mut use_counts: HashMap<Variable, u32> = HashMap::new();
    for (_, op) in block.iter() {
        util::visit_operands(op, |operand| {
            if let VarOrImm::Var(v) = operand {
                *use_counts.entry(v).or_insert(0) += 1;
            }
        });
    }

    util::drive(block, |emitter, _index| {
        let mut op = *emitter.op().expect("cursor op");
        let Some(carry_out) = util::secondary_dst(&op) else { return false };
        if use_counts.contains_key(&carry_out) {
            return false;
        }
        let narrowed = match &mut op {
            IROp::LogicalShiftLeft { carry_out, .. }
            | IROp::LogicalShiftRight { carry_out, .. }
            | IROp::ArithmeticShiftRight { carry_out, .. }
            | IROp::RotateRight { carry_out, .. }
            | IROp::RotateRightExtended { carry_out, .. } => {
                *carry_out = None;
                true
            }
            _ => false,
        };
        if narrowed {
            emitter.overwrite(op);
        }
        narrowed
    })
}
