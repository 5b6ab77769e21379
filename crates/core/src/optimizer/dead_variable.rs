//! Erases any pure op none of whose outputs are used.
//!
//! An op with a `carry_out`/`dst_hi` side output is only erasable once
//! *both* outputs are dead; narrowing away just one of them is
//! [`super::dead_flag_value`]'s job.

use std::collections::HashMap;

use crate::ir::basic_block::BasicBlock;
use crate::ir::op::VarOrImm;
use crate::ir::variable::Variable;

use super::util;

/// Runs one sweep of dead variable elimination over `block`.
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
        let op = *emitter.op().expect("cursor op");
        if !op.is_pure() {
            return false;
        }
        let primary_unused = match op.primary_dst() {
            Some(v) => !use_counts.contains_key(&v),
            None => true,
        };
        let secondary_unused = match util::secondary_dst(&op) {
            Some(v) => !use_counts.contains_key(&v),
            None => true,
        };
        if primary_unused && secondary_unused {
            emitter.erase();
            true
        } else {
            false
        }
    })
}
