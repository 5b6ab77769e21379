//! Folds a chain of two same-kind immediate bitwise ops into one, e.g.
//! `AND(AND(x, a), b)` → `AND(x, a & b)`, when the intermediate result has
//! exactly one consumer (this op) and neither leg sets flags.

use std::collections::HashMap;

use crate::ir::basic_block::BasicBlock;
use crate::ir::op::{IROp, VarOrImm};
use crate::ir::variable::Variable;

use super::util;

/// Runs one sweep of bitwise-chain coalescence over `block`.
pub fn run(block: &mut BasicBlock) -> bool {
    let mut use_counts: HashMap<Variable, u32> = HashMap::new();
    let mut def: HashMap<Variable, IROp> = HashMap::new();
    for (_, op) in block.iter() {
        util::visit_operands(op, |operand| {
            if let VarOrImm::Var(v) = operand {
                *use_counts.entry(v).or_insert(0) += 1;
            }
        });
        if let Some(dst) = op.primary_dst() {
            def.insert(dst, *op);
        }
    }

    util::drive(block, |emitter, _index| {
        let op = *emitter.op().expect("cursor op");
        match try_coalesce(&op, &def, &use_counts) {
            Some(folded) => {
                emitter.overwrite(folded);
                true
            }
            None => false,
        }
    })
}

fn single_use(v: Variable, use_counts: &HashMap<Variable, u32>) -> bool {
    use_counts.get(&v).copied() == Some(1)
}

fn try_coalesce(op: &IROp, def: &HashMap<Variable, IROp>, use_counts: &HashMap<Variable, u32>) -> Option<IROp> {
    match *op {
        IROp::BitwiseAnd { dst, lhs: VarOrImm::Var(v), rhs: VarOrImm::Imm(b), set_flags: false } => {
            if !single_use(v, use_counts) {
                return None;
            }
            match def.get(&v) {
                Some(&IROp::BitwiseAnd { lhs: inner, rhs: VarOrImm::Imm(a), set_flags: false, .. }) => {
                    Some(IROp::BitwiseAnd { dst, lhs: inner, rhs: VarOrImm::Imm(a & b), set_flags: false })
                }
                _ => None,
            }
        }
        IROp::BitwiseOr { dst, lhs: VarOrImm::Var(v), rhs: VarOrImm::Imm(b), set_flags: false } => {
            if !single_use(v, use_counts) {
                return None;
            }
            match def.get(&v) {
                Some(&IROp::BitwiseOr { lhs: inner, rhs: VarOrImm::Imm(a), set_flags: false, .. }) => {
                    Some(IROp::BitwiseOr { dst, lhs: inner, rhs: VarOrImm::Imm(a | b), set_flags: false })
                }
                _ => None,
            }
        }
        IROp::BitwiseXor { dst, lhs: VarOrImm::Var(v), rhs: VarOrImm::Imm(b), set_flags: false } => {
            if !single_use(v, use_counts) {
                return None;
            }
            match def.get(&v) {
                Some(&IROp::BitwiseXor { lhs: inner, rhs: VarOrImm::Imm(a), set_flags: false, .. }) => {
                    Some(IROp::BitwiseXor { dst, lhs: inner, rhs: VarOrImm::Imm(a ^ b), set_flags: false })
                }
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::mode::Mode;
    use crate::ir::basic_block::LocationRef;

    fn block() -> BasicBlock {
        BasicBlock::new(LocationRef { pc: 0, mode: Mode::Supervisor, thumb: false }, 0xE)
    }

    #[test]
    fn folds_and_of_and_with_single_use_intermediate() {
        let mut block = block();
        let x = block.alloc_variable();
        let mid = block.alloc_variable();
        let dst = block.alloc_variable();
        block.push_back(IROp::BitwiseAnd { dst: mid, lhs: VarOrImm::Var(x), rhs: VarOrImm::Imm(0xFF), set_flags: false });
        block.push_back(IROp::BitwiseAnd { dst, lhs: VarOrImm::Var(mid), rhs: VarOrImm::Imm(0x0F), set_flags: false });

        assert!(run(&mut block));
        let last = block.get(block.tail().unwrap());
        assert_eq!(*last, IROp::BitwiseAnd { dst, lhs: VarOrImm::Var(x), rhs: VarOrImm::Imm(0x0F), set_flags: false });
    }

    #[test]
    fn does_not_fold_when_intermediate_has_another_consumer() {
        let mut block = block();
        let x = block.alloc_variable();
        let mid = block.alloc_variable();
        let dst = block.alloc_variable();
        let other = block.alloc_variable();
        block.push_back(IROp::BitwiseAnd { dst: mid, lhs: VarOrImm::Var(x), rhs: VarOrImm::Imm(0xFF), set_flags: false });
        block.push_back(IROp::BitwiseAnd { dst, lhs: VarOrImm::Var(mid), rhs: VarOrImm::Imm(0x0F), set_flags: false });
        block.push_back(IROp::CopyVar { dst: other, src: mid });

        assert!(!run(&mut block));
    }
}
