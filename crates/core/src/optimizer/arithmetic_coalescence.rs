//! Folds a chain of two immediate `Add`/`Subtract` ops into one, the
//! arithmetic analogue of [`super::bitwise_coalescence`].

use std::collections::HashMap;

use crate::ir::basic_block::BasicBlock;
use crate::ir::op::{IROp, VarOrImm};
use crate::ir::variable::Variable;

use super::util;

/// Runs one sweep of add/subtract-chain coalescence over `block`.
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
        IROp::Add { dst, lhs: VarOrImm::Var(v), rhs: VarOrImm::Imm(b), set_flags: false } => {
            if !single_use(v, use_counts) {
                return None;
            }
            match def.get(&v) {
                Some(&IROp::Add { lhs: inner, rhs: VarOrImm::Imm(a), set_flags: false, .. }) => {
                    Some(IROp::Add { dst, lhs: inner, rhs: VarOrImm::Imm(a.wrapping_add(b)), set_flags: false })
                }
                Some(&IROp::Subtract { lhs: inner, rhs: VarOrImm::Imm(a), set_flags: false, .. }) => {
                    Some(IROp::Add { dst, lhs: inner, rhs: VarOrImm::Imm(b.wrapping_sub(a)), set_flags: false })
                }
                _ => None,
            }
        }
        IROp::Subtract { dst, lhs: VarOrImm::Var(v), rhs: VarOrImm::Imm(b), set_flags: false } => {
            if !single_use(v, use_counts) {
                return None;
            }
            match def.get(&v) {
                Some(&IROp::Add { lhs: inner, rhs: VarOrImm::Imm(a), set_flags: false, .. }) => {
                    Some(IROp::Add { dst, lhs: inner, rhs: VarOrImm::Imm(a.wrapping_sub(b)), set_flags: false })
                }
                Some(&IROp::Subtract { lhs: inner, rhs: VarOrImm::Imm(a), set_flags: false, .. }) => {
                    Some(IROp::Subtract { dst, lhs: inner, rhs: VarOrImm::Imm(a.wrapping_add(b)), set_flags: false })
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
    fn folds_add_of_add_immediates() {
        let mut block = block();
        let x = block.alloc_variable();
        let mid = block.alloc_variable();
        let dst = block.alloc_variable();
        block.push_back(IROp::Add { dst: mid, lhs: VarOrImm::Var(x), rhs: VarOrImm::Imm(4), set_flags: false });
        block.push_back(IROp::Add { dst, lhs: VarOrImm::Var(mid), rhs: VarOrImm::Imm(8), set_flags: false });

        assert!(run(&mut block));
        let last = block.get(block.tail().unwrap());
        assert_eq!(*last, IROp::Add { dst, lhs: VarOrImm::Var(x), rhs: VarOrImm::Imm(12), set_flags: false });
    }

    #[test]
    fn folds_subtract_of_add_immediates() {
        let mut block = block();
        let x = block.alloc_variable();
        let mid = block.alloc_variable();
        let dst = block.alloc_variable();
        block.push_back(IROp::Add { dst: mid, lhs: VarOrImm::Var(x), rhs: VarOrImm::Imm(10), set_flags: false });
        block.push_back(IROp::Subtract { dst, lhs: VarOrImm::Var(mid), rhs: VarOrImm::Imm(3), set_flags: false });

        assert!(run(&mut block));
        let last = block.get(block.tail().unwrap());
        assert_eq!(*last, IROp::Add { dst, lhs: VarOrImm::Var(x), rhs: VarOrImm::Imm(7), set_flags: false });
    }

    #[test]
    fn flagged_chain_link_is_not_folded() {
        let mut block = block();
        let x = block.alloc_variable();
        let mid = block.alloc_variable();
        let dst = block.alloc_variable();
        block.push_back(IROp::Add { dst: mid, lhs: VarOrImm::Var(x), rhs: VarOrImm::Imm(4), set_flags: true });
        block.push_back(IROp::Add { dst, lhs: VarOrImm::Var(mid), rhs: VarOrImm::Imm(8), set_flags: false });

        assert!(!run(&mut block));
    }
}
