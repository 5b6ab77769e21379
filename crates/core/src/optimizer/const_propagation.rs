//! Propagates known-constant variable values into their uses, folding away
//! the producing op when doing so doesn't discard a flag side effect.

use std::collections::HashMap;

use crate::ir::basic_block::BasicBlock;
use crate::ir::op::{IROp, VarOrImm};
use crate::ir::variable::Variable;

use super::util;

/// Runs one forward sweep of constant propagation over `block`.
pub fn run(block: &mut BasicBlock) -> bool {
    let mut known: HashMap<Variable, u32> = HashMap::new();
    util::drive(block, |emitter, _index| {
        let mut op = *emitter.op().expect("cursor op");
        let mut changed = false;

        if let IROp::CopyVar { dst, src } = op {
            if let Some(&value) = known.get(&src) {
                op = IROp::Constant { dst, value };
                changed = true;
            }
        }

        util::visit_operands_mut(&mut op, |operand| {
            if let VarOrImm::Var(v) = *operand {
                if let Some(&value) = known.get(&v) {
                    *operand = VarOrImm::Imm(value);
                    changed = true;
                }
            }
        });

        if let Some((dst, value)) = known_value(&op) {
            known.insert(dst, value);
            if can_fold_away(&op) {
                op = IROp::Constant { dst, value };
                changed = true;
            }
        }

        if changed {
            emitter.overwrite(op);
        }
        changed
    })
}

/// The deterministic result an op produces once every operand it reads is an
/// immediate, regardless of whether the op also has a flag side effect that
/// keeps it from being folded away.
fn known_value(op: &IROp) -> Option<(Variable, u32)> {
    match *op {
        IROp::Constant { dst, value } => Some((dst, value)),
        IROp::Move { dst, value: VarOrImm::Imm(v), .. } => Some((dst, v)),
        IROp::MoveNegated { dst, value: VarOrImm::Imm(v), .. } => Some((dst, !v)),
        IROp::BitwiseAnd { dst, lhs: VarOrImm::Imm(a), rhs: VarOrImm::Imm(b), .. } => Some((dst, a & b)),
        IROp::BitwiseOr { dst, lhs: VarOrImm::Imm(a), rhs: VarOrImm::Imm(b), .. } => Some((dst, a | b)),
        IROp::BitwiseXor { dst, lhs: VarOrImm::Imm(a), rhs: VarOrImm::Imm(b), .. } => Some((dst, a ^ b)),
        IROp::BitClear { dst, lhs: VarOrImm::Imm(a), rhs: VarOrImm::Imm(b), .. } => Some((dst, a & !b)),
        IROp::Add { dst, lhs: VarOrImm::Imm(a), rhs: VarOrImm::Imm(b), .. } => Some((dst, a.wrapping_add(b))),
        IROp::Subtract { dst, lhs: VarOrImm::Imm(a), rhs: VarOrImm::Imm(b), .. } => Some((dst, a.wrapping_sub(b))),
        IROp::CountLeadingZeros { dst, value: VarOrImm::Imm(v) } => Some((dst, v.leading_zeros())),
        _ => None,
    }
}

/// Whether folding `op` into a bare `Constant` discards no observable
/// effect. Flagged ALU ops still compute NZCV on their own terms even when
/// every operand is known, so they are only foldable unflagged.
fn can_fold_away(op: &IROp) -> bool {
    match *op {
        IROp::Move { set_flags, .. }
        | IROp::MoveNegated { set_flags, .. }
        | IROp::BitwiseAnd { set_flags, .. }
        | IROp::BitwiseOr { set_flags, .. }
        | IROp::BitwiseXor { set_flags, .. }
        | IROp::BitClear { set_flags, .. }
        | IROp::Add { set_flags, .. }
        | IROp::Subtract { set_flags, .. } => !set_flags,
        IROp::CountLeadingZeros { .. } => true,
        _ => false,
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
    fn folds_unflagged_add_of_constants() {
        let mut block = block();
        let a = block.alloc_variable();
        let dst = block.alloc_variable();
        block.push_back(IROp::Constant { dst: a, value: 5 });
        block.push_back(IROp::Add { dst, lhs: VarOrImm::Var(a), rhs: VarOrImm::Imm(3), set_flags: false });

        assert!(run(&mut block));
        let last = block.get(block.tail().unwrap());
        assert_eq!(*last, IROp::Constant { dst, value: 8 });
    }

    #[test]
    fn leaves_flagged_op_in_place_but_still_tracks_its_value() {
        let mut block = block();
        let a = block.alloc_variable();
        let dst = block.alloc_variable();
        let dst2 = block.alloc_variable();
        block.push_back(IROp::Constant { dst: a, value: 5 });
        block.push_back(IROp::Add { dst, lhs: VarOrImm::Var(a), rhs: VarOrImm::Imm(3), set_flags: true });
        block.push_back(IROp::Move { dst: dst2, value: VarOrImm::Var(dst), set_flags: false });

        run(&mut block);
        // The flagged Add survives (its NZCV side effect matters).
        let middle = block.get(block.next(block.head().unwrap()).unwrap());
        assert!(matches!(middle, IROp::Add { set_flags: true, .. }));
    }

    #[test]
    fn propagates_copy_var_of_a_known_constant() {
        let mut block = block();
        let a = block.alloc_variable();
        let b = block.alloc_variable();
        block.push_back(IROp::Constant { dst: a, value: 42 });
        block.push_back(IROp::CopyVar { dst: b, src: a });

        assert!(run(&mut block));
        let last = block.get(block.tail().unwrap());
        assert_eq!(*last, IROp::Constant { dst: b, value: 42 });
    }
}
