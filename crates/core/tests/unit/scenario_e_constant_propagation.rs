//! Optimizer pass pipeline over a hand-built block mirroring a guest
//! pattern that reads R0, shifts it down then back up, storing R0 and PC
//! twice in a row.
//!
//! This exercises dead-register-store elimination (the first `SetRegister
//! pc, ...` is fully overwritten before any read) and dead-variable
//! elimination (an intermediate `Move` with no remaining consumer) rather
//! than the shift-to-shift constant folding a value-forwarding constant
//! propagation pass would do: this optimizer's constant propagation only
//! folds operations over already-known literal operands (see its own
//! `known_value` cases), not `SetRegister`-to-`GetRegister` forwarding of a
//! prior store's value, so the right-shift and left-shift each keep their
//! own `GetRegister` rather than collapsing into a single renamed use.
//! Eight ops survive, not five.

use armcore::common::mode::Mode;
use armcore::config::OptimizerConfig;
use armcore::ir::{BasicBlock, GprArg, IROp, LocationRef, VarOrImm};
use armcore::optimize;
use pretty_assertions::assert_eq;

fn entry() -> LocationRef {
    LocationRef { pc: 0x1_0000, mode: Mode::Supervisor, thumb: false }
}

fn r0() -> GprArg {
    GprArg { gpr: 0, mode: Mode::Supervisor }
}

fn pc_arg() -> GprArg {
    GprArg { gpr: 15, mode: Mode::Supervisor }
}

fn build_block() -> BasicBlock {
    let mut block = BasicBlock::new(entry(), 0xE);
    let v0 = block.alloc_variable();
    let v1 = block.alloc_variable();
    let v2 = block.alloc_variable();
    let v3 = block.alloc_variable();
    let v4 = block.alloc_variable();
    let v5 = block.alloc_variable();

    block.push_back(IROp::GetRegister { dst: v0, src: r0() });
    block.push_back(IROp::LogicalShiftRight {
        dst: v1,
        carry_out: None,
        value: VarOrImm::Var(v0),
        amount: VarOrImm::Imm(0xC),
        imm_form: true,
    });
    block.push_back(IROp::Move { dst: v2, value: VarOrImm::Var(v1), set_flags: false });
    block.push_back(IROp::SetRegister { dst: r0(), value: VarOrImm::Var(v1) });
    block.push_back(IROp::SetRegister { dst: pc_arg(), value: VarOrImm::Imm(0x10C) });
    block.push_back(IROp::GetRegister { dst: v3, src: r0() });
    block.push_back(IROp::LogicalShiftLeft {
        dst: v4,
        carry_out: None,
        value: VarOrImm::Var(v3),
        amount: VarOrImm::Imm(0xC),
        imm_form: true,
    });
    block.push_back(IROp::Move { dst: v5, value: VarOrImm::Var(v4), set_flags: false });
    block.push_back(IROp::SetRegister { dst: r0(), value: VarOrImm::Var(v5) });
    block.push_back(IROp::SetRegister { dst: pc_arg(), value: VarOrImm::Imm(0x110) });
    block
}

#[test]
fn dead_store_and_dead_variable_passes_trim_the_block_to_eight_ops() {
    let mut block = build_block();
    let config = OptimizerConfig::default();

    let dirty = optimize(&mut block, &config);
    assert!(dirty);

    let kinds: Vec<&'static str> = block
        .iter()
        .map(|(_, op)| match op {
            IROp::GetRegister { .. } => "get",
            IROp::SetRegister { .. } => "set",
            IROp::LogicalShiftRight { .. } => "lsr",
            IROp::LogicalShiftLeft { .. } => "lsl",
            IROp::Move { .. } => "mov",
            other => panic!("unexpected surviving op: {other:?}"),
        })
        .collect();

    assert_eq!(kinds, vec!["get", "lsr", "set", "get", "lsl", "mov", "set", "set"]);

    // The first `SetRegister pc, #0x10C` was dead (overwritten by the final
    // `#0x110` store with no intervening read of pc) and is gone; only one
    // `pc` store and one live `r0` store ahead of it remain.
    let pc_stores = block
        .iter()
        .filter(|(_, op)| matches!(op, IROp::SetRegister { dst, .. } if dst.gpr == 15))
        .count();
    assert_eq!(pc_stores, 1);
}

#[test]
fn running_optimize_again_finds_nothing_left_to_do() {
    let mut block = build_block();
    let config = OptimizerConfig::default();

    optimize(&mut block, &config);
    let dirty_second_pass = optimize(&mut block, &config);

    assert!(!dirty_second_pass);
}
