//! The fixed-point IR optimizer.
//!
//! Nine rewrite passes run to convergence over a single [`BasicBlock`],
//! each gated by its own [`PassConfig`] flag, bounded by
//! [`OptimizerConfig::max_iterations`]; idle-loop detection always runs
//! once more afterward regardless of which passes are enabled. Every pass
//! is a plain function over `&mut BasicBlock` that drives its rewrites
//! through an [`Emitter`](crate::ir::emitter::Emitter) cursor rather than a
//! virtual-dispatch visitor, matching how `translator.rs` and
//! `core::InterpreterCore` already favor `match`-based dispatch over
//! dynamic dispatch for per-opcode behavior.

mod arithmetic_coalescence;
mod bitwise_coalescence;
mod const_propagation;
mod dead_flag_value;
mod dead_host_flag;
mod dead_psr_store;
mod dead_register_store;
mod dead_variable;
mod host_flag_coalescence;
mod idle_loop;
mod util;

use crate::config::{OptimizerConfig, PassConfig};
use crate::ir::basic_block::BasicBlock;

/// Runs every pass `config.passes` enables to a fixed point, then detects
/// idle loops unconditionally. Returns whether any pass modified `block`.
pub fn optimize(block: &mut BasicBlock, config: &OptimizerConfig) -> bool {
    let mut optimized = false;
    for _ in 0..config.max_iterations {
        let dirty = run_one_round(block, &config.passes);
        optimized |= dirty;
        if !dirty {
            break;
        }
    }
    idle_loop::detect(block);
    optimized
}

fn run_one_round(block: &mut BasicBlock, passes: &PassConfig) -> bool {
    let mut dirty = false;
    if passes.constant_propagation {
        dirty |= const_propagation::run(block);
    }
    if passes.dead_register_store_elimination {
        dirty |= dead_register_store::run(block);
    }
    if passes.dead_psr_store_elimination {
        dirty |= dead_psr_store::run(block);
    }
    if passes.dead_host_flag_elimination {
        dirty |= dead_host_flag::run(block);
    }
    if passes.dead_flag_value_elimination {
        dirty |= dead_flag_value::run(block);
    }
    if passes.dead_variable_elimination {
        dirty |= dead_variable::run(block);
    }
    if passes.bitwise_coalescence {
        dirty |= bitwise_coalescence::run(block);
    }
    if passes.arithmetic_coalescence {
        dirty |= arithmetic_coalescence::run(block);
    }
    if passes.host_flag_coalescence {
        dirty |= host_flag_coalescence::run(block);
    }
    dirty
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::mode::Mode;
    use crate::ir::basic_block::{LocationRef, Terminal};
    use crate::ir::op::{GprArg, IROp, VarOrImm};

    fn block() -> BasicBlock {
        BasicBlock::new(LocationRef { pc: 0, mode: Mode::Supervisor, thumb: false }, 0xE)
    }

    #[test]
    fn fixed_point_chains_coalescence_and_dead_store_elimination() {
        // r0 = (r0 & 0xFF) & 0x0F, but nothing ever reads r0 again: the
        // whole chain should collapse to nothing once const-prop-adjacent
        // passes fire across enough rounds.
        let mut block = block();
        let v0 = block.alloc_variable();
        let mid = block.alloc_variable();
        let folded = block.alloc_variable();
        block.push_back(IROp::GetRegister { dst: v0, src: GprArg { gpr: 0, mode: Mode::Supervisor } });
        block.push_back(IROp::BitwiseAnd { dst: mid, lhs: VarOrImm::Var(v0), rhs: VarOrImm::Imm(0xFF), set_flags: false });
        block.push_back(IROp::BitwiseAnd { dst: folded, lhs: VarOrImm::Var(mid), rhs: VarOrImm::Imm(0x0F), set_flags: false });
        block.push_back(IROp::SetRegister { dst: GprArg { gpr: 0, mode: Mode::Supervisor }, value: VarOrImm::Var(folded) });
        block.push_back(IROp::SetRegister { dst: GprArg { gpr: 0, mode: Mode::Supervisor }, value: VarOrImm::Imm(0) });

        let config = OptimizerConfig::default();
        assert!(optimize(&mut block, &config));
        // Only the final, always-live SetRegister should remain.
        assert_eq!(block.instruction_count(), 1);
    }

    #[test]
    fn idle_loop_detection_runs_even_with_every_pass_disabled() {
        let mut block = block();
        let entry = block.location();
        block.set_terminal(Terminal::DirectLink(entry));

        let config = OptimizerConfig {
            max_iterations: 0,
            passes: PassConfig {
                constant_propagation: false,
                dead_register_store_elimination: false,
                dead_psr_store_elimination: false,
                dead_host_flag_elimination: false,
                dead_flag_value_elimination: false,
                dead_variable_elimination: false,
                bitwise_coalescence: false,
                arithmetic_coalescence: false,
                host_flag_coalescence: false,
            },
        };
        optimize(&mut block, &config);
        assert!(matches!(block.terminal(), Terminal::IdleLoop));
    }
}
