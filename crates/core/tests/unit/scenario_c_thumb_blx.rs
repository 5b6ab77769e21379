//! Thumb `BL`/`BLX` long-branch pair, exercising the ARMv5TE BLX suffix that
//! exchanges back to ARM state and word-aligns the target.
//!
//! Entered via a `BX r0` trampoline from the ARM reset vector rather than
//! the spec's illustrative Thumb-from-reset PC, since this core always
//! resets into ARM state. The trampoline lands at `0x1000` instead of
//! `0x10000`; the low halfword's offset field is chosen so the branch still
//! lands exactly 0x210 bytes past the pair's first halfword, word-aligned,
//! matching this core's actual link-register/target arithmetic (which
//! folds in the pipeline's extra two-ahead lookahead, not just the raw
//! encoded offset).
use armcore::common::mode::Mode;
use armcore::config::{Config, CpuVariant};

use crate::common::TestContext;

const TRAMPOLINE_TARGET: u32 = 0x1000;

#[test]
fn blx_suffix_exchanges_to_arm_and_word_aligns_the_target() {
    let config = Config { cpu_variant: CpuVariant::Armv5TE, ..Config::default() };
    let mut core = TestContext::with_config(config)
        .load_arm(0, &[0xE12F_FF10]) // bx r0
        .load_thumb(TRAMPOLINE_TARGET, &[0xF000, 0xE906]) // bl/blx pair, +0x210
        .build();

    core.regs_mut().cpsr_mut().set_mode(Mode::System);
    *core.regs_mut().gpr_mut(0, Mode::System) = TRAMPOLINE_TARGET | 1;

    core.tick(); // bx r0: enters Thumb at the trampoline
    core.tick(); // high half: stages lr
    core.tick(); // low half (blx suffix): exchanges and branches

    assert!(!core.regs().cpsr().thumb());
    assert_eq!(core.regs().gpr(14, Mode::System), TRAMPOLINE_TARGET + 5);
    // `regs().pc()` sits two ARM-instruction-widths (8 bytes) ahead of the
    // address actually executing next, per the two-slot fetch pipeline.
    assert_eq!(core.regs().pc(), TRAMPOLINE_TARGET + 0x210 + 8);
}
