//! `STMDB sp!, {r0-r3, r12, lr}` (`0xE92D500F`) under IRQ mode, confirming
//! the store decrements the *banked* R13_irq (not R13_user) and that the
//! User bank stays untouched.
//!
//! The spec's illustrative `R13_irq = 0x4` would underflow a 24-byte
//! descending store past address zero, which a bounded mock can't back;
//! substituted `0x2000` as the starting SP while keeping the exact `-24`
//! decrement and the per-register memory layout under test.
//!
//! Staging order matters: the mode switch has to happen *before* writing
//! the IRQ-banked SP, because `RegisterFile::gpr_slot` resolves a write to
//! the flat array whenever the target mode matches whatever mode is
//! currently active — writing "R13 for IRQ" only reaches the banked slot
//! while some other mode is current.

use armcore::common::mode::Mode;
use armcore::memory::MemoryInterface;
use pretty_assertions::assert_eq;

use crate::common::TestContext;

#[test]
fn stmdb_decrements_the_banked_irq_stack_pointer() {
    let mut core = TestContext::new().load_arm(0, &[0xE92D_500F]).build();

    core.regs_mut().cpsr_mut().set_mode(Mode::Irq);
    *core.regs_mut().gpr_mut(13, Mode::Irq) = 0x2000;
    *core.regs_mut().gpr_mut(13, Mode::User) = 0xDD;
    *core.regs_mut().gpr_mut(0, Mode::Irq) = 1;
    *core.regs_mut().gpr_mut(1, Mode::Irq) = 2;
    *core.regs_mut().gpr_mut(2, Mode::Irq) = 3;
    *core.regs_mut().gpr_mut(3, Mode::Irq) = 4;
    *core.regs_mut().gpr_mut(12, Mode::Irq) = 0xC;
    *core.regs_mut().gpr_mut(14, Mode::Irq) = 0xE;

    core.tick();

    let new_sp = core.regs().gpr(13, Mode::Irq);
    assert_eq!(new_sp, 0x2000 - 24);

    let expected = [1u32, 2, 3, 4, 0xC, 0xE];
    for (i, value) in expected.iter().enumerate() {
        assert_eq!(core.memory().peek_word(new_sp + (i as u32) * 4), *value);
    }

    // The User bank's R13 never participated in this store.
    assert_eq!(core.regs().gpr(13, Mode::User), 0xDD);
}
