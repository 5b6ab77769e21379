//! Interaction-style test: the reset exception's pipeline refill issues two
//! sequential word reads at the vector and the following word, in that
//! order. This is a call-sequence property the state-based `MockMemory`
//! can't conveniently assert, so it's verified against a `mockall` mock
//! instead.

use armcore::config::Config;
use armcore::InterpreterCore;
use mockall::{predicate::eq, Sequence};

use crate::common::mocks::MockBus;

#[test]
fn reset_refills_the_pipeline_with_two_sequential_word_reads() {
    let mut mem = MockBus::new();
    let mut seq = Sequence::new();

    mem.expect_read_word()
        .with(eq(0x0000_0000u32))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(0xE320_F000u32);
    mem.expect_read_word()
        .with(eq(0x0000_0004u32))
        .times(1)
        .in_sequence(&mut seq)
        .return_const(0xE320_F000u32);

    let core = InterpreterCore::new(mem, Config::default());

    assert_eq!(core.regs().pc(), 0x0000_0008);
}
