//! Two-phase test harness: stage guest memory before the core exists, then
//! hand back a live [`InterpreterCore`].
//!
//! `InterpreterCore::new` runs the reset exception immediately, which reads
//! the reset vector off the memory bus. Any code the test wants fetched
//! must already be in place before `build()` calls it, so staging and
//! execution are split into two phases rather than one lazily-initialized
//! struct.

use armcore::config::Config;
use armcore::InterpreterCore;

use crate::common::mocks::MockMemory;

const MEM_SIZE: usize = 0x1_0000;

/// Builds a [`MockMemory`] preloaded with guest code, then an
/// [`InterpreterCore`] over it.
pub struct TestContext {
    mem: MockMemory,
    config: Config,
}

impl TestContext {
    /// A context with default configuration and a zeroed address space.
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self::with_config(Config::default())
    }

    /// A context with a caller-supplied configuration.
    pub fn with_config(config: Config) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        Self { mem: MockMemory::new(MEM_SIZE), config }
    }

    /// Writes `instructions` as consecutive little-endian ARM words starting
    /// at `addr`.
    pub fn load_arm(mut self, addr: u32, instructions: &[u32]) -> Self {
        log::debug!("staging {} ARM word(s) at {addr:#010x}", instructions.len());
        for (i, &word) in instructions.iter().enumerate() {
            self.mem.poke_word(addr + (i as u32) * 4, word);
        }
        self
    }

    /// Writes `halfwords` as consecutive little-endian Thumb half-words
    /// starting at `addr`.
    pub fn load_thumb(mut self, addr: u32, halfwords: &[u16]) -> Self {
        log::debug!("staging {} Thumb half-word(s) at {addr:#010x}", halfwords.len());
        for (i, &half) in halfwords.iter().enumerate() {
            self.mem.poke_half(addr + (i as u32) * 2, half);
        }
        self
    }

    /// Finishes staging and builds the interpreter, running the reset
    /// exception against the memory staged so far.
    pub fn build(self) -> InterpreterCore<MockMemory> {
        InterpreterCore::new(self.mem, self.config)
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}
