//! Host-registrable execution hooks and debug breakpoints.
//!
//! `Hooks` is owned by the caller, not embedded in [`InterpreterCore`]
//! (crate::core::InterpreterCore) — a host that never debugs pays nothing
//! for it. [`BlockCache::run_cached`](crate::blockcache::BlockCache::run_cached)
//! takes a `&mut Hooks` and checks it once per instruction, matching the
//! cached execution loop's "optionally invoke exec hooks and debug
//! breakpoint check" step.

use std::collections::HashSet;

use crate::config::CpuVariant;

/// Which instruction set a hook or breakpoint fired for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstructionSet {
    /// 32-bit ARM state.
    Arm,
    /// 16-bit Thumb state.
    Thumb,
}

/// Invoked before every executed instruction while hooks are enabled.
pub type ExecHook = Box<dyn FnMut(u32, u32, CpuVariant, InstructionSet)>;

/// A sparse set of guest addresses, used by both breakpoint kinds. Dynamic
/// (a `HashSet`, not a fixed-size bitmap) since the guest address space is
/// 32 bits and breakpoint counts are typically small.
#[derive(Default)]
struct AddressSet {
    addrs: HashSet<u32>,
}

impl AddressSet {
    fn set(&mut self, key: u32, enabled: bool) {
        if enabled {
            self.addrs.insert(key);
        } else {
            self.addrs.remove(&key);
        }
    }

    fn contains(&self, key: u32) -> bool {
        self.addrs.contains(&key)
    }
}

/// Breaks execution when the fetched instruction's address matches, keyed
/// by `pc >> 1` so one entry covers both halves of an unaligned ARM fetch.
#[derive(Default)]
pub struct InstructionBreakpoint {
    addrs: AddressSet,
    callback: Option<Box<dyn FnMut(u32)>>,
}

impl InstructionBreakpoint {
    /// Arms or disarms the breakpoint at `pc`.
    pub fn set(&mut self, pc: u32, enabled: bool) {
        self.addrs.set(pc >> 1, enabled);
    }

    /// Whether `pc` currently has a breakpoint armed.
    #[must_use]
    pub fn is_set(&self, pc: u32) -> bool {
        self.addrs.contains(pc >> 1)
    }

    /// Installs the callback invoked on a hit.
    pub fn set_callback(&mut self, callback: impl FnMut(u32) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Checks `pc` against the armed set; invokes the callback and returns
    /// `true` on a hit, signaling the execution loop to exit the block.
    pub fn check(&mut self, pc: u32) -> bool {
        if !self.is_set(pc) {
            return false;
        }
        if let Some(callback) = self.callback.as_mut() {
            callback(pc);
        }
        true
    }
}

/// Breaks on guest memory reads and/or writes to a matching byte address.
#[derive(Default)]
pub struct MemoryBreakpoint {
    reads: AddressSet,
    writes: AddressSet,
    callback: Option<Box<dyn FnMut(u32, bool)>>,
}

impl MemoryBreakpoint {
    /// Arms or disarms a read breakpoint at `addr`.
    pub fn set_read(&mut self, addr: u32, enabled: bool) {
        self.reads.set(addr, enabled);
    }

    /// Arms or disarms a write breakpoint at `addr`.
    pub fn set_write(&mut self, addr: u32, enabled: bool) {
        self.writes.set(addr, enabled);
    }

    /// Installs the callback invoked on a hit; the `bool` is `true` for a
    /// write, `false` for a read.
    pub fn set_callback(&mut self, callback: impl FnMut(u32, bool) + 'static) {
        self.callback = Some(Box::new(callback));
    }

    /// Checks a read of `addr`; invokes the callback and returns `true` on
    /// a hit. Intended to be called from the host's own `MemoryInterface`
    /// implementation at its `read_*` call sites.
    pub fn check_read(&mut self, addr: u32) -> bool {
        if !self.reads.contains(addr) {
            return false;
        }
        if let Some(callback) = self.callback.as_mut() {
            callback(addr, false);
        }
        true
    }

    /// Checks a write of `addr`; invokes the callback and returns `true` on
    /// a hit. Intended to be called from the host's own `MemoryInterface`
    /// implementation at its `write_*` call sites.
    pub fn check_write(&mut self, addr: u32) -> bool {
        if !self.writes.contains(addr) {
            return false;
        }
        if let Some(callback) = self.callback.as_mut() {
            callback(addr, true);
        }
        true
    }
}

/// The full set of debug affordances a host may attach to an execution
/// loop: exec hooks plus instruction and memory breakpoints.
#[derive(Default)]
pub struct Hooks {
    enabled: bool,
    exec_hooks: Vec<ExecHook>,
    pub instruction: InstructionBreakpoint,
    pub memory: MemoryBreakpoint,
}

impl Hooks {
    /// Builds an empty, disabled hook set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether hooks and breakpoints are checked at all. Left `false` by
    /// default so the common case (no debugging) takes this struct's
    /// bookkeeping out of the hot loop entirely.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Enables or disables hook/breakpoint checking.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Registers an exec hook, run before every executed instruction.
    pub fn add_exec_hook(&mut self, hook: ExecHook) {
        self.exec_hooks.push(hook);
    }

    /// Runs every registered exec hook, then checks the instruction
    /// breakpoint. Returns `true` if the instruction breakpoint hit,
    /// signaling the caller to exit the current block. A no-op (and
    /// returns `false`) when hooks are disabled.
    pub fn on_instruction(&mut self, pc: u32, opcode: u32, cpu: CpuVariant, set: InstructionSet) -> bool {
        if !self.enabled {
            return false;
        }
        for hook in &mut self.exec_hooks {
            hook(pc, opcode, cpu, set);
        }
        self.instruction.check(pc)
    }
}
