//! Two-level decoded-instruction cache.
//!
//! Addresses split into `(page: 12 bits, entry: 12 bits, offset: 8 bits)`.
//! Each entry caches the decode-table classification for every instruction
//! in its 256-byte span, so repeated execution of the same code skips the
//! table lookup (though not the fetch itself — see
//! [`BlockCache::run_cached`]'s doc comment for why). Pages are allocated
//! lazily; within a page, invalidation of one entry never disturbs its
//! neighbors.

use crate::config::CpuVariant;
use crate::core::InterpreterCore;
use crate::hooks::{Hooks, InstructionSet};
use crate::isa::decode::{classify_arm_opcode, thumb_table, thumb_table_index};
use crate::isa::instruction::{ArmOpKind, ThumbOpKind};
use crate::memory::MemoryInterface;

const PAGE_BITS: u32 = 12;
const ENTRY_BITS: u32 = 12;
const OFFSET_BITS: u32 = 8;

const ENTRY_COUNT: usize = 1 << ENTRY_BITS;
const PAGE_COUNT: usize = 1 << PAGE_BITS;
const BLOCK_BYTES: u32 = 1 << OFFSET_BITS;

/// One decoded instruction: its raw opcode, retained for operand extraction,
/// and the coarse class the decode table resolved it to.
#[derive(Clone, Copy, Debug)]
pub struct DecodedInstruction<Kind> {
    /// The raw instruction word (or half-word, widened) as fetched.
    pub opcode: u32,
    /// The decode table's classification.
    pub kind: Kind,
}

/// A cached run of ARM instructions spanning one 256-byte block.
pub type ArmBlock = Vec<DecodedInstruction<ArmOpKind>>;
/// A cached run of Thumb instructions spanning one 256-byte block.
pub type ThumbBlock = Vec<DecodedInstruction<ThumbOpKind>>;

struct Page<B> {
    valid: bool,
    entries: Vec<Option<B>>,
}

impl<B> Page<B> {
    fn new() -> Self {
        Self { valid: true, entries: (0..ENTRY_COUNT).map(|_| None).collect() }
    }
}

/// Splits a guest address into `(page index, entry index, block base)`.
const fn split(addr: u32) -> (usize, usize, u32) {
    let offset_mask = BLOCK_BYTES - 1;
    let base = addr & !offset_mask;
    let entry = ((addr >> OFFSET_BITS) & (ENTRY_COUNT as u32 - 1)) as usize;
    let page = ((addr >> (OFFSET_BITS + ENTRY_BITS)) & (PAGE_COUNT as u32 - 1)) as usize;
    (page, entry, base)
}

/// The decoded-block cache sitting in front of the scalar interpreter.
///
/// ARM and Thumb blocks live in two entirely independent page tables: the
/// guest can execute the same address in either instruction set (most
/// commonly via an interworking `BX`) without one cache's entry colliding
/// with, or ever being mistaken for, the other's.
pub struct BlockCache {
    arm_pages: Vec<Option<Box<Page<ArmBlock>>>>,
    thumb_pages: Vec<Option<Box<Page<ThumbBlock>>>>,
}

impl Default for BlockCache {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockCache {
    /// Builds an empty cache with no pages allocated.
    #[must_use]
    pub fn new() -> Self {
        Self {
            arm_pages: (0..PAGE_COUNT).map(|_| None).collect(),
            thumb_pages: (0..PAGE_COUNT).map(|_| None).collect(),
        }
    }

    fn arm_page_mut(&mut self, page_idx: usize) -> &mut Page<ArmBlock> {
        self.arm_pages[page_idx].get_or_insert_with(|| Box::new(Page::new()))
    }

    fn thumb_page_mut(&mut self, page_idx: usize) -> &mut Page<ThumbBlock> {
        self.thumb_pages[page_idx].get_or_insert_with(|| Box::new(Page::new()))
    }

    /// Returns the decoded ARM block covering `addr`'s 256-byte span,
    /// decoding it from `mem` (via side-effect-free peeks) on first access.
    pub fn get_or_decode_arm(&mut self, addr: u32, mem: &impl MemoryInterface, cpu_variant: CpuVariant) -> &ArmBlock {
        let (page_idx, entry_idx, base) = split(addr);
        let page = self.arm_page_mut(page_idx);
        if !page.valid {
            page.entries.iter_mut().for_each(|e| *e = None);
            page.valid = true;
        }
        page.entries[entry_idx].get_or_insert_with(|| decode_arm_block(base, mem, cpu_variant))
    }

    /// Returns the decoded Thumb block covering `addr`'s 256-byte span.
    pub fn get_or_decode_thumb(&mut self, addr: u32, mem: &impl MemoryInterface) -> &ThumbBlock {
        let (page_idx, entry_idx, base) = split(addr);
        let page = self.thumb_page_mut(page_idx);
        if !page.valid {
            page.entries.iter_mut().for_each(|e| *e = None);
            page.valid = true;
        }
        page.entries[entry_idx].get_or_insert_with(|| decode_thumb_block(base, mem))
    }

    /// Drops the single entry covering `addr` in both caches, forcing its
    /// re-decode next access.
    pub fn invalidate_address(&mut self, addr: u32) {
        let (page_idx, entry_idx, _) = split(addr);
        if let Some(page) = self.arm_pages[page_idx].as_mut() {
            page.entries[entry_idx] = None;
        }
        if let Some(page) = self.thumb_pages[page_idx].as_mut() {
            page.entries[entry_idx] = None;
        }
    }

    /// Drops every entry whose block overlaps `[start, end)`.
    pub fn invalidate_range(&mut self, start: u32, end: u32) {
        if start >= end {
            return;
        }
        let mut addr = start & !(BLOCK_BYTES - 1);
        while addr < end {
            self.invalidate_address(addr);
            addr = addr.wrapping_add(BLOCK_BYTES);
            if addr == 0 {
                break; // wrapped past 0xFFFFFFFF
            }
        }
    }

    /// Marks the whole page containing `addr` stale in both caches. The
    /// per-entry bitmap is cleared lazily, on the page's next access, not
    /// here.
    pub fn invalidate_page(&mut self, addr: u32) {
        let (page_idx, _, _) = split(addr);
        if let Some(page) = self.arm_pages[page_idx].as_mut() {
            page.valid = false;
        }
        if let Some(page) = self.thumb_pages[page_idx].as_mut() {
            page.valid = false;
        }
    }

    /// Releases every allocated page in both caches.
    pub fn clear(&mut self) {
        self.arm_pages.iter_mut().for_each(|p| *p = None);
        self.thumb_pages.iter_mut().for_each(|p| *p = None);
    }

    /// Runs cached instructions starting at the interpreter's current
    /// execution address, continuing until a handler invalidates the
    /// pipeline (branch, exception, mode switch), `single_step` is set, or
    /// execution crosses into the next 256-byte block (at which point the
    /// caller should call `run_cached` again to pick up the next block).
    /// Returns the accumulated cycle cost.
    ///
    /// This still calls [`InterpreterCore::advance_pipeline`] for every
    /// instruction, so it pays the same fetch cost `tick` would (code
    /// fetches are assumed side-effect-free, so refetching is not a
    /// correctness concern, only a missed optimization) — what it skips is
    /// the decode-table lookup, reusing this cache's classification
    /// instead. A code generator consuming the IR translator's output
    /// avoids the refetch too; this loop exists for the scalar interpreter,
    /// which the translator and optimizer never replace, only bypass.
    ///
    /// `hooks` is checked once per instruction, before execution: exec
    /// hooks run unconditionally, then the instruction breakpoint is
    /// checked. A breakpoint hit clears `cache_valid` so the loop exits
    /// after the hit instruction without executing it, matching the
    /// "invoke callback, exit block" behavior expected of a debug stop.
    pub fn run_cached<M: MemoryInterface>(
        &mut self,
        core: &mut InterpreterCore<M>,
        hooks: &mut Hooks,
        single_step: bool,
    ) -> u64 {
        let thumb = core.is_thumb();
        let start = core.current_pc_address();
        let width = if thumb { 2 } else { 4 };

        core.set_cache_valid(true);
        let mut total = 0u64;
        let mut addr = start;

        loop {
            if !core.cache_valid() {
                break;
            }
            let crossed_block = addr != start && (addr & (BLOCK_BYTES - 1)) == 0;
            if crossed_block {
                break;
            }

            let opcode = core.pipeline_slot0();
            if hooks.enabled() {
                let set = if thumb { InstructionSet::Thumb } else { InstructionSet::Arm };
                if hooks.on_instruction(addr, opcode, core.cpu_variant(), set) {
                    core.set_cache_valid(false);
                    break;
                }
            }
            core.advance_pipeline(thumb);

            let cost = if thumb {
                let (_, entry_idx, base) = split(addr);
                let index = ((addr - base) / 2) as usize;
                let kind = self.get_or_decode_thumb(addr, core.memory()).get(index).map_or(
                    thumb_table()[thumb_table_index(opcode as u16)],
                    |instr| instr.kind,
                );
                let _ = entry_idx;
                core.execute_thumb(kind, opcode as u16)
            } else {
                let cond = opcode >> 28;
                if cond != 0xF && !core.condition_passes(cond) {
                    1
                } else {
                    let (_, entry_idx, base) = split(addr);
                    let index = ((addr - base) / 4) as usize;
                    let variant = core.cpu_variant();
                    let kind = self
                        .get_or_decode_arm(addr, core.memory(), variant)
                        .get(index)
                        .map_or(classify_arm_opcode(opcode, variant), |instr| instr.kind);
                    let _ = entry_idx;
                    core.execute_arm(kind, opcode)
                }
            };
            total += cost;

            if single_step {
                break;
            }
            addr = addr.wrapping_add(width);
        }

        total
    }
}

fn decode_arm_block(base: u32, mem: &impl MemoryInterface, cpu_variant: CpuVariant) -> ArmBlock {
    let count = (BLOCK_BYTES / 4) as u32;
    (0..count)
        .map(|i| {
            let opcode = mem.peek_word(base.wrapping_add(i * 4));
            let kind = classify_arm_opcode(opcode, cpu_variant);
            DecodedInstruction { opcode, kind }
        })
        .collect()
}

fn decode_thumb_block(base: u32, mem: &impl MemoryInterface) -> ThumbBlock {
    let count = (BLOCK_BYTES / 2) as u32;
    (0..count)
        .map(|i| {
            let opcode = u32::from(mem.peek_half(base.wrapping_add(i * 2)));
            let kind = thumb_table()[thumb_table_index(opcode as u16)];
            DecodedInstruction { opcode, kind }
        })
        .collect()
}
