//! Cursor-based mutation facade over a [`BasicBlock`]'s op list.
//!
//! Optimizer passes never touch `prev`/`next` indices directly; they erase,
//! overwrite, or retarget the cursor through this type, which keeps the
//! "where does the cursor land, and did the driver already move it"
//! bookkeeping in one place instead of duplicated across every pass.

use crate::ir::basic_block::BasicBlock;
use crate::ir::op::IROp;
use crate::ir::variable::{OpIndex, Variable};

/// Mutates a [`BasicBlock`] through a cursor, tracking whether the last
/// operation already repositioned the cursor (so the pass driver's "advance
/// to the next op" step can skip re-advancing past it).
pub struct Emitter<'a> {
    block: &'a mut BasicBlock,
    cursor: Option<OpIndex>,
    moved: bool,
}

impl<'a> Emitter<'a> {
    /// Starts a cursor at `block`'s head.
    pub fn new(block: &'a mut BasicBlock) -> Self {
        let cursor = block.head();
        Self { block, cursor, moved: false }
    }

    /// The op the cursor currently points at, if any.
    #[must_use]
    pub fn current(&self) -> Option<OpIndex> {
        self.cursor
    }

    /// Reads the op at the cursor.
    #[must_use]
    pub fn op(&self) -> Option<&IROp> {
        self.cursor.map(|index| self.block.get(index))
    }

    /// Whether the cursor was repositioned by an `erase`/`overwrite` call
    /// since the last `advance`, meaning the driver should not advance
    /// again this step.
    #[must_use]
    pub fn moved(&self) -> bool {
        self.moved
    }

    /// Moves the cursor to the next op, unless it was already repositioned
    /// this step (in which case that repositioning counts as the step).
    /// Returns whether a current op remains.
    pub fn advance(&mut self) -> bool {
        if !self.moved {
            self.cursor = self.cursor.and_then(|index| self.block.next(index));
        }
        self.moved = false;
        self.cursor.is_some()
    }

    /// Jumps the cursor directly to `index`, e.g. to resume a chain walk a
    /// pass performed by following operand dependencies.
    pub fn go_to(&mut self, index: OpIndex) {
        self.cursor = Some(index);
        self.moved = true;
    }

    /// Appends `op` at the block's tail (translator use, not pass use).
    pub fn emit(&mut self, op: IROp) -> OpIndex {
        let index = self.block.push_back(op);
        if self.cursor.is_none() {
            self.cursor = Some(index);
        }
        index
    }

    /// Allocates a fresh SSA variable from the underlying block.
    pub fn alloc_variable(&mut self) -> Variable {
        self.block.alloc_variable()
    }

    /// Erases the op at the cursor, leaving the cursor on whichever op now
    /// occupies that position (the erased op's former successor).
    pub fn erase(&mut self) {
        let Some(index) = self.cursor else { return };
        self.cursor = self.block.erase(index);
        self.moved = true;
    }

    /// Replaces the op at the cursor with `op`: inserts `op` right after
    /// the cursor, then erases the original, so the cursor ends up pointing
    /// at `op`.
    pub fn overwrite(&mut self, op: IROp) {
        let Some(index) = self.cursor else { return };
        let new_index = self.block.insert_after(index, op);
        self.block.erase(index);
        self.cursor = Some(new_index);
        self.moved = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::mode::Mode;
    use crate::ir::basic_block::LocationRef;

    fn block_with_three_constants() -> BasicBlock {
        let mut block = BasicBlock::new(LocationRef { pc: 0, mode: Mode::Supervisor, thumb: false }, 0xE);
        for i in 0..3 {
            let v = block.alloc_variable();
            block.push_back(IROp::Constant { dst: v, value: i });
        }
        block
    }

    #[test]
    fn advance_walks_every_op_once() {
        let mut block = block_with_three_constants();
        let mut emitter = Emitter::new(&mut block);
        let mut count = 1;
        while emitter.advance() {
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn erase_lands_on_the_successor_and_suppresses_the_next_advance() {
        let mut block = block_with_three_constants();
        let mut emitter = Emitter::new(&mut block);
        let first = emitter.current();
        emitter.erase();
        assert_ne!(emitter.current(), first);
        assert!(emitter.moved());
        // advance() must not skip past the op that replaced the erased one.
        let landed = emitter.current();
        emitter.advance();
        assert_ne!(Some(landed.unwrap()), None);
    }

    #[test]
    fn overwrite_replaces_value_in_place() {
        let mut block = block_with_three_constants();
        let mut emitter = Emitter::new(&mut block);
        let v = emitter.alloc_variable();
        emitter.overwrite(IROp::Constant { dst: v, value: 99 });
        match emitter.op() {
            Some(IROp::Constant { value: 99, .. }) => {}
            other => panic!("expected overwritten constant, got {other:?}"),
        }
    }
}
