//! SSA-style value identity and arena node indices.

/// Sentinel marking an absent variable. A variable created from this index
/// is never a real definition; it marks "no destination" or "no source".
const ABSENT_INDEX: u32 = u32::MAX;

/// Identity of one SSA value, assigned exactly once by whichever op defines
/// it.
///
/// # Examples
///
/// ```
/// use armcore::ir::Variable;
///
/// let v = Variable::new(3);
/// assert!(v.is_present());
/// assert_eq!(v.index(), 3);
/// assert!(!Variable::ABSENT.is_present());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct Variable(u32);

impl Variable {
    /// The sentinel "no variable" value.
    pub const ABSENT: Variable = Variable(ABSENT_INDEX);

    /// Wraps a raw arena index as a variable identity.
    #[must_use]
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// The raw index, meaningful only for present variables.
    #[must_use]
    pub fn index(self) -> u32 {
        self.0
    }

    /// Whether this identifies a real value rather than the absent sentinel.
    #[must_use]
    pub fn is_present(self) -> bool {
        self.0 != ABSENT_INDEX
    }
}

impl Default for OpIndex {
    fn default() -> Self {
        OpIndex(0)
    }
}

/// Index of one node in a `BasicBlock`'s arena.
///
/// Kept as a plain index rather than a pointer so that erasing a node never
/// invalidates references held elsewhere in the block (an optimizer pass
/// may park an `OpIndex` across an `erase` of an unrelated node).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct OpIndex(pub(crate) u32);

impl OpIndex {
    pub(crate) fn as_usize(self) -> usize {
        self.0 as usize
    }
}
