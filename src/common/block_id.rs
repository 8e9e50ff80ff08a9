//! Block identifier type.

use std::fmt;

/// Identifies a block in the record store.
///
/// Blocks are numbered sequentially in the order they are filled, so a
/// `BlockId` doubles as the index into `BlockStore::blocks()`.
///
/// # Example
/// ```
/// use blocktree::BlockId;
///
/// let block_id = BlockId::new(42);
/// assert_eq!(block_id.0, 42);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    /// Create a new BlockId.
    #[inline]
    pub fn new(id: u32) -> Self {
        BlockId(id)
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Block({})", self.0)
    }
}
