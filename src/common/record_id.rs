//! Record identifier type.

use std::fmt;

use super::BlockId;

/// Physical location of a record: the block holding it and its slot.
///
/// Every leaf entry of the index carries one of these. Keeping the block
/// explicit lets the deletion path count distinct data blocks touched
/// without a lookup table.
///
/// # Example
/// ```
/// use blocktree::{BlockId, RecordId};
///
/// let rid = RecordId::new(BlockId::new(3), 17);
/// assert_eq!(rid.block_id, BlockId::new(3));
/// assert_eq!(rid.slot, 17);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId {
    pub block_id: BlockId,
    pub slot: u32,
}

impl RecordId {
    /// Create a new RecordId.
    #[inline]
    pub fn new(block_id: BlockId, slot: u32) -> Self {
        Self { block_id, slot }
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Rid({}:{})", self.block_id.0, self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_ordering() {
        let a = RecordId::new(BlockId::new(0), 5);
        let b = RecordId::new(BlockId::new(1), 0);
        let c = RecordId::new(BlockId::new(1), 2);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_record_id_display() {
        assert_eq!(format!("{}", RecordId::new(BlockId::new(4), 9)), "Rid(4:9)");
    }
}
