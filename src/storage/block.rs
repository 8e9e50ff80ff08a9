//! Block - a fixed-budget container of whole records.

use crate::storage::Record;

/// A block of records bounded by a byte budget.
///
/// Records never straddle blocks: a record that does not fit in the
/// remaining space is refused and goes to the next block.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    records: Vec<Record>,
    block_size: usize,
}

impl Block {
    /// Create an empty block with the given byte budget.
    pub fn new(block_size: usize) -> Self {
        Self {
            records: Vec::with_capacity(block_size / Record::size()),
            block_size,
        }
    }

    /// Whether one more record fits in the budget.
    #[inline]
    pub fn has_room(&self) -> bool {
        self.used_bytes() + Record::size() <= self.block_size
    }

    /// Append a record known to fit.
    ///
    /// # Panics
    /// Panics if the block is full; check [`Block::has_room`] first.
    pub fn push(&mut self, record: Record) -> u32 {
        assert!(self.has_room(), "block of {} bytes is full", self.block_size);
        let slot = self.records.len() as u32;
        self.records.push(record);
        slot
    }

    /// Append a record if it fits.
    ///
    /// Returns the record back when the block is full so the caller can
    /// place it in a fresh block without cloning.
    pub fn try_push(&mut self, record: Record) -> std::result::Result<u32, Record> {
        if !self.has_room() {
            return Err(record);
        }
        Ok(self.push(record))
    }

    /// Record at `slot`, if present.
    #[inline]
    pub fn record(&self, slot: u32) -> Option<&Record> {
        self.records.get(slot as usize)
    }

    /// All records in slot order.
    #[inline]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bytes currently occupied by records.
    #[inline]
    pub fn used_bytes(&self) -> usize {
        self.records.len() * Record::size()
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }
}
