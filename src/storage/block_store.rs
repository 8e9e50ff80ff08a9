//! Block Store - records packed into fixed-budget blocks.
//!
//! The [`BlockStore`] is what the index is built over. It is filled once
//! from delimited text (or reloaded from its own binary file) and then read:
//! the index only needs an ordered walk over `(key, RecordId)` and the block
//! budget.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use crate::common::{BlockId, Error, RecordId, Result};
use crate::storage::{Block, Record};

/// An in-memory heap of blocks, filled in arrival order.
///
/// # Layout
/// ```text
/// ┌──────────────┬──────────────┬─────┬──────────────┐
/// │   Block 0    │   Block 1    │ ... │   Block N    │
/// │ slot 0..k-1  │ slot 0..k-1  │     │ slot 0..m-1  │
/// └──────────────┴──────────────┴─────┴──────────────┘
/// ```
/// Every block but the last is full; `RecordId { block_id, slot }`
/// addresses a record directly.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStore {
    pub(super) blocks: Vec<Block>,
    pub(super) block_size: usize,
    pub(super) total_records: usize,
}

impl BlockStore {
    /// Create an empty store.
    ///
    /// # Errors
    /// Returns `Error::InvalidBlockSize` if a block cannot hold one record.
    pub fn new(block_size: usize) -> Result<Self> {
        if block_size < Record::size() {
            return Err(Error::InvalidBlockSize(block_size));
        }
        Ok(Self {
            blocks: Vec::new(),
            block_size,
            total_records: 0,
        })
    }

    /// Load a tab-delimited file with a header row.
    pub fn open_delimited<P: AsRef<Path>>(path: P, block_size: usize) -> Result<Self> {
        let file = File::open(path)?;
        let mut store = Self::new(block_size)?;
        store.load_delimited(BufReader::new(file))?;
        Ok(store)
    }

    /// Append every record of a tab-delimited stream.
    ///
    /// The first line is a header and is skipped, as are blank lines.
    /// Lines that fail to parse are logged and skipped. Returns the number
    /// of records appended.
    ///
    /// # Errors
    /// Only I/O errors from the reader are returned.
    pub fn load_delimited<R: BufRead>(&mut self, reader: R) -> Result<usize> {
        let mut appended = 0;
        let mut skipped = 0;

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if idx == 0 || line.trim().is_empty() {
                continue;
            }
            match Record::from_delimited(&line, idx + 1) {
                Ok(record) => {
                    self.push(record);
                    appended += 1;
                }
                Err(e) => {
                    warn!(line = idx + 1, error = %e, "skipping unparsable record");
                    skipped += 1;
                }
            }
        }

        debug!(
            appended,
            skipped,
            blocks = self.blocks.len(),
            "loaded delimited records"
        );
        Ok(appended)
    }

    /// Append one record, opening a new block when the last one is full.
    ///
    /// Cannot fail: [`BlockStore::new`] guarantees a fresh block holds at
    /// least one record.
    pub fn push(&mut self, record: Record) -> RecordId {
        if !self.blocks.last().is_some_and(Block::has_room) {
            self.blocks.push(Block::new(self.block_size));
        }
        let block_id = BlockId::new(self.blocks.len() as u32 - 1);
        let slot = self.blocks[block_id.0 as usize].push(record);
        self.total_records += 1;
        RecordId::new(block_id, slot)
    }

    /// Look up a record by id.
    pub fn record(&self, rid: RecordId) -> Option<&Record> {
        self.blocks
            .get(rid.block_id.0 as usize)
            .and_then(|b| b.record(rid.slot))
    }

    /// All records with their ids, in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &Record)> + '_ {
        self.blocks.iter().enumerate().flat_map(|(b, block)| {
            block
                .records()
                .iter()
                .enumerate()
                .map(move |(s, r)| (RecordId::new(BlockId::new(b as u32), s as u32), r))
        })
    }

    #[inline]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    #[inline]
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Accounted size of one record in bytes.
    #[inline]
    pub fn record_size(&self) -> usize {
        Record::size()
    }

    #[inline]
    pub fn total_records(&self) -> usize {
        self.total_records
    }

    #[inline]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Average records per block, rounded down.
    pub fn records_per_block(&self) -> usize {
        if self.blocks.is_empty() {
            0
        } else {
            self.total_records / self.blocks.len()
        }
    }
}
