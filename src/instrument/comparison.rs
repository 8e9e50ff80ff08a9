//! Indexed deletion vs. linear scan.

use std::fmt;

use tracing::info;

use crate::index::btree::{DeletionStats, Tree};
use crate::instrument::scan::{linear_scan, ScanStats};
use crate::storage::BlockStore;

/// Side-by-side cost of the two ways to find `key > threshold`.
#[derive(Debug, Clone, PartialEq)]
pub struct Comparison {
    pub threshold: f32,
    pub indexed: DeletionStats,
    pub scan: ScanStats,
}

impl Comparison {
    /// How many times faster the indexed path ran. `None` if it took no
    /// measurable time.
    pub fn speedup(&self) -> Option<f64> {
        let indexed = self.indexed.elapsed.as_secs_f64();
        if indexed > 0.0 {
            Some(self.scan.elapsed.as_secs_f64() / indexed)
        } else {
            None
        }
    }

    /// Blocks read by the scan per data block touched by the index.
    pub fn block_ratio(&self) -> Option<f64> {
        if self.indexed.data_blocks_accessed == 0 {
            None
        } else {
            Some(self.scan.blocks_accessed as f64 / self.indexed.data_blocks_accessed as f64)
        }
    }

    /// Both paths found the same records.
    pub fn agrees(&self) -> bool {
        self.indexed.entries_deleted == self.scan.matches
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Threshold: key > {:.4}", self.threshold)?;
        writeln!(f, "  {}", self.indexed)?;
        writeln!(f, "  {}", self.scan)?;
        match self.speedup() {
            Some(s) => write!(f, "  speedup: {:.2}x", s)?,
            None => write!(f, "  speedup: n/a")?,
        }
        match self.block_ratio() {
            Some(r) => write!(f, ", block ratio: {:.2}x", r),
            None => write!(f, ", block ratio: n/a"),
        }
    }
}

/// Delete `key > threshold` from `tree` and time a linear scan of `store`
/// for the same predicate.
///
/// The tree is mutated; the store is only read.
pub fn compare_delete(store: &BlockStore, tree: &mut Tree, threshold: f32) -> Comparison {
    let indexed = tree.delete_where_greater_than(threshold);
    let scan = linear_scan(store, threshold);

    let comparison = Comparison {
        threshold,
        indexed,
        scan,
    };
    info!(
        threshold,
        index_blocks = comparison.indexed.data_blocks_accessed,
        scan_blocks = comparison.scan.blocks_accessed,
        agrees = comparison.agrees(),
        "compared indexed deletion with linear scan"
    );
    comparison
}
