//! Linear scan baseline.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::storage::BlockStore;

/// Cost of answering `key > threshold` by reading every block.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScanStats {
    pub blocks_accessed: u64,
    pub matches: u64,
    /// Mean key of matching records, 0.0 when nothing matched.
    pub average_key: f64,
    pub elapsed: Duration,
}

impl fmt::Display for ScanStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Scan {{ blocks: {}, matches: {}, avg_key: {:.4}, time: {:.2}ms }}",
            self.blocks_accessed,
            self.matches,
            self.average_key,
            self.elapsed.as_secs_f64() * 1000.0
        )
    }
}

/// Read every block and count records whose indexed key exceeds `threshold`.
///
/// The store is not modified.
pub fn linear_scan(store: &BlockStore, threshold: f32) -> ScanStats {
    let start = Instant::now();
    let mut stats = ScanStats::default();
    let mut key_sum = 0.0f64;

    for block in store.blocks() {
        stats.blocks_accessed += 1;
        for record in block.records() {
            let key = record.indexed_key();
            if key > threshold {
                stats.matches += 1;
                key_sum += key as f64;
            }
        }
    }

    if stats.matches > 0 {
        stats.average_key = key_sum / stats.matches as f64;
    }
    stats.elapsed = start.elapsed();

    debug!(
        blocks = stats.blocks_accessed,
        matches = stats.matches,
        "linear scan done"
    );
    stats
}
