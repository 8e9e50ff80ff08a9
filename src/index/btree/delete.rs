//! Threshold deletion: remove every entry with `key > threshold`.
//!
//! Runs in three phases:
//! 1. **Locate** - descend to the first leaf that can hold a matching key,
//!    then walk the leaf chain collecting matches. Drives the statistics.
//! 2. **Remove** - visit every leaf in the arena and drop matching entries.
//! 3. **Repair** - rebuild the separator list of every ancestor of a
//!    modified leaf from its children's minima.
//!
//! No node is created, freed, merged, or rebalanced. Emptied leaves stay
//! in the chain and underflow is only reported.

use std::collections::BTreeSet;
use std::fmt;
use std::time::{Duration, Instant};

use tracing::{debug, info, trace};

use crate::common::BlockId;

use super::node::{NodeId, NULL_NODE};
use super::tree::Tree;

/// Outcome of [`Tree::delete_where_greater_than`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeletionStats {
    /// Internal and leaf nodes read while locating matches.
    pub index_nodes_accessed: u64,
    /// Distinct data blocks holding a matched record.
    pub data_blocks_accessed: u64,
    pub entries_deleted: u64,
    pub leaves_modified: u64,
    /// Separator recomputations performed during repair.
    pub nodes_visited_in_repair: u64,
    /// Non-root nodes below half occupancy after the deletion.
    pub underflowed_nodes: u64,
    /// Mean key of the deleted entries, 0.0 when nothing matched.
    pub average_key: f64,
    pub elapsed: Duration,
}

impl fmt::Display for DeletionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Deletion {{ index_nodes: {}, data_blocks: {}, deleted: {}, avg_key: {:.4}, \
             leaves_modified: {}, repaired: {}, underflowed: {}, time: {:.2}ms }}",
            self.index_nodes_accessed,
            self.data_blocks_accessed,
            self.entries_deleted,
            self.average_key,
            self.leaves_modified,
            self.nodes_visited_in_repair,
            self.underflowed_nodes,
            self.elapsed.as_secs_f64() * 1000.0
        )
    }
}

/// What the locate phase found.
#[derive(Debug, Default)]
struct Located {
    nodes_accessed: u64,
    matches: u64,
    key_sum: f64,
    blocks: BTreeSet<BlockId>,
}

#[inline]
fn exceeds(key: f32, threshold: f32) -> bool {
    key > threshold
}

impl Tree {
    /// Remove every entry whose key is strictly greater than `threshold`.
    ///
    /// An empty tree or a threshold above every key is a no-op. After the
    /// call separators match their subtrees again, but nodes may be left
    /// under-occupied or empty.
    pub fn delete_where_greater_than(&mut self, threshold: f32) -> DeletionStats {
        let start = Instant::now();
        if self.is_empty() {
            return DeletionStats {
                elapsed: start.elapsed(),
                ..DeletionStats::default()
            };
        }

        let located = self.locate_greater_than(threshold);
        let (modified, removed) = self.remove_greater_than(threshold);
        let repaired = self.repair_separators(&modified);
        let underflowed = self.underflowed_nodes().len() as u64;

        debug_assert_eq!(located.matches, removed, "locate and remove disagree");

        let stats = DeletionStats {
            index_nodes_accessed: located.nodes_accessed,
            data_blocks_accessed: located.blocks.len() as u64,
            entries_deleted: removed,
            leaves_modified: modified.len() as u64,
            nodes_visited_in_repair: repaired,
            underflowed_nodes: underflowed,
            average_key: if located.matches == 0 {
                0.0
            } else {
                located.key_sum / located.matches as f64
            },
            elapsed: start.elapsed(),
        };

        info!(
            threshold,
            deleted = stats.entries_deleted,
            leaves_modified = stats.leaves_modified,
            underflowed,
            "threshold deletion complete"
        );
        stats
    }

    /// Descend to the first candidate leaf and collect matches along the chain.
    fn locate_greater_than(&self, threshold: f32) -> Located {
        let mut found = Located::default();

        let mut id = self.root_id;
        loop {
            found.nodes_accessed += 1;
            let node = self.node(id);
            if node.is_leaf {
                break;
            }
            let i = node.keys.partition_point(|&k| !exceeds(k, threshold));
            id = node.children[i];
        }
        trace!(leaf = id, "located first candidate leaf");

        let mut first = true;
        while id != NULL_NODE {
            if !first {
                found.nodes_accessed += 1;
            }
            first = false;

            let leaf = self.node(id);
            for entry in leaf.entries.iter().filter(|e| exceeds(e.key, threshold)) {
                found.matches += 1;
                found.key_sum += entry.key as f64;
                found.blocks.insert(entry.rid.block_id);
            }
            id = leaf.next_leaf_id;
        }

        debug!(
            matches = found.matches,
            nodes = found.nodes_accessed,
            blocks = found.blocks.len(),
            "locate phase done"
        );
        found
    }

    /// Drop matching entries from every leaf in the arena.
    ///
    /// Returns the modified leaves in id order and the number removed.
    fn remove_greater_than(&mut self, threshold: f32) -> (Vec<NodeId>, u64) {
        let mut modified = Vec::new();
        let mut removed = 0u64;

        for node in self.nodes.iter_mut().filter(|n| n.is_leaf) {
            let before = node.entries.len();
            node.entries.retain(|e| !exceeds(e.key, threshold));
            let dropped = before - node.entries.len();
            if dropped > 0 {
                node.sync_key_count();
                modified.push(node.self_id);
                removed += dropped as u64;
            }
        }

        debug!(leaves = modified.len(), removed, "remove phase done");
        (modified, removed)
    }

    /// Recompute separators on the path from each modified leaf to the root.
    ///
    /// Returns the number of recomputations.
    fn repair_separators(&mut self, modified: &[NodeId]) -> u64 {
        let mut visited = 0u64;

        for &leaf in modified {
            let mut id = self.node(leaf).parent_id;
            while id != NULL_NODE {
                self.recompute_separators(id);
                visited += 1;
                id = self.node(id).parent_id;
            }
        }

        debug!(visited, "repair phase done");
        visited
    }

    fn recompute_separators(&mut self, id: NodeId) {
        let keys = self.separators_for(&self.node(id).children);
        let node = self.node_mut(id);
        if node.keys != keys {
            trace!(node = id, old = ?node.keys, new = ?keys, "separators rewritten");
        }
        node.keys = keys;
        node.sync_key_count();
    }
}
