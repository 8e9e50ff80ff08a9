//! Bulk loading: sorted pairs in, complete tree out.

use tracing::{debug, info, warn};

use crate::common::RecordId;
use crate::storage::BlockStore;

use super::node::{LeafEntry, NodeId};
use super::tree::{Capacities, Tree};

/// One `(key, record)` pair per record, in storage order.
///
/// Storage order is the tie-break for equal keys once the pairs are
/// sorted, so callers must not reorder this before building.
pub fn extract_pairs(store: &BlockStore) -> Vec<(f32, RecordId)> {
    store
        .iter()
        .map(|(rid, record)| (record.indexed_key(), rid))
        .collect()
}

impl Tree {
    /// Build a tree whose node capacities fit a `block_size`-byte budget.
    pub fn build<I>(pairs: I, block_size: usize) -> Tree
    where
        I: IntoIterator<Item = (f32, RecordId)>,
    {
        Self::build_with_capacities(pairs, Capacities::from_block_size(block_size))
    }

    /// Index every record of a block store, sized by the store's block budget.
    pub fn build_from_store(store: &BlockStore) -> Tree {
        Self::build(extract_pairs(store), store.block_size())
    }

    /// Build a tree with explicit capacities.
    ///
    /// Pairs are sorted by key with a stable sort, so equal keys keep their
    /// input order. Keys compare with [`f32::total_cmp`]. An empty input
    /// yields [`Tree::empty`].
    ///
    /// # Panics
    /// Panics if any key is NaN. A NaN sorts above every threshold yet never
    /// compares greater than one, so deletion could not keep emptied
    /// subtrees at the end of each node. [`BlockStore`] never yields NaN keys.
    pub fn build_with_capacities<I>(pairs: I, caps: Capacities) -> Tree
    where
        I: IntoIterator<Item = (f32, RecordId)>,
    {
        let mut tree = Tree::empty(caps);

        let mut entries: Vec<LeafEntry> = pairs
            .into_iter()
            .map(|(key, rid)| LeafEntry::new(key, rid))
            .collect();
        assert!(
            entries.iter().all(|e| !e.key.is_nan()),
            "cannot index a NaN key"
        );
        if entries.is_empty() {
            warn!("no pairs to index, returning empty tree");
            return tree;
        }
        entries.sort_by(|a, b| a.key.total_cmp(&b.key));

        let mut level = tree.build_leaves(&entries);
        let mut height = 1;
        debug!(leaves = level.len(), capacity = caps.leaf_capacity(), "packed leaf level");

        while level.len() > 1 {
            level = tree.build_internal_level(&level);
            height += 1;
            debug!(nodes = level.len(), height, "built internal level");
        }

        tree.root_id = level[0];
        tree.height = height;

        info!(
            entries = entries.len(),
            nodes = tree.nodes.len(),
            height,
            fanout = caps.internal_fanout(),
            "bulk load complete"
        );
        tree
    }

    /// Pack sorted entries into consecutive leaves and chain them.
    fn build_leaves(&mut self, entries: &[LeafEntry]) -> Vec<NodeId> {
        let mut leaf_ids: Vec<NodeId> = Vec::with_capacity(
            entries.len().div_ceil(self.leaf_capacity as usize),
        );

        for chunk in entries.chunks(self.leaf_capacity as usize) {
            let id = self.new_node(true);
            let leaf = self.node_mut(id);
            leaf.entries.extend_from_slice(chunk);
            leaf.sync_key_count();

            if let Some(&prev) = leaf_ids.last() {
                self.node_mut(prev).next_leaf_id = id;
            }
            leaf_ids.push(id);
        }
        leaf_ids
    }

    /// Group one level's nodes under fresh parents.
    fn build_internal_level(&mut self, child_ids: &[NodeId]) -> Vec<NodeId> {
        let mut level_ids = Vec::with_capacity(
            child_ids.len().div_ceil(self.internal_fanout as usize),
        );

        for group in child_ids.chunks(self.internal_fanout as usize) {
            let id = self.new_node(false);
            for &child in group {
                self.node_mut(child).parent_id = id;
            }

            let keys = self.separators_for(group);
            let node = self.node_mut(id);
            node.children.extend_from_slice(group);
            node.keys = keys;
            node.sync_key_count();

            level_ids.push(id);
        }
        level_ids
    }

    /// Minimum key of every child but the first.
    ///
    /// Stops at the first empty subtree: after threshold deletion only a
    /// trailing run of children can be empty, and those carry no separator.
    pub(super) fn separators_for(&self, children: &[NodeId]) -> Vec<f32> {
        children
            .iter()
            .skip(1)
            .map_while(|&child| self.min_key(child))
            .collect()
    }
}
