//! Node types stored in the tree arena.

use crate::common::RecordId;

/// Index of a node inside the tree arena.
pub type NodeId = u32;

/// Sentinel for "no node": the root's parent, the last leaf's successor,
/// and the root of an empty tree.
pub const NULL_NODE: NodeId = u32::MAX;

/// One `(key, record)` pair stored in a leaf.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeafEntry {
    pub key: f32,
    pub rid: RecordId,
}

impl LeafEntry {
    #[inline]
    pub fn new(key: f32, rid: RecordId) -> Self {
        Self { key, rid }
    }
}

/// A B+ tree node.
///
/// Leaves use `entries` and `next_leaf_id`; internal nodes use `keys` and
/// `children`. The unused half stays empty. Nodes refer to each other only
/// by [`NodeId`], so the arena can be persisted and reloaded as-is.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub is_leaf: bool,
    /// Entry count for leaves, separator count for internal nodes.
    pub key_count: u16,
    pub self_id: NodeId,
    pub parent_id: NodeId,
    pub next_leaf_id: NodeId,
    pub children: Vec<NodeId>,
    /// `keys[i]` is the minimum key under `children[i + 1]`.
    pub keys: Vec<f32>,
    pub entries: Vec<LeafEntry>,
}

impl Node {
    pub(crate) fn new(self_id: NodeId, is_leaf: bool) -> Self {
        Self {
            is_leaf,
            key_count: 0,
            self_id,
            parent_id: NULL_NODE,
            next_leaf_id: NULL_NODE,
            children: Vec::new(),
            keys: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Keep `key_count` in step with the populated vector.
    pub(crate) fn sync_key_count(&mut self) {
        let n = if self.is_leaf {
            self.entries.len()
        } else {
            self.keys.len()
        };
        self.key_count = n as u16;
    }

    /// Number of entries (leaf) or children (internal) held.
    #[inline]
    pub fn occupancy(&self) -> usize {
        if self.is_leaf {
            self.entries.len()
        } else {
            self.children.len()
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        self.parent_id == NULL_NODE
    }
}
