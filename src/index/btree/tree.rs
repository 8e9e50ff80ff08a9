//! The arena-backed tree and its read-only diagnostics.

use std::fmt;

use crate::common::config::{KEY_SIZE, LEAF_ENTRY_SIZE, NODE_HEADER_SIZE, POINTER_SIZE};
use crate::common::{Error, Result};

use super::node::{LeafEntry, Node, NodeId, NULL_NODE};

/// Node capacities derived from a byte budget.
///
/// `key_count` is a `u16`, so both capacities are clamped to what it can
/// count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capacities {
    leaf_capacity: u32,
    internal_fanout: u32,
}

impl Capacities {
    const MAX_LEAF: u32 = u16::MAX as u32;
    const MAX_FANOUT: u32 = u16::MAX as u32 + 1;

    /// Capacities with the minimums applied.
    pub fn new(leaf_capacity: u32, internal_fanout: u32) -> Self {
        Self {
            leaf_capacity: leaf_capacity.clamp(1, Self::MAX_LEAF),
            internal_fanout: internal_fanout.clamp(2, Self::MAX_FANOUT),
        }
    }

    /// Maximum entries per leaf (at least 1).
    #[inline]
    pub fn leaf_capacity(&self) -> u32 {
        self.leaf_capacity
    }

    /// Maximum children per internal node (at least 2).
    #[inline]
    pub fn internal_fanout(&self) -> u32 {
        self.internal_fanout
    }

    /// Fit as many entries/children as the budget allows after the header.
    ///
    /// ```
    /// use blocktree::index::btree::Capacities;
    ///
    /// let caps = Capacities::from_block_size(4096);
    /// assert_eq!(caps.leaf_capacity(), 340);
    /// assert_eq!(caps.internal_fanout(), 510);
    /// ```
    pub fn from_block_size(block_size: usize) -> Self {
        let leaf = block_size.saturating_sub(NODE_HEADER_SIZE) / LEAF_ENTRY_SIZE;
        let max_keys = block_size.saturating_sub(NODE_HEADER_SIZE + POINTER_SIZE)
            / (KEY_SIZE + POINTER_SIZE);

        let leaf = u32::try_from(leaf).unwrap_or(u32::MAX);
        let max_keys = u32::try_from(max_keys).unwrap_or(u32::MAX).max(1);
        Self::new(leaf, max_keys.saturating_add(1))
    }
}

/// A bulk-loaded B+ tree over `f32` keys.
///
/// # Architecture
/// ```text
///                 ┌────────────────┐
///                 │ root (internal)│
///                 └──┬─────┬─────┬─┘
///          ┌─────────┘     │     └─────────┐
///     ┌────▼───┐      ┌────▼───┐      ┌────▼───┐
///     │ leaf 0 │─────▶│ leaf 1 │─────▶│ leaf 2 │──▶ NULL
///     └────────┘      └────────┘      └────────┘
/// ```
/// All nodes live in one `Vec<Node>` and refer to each other by
/// [`NodeId`]. The arena only grows during bulk load; deletion edits
/// nodes in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub(super) internal_fanout: u32,
    pub(super) leaf_capacity: u32,
    pub(super) nodes: Vec<Node>,
    pub(super) root_id: NodeId,
    pub(super) height: u32,
}

impl Tree {
    /// An empty tree: no nodes, no root, height 0.
    pub fn empty(caps: Capacities) -> Self {
        Self {
            internal_fanout: caps.internal_fanout(),
            leaf_capacity: caps.leaf_capacity(),
            nodes: Vec::new(),
            root_id: NULL_NODE,
            height: 0,
        }
    }

    /// Append a fresh node and return its id.
    pub(super) fn new_node(&mut self, is_leaf: bool) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node::new(id, is_leaf));
        id
    }

    /// Node by id.
    ///
    /// # Panics
    /// Panics if `id` is outside the arena.
    #[inline]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    #[inline]
    pub(super) fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id as usize]
    }

    #[inline]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn root_id(&self) -> NodeId {
        self.root_id
    }

    /// Number of levels, leaves included. Zero for an empty tree.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn leaf_capacity(&self) -> u32 {
        self.leaf_capacity
    }

    #[inline]
    pub fn internal_fanout(&self) -> u32 {
        self.internal_fanout
    }

    #[inline]
    pub fn capacities(&self) -> Capacities {
        Capacities::new(self.leaf_capacity, self.internal_fanout)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root_id == NULL_NODE
    }

    /// Total number of leaf entries.
    pub fn len(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| n.is_leaf)
            .map(|n| n.entries.len())
            .sum()
    }

    /// Smallest key under `id`, found by leftmost descent.
    ///
    /// Returns `None` when the leftmost leaf of the subtree is empty, which
    /// after threshold deletion means the whole subtree is empty.
    pub fn min_key(&self, id: NodeId) -> Option<f32> {
        let mut node = self.node(id);
        while !node.is_leaf {
            node = self.node(*node.children.first()?);
        }
        node.entries.first().map(|e| e.key)
    }

    /// Leftmost leaf, reached by descending first children from the root.
    pub fn first_leaf(&self) -> Option<NodeId> {
        if self.is_empty() {
            return None;
        }
        let mut id = self.root_id;
        loop {
            let node = self.node(id);
            if node.is_leaf {
                return Some(id);
            }
            id = *node.children.first()?;
        }
    }

    /// Leaf ids in chain order.
    pub fn leaf_chain(&self) -> LeafChain<'_> {
        LeafChain {
            tree: self,
            next: self.first_leaf().unwrap_or(NULL_NODE),
        }
    }

    /// Every entry in chain order.
    pub fn entries(&self) -> impl Iterator<Item = &LeafEntry> + '_ {
        self.leaf_chain()
            .flat_map(move |id| self.node(id).entries.iter())
    }

    /// Separator keys of the root, or its entry keys when the root is a leaf.
    pub fn root_keys(&self) -> Vec<f32> {
        if self.is_empty() {
            return Vec::new();
        }
        let root = self.node(self.root_id);
        if root.is_leaf {
            root.entries.iter().map(|e| e.key).collect()
        } else {
            root.keys.clone()
        }
    }

    /// Non-root nodes holding fewer than half their capacity.
    ///
    /// Deletion never merges or borrows, so this is reported rather than
    /// corrected. The final leaf of a fresh bulk load may already appear.
    pub fn underflowed_nodes(&self) -> Vec<NodeId> {
        let min_leaf = self.leaf_capacity.div_ceil(2) as usize;
        let min_children = self.internal_fanout.div_ceil(2) as usize;

        self.nodes
            .iter()
            .filter(|n| !n.is_root())
            .filter(|n| {
                let min = if n.is_leaf { min_leaf } else { min_children };
                n.occupancy() < min
            })
            .map(|n| n.self_id)
            .collect()
    }

    /// Snapshot of the shape for reporting.
    pub fn summary(&self) -> TreeSummary {
        TreeSummary {
            node_count: self.nodes.len(),
            height: self.height,
            internal_fanout: self.internal_fanout,
            leaf_capacity: self.leaf_capacity,
            entry_count: self.len(),
            root_keys: self.root_keys(),
        }
    }

    /// Check every structural invariant.
    ///
    /// Separator lists may be shorter than `children - 1` only when the
    /// uncovered trailing children are empty subtrees.
    ///
    /// # Errors
    /// Returns `Error::InvariantViolation` describing the first failure.
    pub fn validate(&self) -> Result<()> {
        if self.is_empty() {
            if !self.nodes.is_empty() || self.height != 0 {
                return Err(Error::invariant("rootless tree still holds nodes"));
            }
            return Ok(());
        }

        let count = self.nodes.len();
        if self.root_id as usize >= count {
            return Err(Error::invariant(format!("root {} out of range", self.root_id)));
        }
        if self.node(self.root_id).parent_id != NULL_NODE {
            return Err(Error::invariant("root has a parent"));
        }

        if let Some((idx, node)) = self
            .nodes
            .iter()
            .enumerate()
            .find(|(idx, n)| n.self_id as usize != *idx)
        {
            return Err(Error::invariant(format!("node {} records id {}", idx, node.self_id)));
        }

        // Must run before anything that descends: it is what rules out cycles.
        self.validate_reachability()?;

        for node in &self.nodes {
            if node.is_leaf {
                self.validate_leaf(node)?;
            } else {
                self.validate_internal(node)?;
            }
        }
        self.validate_chain()
    }

    fn validate_leaf(&self, node: &Node) -> Result<()> {
        if node.key_count as usize != node.entries.len() {
            return Err(Error::invariant(format!("leaf {} key_count mismatch", node.self_id)));
        }
        if node.entries.windows(2).any(|w| w[0].key > w[1].key) {
            return Err(Error::invariant(format!("leaf {} entries unsorted", node.self_id)));
        }
        Ok(())
    }

    fn validate_internal(&self, node: &Node) -> Result<()> {
        let id = node.self_id;
        if node.children.is_empty() {
            return Err(Error::invariant(format!("internal {} has no children", id)));
        }
        if node.key_count as usize != node.keys.len() || node.keys.len() >= node.children.len() {
            return Err(Error::invariant(format!(
                "internal {} has {} keys for {} children",
                id,
                node.keys.len(),
                node.children.len()
            )));
        }

        for (i, &child) in node.children.iter().enumerate() {
            if child as usize >= self.nodes.len() {
                return Err(Error::invariant(format!("internal {} child {} out of range", id, child)));
            }
            if self.node(child).parent_id != id {
                return Err(Error::invariant(format!("child {} does not point back to {}", child, id)));
            }
            if i == 0 {
                continue;
            }
            let min = self.min_key(child);
            match node.keys.get(i - 1) {
                Some(&sep) if min == Some(sep) => {}
                Some(&sep) => {
                    return Err(Error::invariant(format!(
                        "internal {} separator {} is {} but subtree minimum is {:?}",
                        id,
                        i - 1,
                        sep,
                        min
                    )));
                }
                None if min.is_some() => {
                    return Err(Error::invariant(format!(
                        "internal {} child {} is non-empty but has no separator",
                        id, child
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Every node is reached exactly once from the root, leaves at one depth.
    ///
    /// Stops at the first repeated node, so it terminates on cyclic links.
    fn validate_reachability(&self) -> Result<()> {
        let mut seen = vec![false; self.nodes.len()];
        let mut stack = vec![(self.root_id, 1u32)];

        while let Some((id, depth)) = stack.pop() {
            if id as usize >= self.nodes.len() {
                return Err(Error::invariant(format!("node {} out of range", id)));
            }
            if std::mem::replace(&mut seen[id as usize], true) {
                return Err(Error::invariant(format!("node {} reached twice", id)));
            }
            let node = self.node(id);
            if node.is_leaf {
                if depth != self.height {
                    return Err(Error::invariant(format!(
                        "leaf {} at depth {} but height is {}",
                        id, depth, self.height
                    )));
                }
            } else {
                stack.extend(node.children.iter().map(|&c| (c, depth + 1)));
            }
        }

        match seen.iter().position(|s| !s) {
            Some(orphan) => Err(Error::invariant(format!("node {} unreachable", orphan))),
            None => Ok(()),
        }
    }

    fn validate_chain(&self) -> Result<()> {
        let leaf_count = self.nodes.iter().filter(|n| n.is_leaf).count();
        let mut visited = 0;
        let mut last_key = f32::NEG_INFINITY;
        let mut id = self.first_leaf().unwrap_or(NULL_NODE);

        while id != NULL_NODE {
            if id as usize >= self.nodes.len() || visited == leaf_count {
                return Err(Error::invariant("leaf chain leaves the arena or cycles"));
            }
            let leaf = self.node(id);
            if !leaf.is_leaf {
                return Err(Error::invariant(format!("chain reaches internal node {}", id)));
            }
            for e in &leaf.entries {
                if e.key < last_key {
                    return Err(Error::invariant(format!("chain out of order at leaf {}", id)));
                }
                last_key = e.key;
            }
            visited += 1;
            id = leaf.next_leaf_id;
        }

        if visited != leaf_count {
            return Err(Error::invariant(format!(
                "chain visits {} of {} leaves",
                visited, leaf_count
            )));
        }
        Ok(())
    }
}

/// Iterator over leaf ids following `next_leaf_id`.
pub struct LeafChain<'a> {
    tree: &'a Tree,
    next: NodeId,
}

impl Iterator for LeafChain<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        if self.next == NULL_NODE {
            return None;
        }
        let id = self.next;
        self.next = self.tree.node(id).next_leaf_id;
        Some(id)
    }
}

/// Point-in-time description of a tree's shape.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeSummary {
    pub node_count: usize,
    pub height: u32,
    pub internal_fanout: u32,
    pub leaf_capacity: u32,
    pub entry_count: usize,
    pub root_keys: Vec<f32>,
}

impl fmt::Display for TreeSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tree {{ nodes: {}, levels: {}, fanout: {}, leaf_capacity: {}, entries: {}, root_keys: [",
            self.node_count, self.height, self.internal_fanout, self.leaf_capacity, self.entry_count
        )?;
        for (i, k) in self.root_keys.iter().take(10).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.4}", k)?;
        }
        if self.root_keys.len() > 10 {
            write!(f, ", ...")?;
        }
        write!(f, "] }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{BlockId, RecordId};

    #[test]
    fn test_capacities_from_block_size() {
        let caps = Capacities::from_block_size(4096);
        assert_eq!(caps.leaf_capacity(), (4096 - 15) / 12);
        assert_eq!(caps.internal_fanout(), (4096 - 15 - 4) / 8 + 1);
    }

    #[test]
    fn test_capacities_floor_for_tiny_budget() {
        let caps = Capacities::from_block_size(8);
        assert_eq!(caps.leaf_capacity(), 1);
        assert_eq!(caps.internal_fanout(), 2);

        let caps = Capacities::new(0, 0);
        assert_eq!(caps, Capacities::new(1, 2));
    }

    #[test]
    fn test_capacities_clamped_to_key_count_width() {
        let caps = Capacities::from_block_size(16 * 1024 * 1024);
        assert_eq!(caps.leaf_capacity(), u16::MAX as u32);
        assert_eq!(caps.internal_fanout(), u16::MAX as u32 + 1);
    }

    #[test]
    fn test_empty_tree() {
        let tree = Tree::empty(Capacities::from_block_size(4096));
        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 0);
        assert_eq!(tree.root_id(), NULL_NODE);
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.first_leaf(), None);
        assert_eq!(tree.leaf_chain().count(), 0);
        assert!(tree.root_keys().is_empty());
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_validate_catches_rootless_nodes() {
        let mut tree = Tree::empty(Capacities::new(2, 3));
        tree.new_node(true);
        assert!(matches!(tree.validate(), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_validate_terminates_on_first_child_cycle() {
        let pairs = (0..27).map(|i| (i as f32, RecordId::new(BlockId::new(0), i)));
        let mut tree = Tree::build_with_capacities(pairs, Capacities::new(3, 3));
        assert_eq!(tree.height(), 3);

        // root -> mid -> root along first children
        let root = tree.root_id();
        let mid = tree.node(root).children[0];
        tree.node_mut(mid).children[0] = root;

        assert!(matches!(
            tree.validate(),
            Err(Error::InvariantViolation(msg)) if msg.contains("reached twice")
        ));
    }

    #[test]
    fn test_validate_rejects_child_outside_arena() {
        let pairs = (0..6).map(|i| (i as f32, RecordId::new(BlockId::new(0), i)));
        let mut tree = Tree::build_with_capacities(pairs, Capacities::new(2, 4));
        let root = tree.root_id();
        tree.node_mut(root).children[1] = 99;

        assert!(matches!(tree.validate(), Err(Error::InvariantViolation(_))));
    }

    #[test]
    fn test_summary_display_truncates_root_keys() {
        let summary = TreeSummary {
            node_count: 20,
            height: 2,
            internal_fanout: 20,
            leaf_capacity: 4,
            entry_count: 70,
            root_keys: (0..12).map(|i| i as f32 / 10.0).collect(),
        };
        let display = format!("{}", summary);
        assert!(display.contains("levels: 2"));
        assert!(display.contains("0.9000, ..."));
        assert!(!display.contains("1.1000"));
    }
}
