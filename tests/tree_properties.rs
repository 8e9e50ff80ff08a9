//! Property tests for bulk load, persistence, and threshold deletion.

use blocktree::{BlockId, Capacities, RecordId, Tree};
use proptest::prelude::*;

/// Keys from a small grid so duplicates are common.
fn pairs_strategy() -> impl Strategy<Value = Vec<(f32, RecordId)>> {
    prop::collection::vec(0u32..200, 0..400).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, k)| {
                let rid = RecordId::new(BlockId::new(i as u32 / 8), i as u32 % 8);
                (k as f32 / 200.0, rid)
            })
            .collect()
    })
}

fn caps_strategy() -> impl Strategy<Value = Capacities> {
    (1u32..9, 2u32..7).prop_map(|(leaf, fanout)| Capacities::new(leaf, fanout))
}

/// Expected order: stable sort of the input by key.
fn sorted(pairs: &[(f32, RecordId)]) -> Vec<(f32, RecordId)> {
    let mut out = pairs.to_vec();
    out.sort_by(|a, b| a.0.total_cmp(&b.0));
    out
}

fn chain(tree: &Tree) -> Vec<(f32, RecordId)> {
    tree.entries().map(|e| (e.key, e.rid)).collect()
}

proptest! {
    #[test]
    fn prop_build_satisfies_invariants(pairs in pairs_strategy(), caps in caps_strategy()) {
        let tree = Tree::build_with_capacities(pairs.clone(), caps);

        prop_assert!(tree.validate().is_ok(), "{:?}", tree.validate());
        prop_assert_eq!(chain(&tree), sorted(&pairs));

        let leaves = pairs.len().div_ceil(caps.leaf_capacity() as usize);
        prop_assert_eq!(tree.leaf_chain().count(), leaves);
    }

    #[test]
    fn prop_separators_are_subtree_minima(pairs in pairs_strategy(), caps in caps_strategy()) {
        let tree = Tree::build_with_capacities(pairs, caps);

        for node in tree.nodes().iter().filter(|n| !n.is_leaf) {
            prop_assert_eq!(node.keys.len() + 1, node.children.len());
            for (i, &key) in node.keys.iter().enumerate() {
                // Independent check: scan every leaf under the child.
                let mut stack = vec![node.children[i + 1]];
                let mut min = f32::INFINITY;
                while let Some(id) = stack.pop() {
                    let n = tree.node(id);
                    if n.is_leaf {
                        for e in &n.entries {
                            min = min.min(e.key);
                        }
                    } else {
                        stack.extend(&n.children);
                    }
                }
                prop_assert_eq!(key, min);
            }
        }
    }

    #[test]
    fn prop_codec_roundtrip(pairs in pairs_strategy(), caps in caps_strategy()) {
        let tree = Tree::build_with_capacities(pairs, caps);
        let decoded = Tree::decode(&tree.encode()).unwrap();
        prop_assert_eq!(decoded, tree);
    }

    #[test]
    fn prop_delete_keeps_exactly_the_rest(
        pairs in pairs_strategy(),
        caps in caps_strategy(),
        threshold in 0u32..210,
    ) {
        let threshold = threshold as f32 / 200.0;
        let mut tree = Tree::build_with_capacities(pairs.clone(), caps);
        let nodes_before = tree.node_count();

        let stats = tree.delete_where_greater_than(threshold);

        let expected: Vec<(f32, RecordId)> =
            sorted(&pairs).into_iter().filter(|(k, _)| *k <= threshold).collect();
        prop_assert_eq!(chain(&tree), expected.clone());
        prop_assert_eq!(stats.entries_deleted as usize, pairs.len() - expected.len());
        prop_assert_eq!(tree.node_count(), nodes_before);
        prop_assert!(tree.validate().is_ok(), "{:?}", tree.validate());

        let again = tree.delete_where_greater_than(threshold);
        prop_assert_eq!(again.entries_deleted, 0);
    }

    #[test]
    fn prop_codec_roundtrip_after_delete(
        pairs in pairs_strategy(),
        caps in caps_strategy(),
        threshold in 0u32..200,
    ) {
        let mut tree = Tree::build_with_capacities(pairs, caps);
        tree.delete_where_greater_than(threshold as f32 / 200.0);

        let decoded = Tree::decode(&tree.encode()).unwrap();
        prop_assert_eq!(decoded, tree);
    }
}
