//! Binary persistence for [`Tree`].
//!
//! # Stream Layout
//! All integers little-endian; keys are raw IEEE-754 bits so they
//! round-trip exactly.
//! ```text
//! Header (20 bytes)
//!   internal_fanout u32 | leaf_capacity u32 | root_id u32 | height u32 | node_count u32
//! Per node, in arena order
//!   is_leaf u8 | key_count u16 | parent_id u32 | next_leaf_id u32
//!   child_len u32 | child_id u32 × child_len
//!   key_len u32   | key f32 × key_len
//!   entry_len u32 | (key f32, block_id u32, slot u32) × entry_len
//! Trailer
//!   crc32 u32 over every preceding byte
//! ```
//! A node's `self_id` is its position and is not stored. The format has no
//! version field; any layout change is breaking.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use tracing::{debug, info};

use crate::common::wire::{put_u32, seal, unseal, Decoder, TRAILER_SIZE};
use crate::common::{BlockId, Error, RecordId, Result};

use super::node::{LeafEntry, Node, NodeId, NULL_NODE};
use super::tree::{Capacities, Tree};

const HEADER_SIZE: usize = 5 * 4;
const NODE_FIXED_SIZE: usize = 1 + 2 + 4 + 4 + 3 * 4;
const ENTRY_SIZE: usize = 4 + 4 + 4;

impl Tree {
    /// Write the tree to `path`, replacing any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::new(file);
        self.write_to(&mut writer)?;
        writer.flush()?;
        info!(path = %path.as_ref().display(), nodes = self.nodes.len(), "saved index");
        Ok(())
    }

    /// Read a tree previously written by [`Tree::save`].
    ///
    /// # Errors
    /// `Error::Io` if the file cannot be read, `Error::CorruptFormat` if its
    /// contents are not a complete, consistent tree.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Tree> {
        let file = File::open(path.as_ref())?;
        let tree = Self::read_from(BufReader::new(file))?;
        info!(path = %path.as_ref().display(), nodes = tree.nodes.len(), "loaded index");
        Ok(tree)
    }

    /// Serialize into any writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.encode())?;
        Ok(())
    }

    /// Deserialize from any reader, consuming it to the end.
    pub fn read_from<R: Read>(mut reader: R) -> Result<Tree> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::decode(&bytes)
    }

    /// Serialize into a fresh buffer.
    pub fn encode(&self) -> Vec<u8> {
        let body: usize = self
            .nodes
            .iter()
            .map(|n| {
                NODE_FIXED_SIZE + 4 * n.children.len() + 4 * n.keys.len() + ENTRY_SIZE * n.entries.len()
            })
            .sum();
        let mut buf = Vec::with_capacity(HEADER_SIZE + body + TRAILER_SIZE);

        put_u32(&mut buf, self.internal_fanout);
        put_u32(&mut buf, self.leaf_capacity);
        put_u32(&mut buf, self.root_id);
        put_u32(&mut buf, self.height);
        put_u32(&mut buf, self.nodes.len() as u32);

        for node in &self.nodes {
            buf.push(node.is_leaf as u8);
            buf.extend_from_slice(&node.key_count.to_le_bytes());
            put_u32(&mut buf, node.parent_id);
            put_u32(&mut buf, node.next_leaf_id);

            put_u32(&mut buf, node.children.len() as u32);
            for &child in &node.children {
                put_u32(&mut buf, child);
            }

            put_u32(&mut buf, node.keys.len() as u32);
            for &key in &node.keys {
                put_u32(&mut buf, key.to_bits());
            }

            put_u32(&mut buf, node.entries.len() as u32);
            for entry in &node.entries {
                put_u32(&mut buf, entry.key.to_bits());
                put_u32(&mut buf, entry.rid.block_id.0);
                put_u32(&mut buf, entry.rid.slot);
            }
        }

        seal(&mut buf);
        buf
    }

    /// Deserialize a complete buffer.
    ///
    /// Nothing is returned unless the whole buffer checks out: checksum,
    /// counts, id ranges, and then every structural invariant, so a loaded
    /// tree is always safe to delete from.
    pub fn decode(bytes: &[u8]) -> Result<Tree> {
        let body = unseal(bytes, HEADER_SIZE)?;

        let mut dec = Decoder::new(body);
        let internal_fanout = dec.u32()?;
        let leaf_capacity = dec.u32()?;
        let caps = Capacities::new(leaf_capacity, internal_fanout);
        if caps.leaf_capacity() != leaf_capacity || caps.internal_fanout() != internal_fanout {
            return Err(Error::corrupt(format!(
                "capacities out of range: leaf {}, fanout {}",
                leaf_capacity, internal_fanout
            )));
        }
        let root_id = dec.u32()?;
        let height = dec.u32()?;
        let node_count = dec.count(NODE_FIXED_SIZE)?;

        let mut nodes = Vec::with_capacity(node_count);
        for id in 0..node_count {
            nodes.push(read_node(&mut dec, id as NodeId)?);
        }
        dec.finish()?;

        let tree = Tree {
            internal_fanout,
            leaf_capacity,
            nodes,
            root_id,
            height,
        };
        tree.check_ids()?;
        tree.validate()
            .map_err(|e| Error::corrupt(format!("inconsistent structure: {}", e)))?;

        debug!(nodes = node_count, height, "decoded index");
        Ok(tree)
    }

    /// Reject ids that would index outside the arena.
    fn check_ids(&self) -> Result<()> {
        let count = self.nodes.len();
        let in_range = |id: NodeId| (id as usize) < count;
        let link_ok = |id: NodeId| id == NULL_NODE || in_range(id);

        if count == 0 {
            if self.root_id != NULL_NODE {
                return Err(Error::corrupt("empty arena with a root"));
            }
            return Ok(());
        }
        if !in_range(self.root_id) {
            return Err(Error::corrupt(format!("root id {} out of range", self.root_id)));
        }

        for node in &self.nodes {
            if !link_ok(node.parent_id) || !link_ok(node.next_leaf_id) {
                return Err(Error::corrupt(format!("node {} links out of range", node.self_id)));
            }
            if let Some(&bad) = node.children.iter().find(|&&c| !in_range(c)) {
                return Err(Error::corrupt(format!(
                    "node {} child {} out of range",
                    node.self_id, bad
                )));
            }
        }
        Ok(())
    }
}

fn read_node(dec: &mut Decoder<'_>, self_id: NodeId) -> Result<Node> {
    let is_leaf = match dec.u8()? {
        0 => false,
        1 => true,
        other => {
            return Err(Error::corrupt(format!(
                "node {} has is_leaf byte {}",
                self_id, other
            )))
        }
    };
    let key_count = dec.u16()?;
    let parent_id = dec.u32()?;
    let next_leaf_id = dec.u32()?;

    let n = dec.count(4)?;
    let children = (0..n).map(|_| dec.u32()).collect::<Result<Vec<_>>>()?;

    let n = dec.count(4)?;
    let keys = (0..n).map(|_| dec.f32()).collect::<Result<Vec<_>>>()?;

    let n = dec.count(ENTRY_SIZE)?;
    let entries = (0..n)
        .map(|_| -> Result<LeafEntry> {
            let key = dec.f32()?;
            let block_id = BlockId::new(dec.u32()?);
            let slot = dec.u32()?;
            Ok(LeafEntry::new(key, RecordId::new(block_id, slot)))
        })
        .collect::<Result<Vec<_>>>()?;

    if keys.iter().chain(entries.iter().map(|e| &e.key)).any(|k| k.is_nan()) {
        return Err(Error::corrupt(format!("node {} holds a NaN key", self_id)));
    }

    let held = if is_leaf { entries.len() } else { keys.len() };
    if key_count as usize != held {
        return Err(Error::corrupt(format!(
            "node {} declares key_count {} but holds {}",
            self_id, key_count, held
        )));
    }

    Ok(Node {
        is_leaf,
        key_count,
        self_id,
        parent_id,
        next_leaf_id,
        children,
        keys,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    fn sample_tree() -> Tree {
        let pairs: Vec<(f32, RecordId)> = (0..40)
            .map(|i| ((i % 13) as f32 / 13.0, RecordId::new(BlockId::new(i / 5), i % 5)))
            .collect();
        Tree::build_with_capacities(pairs, Capacities::new(3, 4))
    }

    #[test]
    fn test_roundtrip_in_memory() {
        let tree = sample_tree();
        let decoded = Tree::decode(&tree.encode()).unwrap();
        assert_eq!(decoded, tree);
    }

    #[test]
    fn test_roundtrip_through_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.bin");

        let tree = sample_tree();
        tree.save(&path).unwrap();
        let loaded = Tree::load(&path).unwrap();

        assert_eq!(loaded, tree);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn test_roundtrip_empty_tree() {
        let tree = Tree::empty(Capacities::from_block_size(4096));
        let bytes = tree.encode();
        assert_eq!(bytes.len(), HEADER_SIZE + TRAILER_SIZE);

        let decoded = Tree::read_from(Cursor::new(bytes)).unwrap();
        assert_eq!(decoded, tree);
        assert!(decoded.is_empty());
    }

    #[test]
    fn test_keys_keep_exact_bits() {
        let key = f32::from_bits(0x3f7f_ffff); // just below 1.0
        let rid = RecordId::new(BlockId::new(0), 0);
        let tree = Tree::build_with_capacities(vec![(key, rid)], Capacities::new(1, 2));

        let decoded = Tree::decode(&tree.encode()).unwrap();
        assert_eq!(decoded.root_keys()[0].to_bits(), 0x3f7f_ffff);
    }

    #[test]
    fn test_header_byte_layout() {
        let tree = sample_tree();
        let bytes = tree.encode();

        assert_eq!(&bytes[0..4], &4u32.to_le_bytes());
        assert_eq!(&bytes[4..8], &3u32.to_le_bytes());
        assert_eq!(&bytes[8..12], &tree.root_id().to_le_bytes());
        assert_eq!(&bytes[12..16], &tree.height().to_le_bytes());
        assert_eq!(&bytes[16..20], &(tree.node_count() as u32).to_le_bytes());
    }

    #[test]
    fn test_truncated_stream_is_corrupt() {
        let bytes = sample_tree().encode();
        for cut in [0, 3, HEADER_SIZE, bytes.len() / 2, bytes.len() - 1] {
            assert!(
                matches!(Tree::decode(&bytes[..cut]), Err(Error::CorruptFormat(_))),
                "cut at {}",
                cut
            );
        }
    }

    #[test]
    fn test_flipped_byte_is_corrupt() {
        let mut bytes = sample_tree().encode();
        bytes[30] ^= 0x01;
        assert!(matches!(Tree::decode(&bytes), Err(Error::CorruptFormat(_))));
    }

    #[test]
    fn test_inflated_node_count_is_corrupt() {
        let mut bytes = sample_tree().encode();
        bytes.truncate(bytes.len() - TRAILER_SIZE);
        bytes[16..20].copy_from_slice(&10_000u32.to_le_bytes());
        seal(&mut bytes);

        assert!(matches!(Tree::decode(&bytes), Err(Error::CorruptFormat(_))));
    }

    #[test]
    fn test_root_out_of_range_is_corrupt() {
        let mut bytes = sample_tree().encode();
        bytes.truncate(bytes.len() - TRAILER_SIZE);
        bytes[8..12].copy_from_slice(&9_999u32.to_le_bytes());
        seal(&mut bytes);

        assert!(matches!(Tree::decode(&bytes), Err(Error::CorruptFormat(_))));
    }

    #[test]
    fn test_trailing_garbage_is_corrupt() {
        let mut bytes = sample_tree().encode();
        bytes.truncate(bytes.len() - TRAILER_SIZE);
        bytes.extend_from_slice(&[0xAA, 0xBB]);
        seal(&mut bytes);

        assert!(matches!(Tree::decode(&bytes), Err(Error::CorruptFormat(_))));
    }

    /// Re-encode a damaged tree; `encode` writes a valid checksum, so only
    /// the structural checks stand between it and a successful load.
    fn decode_damaged(damage: impl FnOnce(&mut Tree)) -> Result<Tree> {
        let mut tree = sample_tree();
        damage(&mut tree);
        Tree::decode(&tree.encode())
    }

    fn corrupt_mentioning(result: Result<Tree>, needle: &str) -> bool {
        matches!(result, Err(Error::CorruptFormat(msg)) if msg.contains(needle))
    }

    #[test]
    fn test_leaf_key_count_mismatch_is_corrupt() {
        let result = decode_damaged(|t| {
            assert_eq!(t.nodes[0].entries.len(), 3);
            t.nodes[0].key_count = 999;
        });
        assert!(corrupt_mentioning(result, "key_count 999"));
    }

    #[test]
    fn test_internal_key_count_mismatch_is_corrupt() {
        let result = decode_damaged(|t| {
            let root = t.root_id as usize;
            t.nodes[root].key_count += 1;
        });
        assert!(corrupt_mentioning(result, "key_count"));
    }

    #[test]
    fn test_root_listing_itself_as_child_is_corrupt() {
        let result = decode_damaged(|t| {
            let root = t.root_id;
            t.nodes[root as usize].children[0] = root;
        });
        assert!(corrupt_mentioning(result, "reached twice"));
    }

    #[test]
    fn test_child_linking_back_to_ancestor_is_corrupt() {
        // The cycle sits on a first-child path, which a leftmost descent
        // would follow forever.
        let result = decode_damaged(|t| {
            let root = t.root_id;
            let mid = t.nodes[root as usize].children[1];
            t.nodes[mid as usize].children[0] = root;
        });
        assert!(corrupt_mentioning(result, "reached twice"));
    }

    #[test]
    fn test_shared_child_is_corrupt() {
        let result = decode_damaged(|t| {
            let root = t.root_id as usize;
            let first = t.nodes[root].children[0];
            t.nodes[root].children[1] = first;
        });
        assert!(corrupt_mentioning(result, "reached twice"));
    }

    #[test]
    fn test_internal_without_children_is_corrupt() {
        let result = decode_damaged(|t| {
            let root = t.root_id as usize;
            t.nodes[root].children.clear();
            t.nodes[root].keys.clear();
            t.nodes[root].sync_key_count();
        });
        assert!(matches!(result, Err(Error::CorruptFormat(_))));
    }

    #[test]
    fn test_separator_per_child_is_corrupt() {
        let result = decode_damaged(|t| {
            let root = t.root_id as usize;
            let node = &mut t.nodes[root];
            while node.keys.len() < node.children.len() {
                node.keys.push(1.0);
            }
            node.sync_key_count();
        });
        assert!(corrupt_mentioning(result, "keys for"));
    }

    #[test]
    fn test_zero_leaf_capacity_is_corrupt() {
        let result = decode_damaged(|t| t.leaf_capacity = 0);
        assert!(corrupt_mentioning(result, "capacities"));
    }

    #[test]
    fn test_nan_key_is_corrupt() {
        let result = decode_damaged(|t| {
            let last = t.nodes.iter().rposition(|n| n.is_leaf).unwrap();
            t.nodes[last].entries[0].key = f32::NAN;
        });
        assert!(corrupt_mentioning(result, "NaN"));
    }

    #[test]
    fn test_tree_that_loads_can_be_deleted_from() {
        let mut loaded = Tree::decode(&sample_tree().encode()).unwrap();
        let stats = loaded.delete_where_greater_than(0.5);
        assert!(stats.entries_deleted > 0);
        assert!(loaded.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempdir().unwrap();
        let result = Tree::load(dir.path().join("missing.bin"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
