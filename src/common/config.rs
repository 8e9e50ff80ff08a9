//! Configuration constants for blocktree.

/// Default byte budget of a block (4KB).
///
/// The same budget sizes both the record blocks of the store and the nodes
/// of the B+ tree, so one index node corresponds to one block on disk.
pub const BLOCK_SIZE: usize = 4096;

/// Size in bytes of a packed node header.
///
/// # Layout (15 bytes)
/// ```text
/// Offset  Size  Field
/// ------  ----  -----
/// 0       1     is_leaf
/// 1       2     key_count
/// 3       4     self_id
/// 7       4     parent_id
/// 11      4     next_leaf_id
/// ```
pub const NODE_HEADER_SIZE: usize = 1 + 2 + 4 + 4 + 4;

/// Size of one separator key (`f32`).
pub const KEY_SIZE: usize = 4;

/// Size of one child pointer (`NodeId`).
pub const POINTER_SIZE: usize = 4;

/// Size of one leaf entry: key + block id + slot.
pub const LEAF_ENTRY_SIZE: usize = KEY_SIZE + 4 + 4;

/// Fixed width of the game date field inside an encoded record.
pub const DATE_FIELD_SIZE: usize = 10;

/// Encoded size of one record: the date plus eight 4-byte numeric fields.
pub const RECORD_SIZE: usize = DATE_FIELD_SIZE + 8 * 4;
