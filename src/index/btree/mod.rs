//! Bulk-loaded B+ tree index.
//!
//! # Components
//! - [`Tree`] - The node arena plus root, height, and capacities
//! - [`Node`] / [`LeafEntry`] - Arena contents, linked by [`NodeId`]
//! - [`Capacities`] - Leaf capacity and fanout derived from a byte budget
//! - [`DeletionStats`] - What a threshold deletion touched
//!
//! Building, persistence, and deletion are implemented as `impl Tree`
//! blocks in their own files.

mod builder;
mod codec;
mod delete;
mod node;
mod tree;

pub use builder::extract_pairs;
pub use delete::DeletionStats;
pub use node::{LeafEntry, Node, NodeId, NULL_NODE};
pub use tree::{Capacities, LeafChain, Tree, TreeSummary};
