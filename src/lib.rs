//! blocktree - a block-packed record store indexed by a bulk-loaded B+ tree.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           blocktree                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │          Instrumentation (instrument/)                   │   │
//! │  │     indexed deletion  ←─ compare ─→  linear scan         │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Index Layer (index/btree/)                  │   │
//! │  │   bulk load → node arena ⇄ codec → threshold delete      │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │              Storage Layer (storage/)                    │   │
//! │  │        BlockStore + Block + Record (text in ⇄ codec)     │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (BlockId, RecordId, Error, config)
//! - [`storage`] - Records packed into fixed-budget blocks
//! - [`index`] - The B+ tree index
//! - [`instrument`] - Cost comparison against a full scan
//!
//! # Quick Start
//! ```
//! use blocktree::{BlockStore, Tree, BLOCK_SIZE};
//! use std::io::Cursor;
//!
//! let input = "header\n\
//!              2022-12-22\t1\t110\t0.45\t0.95\t0.35\t24\t44\t1\n\
//!              2022-12-23\t2\t101\t0.41\t0.72\t0.33\t20\t40\t0\n";
//!
//! let mut store = BlockStore::new(BLOCK_SIZE).unwrap();
//! store.load_delimited(Cursor::new(input)).unwrap();
//!
//! let mut tree = Tree::build_from_store(&store);
//! let stats = tree.delete_where_greater_than(0.9);
//! assert_eq!(stats.entries_deleted, 1);
//! ```

pub mod common;
pub mod index;
pub mod instrument;
pub mod storage;

// Re-export commonly used items at crate root for convenience
pub use common::config::BLOCK_SIZE;
pub use common::{BlockId, Error, RecordId, Result};

pub use index::btree::{Capacities, DeletionStats, LeafEntry, Node, NodeId, Tree, NULL_NODE};
pub use instrument::{compare_delete, linear_scan, Comparison, ScanStats};
pub use storage::{Block, BlockStore, Record};
