//! Storage layer - records packed into fixed-budget blocks.
//!
//! This module holds the data the index points into:
//! - [`Record`] - One parsed input row
//! - [`Block`] - A byte-budgeted container of whole records
//! - [`BlockStore`] - The ordered collection of blocks, with binary save/load

mod block;
mod block_store;
mod codec;
mod record;

pub use block::Block;
pub use block_store::BlockStore;
pub use record::Record;
