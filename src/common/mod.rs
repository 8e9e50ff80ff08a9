//! Common types and utilities shared across blocktree.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration constants
//! - Error types
//! - Identifiers (BlockId, RecordId)
//! - Little-endian framing for persisted files

mod block_id;
pub mod config;
pub mod error;
mod record_id;
pub(crate) mod wire;

pub use block_id::BlockId;
pub use error::{Error, Result};
pub use record_id::RecordId;
