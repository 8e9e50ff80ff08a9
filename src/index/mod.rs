//! Index structures over the block store.

pub mod btree;
