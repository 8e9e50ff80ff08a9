//! Error types for blocktree.

use thiserror::Error;

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All recoverable errors in blocktree.
///
/// Bulk loading and deletion do not fail on valid input. An out-of-range
/// node id inside those algorithms is a broken invariant and panics instead
/// of surfacing here.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted tree or data file is truncated, fails its checksum, or
    /// declares counts, ids, or links that disagree with its contents.
    #[error("Corrupt file format: {0}")]
    CorruptFormat(String),

    /// The block budget cannot hold a single record.
    #[error("Invalid block size: {0} bytes")]
    InvalidBlockSize(usize),

    /// A delimited input line could not be parsed.
    #[error("Parse error on line {line}: {reason}")]
    Parse { line: usize, reason: String },

    /// A structural invariant check failed.
    ///
    /// Only returned by diagnostics such as `Tree::validate`.
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

impl Error {
    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Error::CorruptFormat(msg.into())
    }

    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Error::InvariantViolation(msg.into())
    }
}
