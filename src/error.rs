//! Crate-wide error type.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the index.
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors raised while building or querying an index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// Underlying file operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Tree degree outside the accepted range.
    #[error("invalid degree {0}: must be a positive integer (0 selects the optimal degree)")]
    InvalidDegree(i64),
    /// Key length outside 1..=31.
    #[error("invalid key length {0}: must be between 1 and 31 (inclusive)")]
    InvalidKeyLength(i64),
    /// A literal that cannot be packed into a key.
    #[error("invalid key: {0}")]
    InvalidKey(String),
    /// On-disk bytes disagree with the expected layout.
    #[error("corruption detected: {0}")]
    Corruption(String),
    /// Mutation attempted on a tree opened with [`BTree::open_read_only`].
    ///
    /// [`BTree::open_read_only`]: crate::btree::BTree::open_read_only
    #[error("{} is open read-only", .0.display())]
    ReadOnly(PathBuf),
}

impl IndexError {
    /// Returns true when the error reports a missing file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, IndexError::Io(err) if err.kind() == io::ErrorKind::NotFound)
    }

    pub(crate) fn corruption(msg: impl Into<String>) -> Self {
        IndexError::Corruption(msg.into())
    }
}
