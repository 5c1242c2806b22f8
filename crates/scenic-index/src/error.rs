//! Error types for scenic-index.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::ItemId;

/// Result type alias for scenic-index operations.
pub type IndexResult<T> = Result<T, IndexError>;

/// Errors that can occur in scenic-index operations.
#[derive(Debug, Error)]
pub enum IndexError {
    // ========================================================================
    // State machine errors
    // ========================================================================
    /// The index was already finalized with `build()`.
    ///
    /// Inserting or building again after `build()` is a caller bug; the
    /// index must be rebuilt from scratch to change its contents.
    #[error("Index is already built. Insertions and rebuilds are not supported; create a fresh index and re-add all items.")]
    AlreadyBuilt,

    /// The index has not been finalized with `build()` yet.
    #[error("Index has not been built. Call build() after inserting all items before querying or saving.")]
    NotBuilt,

    // ========================================================================
    // Input validation errors
    // ========================================================================
    /// Vector length does not match the dimension fixed by the first insert.
    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An item with this identifier was already inserted.
    #[error("Duplicate item id {0}")]
    DuplicateId(ItemId),

    /// The forest needs at least one tree.
    #[error("Invalid tree count {0}: the forest needs at least one tree")]
    InvalidTreeCount(usize),

    // ========================================================================
    // Snapshot errors
    // ========================================================================
    /// No snapshot file at the given location.
    #[error("Index snapshot not found at {path}")]
    SnapshotNotFound { path: PathBuf },

    /// Snapshot was written by an incompatible version of this crate.
    #[error("Index snapshot version mismatch: found {found}, expected {expected}. Re-run indexing to rebuild the snapshot.")]
    SnapshotVersion { found: u32, expected: u32 },

    /// Snapshot I/O error.
    #[error("Index snapshot I/O error at {path}: {message}")]
    SnapshotIo { path: PathBuf, message: String },

    /// Snapshot decode/encode error.
    #[error("Index snapshot parse error at {path}: {message}")]
    SnapshotParse { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    /// Create a snapshot I/O error.
    pub fn snapshot_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SnapshotIo {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a snapshot parse error.
    pub fn snapshot_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SnapshotParse {
            path: path.into(),
            message: message.into(),
        }
    }
}
