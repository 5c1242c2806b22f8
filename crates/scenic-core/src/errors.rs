//! Error types for scenic-core.

use std::path::PathBuf;

use thiserror::Error;

use scenic_index::IndexError;
use scenic_model::ModelError;

/// Domain-specific errors for Scenic operations.
#[derive(Error, Debug)]
pub enum ScenicError {
    /// The corpus directory does not exist.
    #[error("Corpus directory not found: {0}")]
    CorpusNotFound(PathBuf),

    /// The corpus directory contains no images.
    #[error("No images found under {path}. Expected photos grouped in per-scene directories (e.g. abbey/0001.jpg).")]
    EmptyCorpus { path: PathBuf },

    /// No built index at the given location.
    #[error("No index found at {path}. Run `scenic index <CORPUS>` first.")]
    IndexNotFound { path: PathBuf },

    /// The active embedder differs from the one the index was built with.
    ///
    /// Distances between vectors from different extractor configurations are
    /// meaningless, so this is a hard error rather than a warning.
    #[error("Embedding model mismatch: index was built with {indexed}, active configuration is {active}. Re-run `scenic index` or adjust the embedding configuration.")]
    ModelMismatch { indexed: String, active: String },

    /// A configuration value is invalid.
    #[error("Invalid configuration: {message}. {hint}")]
    InvalidConfiguration {
        /// Description of the invalid configuration.
        message: String,
        /// Actionable hint on how to fix it.
        hint: String,
    },

    /// The query image path does not point at a file.
    #[error("Query image not found: {0}")]
    QueryNotFound(PathBuf),

    /// Manifest I/O error.
    #[error("Manifest I/O error at {path}: {message}")]
    ManifestIo { path: PathBuf, message: String },

    /// Manifest parse error.
    #[error("Manifest parse error at {path}: {message}")]
    ManifestParse { path: PathBuf, message: String },

    /// A corpus side-car file (locations.json) could not be parsed.
    #[error("Corpus side-car parse error at {path}: {message}")]
    SidecarParse { path: PathBuf, message: String },

    /// Embedding layer error (decode failures, model loading, inference).
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Vector index error (state machine, dimensions, snapshots).
    #[error(transparent)]
    Index(#[from] IndexError),

    /// IO error wrapper.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ScenicError {
    /// Create an invalid-configuration error with a remediation hint.
    pub fn invalid_configuration(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self::InvalidConfiguration {
            message: message.into(),
            hint: hint.into(),
        }
    }

    /// Create a manifest I/O error.
    pub fn manifest_io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ManifestIo {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a manifest parse error.
    pub fn manifest_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ManifestParse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a side-car parse error.
    pub fn sidecar_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::SidecarParse {
            path: path.into(),
            message: message.into(),
        }
    }
}
