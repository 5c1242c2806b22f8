//! Error types for scenic-model.
//!
//! This module provides structured error types with actionable guidance.
//! Errors clearly explain:
//! - What went wrong
//! - Where backbone checkpoints are expected
//! - How to fix the issue

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for scenic-model operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors that can occur in scenic-model operations.
#[derive(Debug, Error)]
pub enum ModelError {
    // ========================================================================
    // Checkpoint discovery errors
    // ========================================================================
    /// No models directory found in any search location.
    #[error("{}", format_models_dir_not_found(.searched))]
    ModelsDirectoryNotFound { searched: Vec<PathBuf> },

    /// Backbone checkpoint not found at the expected location.
    #[error("{}", format_model_not_found(.backbone, .path))]
    ModelNotFound { backbone: String, path: PathBuf },

    // ========================================================================
    // Checkpoint loading errors
    // ========================================================================
    /// Failed to load the backbone checkpoint.
    ///
    /// Covers unreadable/corrupt safetensors files and parameter-shape
    /// mismatches between the checkpoint and the requested architecture.
    /// Fatal at startup; there is nothing to retry.
    #[error("Failed to load backbone '{backbone}': {message}")]
    ModelLoad { backbone: String, message: String },

    /// Embedding configuration is invalid.
    #[error("Invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    // ========================================================================
    // Inference errors
    // ========================================================================
    /// Input image could not be decoded or converted to RGB.
    #[error("Failed to decode image {path}: {message}")]
    ImageDecode { path: PathBuf, message: String },

    /// Embedding generation failed.
    #[error("Embedding failed for backbone '{backbone}': {message}")]
    EmbeddingFailed { backbone: String, message: String },

    /// A tensor operation failed inside the preprocessing pipeline.
    #[cfg(feature = "embedded")]
    #[error("Tensor operation failed: {message}")]
    Tensor { message: String },

    // ========================================================================
    // Backend errors
    // ========================================================================
    /// No inference backend compiled in.
    #[error("Inference backend not available: {reason}")]
    BackendUnavailable { reason: String },

    /// Compute device not available.
    #[error("Compute device not available: {reason}\n\nScenic tried to use GPU acceleration but it is not available.\nSet device preference to 'cpu' in ~/.scenic/config.yaml to use CPU-only inference.")]
    DeviceNotAvailable { reason: String },

    // ========================================================================
    // I/O errors
    // ========================================================================
    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Error message formatters
// ============================================================================

fn format_models_dir_not_found(searched: &[PathBuf]) -> String {
    let list = searched
        .iter()
        .enumerate()
        .map(|(i, p)| format!("  {}. {}", i + 1, p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "Models directory not found.\n\n\
        Scenic searched these locations:\n\
        {list}\n\n\
        Backbone checkpoints are distributed separately. To fix:\n\
        1. Set $SCENIC_MODELS_DIR to your models directory, OR\n\
        2. Copy checkpoints to ~/.scenic/models/, OR\n\
        3. Ensure models/ exists next to the scenic binary."
    )
}

fn format_model_not_found(backbone: &str, path: &std::path::Path) -> String {
    format!(
        "Backbone checkpoint not found: {backbone}\n\n\
        Expected at: {}\n\n\
        Place a safetensors checkpoint for this architecture under\n\
        backbones/ in the models directory, or point the embedding\n\
        configuration's weights path at the file directly.",
        path.display()
    )
}

// ============================================================================
// Conversions
// ============================================================================

#[cfg(feature = "embedded")]
impl From<candle_core::Error> for ModelError {
    fn from(err: candle_core::Error) -> Self {
        Self::Tensor {
            message: err.to_string(),
        }
    }
}

// ============================================================================
// Error constructors
// ============================================================================

impl ModelError {
    /// Create a model load error.
    pub fn model_load(backbone: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ModelLoad {
            backbone: backbone.into(),
            message: message.into(),
        }
    }

    /// Create an embedding failed error.
    pub fn embedding_failed(backbone: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EmbeddingFailed {
            backbone: backbone.into(),
            message: message.into(),
        }
    }

    /// Create an image decode error.
    pub fn image_decode(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ImageDecode {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create an invalid-config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}
