//! # scenic-model
//!
//! ML inference layer for Scenic - image preprocessing and CNN embeddings.
//!
//! This crate is the **single source of truth** for turning photographs into
//! embedding vectors. It provides:
//!
//! - **Preprocessing**: the fixed resize/crop/normalize pipeline
//! - **Image embedders**: a frozen scene-classification CNN with its
//!   classification head removed, exposing the pooled hidden representation
//! - **Checkpoint locator**: runtime path resolution for backbone weights
//! - **Unified config**: backbone, device, and preprocessing geometry
//!
//! ## Design Principles
//!
//! 1. **Production-only**: No mock implementations. Test doubles live in
//!    consuming crates.
//! 2. **Local-first**: Embedded Candle inference over disk-based checkpoints.
//! 3. **Backend-agnostic trait**: [`ImageEmbedder`] does not leak Candle
//!    internals.
//! 4. **Comparable or nothing**: every knob that affects vector geometry
//!    (backbone, resize, crop) is captured in [`ModelInfo`] so an index can
//!    refuse a mismatched embedder.
//!
//! ## Checkpoint Location
//!
//! Checkpoints are searched in this order:
//! 1. `$SCENIC_MODELS_DIR` environment variable
//! 2. `~/.scenic/models` user directory
//! 3. `{exe_dir}/models` next to the binary
//!
//! ## Features
//!
//! - `embedded` (default): local Candle inference
//! - `metal` / `cuda`: GPU acceleration
//!
//! ## Usage
//!
//! ```ignore
//! use scenic_model::{create_image_embedder, EmbeddingConfig, ImageEmbedder};
//!
//! let config = EmbeddingConfig::default();
//! let embedder = create_image_embedder(&config)?;
//!
//! let embedding = embedder.embed_file(Path::new("query.jpg"))?;
//! assert_eq!(embedding.len(), embedder.dimension());
//! ```

use std::path::Path;

use image::DynamicImage;

pub mod config;
pub mod error;
pub mod locator;

#[cfg(feature = "embedded")]
mod embedding;

#[cfg(feature = "embedded")]
pub mod preprocess;

// Re-export error types
pub use error::{ModelError, ModelResult};

// Re-export config types (canonical source of truth)
pub use config::{
    Backbone, DevicePreference, EmbeddingConfig, ModelInfo, DEFAULT_CROP, DEFAULT_RESIZE,
};

// Re-export checkpoint locator
pub use locator::{ModelLocator, BACKBONES_SUBDIR, SCENIC_MODELS_DIR_ENV};

#[cfg(feature = "embedded")]
pub use preprocess::{Preprocessor, IMAGENET_MEAN, IMAGENET_STD};

// ============================================================================
// ImageEmbedder Trait
// ============================================================================

/// Trait for image embedders.
///
/// Maps decoded images to dense vectors of length [`dimension`]. Embeddings
/// from one embedder are only comparable to embeddings from an identically
/// configured embedder (same backbone, same weights, same preprocessing);
/// [`ModelInfo`] carries everything needed to check that.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; embedding is a pure read-only
/// computation over frozen weights.
///
/// [`dimension`]: ImageEmbedder::dimension
pub trait ImageEmbedder: Send + Sync + std::fmt::Debug {
    /// Embed a batch of decoded images.
    ///
    /// # Returns
    ///
    /// One vector of length `dimension()` per input image, in input order.
    fn embed_images(&self, images: &[DynamicImage]) -> ModelResult<Vec<Vec<f32>>>;

    /// Decode and embed a single image file.
    ///
    /// # Errors
    ///
    /// [`ModelError::ImageDecode`] for unreadable or corrupt files,
    /// otherwise whatever `embed_images` surfaces.
    fn embed_file(&self, path: &Path) -> ModelResult<Vec<f32>> {
        let img =
            image::open(path).map_err(|e| ModelError::image_decode(path, e.to_string()))?;
        let mut rows = self.embed_images(std::slice::from_ref(&img))?;
        rows.pop().ok_or_else(|| {
            ModelError::embedding_failed(
                self.model_info().backbone.as_str(),
                "embedder returned no rows for a one-image batch",
            )
        })
    }

    /// Warm up the embedder by running a dummy inference.
    ///
    /// This pages weights in and triggers any lazy kernel compilation.
    fn warm_up(&self) -> ModelResult<()> {
        let info = self.model_info();
        let dummy = DynamicImage::new_rgb8(info.crop, info.crop);
        let _ = self.embed_images(&[dummy])?;
        Ok(())
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Get model identity (backbone, dimension, preprocessing geometry).
    fn model_info(&self) -> &ModelInfo;
}

// ============================================================================
// Factory Functions
// ============================================================================

/// Create an image embedder from configuration.
///
/// # Errors
///
/// Returns `ModelError` if checkpoint resolution or model loading fails.
#[cfg(feature = "embedded")]
pub fn create_image_embedder(config: &EmbeddingConfig) -> ModelResult<Box<dyn ImageEmbedder>> {
    let embedder = embedding::CandleImageEmbedder::new(config)?;
    Ok(Box::new(embedder))
}

#[cfg(not(feature = "embedded"))]
pub fn create_image_embedder(_config: &EmbeddingConfig) -> ModelResult<Box<dyn ImageEmbedder>> {
    Err(ModelError::BackendUnavailable {
        reason: "No inference backend compiled in. Enable the 'embedded' feature.".to_string(),
    })
}

// ============================================================================
// Re-export implementations (feature-gated)
// ============================================================================

#[cfg(feature = "embedded")]
pub use embedding::CandleImageEmbedder;
