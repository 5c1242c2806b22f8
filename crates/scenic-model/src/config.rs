//! Embedding configuration types.
//!
//! [`EmbeddingConfig`] is the single source of truth for how images are
//! turned into vectors: which backbone, which checkpoint, which device, and
//! the exact preprocessing geometry. The same configuration MUST be used for
//! corpus indexing and for queries; `scenic-core` enforces this by recording
//! a [`ModelInfo`] in the index manifest and comparing it at query time.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

// ============================================================================
// Constants
// ============================================================================

/// Default shortest-side resize target.
pub const DEFAULT_RESIZE: u32 = 256;

/// Default center-crop size. This is the spatial input size of the backbone.
pub const DEFAULT_CROP: u32 = 224;

// ============================================================================
// Backbone
// ============================================================================

/// CNN architecture used as the frozen feature extractor.
///
/// All variants are loaded WITHOUT their classification layer; the embedding
/// is the pooled pre-classification representation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backbone {
    /// ResNet-18, 512-d embeddings. Smallest of the supported backbones.
    #[default]
    ResNet18,

    /// ResNet-34, 512-d embeddings.
    ResNet34,

    /// ResNet-50, 2048-d embeddings.
    ResNet50,
}

impl Backbone {
    /// Embedding dimensionality produced by this backbone.
    pub fn dimension(&self) -> usize {
        match self {
            Backbone::ResNet18 | Backbone::ResNet34 => 512,
            Backbone::ResNet50 => 2048,
        }
    }

    /// Get the backbone name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Backbone::ResNet18 => "resnet18",
            Backbone::ResNet34 => "resnet34",
            Backbone::ResNet50 => "resnet50",
        }
    }

    /// Checkpoint filename for this backbone.
    pub fn weights_file(&self) -> String {
        format!("{}-places365.safetensors", self.as_str())
    }
}

impl fmt::Display for Backbone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Backbone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "resnet18" => Ok(Backbone::ResNet18),
            "resnet34" => Ok(Backbone::ResNet34),
            "resnet50" => Ok(Backbone::ResNet50),
            other => Err(format!(
                "Unsupported backbone `{other}`. Valid options: resnet18, resnet34, resnet50"
            )),
        }
    }
}

// ============================================================================
// DevicePreference
// ============================================================================

/// Compute device preference for inference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Try GPU first, fall back to CPU (default).
    #[default]
    Auto,
    /// Require a GPU; fail when none is available.
    Gpu,
    /// CPU-only inference.
    Cpu,
}

impl FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(DevicePreference::Auto),
            "gpu" => Ok(DevicePreference::Gpu),
            "cpu" => Ok(DevicePreference::Cpu),
            other => Err(format!(
                "Invalid device preference `{other}`. Valid options: auto, gpu, cpu"
            )),
        }
    }
}

// ============================================================================
// EmbeddingConfig
// ============================================================================

/// Configuration for the image embedding pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Backbone architecture.
    pub backbone: Backbone,

    /// Explicit checkpoint path. When unset, the model locator resolves the
    /// backbone's default checkpoint name.
    pub weights_path: Option<PathBuf>,

    /// Device preference for inference.
    pub device: DevicePreference,

    /// Shortest-side resize target.
    pub resize: u32,

    /// Center-crop size (the backbone's spatial input size).
    pub crop: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backbone: Backbone::default(),
            weights_path: None,
            device: DevicePreference::default(),
            resize: DEFAULT_RESIZE,
            crop: DEFAULT_CROP,
        }
    }
}

impl EmbeddingConfig {
    /// Validate geometry. Cropping larger than the resize target would need
    /// padding, which the pipeline deliberately does not do.
    pub fn validate(&self) -> ModelResult<()> {
        if self.resize == 0 || self.crop == 0 {
            return Err(ModelError::invalid_config(
                "resize and crop must be greater than zero",
            ));
        }
        if self.crop > self.resize {
            return Err(ModelError::invalid_config(format!(
                "crop ({}) must not exceed resize ({})",
                self.crop, self.resize
            )));
        }
        Ok(())
    }
}

// ============================================================================
// ModelInfo
// ============================================================================

/// Identity of a loaded embedder, recorded in index manifests.
///
/// Two embedders produce comparable vectors only when every field matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Backbone architecture.
    pub backbone: Backbone,

    /// Embedding dimensionality.
    pub dimension: usize,

    /// Shortest-side resize target used in preprocessing.
    pub resize: u32,

    /// Center-crop size used in preprocessing.
    pub crop: u32,
}

impl ModelInfo {
    /// Create model info for a backbone with the given preprocessing.
    pub fn new(backbone: Backbone, resize: u32, crop: u32) -> Self {
        Self {
            backbone,
            dimension: backbone.dimension(),
            resize,
            crop,
        }
    }

    /// Derive model info from a configuration.
    pub fn from_config(config: &EmbeddingConfig) -> Self {
        Self::new(config.backbone, config.resize, config.crop)
    }
}

impl fmt::Display for ModelInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (dim={}, resize={}, crop={})",
            self.backbone, self.dimension, self.resize, self.crop
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
