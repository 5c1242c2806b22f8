//! Candle-based image embedder.
//!
//! The backbone is composed WITHOUT a classification layer from the start
//! (`*_no_final_layer`): the embedding output is a designated tap point of
//! the graph, not the result of mutating a classifier after loading. The
//! loaded graph is frozen - batch norm runs in inference mode, weights are
//! immutable, and `forward` takes `&self`, so one embedder can serve
//! concurrent read-only callers.

use std::fs;
use std::path::{Path, PathBuf};

use candle_core::{DType, Device, Module};
use candle_nn::{Func, VarBuilder};
use candle_transformers::models::resnet;
use image::DynamicImage;
use safetensors::SafeTensors;
use tracing::{debug, info};

use crate::config::{Backbone, DevicePreference, EmbeddingConfig, ModelInfo};
use crate::error::{ModelError, ModelResult};
use crate::locator::ModelLocator;
use crate::preprocess::Preprocessor;
use crate::ImageEmbedder;

// ============================================================================
// CandleImageEmbedder
// ============================================================================

/// Frozen CNN embedder backed by Candle.
///
/// Construction loads the checkpoint and fails fast on a missing file, a
/// corrupt checkpoint, or parameter shapes that do not match the requested
/// architecture. After that the embedder is immutable and deterministic:
/// the same preprocessed tensor always yields the same embedding.
pub struct CandleImageEmbedder {
    info: ModelInfo,
    backbone: Func<'static>,
    preprocess: Preprocessor,
    device: Device,
}

impl std::fmt::Debug for CandleImageEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleImageEmbedder")
            .field("backbone", &self.info.backbone)
            .field("dimension", &self.info.dimension)
            .finish()
    }
}

impl CandleImageEmbedder {
    /// Create a new embedder from configuration.
    pub fn new(config: &EmbeddingConfig) -> ModelResult<Self> {
        config.validate()?;

        let weights_path = Self::resolve_weights(config)?;
        let device = Self::select_device(config.device)?;

        info!(
            "Loading {} backbone from {:?} (dim={})",
            config.backbone,
            weights_path,
            config.backbone.dimension()
        );

        // Checkpoints converted from DataParallel training runs carry a
        // `module.` prefix on every parameter name.
        let prefixed = has_module_prefix(config.backbone, &weights_path)?;
        if prefixed {
            debug!("Checkpoint uses `module.`-prefixed parameter names");
        }

        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[weights_path.clone()], DType::F32, &device)
                .map_err(|e| ModelError::model_load(config.backbone.as_str(), e.to_string()))?
        };
        let vb = if prefixed { vb.pp("module") } else { vb };

        let backbone = match config.backbone {
            Backbone::ResNet18 => resnet::resnet18_no_final_layer(vb),
            Backbone::ResNet34 => resnet::resnet34_no_final_layer(vb),
            Backbone::ResNet50 => resnet::resnet50_no_final_layer(vb),
        }
        .map_err(|e| ModelError::model_load(config.backbone.as_str(), e.to_string()))?;

        Ok(Self {
            info: ModelInfo::from_config(config),
            backbone,
            preprocess: Preprocessor::new(config.resize, config.crop)?,
            device,
        })
    }

    fn resolve_weights(config: &EmbeddingConfig) -> ModelResult<PathBuf> {
        match &config.weights_path {
            Some(path) => {
                ModelLocator::validate_weights_path(config.backbone, path)?;
                Ok(path.clone())
            }
            None => ModelLocator::new().backbone_weights_path(config.backbone),
        }
    }

    fn select_device(pref: DevicePreference) -> ModelResult<Device> {
        match pref {
            DevicePreference::Auto => {
                if let Some(device) = Self::try_gpu() {
                    Ok(device)
                } else {
                    info!("Using CPU");
                    Ok(Device::Cpu)
                }
            }
            DevicePreference::Gpu => Self::try_gpu().ok_or_else(|| ModelError::DeviceNotAvailable {
                reason: Self::gpu_not_available_reason(),
            }),
            DevicePreference::Cpu => Ok(Device::Cpu),
        }
    }

    /// Try to create a GPU device based on available features.
    fn try_gpu() -> Option<Device> {
        // Try Metal on macOS
        #[cfg(feature = "metal")]
        {
            match Device::new_metal(0) {
                Ok(device) => {
                    info!("Using Metal GPU");
                    return Some(device);
                }
                Err(e) => {
                    tracing::debug!("Metal not available: {}", e);
                }
            }
        }

        // Try CUDA on Windows/Linux
        #[cfg(feature = "cuda")]
        {
            match Device::new_cuda(0) {
                Ok(device) => {
                    info!("Using CUDA GPU");
                    return Some(device);
                }
                Err(e) => {
                    tracing::debug!("CUDA not available: {}", e);
                }
            }
        }

        None
    }

    /// Get reason why GPU is not available.
    fn gpu_not_available_reason() -> String {
        #[cfg(all(not(feature = "metal"), not(feature = "cuda")))]
        {
            return "this build has no GPU support. \
                    Rebuild with --features metal (macOS) or --features cuda (NVIDIA GPU)"
                .to_string();
        }

        #[cfg(feature = "metal")]
        {
            return "Metal GPU not available on this system".to_string();
        }

        #[cfg(feature = "cuda")]
        {
            return "CUDA GPU not available. Ensure NVIDIA drivers and CUDA toolkit are installed"
                .to_string();
        }

        #[allow(unreachable_code)]
        "GPU not available".to_string()
    }

    /// The preprocessor used for every input image.
    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocess
    }
}

impl ImageEmbedder for CandleImageEmbedder {
    fn embed_images(&self, images: &[DynamicImage]) -> ModelResult<Vec<Vec<f32>>> {
        if images.is_empty() {
            return Ok(Vec::new());
        }

        let batch = self.preprocess.batch(images, &self.device)?;
        let features = self
            .backbone
            .forward(&batch)
            .map_err(|e| ModelError::embedding_failed(self.info.backbone.as_str(), e.to_string()))?;

        let rows = features
            .to_vec2::<f32>()
            .map_err(|e| ModelError::embedding_failed(self.info.backbone.as_str(), e.to_string()))?;

        if let Some(row) = rows.first() {
            if row.len() != self.info.dimension {
                return Err(ModelError::embedding_failed(
                    self.info.backbone.as_str(),
                    format!(
                        "backbone produced {}-d vectors, expected {}",
                        row.len(),
                        self.info.dimension
                    ),
                ));
            }
        }
        Ok(rows)
    }

    fn dimension(&self) -> usize {
        self.info.dimension
    }

    fn model_info(&self) -> &ModelInfo {
        &self.info
    }
}

// ============================================================================
// Checkpoint sniffing
// ============================================================================

/// Whether every parameter in the checkpoint is `module.`-prefixed.
///
/// Also serves as an early sanity parse: a file that is not valid
/// safetensors fails here with a model-load error before Candle maps it.
pub(crate) fn has_module_prefix(backbone: Backbone, path: &Path) -> ModelResult<bool> {
    let bytes = fs::read(path)?;
    let tensors = SafeTensors::deserialize(&bytes)
        .map_err(|e| ModelError::model_load(backbone.as_str(), format!("unreadable checkpoint: {e}")))?;

    let names = tensors.names();
    Ok(!names.is_empty() && names.iter().all(|n| n.starts_with("module.")))
}

// ============================================================================
// Tests
// ============================================================================
