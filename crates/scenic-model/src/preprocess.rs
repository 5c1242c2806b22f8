//! Deterministic image-to-tensor preprocessing.
//!
//! The pipeline is fixed and branch-free: decode → RGB → resize shortest
//! side → center crop → scale to [0,1] channel-first → normalize with the
//! standard ImageNet statistics. Corpus images and query images MUST go
//! through the same [`Preprocessor`] instance (or one with identical
//! geometry) for their embeddings to be comparable; nothing at runtime can
//! detect a violation, so `scenic-core` pins the geometry in the index
//! manifest.

use std::path::Path;

use candle_core::{DType, Device, Tensor};
use image::imageops::FilterType;
use image::DynamicImage;
use tracing::trace;

use crate::error::{ModelError, ModelResult};

/// Per-channel means of the normalization step.
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];

/// Per-channel standard deviations of the normalization step.
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Turns decoded images into normalized `(3, crop, crop)` F32 tensors.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    resize: u32,
    crop: u32,
}

impl Preprocessor {
    /// Create a preprocessor. `crop` must not exceed `resize`.
    pub fn new(resize: u32, crop: u32) -> ModelResult<Self> {
        if resize == 0 || crop == 0 || crop > resize {
            return Err(ModelError::invalid_config(format!(
                "invalid preprocessing geometry: resize={resize}, crop={crop}"
            )));
        }
        Ok(Self { resize, crop })
    }

    /// Shortest-side resize target.
    pub fn resize(&self) -> u32 {
        self.resize
    }

    /// Center-crop size.
    pub fn crop(&self) -> u32 {
        self.crop
    }

    /// Decode an image file.
    ///
    /// # Errors
    ///
    /// [`ModelError::ImageDecode`] for unreadable or corrupt files.
    pub fn open(&self, path: &Path) -> ModelResult<DynamicImage> {
        image::open(path).map_err(|e| ModelError::image_decode(path, e.to_string()))
    }

    /// Preprocess one image into a `(3, crop, crop)` F32 tensor.
    pub fn tensor(&self, img: &DynamicImage, device: &Device) -> ModelResult<Tensor> {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();

        // Scale so the shortest side hits the resize target exactly; the
        // other side can only round down to it, never below.
        let target = self.resize;
        let (new_width, new_height) = if width <= height {
            let scaled = (height as f32 * target as f32 / width as f32).round() as u32;
            (target, scaled.max(target))
        } else {
            let scaled = (width as f32 * target as f32 / height as f32).round() as u32;
            (scaled.max(target), target)
        };
        let resized = image::imageops::resize(&rgb, new_width, new_height, FilterType::Triangle);

        let x0 = (resized.width() - self.crop) / 2;
        let y0 = (resized.height() - self.crop) / 2;
        let cropped = image::imageops::crop_imm(&resized, x0, y0, self.crop, self.crop).to_image();
        trace!(
            "Preprocessed {}x{} -> {}x{} -> crop {}",
            width,
            height,
            new_width,
            new_height,
            self.crop
        );

        let crop = self.crop as usize;
        let data = cropped.into_raw();
        let pixels = Tensor::from_vec(data, (crop, crop, 3), device)?
            .permute((2, 0, 1))?
            .to_dtype(DType::F32)?;
        let scaled = (pixels / 255.0)?;

        let mean = Tensor::new(&IMAGENET_MEAN, device)?.reshape((3, 1, 1))?;
        let std = Tensor::new(&IMAGENET_STD, device)?.reshape((3, 1, 1))?;
        Ok(scaled.broadcast_sub(&mean)?.broadcast_div(&std)?)
    }

    /// Preprocess a batch into a `(N, 3, crop, crop)` tensor.
    pub fn batch(&self, images: &[DynamicImage], device: &Device) -> ModelResult<Tensor> {
        let mut tensors = Vec::with_capacity(images.len());
        for img in images {
            tensors.push(self.tensor(img, device)?);
        }
        Ok(Tensor::stack(&tensors, 0)?)
    }
}

// ============================================================================
// Tests
// ============================================================================
