//! Shared test doubles and fixtures.
//!
//! The mock embedder maps an image to its mean RGB color, scaled to [0,1].
//! That keeps pipeline tests fast, weight-free, and still meaningful: photos
//! of similar color rank close together under cosine distance. There is no
//! runtime fallback to this mock; it exists only under `#[cfg(test)]`.

use std::path::{Path, PathBuf};

use image::{DynamicImage, Rgb, RgbImage};
use tempfile::TempDir;

use scenic_model::{Backbone, ImageEmbedder, ModelInfo, ModelResult};

/// Deterministic, weight-free embedder producing 3-d mean-color vectors.
#[derive(Debug)]
pub(crate) struct MockEmbedder {
    info: ModelInfo,
}

impl MockEmbedder {
    pub(crate) fn new() -> Self {
        Self {
            info: ModelInfo {
                backbone: Backbone::ResNet18,
                dimension: 3,
                resize: 32,
                crop: 32,
            },
        }
    }
}

impl ImageEmbedder for MockEmbedder {
    fn embed_images(&self, images: &[DynamicImage]) -> ModelResult<Vec<Vec<f32>>> {
        Ok(images.iter().map(mean_rgb).collect())
    }

    fn dimension(&self) -> usize {
        self.info.dimension
    }

    fn model_info(&self) -> &ModelInfo {
        &self.info
    }
}

fn mean_rgb(img: &DynamicImage) -> Vec<f32> {
    let rgb = img.to_rgb8();
    let count = (rgb.width() as f64 * rgb.height() as f64).max(1.0);
    let mut sums = [0f64; 3];
    for pixel in rgb.pixels() {
        for (sum, value) in sums.iter_mut().zip(pixel.0) {
            *sum += value as f64;
        }
    }
    sums.iter().map(|sum| (sum / count / 255.0) as f32).collect()
}

/// Build a corpus of solid-color photos under labeled directories.
pub(crate) fn corpus_with_colors(photos: &[(&str, &str, [u8; 3])]) -> (TempDir, Vec<PathBuf>) {
    let temp = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for (label, name, color) in photos {
        let dir = temp.path().join(label);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        RgbImage::from_pixel(24, 24, Rgb(*color))
            .save(&path)
            .unwrap();
        paths.push(path);
    }
    (temp, paths)
}

/// Write a lossless solid-color query photo outside any label directory.
pub(crate) fn write_query_photo(dir: &Path, color: [u8; 3]) -> PathBuf {
    let path = dir.join("query.png");
    RgbImage::from_pixel(24, 24, Rgb(color))
        .save(&path)
        .unwrap();
    path
}
