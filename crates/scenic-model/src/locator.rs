//! Checkpoint locator for runtime path resolution.
//!
//! Backbone checkpoints are disk-based assets distributed separately from
//! the binary (a Places365-trained ResNet converted to safetensors).
//!
//! # Search Order
//!
//! 1. **Environment override**: `$SCENIC_MODELS_DIR` (single path)
//! 2. **User directory**: `~/.scenic/models`
//! 3. **Binary-relative**: `{exe_dir}/models` (for release packaging)
//!
//! # Layout
//!
//! ```text
//! {models_dir}/
//!   backbones/
//!     resnet18-places365.safetensors
//!     resnet50-places365.safetensors
//! ```

use std::env;
use std::path::{Path, PathBuf};

use crate::config::Backbone;
use crate::error::{ModelError, ModelResult};

/// Environment variable for overriding the models directory.
pub const SCENIC_MODELS_DIR_ENV: &str = "SCENIC_MODELS_DIR";

/// Sub-directory holding backbone checkpoints.
pub const BACKBONES_SUBDIR: &str = "backbones";

// ============================================================================
// ModelLocator
// ============================================================================

/// Locates backbone checkpoints at runtime using a defined search order.
///
/// The locator does not download anything. Checkpoints must be pre-installed
/// at one of the search locations; otherwise an error with guidance is
/// returned.
#[derive(Debug, Clone, Default)]
pub struct ModelLocator {
    /// Fixed base directory (skips the search when set).
    base_dir: Option<PathBuf>,
}

impl ModelLocator {
    /// Create a new model locator.
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Create a model locator with a fixed base directory.
    ///
    /// Useful for testing or when the models directory is known.
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }

    /// Resolve the base models directory.
    ///
    /// Returns the first search location that exists.
    pub fn resolve_base_dir(&self) -> ModelResult<PathBuf> {
        if let Some(ref base) = self.base_dir {
            if base.exists() {
                return Ok(base.clone());
            }
            return Err(ModelError::ModelsDirectoryNotFound {
                searched: vec![base.clone()],
            });
        }

        let mut searched = Vec::new();

        // 1. Check $SCENIC_MODELS_DIR
        if let Ok(env_path) = env::var(SCENIC_MODELS_DIR_ENV) {
            let path = PathBuf::from(&env_path);
            if path.is_dir() {
                return Ok(path);
            }
            searched.push(path);
        }

        // 2. Check ~/.scenic/models
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".scenic").join("models");
            if path.is_dir() {
                return Ok(path);
            }
            searched.push(path);
        }

        // 3. Check {exe_dir}/models
        if let Ok(exe_path) = env::current_exe() {
            if let Some(exe_dir) = exe_path.parent() {
                let path = exe_dir.join("models");
                if path.is_dir() {
                    return Ok(path);
                }
                searched.push(path);
            }
        }

        Err(ModelError::ModelsDirectoryNotFound { searched })
    }

    /// Resolve the checkpoint path for a backbone.
    ///
    /// Tries `{base}/backbones/{file}` first, then the flat `{base}/{file}`
    /// layout.
    pub fn backbone_weights_path(&self, backbone: Backbone) -> ModelResult<PathBuf> {
        let base = self.resolve_base_dir()?;
        let file = backbone.weights_file();

        let candidates = [base.join(BACKBONES_SUBDIR).join(&file), base.join(&file)];
        for path in &candidates {
            if path.is_file() {
                return Ok(path.clone());
            }
        }

        Err(ModelError::ModelNotFound {
            backbone: backbone.as_str().to_string(),
            path: candidates[0].clone(),
        })
    }

    /// Check whether a checkpoint for the backbone is available.
    pub fn has_backbone(&self, backbone: Backbone) -> bool {
        self.backbone_weights_path(backbone).is_ok()
    }

    /// Validate that an explicit checkpoint path points at a file.
    pub fn validate_weights_path(backbone: Backbone, path: &Path) -> ModelResult<()> {
        if !path.is_file() {
            return Err(ModelError::ModelNotFound {
                backbone: backbone.as_str().to_string(),
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch_checkpoint(dir: &Path, backbone: Backbone) -> PathBuf {
        let path = dir.join(BACKBONES_SUBDIR).join(backbone.weights_file());
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, b"stub").unwrap();
        path
    }

    #[test]
    fn test_locator_with_base_dir() {
        let temp = TempDir::new().unwrap();
        touch_checkpoint(temp.path(), Backbone::ResNet18);

        let locator = ModelLocator::with_base_dir(temp.path());
        assert_eq!(locator.resolve_base_dir().unwrap(), temp.path());
    }

    #[test]
    fn test_backbone_path_in_subdir() {
        let temp = TempDir::new().unwrap();
        let expected = touch_checkpoint(temp.path(), Backbone::ResNet18);

        let locator = ModelLocator::with_base_dir(temp.path());
        assert_eq!(
            locator.backbone_weights_path(Backbone::ResNet18).unwrap(),
            expected
        );
        assert!(locator.has_backbone(Backbone::ResNet18));
    }

    #[test]
    fn test_backbone_path_flat_layout() {
        let temp = TempDir::new().unwrap();
        let flat = temp.path().join(Backbone::ResNet34.weights_file());
        fs::write(&flat, b"stub").unwrap();

        let locator = ModelLocator::with_base_dir(temp.path());
        assert_eq!(
            locator.backbone_weights_path(Backbone::ResNet34).unwrap(),
            flat
        );
    }

    #[test]
    fn test_backbone_not_found() {
        let temp = TempDir::new().unwrap();
        let locator = ModelLocator::with_base_dir(temp.path());

        match locator.backbone_weights_path(Backbone::ResNet50).unwrap_err() {
            ModelError::ModelNotFound { backbone, .. } => assert_eq!(backbone, "resnet50"),
            other => panic!("Expected ModelNotFound, got {other:?}"),
        }
        assert!(!locator.has_backbone(Backbone::ResNet50));
    }

    #[test]
    fn test_missing_base_dir() {
        let locator = ModelLocator::with_base_dir("/nonexistent/scenic-models");
        assert!(matches!(
            locator.resolve_base_dir().unwrap_err(),
            ModelError::ModelsDirectoryNotFound { .. }
        ));
    }
}
