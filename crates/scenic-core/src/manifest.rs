//! Index build manifest.
//!
//! Written next to the index snapshot, the manifest records everything that
//! must match between build time and query time: the model identity
//! (backbone, dimension, preprocessing geometry), the metric, and the build
//! parameters. Nothing at runtime can detect two embedders drifting apart by
//! inspecting vectors alone, so this recorded identity is the guard.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use scenic_index::Metric;
use scenic_model::ModelInfo;

use crate::errors::ScenicError;

/// Manifest filename inside the index directory.
pub const MANIFEST_FILENAME: &str = "meta.json";

/// Current manifest format version.
pub const MANIFEST_VERSION: u32 = 1;

// ============================================================================
// IndexManifest
// ============================================================================

/// Metadata describing one built index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexManifest {
    /// Manifest format version.
    pub version: u32,

    /// Identity of the embedder used for every indexed vector.
    pub model: ModelInfo,

    /// Distance metric of the index.
    pub metric: Metric,

    /// Number of trees in the forest.
    pub trees: usize,

    /// Build seed, when one was configured.
    pub seed: Option<u64>,

    /// Number of indexed items.
    pub items: usize,

    /// Build timestamp.
    pub built_at: DateTime<Utc>,
}

impl IndexManifest {
    /// Create a manifest for a just-built index.
    pub fn new(
        model: ModelInfo,
        metric: Metric,
        trees: usize,
        seed: Option<u64>,
        items: usize,
    ) -> Self {
        Self {
            version: MANIFEST_VERSION,
            model,
            metric,
            trees,
            seed,
            items,
            built_at: Utc::now(),
        }
    }
}

// ============================================================================
// Read / write
// ============================================================================

/// Get the manifest file path inside an index directory.
pub fn manifest_path(index_dir: &Path) -> PathBuf {
    index_dir.join(MANIFEST_FILENAME)
}

/// Write a manifest as pretty JSON.
pub fn write_manifest(index_dir: &Path, manifest: &IndexManifest) -> Result<(), ScenicError> {
    fs::create_dir_all(index_dir)
        .map_err(|e| ScenicError::manifest_io(index_dir, e.to_string()))?;

    let path = manifest_path(index_dir);
    let json = serde_json::to_string_pretty(manifest)
        .map_err(|e| ScenicError::manifest_parse(&path, e.to_string()))?;
    fs::write(&path, json).map_err(|e| ScenicError::manifest_io(&path, e.to_string()))?;

    debug!("Wrote manifest to {}", path.display());
    Ok(())
}

/// Read the manifest of an index directory.
///
/// # Errors
///
/// - [`ScenicError::IndexNotFound`] when no manifest exists
/// - [`ScenicError::ManifestParse`] for malformed or wrong-version files
pub fn read_manifest(index_dir: &Path) -> Result<IndexManifest, ScenicError> {
    let path = manifest_path(index_dir);
    if !path.exists() {
        return Err(ScenicError::IndexNotFound {
            path: index_dir.to_path_buf(),
        });
    }

    let content =
        fs::read_to_string(&path).map_err(|e| ScenicError::manifest_io(&path, e.to_string()))?;
    let manifest: IndexManifest = serde_json::from_str(&content)
        .map_err(|e| ScenicError::manifest_parse(&path, e.to_string()))?;

    if manifest.version != MANIFEST_VERSION {
        return Err(ScenicError::manifest_parse(
            &path,
            format!(
                "version {} not supported (expected {}); re-run indexing",
                manifest.version, MANIFEST_VERSION
            ),
        ));
    }
    Ok(manifest)
}

/// Verify that the active embedder matches the one the index was built with.
///
/// Every field of [`ModelInfo`] participates: a different backbone, a
/// different dimension, or different preprocessing geometry all invalidate
/// distance comparability.
pub fn check_model_compatibility(
    manifest: &IndexManifest,
    active: &ModelInfo,
) -> Result<(), ScenicError> {
    if &manifest.model != active {
        return Err(ScenicError::ModelMismatch {
            indexed: manifest.model.to_string(),
            active: active.to_string(),
        });
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use scenic_model::Backbone;
    use tempfile::TempDir;

    fn sample_manifest() -> IndexManifest {
        IndexManifest::new(
            ModelInfo::new(Backbone::ResNet18, 256, 224),
            Metric::Cosine,
            16,
            Some(42),
            128,
        )
    }

    #[test]
    fn test_round_trip() {
        let temp = TempDir::new().unwrap();
        let manifest = sample_manifest();
        write_manifest(temp.path(), &manifest).unwrap();

        let loaded = read_manifest(temp.path()).unwrap();
        assert_eq!(loaded.version, MANIFEST_VERSION);
        assert_eq!(loaded.model, manifest.model);
        assert_eq!(loaded.metric, Metric::Cosine);
        assert_eq!(loaded.trees, 16);
        assert_eq!(loaded.seed, Some(42));
        assert_eq!(loaded.items, 128);
    }

    #[test]
    fn test_missing_manifest_is_index_not_found() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            read_manifest(temp.path()).unwrap_err(),
            ScenicError::IndexNotFound { .. }
        ));
    }

    #[test]
    fn test_malformed_manifest() {
        let temp = TempDir::new().unwrap();
        fs::write(manifest_path(temp.path()), "{ truncated").unwrap();
        assert!(matches!(
            read_manifest(temp.path()).unwrap_err(),
            ScenicError::ManifestParse { .. }
        ));
    }

    #[test]
    fn test_unsupported_version() {
        let temp = TempDir::new().unwrap();
        let mut manifest = sample_manifest();
        manifest.version = 99;
        // Write without the version check in the way.
        fs::create_dir_all(temp.path()).unwrap();
        fs::write(
            manifest_path(temp.path()),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            read_manifest(temp.path()).unwrap_err(),
            ScenicError::ManifestParse { .. }
        ));
    }

    #[test]
    fn test_model_compatibility() {
        let manifest = sample_manifest();

        let same = ModelInfo::new(Backbone::ResNet18, 256, 224);
        assert!(check_model_compatibility(&manifest, &same).is_ok());

        let different_backbone = ModelInfo::new(Backbone::ResNet50, 256, 224);
        assert!(matches!(
            check_model_compatibility(&manifest, &different_backbone).unwrap_err(),
            ScenicError::ModelMismatch { .. }
        ));

        let different_crop = ModelInfo::new(Backbone::ResNet18, 256, 192);
        assert!(check_model_compatibility(&manifest, &different_crop).is_err());
    }
}
