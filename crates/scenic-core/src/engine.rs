//! The ScenicEngine - entry point for all operations.
//!
//! The engine owns the resolved global configuration and wires the layers
//! together: it creates the real embedder from `scenic-model`, resolves
//! per-corpus overrides, and hands off to the indexing and query pipelines.

use std::path::Path;

use tracing::debug;

use scenic_model::{create_image_embedder, DevicePreference};

use crate::config::{CorpusConfig, GlobalConfig};
use crate::errors::ScenicError;
use crate::indexer::run_index;
use crate::manifest::{read_manifest, IndexManifest};
use crate::search::run_search;
use crate::types::{IndexOptions, IndexReport, ProgressFn, SearchOptions, SearchReport};

/// Main entry point for Scenic operations.
#[derive(Debug)]
pub struct ScenicEngine {
    config: GlobalConfig,
}

impl ScenicEngine {
    /// Create an engine from an already-loaded configuration.
    pub fn new(config: GlobalConfig) -> Self {
        Self { config }
    }

    /// Create an engine from `~/.scenic/config.yaml`, or defaults when the
    /// file does not exist.
    pub fn with_defaults() -> Result<Self, ScenicError> {
        Ok(Self::new(GlobalConfig::load_default()?))
    }

    /// Create an engine from an explicit configuration file.
    pub fn with_config(path: &Path) -> Result<Self, ScenicError> {
        Ok(Self::new(GlobalConfig::load(path)?))
    }

    /// The engine's resolved configuration.
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Override the inference device (from `--device` / `SCENIC_DEVICE`).
    pub fn set_device(&mut self, device: DevicePreference) {
        self.config.embedding.device = device;
    }

    /// Build an index for a corpus.
    ///
    /// Loads the embedder, resolves index settings (global config ←
    /// `scenic.toml` ← option overrides), and runs the indexing pipeline.
    pub fn build_index(
        &self,
        options: &IndexOptions,
        progress: Option<ProgressFn<'_>>,
    ) -> Result<IndexReport, ScenicError> {
        // Corpus problems should surface before the (expensive) model load.
        if !options.corpus.is_dir() {
            return Err(ScenicError::CorpusNotFound(options.corpus.clone()));
        }

        let corpus_config = CorpusConfig::load(&options.corpus)?;
        let settings = self.config.index.merged(corpus_config.as_ref(), options);
        settings.validate()?;
        debug!(
            "Resolved index settings: trees={}, seed={:?}, metric={}, batch={}",
            settings.trees, settings.seed, settings.metric, settings.batch_size
        );

        let embedder = create_image_embedder(&self.config.embedding)?;
        run_index(embedder.as_ref(), options, &settings, progress)
    }

    /// Search a built index with a query image.
    pub fn search(&self, options: &SearchOptions) -> Result<SearchReport, ScenicError> {
        // A missing index should surface before the (expensive) model load;
        // run_search re-reads the manifest for its compatibility check.
        read_manifest(&options.index_dir)?;

        let embedder = create_image_embedder(&self.config.embedding)?;
        run_search(embedder.as_ref(), options)
    }

    /// Read the manifest of a built index.
    pub fn info(&self, index_dir: &Path) -> Result<IndexManifest, ScenicError> {
        read_manifest(index_dir)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use scenic_model::Backbone;

    #[test]
    fn test_engine_from_config() {
        let mut config = GlobalConfig::default();
        config.embedding.backbone = Backbone::ResNet34;

        let engine = ScenicEngine::new(config);
        assert_eq!(engine.config().embedding.backbone, Backbone::ResNet34);
    }

    #[test]
    fn test_set_device() {
        let mut engine = ScenicEngine::new(GlobalConfig::default());
        assert_eq!(engine.config().embedding.device, DevicePreference::Auto);

        engine.set_device(DevicePreference::Cpu);
        assert_eq!(engine.config().embedding.device, DevicePreference::Cpu);
    }

    #[test]
    fn test_info_on_missing_index() {
        let temp = tempfile::TempDir::new().unwrap();
        let engine = ScenicEngine::new(GlobalConfig::default());
        assert!(matches!(
            engine.info(&temp.path().join("nope")).unwrap_err(),
            ScenicError::IndexNotFound { .. }
        ));
    }
}
