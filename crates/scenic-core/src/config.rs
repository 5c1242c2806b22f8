//! Configuration types and layering.
//!
//! Configuration is resolved with the following precedence (highest wins):
//!
//! 1. CLI flags / [`crate::types::IndexOptions`] fields
//! 2. Per-corpus `scenic.toml` at the corpus root
//! 3. Global `~/.scenic/config.yaml`
//! 4. Built-in defaults
//!
//! The global file carries the embedding configuration (backbone, device,
//! preprocessing geometry) and default index parameters; the per-corpus file
//! can only override index parameters, because changing the embedding per
//! corpus would silently break vector comparability across invocations.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use scenic_index::Metric;
use scenic_model::EmbeddingConfig;

use crate::errors::ScenicError;
use crate::types::IndexOptions;

// ============================================================================
// Constants
// ============================================================================

/// Per-user home directory name.
pub const SCENIC_HOME_DIR: &str = ".scenic";

/// Global configuration filename inside the home directory.
pub const GLOBAL_CONFIG_FILENAME: &str = "config.yaml";

/// Per-corpus configuration filename at the corpus root.
pub const CORPUS_CONFIG_FILENAME: &str = "scenic.toml";

/// Default number of images decoded and embedded per batch.
pub const DEFAULT_BATCH_SIZE: usize = 16;

// ============================================================================
// IndexSettings
// ============================================================================

/// Index build parameters after resolution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexSettings {
    /// Number of trees; more trees raise recall at build-time cost.
    pub trees: usize,

    /// Build seed for reproducible forests.
    pub seed: Option<u64>,

    /// Distance metric.
    pub metric: Metric,

    /// Images per embedding batch.
    pub batch_size: usize,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            trees: scenic_index::DEFAULT_TREE_COUNT,
            seed: None,
            metric: Metric::default(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl IndexSettings {
    /// Apply per-corpus and per-invocation overrides, highest wins.
    pub fn merged(&self, corpus: Option<&CorpusConfig>, options: &IndexOptions) -> Self {
        let mut settings = self.clone();
        if let Some(corpus) = corpus {
            if let Some(trees) = corpus.trees {
                settings.trees = trees;
            }
            if let Some(seed) = corpus.seed {
                settings.seed = Some(seed);
            }
            if let Some(metric) = corpus.metric {
                settings.metric = metric;
            }
            if let Some(batch_size) = corpus.batch_size {
                settings.batch_size = batch_size;
            }
        }
        if let Some(trees) = options.trees {
            settings.trees = trees;
        }
        if let Some(seed) = options.seed {
            settings.seed = Some(seed);
        }
        if let Some(batch_size) = options.batch_size {
            settings.batch_size = batch_size;
        }
        settings
    }

    /// Validate resolved values.
    pub fn validate(&self) -> Result<(), ScenicError> {
        if self.trees == 0 {
            return Err(ScenicError::invalid_configuration(
                "index.trees is 0",
                "Use at least one tree; 16 is a reasonable default",
            ));
        }
        if self.batch_size == 0 {
            return Err(ScenicError::invalid_configuration(
                "index.batch_size is 0",
                "Use a batch size of at least 1",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// GlobalConfig
// ============================================================================

/// Global configuration, loaded from `~/.scenic/config.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Embedding pipeline configuration.
    pub embedding: EmbeddingConfig,

    /// Default index build parameters.
    pub index: IndexSettings,
}

impl GlobalConfig {
    /// Path of the default global config file, when a home directory exists.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(SCENIC_HOME_DIR).join(GLOBAL_CONFIG_FILENAME))
    }

    /// Load configuration from an explicit YAML file.
    pub fn load(path: &Path) -> Result<Self, ScenicError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ScenicError::invalid_configuration(
                format!("cannot read config at {}: {e}", path.display()),
                "Check the path passed via --config / SCENIC_CONFIG",
            )
        })?;
        let config: GlobalConfig = serde_yaml::from_str(&content).map_err(|e| {
            ScenicError::invalid_configuration(
                format!("cannot parse config at {}: {e}", path.display()),
                "Fix the YAML syntax or remove the file to use defaults",
            )
        })?;
        debug!("Loaded global config from {}", path.display());
        Ok(config)
    }

    /// Load the default global config, falling back to built-in defaults
    /// when no file exists.
    pub fn load_default() -> Result<Self, ScenicError> {
        match Self::default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

// ============================================================================
// CorpusConfig
// ============================================================================

/// Optional per-corpus overrides, loaded from `scenic.toml` at the corpus
/// root. All fields are optional; unset fields fall through to the global
/// configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Number of trees for this corpus.
    pub trees: Option<usize>,

    /// Build seed for this corpus.
    pub seed: Option<u64>,

    /// Distance metric for this corpus.
    pub metric: Option<Metric>,

    /// Embedding batch size for this corpus.
    pub batch_size: Option<usize>,
}

impl CorpusConfig {
    /// Load the corpus config when present.
    pub fn load(corpus_root: &Path) -> Result<Option<Self>, ScenicError> {
        let path = corpus_root.join(CORPUS_CONFIG_FILENAME);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let config: CorpusConfig = toml::from_str(&content).map_err(|e| {
            ScenicError::invalid_configuration(
                format!("cannot parse {}: {e}", path.display()),
                "Fix the TOML syntax or delete the file",
            )
        })?;
        debug!("Loaded corpus config from {}", path.display());
        Ok(Some(config))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = GlobalConfig::default();
        assert_eq!(config.index.trees, scenic_index::DEFAULT_TREE_COUNT);
        assert_eq!(config.index.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.index.metric, Metric::Cosine);
        assert!(config.index.seed.is_none());
    }

    #[test]
    fn test_load_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(
            &path,
            r#"
embedding:
  backbone: resnet50
  device: cpu
  resize: 288
  crop: 256
index:
  trees: 32
  seed: 7
  metric: euclidean
"#,
        )
        .unwrap();

        let config = GlobalConfig::load(&path).unwrap();
        assert_eq!(config.embedding.backbone, scenic_model::Backbone::ResNet50);
        assert_eq!(config.embedding.resize, 288);
        assert_eq!(config.index.trees, 32);
        assert_eq!(config.index.seed, Some(7));
        assert_eq!(config.index.metric, Metric::Euclidean);
        // Unset fields keep defaults.
        assert_eq!(config.index.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        fs::write(&path, "embedding: [not, a, mapping").unwrap();

        assert!(matches!(
            GlobalConfig::load(&path).unwrap_err(),
            ScenicError::InvalidConfiguration { .. }
        ));
    }

    #[test]
    fn test_corpus_config_absent() {
        let temp = TempDir::new().unwrap();
        assert!(CorpusConfig::load(temp.path()).unwrap().is_none());
    }

    #[test]
    fn test_merge_precedence() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CORPUS_CONFIG_FILENAME),
            "trees = 8\nseed = 21\n",
        )
        .unwrap();
        let corpus = CorpusConfig::load(temp.path()).unwrap().unwrap();

        let global = IndexSettings::default();
        let mut options = IndexOptions::new(temp.path());
        options.trees = Some(64);

        let resolved = global.merged(Some(&corpus), &options);
        // CLI beats corpus file beats global default.
        assert_eq!(resolved.trees, 64);
        assert_eq!(resolved.seed, Some(21));
        assert_eq!(resolved.batch_size, DEFAULT_BATCH_SIZE);
    }

    #[test]
    fn test_validate() {
        let mut settings = IndexSettings::default();
        assert!(settings.validate().is_ok());

        settings.trees = 0;
        assert!(settings.validate().is_err());

        settings.trees = 4;
        settings.batch_size = 0;
        assert!(settings.validate().is_err());
    }
}
