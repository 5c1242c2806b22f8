//! Common option and report types.

use std::path::{Path, PathBuf};

use serde::Serialize;

use scenic_index::SearchHit;
use scenic_model::ModelInfo;

/// Default number of results returned by a search.
pub const DEFAULT_TOP_K: usize = 5;

/// Directory created inside a corpus to hold its index artifacts.
pub const INDEX_DIR_NAME: &str = ".scenic";

// ============================================================================
// IndexOptions
// ============================================================================

/// Options for one corpus indexing run.
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Corpus root directory.
    pub corpus: PathBuf,

    /// Where to write index artifacts. Defaults to `<corpus>/.scenic`.
    pub index_dir: Option<PathBuf>,

    /// Tree-count override (beats corpus and global config).
    pub trees: Option<usize>,

    /// Seed override.
    pub seed: Option<u64>,

    /// Batch-size override.
    pub batch_size: Option<usize>,
}

impl IndexOptions {
    /// Create options for a corpus with no overrides.
    pub fn new(corpus: impl Into<PathBuf>) -> Self {
        Self {
            corpus: corpus.into(),
            index_dir: None,
            trees: None,
            seed: None,
            batch_size: None,
        }
    }

    /// The effective index directory.
    pub fn resolved_index_dir(&self) -> PathBuf {
        self.index_dir
            .clone()
            .unwrap_or_else(|| self.corpus.join(INDEX_DIR_NAME))
    }
}

// ============================================================================
// SearchOptions
// ============================================================================

/// Options for one similarity search.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Query image path.
    pub query: PathBuf,

    /// Index directory produced by an indexing run.
    pub index_dir: PathBuf,

    /// Maximum number of results. A value larger than the corpus returns
    /// every item, ranked.
    pub top_k: usize,
}

impl SearchOptions {
    /// Create options with the default top-K.
    pub fn new(query: impl Into<PathBuf>, index_dir: impl Into<PathBuf>) -> Self {
        Self {
            query: query.into(),
            index_dir: index_dir.into(),
            top_k: DEFAULT_TOP_K,
        }
    }

    /// Set the number of results.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Summary of a completed indexing run.
#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    /// Number of indexed photos.
    pub items: usize,

    /// Embedding dimensionality.
    pub dimension: usize,

    /// Trees in the built forest.
    pub trees: usize,

    /// Distinct scene labels seen in the corpus.
    pub labels: usize,

    /// Photos that carried geo coordinates.
    pub with_location: usize,

    /// Where the artifacts were written.
    pub index_dir: PathBuf,

    /// Wall-clock duration in milliseconds.
    pub elapsed_ms: u64,
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchReport {
    /// Ranked hits, ascending by distance.
    pub hits: Vec<SearchHit>,

    /// Identity of the model the index was built with.
    pub model: ModelInfo,

    /// Total items in the index.
    pub total_items: usize,
}

// ============================================================================
// Progress reporting
// ============================================================================

/// Progress events emitted by the indexing pipeline.
///
/// The pipeline itself stays silent on stdout; the CLI turns these into a
/// progress bar.
#[derive(Debug, Clone, Copy)]
pub enum ProgressEvent {
    /// Corpus scan finished.
    ScanComplete { total: usize },
    /// A batch of images was embedded and inserted.
    Embedded { done: usize, total: usize },
    /// Forest construction started.
    Building { trees: usize },
    /// Snapshot and manifest are being written.
    Saving,
}

/// Callback for [`ProgressEvent`]s.
pub type ProgressFn<'a> = &'a (dyn Fn(ProgressEvent) + Send + Sync);

/// Helper to emit an event through an optional callback.
pub(crate) fn emit(progress: Option<ProgressFn<'_>>, event: ProgressEvent) {
    if let Some(callback) = progress {
        callback(event);
    }
}

/// Convenience for tests and callers that want the default artifacts dir of
/// a corpus without building [`IndexOptions`].
pub fn default_index_dir(corpus: &Path) -> PathBuf {
    corpus.join(INDEX_DIR_NAME)
}
