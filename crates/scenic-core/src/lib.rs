//! # scenic-core
//!
//! Core engine for Scenic - reverse image search over a photo corpus.
//!
//! This crate provides the domain pipelines and the engine facade consumed
//! by the `scenic` CLI and other Rust tools:
//!
//! - [`ScenicEngine`] – the main entry point for all operations
//! - [`run_index`] – the one-shot corpus indexing pipeline
//! - [`run_search`] – the per-request query pipeline
//! - [`ScenicError`] – domain-specific error type
//!
//! ## Data flow
//!
//! ```text
//! image files --preprocess+embed--> vectors --insert--> VectorIndex
//!                                                          | build()
//! query image --preprocess+embed--> vector  --query-->  ranked hits
//! ```
//!
//! Indexing runs once per corpus and persists a snapshot plus a manifest;
//! searches run against that snapshot and refuse to proceed when the active
//! embedding configuration differs from the indexed one.
//!
//! ## Modules
//!
//! - [`config`] – configuration types and precedence
//! - [`corpus`] – corpus scanning and geo side-cars
//! - [`engine`] – the ScenicEngine implementation
//! - [`errors`] – error types
//! - [`indexer`] / [`search`] – the two pipelines
//! - [`manifest`] – index build manifest and compatibility checks
//! - [`types`] – options, reports, progress events
//!
//! ## Example
//!
//! ```ignore
//! use scenic_core::{IndexOptions, ScenicEngine, SearchOptions};
//!
//! let engine = ScenicEngine::with_defaults()?;
//!
//! // One-time corpus build
//! let report = engine.build_index(&IndexOptions::new("photos/"), None)?;
//!
//! // Per-request search
//! let results = engine.search(&SearchOptions::new(
//!     "query.jpg",
//!     report.index_dir,
//! ))?;
//! for hit in results.hits {
//!     println!("{}  {:.3}", hit.record.path, hit.distance);
//! }
//! ```

// Modules
pub mod config;
pub mod corpus;
pub mod engine;
pub mod errors;
pub mod indexer;
pub mod manifest;
pub mod search;
pub mod types;

#[cfg(test)]
mod test_util;

// Re-exports for convenience
pub use config::{
    CorpusConfig, GlobalConfig, IndexSettings, CORPUS_CONFIG_FILENAME, DEFAULT_BATCH_SIZE,
    GLOBAL_CONFIG_FILENAME, SCENIC_HOME_DIR,
};
pub use corpus::{
    label_count, located_count, scan_corpus, CorpusEntry, IMAGE_EXTENSIONS, LOCATIONS_FILENAME,
};
pub use engine::ScenicEngine;
pub use errors::ScenicError;
pub use indexer::run_index;
pub use manifest::{
    check_model_compatibility, manifest_path, read_manifest, write_manifest, IndexManifest,
    MANIFEST_FILENAME, MANIFEST_VERSION,
};
pub use search::run_search;
pub use types::{
    default_index_dir, IndexOptions, IndexReport, ProgressEvent, ProgressFn, SearchOptions,
    SearchReport, DEFAULT_TOP_K, INDEX_DIR_NAME,
};

// Layer re-exports so CLI code needs only scenic-core
pub use scenic_index::{
    GeoPoint, IndexConfig, IndexError, ItemId, ItemRecord, Metric, SearchHit, VectorIndex,
    DEFAULT_TREE_COUNT, INDEX_FILENAME,
};
pub use scenic_model::{
    Backbone, DevicePreference, EmbeddingConfig, ImageEmbedder, ModelError, ModelInfo,
};
