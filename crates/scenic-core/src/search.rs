//! Query pipeline.
//!
//! Loads the manifest, refuses a mismatched embedder, loads the snapshot,
//! embeds the query image, and runs a top-K query. Hits come back with
//! their bound records; presentation (tables, geocoding) happens upstream.

use tracing::info;

use scenic_model::ImageEmbedder;

use crate::errors::ScenicError;
use crate::manifest::{check_model_compatibility, read_manifest};
use crate::types::{SearchOptions, SearchReport};

/// Run one similarity search against a built index.
///
/// The embedder must match the one recorded in the index manifest; mixing
/// extractors silently corrupts distances, so the check is a hard error.
pub fn run_search(
    embedder: &dyn ImageEmbedder,
    options: &SearchOptions,
) -> Result<SearchReport, ScenicError> {
    let manifest = read_manifest(&options.index_dir)?;
    check_model_compatibility(&manifest, embedder.model_info())?;

    if !options.query.is_file() {
        return Err(ScenicError::QueryNotFound(options.query.clone()));
    }

    let index = scenic_index::load_index(&options.index_dir)?;
    let vector = embedder.embed_file(&options.query)?;
    let hits = index.query(&vector, options.top_k)?;

    info!(
        "Search over {} items returned {} hits (top_k={})",
        index.len(),
        hits.len(),
        options.top_k
    );

    Ok(SearchReport {
        hits,
        model: manifest.model,
        total_items: index.len(),
    })
}

// ============================================================================
// Tests
// ============================================================================
