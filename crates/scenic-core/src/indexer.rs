//! Corpus indexing pipeline.
//!
//! One pass over the corpus: scan → decode and embed in batches → insert
//! bound items into a fresh index → build the forest → persist snapshot and
//! manifest. The first failure aborts the whole run; a partially filled,
//! unbuilt index is not usable and is never written to disk, so a retry
//! starts from scratch with nothing to clean up.

use std::time::Instant;

use image::DynamicImage;
use rayon::prelude::*;
use tracing::{info, warn};

use scenic_index::{IndexConfig, IndexItem, VectorIndex};
use scenic_model::{ImageEmbedder, ModelError};

use crate::config::IndexSettings;
use crate::corpus::{self, CorpusEntry};
use crate::errors::ScenicError;
use crate::manifest::{write_manifest, IndexManifest};
use crate::types::{emit, IndexOptions, IndexReport, ProgressEvent, ProgressFn};

/// Run the corpus indexing pipeline.
///
/// `settings` must already be resolved (see [`IndexSettings::merged`]);
/// [`crate::engine::ScenicEngine::build_index`] does that and creates the
/// embedder. Taking the embedder as a trait object keeps the pipeline
/// testable without model weights.
pub fn run_index(
    embedder: &dyn ImageEmbedder,
    options: &IndexOptions,
    settings: &IndexSettings,
    progress: Option<ProgressFn<'_>>,
) -> Result<IndexReport, ScenicError> {
    let start = Instant::now();
    settings.validate()?;

    let entries = corpus::scan_corpus(&options.corpus)?;
    let total = entries.len();
    emit(progress, ProgressEvent::ScanComplete { total });
    info!(
        "Indexing {} images from {} ({} backbone)",
        total,
        options.corpus.display(),
        embedder.model_info().backbone
    );

    if let Err(e) = embedder.warm_up() {
        warn!("Embedder warm-up failed (non-fatal): {e}");
    }

    let mut index = VectorIndex::new(IndexConfig {
        metric: settings.metric,
        seed: settings.seed,
    });

    let mut done = 0;
    for chunk in entries.chunks(settings.batch_size) {
        let images = decode_batch(chunk)?;
        let vectors = embedder.embed_images(&images)?;

        for (entry, vector) in chunk.iter().zip(vectors) {
            index.insert(IndexItem::new(entry.id, vector, entry.record.clone()))?;
        }

        done += chunk.len();
        emit(progress, ProgressEvent::Embedded { done, total });
    }

    emit(
        progress,
        ProgressEvent::Building {
            trees: settings.trees,
        },
    );
    index.build(settings.trees)?;

    emit(progress, ProgressEvent::Saving);
    let index_dir = options.resolved_index_dir();
    scenic_index::save_index(&index, &index_dir)?;

    let manifest = IndexManifest::new(
        embedder.model_info().clone(),
        settings.metric,
        settings.trees,
        settings.seed,
        index.len(),
    );
    write_manifest(&index_dir, &manifest)?;

    let report = IndexReport {
        items: index.len(),
        dimension: index.dimension().unwrap_or(0),
        trees: settings.trees,
        labels: corpus::label_count(&entries),
        with_location: corpus::located_count(&entries),
        index_dir,
        elapsed_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        "Indexed {} items ({} labels) in {}ms",
        report.items, report.labels, report.elapsed_ms
    );
    Ok(report)
}

/// Decode one batch in parallel, aborting on the first failure.
fn decode_batch(chunk: &[CorpusEntry]) -> Result<Vec<DynamicImage>, ScenicError> {
    chunk
        .par_iter()
        .map(|entry| {
            image::open(&entry.path)
                .map_err(|e| ModelError::image_decode(&entry.path, e.to_string()).into())
        })
        .collect()
}

// ============================================================================
// Tests
// ============================================================================
