//! The vector index state machine.
//!
//! A [`VectorIndex`] accepts insertions while unbuilt, is finalized exactly
//! once with [`VectorIndex::build`], and serves top-K queries afterwards.
//! There is no incremental rebuild: changing a built index means creating a
//! fresh one and re-inserting the corpus.

use std::collections::HashSet;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{IndexError, IndexResult};
use crate::forest::{self, Forest};
use crate::types::{IndexItem, ItemId, ItemRecord, Metric, SearchHit};

/// Default number of trees for `build()` when the caller has no preference.
///
/// More trees raise recall at the cost of build time and memory.
pub const DEFAULT_TREE_COUNT: usize = 16;

// ============================================================================
// IndexConfig
// ============================================================================

/// Construction-time parameters of a [`VectorIndex`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, Encode, Decode)]
pub struct IndexConfig {
    /// Distance metric; cannot change without a rebuild.
    pub metric: Metric,

    /// Base seed for hyperplane sampling. With a seed, `build()` is fully
    /// reproducible; without one, each build draws fresh entropy.
    pub seed: Option<u64>,
}

impl IndexConfig {
    /// Create a config with the given metric and no seed.
    pub fn with_metric(metric: Metric) -> Self {
        Self { metric, seed: None }
    }

    /// Set the build seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

// ============================================================================
// VectorIndex
// ============================================================================

/// Approximate nearest-neighbor index over (id, vector, record) items.
///
/// See the crate docs for the lifecycle. The vector dimension is fixed by
/// the first insertion; every later insert and every query vector must match
/// it.
#[derive(Debug)]
pub struct VectorIndex {
    pub(crate) config: IndexConfig,
    pub(crate) dimension: Option<usize>,
    pub(crate) items: Vec<IndexItem>,
    pub(crate) forest: Option<Forest>,
    ids: HashSet<ItemId>,
}

impl VectorIndex {
    /// Create a fresh, unbuilt index.
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config,
            dimension: None,
            items: Vec::new(),
            forest: None,
            ids: HashSet::new(),
        }
    }

    /// Reassemble an index from snapshot parts. Only called by the store.
    pub(crate) fn from_parts(
        config: IndexConfig,
        dimension: Option<usize>,
        items: Vec<IndexItem>,
        forest: Forest,
    ) -> Self {
        let ids = items.iter().map(|item| item.id).collect();
        Self {
            config,
            dimension,
            items,
            forest: Some(forest),
            ids,
        }
    }

    /// Insert an item. Valid only while the index is unbuilt.
    ///
    /// # Errors
    ///
    /// - [`IndexError::AlreadyBuilt`] after `build()`
    /// - [`IndexError::DimensionMismatch`] when the vector length differs
    ///   from the dimension fixed by the first insert
    /// - [`IndexError::DuplicateId`] when the id was already inserted
    pub fn insert(&mut self, item: IndexItem) -> IndexResult<()> {
        if self.forest.is_some() {
            return Err(IndexError::AlreadyBuilt);
        }
        if let Some(expected) = self.dimension {
            if item.vector.len() != expected {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    actual: item.vector.len(),
                });
            }
        }
        if !self.ids.insert(item.id) {
            return Err(IndexError::DuplicateId(item.id));
        }

        self.dimension.get_or_insert(item.vector.len());
        trace!("Inserted item {} ({})", item.id, item.record.path);
        self.items.push(item);
        Ok(())
    }

    /// Finalize the index by building `trees` space-partitioning trees.
    ///
    /// Higher tree counts trade build time and memory for query recall.
    /// Calling `build()` twice is a caller bug.
    ///
    /// # Errors
    ///
    /// - [`IndexError::AlreadyBuilt`] on a second call
    /// - [`IndexError::InvalidTreeCount`] for `trees == 0`
    pub fn build(&mut self, trees: usize) -> IndexResult<()> {
        if self.forest.is_some() {
            return Err(IndexError::AlreadyBuilt);
        }
        if trees == 0 {
            return Err(IndexError::InvalidTreeCount(trees));
        }

        let forest = forest::build_forest(&self.items, self.config.metric, trees, self.config.seed);
        debug!(
            "Index built: {} items, {} trees, metric {}",
            self.items.len(),
            trees,
            self.config.metric
        );
        self.forest = Some(forest);
        Ok(())
    }

    /// Query the `top_k` nearest items, ascending by distance.
    ///
    /// Results are approximate: each query inspects roughly
    /// `trees * top_k` candidates gathered from the forest, then re-ranks
    /// them by true distance. A `top_k` larger than the item count returns
    /// every item, ranked.
    ///
    /// # Errors
    ///
    /// - [`IndexError::NotBuilt`] before `build()`
    /// - [`IndexError::DimensionMismatch`] when the query vector length
    ///   differs from the indexed dimension
    pub fn query(&self, vector: &[f32], top_k: usize) -> IndexResult<Vec<SearchHit>> {
        let forest = self.forest.as_ref().ok_or(IndexError::NotBuilt)?;

        if let Some(expected) = self.dimension {
            if vector.len() != expected {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }
        if top_k == 0 || self.items.is_empty() {
            return Ok(Vec::new());
        }

        let search_k = top_k.saturating_mul(forest.tree_count()).max(top_k);
        let candidates = forest::query_candidates(forest, vector, search_k);
        trace!(
            "Query gathered {} candidates (search_k={})",
            candidates.len(),
            search_k
        );

        let mut hits: Vec<SearchHit> = candidates
            .into_iter()
            .map(|slot| {
                let item = &self.items[slot as usize];
                SearchHit {
                    id: item.id,
                    distance: self.config.metric.distance(vector, &item.vector),
                    record: item.record.clone(),
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    /// Look up the record bound to an id.
    pub fn record(&self, id: ItemId) -> Option<&ItemRecord> {
        self.items.iter().find(|item| item.id == id).map(|item| &item.record)
    }

    /// Number of indexed items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the index holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Vector dimension, once fixed by the first insert.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// The configured distance metric.
    pub fn metric(&self) -> Metric {
        self.config.metric
    }

    /// Whether `build()` has run.
    pub fn is_built(&self) -> bool {
        self.forest.is_some()
    }

    /// Number of trees in the built forest (0 while unbuilt).
    pub fn tree_count(&self) -> usize {
        self.forest.as_ref().map_or(0, Forest::tree_count)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GeoPoint;

    fn item(id: u64, vector: Vec<f32>) -> IndexItem {
        IndexItem::new(
            ItemId::new(id),
            vector,
            ItemRecord::new(format!("photo-{id}.jpg")),
        )
    }

    fn built_index(vectors: Vec<Vec<f32>>) -> VectorIndex {
        let mut index = VectorIndex::new(IndexConfig::default().with_seed(42));
        for (i, v) in vectors.into_iter().enumerate() {
            index.insert(item(i as u64, v)).unwrap();
        }
        index.build(8).unwrap();
        index
    }

    #[test]
    fn test_self_retrieval() {
        let index = built_index(vec![
            vec![1.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.0, 0.0, 1.0],
        ]);

        let hits = index.query(&[0.0, 1.0, 0.0], 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, ItemId::new(1));
        assert!(hits[0].distance.abs() < 1e-6);
    }

    #[test]
    fn test_cosine_ranking_matches_reference_scenario() {
        // Three 2-d vectors: the exact match first, then the near neighbor.
        let index = built_index(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.9, 0.1]]);

        let hits = index.query(&[1.0, 0.0], 2).unwrap();
        let ids: Vec<u64> = hits.iter().map(|h| h.id.value()).collect();
        assert_eq!(ids, vec![0, 2]);
        assert!(hits[0].distance < hits[1].distance);
    }

    #[test]
    fn test_distances_ascending() {
        let index = built_index(vec![
            vec![1.0, 0.0],
            vec![0.8, 0.6],
            vec![0.0, 1.0],
            vec![-1.0, 0.0],
        ]);

        let hits = index.query(&[1.0, 0.0], 4).unwrap();
        for pair in hits.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[test]
    fn test_insert_after_build_fails() {
        let mut index = built_index(vec![vec![1.0, 0.0]]);
        let err = index.insert(item(99, vec![0.0, 1.0])).unwrap_err();
        assert!(matches!(err, IndexError::AlreadyBuilt));
    }

    #[test]
    fn test_query_before_build_fails() {
        let mut index = VectorIndex::new(IndexConfig::default());
        index.insert(item(0, vec![1.0, 0.0])).unwrap();
        let err = index.query(&[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, IndexError::NotBuilt));
    }

    #[test]
    fn test_double_build_fails() {
        let mut index = built_index(vec![vec![1.0, 0.0]]);
        let err = index.build(8).unwrap_err();
        assert!(matches!(err, IndexError::AlreadyBuilt));
    }

    #[test]
    fn test_zero_trees_rejected() {
        let mut index = VectorIndex::new(IndexConfig::default());
        index.insert(item(0, vec![1.0, 0.0])).unwrap();
        let err = index.build(0).unwrap_err();
        assert!(matches!(err, IndexError::InvalidTreeCount(0)));
    }

    #[test]
    fn test_insert_dimension_mismatch() {
        let mut index = VectorIndex::new(IndexConfig::default());
        index.insert(item(0, vec![1.0, 0.0, 0.0])).unwrap();
        let err = index.insert(item(1, vec![1.0, 0.0])).unwrap_err();
        match err {
            IndexError::DimensionMismatch { expected, actual } => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected DimensionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_query_dimension_mismatch() {
        let index = built_index(vec![vec![1.0, 0.0, 0.0]]);
        let err = index.query(&[1.0, 0.0], 1).unwrap_err();
        assert!(matches!(err, IndexError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let mut index = VectorIndex::new(IndexConfig::default());
        index.insert(item(7, vec![1.0, 0.0])).unwrap();
        let err = index.insert(item(7, vec![0.0, 1.0])).unwrap_err();
        assert!(matches!(err, IndexError::DuplicateId(id) if id.value() == 7));
    }

    #[test]
    fn test_top_k_exceeding_len_returns_all() {
        let index = built_index(vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.5, 0.5]]);

        let hits = index.query(&[1.0, 0.0], 50).unwrap();
        assert_eq!(hits.len(), 3);
        for pair in hits.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
    }

    #[test]
    fn test_empty_index_builds_and_queries_empty() {
        let mut index = VectorIndex::new(IndexConfig::default());
        index.build(4).unwrap();
        let hits = index.query(&[1.0, 0.0], 5).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_seeded_queries_reproducible() {
        let vectors: Vec<Vec<f32>> = (0..120)
            .map(|i| {
                let a = i as f32 * 0.21;
                vec![a.cos(), a.sin(), (a * 0.5).cos()]
            })
            .collect();

        let a = built_index(vectors.clone());
        let b = built_index(vectors);

        let query = [0.6, 0.7, 0.2];
        let hits_a: Vec<u64> = a.query(&query, 10).unwrap().iter().map(|h| h.id.value()).collect();
        let hits_b: Vec<u64> = b.query(&query, 10).unwrap().iter().map(|h| h.id.value()).collect();
        assert_eq!(hits_a, hits_b);
    }

    #[test]
    fn test_record_travels_with_hit() {
        let mut index = VectorIndex::new(IndexConfig::default().with_seed(1));
        let record = ItemRecord::new("abbey/321.jpg")
            .with_label("abbey")
            .with_photo_id("321")
            .with_location(GeoPoint::new(48.85, 2.35));
        index
            .insert(IndexItem::new(ItemId::new(0), vec![1.0, 0.0], record))
            .unwrap();
        index.build(4).unwrap();

        let hits = index.query(&[1.0, 0.0], 1).unwrap();
        assert_eq!(hits[0].record.label.as_deref(), Some("abbey"));
        assert_eq!(hits[0].record.location.unwrap().longitude, 2.35);
        assert_eq!(index.record(ItemId::new(0)).unwrap().path, "abbey/321.jpg");
    }

    #[test]
    fn test_larger_corpus_recall_of_exact_match() {
        let vectors: Vec<Vec<f32>> = (0..500)
            .map(|i| {
                let a = i as f32 * 0.13;
                vec![a.cos(), a.sin(), (a * 0.7).sin(), (a * 0.3).cos()]
            })
            .collect();
        let index = built_index(vectors.clone());

        // Querying with an indexed vector returns that item first.
        for probe in [0usize, 123, 499] {
            let hits = index.query(&vectors[probe], 3).unwrap();
            assert_eq!(hits[0].id.value(), probe as u64);
            assert!(hits[0].distance.abs() < 1e-5);
        }
    }
}
