//! # scenic-index
//!
//! ANN layer for Scenic - approximate nearest-neighbor search over image
//! embeddings.
//!
//! This crate provides the vector index that `scenic-core` builds once per
//! corpus and queries per request. The index is a forest of random-hyperplane
//! trees: each tree recursively partitions the embedding space, and a query
//! walks all trees with a shared priority queue before re-ranking the
//! gathered candidates by true distance.
//!
//! ## Lifecycle
//!
//! ```text
//! VectorIndex::new()  --insert()*-->  unbuilt  --build(trees)-->  built
//!                                                                   |
//!                                                  query() / save_index()
//! ```
//!
//! The transition is strictly one-way: inserting after `build()` or querying
//! before it is a caller bug and fails with [`IndexError`]. A built index is
//! read-only and safe to query from multiple threads.
//!
//! Every vector is inserted together with its [`ItemRecord`] (path, label,
//! geo location), so query hits come back with their metadata attached and
//! there is no separate identifier table to keep in sync.
//!
//! ## Usage
//!
//! ```ignore
//! use scenic_index::{IndexConfig, IndexItem, ItemId, ItemRecord, VectorIndex};
//!
//! let mut index = VectorIndex::new(IndexConfig::default());
//! index.insert(IndexItem::new(ItemId::new(0), embedding, record))?;
//! index.build(16)?;
//!
//! let hits = index.query(&query_embedding, 5)?;
//! ```

pub mod error;
mod forest;
pub mod index;
pub mod store;
pub mod types;

pub use error::{IndexError, IndexResult};
pub use index::{IndexConfig, VectorIndex, DEFAULT_TREE_COUNT};
pub use store::{load_index, save_index, INDEX_FILENAME, SNAPSHOT_VERSION};
pub use types::{GeoPoint, IndexItem, ItemId, ItemRecord, Metric, SearchHit};
