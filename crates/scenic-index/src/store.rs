//! Index snapshot persistence.
//!
//! A built index round-trips through a single bincode file so that indexing
//! and querying can run as separate processes. Storage layout:
//!
//! ```text
//! <index_dir>/
//! ├── index.bin     # Serialized snapshot (this module)
//! └── meta.json     # Build manifest, written by scenic-core
//! ```
//!
//! Only built indexes can be saved; loading yields a built, read-only index.
//! The snapshot embeds a version number so incompatible files fail with a
//! clear error instead of garbage results.

use std::fs;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use bincode::config;
use bincode::{Decode, Encode};
use tracing::debug;

use crate::error::{IndexError, IndexResult};
use crate::forest::Forest;
use crate::index::{IndexConfig, VectorIndex};
use crate::types::IndexItem;

/// Filename for the serialized index snapshot.
pub const INDEX_FILENAME: &str = "index.bin";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Borrowed view of an index, encoded on save without cloning the items.
///
/// Fields encode in the same order [`IndexSnapshot`] declares them, which is
/// what keeps the two formats interchangeable.
struct SnapshotRef<'a> {
    version: u32,
    config: &'a IndexConfig,
    dimension: Option<usize>,
    items: &'a Vec<IndexItem>,
    forest: &'a Forest,
}

impl Encode for SnapshotRef<'_> {
    fn encode<E: bincode::enc::Encoder>(
        &self,
        encoder: &mut E,
    ) -> Result<(), bincode::error::EncodeError> {
        self.version.encode(encoder)?;
        self.config.encode(encoder)?;
        self.dimension.encode(encoder)?;
        self.items.encode(encoder)?;
        self.forest.encode(encoder)
    }
}

/// Owned snapshot, decoded on load.
#[derive(Decode)]
struct IndexSnapshot {
    version: u32,
    config: IndexConfig,
    dimension: Option<usize>,
    items: Vec<IndexItem>,
    forest: Forest,
}

/// Get the snapshot file path inside an index directory.
pub fn index_path(index_dir: &Path) -> PathBuf {
    index_dir.join(INDEX_FILENAME)
}

/// Save a built index to `index_dir`, creating the directory if needed.
///
/// # Errors
///
/// - [`IndexError::NotBuilt`] when the index was never finalized
/// - [`IndexError::SnapshotIo`] / [`IndexError::SnapshotParse`] on
///   filesystem or encoding failures
pub fn save_index(index: &VectorIndex, index_dir: &Path) -> IndexResult<()> {
    let forest = index.forest.as_ref().ok_or(IndexError::NotBuilt)?;

    fs::create_dir_all(index_dir)
        .map_err(|e| IndexError::snapshot_io(index_dir, format!("Failed to create index directory: {e}")))?;

    let file_path = index_path(index_dir);
    let file = fs::File::create(&file_path)
        .map_err(|e| IndexError::snapshot_io(&file_path, format!("Failed to create snapshot file: {e}")))?;
    let mut writer = BufWriter::new(file);

    let snapshot = SnapshotRef {
        version: SNAPSHOT_VERSION,
        config: &index.config,
        dimension: index.dimension,
        items: &index.items,
        forest,
    };
    bincode::encode_into_std_write(&snapshot, &mut writer, config::standard())
        .map_err(|e| IndexError::snapshot_parse(&file_path, format!("Failed to serialize index: {e}")))?;

    debug!(
        "Saved index snapshot to {}: {} items, {} trees",
        file_path.display(),
        index.len(),
        index.tree_count()
    );
    Ok(())
}

/// Load a built index from `index_dir`.
///
/// # Errors
///
/// - [`IndexError::SnapshotNotFound`] when no snapshot file exists
/// - [`IndexError::SnapshotVersion`] when the file was written by an
///   incompatible version
/// - [`IndexError::SnapshotIo`] / [`IndexError::SnapshotParse`] on
///   filesystem or decoding failures
pub fn load_index(index_dir: &Path) -> IndexResult<VectorIndex> {
    let file_path = index_path(index_dir);
    if !file_path.exists() {
        return Err(IndexError::SnapshotNotFound { path: file_path });
    }

    let file = fs::File::open(&file_path)
        .map_err(|e| IndexError::snapshot_io(&file_path, format!("Failed to open snapshot file: {e}")))?;
    let mut reader = BufReader::new(file);

    let snapshot: IndexSnapshot =
        bincode::decode_from_std_read(&mut reader, config::standard())
            .map_err(|e| IndexError::snapshot_parse(&file_path, format!("Failed to deserialize index: {e}")))?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(IndexError::SnapshotVersion {
            found: snapshot.version,
            expected: SNAPSHOT_VERSION,
        });
    }

    let index = VectorIndex::from_parts(
        snapshot.config,
        snapshot.dimension,
        snapshot.items,
        snapshot.forest,
    );
    debug!(
        "Loaded index snapshot from {}: {} items, {} trees",
        file_path.display(),
        index.len(),
        index.tree_count()
    );
    Ok(index)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemId, ItemRecord};
    use tempfile::TempDir;

    fn build_test_index() -> VectorIndex {
        let mut index = VectorIndex::new(IndexConfig::default().with_seed(9));
        for (i, v) in [
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.9, 0.1],
            vec![-0.5, 0.5],
        ]
        .into_iter()
        .enumerate()
        {
            let record = ItemRecord::new(format!("photos/{i}.jpg")).with_photo_id(i.to_string());
            index
                .insert(IndexItem::new(ItemId::new(i as u64), v, record))
                .unwrap();
        }
        index.build(4).unwrap();
        index
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let original = build_test_index();
        save_index(&original, temp.path()).unwrap();

        let loaded = load_index(temp.path()).unwrap();
        assert!(loaded.is_built());
        assert_eq!(loaded.len(), original.len());
        assert_eq!(loaded.dimension(), original.dimension());
        assert_eq!(loaded.tree_count(), original.tree_count());

        let query = [1.0, 0.0];
        let before: Vec<u64> = original
            .query(&query, 3)
            .unwrap()
            .iter()
            .map(|h| h.id.value())
            .collect();
        let after: Vec<u64> = loaded
            .query(&query, 3)
            .unwrap()
            .iter()
            .map(|h| h.id.value())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_loaded_index_rejects_inserts() {
        let temp = TempDir::new().unwrap();
        save_index(&build_test_index(), temp.path()).unwrap();

        let mut loaded = load_index(temp.path()).unwrap();
        let err = loaded
            .insert(IndexItem::new(
                ItemId::new(99),
                vec![0.0, 0.0],
                ItemRecord::new("late.jpg"),
            ))
            .unwrap_err();
        assert!(matches!(err, IndexError::AlreadyBuilt));
    }

    #[test]
    fn test_save_unbuilt_fails() {
        let temp = TempDir::new().unwrap();
        let mut index = VectorIndex::new(IndexConfig::default());
        index
            .insert(IndexItem::new(
                ItemId::new(0),
                vec![1.0],
                ItemRecord::new("a.jpg"),
            ))
            .unwrap();

        let err = save_index(&index, temp.path()).unwrap_err();
        assert!(matches!(err, IndexError::NotBuilt));
    }

    #[test]
    fn test_load_missing_snapshot() {
        let temp = TempDir::new().unwrap();
        let err = load_index(temp.path()).unwrap_err();
        assert!(matches!(err, IndexError::SnapshotNotFound { .. }));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let temp = TempDir::new().unwrap();
        let original = build_test_index();

        // Hand-write a snapshot with a bumped version field.
        let file = fs::File::create(index_path(temp.path())).unwrap();
        let mut writer = BufWriter::new(file);
        let snapshot = SnapshotRef {
            version: SNAPSHOT_VERSION + 1,
            config: &original.config,
            dimension: original.dimension,
            items: &original.items,
            forest: original.forest.as_ref().unwrap(),
        };
        bincode::encode_into_std_write(&snapshot, &mut writer, config::standard()).unwrap();
        drop(writer);

        let err = load_index(temp.path()).unwrap_err();
        assert!(matches!(
            err,
            IndexError::SnapshotVersion { found, expected }
                if found == SNAPSHOT_VERSION + 1 && expected == SNAPSHOT_VERSION
        ));
    }
}
