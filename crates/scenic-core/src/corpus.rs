//! Corpus scanning.
//!
//! A corpus is a directory tree of photos grouped by scene label:
//!
//! ```text
//! corpus/
//!   abbey/
//!     510471.jpg
//!     510905.jpg
//!     locations.json     # optional geo side-car
//!   beach/
//!     223401.jpg
//! ```
//!
//! The scan is deterministic: entries are sorted by relative path and get
//! dense ids `0..n` in that order, so re-running it over an unchanged tree
//! reproduces the same (id, photo) assignment. Hidden directories (including
//! the `.scenic` artifacts dir) are skipped.
//!
//! `locations.json` is a per-directory array of `{id, latitude, longitude}`
//! rows; rows are joined to photos by file stem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use scenic_index::{GeoPoint, ItemId, ItemRecord};

use crate::errors::ScenicError;

/// Geo side-car filename, one per corpus directory.
pub const LOCATIONS_FILENAME: &str = "locations.json";

/// Recognized image file extensions (lower-cased).
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff",
];

// ============================================================================
// CorpusEntry
// ============================================================================

/// One photo discovered by the scan, with its id and bound record.
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    /// Dense identifier assigned by scan order.
    pub id: ItemId,

    /// Absolute path, used for decoding.
    pub path: PathBuf,

    /// Record that will be bound to the photo's vector in the index.
    pub record: ItemRecord,
}

/// One row of a `locations.json` side-car.
#[derive(Debug, Deserialize)]
struct LocationRow {
    id: String,
    latitude: f64,
    longitude: f64,
}

// ============================================================================
// Scanning
// ============================================================================

/// Scan a corpus directory into ordered entries.
///
/// # Errors
///
/// - [`ScenicError::CorpusNotFound`] when `root` is not a directory
/// - [`ScenicError::EmptyCorpus`] when no images are found
/// - [`ScenicError::SidecarParse`] when a `locations.json` is malformed
pub fn scan_corpus(root: &Path) -> Result<Vec<CorpusEntry>, ScenicError> {
    if !root.is_dir() {
        return Err(ScenicError::CorpusNotFound(root.to_path_buf()));
    }

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !is_hidden(e))
    {
        let entry = entry.map_err(|e| {
            ScenicError::Io(std::io::Error::other(format!(
                "corpus walk failed: {e}"
            )))
        })?;
        if entry.file_type().is_file() && has_image_extension(entry.path()) {
            paths.push(entry.into_path());
        }
    }

    if paths.is_empty() {
        return Err(ScenicError::EmptyCorpus {
            path: root.to_path_buf(),
        });
    }

    // Sort by relative path for a stable id assignment.
    paths.sort();

    let mut location_tables: HashMap<PathBuf, HashMap<String, GeoPoint>> = HashMap::new();
    let mut entries = Vec::with_capacity(paths.len());
    for (idx, path) in paths.into_iter().enumerate() {
        let rel = path.strip_prefix(root).unwrap_or(&path);
        let photo_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut record = ItemRecord::new(rel.to_string_lossy().replace('\\', "/"))
            .with_photo_id(&photo_id);

        if let Some(label) = scene_label(rel) {
            record = record.with_label(label);
        }

        if let Some(parent) = path.parent() {
            if !location_tables.contains_key(parent) {
                let table = load_locations(parent)?;
                location_tables.insert(parent.to_path_buf(), table);
            }
            if let Some(point) = location_tables[parent].get(&photo_id) {
                record = record.with_location(*point);
            }
        }

        entries.push(CorpusEntry {
            id: ItemId::new(idx as u64),
            path,
            record,
        });
    }

    debug!("Scanned corpus {}: {} images", root.display(), entries.len());
    Ok(entries)
}

/// Count distinct labels among entries.
pub fn label_count(entries: &[CorpusEntry]) -> usize {
    let mut labels: Vec<&str> = entries
        .iter()
        .filter_map(|e| e.record.label.as_deref())
        .collect();
    labels.sort_unstable();
    labels.dedup();
    labels.len()
}

/// Count entries carrying geo coordinates.
pub fn located_count(entries: &[CorpusEntry]) -> usize {
    entries
        .iter()
        .filter(|e| e.record.location.is_some())
        .count()
}

// ============================================================================
// Helpers
// ============================================================================

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .map(|name| name.starts_with('.'))
            .unwrap_or(false)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Scene label = first directory component of the relative path.
fn scene_label(rel: &Path) -> Option<String> {
    let mut components = rel.components();
    let first = components.next()?;
    // A bare filename at the corpus root has no label.
    components.next()?;
    Some(first.as_os_str().to_string_lossy().into_owned())
}

/// Load a directory's geo side-car, empty when absent.
fn load_locations(dir: &Path) -> Result<HashMap<String, GeoPoint>, ScenicError> {
    let path = dir.join(LOCATIONS_FILENAME);
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let content = std::fs::read_to_string(&path)?;
    let rows: Vec<LocationRow> = serde_json::from_str(&content)
        .map_err(|e| ScenicError::sidecar_parse(&path, e.to_string()))?;

    let mut table = HashMap::with_capacity(rows.len());
    for row in rows {
        if row.latitude.abs() > 90.0 || row.longitude.abs() > 180.0 {
            warn!(
                "Skipping out-of-range coordinates for id {} in {}",
                row.id,
                path.display()
            );
            continue;
        }
        table.insert(row.id, GeoPoint::new(row.latitude, row.longitude));
    }
    debug!("Loaded {} locations from {}", table.len(), path.display());
    Ok(table)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::fs;
    use tempfile::TempDir;

    fn write_photo(dir: &Path, name: &str, color: [u8; 3]) {
        fs::create_dir_all(dir).unwrap();
        RgbImage::from_pixel(16, 16, Rgb(color))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_scan_orders_and_labels() {
        let temp = TempDir::new().unwrap();
        write_photo(&temp.path().join("beach"), "b.jpg", [0, 0, 200]);
        write_photo(&temp.path().join("abbey"), "a.jpg", [200, 0, 0]);
        write_photo(&temp.path().join("abbey"), "c.png", [0, 200, 0]);

        let entries = scan_corpus(temp.path()).unwrap();
        assert_eq!(entries.len(), 3);

        let paths: Vec<&str> = entries.iter().map(|e| e.record.path.as_str()).collect();
        assert_eq!(paths, vec!["abbey/a.jpg", "abbey/c.png", "beach/b.jpg"]);

        let ids: Vec<u64> = entries.iter().map(|e| e.id.value()).collect();
        assert_eq!(ids, vec![0, 1, 2]);

        assert_eq!(entries[0].record.label.as_deref(), Some("abbey"));
        assert_eq!(entries[2].record.label.as_deref(), Some("beach"));
        assert_eq!(entries[0].record.photo_id, "a");
        assert_eq!(label_count(&entries), 2);
    }

    #[test]
    fn test_scan_is_deterministic() {
        let temp = TempDir::new().unwrap();
        for label in ["zoo", "alley", "market"] {
            for n in 0..3 {
                write_photo(&temp.path().join(label), &format!("{n}.jpg"), [n as u8; 3]);
            }
        }

        let a: Vec<String> = scan_corpus(temp.path())
            .unwrap()
            .into_iter()
            .map(|e| e.record.path)
            .collect();
        let b: Vec<String> = scan_corpus(temp.path())
            .unwrap()
            .into_iter()
            .map(|e| e.record.path)
            .collect();
        assert_eq!(a, b);
    }

    #[test]
    fn test_locations_sidecar_joins_by_stem() {
        let temp = TempDir::new().unwrap();
        let abbey = temp.path().join("abbey");
        write_photo(&abbey, "510471.jpg", [10, 10, 10]);
        write_photo(&abbey, "999999.jpg", [20, 20, 20]);
        fs::write(
            abbey.join(LOCATIONS_FILENAME),
            r#"[{"id": "510471", "latitude": 51.5, "longitude": -0.12}]"#,
        )
        .unwrap();

        let entries = scan_corpus(temp.path()).unwrap();
        let located: Vec<_> = entries
            .iter()
            .filter(|e| e.record.location.is_some())
            .collect();
        assert_eq!(located.len(), 1);
        assert_eq!(located[0].record.photo_id, "510471");
        assert_eq!(located[0].record.location.unwrap().latitude, 51.5);
        assert_eq!(located_count(&entries), 1);
    }

    #[test]
    fn test_invalid_sidecar_aborts() {
        let temp = TempDir::new().unwrap();
        let abbey = temp.path().join("abbey");
        write_photo(&abbey, "1.jpg", [1, 1, 1]);
        fs::write(abbey.join(LOCATIONS_FILENAME), "not json").unwrap();

        assert!(matches!(
            scan_corpus(temp.path()).unwrap_err(),
            ScenicError::SidecarParse { .. }
        ));
    }

    #[test]
    fn test_out_of_range_coordinates_skipped() {
        let temp = TempDir::new().unwrap();
        let abbey = temp.path().join("abbey");
        write_photo(&abbey, "1.jpg", [1, 1, 1]);
        fs::write(
            abbey.join(LOCATIONS_FILENAME),
            r#"[{"id": "1", "latitude": 123.0, "longitude": 0.0}]"#,
        )
        .unwrap();

        let entries = scan_corpus(temp.path()).unwrap();
        assert!(entries[0].record.location.is_none());
    }

    #[test]
    fn test_hidden_dirs_and_non_images_skipped() {
        let temp = TempDir::new().unwrap();
        write_photo(&temp.path().join("abbey"), "1.jpg", [1, 1, 1]);
        write_photo(&temp.path().join(".scenic"), "cached.jpg", [2, 2, 2]);
        fs::write(temp.path().join("abbey").join("notes.txt"), "hi").unwrap();

        let entries = scan_corpus(temp.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].record.path, "abbey/1.jpg");
    }

    #[test]
    fn test_empty_corpus() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            scan_corpus(temp.path()).unwrap_err(),
            ScenicError::EmptyCorpus { .. }
        ));
    }

    #[test]
    fn test_missing_corpus() {
        assert!(matches!(
            scan_corpus(Path::new("/nonexistent/corpus")).unwrap_err(),
            ScenicError::CorpusNotFound(_)
        ));
    }

    #[test]
    fn test_root_level_photo_has_no_label() {
        let temp = TempDir::new().unwrap();
        write_photo(temp.path(), "loose.jpg", [5, 5, 5]);

        let entries = scan_corpus(temp.path()).unwrap();
        assert_eq!(entries[0].record.label, None);
        assert_eq!(label_count(&entries), 0);
    }
}
