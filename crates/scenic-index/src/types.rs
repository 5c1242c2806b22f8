//! Vector index core types.
//!
//! The central design decision here is that metadata travels WITH the vector:
//! [`IndexItem`] binds an identifier, an embedding, and an [`ItemRecord`]
//! into one value that is inserted atomically, and [`SearchHit`] returns the
//! record alongside the distance. Keeping a separate id-to-path table in sync
//! with the index is exactly the kind of latent bug this avoids.

use std::fmt;
use std::str::FromStr;

use bincode::{Decode, Encode};
use serde::{Deserialize, Serialize};

// ============================================================================
// ItemId
// ============================================================================

/// Identifier of an item in the index.
///
/// Dense integers assigned by the corpus scan; a u64 keeps the snapshot
/// format stable even for corpora that will never need the range.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Encode, Decode,
)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Create a new item ID.
    pub fn new(id: u64) -> Self {
        ItemId(id)
    }

    /// Get the underlying ID value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        ItemId(id)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Metric
// ============================================================================

/// Distance metric for similarity search.
///
/// Fixed when the index is created; changing it requires a rebuild.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Encode, Decode,
)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Cosine distance, `1 - cos(a, b)` (default).
    #[default]
    Cosine,
    /// Euclidean (L2) distance.
    Euclidean,
}

impl Metric {
    /// Get the metric name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Euclidean => "euclidean",
        }
    }

    /// Distance between two vectors of equal length under this metric.
    ///
    /// Lower is closer for both variants.
    pub(crate) fn distance(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::Cosine => cosine_distance(a, b),
            Metric::Euclidean => euclidean_distance(a, b),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cosine" | "angular" => Ok(Metric::Cosine),
            "euclidean" | "l2" => Ok(Metric::Euclidean),
            other => Err(format!(
                "Unknown metric `{other}`. Valid options: cosine, euclidean"
            )),
        }
    }
}

// ============================================================================
// GeoPoint
// ============================================================================

/// Geographic coordinates attached to a corpus photo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new geo point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.5}, {:.5}", self.latitude, self.longitude)
    }
}

// ============================================================================
// ItemRecord
// ============================================================================

/// Metadata bound to an indexed vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Encode, Decode)]
pub struct ItemRecord {
    /// Source path of the photo, relative to the corpus root.
    pub path: String,

    /// Scene label, taken from the photo's directory (e.g. "abbey").
    #[serde(default)]
    pub label: Option<String>,

    /// Photo identifier (file stem), used to join geo side-car tables.
    #[serde(default)]
    pub photo_id: String,

    /// Geographic location, when the corpus carries one for this photo.
    #[serde(default)]
    pub location: Option<GeoPoint>,
}

impl ItemRecord {
    /// Create a record with just a source path.
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            label: None,
            photo_id: String::new(),
            location: None,
        }
    }

    /// Set the scene label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the photo identifier.
    pub fn with_photo_id(mut self, photo_id: impl Into<String>) -> Self {
        self.photo_id = photo_id.into();
        self
    }

    /// Set the geographic location.
    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }
}

// ============================================================================
// IndexItem
// ============================================================================

/// A vector plus its bound metadata, inserted into the index as one unit.
#[derive(Debug, Clone, Serialize, Deserialize, Encode, Decode)]
pub struct IndexItem {
    /// Identifier for this item.
    pub id: ItemId,

    /// The embedding vector.
    pub vector: Vec<f32>,

    /// Metadata bound to the vector.
    pub record: ItemRecord,
}

impl IndexItem {
    /// Create a new index item.
    pub fn new(id: impl Into<ItemId>, vector: Vec<f32>, record: ItemRecord) -> Self {
        Self {
            id: id.into(),
            vector,
            record,
        }
    }
}

// ============================================================================
// SearchHit
// ============================================================================

/// A single result of a top-K query, ranked ascending by `distance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    /// Identifier of the matched item.
    pub id: ItemId,

    /// Distance to the query vector under the index metric (lower is closer).
    pub distance: f32,

    /// Metadata bound to the matched item.
    pub record: ItemRecord,
}

// ============================================================================
// Distance functions
// ============================================================================

/// Compute cosine distance (`1 - cosine similarity`) between two vectors.
///
/// A zero-norm vector has no direction; its distance to anything is 1.
fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }

    1.0 - dot / (norm_a * norm_b)
}

/// Compute Euclidean (L2) distance between two vectors.
fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_id() {
        let id = ItemId::new(123);
        assert_eq!(id.value(), 123);
        assert_eq!(id.to_string(), "123");

        let id_from_u64: ItemId = 456u64.into();
        assert_eq!(id_from_u64.value(), 456);
    }

    #[test]
    fn test_metric_parse() {
        assert_eq!("cosine".parse::<Metric>().unwrap(), Metric::Cosine);
        assert_eq!("angular".parse::<Metric>().unwrap(), Metric::Cosine);
        assert_eq!("L2".parse::<Metric>().unwrap(), Metric::Euclidean);
        assert!("hamming".parse::<Metric>().is_err());
        assert_eq!(Metric::default(), Metric::Cosine);
    }

    #[test]
    fn test_cosine_distance() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert!(cosine_distance(&a, &b).abs() < 1e-6);

        let c = vec![0.0, 1.0, 0.0];
        assert!((cosine_distance(&a, &c) - 1.0).abs() < 1e-6);

        // Zero-norm input never divides by zero.
        let z = vec![0.0, 0.0, 0.0];
        assert!((cosine_distance(&a, &z) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_distance_scale_invariant() {
        let a = vec![1.0, 2.0, 3.0];
        let b: Vec<f32> = a.iter().map(|x| x * 7.5).collect();
        assert!(cosine_distance(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_euclidean_distance() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![3.0, 4.0, 0.0];
        assert!((euclidean_distance(&a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn test_item_record_builder() {
        let record = ItemRecord::new("abbey/0001.jpg")
            .with_label("abbey")
            .with_photo_id("0001")
            .with_location(GeoPoint::new(51.5, -0.12));

        assert_eq!(record.path, "abbey/0001.jpg");
        assert_eq!(record.label.as_deref(), Some("abbey"));
        assert_eq!(record.photo_id, "0001");
        assert_eq!(record.location.unwrap().latitude, 51.5);
    }
}
