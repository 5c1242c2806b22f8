//! Table rendering for CLI output using comfy-table.
//!
//! | Command | Table Function |
//! |---------|----------------|
//! | `scenic search` | `render_search_table()` |
//! | `scenic info` | `render_info_table()` |

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, CellAlignment, Table};

use scenic_core::IndexManifest;

use super::color::terminal_width;
use super::format::{format_bytes, format_distance, format_relative_time, format_thousands, truncate_str};

/// Budget the photo column against the terminal, leaving room for the rest.
fn path_width() -> usize {
    terminal_width().saturating_sub(44).clamp(24, 72)
}

/// One search hit prepared for display.
#[derive(Debug, Clone)]
pub struct SearchRow {
    /// 1-based rank.
    pub rank: usize,
    /// Distance to the query (ascending).
    pub distance: f32,
    /// Scene label, empty when the photo had none.
    pub label: String,
    /// Corpus-relative photo path.
    pub path: String,
    /// "lat, lon" or empty.
    pub location: String,
    /// Reverse-geocoded address, when `--locate` resolved one.
    pub address: Option<String>,
}

/// Render the search-results table.
///
/// The address column only appears when geocoding ran.
pub fn render_search_table(rows: &[SearchRow], with_address: bool) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);

    let mut header = vec![
        Cell::new("#"),
        Cell::new("DISTANCE"),
        Cell::new("LABEL"),
        Cell::new("PHOTO"),
        Cell::new("LOCATION"),
    ];
    if with_address {
        header.push(Cell::new("ADDRESS"));
    }
    table.set_header(header);

    for row in rows {
        let mut cells = vec![
            Cell::new(row.rank).set_alignment(CellAlignment::Right),
            Cell::new(format_distance(row.distance)).set_alignment(CellAlignment::Right),
            Cell::new(&row.label),
            Cell::new(truncate_str(&row.path, path_width())),
            Cell::new(&row.location),
        ];
        if with_address {
            cells.push(Cell::new(row.address.as_deref().unwrap_or("-")));
        }
        table.add_row(cells);
    }
    table
}

/// Render the `scenic info` manifest summary.
pub fn render_info_table(manifest: &IndexManifest, snapshot_bytes: Option<u64>) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING);

    table.add_row(vec![
        Cell::new("Items"),
        Cell::new(format_thousands(manifest.items as u64)),
    ]);
    table.add_row(vec![
        Cell::new("Model"),
        Cell::new(manifest.model.to_string()),
    ]);
    table.add_row(vec![
        Cell::new("Metric"),
        Cell::new(manifest.metric.to_string()),
    ]);
    table.add_row(vec![Cell::new("Trees"), Cell::new(manifest.trees)]);
    table.add_row(vec![
        Cell::new("Seed"),
        Cell::new(
            manifest
                .seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "-".to_string()),
        ),
    ]);
    table.add_row(vec![
        Cell::new("Built"),
        Cell::new(format_relative_time(manifest.built_at)),
    ]);
    if let Some(bytes) = snapshot_bytes {
        table.add_row(vec![Cell::new("Snapshot"), Cell::new(format_bytes(bytes))]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use scenic_core::{Backbone, Metric, ModelInfo};

    #[test]
    fn test_search_table_contains_rows() {
        let rows = vec![SearchRow {
            rank: 1,
            distance: 0.042,
            label: "abbey".to_string(),
            path: "abbey/510471.jpg".to_string(),
            location: "51.50000, -0.12000".to_string(),
            address: None,
        }];
        let rendered = render_search_table(&rows, false).to_string();
        assert!(rendered.contains("abbey/510471.jpg"));
        assert!(rendered.contains("0.042"));
        assert!(!rendered.contains("ADDRESS"));
    }

    #[test]
    fn test_search_table_with_addresses() {
        let rows = vec![SearchRow {
            rank: 1,
            distance: 0.1,
            label: String::new(),
            path: "a.jpg".to_string(),
            location: String::new(),
            address: Some("Abbey Road, London".to_string()),
        }];
        let rendered = render_search_table(&rows, true).to_string();
        assert!(rendered.contains("ADDRESS"));
        assert!(rendered.contains("Abbey Road, London"));
    }

    #[test]
    fn test_info_table() {
        let manifest = IndexManifest::new(
            ModelInfo::new(Backbone::ResNet18, 256, 224),
            Metric::Cosine,
            16,
            None,
            1200,
        );
        let rendered = render_info_table(&manifest, Some(2_048_000)).to_string();
        assert!(rendered.contains("1,200"));
        assert!(rendered.contains("resnet18"));
        assert!(rendered.contains("cosine"));
        assert!(rendered.contains("2.0 MB"));
    }
}
