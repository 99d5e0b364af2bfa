//! Visual resolution: decide what, if anything, illustrates an item.
//!
//! Priority is fixed: a supplied picture that decodes always wins; only when
//! there is none (or it is unusable) is the visual spec consulted. At most one
//! visual is produced per item.
//!
//! Every fallible step runs through [`attempt`], which logs the failure with
//! the item number and returns `None`. A broken picture or a nonsensical chart
//! therefore costs the item its illustration, never the whole document.

use crate::document::TableBlock;
use crate::error::VisualError;
use crate::exam::{Item, TableSpec, VisualSpec};
use crate::pipeline::chart::ChartRenderer;
use crate::pipeline::image::{decode_picture, PngImage};
use tracing::{debug, warn};

/// The visual chosen for one item.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderedVisual {
    /// Supplied picture, displayed at the configured picture width.
    Picture(PngImage),
    /// Synthesized chart, displayed at the configured chart width.
    Chart(PngImage),
    /// Table inserted directly into the document.
    Table(TableBlock),
}

/// Run one fallible visual step; on failure log and yield `None`.
pub fn attempt<T>(
    item_num: usize,
    stage: &str,
    f: impl FnOnce() -> Result<T, VisualError>,
) -> Option<T> {
    match f() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!("Item {}: {} skipped: {}", item_num, stage, e);
            None
        }
    }
}

/// Resolve the visual for item `item_num` (1-indexed, for logging).
pub fn resolve(item_num: usize, item: &Item, charts: &ChartRenderer) -> Option<RenderedVisual> {
    if let Some(raw) = item.image_base64.as_deref().filter(|s| !s.trim().is_empty()) {
        if let Some(png) = attempt(item_num, "picture", || decode_picture(raw)) {
            debug!(
                "Item {}: using supplied picture {}x{}",
                item_num, png.width_px, png.height_px
            );
            return Some(RenderedVisual::Picture(png));
        }
    }

    let spec = item.visual_spec.as_ref()?;
    match spec {
        VisualSpec::NumberLine(nl) => {
            attempt(item_num, spec.name(), || charts.number_line(nl)).map(RenderedVisual::Chart)
        }
        VisualSpec::BarChart(bc) => {
            attempt(item_num, spec.name(), || charts.bar_chart(bc)).map(RenderedVisual::Chart)
        }
        VisualSpec::Table(table) => table_block(table).map(RenderedVisual::Table),
        VisualSpec::Unrecognized(kind) => {
            debug!("Item {}: unrecognized visual kind {:?}; no visual", item_num, kind);
            None
        }
    }
}

/// Table visual; omitted when it has no columns or no rows.
pub fn table_block(spec: &TableSpec) -> Option<TableBlock> {
    if spec.columns.is_empty() || spec.rows.is_empty() {
        debug!(
            "Table omitted: {} columns, {} rows",
            spec.columns.len(),
            spec.rows.len()
        );
        return None;
    }

    // Pad or truncate every row to the header width so the grid is rectangular.
    let width = spec.columns.len();
    let rows = spec
        .rows
        .iter()
        .map(|row| {
            let mut cells: Vec<String> = row.iter().take(width).cloned().collect();
            cells.resize(width, String::new());
            cells
        })
        .collect();

    Some(TableBlock {
        header: spec.columns.clone(),
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorConfig;
    use crate::exam::{BarChartSpec, NumberLineSpec};
    use crate::pipeline::image::tests::sample_png;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use resvg::usvg::fontdb;
    use std::sync::Arc;

    fn charts() -> ChartRenderer {
        ChartRenderer::with_fonts(
            &GeneratorConfig::default(),
            Arc::new(fontdb::Database::new()),
        )
    }

    fn table_spec(columns: &[&str], rows: &[&[&str]]) -> TableSpec {
        TableSpec {
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        }
    }

    #[test]
    fn supplied_picture_wins_over_spec() {
        let item = Item {
            image_base64: Some(STANDARD.encode(sample_png())),
            // An invalid chart: if this were consulted it would fail loudly.
            visual_spec: Some(VisualSpec::BarChart(BarChartSpec::default())),
            ..Item::default()
        };
        let visual = resolve(1, &item, &charts()).expect("picture");
        assert!(matches!(visual, RenderedVisual::Picture(ref png) if png.bytes == sample_png()));
    }

    #[test]
    fn bad_picture_falls_through_to_spec() {
        let item = Item {
            image_base64: Some("not-base64!!".into()),
            visual_spec: Some(VisualSpec::Table(table_spec(&["x"], &[&["1"]]))),
            ..Item::default()
        };
        assert!(matches!(
            resolve(1, &item, &charts()),
            Some(RenderedVisual::Table(_))
        ));
    }

    #[test]
    fn bad_picture_alone_means_no_visual() {
        let item = Item {
            image_base64: Some("not-base64!!".into()),
            ..Item::default()
        };
        assert_eq!(resolve(1, &item, &charts()), None);
    }

    #[test]
    fn number_line_becomes_chart() {
        let item = Item {
            visual_spec: Some(VisualSpec::NumberLine(NumberLineSpec::default())),
            ..Item::default()
        };
        assert!(matches!(
            resolve(1, &item, &charts()),
            Some(RenderedVisual::Chart(_))
        ));
    }

    #[test]
    fn chart_failure_is_swallowed() {
        let item = Item {
            visual_spec: Some(VisualSpec::NumberLine(NumberLineSpec {
                step: 0.0,
                ..NumberLineSpec::default()
            })),
            ..Item::default()
        };
        assert_eq!(resolve(3, &item, &charts()), None);
    }

    #[test]
    fn oversized_bar_chart_degrades_to_no_visual() {
        let item = Item {
            visual_spec: Some(VisualSpec::BarChart(BarChartSpec {
                title: None,
                categories: (0..100_000).map(|i| i.to_string()).collect(),
                values: vec![1.0; 100_000],
            })),
            ..Item::default()
        };
        assert_eq!(resolve(2, &item, &charts()), None);
    }

    #[test]
    fn unrecognized_kind_yields_nothing() {
        let item = Item {
            visual_spec: Some(VisualSpec::Unrecognized("pie".into())),
            ..Item::default()
        };
        assert_eq!(resolve(1, &item, &charts()), None);
    }

    #[test]
    fn empty_table_is_omitted() {
        assert!(table_block(&table_spec(&[], &[&["1"]])).is_none());
        assert!(table_block(&table_spec(&["a"], &[])).is_none());
    }

    #[test]
    fn ragged_rows_are_squared_up() {
        let table = table_block(&table_spec(&["a", "b"], &[&["1"], &["1", "2", "3"]])).unwrap();
        assert_eq!(table.rows, vec![vec!["1", ""], vec!["1", "2"]]);
    }

    #[test]
    fn attempt_passes_values_through() {
        assert_eq!(attempt(1, "noop", || Ok::<_, VisualError>(7)), Some(7));
        assert_eq!(
            attempt(1, "fail", || Err::<u8, _>(VisualError::Base64("x".into()))),
            None
        );
    }
}
