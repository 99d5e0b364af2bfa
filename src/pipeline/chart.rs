//! Chart synthesis: number lines and bar charts drawn as SVG, rasterised to PNG.
//!
//! ## Why SVG first?
//!
//! Building the diagram as SVG text keeps the geometry in one readable place
//! and makes it testable without decoding pixels. `resvg` then rasterises it
//! headlessly; there is no display server, no global plotting state, and the
//! font database is loaded exactly once when the [`ChartRenderer`] is built.
//!
//! ## Sizing
//!
//! Geometry is laid out in CSS pixels (96 per inch) and scaled by `dpi / 96`
//! at raster time. The result is cropped to the drawn content plus a small
//! margin and flattened onto white, so the picture sits tightly in the page.

use crate::config::GeneratorConfig;
use crate::error::VisualError;
use crate::exam::{BarChartSpec, Highlight, Marks, NumberLineSpec};
use crate::pipeline::image::{encode_png, PngImage};
use image::{DynamicImage, Rgb, RgbImage};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg;
use resvg::usvg::fontdb;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::{debug, info};

/// Bar colours, cycled by category index.
pub const PALETTE: [&str; 6] = [
    "#4C72B0", "#DD8452", "#55A868", "#C44E52", "#8172B3", "#937860",
];

/// Transparent margin kept around the content after cropping, in CSS px.
const CROP_MARGIN_PX: f32 = 6.0;

/// Largest raster surface allocated for one chart (about 160 MB of RGBA).
pub const MAX_RASTER_PIXELS: u64 = 40_000_000;

/// Renders synthesized charts to PNG.
///
/// Cheap to share: holds the font database behind an `Arc`.
#[derive(Clone)]
pub struct ChartRenderer {
    fontdb: Arc<fontdb::Database>,
    dpi: u32,
    max_ticks: usize,
    max_bars: usize,
}

impl std::fmt::Debug for ChartRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartRenderer")
            .field("fonts", &self.fontdb.len())
            .field("dpi", &self.dpi)
            .field("max_ticks", &self.max_ticks)
            .field("max_bars", &self.max_bars)
            .finish()
    }
}

impl ChartRenderer {
    /// Build a renderer backed by the system fonts.
    pub fn new(config: &GeneratorConfig) -> Self {
        let mut db = fontdb::Database::new();
        db.load_system_fonts();
        info!("Chart renderer ready: {} font faces, {} DPI", db.len(), config.dpi);
        Self::with_fonts(config, Arc::new(db))
    }

    /// Build a renderer with a caller-supplied font database.
    pub fn with_fonts(config: &GeneratorConfig, fontdb: Arc<fontdb::Database>) -> Self {
        Self {
            fontdb,
            dpi: config.dpi,
            max_ticks: config.max_ticks,
            max_bars: config.max_bars,
        }
    }

    pub fn number_line(&self, spec: &NumberLineSpec) -> Result<PngImage, VisualError> {
        let svg = number_line_svg(spec, self.max_ticks)?;
        self.rasterize(&svg)
    }

    pub fn bar_chart(&self, spec: &BarChartSpec) -> Result<PngImage, VisualError> {
        let svg = bar_chart_svg(spec, self.max_bars)?;
        self.rasterize(&svg)
    }

    /// Rasterise an SVG document and crop it to its content.
    pub fn rasterize(&self, svg: &str) -> Result<PngImage, VisualError> {
        let mut opt = usvg::Options::default();
        opt.fontdb = Arc::clone(&self.fontdb);

        let tree = usvg::Tree::from_str(svg, &opt)
            .map_err(|e| VisualError::Rasterization(format!("invalid SVG: {e}")))?;

        let scale = self.dpi as f32 / 96.0;
        let width_f = (tree.size().width() * scale).ceil();
        let height_f = (tree.size().height() * scale).ceil();
        if !(width_f.is_finite() && height_f.is_finite())
            || (width_f as f64) * (height_f as f64) > MAX_RASTER_PIXELS as f64
        {
            return Err(VisualError::Rasterization(format!(
                "{width_f}x{height_f} surface exceeds {MAX_RASTER_PIXELS} pixels"
            )));
        }
        let width = width_f as u32;
        let height = height_f as u32;

        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            VisualError::Rasterization(format!("cannot allocate {width}x{height} surface"))
        })?;
        resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

        let margin = (CROP_MARGIN_PX * scale).round() as u32;
        let cropped = crop_to_content(pixmap.data(), width, height, margin)
            .ok_or_else(|| VisualError::Rasterization("chart rendered no visible content".into()))?;

        debug!(
            "Rasterised chart {}x{} → cropped {}x{}",
            width,
            height,
            cropped.width(),
            cropped.height()
        );

        encode_png(&DynamicImage::ImageRgb8(cropped))
            .map_err(|e| VisualError::Rasterization(e.to_string()))
    }
}

// ── Number line ──────────────────────────────────────────────────────────────

/// Tick positions from `min − step` to `max + step`, one every `step`.
pub fn number_line_ticks(
    min: f64,
    max: f64,
    step: f64,
    max_ticks: usize,
) -> Result<Vec<f64>, VisualError> {
    let invalid = |detail: String| VisualError::InvalidChart {
        chart: "number line",
        detail,
    };

    if !(min.is_finite() && max.is_finite() && step.is_finite()) {
        return Err(invalid(format!(
            "min, max and step must be numbers (got {min}, {max}, {step})"
        )));
    }
    if step <= 0.0 {
        return Err(invalid(format!("step must be positive, got {step}")));
    }
    if min > max {
        return Err(invalid(format!("min {min} is greater than max {max}")));
    }

    let intervals = ((max - min) / step + 1e-9).floor();
    let count = intervals + 3.0;
    if count > max_ticks as f64 {
        return Err(invalid(format!(
            "{count} ticks requested, limit is {max_ticks}"
        )));
    }

    let start = min - step;
    Ok((0..count as usize)
        .map(|i| clean_float(start + i as f64 * step))
        .collect())
}

/// Visible label per tick: `Some` only for ticks present in `marks`.
pub fn tick_labels(ticks: &[f64], marks: &Marks, step: f64) -> Vec<Option<String>> {
    let tolerance = step.abs() * 1e-6;
    let near = |a: f64, b: f64| (a - b).abs() <= tolerance;

    ticks
        .iter()
        .map(|&t| match marks {
            Marks::Values(values) => values
                .iter()
                .any(|&v| near(v, t))
                .then(|| format_number(t)),
            Marks::Labeled(pairs) => pairs
                .iter()
                .find(|(v, _)| near(*v, t))
                .map(|(_, label)| label.clone()),
        })
        .collect()
}

/// Build the number line SVG.
pub fn number_line_svg(spec: &NumberLineSpec, max_ticks: usize) -> Result<String, VisualError> {
    let ticks = number_line_ticks(spec.min, spec.max, spec.step, max_ticks)?;
    let labels = tick_labels(&ticks, &spec.marks, spec.step);

    let intervals = (ticks.len() - 1) as f64;
    let unit = (640.0 / intervals).clamp(24.0, 64.0);
    let margin = 40.0;
    let arrow = 18.0;
    let axis_y = 90.0;
    let first = ticks[0];
    let last = ticks[ticks.len() - 1];
    let x_of = |v: f64| margin + arrow + (v - first) / spec.step * unit;

    let x_start = margin;
    let x_end = x_of(last) + arrow;
    let width = x_end + margin;
    let height = 150.0;

    let mut svg = svg_open(width, height);

    // Axis with arrowheads at both extremities.
    let _ = write!(
        svg,
        r#"<line x1="{x_start:.1}" y1="{axis_y}" x2="{x_end:.1}" y2="{axis_y}" stroke="black" stroke-width="2"/>"#
    );
    let _ = write!(
        svg,
        r#"<polygon points="{x0:.1},{axis_y} {x1:.1},{ya} {x1:.1},{yb}" fill="black"/>"#,
        x0 = x_start - 4.0,
        x1 = x_start + 10.0,
        ya = axis_y - 6.0,
        yb = axis_y + 6.0,
    );
    let _ = write!(
        svg,
        r#"<polygon points="{x0:.1},{axis_y} {x1:.1},{ya} {x1:.1},{yb}" fill="black"/>"#,
        x0 = x_end + 4.0,
        x1 = x_end - 10.0,
        ya = axis_y - 6.0,
        yb = axis_y + 6.0,
    );

    for (tick, label) in ticks.iter().zip(&labels) {
        let x = x_of(*tick);
        let _ = write!(
            svg,
            r#"<line x1="{x:.1}" y1="{y1}" x2="{x:.1}" y2="{y2}" stroke="black" stroke-width="2"/>"#,
            y1 = axis_y - 8.0,
            y2 = axis_y + 8.0,
        );
        if let Some(text) = label.as_deref().filter(|t| !t.is_empty()) {
            let _ = write!(
                svg,
                r#"<text x="{x:.1}" y="{y}" font-size="16" text-anchor="middle">{}</text>"#,
                escape_xml(text),
                y = axis_y + 32.0,
            );
        }
    }

    if let Some(hl) = &spec.highlight {
        write_highlight(&mut svg, hl, first, last, axis_y, x_of);
    }

    svg.push_str("</svg>");
    Ok(svg)
}

fn write_highlight(
    svg: &mut String,
    hl: &Highlight,
    first: f64,
    last: f64,
    axis_y: f64,
    x_of: impl Fn(f64) -> f64,
) {
    let Some(value) = hl.value.filter(|v| v.is_finite()) else {
        debug!("Highlight without a value; not drawn");
        return;
    };
    if value < first || value > last {
        debug!("Highlight {} outside axis [{}, {}]; not drawn", value, first, last);
        return;
    }

    let x = x_of(value);
    let color = safe_color(&hl.color);
    let _ = write!(
        svg,
        r#"<circle cx="{x:.1}" cy="{axis_y}" r="6" fill="{color}"/>"#
    );
    let _ = write!(
        svg,
        r#"<line x1="{x:.1}" y1="{y1}" x2="{x:.1}" y2="{y2}" stroke="{color}" stroke-width="2"/>"#,
        y1 = axis_y - 40.0,
        y2 = axis_y - 10.0,
    );
    let _ = write!(
        svg,
        r#"<text x="{x:.1}" y="{y}" font-size="20" font-weight="bold" text-anchor="middle" fill="{color}">{}</text>"#,
        escape_xml(&hl.label),
        y = axis_y - 48.0,
    );
}

// ── Bar chart ────────────────────────────────────────────────────────────────

/// Build the bar chart SVG, with at most `max_bars` bars.
pub fn bar_chart_svg(spec: &BarChartSpec, max_bars: usize) -> Result<String, VisualError> {
    let n = spec.categories.len().min(spec.values.len());
    if n == 0 {
        return Err(VisualError::EmptyData { chart: "bar chart" });
    }
    if n > max_bars {
        return Err(VisualError::InvalidChart {
            chart: "bar chart",
            detail: format!("{n} bars requested, limit is {max_bars}"),
        });
    }
    if spec.categories.len() != spec.values.len() {
        debug!(
            "Bar chart has {} categories and {} values; drawing {}",
            spec.categories.len(),
            spec.values.len(),
            n
        );
    }
    let values = &spec.values[..n];
    if let Some(bad) = values.iter().find(|v| !v.is_finite()) {
        return Err(VisualError::InvalidChart {
            chart: "bar chart",
            detail: format!("value {bad} is not a number"),
        });
    }

    let lo = values.iter().copied().fold(0.0_f64, f64::min);
    let hi = values.iter().copied().fold(0.0_f64, f64::max);
    let span = if hi - lo > 0.0 { hi - lo } else { 1.0 };

    let bar_w = 56.0;
    let gap = 28.0;
    let margin = 30.0;
    let plot_h = 240.0;
    let title_h = if spec.title.is_some() { 40.0 } else { 0.0 };
    let plot_top = margin + title_h + 24.0;
    let y_of = |v: f64| plot_top + (hi - v) / span * plot_h;
    let baseline = y_of(0.0);

    let width = margin * 2.0 + n as f64 * bar_w + (n - 1) as f64 * gap;
    let height = plot_top + plot_h + 24.0 + 40.0;

    let mut svg = svg_open(width, height);

    if let Some(title) = &spec.title {
        let _ = write!(
            svg,
            r#"<text x="{x:.1}" y="{y:.1}" font-size="20" font-weight="bold" text-anchor="middle">{}</text>"#,
            escape_xml(title),
            x = width / 2.0,
            y = margin + 20.0,
        );
    }

    for (i, (category, &value)) in spec.categories.iter().zip(values).enumerate() {
        let x = margin + i as f64 * (bar_w + gap);
        let center = x + bar_w / 2.0;
        let top = y_of(value.max(0.0));
        let bottom = y_of(value.min(0.0));
        let color = PALETTE[i % PALETTE.len()];

        let _ = write!(
            svg,
            r#"<rect x="{x:.1}" y="{top:.1}" width="{bar_w}" height="{h:.1}" fill="{color}"/>"#,
            h = (bottom - top).max(1.0),
        );
        let label_y = if value >= 0.0 { top - 6.0 } else { bottom + 18.0 };
        let _ = write!(
            svg,
            r#"<text x="{center:.1}" y="{label_y:.1}" font-size="15" text-anchor="middle">{}</text>"#,
            format_number(value),
        );
        let _ = write!(
            svg,
            r#"<text x="{center:.1}" y="{y:.1}" font-size="15" text-anchor="middle">{}</text>"#,
            escape_xml(category),
            y = plot_top + plot_h + 40.0,
        );
    }

    let _ = write!(
        svg,
        r#"<line x1="{x1:.1}" y1="{baseline:.1}" x2="{x2:.1}" y2="{baseline:.1}" stroke="black" stroke-width="1.5"/>"#,
        x1 = margin - 8.0,
        x2 = width - margin + 8.0,
    );

    svg.push_str("</svg>");
    Ok(svg)
}

// ── Helpers ──────────────────────────────────────────────────────────────────

fn svg_open(width: f64, height: f64) -> String {
    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="sans-serif">"#,
        w = width.ceil(),
        h = height.ceil(),
    )
}

/// Crop a premultiplied RGBA buffer to its non-transparent pixels plus
/// `margin`, flattening onto white. `None` if nothing is visible.
pub fn crop_to_content(data: &[u8], width: u32, height: u32, margin: u32) -> Option<RgbImage> {
    let offset = |x: u32, y: u32| (y as usize * width as usize + x as usize) * 4;
    let alpha_at = |x: u32, y: u32| data[offset(x, y) + 3];

    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for y in 0..height {
        for x in 0..width {
            if alpha_at(x, y) == 0 {
                continue;
            }
            bounds = Some(match bounds {
                None => (x, y, x, y),
                Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
            });
        }
    }
    let (x0, y0, x1, y1) = bounds?;

    let out_w = x1 - x0 + 1 + margin * 2;
    let out_h = y1 - y0 + 1 + margin * 2;
    let mut out = RgbImage::from_pixel(out_w, out_h, Rgb([255, 255, 255]));

    for y in y0..=y1 {
        for x in x0..=x1 {
            let i = offset(x, y);
            let a = data[i + 3];
            // Premultiplied over white: c + (255 - a).
            let over = |c: u8| c.saturating_add(255 - a);
            out.put_pixel(
                x - x0 + margin,
                y - y0 + margin,
                Rgb([over(data[i]), over(data[i + 1]), over(data[i + 2])]),
            );
        }
    }
    Some(out)
}

/// Drop floating-point noise such as `0.30000000000000004` and `-0`.
fn clean_float(v: f64) -> f64 {
    let r = (v * 1e9).round() / 1e9;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

/// `3` rather than `3.0`; `2.5` stays `2.5`.
pub fn format_number(v: f64) -> String {
    let v = clean_float(v);
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}

/// Only pass through colour names and hex codes; anything else is red.
fn safe_color(color: &str) -> &str {
    let ok = !color.is_empty()
        && color.len() <= 32
        && color.chars().all(|c| c.is_ascii_alphanumeric() || c == '#');
    if ok {
        color
    } else {
        "red"
    }
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
