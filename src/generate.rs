//! Top-level generation entry points.
//!
//! [`generate`] runs the full pipeline on an already-parsed JSON value and
//! returns the DOCX bytes with the download name the caller should use.
//! [`parse_body`] turns raw request bytes into that value, and
//! [`generate_to_file`] writes the result to disk for offline use.

use crate::config::GeneratorConfig;
use crate::error::SimuladoError;
use crate::pipeline::assemble::assemble;
use crate::pipeline::chart::ChartRenderer;
use crate::pipeline::docx::write_docx;
use crate::pipeline::normalize::{normalize, require_object};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::io::Write;
use std::path::Path;
use std::time::Instant;
use tracing::info;

pub use crate::pipeline::docx::DOCX_CONTENT_TYPE;

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));
// `\w` is Unicode-aware, so accented letters survive.
static UNSAFE_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w.\-]").expect("static regex"));

/// A finished exam, ready to be sent or saved.
#[derive(Debug, Clone)]
pub struct GeneratedDocument {
    pub bytes: Vec<u8>,
    /// Suggested download name, e.g. `Exam_Math.docx`.
    pub filename: String,
    pub content_type: &'static str,
    /// Number of questions in the document.
    pub items: usize,
}

/// Parse a raw request body.
///
/// An empty or whitespace-only body is [`SimuladoError::EmptyRequest`];
/// anything else that is not JSON is [`SimuladoError::InvalidJson`].
pub fn parse_body(body: &[u8]) -> Result<Value, SimuladoError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(SimuladoError::EmptyRequest);
    }
    serde_json::from_slice(body).map_err(|e| SimuladoError::InvalidJson(e.to_string()))
}

/// Generate the exam document for a JSON request.
pub fn generate(
    value: &Value,
    charts: &ChartRenderer,
    config: &GeneratorConfig,
) -> Result<GeneratedDocument, SimuladoError> {
    let start = Instant::now();
    let raw = require_object(value)?;
    let request = normalize(raw, config);
    info!(
        "Generating '{}' with {} items",
        request.title,
        request.items.len()
    );

    let document = assemble(&request, charts, config);
    let bytes = write_docx(&document)?;
    let filename = output_filename(request.subject.as_deref(), &config.default_subject);

    info!(
        "Generated {} ({} bytes) in {}ms",
        filename,
        bytes.len(),
        start.elapsed().as_millis()
    );

    Ok(GeneratedDocument {
        bytes,
        filename,
        content_type: DOCX_CONTENT_TYPE,
        items: request.items.len(),
    })
}

/// Parse `body` and generate in one step.
pub fn generate_from_bytes(
    body: &[u8],
    charts: &ChartRenderer,
    config: &GeneratorConfig,
) -> Result<GeneratedDocument, SimuladoError> {
    let value = parse_body(body)?;
    generate(&value, charts, config)
}

/// Generate and write the document to `output_path`.
///
/// Uses atomic write (temp file in the same directory + rename) so a failed
/// run never leaves a truncated `.docx` behind.
pub fn generate_to_file(
    value: &Value,
    output_path: impl AsRef<Path>,
    charts: &ChartRenderer,
    config: &GeneratorConfig,
) -> Result<GeneratedDocument, SimuladoError> {
    let generated = generate(value, charts, config)?;
    write_atomic(output_path.as_ref(), &generated.bytes)?;
    Ok(generated)
}

/// Write `bytes` to `path` through a temp file in the same directory, then
/// rename over the target.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), SimuladoError> {
    let write_failed = |source: std::io::Error| SimuladoError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(write_failed)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(write_failed)?;
    tmp.write_all(bytes).map_err(write_failed)?;
    tmp.persist(path).map_err(|e| write_failed(e.error))?;

    info!("Wrote {}", path.display());
    Ok(())
}

/// Download name for a subject: `Exam_{subject}.docx`.
///
/// Whitespace runs become `_`; anything but letters, digits, `_`, `.` and
/// `-` is dropped. Falls back to `default_subject` when nothing is left.
pub fn output_filename(subject: Option<&str>, default_subject: &str) -> String {
    let clean = |s: &str| {
        let underscored = WHITESPACE.replace_all(s.trim(), "_");
        UNSAFE_CHARS.replace_all(&underscored, "").into_owned()
    };

    let mut name = subject.map(clean).unwrap_or_default();
    if name.is_empty() {
        name = clean(default_subject);
    }
    format!("Exam_{name}.docx")
}
