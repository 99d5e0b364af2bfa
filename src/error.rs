//! Error types for the simulado-docx library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`SimuladoError`] — **Fatal**: the request cannot produce a document at
//!   all (empty body, unserialisable document, output file not writable).
//!   Returned as `Err(SimuladoError)` from the top-level `generate*` functions.
//!
//! * [`VisualError`] — **Non-fatal**: the visual of a single item could not be
//!   produced (bad base64, unreadable image, nonsensical chart parameters).
//!   The item is still rendered, just without a picture or table.
//!
//! The split mirrors how the service behaves: a malformed item never costs
//! the caller the whole exam.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the simulado-docx library.
#[derive(Debug, Error)]
pub enum SimuladoError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// The request body was empty, `null`, or an empty object.
    #[error("No JSON data received")]
    EmptyRequest,

    /// The request body is not valid JSON.
    #[error("Request body is not valid JSON: {0}")]
    InvalidJson(String),

    /// The request body is JSON but not an object.
    #[error("Expected a JSON object at the top level, got {found}")]
    NotAnObject { found: &'static str },

    // ── Document errors ───────────────────────────────────────────────────
    /// The DOCX package could not be written.
    #[error("Failed to build document: {0}")]
    DocumentBuild(String),

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SimuladoError {
    /// `true` when the caller sent something unusable, as opposed to the
    /// service failing on a usable request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SimuladoError::EmptyRequest
                | SimuladoError::InvalidJson(_)
                | SimuladoError::NotAnObject { .. }
        )
    }
}

/// A non-fatal error for the visual of a single item.
///
/// Logged and swallowed by [`crate::pipeline::visual`]; the item is emitted
/// without a visual.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum VisualError {
    /// The embedded base64 payload could not be decoded.
    #[error("invalid base64 image data: {0}")]
    Base64(String),

    /// The payload decoded, but the bytes are not a readable image.
    #[error("image data is not a readable picture: {0}")]
    UnreadableImage(String),

    /// A chart was requested with parameters that cannot be drawn.
    #[error("invalid {chart} parameters: {detail}")]
    InvalidChart { chart: &'static str, detail: String },

    /// A chart was requested without any data to draw.
    #[error("{chart} has no data to draw")]
    EmptyData { chart: &'static str },

    /// The SVG → PNG rasterisation step failed.
    #[error("chart rasterisation failed: {0}")]
    Rasterization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_request_is_client_error() {
        assert!(SimuladoError::EmptyRequest.is_client_error());
        assert!(SimuladoError::NotAnObject { found: "array" }.is_client_error());
        assert!(!SimuladoError::DocumentBuild("zip".into()).is_client_error());
        assert!(!SimuladoError::Internal("boom".into()).is_client_error());
    }

    #[test]
    fn not_an_object_display() {
        let e = SimuladoError::NotAnObject { found: "array" };
        assert!(e.to_string().contains("array"), "got: {e}");
    }

    #[test]
    fn invalid_chart_display() {
        let e = VisualError::InvalidChart {
            chart: "number line",
            detail: "step must be positive".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("number line"));
        assert!(msg.contains("step must be positive"));
    }

    #[test]
    fn output_write_failed_display() {
        let e = SimuladoError::OutputWriteFailed {
            path: PathBuf::from("/tmp/out.docx"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(e.to_string().contains("/tmp/out.docx"));
    }
}
