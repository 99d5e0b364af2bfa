//! # simulado-docx
//!
//! Turn a JSON description of a multiple-choice exam into a Word document
//! (`.docx`) with the questions followed by an annotated answer key.
//!
//! ## Why this crate?
//!
//! Exam content usually comes from generators (scripts, spreadsheets, LLMs)
//! that are sloppy about shape: keys in Portuguese or English, numbers as
//! strings, base64 images with data-URI prefixes and missing padding, chart
//! descriptions instead of pictures. This crate accepts all of that, repairs
//! what it can, draws number lines and bar charts itself, and never drops a
//! question because its illustration was broken.
//!
//! ## Pipeline Overview
//!
//! ```text
//! JSON
//!  │
//!  ├─ 1. Normalize  tolerant field lookup → ExamRequest
//!  ├─ 2. Visual     supplied picture, else chart / table from visual_spec
//!  ├─ 3. Assemble   header, questions, page break, annotated answer key
//!  └─ 4. Package    docx-rs → bytes + Exam_{subject}.docx
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use simulado_docx::{generate, ChartRenderer, GeneratorConfig};
//! use serde_json::json;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = GeneratorConfig::default();
//!     let charts = ChartRenderer::new(&config);
//!     let exam = json!({
//!         "materia": "Math",
//!         "itens": [{
//!             "enunciado": "2+2=?",
//!             "alternativas": { "a": "3", "b": "4" },
//!             "gabarito": "b"
//!         }]
//!     });
//!     let doc = generate(&exam, &charts, &config)?;
//!     std::fs::write(&doc.filename, &doc.bytes)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `simulado` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when embedding only the library or the router:
//! ```toml
//! simulado-docx = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod exam;
pub mod generate;
pub mod pipeline;
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{GeneratorConfig, GeneratorConfigBuilder, ServerConfig};
pub use document::ExamDocument;
pub use error::{SimuladoError, VisualError};
pub use exam::{ExamRequest, Item, Letter, VisualSpec};
pub use generate::{
    generate, generate_from_bytes, generate_to_file, output_filename, parse_body, write_atomic,
    GeneratedDocument, DOCX_CONTENT_TYPE,
};
pub use pipeline::chart::ChartRenderer;
pub use server::{router, serve, AppState};
