//! Pipeline stages for exam-to-DOCX generation.
//!
//! Each submodule implements exactly one transformation step. None of them
//! performs I/O or awaits anything; the whole pipeline is synchronous and the
//! server runs it on a blocking worker.
//!
//! ## Data Flow
//!
//! ```text
//! normalize ──▶ visual ──▶ assemble ──▶ docx
//!  (JSON)      (image/chart)  (blocks)   (zip bytes)
//! ```
//!
//! 1. [`normalize`] — accept loose JSON (Portuguese or English keys, strings
//!    where numbers belong, letters in any case) and produce an `ExamRequest`
//! 2. [`visual`] — pick at most one illustration per item: a supplied picture
//!    via [`image`], else a chart via [`chart`], else a table
//! 3. [`assemble`] — lay out header, questions and the annotated answer key
//!    as an `ExamDocument`
//! 4. [`docx`] — package the document with `docx-rs`

pub mod assemble;
pub mod chart;
pub mod docx;
pub mod image;
pub mod normalize;
pub mod visual;
