//! Strongly typed exam model produced by [`crate::pipeline::normalize`].
//!
//! Every "which key did the caller use" question is answered before a value
//! of these types exists; downstream stages only ever see resolved fields.

use std::collections::BTreeMap;
use std::fmt;

/// Placeholder shown when an item carries no statement.
pub const MISSING_STATEMENT: &str = "[item text unavailable]";

/// A normalized exam request, ready for assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct ExamRequest {
    /// Resolved document title.
    pub title: String,
    /// Subject ("matéria"), used for the download filename.
    pub subject: Option<String>,
    pub items: Vec<Item>,
}

/// One exam question.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Item {
    pub descriptor_code: Option<String>,
    pub difficulty_level: Option<String>,
    /// Question text; [`MISSING_STATEMENT`] when the caller sent none.
    pub statement: String,
    pub image_base64: Option<String>,
    pub visual_spec: Option<VisualSpec>,
    pub alternatives: BTreeMap<Letter, String>,
    /// Correct letter as supplied, trimmed. Not validated against `alternatives`.
    pub answer_key: Option<String>,
    pub rationale: BTreeMap<Letter, String>,
}

impl Item {
    /// Heading for the question block, e.g. `QUESTION 3 (D12 - easy)`.
    pub fn heading(&self, number: usize) -> String {
        let code = self.descriptor_code.as_deref().unwrap_or("");
        let level = self.difficulty_level.as_deref().unwrap_or("");
        if code.is_empty() && level.is_empty() {
            format!("QUESTION {number}")
        } else {
            format!("QUESTION {number} ({code} - {level})")
        }
    }

    /// Upper-cased answer key, or `?` when absent.
    pub fn answer_label(&self) -> String {
        match self.answer_key.as_deref() {
            Some(key) if !key.is_empty() => key.to_uppercase(),
            _ => "?".to_string(),
        }
    }
}

/// Alternative letter. Ordering is the fixed display order `a..e`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Letter {
    A,
    B,
    C,
    D,
    E,
}

impl Letter {
    pub const ALL: [Letter; 5] = [Letter::A, Letter::B, Letter::C, Letter::D, Letter::E];

    /// Parse a letter key case-insensitively. `"(b)"` and `" B "` are accepted.
    pub fn parse(s: &str) -> Option<Letter> {
        let trimmed = s.trim().trim_start_matches('(').trim_end_matches(')').trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "a" => Some(Letter::A),
            "b" => Some(Letter::B),
            "c" => Some(Letter::C),
            "d" => Some(Letter::D),
            "e" => Some(Letter::E),
            _ => None,
        }
    }

    pub fn upper(self) -> char {
        match self {
            Letter::A => 'A',
            Letter::B => 'B',
            Letter::C => 'C',
            Letter::D => 'D',
            Letter::E => 'E',
        }
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.upper())
    }
}

/// Diagram to synthesize when no picture is supplied.
#[derive(Debug, Clone, PartialEq)]
pub enum VisualSpec {
    NumberLine(NumberLineSpec),
    BarChart(BarChartSpec),
    Table(TableSpec),
    /// Kind text that matched nothing; carried for logging only.
    Unrecognized(String),
}

impl VisualSpec {
    pub fn name(&self) -> &'static str {
        match self {
            VisualSpec::NumberLine(_) => "number line",
            VisualSpec::BarChart(_) => "bar chart",
            VisualSpec::Table(_) => "table",
            VisualSpec::Unrecognized(_) => "unrecognized",
        }
    }
}

/// Kind of visual, canonicalized from free text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualKind {
    NumberLine,
    BarChart,
    Table,
    Unrecognized,
}

impl VisualKind {
    /// Case-insensitive substring match on the caller's `kind` text.
    ///
    /// Portuguese and English spellings are both recognised:
    /// `"reta_numerica"`, `"Number Line"`, `"grafico_barras"`, `"bar"`,
    /// `"tabela"`, `"table"`.
    pub fn canonicalize(kind: &str) -> VisualKind {
        let k = kind.to_lowercase();
        if k.contains("reta") || k.contains("number") || k.contains("numerica") {
            VisualKind::NumberLine
        } else if k.contains("tabela") || k.contains("table") {
            VisualKind::Table
        } else if k.contains("barra") || k.contains("bar") || k.contains("coluna") {
            VisualKind::BarChart
        } else {
            VisualKind::Unrecognized
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NumberLineSpec {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub marks: Marks,
    pub highlight: Option<Highlight>,
}

impl Default for NumberLineSpec {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 10.0,
            step: 1.0,
            marks: Marks::Values(Vec::new()),
            highlight: None,
        }
    }
}

/// Which number-line ticks carry a visible label.
#[derive(Debug, Clone, PartialEq)]
pub enum Marks {
    /// Label these ticks with their own value.
    Values(Vec<f64>),
    /// Label these ticks with the given text.
    Labeled(Vec<(f64, String)>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    /// Where to draw the marker. `None` means no marker is drawn.
    pub value: Option<f64>,
    pub label: String,
    pub color: String,
}

impl Default for Highlight {
    fn default() -> Self {
        Self {
            value: None,
            label: "X".to_string(),
            color: "red".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct BarChartSpec {
    pub title: Option<String>,
    pub categories: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableSpec {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}
