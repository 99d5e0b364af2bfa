//! Input normalisation: loosely-typed request JSON → [`ExamRequest`].
//!
//! Upstream producers (form builders, LLM prompts, spreadsheets) disagree on
//! key names and types: `itens` vs `items`, `minimo` vs `min`, `"3"` vs `3`.
//! This module is the only place that knows about those spellings. Each field
//! has an ordered alias list; the first key that is present and non-empty
//! wins, and a documented default applies only when none is.
//!
//! Apart from rejecting an empty body ([`require_object`]), nothing here can
//! fail: malformed values fall back to defaults or placeholders.

use crate::config::GeneratorConfig;
use crate::error::SimuladoError;
use crate::exam::{
    BarChartSpec, ExamRequest, Highlight, Item, Letter, Marks, NumberLineSpec, TableSpec,
    VisualKind, VisualSpec, MISSING_STATEMENT,
};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

// ── Key aliases ──────────────────────────────────────────────────────────────

const TITLE_KEYS: &[&str] = &["titulo_simulado", "titulo", "title"];
const SUBJECT_KEYS: &[&str] = &["materia", "subject", "disciplina"];
const ITEMS_KEYS: &[&str] = &["itens", "items", "data", "questions", "questoes"];

const DESCRIPTOR_KEYS: &[&str] = &["descritor_codigo", "descriptor_code", "descritor"];
const LEVEL_KEYS: &[&str] = &["nivel_dificuldade", "difficulty_level", "nivel"];
const STATEMENT_KEYS: &[&str] = &["enunciado", "statement", "texto"];
const IMAGE_KEYS: &[&str] = &["imagem_base64", "image_base64", "imagem"];
const VISUAL_KEYS: &[&str] = &["visual_spec", "grafico", "visual", "chart"];
const ALTERNATIVES_KEYS: &[&str] = &["alternativas", "alternatives", "opcoes"];
const ANSWER_KEYS: &[&str] = &["gabarito", "answer_key", "resposta_correta"];
const RATIONALE_KEYS: &[&str] = &[
    "justificativa_pedagogica",
    "justificativa_alternativas",
    "rationale",
];

const KIND_KEYS: &[&str] = &["kind", "tipo", "type"];
const MIN_KEYS: &[&str] = &["min", "minimo"];
const MAX_KEYS: &[&str] = &["max", "maximo"];
const STEP_KEYS: &[&str] = &["step", "passo"];
const MARKS_KEYS: &[&str] = &["marks", "marcacoes"];
const HIGHLIGHT_KEYS: &[&str] = &["highlight", "destaque"];
const VALUE_KEYS: &[&str] = &["value", "valor"];
const LABEL_KEYS: &[&str] = &["label", "rotulo"];
const COLOR_KEYS: &[&str] = &["color", "cor"];
const CHART_TITLE_KEYS: &[&str] = &["title", "titulo"];
const CATEGORIES_KEYS: &[&str] = &["categories", "categorias"];
const VALUES_KEYS: &[&str] = &["values", "valores"];
const COLUMNS_KEYS: &[&str] = &["columns", "colunas"];
const ROWS_KEYS: &[&str] = &["rows", "linhas"];

// ── Entry points ─────────────────────────────────────────────────────────────

/// Reject bodies that carry no exam at all.
///
/// `null`, `{}`, and non-object JSON are input errors; everything else is
/// handed to [`normalize`].
pub fn require_object(value: &Value) -> Result<&Map<String, Value>, SimuladoError> {
    match value {
        Value::Null => Err(SimuladoError::EmptyRequest),
        Value::Object(map) if map.is_empty() => Err(SimuladoError::EmptyRequest),
        Value::Object(map) => Ok(map),
        Value::Array(_) => Err(SimuladoError::NotAnObject { found: "array" }),
        Value::String(_) => Err(SimuladoError::NotAnObject { found: "string" }),
        Value::Number(_) => Err(SimuladoError::NotAnObject { found: "number" }),
        Value::Bool(_) => Err(SimuladoError::NotAnObject { found: "boolean" }),
    }
}

/// Build an [`ExamRequest`] from the request object. Never fails.
pub fn normalize(raw: &Map<String, Value>, config: &GeneratorConfig) -> ExamRequest {
    let subject = text_field(raw, SUBJECT_KEYS);
    let title = text_field(raw, TITLE_KEYS)
        .or_else(|| subject.as_ref().map(|s| format!("Exam: {s}")))
        .unwrap_or_else(|| config.default_title.clone());

    let items: Vec<Item> = match first_present(raw, ITEMS_KEYS) {
        Some(Value::Array(list)) => list.iter().map(normalize_item).collect(),
        Some(other) => {
            debug!("Items field is not a list ({}); ignoring", type_name(other));
            Vec::new()
        }
        None => Vec::new(),
    };

    debug!("Normalised request: {} items, title {:?}", items.len(), title);

    ExamRequest {
        title,
        subject,
        items,
    }
}

/// Normalise one entry of the items list.
///
/// A bare string becomes the statement; any other non-object becomes an item
/// with placeholder content so the question still shows up in the document.
pub fn normalize_item(value: &Value) -> Item {
    let obj = match value {
        Value::Object(obj) => obj,
        Value::String(s) if !s.trim().is_empty() => {
            return Item {
                statement: s.trim().to_string(),
                ..blank_item()
            }
        }
        _ => return blank_item(),
    };

    let answer_key = text_field(obj, ANSWER_KEYS);
    let rationale = first_present(obj, RATIONALE_KEYS)
        .map(|v| rationale_map(v, answer_key.as_deref()))
        .unwrap_or_default();

    Item {
        descriptor_code: text_field(obj, DESCRIPTOR_KEYS),
        difficulty_level: text_field(obj, LEVEL_KEYS),
        statement: text_field(obj, STATEMENT_KEYS).unwrap_or_else(|| MISSING_STATEMENT.into()),
        image_base64: first_present(obj, IMAGE_KEYS)
            .and_then(Value::as_str)
            .map(str::to_string),
        visual_spec: first_present(obj, VISUAL_KEYS).and_then(visual_spec),
        alternatives: first_present(obj, ALTERNATIVES_KEYS)
            .map(letter_map)
            .unwrap_or_default(),
        answer_key,
        rationale,
    }
}

fn blank_item() -> Item {
    Item {
        statement: MISSING_STATEMENT.to_string(),
        ..Item::default()
    }
}

// ── Visual specs ─────────────────────────────────────────────────────────────

/// Canonicalise a visual spec object. Objects without a kind are ignored.
pub fn visual_spec(value: &Value) -> Option<VisualSpec> {
    let obj = value.as_object()?;
    let kind = text_field(obj, KIND_KEYS)?;

    let spec = match VisualKind::canonicalize(&kind) {
        VisualKind::NumberLine => VisualSpec::NumberLine(number_line(obj)),
        VisualKind::BarChart => VisualSpec::BarChart(bar_chart(obj)),
        VisualKind::Table => VisualSpec::Table(table(obj)),
        VisualKind::Unrecognized => VisualSpec::Unrecognized(kind),
    };
    Some(spec)
}

fn number_line(obj: &Map<String, Value>) -> NumberLineSpec {
    let defaults = NumberLineSpec::default();
    NumberLineSpec {
        min: number_field(obj, MIN_KEYS).unwrap_or(defaults.min),
        max: number_field(obj, MAX_KEYS).unwrap_or(defaults.max),
        step: number_field(obj, STEP_KEYS).unwrap_or(defaults.step),
        marks: first_present(obj, MARKS_KEYS)
            .map(marks)
            .unwrap_or(defaults.marks),
        highlight: first_present(obj, HIGHLIGHT_KEYS).map(highlight),
    }
}

fn marks(value: &Value) -> Marks {
    match value {
        Value::Object(map) => Marks::Labeled(
            map.iter()
                .filter_map(|(k, v)| {
                    let at = parse_number(k)?;
                    Some((at, scalar_text(v).unwrap_or_default()))
                })
                .collect(),
        ),
        Value::Array(list) => Marks::Values(list.iter().filter_map(as_number).collect()),
        other => Marks::Values(as_number(other).into_iter().collect()),
    }
}

fn highlight(value: &Value) -> Highlight {
    let defaults = Highlight::default();
    match value {
        Value::Object(obj) => Highlight {
            value: number_field(obj, VALUE_KEYS),
            label: text_field(obj, LABEL_KEYS).unwrap_or(defaults.label),
            color: text_field(obj, COLOR_KEYS).unwrap_or(defaults.color),
        },
        other => Highlight {
            value: as_number(other),
            ..defaults
        },
    }
}

fn bar_chart(obj: &Map<String, Value>) -> BarChartSpec {
    BarChartSpec {
        title: text_field(obj, CHART_TITLE_KEYS),
        categories: list_field(obj, CATEGORIES_KEYS)
            .iter()
            .map(|v| scalar_text(v).unwrap_or_default())
            .collect(),
        // Unparseable values stay as NaN so the renderer rejects the chart
        // instead of silently drawing a zero-height bar.
        values: list_field(obj, VALUES_KEYS)
            .iter()
            .map(|v| as_number(v).unwrap_or(f64::NAN))
            .collect(),
    }
}

fn table(obj: &Map<String, Value>) -> TableSpec {
    let columns: Vec<String> = list_field(obj, COLUMNS_KEYS)
        .iter()
        .map(|v| scalar_text(v).unwrap_or_default())
        .collect();

    let rows = list_field(obj, ROWS_KEYS)
        .iter()
        .map(|row| match row {
            Value::Array(cells) => cells
                .iter()
                .map(|c| scalar_text(c).unwrap_or_default())
                .collect(),
            Value::Object(record) => columns
                .iter()
                .map(|col| record.get(col).and_then(scalar_text).unwrap_or_default())
                .collect(),
            other => vec![scalar_text(other).unwrap_or_default()],
        })
        .collect();

    TableSpec { columns, rows }
}

// ── Letter maps ──────────────────────────────────────────────────────────────

/// Alternatives as `{ "a": "...", "B": "..." }` or a positional list.
fn letter_map(value: &Value) -> BTreeMap<Letter, String> {
    match value {
        Value::Object(obj) => obj
            .iter()
            .filter_map(|(k, v)| Some((Letter::parse(k)?, scalar_text(v)?)))
            .collect(),
        Value::Array(list) => Letter::ALL
            .iter()
            .zip(list)
            .filter_map(|(letter, v)| Some((*letter, scalar_text(v)?)))
            .collect(),
        _ => BTreeMap::new(),
    }
}

/// Rationale is normally a letter map; a bare string explains the correct
/// alternative.
fn rationale_map(value: &Value, answer_key: Option<&str>) -> BTreeMap<Letter, String> {
    match value {
        Value::String(s) => match (answer_key.and_then(Letter::parse), non_empty(s)) {
            (Some(letter), Some(text)) => BTreeMap::from([(letter, text)]),
            _ => BTreeMap::new(),
        },
        other => letter_map(other),
    }
}

// ── Value helpers ────────────────────────────────────────────────────────────

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

/// First alias that is present with a non-empty value.
fn first_present<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| obj.get(*k))
        .find(|v| !is_empty_value(v))
}

fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    first_present(obj, keys).and_then(scalar_text)
}

/// Numeric field: the first present key wins even if it does not parse, in
/// which case the result is NaN and the chart is rejected downstream.
fn number_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    first_present(obj, keys).map(|v| as_number(v).unwrap_or(f64::NAN))
}

fn list_field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> &'a [Value] {
    match first_present(obj, keys) {
        Some(Value::Array(list)) => list,
        _ => &[],
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Strings are trimmed; numbers and booleans are printed. Other shapes have
/// no sensible text form.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_empty(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// Parse `"2.5"` as well as the decimal-comma form `"2,5"`.
fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    s.parse::<f64>()
        .ok()
        .or_else(|| s.replace(',', ".").parse::<f64>().ok())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
