//! Document assembly: [`ExamRequest`] → [`ExamDocument`].
//!
//! ## Layout
//!
//! ```text
//! Title (centered)
//! ______  Name / Date  ______
//!
//! QUESTION n (descriptor - level)     ┐
//! statement                           │ once per item
//! [visual, centered] + blank          │
//! (A) … (E)                           │
//! --------------------------------    ┘
//! ── page break ──
//! ANSWER KEY — ANNOTATED (centered)
//! Q n: KEY X                          ┐ once per item
//!     (A) rationale …                 ┘
//! ```
//!
//! Given identical input the block list is identical; nothing here depends on
//! time, randomness, or hash order.

use crate::config::GeneratorConfig;
use crate::document::{Align, ExamDocument, HeadingLevel, Paragraph, Picture, Span};
use crate::exam::{ExamRequest, Item, Letter};
use crate::pipeline::chart::ChartRenderer;
use crate::pipeline::image::PngImage;
use crate::pipeline::visual::{self, RenderedVisual};
use tracing::{debug, info};

pub const ANSWER_KEY_HEADING: &str = "ANSWER KEY — ANNOTATED";
pub const NAME_DATE_LINE: &str =
    "Name: _________________________________________________ Date: ___/___/___";

/// Left indent of rationale paragraphs: 0.3 inch in twips.
const RATIONALE_INDENT_TWIPS: i32 = 432;

/// Build the complete exam document.
pub fn assemble(
    request: &ExamRequest,
    charts: &ChartRenderer,
    config: &GeneratorConfig,
) -> ExamDocument {
    let mut doc = ExamDocument::new();

    write_header(&mut doc, &request.title);

    let mut with_visual = 0usize;
    for (i, item) in request.items.iter().enumerate() {
        let n = i + 1;
        let resolved = visual::resolve(n, item, charts);
        if resolved.is_some() {
            with_visual += 1;
        }
        write_question(&mut doc, n, item, resolved, config);
    }

    write_answer_key(&mut doc, &request.items);

    info!(
        "Assembled {} questions ({} with visuals), {} blocks",
        request.items.len(),
        with_visual,
        doc.blocks().len()
    );
    doc
}

fn write_header(doc: &mut ExamDocument, title: &str) {
    doc.add_heading(title, HeadingLevel::Title, Align::Center);
    doc.add_paragraph(Paragraph::text("_".repeat(70)));
    doc.add_paragraph(Paragraph::text(NAME_DATE_LINE));
    doc.add_paragraph(Paragraph::text("_".repeat(70)));
    doc.add_paragraph(Paragraph::blank());
}

fn write_question(
    doc: &mut ExamDocument,
    n: usize,
    item: &Item,
    resolved: Option<RenderedVisual>,
    config: &GeneratorConfig,
) {
    doc.add_heading(item.heading(n), HeadingLevel::H2, Align::Left);
    doc.add_paragraph(Paragraph::text(item.statement.as_str()).space_after_pt(12));

    if let Some(v) = resolved {
        match v {
            RenderedVisual::Picture(image) => {
                add_centered_picture(doc, image, config.picture_width_emu())
            }
            RenderedVisual::Chart(image) => {
                add_centered_picture(doc, image, config.chart_width_emu())
            }
            RenderedVisual::Table(table) => doc.add_table(table),
        }
        doc.add_paragraph(Paragraph::blank());
    }

    for letter in Letter::ALL {
        if let Some(text) = item.alternatives.get(&letter) {
            doc.add_paragraph(Paragraph::text(format!("({letter}) {text}")));
        }
    }

    doc.add_paragraph(Paragraph::text("-".repeat(50)));
    debug!("Question {} written", n);
}

fn add_centered_picture(doc: &mut ExamDocument, image: PngImage, width_emu: u32) {
    let height_emu = image.height_for_width(width_emu);
    doc.add_picture(Picture {
        image,
        width_emu,
        height_emu,
        align: Align::Center,
    });
}

fn write_answer_key(doc: &mut ExamDocument, items: &[Item]) {
    doc.add_page_break();
    doc.add_heading(ANSWER_KEY_HEADING, HeadingLevel::H1, Align::Center);
    doc.add_paragraph(Paragraph::blank());

    for (i, item) in items.iter().enumerate() {
        let n = i + 1;
        doc.add_paragraph(Paragraph::spans(vec![Span::bold(format!(
            "Q{n}: KEY {}",
            item.answer_label()
        ))
        .size(12)]));

        for letter in Letter::ALL {
            if let Some(text) = item.rationale.get(&letter) {
                doc.add_paragraph(
                    Paragraph::spans(vec![
                        Span::bold(format!("({letter}) ")),
                        Span::plain(text.as_str()),
                    ])
                    .indent_twips(RATIONALE_INDENT_TWIPS),
                );
            }
        }

        doc.add_paragraph(Paragraph::blank());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Block;
    use crate::exam::{TableSpec, VisualSpec, MISSING_STATEMENT};
    use crate::pipeline::image::tests::sample_png;
    use crate::pipeline::normalize::{normalize, require_object};
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use resvg::usvg::fontdb;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn build(value: Value) -> ExamDocument {
        let config = GeneratorConfig::default();
        let charts = ChartRenderer::with_fonts(&config, Arc::new(fontdb::Database::new()));
        let request = normalize(require_object(&value).expect("object"), &config);
        assemble(&request, &charts, &config)
    }

    fn count_prefix(lines: &[String], prefix: &str) -> usize {
        lines.iter().filter(|l| l.starts_with(prefix)).count()
    }

    #[test]
    fn simple_exam_layout() {
        let doc = build(json!({
            "materia": "Math",
            "itens": [
                { "enunciado": "2+2=?", "alternativas": { "a": "3", "b": "4" }, "gabarito": "b" }
            ]
        }));
        let lines = doc.text_lines();
        let blank = String::new();
        let expected: Vec<String> = vec![
            "Exam: Math".into(),
            "_".repeat(70),
            NAME_DATE_LINE.into(),
            "_".repeat(70),
            blank.clone(),
            "QUESTION 1".into(),
            "2+2=?".into(),
            "(A) 3".into(),
            "(B) 4".into(),
            "-".repeat(50),
            "[page break]".into(),
            ANSWER_KEY_HEADING.into(),
            blank.clone(),
            "Q1: KEY B".into(),
            blank,
        ];
        assert_eq!(lines, expected);
    }

    #[test]
    fn question_and_key_counts_match_items_in_order() {
        let items: Vec<Value> = (1..=5)
            .map(|i| json!({ "enunciado": format!("statement {i}"), "gabarito": "a" }))
            .collect();
        let doc = build(json!({ "itens": items }));
        let lines = doc.text_lines();

        assert_eq!(count_prefix(&lines, "QUESTION "), 5);
        assert_eq!(count_prefix(&lines, "Q"), 10);
        let statements: Vec<String> = lines
            .iter()
            .filter(|l| l.starts_with("statement"))
            .cloned()
            .collect();
        let expected: Vec<String> = (1..=5).map(|i| format!("statement {i}")).collect();
        assert_eq!(statements, expected);

        let break_at = lines.iter().position(|l| l == "[page break]").unwrap();
        assert!(lines[..break_at].iter().all(|l| !l.starts_with("Q1: KEY")));
        assert_eq!(count_prefix(&lines[break_at..], "QUESTION "), 0);
    }

    #[test]
    fn alternatives_follow_fixed_letter_order() {
        let doc = build(json!({
            "itens": [{ "alternativas": { "e": "five", "a": "one", "c": "three" } }]
        }));
        let alts: Vec<String> = doc
            .text_lines()
            .into_iter()
            .filter(|l| l.starts_with('('))
            .collect();
        assert_eq!(alts, vec!["(A) one", "(C) three", "(E) five"]);
    }

    #[test]
    fn rationale_lines_are_indented_with_bold_letter() {
        let doc = build(json!({
            "itens": [{
                "gabarito": "a",
                "justificativa_pedagogica": { "b": "wrong sign", "a": "correct" }
            }]
        }));
        let rationale: Vec<&Paragraph> = doc
            .blocks()
            .iter()
            .filter_map(|b| match b {
                Block::Paragraph(p) if p.indent_twips.is_some() => Some(p),
                _ => None,
            })
            .collect();
        assert_eq!(rationale.len(), 2);
        assert_eq!(rationale[0].plain_text(), "(A) correct");
        assert!(rationale[0].spans[0].bold);
        assert!(!rationale[0].spans[1].bold);
        assert_eq!(rationale[1].plain_text(), "(B) wrong sign");
    }

    #[test]
    fn missing_everything_still_yields_a_block() {
        let doc = build(json!({ "itens": [{}] }));
        let lines = doc.text_lines();
        assert!(lines.contains(&"QUESTION 1".to_string()));
        assert!(lines.contains(&MISSING_STATEMENT.to_string()));
        assert!(lines.contains(&"Q1: KEY ?".to_string()));
    }

    #[test]
    fn picture_is_centered_and_followed_by_blank() {
        let doc = build(json!({
            "itens": [{ "enunciado": "look", "imagem_base64": STANDARD.encode(sample_png()) }]
        }));
        let blocks = doc.blocks();
        let at = blocks
            .iter()
            .position(|b| matches!(b, Block::Picture(_)))
            .expect("picture block");
        let Block::Picture(pic) = &blocks[at] else {
            unreachable!()
        };
        assert_eq!(pic.align, Align::Center);
        assert_eq!(pic.width_emu, GeneratorConfig::default().picture_width_emu());
        assert_eq!(blocks[at + 1], Block::Paragraph(Paragraph::blank()));
    }

    #[test]
    fn invalid_picture_renders_question_without_image() {
        let doc = build(json!({
            "itens": [{ "enunciado": "look", "imagem_base64": "not-base64!!" }]
        }));
        assert!(!doc.blocks().iter().any(|b| matches!(b, Block::Picture(_))));
        assert!(doc.text_lines().contains(&"look".to_string()));
    }

    #[test]
    fn table_visual_is_inserted_inline() {
        let doc = build(json!({
            "itens": [{
                "visual_spec": { "kind": "table", "columns": ["x", "y"], "rows": [[1, 2]] }
            }]
        }));
        assert_eq!(
            doc.blocks()
                .iter()
                .filter(|b| matches!(b, Block::Table(_)))
                .count(),
            1
        );
    }

    #[test]
    fn empty_table_is_silently_dropped() {
        let config = GeneratorConfig::default();
        let charts = ChartRenderer::with_fonts(&config, Arc::new(fontdb::Database::new()));
        let request = ExamRequest {
            title: "t".into(),
            subject: None,
            items: vec![Item {
                visual_spec: Some(VisualSpec::Table(TableSpec::default())),
                ..Item::default()
            }],
        };
        let doc = assemble(&request, &charts, &config);
        assert!(!doc
            .blocks()
            .iter()
            .any(|b| matches!(b, Block::Table(_) | Block::Picture(_))));
    }

    #[test]
    fn assembly_is_deterministic() {
        let input = json!({
            "itens": [
                { "enunciado": "a", "grafico": { "tipo": "reta", "marks": [0, 10] } },
                { "enunciado": "b", "grafico": { "tipo": "barras", "categorias": ["x"], "valores": [2] } }
            ]
        });
        assert_eq!(build(input.clone()), build(input));
    }
}
