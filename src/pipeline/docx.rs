//! DOCX packaging: [`ExamDocument`] → `.docx` bytes via `docx-rs`.
//!
//! The only module that touches the word-processor library. Styles are
//! declared once per document (Title, Heading1, Heading2) so headings show up
//! in Word's navigation pane like hand-made ones would.

use crate::document::{Align, Block, ExamDocument, HeadingLevel, Paragraph, Picture, TableBlock};
use crate::error::SimuladoError;
use docx_rs::{
    AlignmentType, BreakType, Docx, LineSpacing, Pic, Run, Style, StyleType, Table,
    TableAlignmentType, TableCell, TableRow,
};
use std::io::Cursor;
use tracing::debug;

/// MIME type of the generated file.
pub const DOCX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Serialise the document to an in-memory `.docx` package.
pub fn write_docx(doc: &ExamDocument) -> Result<Vec<u8>, SimuladoError> {
    let mut docx = with_styles(Docx::new());

    for block in doc.blocks() {
        docx = match block {
            Block::Heading { level, text, align } => {
                docx.add_paragraph(heading(*level, text, *align))
            }
            Block::Paragraph(p) => docx.add_paragraph(paragraph(p)),
            Block::Picture(pic) => docx.add_paragraph(picture(pic)),
            Block::Table(table) => docx.add_table(grid(table)),
            Block::PageBreak => docx.add_paragraph(
                docx_rs::Paragraph::new().add_run(Run::new().add_break(BreakType::Page)),
            ),
        };
    }

    let mut cursor = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut cursor)
        .map_err(|e| SimuladoError::DocumentBuild(e.to_string()))?;

    let bytes = cursor.into_inner();
    debug!(
        "Packed {} blocks into {} bytes of DOCX",
        doc.blocks().len(),
        bytes.len()
    );
    Ok(bytes)
}

fn with_styles(docx: Docx) -> Docx {
    docx.add_style(
        Style::new("Title", StyleType::Paragraph)
            .name("Title")
            .size(52)
            .color("17365D"),
    )
    .add_style(
        Style::new("Heading1", StyleType::Paragraph)
            .name("Heading 1")
            .size(28)
            .bold()
            .color("365F91"),
    )
    .add_style(
        Style::new("Heading2", StyleType::Paragraph)
            .name("Heading 2")
            .size(26)
            .bold()
            .color("4F81BD"),
    )
}

fn alignment(align: Align) -> AlignmentType {
    match align {
        Align::Left => AlignmentType::Left,
        Align::Center => AlignmentType::Center,
    }
}

fn heading(level: HeadingLevel, text: &str, align: Align) -> docx_rs::Paragraph {
    let style = match level {
        HeadingLevel::Title => "Title",
        HeadingLevel::H1 => "Heading1",
        HeadingLevel::H2 => "Heading2",
    };
    docx_rs::Paragraph::new()
        .style(style)
        .align(alignment(align))
        .add_run(Run::new().add_text(text))
}

fn paragraph(p: &Paragraph) -> docx_rs::Paragraph {
    let mut out = docx_rs::Paragraph::new();
    for span in &p.spans {
        let mut run = Run::new().add_text(span.text.as_str());
        if span.bold {
            run = run.bold();
        }
        if let Some(pt) = span.size_pt {
            // Run sizes are in half-points.
            run = run.size(pt as usize * 2);
        }
        out = out.add_run(run);
    }
    if p.align != Align::Left {
        out = out.align(alignment(p.align));
    }
    if let Some(twips) = p.indent_twips {
        out = out.indent(Some(twips), None, None, None);
    }
    if let Some(pt) = p.space_after_pt {
        out = out.line_spacing(LineSpacing::new().after(pt * 20));
    }
    out
}

fn picture(pic: &Picture) -> docx_rs::Paragraph {
    let image = Pic::new(&pic.image.bytes).size(pic.width_emu, pic.height_emu);
    docx_rs::Paragraph::new()
        .align(alignment(pic.align))
        .add_run(Run::new().add_image(image))
}

fn grid(table: &TableBlock) -> Table {
    let cell = |text: &str, bold: bool| {
        let mut run = Run::new().add_text(text);
        if bold {
            run = run.bold();
        }
        TableCell::new().add_paragraph(docx_rs::Paragraph::new().add_run(run))
    };

    let header = TableRow::new(table.header.iter().map(|h| cell(h, true)).collect());
    let body = table
        .rows
        .iter()
        .map(|row| TableRow::new(row.iter().map(|c| cell(c, false)).collect()));

    Table::new(std::iter::once(header).chain(body).collect())
        .align(TableAlignmentType::Center)
}
