//! In-memory document model.
//!
//! The assembler does not talk to the DOCX library directly. It appends
//! [`Block`]s to an [`ExamDocument`] through the small set of operations a
//! word processor offers (heading, paragraph, picture, table, page break),
//! and [`crate::pipeline::docx`] turns the finished block list into a file.
//! The block list is plain data, so layout can be tested without unzipping
//! anything.

use crate::pipeline::image::PngImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
}

/// A run of text with uniform formatting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub bold: bool,
    /// Font size in points; `None` inherits the style.
    pub size_pt: Option<u32>,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
            size_pt: None,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
            size_pt: None,
        }
    }

    pub fn size(mut self, pt: u32) -> Self {
        self.size_pt = Some(pt);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Paragraph {
    pub spans: Vec<Span>,
    pub align: Align,
    /// Left indent in twentieths of a point.
    pub indent_twips: Option<i32>,
    /// Space after the paragraph in points.
    pub space_after_pt: Option<u32>,
}

impl Paragraph {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            spans: vec![Span::plain(text)],
            ..Self::default()
        }
    }

    pub fn blank() -> Self {
        Self::default()
    }

    pub fn spans(spans: Vec<Span>) -> Self {
        Self {
            spans,
            ..Self::default()
        }
    }

    pub fn align(mut self, align: Align) -> Self {
        self.align = align;
        self
    }

    pub fn indent_twips(mut self, twips: i32) -> Self {
        self.indent_twips = Some(twips);
        self
    }

    pub fn space_after_pt(mut self, pt: u32) -> Self {
        self.space_after_pt = Some(pt);
        self
    }

    /// Concatenated text of all spans.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

/// Heading level: the document title, or a section heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    Title,
    H1,
    H2,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Picture {
    pub image: PngImage,
    pub width_emu: u32,
    pub height_emu: u32,
    pub align: Align,
}

/// A grid with a bold header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableBlock {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: HeadingLevel,
        text: String,
        align: Align,
    },
    Paragraph(Paragraph),
    Picture(Picture),
    Table(TableBlock),
    PageBreak,
}

/// Ordered list of blocks making up one generated document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExamDocument {
    blocks: Vec<Block>,
}

impl ExamDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_heading(&mut self, text: impl Into<String>, level: HeadingLevel, align: Align) {
        self.blocks.push(Block::Heading {
            level,
            text: text.into(),
            align,
        });
    }

    pub fn add_paragraph(&mut self, paragraph: Paragraph) {
        self.blocks.push(Block::Paragraph(paragraph));
    }

    pub fn add_picture(&mut self, picture: Picture) {
        self.blocks.push(Block::Picture(picture));
    }

    pub fn add_table(&mut self, table: TableBlock) {
        self.blocks.push(Block::Table(table));
    }

    pub fn add_page_break(&mut self) {
        self.blocks.push(Block::PageBreak);
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// One line of text per heading/paragraph, in order. Pictures render as
    /// `[picture]`, tables as `[table]`, page breaks as `[page break]`.
    pub fn text_lines(&self) -> Vec<String> {
        self.blocks
            .iter()
            .map(|b| match b {
                Block::Heading { text, .. } => text.clone(),
                Block::Paragraph(p) => p.plain_text(),
                Block::Picture(_) => "[picture]".to_string(),
                Block::Table(_) => "[table]".to_string(),
                Block::PageBreak => "[page break]".to_string(),
            })
            .collect()
    }
}
