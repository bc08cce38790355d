//! Body pages rendered from plain paragraphs
//!
//! Deliberately minimal: one standard font, fixed leading, greedy word
//! wrap. Each filled page is handed to the assembler as soon as it is
//! complete, which fires the page-completion hook for it.

use lopdf::{Dictionary, Object};
use tracing::debug;

use crate::assembler::DocumentAssembler;
use crate::error::Result;
use crate::events::PageEvents;
use crate::layout::{content_area, ContentArea, Margins};
use crate::pdf::page::{estimate_text_width, helvetica_font, pdf_literal};

/// Sample paragraph repeated to fill the body when none is configured
pub const SAMPLE_PARAGRAPH: &str =
    "Bueno este es un texto de prueba para verificar el buen funcionamiento del template";

/// Number of sample paragraphs in the default body
pub const SAMPLE_REPEAT: usize = 150;

const FONT_RESOURCE: &str = "F1";

/// Typography for body pages
#[derive(Debug, Clone, PartialEq)]
pub struct BodyStyle {
    /// Font size in points
    pub font_size: f32,
    /// Distance between baselines in points
    pub leading: f32,
    /// Extra space after each paragraph in points
    pub paragraph_spacing: f32,
    pub margins: Margins,
}

impl Default for BodyStyle {
    fn default() -> Self {
        Self::with_font_size(12.0)
    }
}

impl BodyStyle {
    /// Style with the leading scaled from the font size
    pub fn with_font_size(font_size: f32) -> Self {
        Self {
            font_size,
            leading: font_size * 4.0 / 3.0,
            paragraph_spacing: 0.0,
            margins: Margins::report(),
        }
    }
}

/// Lays paragraphs out onto body pages
#[derive(Debug, Clone, Default)]
pub struct ParagraphRenderer {
    style: BodyStyle,
}

impl ParagraphRenderer {
    pub fn new(style: BodyStyle) -> Self {
        Self { style }
    }

    /// Render `paragraphs` as new pages and return how many were appended.
    ///
    /// No paragraphs means no pages.
    pub fn render<E: PageEvents>(
        &self,
        assembler: &mut DocumentAssembler<E>,
        paragraphs: &[String],
    ) -> Result<u32> {
        if paragraphs.is_empty() {
            return Ok(0);
        }

        let area = content_area(&assembler.page_size(), &self.style.margins);
        let font_id = assembler.add_object(Object::Dictionary(helvetica_font()));
        let mut fonts = Dictionary::new();
        fonts.set(FONT_RESOURCE, Object::Reference(font_id));
        let mut resources = Dictionary::new();
        resources.set("Font", Object::Dictionary(fonts));

        let mut page = PageCursor::new(area);
        let mut rendered = 0;

        for paragraph in paragraphs {
            for line in wrap(paragraph, area.width(), self.style.font_size) {
                if page.y - self.style.leading < area.bottom && page.has_content() {
                    assembler.push_page(page.take(), resources.clone())?;
                    rendered += 1;
                }
                page.y -= self.style.leading;
                page.text_line(&line, self.style.font_size);
            }
            page.y -= self.style.paragraph_spacing;
        }

        if page.has_content() {
            assembler.push_page(page.take(), resources)?;
            rendered += 1;
        }

        debug!("Rendered {} paragraphs onto {} body pages", paragraphs.len(), rendered);
        Ok(rendered)
    }
}

/// Write position and pending operators for the page being filled
struct PageCursor {
    area: ContentArea,
    y: f32,
    content: Vec<u8>,
}

impl PageCursor {
    fn new(area: ContentArea) -> Self {
        Self {
            area,
            y: area.top,
            content: Vec::new(),
        }
    }

    fn has_content(&self) -> bool {
        !self.content.is_empty()
    }

    fn text_line(&mut self, line: &str, font_size: f32) {
        self.content.extend_from_slice(
            format!(
                "BT\n/{} {} Tf\n{} {} Td\n(",
                FONT_RESOURCE, font_size, self.area.left, self.y
            )
            .as_bytes(),
        );
        self.content.extend(pdf_literal(line));
        self.content.extend_from_slice(b") Tj\nET\n");
    }

    /// Hand over the finished page and reset to the top of a fresh one
    fn take(&mut self) -> Vec<u8> {
        self.y = self.area.top;
        std::mem::take(&mut self.content)
    }
}

/// Greedy word wrap against the estimated text width.
///
/// A word wider than the line stays on a line of its own. An empty
/// paragraph still yields one (blank) line.
fn wrap(paragraph: &str, max_width: f32, font_size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in paragraph.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{} {}", current, word);
        if estimate_text_width(&candidate, font_size) > max_width {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        } else {
            current = candidate;
        }
    }

    lines.push(current);
    lines
}
