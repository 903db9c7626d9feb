//! A4 PDF output for styled report blocks, using the PDF builtin fonts.

use crate::core::render::ReportRenderer;
use crate::domain::ports::{DocumentSink, Rgb, StyledBlock};
use crate::utils::error::{ReportError, Result};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use std::io::{BufWriter, Write};

const PAGE_WIDTH_PT: f32 = 595.28;
const PAGE_HEIGHT_PT: f32 = 841.89;
const MARGIN_PT: f32 = 50.0;
const MM_PER_PT: f32 = 25.4 / 72.0;

const BODY_SIZE: f32 = 12.0;
const HEADING_SIZE: f32 = 16.0;
const LINE_GAP: f32 = 4.0;
/// Helvetica line height relative to the font size.
const LINE_HEIGHT: f32 = 1.16;
/// Average Helvetica glyph width relative to the font size.
const AVG_CHAR_WIDTH: f32 = 0.52;

fn mm(pt: f32) -> Mm {
    Mm(pt * MM_PER_PT)
}

fn pdf_color(color: Rgb) -> Color {
    Color::Rgb(printpdf::Rgb::new(
        color.r as f32 / 255.0,
        color.g as f32 / 255.0,
        color.b as f32 / 255.0,
        None,
    ))
}

fn render_error(e: impl std::fmt::Display) -> ReportError {
    ReportError::RenderError {
        message: e.to_string(),
    }
}

/// Replace characters the builtin fonts cannot show.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '₹' => out.push_str("Rs."),
            '\t' => out.push_str("    "),
            '‘' | '’' => out.push('\''),
            '“' | '”' => out.push('"'),
            '–' | '—' | '•' => out.push('-'),
            '…' => out.push_str("..."),
            c if c.is_ascii() && !c.is_ascii_control() => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

/// Greedy word wrap at `max_chars` columns. Overlong words are split.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }

        let word: String = word.into_iter().collect();
        if current.is_empty() {
            current = word;
        } else if current.chars().count() + 1 + word.chars().count() <= max_chars {
            current.push(' ');
            current.push_str(&word);
        } else {
            lines.push(std::mem::replace(&mut current, word));
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

pub struct PdfDocumentSink<W: Write> {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    /// Top of the next line, in points from the bottom of the page.
    cursor: f32,
    pages: usize,
    writer: W,
}

impl<W: Write> PdfDocumentSink<W> {
    pub fn new(title: &str, writer: W) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(
            title,
            mm(PAGE_WIDTH_PT),
            mm(PAGE_HEIGHT_PT),
            "Layer 1",
        );
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(render_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(render_error)?;
        let layer = doc.get_page(page).get_layer(layer);

        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            cursor: PAGE_HEIGHT_PT - MARGIN_PT,
            pages: 1,
            writer,
        })
    }

    pub fn page_count(&self) -> usize {
        self.pages
    }

    fn new_page(&mut self) {
        self.pages += 1;
        let (page, layer) = self.doc.add_page(
            mm(PAGE_WIDTH_PT),
            mm(PAGE_HEIGHT_PT),
            format!("Layer {}", self.pages),
        );
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.cursor = PAGE_HEIGHT_PT - MARGIN_PT;
    }

    fn move_down(&mut self, height: f32) {
        self.cursor -= height;
        if self.cursor < MARGIN_PT {
            self.new_page();
        }
    }

    fn write_lines(&mut self, text: &str, size: f32, bold: bool, color: Rgb, gap: f32) {
        let max_chars = ((PAGE_WIDTH_PT - 2.0 * MARGIN_PT) / (size * AVG_CHAR_WIDTH)) as usize;
        let advance = size * LINE_HEIGHT + gap;

        for line in wrap(&sanitize(text), max_chars) {
            if self.cursor - size * LINE_HEIGHT < MARGIN_PT {
                self.new_page();
            }
            let font = if bold { &self.bold } else { &self.regular };
            self.layer.set_fill_color(pdf_color(color));
            self.layer.use_text(
                line,
                size,
                mm(MARGIN_PT),
                mm(self.cursor - size),
                font,
            );
            self.cursor -= advance;
        }
    }
}

impl<W: Write> DocumentSink for PdfDocumentSink<W> {
    fn write_block(&mut self, block: &StyledBlock) -> Result<()> {
        match block {
            StyledBlock::Heading { text, color, .. } => {
                self.move_down(BODY_SIZE * LINE_HEIGHT);
                self.write_lines(text, HEADING_SIZE, true, *color, 0.0);
                self.move_down(HEADING_SIZE * LINE_HEIGHT * 0.5);
            }
            StyledBlock::Paragraph(text) if text.trim().is_empty() => {
                self.move_down(BODY_SIZE * LINE_HEIGHT + LINE_GAP);
            }
            StyledBlock::Paragraph(text) => {
                self.write_lines(text, BODY_SIZE, false, Rgb::BLACK, LINE_GAP);
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<()> {
        tracing::debug!("Writing PDF with {} pages", self.pages);
        let mut buffer = BufWriter::new(self.writer);
        self.doc.save(&mut buffer).map_err(render_error)?;
        let mut writer = buffer
            .into_inner()
            .map_err(|e| ReportError::IoError(e.into_error()))?;
        writer.flush()?;
        Ok(())
    }
}

/// Render report text to PDF bytes.
pub fn render_pdf(title: &str, text: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    let sink = PdfDocumentSink::new(title, &mut bytes)?;
    ReportRenderer::new().render(text, sink)?;
    Ok(bytes)
}
