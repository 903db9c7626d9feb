//! Turns validated report text into styled blocks for a document sink.

use crate::domain::ports::{DocumentSink, Rgb, StyledBlock};
use crate::utils::error::Result;
use once_cell::sync::Lazy;
use regex::Regex;

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d)\.\s\*(.*?)\*").expect("heading pattern is valid"));

/// Heading colors for sections 1 through 8.
const SECTION_COLORS: [Rgb; 8] = [
    Rgb::from_hex(0x2c3e50),
    Rgb::from_hex(0x2980b9),
    Rgb::from_hex(0x27ae60),
    Rgb::from_hex(0xd35400),
    Rgb::from_hex(0x8e44ad),
    Rgb::from_hex(0x16a085),
    Rgb::from_hex(0xc0392b),
    Rgb::from_hex(0x7f8c8d),
];

pub fn section_color(section: u8) -> Rgb {
    section
        .checked_sub(1)
        .and_then(|i| SECTION_COLORS.get(i as usize))
        .copied()
        .unwrap_or(Rgb::BLACK)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ReportRenderer;

impl ReportRenderer {
    pub fn new() -> Self {
        Self
    }

    /// One block per line. Headings become `"<k>. <title>"` in the section
    /// color; every other line, blank ones included, is a paragraph.
    pub fn blocks(&self, text: &str) -> Vec<StyledBlock> {
        text.replace("\r\n", "\n")
            .split('\n')
            .map(Self::classify)
            .collect()
    }

    pub fn render<S: DocumentSink>(&self, text: &str, mut sink: S) -> Result<()> {
        let blocks = self.blocks(text);
        let headings = blocks
            .iter()
            .filter(|b| matches!(b, StyledBlock::Heading { .. }))
            .count();
        tracing::debug!(
            "Rendering {} blocks ({} headings)",
            blocks.len(),
            headings
        );

        for block in &blocks {
            sink.write_block(block)?;
        }
        sink.finish()
    }

    fn classify(line: &str) -> StyledBlock {
        let heading = HEADING.captures(line).and_then(|caps| {
            let digit = caps.get(1)?.as_str();
            let title = caps.get(2)?.as_str().trim();
            let section = digit.parse::<u8>().ok()?;
            Some(StyledBlock::Heading {
                section,
                text: format!("{}. {}", digit, title),
                color: section_color(section),
            })
        });

        heading.unwrap_or_else(|| StyledBlock::Paragraph(line.to_string()))
    }
}
