//! Section validation for model-authored reports.
//!
//! The model is asked for eight headings of the form `1. *Title*`. Matching is
//! keyword based. The report starts at the section 1 heading; from there on
//! every line is kept verbatim.

use crate::domain::model::{Report, Section, ValidatedReport};
use once_cell::sync::Lazy;
use regex::Regex;

pub const SECTION_COUNT: u8 = 8;

/// Title keywords per section, in the order they must appear.
const SECTION_KEYWORDS: [&[&str]; SECTION_COUNT as usize] = [
    &["Summary", "Portfolio"],
    &["Goal", "Alignment", "Grade"],
    &["Goal", "Alignment", "Percentage"],
    &["Risk", "Meter"],
    &["Estimated", "5", "Year", "Return"],
    &["Where", "Strong"],
    &["Where", "Improve"],
    &["Asset", "Allocation", "Breakdown"],
];

/// Canonical titles, used when prompting the model.
pub const SECTION_TITLES: [&str; SECTION_COUNT as usize] = [
    "Summary & Portfolio Characteristics",
    "Goal Alignment Grade",
    "Goal Alignment Percentage",
    "Risk Meter",
    "Estimated 5-Year Return",
    "Where You Are Strong",
    "Where You Need to Improve",
    "Asset Allocation Breakdown",
];

static SECTION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    SECTION_KEYWORDS
        .iter()
        .enumerate()
        .map(|(i, keywords)| {
            let body = keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join(".*");
            Regex::new(&format!(r"(?i)^{}\.\s*\*.*{}.*\*", i + 1, body))
                .expect("section heading pattern is valid")
        })
        .collect()
});

static HEADING_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d\.\s*\*(.*?)\*").expect("heading title pattern is valid"));

pub struct SectionValidator;

impl SectionValidator {
    /// Clean raw model output: drop everything before the section 1 heading
    /// and keep the rest verbatim.
    ///
    /// An expected-section cursor walks the headings. Only the heading the
    /// cursor expects advances it; out-of-order headings are retained as
    /// ordinary lines. Returns an empty string when section 1 never appears.
    pub fn validate(raw: &str) -> String {
        let normalized = raw.replace("\r\n", "\n");
        let normalized = normalized.trim();

        let mut retained: Vec<&str> = Vec::new();
        let mut expected: u8 = 1;
        let mut found_start = false;

        for line in normalized.split('\n') {
            let trimmed = line.trim();
            if !found_start && trimmed.is_empty() {
                continue;
            }

            if expected <= SECTION_COUNT && Self::matches_section(trimmed, expected) {
                found_start = true;
                expected += 1;
                retained.push(line);
            } else if found_start {
                retained.push(line);
            }
        }

        retained.join("\n").trim().to_string()
    }

    /// Split validated text into typed sections.
    ///
    /// A heading opens a section only if its index is above the last opened
    /// one, so indices strictly increase and gaps stay gaps. Earlier or
    /// repeated headings remain body lines of the current section.
    pub fn parse_sections(validated: &str) -> Report {
        let mut sections: Vec<Section> = Vec::new();

        for line in validated.split('\n') {
            let last = sections.last().map(|s| s.index).unwrap_or(0);
            let trimmed = line.trim();

            let opened = (last + 1..=SECTION_COUNT).find(|&k| Self::matches_section(trimmed, k));
            if let Some(index) = opened {
                sections.push(Section {
                    index,
                    title: heading_title(trimmed).unwrap_or_default(),
                    heading: line.to_string(),
                    body: Vec::new(),
                });
            } else if let Some(current) = sections.last_mut() {
                current.body.push(line.to_string());
            }
        }

        Report { sections }
    }

    pub fn extract(raw: &str) -> Report {
        Self::parse_sections(&Self::validate(raw))
    }

    /// Whether `line` is the heading of section `index` (1-based).
    pub fn matches_section(line: &str, index: u8) -> bool {
        index
            .checked_sub(1)
            .and_then(|i| SECTION_PATTERNS.get(i as usize))
            .map(|re| re.is_match(line))
            .unwrap_or(false)
    }

    pub fn validate_report(raw: &str) -> ValidatedReport {
        let text = Self::validate(raw);
        let report = Self::parse_sections(&text);

        if report.is_empty() {
            tracing::warn!("⚠️ No report sections recognized, falling back to raw text");
        } else if report.len() < SECTION_COUNT as usize {
            tracing::warn!(
                "⚠️ Only {} of {} sections recognized: {:?}",
                report.len(),
                SECTION_COUNT,
                report.indices()
            );
        } else {
            tracing::debug!("All {} sections recognized", SECTION_COUNT);
        }

        ValidatedReport {
            raw: raw.to_string(),
            text,
            report,
        }
    }
}

fn heading_title(line: &str) -> Option<String> {
    HEADING_TITLE
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}
