//! Section 8 table extraction.
//!
//! The asset table is written by the model as a loose markdown table, so
//! parsing is best effort: anything that is not a 4-cell row is ignored.

use crate::domain::model::AssetRow;
use once_cell::sync::Lazy;
use regex::Regex;

static SECTION_8_HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^8\.\s*\*Asset\s*Allocation\s*Breakdown\*")
        .expect("section 8 pattern is valid")
});

static ANY_SECTION_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d\.\s*\*").expect("section heading pattern is valid"));

static DIVIDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{3,}").expect("divider pattern is valid"));

const COLUMN_SEPARATOR: char = '|';
const HEADER_MARKER: &str = "asset name";

/// Body of section 8, up to the next numbered heading. Empty if absent.
pub fn extract_section8(validated: &str) -> String {
    let lines: Vec<&str> = validated.split('\n').collect();

    let Some(start) = lines.iter().position(|l| SECTION_8_HEADING.is_match(l)) else {
        return String::new();
    };

    let end = lines[start + 1..]
        .iter()
        .position(|l| ANY_SECTION_HEADING.is_match(l))
        .map(|offset| start + 1 + offset)
        .unwrap_or(lines.len());

    lines[start + 1..end].join("\n")
}

pub fn parse_rows(body: &str) -> Vec<AssetRow> {
    body.split('\n')
        .map(str::trim)
        .filter(|line| is_data_line(line))
        .filter_map(parse_row)
        .collect()
}

/// Shorthand for `parse_rows(&extract_section8(validated))`.
pub fn extract_assets(validated: &str) -> Vec<AssetRow> {
    let rows = parse_rows(&extract_section8(validated));
    tracing::debug!("Parsed {} asset rows from section 8", rows.len());
    rows
}

fn is_data_line(line: &str) -> bool {
    !line.is_empty()
        && line.contains(COLUMN_SEPARATOR)
        && !line.to_lowercase().contains(HEADER_MARKER)
        && !DIVIDER.is_match(line)
}

fn parse_row(line: &str) -> Option<AssetRow> {
    let cells: Vec<&str> = line
        .split(COLUMN_SEPARATOR)
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .collect();

    match cells.as_slice() {
        [name, asset_type, invested, current] => Some(AssetRow {
            name: name.to_string(),
            asset_type: asset_type.to_string(),
            invested_amount: invested.to_string(),
            current_value: current.to_string(),
        }),
        _ => None,
    }
}
