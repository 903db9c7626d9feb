use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Placeholder the model and the resolvers use for "unknown".
pub const NOT_AVAILABLE: &str = "N/A";

/// One numbered block of the generated report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub index: u8,
    pub title: String,
    /// Heading line as it appeared in the source text.
    pub heading: String,
    pub body: Vec<String>,
}

/// Sections in strictly increasing index order. Missing sections are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub sections: Vec<Section>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn section(&self, index: u8) -> Option<&Section> {
        self.sections.iter().find(|s| s.index == index)
    }

    pub fn indices(&self) -> Vec<u8> {
        self.sections.iter().map(|s| s.index).collect()
    }

    /// Retained lines joined back into text, trimmed.
    pub fn to_text(&self) -> String {
        let mut lines: Vec<&str> = Vec::new();
        for section in &self.sections {
            lines.push(&section.heading);
            lines.extend(section.body.iter().map(String::as_str));
        }
        lines.join("\n").trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRow {
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub invested_amount: String,
    pub current_value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerMapping {
    pub asset_name: String,
    pub ticker: String,
}

/// An asset the caller wants return figures for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub name: String,
    pub invested_date: Option<NaiveDate>,
}

impl Holding {
    pub fn new(name: impl Into<String>, invested_date: Option<NaiveDate>) -> Self {
        Self {
            name: name.into(),
            invested_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: Option<f64>,
}

/// Annualized growth rate, or "N/A" when it cannot be computed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cagr {
    /// Fraction, 0.1234 prints as "12.34%".
    Rate(f64),
    NotAvailable,
}

impl Cagr {
    pub fn is_available(&self) -> bool {
        matches!(self, Cagr::Rate(_))
    }

    pub fn rate(&self) -> Option<f64> {
        match self {
            Cagr::Rate(r) => Some(*r),
            Cagr::NotAvailable => None,
        }
    }
}

impl fmt::Display for Cagr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cagr::Rate(r) => write!(f, "{:.2}%", r * 100.0),
            Cagr::NotAvailable => f.write_str(NOT_AVAILABLE),
        }
    }
}

impl Serialize for Cagr {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Cagr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let parsed = raw
            .trim()
            .strip_suffix('%')
            .and_then(|n| n.trim().parse::<f64>().ok())
            .map(|pct| Cagr::Rate(pct / 100.0))
            .unwrap_or(Cagr::NotAvailable);
        Ok(parsed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub asset_name: String,
    pub ticker: String,
    pub invested_date: Option<NaiveDate>,
    pub asset_cagr: Cagr,
    pub benchmark_cagr: Cagr,
}

/// Output of the section validator together with the text it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedReport {
    pub raw: String,
    pub text: String,
    pub report: Report,
}

impl ValidatedReport {
    /// False when not even section 1 was found.
    pub fn is_recognized(&self) -> bool {
        !self.report.is_empty()
    }

    /// Text to show the user: the validated report, or the raw text when
    /// nothing could be recognized.
    pub fn display_text(&self) -> &str {
        if self.is_recognized() {
            &self.text
        } else {
            self.raw.trim()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub report_name: String,
    pub validated: ValidatedReport,
    pub assets: Vec<AssetRow>,
    pub tickers: Vec<TickerMapping>,
    pub returns: Vec<ReturnRecord>,
}
