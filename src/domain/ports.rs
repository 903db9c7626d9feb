use crate::domain::model::{AnalysisResult, PricePoint, ValidatedReport};
use crate::utils::error::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    /// Raw model output to validate.
    fn input_path(&self) -> &str;
    /// Optional `name,invested_date` CSV.
    fn holdings_path(&self) -> Option<&str>;
    fn default_invested_date(&self) -> Option<NaiveDate>;
    fn owner(&self) -> &str;
    fn output_path(&self) -> &str;
    fn output_formats(&self) -> &[String];
    fn compress_outputs(&self) -> bool;
    fn benchmark_ticker(&self) -> &str;
    fn ticker_suffix(&self) -> &str;
    fn ticker_overrides(&self) -> &HashMap<String, String>;
    fn concurrent_requests(&self) -> usize;
    fn returns_enabled(&self) -> bool;
}

/// Black-box language model: prompt in, free text out.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_text(&self, prompt: &str) -> Result<String>;
}

/// Daily close prices between two dates, both inclusive.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_daily_closes(
        &self,
        ticker: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PricePoint>>;
}

/// A piece of styled text handed to a document sink.
#[derive(Debug, Clone, PartialEq)]
pub enum StyledBlock {
    Heading {
        section: u8,
        text: String,
        color: Rgb,
    },
    Paragraph(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };

    pub const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as u8,
            g: ((hex >> 8) & 0xff) as u8,
            b: (hex & 0xff) as u8,
        }
    }
}

/// Consumes styled blocks and produces the final artifact.
pub trait DocumentSink {
    fn write_block(&mut self, block: &StyledBlock) -> Result<()>;
    fn finish(self) -> Result<()>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<ValidatedReport>;
    async fn transform(&self, report: ValidatedReport) -> Result<AnalysisResult>;
    async fn load(&self, result: AnalysisResult) -> Result<String>;
}
