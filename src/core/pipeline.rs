use crate::adapters::pdf::render_pdf;
use crate::core::assets::extract_assets;
use crate::core::returns::{parse_invested_date, ReturnAnalyzer};
use crate::core::sections::SectionValidator;
use crate::core::tickers::{OverrideTable, TickerResolver};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{AnalysisResult, AssetRow, Holding, ValidatedReport};
use crate::domain::ports::{PriceSource, TextGenerator};
use crate::utils::error::{ReportError, Result};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;
use zip::write::{FileOptions, ZipWriter};

/// "Investment Report - 2024-06-01"
pub fn report_name(date: NaiveDate) -> String {
    format!("Investment Report - {}", date.format("%Y-%m-%d"))
}

/// `<millis>_<owner>_report`, with characters unsafe in file names replaced.
pub fn file_stem(owner: &str, millis: i64) -> String {
    let owner = owner.replace(['@', '.', '/', '\\'], "_");
    format!("{}_{}_report", millis, owner)
}

#[derive(Debug, Deserialize)]
struct HoldingRow {
    name: String,
    #[serde(default)]
    invested_date: Option<String>,
}

/// `name,invested_date` CSV. Blank dates take `default_date`; unreadable
/// dates are treated as unknown.
pub fn parse_holdings(data: &[u8], default_date: Option<NaiveDate>) -> Result<Vec<Holding>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut holdings = Vec::new();
    for row in reader.deserialize::<HoldingRow>() {
        let row = row?;
        if row.name.is_empty() {
            continue;
        }

        let invested_date = match row.invested_date.as_deref().filter(|d| !d.is_empty()) {
            Some(raw) => {
                let parsed = parse_invested_date(raw);
                if parsed.is_none() {
                    tracing::warn!("⚠️ Unreadable invested date '{}' for {}", raw, row.name);
                }
                parsed
            }
            None => default_date,
        };
        holdings.push(Holding::new(row.name, invested_date));
    }
    Ok(holdings)
}

pub struct ReportPipeline<S: Storage, C: ConfigProvider, G: TextGenerator, P: PriceSource> {
    storage: S,
    config: C,
    resolver: TickerResolver<G>,
    analyzer: ReturnAnalyzer<P>,
}

impl<S, C, G, P> ReportPipeline<S, C, G, P>
where
    S: Storage,
    C: ConfigProvider,
    G: TextGenerator,
    P: PriceSource,
{
    pub fn new(storage: S, config: C, generator: G, prices: P) -> Self {
        let overrides = OverrideTable::with_extra(config.ticker_overrides());
        let resolver = TickerResolver::new(generator, overrides, config.ticker_suffix());
        let analyzer = ReturnAnalyzer::new(
            prices,
            config.benchmark_ticker(),
            config.concurrent_requests(),
        );

        Self {
            storage,
            config,
            resolver,
            analyzer,
        }
    }

    async fn holdings(&self, assets: &[AssetRow]) -> Result<Vec<Holding>> {
        let default_date = self.config.default_invested_date();

        match self.config.holdings_path() {
            Some(path) => {
                tracing::debug!("Reading holdings from {}", path);
                let data = self.storage.read_file(path).await?;
                parse_holdings(&data, default_date)
            }
            None => Ok(assets
                .iter()
                .map(|a| Holding::new(a.name.clone(), default_date))
                .collect()),
        }
    }

    fn wants(&self, format: &str) -> bool {
        self.config.output_formats().iter().any(|f| f == format)
    }

    /// Serialized outputs as (file name, bytes), in write order.
    fn build_artifacts(
        &self,
        result: &AnalysisResult,
        stem: &str,
    ) -> Result<Vec<(String, Vec<u8>)>> {
        let mut files = Vec::new();
        let text = result.validated.display_text();

        if self.wants("pdf") {
            let pdf = render_pdf(&result.report_name, text)?;
            files.push((format!("{}.pdf", stem), pdf));
        }

        if self.wants("txt") {
            files.push((format!("{}.txt", stem), text.as_bytes().to_vec()));
        }

        if self.wants("csv") {
            files.push((format!("{}_assets.csv", stem), to_csv(&result.assets)?));
            files.push((format!("{}_returns.csv", stem), to_csv(&result.returns)?));
        }

        if self.wants("json") {
            let json = serde_json::to_vec_pretty(result)?;
            files.push((format!("{}_analysis.json", stem), json));
        }

        Ok(files)
    }

    fn full_path(&self, name: &str) -> String {
        Path::new(self.config.output_path())
            .join(name)
            .to_string_lossy()
            .to_string()
    }
}

fn to_csv<T: serde::Serialize>(rows: &[T]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| ReportError::IoError(e.into_error()))
}

fn zip_bundle(files: &[(String, Vec<u8>)]) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for (name, data) in files {
        zip.start_file::<_, ()>(name.as_str(), FileOptions::default())?;
        zip.write_all(data)?;
    }

    // 完成並取回底層 Vec<u8>
    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}

#[async_trait::async_trait]
impl<S, C, G, P> Pipeline for ReportPipeline<S, C, G, P>
where
    S: Storage,
    C: ConfigProvider,
    G: TextGenerator,
    P: PriceSource,
{
    async fn extract(&self) -> Result<ValidatedReport> {
        tracing::debug!("Reading report text from {}", self.config.input_path());
        let data = self.storage.read_file(self.config.input_path()).await?;
        let raw = String::from_utf8_lossy(&data);

        Ok(SectionValidator::validate_report(&raw))
    }

    async fn transform(&self, validated: ValidatedReport) -> Result<AnalysisResult> {
        let report_name = report_name(Utc::now().date_naive());

        // 無法辨識任何段落時只保留原文，不做資產分析
        if !validated.is_recognized() {
            return Ok(AnalysisResult {
                report_name,
                validated,
                assets: Vec::new(),
                tickers: Vec::new(),
                returns: Vec::new(),
            });
        }

        let assets = extract_assets(&validated.text);
        tracing::info!("📋 Found {} assets in allocation table", assets.len());

        let holdings = self.holdings(&assets).await?;
        let names: Vec<String> = holdings.iter().map(|h| h.name.clone()).collect();
        let tickers = self.resolver.resolve(&names).await;

        let returns = if self.config.returns_enabled() && !holdings.is_empty() {
            let by_name: HashMap<String, String> = tickers
                .iter()
                .map(|t| (t.asset_name.clone(), t.ticker.clone()))
                .collect();
            self.analyzer.analyze(&holdings, &by_name).await
        } else {
            tracing::debug!("Return analysis skipped");
            Vec::new()
        };

        Ok(AnalysisResult {
            report_name,
            validated,
            assets,
            tickers,
            returns,
        })
    }

    async fn load(&self, result: AnalysisResult) -> Result<String> {
        let stem = file_stem(self.config.owner(), Utc::now().timestamp_millis());
        let files = self.build_artifacts(&result, &stem)?;

        if files.is_empty() {
            return Err(ReportError::ProcessingError {
                message: "No output format produced a file".to_string(),
            });
        }

        if self.config.compress_outputs() || self.wants("zip") {
            let name = format!("{}.zip", stem);
            tracing::debug!("Creating ZIP file with {} files", files.len());
            let zip_data = zip_bundle(&files)?;

            tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
            self.storage.write_file(&name, &zip_data).await?;
            return Ok(self.full_path(&name));
        }

        for (name, data) in &files {
            tracing::debug!("Writing {} ({} bytes)", name, data.len());
            self.storage.write_file(name, data).await?;
        }

        // PDF 優先作為主要輸出
        let primary = files
            .iter()
            .map(|(name, _)| name)
            .find(|name| name.ends_with(".pdf"))
            .unwrap_or(&files[0].0);
        Ok(self.full_path(primary))
    }
}
