use crate::adapters::gemini::{DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};
use crate::adapters::yahoo::DEFAULT_PRICE_ENDPOINT;
use crate::core::returns::{parse_invested_date, DEFAULT_BENCHMARK_TICKER};
use crate::core::tickers::DEFAULT_TICKER_SUFFIX;
use crate::core::ConfigProvider;
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::{self, Validate};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

static ENV_VAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub report: ReportConfig,
    pub input: InputConfig,
    #[serde(default)]
    pub gemini: GeminiConfig,
    #[serde(default)]
    pub prices: PricesConfig,
    #[serde(default)]
    pub tickers: TickersConfig,
    #[serde(default)]
    pub returns: ReturnsConfig,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_owner")]
    pub owner: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    pub path: String,
    pub holdings_file: Option<String>,
    pub invested_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_gemini_model")]
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_gemini_endpoint(),
            model: default_gemini_model(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricesConfig {
    #[serde(default = "default_price_endpoint")]
    pub endpoint: String,
}

impl Default for PricesConfig {
    fn default() -> Self {
        Self {
            endpoint: default_price_endpoint(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickersConfig {
    #[serde(default = "default_suffix")]
    pub suffix: String,
    /// 額外的名稱對照，會覆蓋內建表
    #[serde(default)]
    pub overrides: HashMap<String, String>,
}

impl Default for TickersConfig {
    fn default() -> Self {
        Self {
            suffix: default_suffix(),
            overrides: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnsConfig {
    #[serde(default = "default_benchmark")]
    pub benchmark: String,
    pub concurrent_requests: Option<usize>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ReturnsConfig {
    fn default() -> Self {
        Self {
            benchmark: default_benchmark(),
            concurrent_requests: None,
            enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadConfig {
    pub output_path: String,
    pub output_formats: Vec<String>,
    pub compression: Option<CompressionConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompressionConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
    pub log_level: Option<String>,
    pub json_logs: Option<bool>,
}

fn default_owner() -> String {
    "anonymous".to_string()
}

fn default_gemini_endpoint() -> String {
    DEFAULT_GEMINI_ENDPOINT.to_string()
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_price_endpoint() -> String {
    DEFAULT_PRICE_ENDPOINT.to_string()
}

fn default_suffix() -> String {
    DEFAULT_TICKER_SUFFIX.to_string()
}

fn default_benchmark() -> String {
    DEFAULT_BENCHMARK_TICKER.to_string()
}

fn default_true() -> bool {
    true
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ReportError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ReportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${GEMINI_API_KEY})，找不到時保留原文
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("report.name", &self.report.name)?;
        validation::validate_path("input.path", &self.input.path)?;
        if let Some(holdings) = &self.input.holdings_file {
            validation::validate_path("input.holdings_file", holdings)?;
        }
        if let Some(date) = &self.input.invested_date {
            if parse_invested_date(date).is_none() {
                return Err(ReportError::InvalidConfigValueError {
                    field: "input.invested_date".to_string(),
                    value: date.clone(),
                    reason: "Expected YYYY-MM-DD".to_string(),
                });
            }
        }

        validation::validate_url("gemini.endpoint", &self.gemini.endpoint)?;
        validation::validate_non_empty_string("gemini.model", &self.gemini.model)?;
        validation::validate_url("prices.endpoint", &self.prices.endpoint)?;
        validation::validate_ticker_suffix("tickers.suffix", &self.tickers.suffix)?;
        validation::validate_non_empty_string("returns.benchmark", &self.returns.benchmark)?;

        if let Some(concurrent) = self.returns.concurrent_requests {
            validation::validate_positive_number("returns.concurrent_requests", concurrent, 1)?;
        }

        validation::validate_path("load.output_path", &self.load.output_path)?;
        validation::validate_output_formats("load.output_formats", &self.load.output_formats)?;

        Ok(())
    }

    /// 未替換的 `${VAR}` 視為沒有設定
    pub fn api_key(&self) -> Option<String> {
        self.gemini
            .api_key
            .as_ref()
            .filter(|k| !k.trim().is_empty() && !ENV_VAR.is_match(k))
            .cloned()
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }

    pub fn json_logs(&self) -> bool {
        self.monitoring
            .as_ref()
            .and_then(|m| m.json_logs)
            .unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn input_path(&self) -> &str {
        &self.input.path
    }

    fn holdings_path(&self) -> Option<&str> {
        self.input.holdings_file.as_deref()
    }

    fn default_invested_date(&self) -> Option<NaiveDate> {
        self.input.invested_date.as_deref().and_then(parse_invested_date)
    }

    fn owner(&self) -> &str {
        &self.report.owner
    }

    fn output_path(&self) -> &str {
        &self.load.output_path
    }

    fn output_formats(&self) -> &[String] {
        &self.load.output_formats
    }

    fn compress_outputs(&self) -> bool {
        self.load
            .compression
            .as_ref()
            .map(|c| c.enabled)
            .unwrap_or(false)
    }

    fn benchmark_ticker(&self) -> &str {
        &self.returns.benchmark
    }

    fn ticker_suffix(&self) -> &str {
        &self.tickers.suffix
    }

    fn ticker_overrides(&self) -> &HashMap<String, String> {
        &self.tickers.overrides
    }

    fn concurrent_requests(&self) -> usize {
        self.returns.concurrent_requests.unwrap_or(5)
    }

    fn returns_enabled(&self) -> bool {
        self.returns.enabled
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[report]
name = "weekly"

[input]
path = "report.txt"

[load]
output_path = "./output"
output_formats = ["pdf", "csv"]
"#;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let config = TomlConfig::from_toml_str(MINIMAL).unwrap();

        assert_eq!(config.report.owner, "anonymous");
        assert_eq!(config.ticker_suffix(), ".NS");
        assert_eq!(config.benchmark_ticker(), "^NSEI");
        assert_eq!(config.concurrent_requests(), 5);
        assert_eq!(config.gemini.model, "gemini-1.5-flash");
        assert!(config.returns_enabled());
        assert!(!config.compress_outputs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[report]
name = "full"
owner = "jane.doe@example.com"

[input]
path = "report.txt"
holdings_file = "holdings.csv"
invested_date = "2022-01-15"

[gemini]
endpoint = "http://localhost:9000"
model = "gemini-2.0-flash"

[prices]
endpoint = "http://localhost:9001"

[tickers]
suffix = ".BO"

[tickers.overrides]
"MY FUND" = "MYFUND.BO"

[returns]
benchmark = "^BSESN"
concurrent_requests = 2
enabled = false

[load]
output_path = "./out"
output_formats = ["pdf", "json"]
compression = { enabled = true }

[monitoring]
enabled = true
json_logs = true
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.owner(), "jane.doe@example.com");
        assert_eq!(config.holdings_path(), Some("holdings.csv"));
        assert_eq!(
            config.default_invested_date(),
            NaiveDate::from_ymd_opt(2022, 1, 15)
        );
        assert_eq!(config.ticker_suffix(), ".BO");
        assert_eq!(
            config.ticker_overrides().get("MY FUND").map(String::as_str),
            Some("MYFUND.BO")
        );
        assert_eq!(config.concurrent_requests(), 2);
        assert!(!config.returns_enabled());
        assert!(config.compress_outputs());
        assert!(config.monitoring_enabled());
        assert!(config.json_logs());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PORTFOLIO_TEST_GEMINI_KEY", "secret-key");

        let toml_content = format!(
            "{}\n[gemini]\napi_key = \"${{PORTFOLIO_TEST_GEMINI_KEY}}\"\n",
            MINIMAL
        );
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.api_key().as_deref(), Some("secret-key"));

        std::env::remove_var("PORTFOLIO_TEST_GEMINI_KEY");
    }

    #[test]
    fn test_unresolved_env_var_is_no_key() {
        let toml_content = format!(
            "{}\n[gemini]\napi_key = \"${{PORTFOLIO_TEST_UNSET_KEY}}\"\n",
            MINIMAL
        );
        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.api_key(), None);
    }

    #[test]
    fn test_config_validation() {
        let bad_suffix = MINIMAL.replace("[load]", "[tickers]\nsuffix = \"NS\"\n\n[load]");
        let config = TomlConfig::from_toml_str(&bad_suffix).unwrap();
        assert!(config.validate().is_err());

        let bad_format = MINIMAL.replace("[\"pdf\", \"csv\"]", "[\"pdf\", \"tsv\"]");
        let config = TomlConfig::from_toml_str(&bad_format).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_section_is_parse_error() {
        let err = TomlConfig::from_toml_str("[report]\nname = \"x\"\n").unwrap_err();
        assert!(matches!(err, ReportError::ConfigValidationError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.report.name, "weekly");
    }
}
