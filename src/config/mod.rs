pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use cli_args::CliConfig;

#[cfg(feature = "cli")]
mod cli_args {
    use crate::adapters::gemini::{DEFAULT_GEMINI_ENDPOINT, DEFAULT_GEMINI_MODEL};
    use crate::adapters::yahoo::DEFAULT_PRICE_ENDPOINT;
    use crate::core::returns::{parse_invested_date, DEFAULT_BENCHMARK_TICKER};
    use crate::core::ConfigProvider;
    use crate::utils::error::{ReportError, Result};
    use crate::utils::validation::{self, Validate};
    use chrono::NaiveDate;
    use clap::Parser;
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "portfolio-report")]
    #[command(about = "Validate an AI portfolio report, resolve tickers and compare returns")]
    pub struct CliConfig {
        #[arg(long, help = "Raw report text produced by the model")]
        pub input: String,

        #[arg(long, default_value = "./output")]
        pub output_path: String,

        #[arg(long, help = "CSV with name,invested_date columns")]
        pub holdings_file: Option<String>,

        #[arg(long, help = "Invested date (YYYY-MM-DD) for holdings without one")]
        pub invested_date: Option<String>,

        #[arg(long, default_value = "anonymous")]
        pub owner: String,

        #[arg(long, default_value = DEFAULT_BENCHMARK_TICKER)]
        pub benchmark: String,

        #[arg(long, default_value = ".NS")]
        pub ticker_suffix: String,

        #[arg(long, default_value = DEFAULT_GEMINI_MODEL)]
        pub gemini_model: String,

        #[arg(long, default_value = DEFAULT_GEMINI_ENDPOINT)]
        pub gemini_endpoint: String,

        #[arg(long, default_value = DEFAULT_PRICE_ENDPOINT)]
        pub price_endpoint: String,

        #[arg(long, default_value = "5")]
        pub concurrent_requests: usize,

        #[arg(long, value_delimiter = ',', default_value = "pdf,txt,csv,json")]
        pub output_formats: Vec<String>,

        #[arg(long, help = "Bundle all outputs into a zip archive")]
        pub compress: bool,

        #[arg(long, help = "Skip historical return analysis")]
        pub skip_returns: bool,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log CPU and memory usage per phase")]
        pub monitor: bool,

        #[arg(skip)]
        #[serde(default)]
        pub ticker_overrides: HashMap<String, String>,
    }

    impl ConfigProvider for CliConfig {
        fn input_path(&self) -> &str {
            &self.input
        }

        fn holdings_path(&self) -> Option<&str> {
            self.holdings_file.as_deref()
        }

        fn default_invested_date(&self) -> Option<NaiveDate> {
            self.invested_date.as_deref().and_then(parse_invested_date)
        }

        fn owner(&self) -> &str {
            &self.owner
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn output_formats(&self) -> &[String] {
            &self.output_formats
        }

        fn compress_outputs(&self) -> bool {
            self.compress
        }

        fn benchmark_ticker(&self) -> &str {
            &self.benchmark
        }

        fn ticker_suffix(&self) -> &str {
            &self.ticker_suffix
        }

        fn ticker_overrides(&self) -> &HashMap<String, String> {
            &self.ticker_overrides
        }

        fn concurrent_requests(&self) -> usize {
            self.concurrent_requests
        }

        fn returns_enabled(&self) -> bool {
            !self.skip_returns
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validation::validate_path("input", &self.input)?;
            validation::validate_path("output_path", &self.output_path)?;
            if let Some(holdings) = &self.holdings_file {
                validation::validate_path("holdings_file", holdings)?;
            }
            if let Some(date) = &self.invested_date {
                if parse_invested_date(date).is_none() {
                    return Err(ReportError::InvalidConfigValueError {
                        field: "invested_date".to_string(),
                        value: date.clone(),
                        reason: "Expected YYYY-MM-DD".to_string(),
                    });
                }
            }
            validation::validate_non_empty_string("benchmark", &self.benchmark)?;
            validation::validate_ticker_suffix("ticker_suffix", &self.ticker_suffix)?;
            validation::validate_non_empty_string("gemini_model", &self.gemini_model)?;
            validation::validate_url("gemini_endpoint", &self.gemini_endpoint)?;
            validation::validate_url("price_endpoint", &self.price_endpoint)?;
            validation::validate_positive_number(
                "concurrent_requests",
                self.concurrent_requests,
                1,
            )?;
            validation::validate_output_formats("output_formats", &self.output_formats)?;
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_defaults() {
            let config = CliConfig::parse_from(["portfolio-report", "--input", "report.txt"]);
            assert_eq!(config.output_path, "./output");
            assert_eq!(config.benchmark, "^NSEI");
            assert_eq!(config.ticker_suffix, ".NS");
            assert_eq!(config.output_formats, vec!["pdf", "txt", "csv", "json"]);
            assert!(config.returns_enabled());
            assert!(config.validate().is_ok());
        }

        #[test]
        fn test_invalid_values_are_rejected() {
            let bad_date = CliConfig::parse_from([
                "portfolio-report",
                "--input",
                "r.txt",
                "--invested-date",
                "03/2023",
            ]);
            assert!(bad_date.validate().is_err());

            let bad_format = CliConfig::parse_from([
                "portfolio-report",
                "--input",
                "r.txt",
                "--output-formats",
                "pdf,docx",
            ]);
            assert!(bad_format.validate().is_err());

            let zero = CliConfig::parse_from([
                "portfolio-report",
                "--input",
                "r.txt",
                "--concurrent-requests",
                "0",
            ]);
            assert!(zero.validate().is_err());
        }

        #[test]
        fn test_default_invested_date() {
            let config = CliConfig::parse_from([
                "portfolio-report",
                "--input",
                "r.txt",
                "--invested-date",
                "2023-04-01",
            ]);
            assert_eq!(
                config.default_invested_date(),
                NaiveDate::from_ymd_opt(2023, 4, 1)
            );
        }
    }
}
