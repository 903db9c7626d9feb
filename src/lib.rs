pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use crate::config::cli::LocalStorage;
#[cfg(feature = "cli")]
pub use crate::config::CliConfig;
pub use crate::config::toml_config::TomlConfig;

pub use crate::adapters::{GeminiClient, YahooPriceSource};
pub use crate::core::{engine::ReportEngine, pipeline::ReportPipeline};
pub use crate::core::{
    assets::extract_assets, render::ReportRenderer, returns::ReturnAnalyzer,
    sections::SectionValidator, tickers::TickerResolver,
};
pub use crate::utils::error::{ReportError, Result};
