pub mod assets;
pub mod engine;
pub mod pipeline;
pub mod prompts;
pub mod render;
pub mod returns;
pub mod sections;
pub mod tickers;

pub use crate::domain::model::{AnalysisResult, ValidatedReport};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
