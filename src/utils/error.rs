use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Text generation failed: {message}")]
    GenerationError { message: String },

    #[error("Price data unavailable for {ticker}: {message}")]
    PriceDataError { ticker: String, message: String },

    #[error("Document rendering failed: {message}")]
    RenderError { message: String },
}

pub type Result<T> = std::result::Result<T, ReportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Network,
    Data,
    Rendering,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReportError::ConfigError { .. }
            | ReportError::ConfigValidationError { .. }
            | ReportError::InvalidConfigValueError { .. }
            | ReportError::MissingConfigError { .. } => ErrorCategory::Configuration,
            ReportError::ApiError(_)
            | ReportError::GenerationError { .. }
            | ReportError::PriceDataError { .. } => ErrorCategory::Network,
            ReportError::CsvError(_)
            | ReportError::SerializationError(_)
            | ReportError::ProcessingError { .. }
            | ReportError::ValidationError { .. } => ErrorCategory::Data,
            ReportError::RenderError { .. } | ReportError::ZipError(_) => ErrorCategory::Rendering,
            ReportError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 外部服務失敗通常可以重試
            ReportError::ApiError(_)
            | ReportError::GenerationError { .. }
            | ReportError::PriceDataError { .. } => ErrorSeverity::Medium,
            ReportError::ConfigError { .. }
            | ReportError::ConfigValidationError { .. }
            | ReportError::InvalidConfigValueError { .. }
            | ReportError::MissingConfigError { .. }
            | ReportError::CsvError(_)
            | ReportError::SerializationError(_)
            | ReportError::ProcessingError { .. }
            | ReportError::ValidationError { .. }
            | ReportError::RenderError { .. }
            | ReportError::ZipError(_) => ErrorSeverity::High,
            ReportError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Configuration => {
                "Check the command line flags or the TOML config file and fix the reported field"
            }
            ErrorCategory::Network => {
                "Check network access, GEMINI_API_KEY and the price endpoint, then retry"
            }
            ErrorCategory::Data => {
                "Inspect the input report text and holdings file for malformed content"
            }
            ErrorCategory::Rendering => {
                "Make sure the output directory is writable and has free space"
            }
            ErrorCategory::System => "Check file paths and permissions",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ReportError::IoError(e) => format!("File system error: {}", e),
            ReportError::ApiError(e) => format!("Could not reach a remote service: {}", e),
            ReportError::MissingConfigError { field } => {
                format!("Missing required setting '{}'", field)
            }
            ReportError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            ReportError::RenderError { message } => {
                format!("The PDF report could not be written: {}", message)
            }
            other => other.to_string(),
        }
    }
}
