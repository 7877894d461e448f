use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
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

    #[error("Input file not found: {path}")]
    MissingInputError { path: String },

    #[error("Could not decode {path} with any of: {tried}")]
    EncodingError { path: String, tried: String },

    #[error("No rows with a house_id were found")]
    NoItemData,

    #[error("Recommender connection failed: {message}")]
    ConnectionError { message: String },

    #[error("Unexpected HTTP status {status}: {body}")]
    HttpStatusError { status: u16, body: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Data,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_)
            | EtlError::ConnectionError { .. }
            | EtlError::HttpStatusError { .. } => ErrorCategory::Network,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. }
            | EtlError::EncodingError { .. }
            | EtlError::NoItemData => ErrorCategory::Data,
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::IoError(_) | EtlError::MissingInputError { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            EtlError::ApiError(_)
            | EtlError::ConnectionError { .. }
            | EtlError::HttpStatusError { .. } => ErrorSeverity::Medium,
            EtlError::NoItemData
            | EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. }
            | EtlError::MissingInputError { .. }
            | EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorSeverity::High,
            EtlError::EncodingError { .. } | EtlError::IoError(_) => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::ApiError(_)
            | EtlError::ConnectionError { .. }
            | EtlError::HttpStatusError { .. } => {
                "Make sure Gorse is running and the base_url/api_key in the config are correct"
            }
            EtlError::CsvError(_) | EtlError::ProcessingError { .. } => {
                "Check that the CSV has the user_id, event_name, event_property and created_at columns"
            }
            EtlError::EncodingError { .. } => "Re-export the CSV as UTF-8",
            EtlError::NoItemData => {
                "Check that event_property contains a house_id for at least one row"
            }
            EtlError::MissingInputError { .. } => {
                "Run process_data first or point the config at the right directory"
            }
            EtlError::IoError(_) => "Check file permissions and free disk space",
            EtlError::SerializationError(_) => {
                "Inspect the offending record and fix its format"
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => "Fix the configuration file and retry",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not talk to the recommender: {}", self),
            ErrorCategory::Data => format!("Data problem: {}", self),
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::System => format!("System problem: {}", self),
        }
    }

    /// Process exit code derived from the severity.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            EtlError::IoError(e) => e.kind() == std::io::ErrorKind::NotFound,
            EtlError::MissingInputError { .. } => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;
