use thiserror::Error;

#[derive(Error, Debug)]
pub enum InvoiceError {
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

    #[error("Missing configuration value: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Upload of '{blob}' failed: {message}")]
    UploadError { blob: String, message: String },

    #[error("{operation} returned HTTP {status}: {body}")]
    HttpStatusError {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("Analysis response did not include an Operation-Location header")]
    MissingOperationLocation,

    #[error("Cannot extract a result id from Operation-Location '{value}'")]
    InvalidOperationLocation { value: String },

    #[error("Analysis job {result_id} failed: {message}")]
    AnalysisFailed { result_id: String, message: String },

    #[error("Analysis job {result_id} is still {status} after {attempts} attempt(s)")]
    StillProcessing {
        result_id: String,
        status: String,
        attempts: u32,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },
}

pub type Result<T> = std::result::Result<T, InvoiceError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Config,
    Network,
    Service,
    Storage,
    Data,
    Io,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl InvoiceError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            InvoiceError::ConfigError { .. }
            | InvoiceError::MissingConfigError { .. }
            | InvoiceError::InvalidConfigValueError { .. }
            | InvoiceError::ConfigValidationError { .. } => ErrorCategory::Config,
            InvoiceError::ApiError(_) => ErrorCategory::Network,
            InvoiceError::HttpStatusError { .. }
            | InvoiceError::MissingOperationLocation
            | InvoiceError::InvalidOperationLocation { .. }
            | InvoiceError::AnalysisFailed { .. }
            | InvoiceError::StillProcessing { .. } => ErrorCategory::Service,
            InvoiceError::UploadError { .. } => ErrorCategory::Storage,
            InvoiceError::CsvError(_)
            | InvoiceError::SerializationError(_)
            | InvoiceError::ValidationError { .. } => ErrorCategory::Data,
            InvoiceError::ZipError(_) | InvoiceError::IoError(_) => ErrorCategory::Io,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 服務仍在處理中，稍後重試即可
            InvoiceError::StillProcessing { .. } => ErrorSeverity::Medium,
            InvoiceError::ApiError(e) if e.is_timeout() || e.is_connect() => {
                ErrorSeverity::Medium
            }
            InvoiceError::ConfigError { .. }
            | InvoiceError::MissingConfigError { .. }
            | InvoiceError::InvalidConfigValueError { .. }
            | InvoiceError::ConfigValidationError { .. } => ErrorSeverity::Critical,
            _ => ErrorSeverity::High,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.severity() == ErrorSeverity::Medium
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            InvoiceError::ApiError(_) => {
                "Could not reach the analysis or storage service.".to_string()
            }
            InvoiceError::HttpStatusError {
                operation, status, ..
            } => format!("{} was rejected by the service (HTTP {}).", operation, status),
            InvoiceError::UploadError { blob, .. } => {
                format!("The file '{}' could not be uploaded to storage.", blob)
            }
            InvoiceError::StillProcessing { result_id, .. } => format!(
                "Document analysis {} has not finished yet.",
                result_id
            ),
            InvoiceError::AnalysisFailed { message, .. } => {
                format!("The analysis service could not process the document: {}", message)
            }
            InvoiceError::MissingConfigError { field } => {
                format!("Required setting '{}' is missing.", field)
            }
            InvoiceError::InvalidConfigValueError { field, reason, .. } => {
                format!("Setting '{}' is invalid: {}", field, reason)
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Config => "Check the configuration file and environment variables",
            ErrorCategory::Network => "Check your network connection and try again",
            ErrorCategory::Storage => "Verify the storage container and SAS token permissions",
            ErrorCategory::Service => match self {
                InvoiceError::StillProcessing { .. } => {
                    "Increase polling.timeout_seconds or run the analysis again later"
                }
                InvoiceError::HttpStatusError { status: 401, .. }
                | InvoiceError::HttpStatusError { status: 403, .. } => {
                    "Verify the subscription key and endpoint"
                }
                _ => "Verify the analysis endpoint, model id and api version",
            },
            ErrorCategory::Data => "Make sure the document is a readable PDF or Word file",
            ErrorCategory::Io => "Check that the output directory is writable",
        }
    }
}
