use thiserror::Error;

/// 上傳檔案的欄位標題
pub const FIRST_NAME_COLUMN: &str = "FirstName";
pub const PHONE_COLUMN: &str = "Phone";
pub const NOTES_COLUMN: &str = "Notes";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Workbook processing error: {0}")]
    WorkbookError(#[from] calamine::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Unsupported file format: {file_name}")]
    UnsupportedFormat { file_name: String },

    #[error("No valid records found. Make sure your file has FirstName and Phone columns.")]
    NoValidRecords { skipped_rows: usize },

    #[error("No agents available. Please create at least one agent before uploading data")]
    NoAgentsAvailable,

    #[error("Another import is already in progress")]
    ImportInProgress,

    #[error("Not authenticated: {message}")]
    NotAuthenticated { message: String },

    #[error("Backend request failed ({status}): {message}")]
    BackendError { status: u16, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Precondition,
    Configuration,
    Authentication,
    External,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AppError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::CsvError(_)
            | AppError::WorkbookError(_)
            | AppError::UnsupportedFormat { .. }
            | AppError::NoValidRecords { .. }
            | AppError::ValidationError { .. } => ErrorCategory::Input,
            AppError::NoAgentsAvailable | AppError::ImportInProgress => {
                ErrorCategory::Precondition
            }
            AppError::ConfigError { .. }
            | AppError::ConfigValidationError { .. }
            | AppError::MissingConfigError { .. }
            | AppError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            AppError::NotAuthenticated { .. } => ErrorCategory::Authentication,
            AppError::ApiError(_) | AppError::BackendError { .. } => ErrorCategory::External,
            AppError::IoError(_) | AppError::ProcessingError { .. } => ErrorCategory::Internal,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Input
            | ErrorCategory::Precondition
            | ErrorCategory::Configuration
            | ErrorCategory::Authentication => ErrorSeverity::High,
            ErrorCategory::External => ErrorSeverity::Medium,
            ErrorCategory::Internal => ErrorSeverity::Critical,
        }
    }

    /// 顯示給使用者的訊息；後端錯誤盡量原樣轉述
    pub fn user_friendly_message(&self) -> String {
        match self {
            AppError::BackendError { message, .. } if !message.trim().is_empty() => {
                message.clone()
            }
            AppError::BackendError { .. } | AppError::ApiError(_) => {
                "Failed to reach the backend service".to_string()
            }
            AppError::CsvError(_) | AppError::WorkbookError(_) => {
                "Failed to read file".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            AppError::UnsupportedFormat { .. } => {
                "Please upload a valid CSV or Excel file (.csv, .xlsx, .xls)"
            }
            AppError::NoValidRecords { .. } => {
                "Check that the header row contains FirstName and Phone and that rows fill both"
            }
            AppError::CsvError(_) | AppError::WorkbookError(_) => {
                "Check that the file is not corrupted and re-export it from your spreadsheet tool"
            }
            AppError::NoAgentsAvailable => "Create an agent with `agents create` and retry",
            AppError::ImportInProgress => "Wait for the running import to finish",
            AppError::NotAuthenticated { .. } => {
                "Check auth.email and auth.password in the configuration file"
            }
            AppError::ApiError(_) | AppError::BackendError { .. } => {
                "Nothing was saved; re-submit the operation once the backend is reachable"
            }
            AppError::ConfigError { .. }
            | AppError::ConfigValidationError { .. }
            | AppError::MissingConfigError { .. }
            | AppError::InvalidConfigValueError { .. } => {
                "Fix the configuration file and run the command again"
            }
            AppError::ValidationError { .. } => "Correct the input values and try again",
            AppError::IoError(_) => "Check that the file exists and is readable",
            AppError::ProcessingError { .. } => "Run again with --verbose and report the log output",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
