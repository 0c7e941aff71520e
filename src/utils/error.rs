use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("Failed to read {}: {source}", .path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to prepare scratch directory {}: {source}", .path.display())]
    SetupError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Validation attempt timed out after {timeout_ms}ms")]
    ValidationTimeout { timeout_ms: u64 },

    #[error("Validation failed for {file}:{line} after {attempts} attempts")]
    ValidationFailure {
        file: String,
        line: usize,
        attempts: u32,
    },

    #[error("Validator error: {message}")]
    ValidatorError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// 單一嘗試失敗，會重試
    Low,
    /// 片段驗證失敗
    High,
    /// 配置錯誤，尚未開始執行
    Config,
    /// 讀檔或暫存目錄錯誤，整個執行中止
    Critical,
}

impl VerifyError {
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            VerifyError::ValidationTimeout { .. } => ErrorSeverity::Low,
            VerifyError::ValidationFailure { .. } | VerifyError::ValidatorError { .. } => {
                ErrorSeverity::High
            }
            VerifyError::ConfigError { .. } | VerifyError::InvalidConfigValueError { .. } => {
                ErrorSeverity::Config
            }
            VerifyError::ReadError { .. }
            | VerifyError::SetupError { .. }
            | VerifyError::IoError(_)
            | VerifyError::SerializationError(_) => ErrorSeverity::Critical,
        }
    }

    /// 根據嚴重程度決定行程退出碼
    pub fn exit_code(&self) -> u8 {
        match self.severity() {
            ErrorSeverity::Low | ErrorSeverity::High => 1,
            ErrorSeverity::Config => 2,
            ErrorSeverity::Critical => 3,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            VerifyError::ReadError { .. } => "Check that the docs root exists and every file in it is readable",
            VerifyError::SetupError { .. } => "Check write permissions for the scratch directory or pass --scratch-dir",
            VerifyError::ValidationTimeout { .. } => "Increase --attempt-timeout-ms or pre-pull the validator image",
            VerifyError::ValidationFailure { .. } => "Fix the TOML snippet at the reported location",
            VerifyError::ValidatorError { .. } => "Make sure the docker (or validator) binary is installed and on PATH",
            VerifyError::ConfigError { .. } | VerifyError::InvalidConfigValueError { .. } => {
                "Review the command line flags and the --config-file contents"
            }
            VerifyError::IoError(_) | VerifyError::SerializationError(_) => "Re-run with --verbose for details",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            VerifyError::ReadError { path, .. } => {
                format!("Could not read documentation file {}", path.display())
            }
            VerifyError::SetupError { path, .. } => {
                format!("Could not prepare scratch directory {}", path.display())
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, VerifyError>;
