use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModerationError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Model execution timed out after {timeout:?}")]
    ExecutionTimeout { timeout: Duration },

    #[error("Model process failed (exit code {}): {reason}", exit_code_label(.exit_code))]
    ProcessFailure {
        exit_code: Option<i32>,
        reason: String,
    },

    #[error("Prediction endpoint request failed: {cause}")]
    TransportFailure { cause: String },

    #[error("Model response could not be parsed: {message}")]
    ParseFailure { message: String },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Execution,
    Network,
    Parsing,
    Validation,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ModerationError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ModerationError::ConfigError { .. }
            | ModerationError::MissingConfigError { .. }
            | ModerationError::InvalidConfigValueError { .. }
            | ModerationError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            ModerationError::ExecutionTimeout { .. } | ModerationError::ProcessFailure { .. } => {
                ErrorCategory::Execution
            }
            ModerationError::TransportFailure { .. } => ErrorCategory::Network,
            ModerationError::ParseFailure { .. } | ModerationError::SerializationError(_) => {
                ErrorCategory::Parsing
            }
            ModerationError::ValidationError { .. } => ErrorCategory::Validation,
            ModerationError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Validation => ErrorSeverity::High,
            ErrorCategory::Network | ErrorCategory::Execution => ErrorSeverity::Medium,
            ErrorCategory::Parsing => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 是否屬於啟動階段就該中止的錯誤
    pub fn is_configuration(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }

    /// 只有暫時性的失敗才值得重試
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModerationError::ExecutionTimeout { .. } | ModerationError::TransportFailure { .. }
        )
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            ModerationError::ConfigError { .. }
            | ModerationError::MissingConfigError { .. }
            | ModerationError::InvalidConfigValueError { .. }
            | ModerationError::ConfigValidationError { .. } => {
                "Check the model configuration (script path, working directory, endpoint)"
            }
            ModerationError::ExecutionTimeout { .. } => {
                "Increase the invocation timeout or check that the model loads quickly"
            }
            ModerationError::ProcessFailure { .. } => {
                "Run the model script by hand to see its output and check the interpreter"
            }
            ModerationError::TransportFailure { .. } => {
                "Check that the prediction service is running and reachable"
            }
            ModerationError::ParseFailure { .. } | ModerationError::SerializationError(_) => {
                "Make sure the model prints a single JSON object with label and probability"
            }
            ModerationError::ValidationError { .. } => {
                "Provide a non-blank review of at most 5000 characters"
            }
            ModerationError::IoError(_) => "Check file permissions and available disk space",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Validation => format!("Invalid review: {}", self),
            ErrorCategory::Execution => format!("The moderation model did not run: {}", self),
            ErrorCategory::Network => format!("The prediction service is unavailable: {}", self),
            ErrorCategory::Parsing => format!("The model returned an unreadable answer: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }
}

fn exit_code_label(exit_code: &Option<i32>) -> String {
    exit_code
        .map(|code| code.to_string())
        .unwrap_or_else(|| "none".to_string())
}

pub type Result<T> = std::result::Result<T, ModerationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_critical() {
        let err = ModerationError::MissingConfigError {
            field: "model.process.script_path".to_string(),
        };
        assert_eq!(err.category(), ErrorCategory::Configuration);
        assert_eq!(err.severity(), ErrorSeverity::Critical);
        assert!(err.is_configuration());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_only_transient_failures_are_retryable() {
        assert!(ModerationError::ExecutionTimeout {
            timeout: Duration::from_secs(30)
        }
        .is_retryable());
        assert!(ModerationError::TransportFailure {
            cause: "connection refused".to_string()
        }
        .is_retryable());
        assert!(!ModerationError::ProcessFailure {
            exit_code: Some(1),
            reason: "exit".to_string()
        }
        .is_retryable());
        assert!(!ModerationError::ParseFailure {
            message: "eof".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_severity_by_category() {
        let invalid_review = ModerationError::ValidationError {
            message: "Review is required".to_string(),
        };
        let timeout = ModerationError::ExecutionTimeout {
            timeout: Duration::from_secs(30),
        };
        let unreadable = ModerationError::ParseFailure {
            message: "eof".to_string(),
        };
        let io = ModerationError::IoError(std::io::Error::other("disk"));

        assert_eq!(invalid_review.severity(), ErrorSeverity::High);
        assert_eq!(timeout.severity(), ErrorSeverity::Medium);
        assert_eq!(unreadable.severity(), ErrorSeverity::Medium);
        assert_eq!(io.severity(), ErrorSeverity::Critical);
        assert!(timeout.severity() < invalid_review.severity());
    }

    #[test]
    fn test_process_failure_display_without_exit_code() {
        let err = ModerationError::ProcessFailure {
            exit_code: None,
            reason: "killed".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Model process failed (exit code none): killed"
        );
    }
}
