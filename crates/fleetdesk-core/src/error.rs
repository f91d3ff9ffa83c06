//! Error types module
//!
//! All failures in FleetDesk are unified under [`AppError`]. Each variant
//! describes its own HTTP presentation through [`ErrorMetadata`], so the API
//! layer only has to render what the error already knows about itself.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Expected errors like validation failures
    Debug,
    /// Recoverable issues
    Warn,
    /// Unexpected failures
    Error,
}

/// How an error is presented to HTTP clients and in logs.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Machine-readable code such as `NOT_FOUND`.
    fn error_code(&self) -> &'static str;

    /// Whether the same request may succeed if retried.
    fn is_recoverable(&self) -> bool;

    /// Message safe to show to any caller.
    fn client_message(&self) -> String;

    /// Details are withheld from the response when true.
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    /// A required environment variable is missing or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A managed dependency (OCR service) answered with an error.
    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

/// Presentation of one error variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorClass {
    pub status: u16,
    pub code: &'static str,
    pub recoverable: bool,
    pub sensitive: bool,
    pub log_level: LogLevel,
}

/// Caller mistakes, explained in full and logged at debug.
const fn rejected(status: u16, code: &'static str) -> ErrorClass {
    ErrorClass {
        status,
        code,
        recoverable: false,
        sensitive: false,
        log_level: LogLevel::Debug,
    }
}

/// Server-side failures whose details stay in the logs.
const fn failed(code: &'static str) -> ErrorClass {
    ErrorClass {
        status: 500,
        code,
        recoverable: true,
        sensitive: true,
        log_level: LogLevel::Error,
    }
}

impl AppError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AppError::Database(_) => failed("DATABASE_ERROR"),
            AppError::Storage(_) => failed("STORAGE_ERROR"),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                failed("INTERNAL_ERROR")
            }
            AppError::InvalidInput(_) => rejected(400, "INVALID_INPUT"),
            AppError::Unauthorized(_) => rejected(401, "UNAUTHORIZED"),
            AppError::NotFound(_) => rejected(404, "NOT_FOUND"),
            AppError::Conflict(_) => rejected(409, "CONFLICT"),
            AppError::PayloadTooLarge(_) => rejected(413, "PAYLOAD_TOO_LARGE"),
            // Operator mistakes: the message names the missing variable.
            AppError::Configuration(_) => ErrorClass {
                log_level: LogLevel::Error,
                ..rejected(500, "CONFIGURATION_ERROR")
            },
            AppError::ExternalService(_) => ErrorClass {
                recoverable: true,
                log_level: LogLevel::Warn,
                ..rejected(502, "EXTERNAL_SERVICE_ERROR")
            },
        }
    }

    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::NotFound(_) => "NotFound",
            AppError::Conflict(_) => "Conflict",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Configuration(_) => "Configuration",
            AppError::ExternalService(_) => "ExternalService",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Display string followed by up to five causes, one per line.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();
        let mut chain = std::iter::successors(self.source(), |err| (*err).source());
        for cause in chain.by_ref().take(5) {
            details.push_str(&format!("\n  Caused by: {}", cause));
        }
        if chain.next().is_some() {
            details.push_str("\n  ... (truncated)");
        }
        details
    }

    /// True when the underlying database error is a unique-constraint violation.
    #[cfg(feature = "sqlx")]
    pub fn is_unique_violation(&self) -> bool {
        match self {
            AppError::Database(SqlxError::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        self.class().status
    }

    fn error_code(&self) -> &'static str {
        self.class().code
    }

    fn is_recoverable(&self) -> bool {
        self.class().recoverable
    }

    fn is_sensitive(&self) -> bool {
        self.class().sensitive
    }

    fn log_level(&self) -> LogLevel {
        self.class().log_level
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::Internal(_) | AppError::InternalWithSource { .. } => {
                "Internal server error".to_string()
            }
            AppError::InvalidInput(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Unauthorized(msg)
            | AppError::PayloadTooLarge(msg)
            | AppError::Configuration(msg)
            | AppError::ExternalService(msg) => msg.clone(),
        }
    }
}
