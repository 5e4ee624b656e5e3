use thiserror::Error;

use crate::query_builder::DatabaseBackend;

pub mod context;

pub type Result<T> = std::result::Result<T, Error>;

// Re-export context helpers
pub use context::{ErrorChain, ErrorContext, OptionExt};

/// Main error type for sqlcrud
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed request shape
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Operand has the right shape but the wrong kind of value
    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[error("Operation not supported in {dialect}: {feature}")]
    UnsupportedOperation {
        dialect: DatabaseBackend,
        feature: String,
    },

    /// Statement preparation or execution failed inside the session
    #[error("Execution failed: {0}")]
    Execution(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("No response from db: {0}")]
    NoResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Error with context chain
    #[error("{message}")]
    WithContext {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Self::Execution(err.to_string())
    }
}

impl Error {
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    pub fn invalid_format(msg: impl Into<String>) -> Self {
        Self::InvalidFormat(msg.into())
    }

    pub fn unsupported(dialect: DatabaseBackend, feature: impl Into<String>) -> Self {
        Self::UnsupportedOperation {
            dialect,
            feature: feature.into(),
        }
    }

    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    pub fn transaction(msg: impl Into<String>) -> Self {
        Self::Transaction(msg.into())
    }

    pub fn no_response(msg: impl Into<String>) -> Self {
        Self::NoResponse(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    // Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            message: context.into(),
            source: Box::new(self),
        }
    }

    /// Root error with all context layers removed
    pub fn root(&self) -> &Error {
        match self {
            Error::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when the request was rejected before anything reached the database
    pub fn is_request_error(&self) -> bool {
        matches!(
            self.root(),
            Error::InvalidParams(_) | Error::InvalidFormat(_) | Error::UnsupportedOperation { .. }
        )
    }

    /// Get error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::InvalidParams(_) => "E_INVALID_PARAMS",
            Error::InvalidFormat(_) => "E_INVALID_FORMAT",
            Error::UnsupportedOperation { .. } => "E_UNSUPPORTED",
            Error::Execution(_) => "E_EXECUTION",
            Error::Transaction(_) => "E_DB_TRANSACTION",
            Error::NoResponse(_) => "E_NO_RESPONSE",
            Error::Config(_) => "E_CONFIG",
            Error::Json(_) => "E_JSON",
            Error::Io(_) => "E_IO",
            Error::WithContext { source, .. } => source.error_code(),
        }
    }
}
