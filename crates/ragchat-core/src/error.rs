//! Error types for the ragchat front end.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::format::ErrorKind;

/// A shared error type for the whole front end.
///
/// Transport failures (`Connection`, `Timeout`, `Server`) are produced by the
/// backend client; `Validation` and `QuotaExceeded` never leave the session
/// controller.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RagchatError {
    /// Backend could not be reached
    #[error("Cannot connect to backend: {0}")]
    Connection(String),

    /// Request exceeded the configured timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Reachable backend answered with a non-success status
    #[error("Backend error: HTTP {status}")]
    Server { status: u16, body: String },

    /// Malformed user input
    #[error("{0}")]
    Validation(String),

    /// Audio upload produced no text
    #[error("Transcription returned no text")]
    TranscriptionEmpty,

    /// The free query allowance is used up and no email was captured yet
    #[error("Query limit reached ({used}/{limit})")]
    QuotaExceeded { used: u32, limit: u32 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// IO error
    #[error("IO error: {message}")]
    Io { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RagchatError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a Connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Creates a Timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout(message.into())
    }

    /// Creates a Server error
    pub fn server(status: u16, body: impl Into<String>) -> Self {
        Self::Server {
            status,
            body: body.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Maps the error onto the user-facing message category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Connection(_) => ErrorKind::Connection,
            Self::Timeout(_) => ErrorKind::Timeout,
            Self::Server { status: 404, .. } => ErrorKind::NotFound,
            Self::Server {
                status: 401 | 403, ..
            } => ErrorKind::Unauthorized,
            Self::Server { .. } => ErrorKind::Server,
            Self::Validation(_) | Self::TranscriptionEmpty | Self::QuotaExceeded { .. } => {
                ErrorKind::Validation
            }
            _ => ErrorKind::Other,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for RagchatError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for RagchatError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for RagchatError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, RagchatError>`.
pub type Result<T> = std::result::Result<T, RagchatError>;
