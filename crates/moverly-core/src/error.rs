//! Error types for the Moverly client layer.
//!
//! Only the request path (retrying fetch, API and auth clients) surfaces these
//! to callers. Monitors and the session reader degrade to safe defaults
//! instead of returning errors.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the Moverly client layer.
#[derive(Debug, Error)]
pub enum MoverlyError {
    // Network errors
    #[error("Network error: {message}")]
    Network {
        message: String,
        /// Optional cause description
        cause: Option<String>,
    },

    #[error("Request timeout after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Server error {status} from {url}")]
    ServerError { status: u16, url: String },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Offline and no cached response for {key}")]
    Offline { key: String },

    #[error("Request cancelled")]
    Cancelled,

    // Decoding errors
    #[error("Unexpected response shape: {message}")]
    Decode { message: String },

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Validation error for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for Moverly operations.
pub type Result<T> = std::result::Result<T, MoverlyError>;

impl From<std::io::Error> for MoverlyError {
    fn from(err: std::io::Error) -> Self {
        MoverlyError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<reqwest::Error> for MoverlyError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            MoverlyError::Timeout(std::time::Duration::from_secs(0))
        } else {
            MoverlyError::Network {
                message: err.to_string(),
                cause: std::error::Error::source(&err).map(|s| s.to_string()),
            }
        }
    }
}

impl From<url::ParseError> for MoverlyError {
    fn from(err: url::ParseError) -> Self {
        MoverlyError::Config {
            message: format!("invalid URL: {err}"),
        }
    }
}

impl MoverlyError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        MoverlyError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Check if this error should trigger a retry.
    ///
    /// Transport failures and server-class (5xx) responses are transient;
    /// client errors, decode failures and cancellation are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MoverlyError::Network { .. }
                | MoverlyError::Timeout(_)
                | MoverlyError::ServerError { .. }
        )
    }

    /// Whether the caller should present this as a "service unavailable" state.
    pub fn is_service_unavailable(&self) -> bool {
        self.is_retryable() || matches!(self, MoverlyError::Offline { .. })
    }
}
