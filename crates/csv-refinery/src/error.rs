//! Error types for the CSV refinery

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for refinery operations
pub type Result<T> = std::result::Result<T, Error>;

/// Refinery errors
#[derive(Debug, Error)]
pub enum Error {
    /// Blob does not exist in the store
    #[error("Blob not found: {0}")]
    NotFound(String),

    /// Input CSV has no lines at all
    #[error("Input CSV is empty: {0}")]
    EmptyInput(String),

    /// API key, prompt file or other required setting is missing or unreadable
    #[error("Configuration missing: {0}")]
    ConfigMissing(String),

    /// Configuration present but invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generation API call failed (network error or non-success status)
    #[error("API call failed{}: {message}", status_suffix(.status))]
    ApiCallFailed {
        status: Option<u16>,
        message: String,
        timed_out: bool,
    },

    /// Generation API answered, but without the expected text field
    #[error("Failed to parse API response: {0}")]
    ResponseParseFailed(String),

    /// Object store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Rejected upload or request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

impl Error {
    /// Create an API error from a non-success HTTP status
    pub fn api_status(status: u16, message: impl Into<String>) -> Self {
        Self::ApiCallFailed {
            status: Some(status),
            message: message.into(),
            timed_out: false,
        }
    }

    /// Create a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether a batch failing with this error could succeed on another attempt.
    ///
    /// Timeouts, connection failures, rate limiting and 5xx answers are
    /// transient; other 4xx answers and malformed bodies are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::ApiCallFailed {
                status: None,
                ..
            } => true,
            Error::ApiCallFailed {
                timed_out: true, ..
            } => true,
            Error::ApiCallFailed {
                status: Some(code),
                ..
            } => *code == 429 || (500..600).contains(code),
            Error::Storage(_) | Error::Io(_) => true,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::ApiCallFailed {
            status: err.status().map(|s| s.as_u16()),
            timed_out: err.is_timeout(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            Error::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::EmptyInput(_) => (StatusCode::BAD_REQUEST, "empty_input"),
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Error::ConfigMissing(_) | Error::Config(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error")
            }
            Error::ApiCallFailed { .. } | Error::ResponseParseFailed(_) => {
                (StatusCode::BAD_GATEWAY, "api_error")
            }
            Error::Storage(_) => (StatusCode::BAD_GATEWAY, "storage_error"),
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
            Error::Json(_) => (StatusCode::BAD_REQUEST, "json_error"),
            Error::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
