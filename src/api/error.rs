//! Error types for Periscope API integration

use serde_json::Value;
use thiserror::Error;

/// Result alias used throughout the API client
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur when talking to the Periscope API
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response was read
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Local I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// API returned a non-success status
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Response body or summary
        message: String,
    },

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The `success` field of a boolean endpoint was neither true nor false
    #[error("Invalid boolean success response: {0}")]
    InvalidSuccess(Value),

    /// Response had an unexpected shape
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request payload could not be built
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response entry lacked a field the client needs
    #[error("Response is missing field '{0}'")]
    MissingField(&'static str),

    /// User search returned no exact username match
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// Session token is not stored
    #[error("Session token not configured. Run `periapi set-token` first")]
    TokenNotFound,

    /// Failed to access system keyring
    #[error("Failed to access keyring: {0}")]
    Keyring(String),

    /// Configuration could not be read, written or is incomplete
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Check if this is a transport-level I/O fault
    ///
    /// These are the faults `get_following` and `get_user` mask: anything
    /// that went wrong talking to the server, including non-success statuses
    /// and response bodies that are not JSON. Failing to build a request and
    /// faults found by the client in a decoded response are not I/O faults.
    pub fn is_io(&self) -> bool {
        match self {
            ApiError::Request(e) => !e.is_builder(),
            ApiError::Io(_) | ApiError::Api { .. } => true,
            _ => false,
        }
    }

    /// Check if this error requires a new session token
    pub fn requires_reauth(&self) -> bool {
        matches!(self, ApiError::TokenNotFound | ApiError::Api { status: 401, .. })
    }
}
