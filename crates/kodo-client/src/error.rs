//! Kodo client error types.

use std::convert::Infallible;

use kodo_models::InvalidChoice;
use serde::Deserialize;
use thiserror::Error;

/// Result type for Kodo operations.
pub type KodoResult<T> = Result<T, KodoError>;

/// Code reported for failures that never produced a service status:
/// local validation, network failures, unreadable responses.
pub const LOCAL_ERROR_CODE: i64 = -1;

/// Errors that can occur during Kodo operations.
#[derive(Debug, Error)]
pub enum KodoError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{message}")]
    Service { code: i64, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Error body returned by the service: `{"error": "..."}`.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl KodoError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Build an error from a non-2xx response.
    ///
    /// The message is the `error` field of a JSON body, else the raw body,
    /// else the canonical reason of the status.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let message = match serde_json::from_slice::<ErrorBody>(body) {
            Ok(parsed) => parsed.error,
            Err(_) => {
                let text = String::from_utf8_lossy(body).trim().to_string();
                if text.is_empty() {
                    reqwest::StatusCode::from_u16(status)
                        .ok()
                        .and_then(|s| s.canonical_reason())
                        .unwrap_or("unknown error")
                        .to_string()
                } else {
                    text
                }
            }
        };

        Self::Service {
            code: i64::from(status),
            message,
        }
    }

    /// Numeric code surfaced in a failed envelope.
    pub fn code(&self) -> i64 {
        match self {
            KodoError::Service { code, .. } => *code,
            KodoError::Network(e) => e
                .status()
                .map(|s| i64::from(s.as_u16()))
                .unwrap_or(LOCAL_ERROR_CODE),
            _ => LOCAL_ERROR_CODE,
        }
    }

    /// Message surfaced in a failed envelope.
    pub fn message(&self) -> String {
        match self {
            KodoError::Service { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// True for errors raised before any remote call.
    pub fn is_local(&self) -> bool {
        matches!(self, KodoError::InvalidArgument(_) | KodoError::Config(_))
    }
}

impl From<InvalidChoice> for KodoError {
    fn from(err: InvalidChoice) -> Self {
        KodoError::InvalidArgument(err.to_string())
    }
}

// Lets facade methods accept already-typed enums through the same `TryInto` bound.
impl From<Infallible> for KodoError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}
