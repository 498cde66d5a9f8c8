//! Boundary classification of document API failures.
//!
//! Every HTTP outcome is mapped exactly once into [`FetchError`]; view
//! state and callers only ever see the classified value, never a raw
//! status code or transport error.

use reqwest::StatusCode;
use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

const INVALID_INPUT_FALLBACK: &str = "file is too large or invalid";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Credential missing, expired, or rejected (401/403).
    #[error("unauthorized")]
    Unauthorized,
    /// The requested document does not exist (404).
    #[error("not found")]
    NotFound,
    /// The request was rejected as malformed or too large (422).
    #[error("{0}")]
    InvalidInput(String),
    /// Any other non-2xx response; carries the server-supplied message
    /// when one was present, otherwise the status text.
    #[error("{0}")]
    Server(String),
    /// The request never produced a response (DNS, refused, offline).
    #[error("connection error")]
    Connection,
}

impl FetchError {
    pub fn classify(status: StatusCode, body: Option<ApiError>) -> Self {
        let message = body.as_ref().and_then(|body| body.message.clone());

        // Prefer the machine-readable code when the backend sends one.
        if let Some(code) = body.as_ref().and_then(|body| body.code) {
            return match code {
                ErrorCode::Unauthorized | ErrorCode::Forbidden => FetchError::Unauthorized,
                ErrorCode::NotFound => FetchError::NotFound,
                ErrorCode::Validation => FetchError::InvalidInput(
                    message.unwrap_or_else(|| INVALID_INPUT_FALLBACK.to_string()),
                ),
                ErrorCode::Internal => {
                    FetchError::Server(message.unwrap_or_else(|| status_text(status)))
                }
            };
        }

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => FetchError::Unauthorized,
            StatusCode::NOT_FOUND => FetchError::NotFound,
            StatusCode::UNPROCESSABLE_ENTITY => FetchError::InvalidInput(
                message.unwrap_or_else(|| INVALID_INPUT_FALLBACK.to_string()),
            ),
            _ => FetchError::Server(message.unwrap_or_else(|| status_text(status))),
        }
    }

    /// Whether the caller should prompt for re-authentication.
    pub fn requires_reauth(&self) -> bool {
        matches!(self, FetchError::Unauthorized)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        // Anything that failed before a response arrived counts as a
        // connection problem; status classification happens in
        // `classify` once a response exists.
        tracing::debug!(error = %err, "transport failure before response");
        FetchError::Connection
    }
}

fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.to_string())
}
