//! LLM call errors.

use thiserror::Error;

/// Errors from an LLM call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LlmError {
    /// API returned an error (5xx or unexpected status).
    #[error("api error: {0}")]
    ApiError(String),

    /// Rate limited (429).
    #[error("rate limit: {0}")]
    RateLimit(String),

    /// Authentication failed (401/403).
    #[error("auth failed: {0}")]
    Auth(String),

    /// Request rejected as invalid (other 4xx).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Connection failure or timeout.
    #[error("network error: {0}")]
    Network(String),

    /// Response body could not be parsed.
    #[error("parsing failed: {0}")]
    Parsing(String),
}

impl LlmError {
    /// Maps a non-success HTTP status and its body to an error.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => LlmError::Auth(body),
            429 => LlmError::RateLimit(body),
            400..=499 => LlmError::InvalidRequest(body),
            _ => LlmError::ApiError(body),
        }
    }
}
