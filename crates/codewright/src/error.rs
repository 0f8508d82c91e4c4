//! Error type for LLM transport and endpoint resolution.

use thiserror::Error;

/// Errors surfaced by chat providers.
#[derive(Debug, Error)]
pub enum LLMError {
    /// HTTP request/response failure (network, non-2xx status).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Missing or rejected credentials.
    #[error("auth error: {0}")]
    Auth(String),

    /// The request could not be constructed from the given inputs.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The endpoint answered with an error payload.
    #[error("provider error: {0}")]
    Provider(String),

    /// The response did not match the expected chat-completion shape.
    #[error("response format error: {message}")]
    ResponseFormat { message: String, raw: String },

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(String),
}

impl From<reqwest::Error> for LLMError {
    fn from(err: reqwest::Error) -> Self {
        LLMError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for LLMError {
    fn from(err: serde_json::Error) -> Self {
        LLMError::Json(format!("{} at line {} column {}", err, err.line(), err.column()))
    }
}
