// src/error/mod.rs
//! Error taxonomy for the news service.
//!
//! Blob-store *read* failures never appear here: the loader downgrades them to
//! a typed cache miss (see `news::loader::MissReason`). Everything else that can
//! reach a caller is a `NewsError`.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum NewsError {
    /// Missing or mismatched bearer credential on an administrative endpoint
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// A generation was requested but no generator credential is configured
    #[error("Generator Unavailable: {0}")]
    GeneratorUnavailable(String),

    /// Upstream language-model call failed (transport or non-success status)
    #[error("Generation Failed: {0}")]
    GenerationFailed(String),

    /// Whole-batch generation exceeded its time bound
    #[error("Generation Timeout: {0}")]
    GenerationTimeout(String),

    /// The model answered, but not in the shape we asked for
    #[error("Malformed Generator Output: {0}")]
    MalformedOutput(String),

    /// Blob-store write (or explicit read on the admin path) failed
    #[error("Storage Error: {0}")]
    StorageError(String),

    /// Snapshot violates the headline/article consistency rules
    #[error("Invalid Snapshot: {0}")]
    InvalidSnapshot(String),

    /// Configuration errors
    #[error("Config Error: {0}")]
    ConfigError(String),

    /// Page template failed to render
    #[error("Render Error: {0}")]
    Render(String),
}

impl From<serde_json::Error> for NewsError {
    fn from(err: serde_json::Error) -> Self {
        NewsError::MalformedOutput(format!("JSON serialization/deserialization error: {}", err))
    }
}

impl From<reqwest::Error> for NewsError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NewsError::GenerationTimeout(format!("HTTP request timed out: {}", err))
        } else {
            NewsError::GenerationFailed(format!("HTTP client error: {}", err))
        }
    }
}

impl From<redis::RedisError> for NewsError {
    fn from(err: redis::RedisError) -> Self {
        NewsError::StorageError(format!("Redis error: {}", err))
    }
}

impl From<askama::Error> for NewsError {
    fn from(err: askama::Error) -> Self {
        NewsError::Render(err.to_string())
    }
}

impl NewsError {
    /// Categorizes error for logging and status mapping
    pub fn categorize(&self) -> ErrorCategory {
        match self {
            NewsError::Unauthorized(_) => ErrorCategory::Auth,
            NewsError::GeneratorUnavailable(_) => ErrorCategory::Generator,
            NewsError::GenerationFailed(_) => ErrorCategory::Generator,
            NewsError::GenerationTimeout(_) => ErrorCategory::Generator,
            NewsError::MalformedOutput(_) => ErrorCategory::Data,
            NewsError::StorageError(_) => ErrorCategory::Storage,
            NewsError::InvalidSnapshot(_) => ErrorCategory::Data,
            NewsError::ConfigError(_) => ErrorCategory::Configuration,
            NewsError::Render(_) => ErrorCategory::Presentation,
        }
    }

    /// HTTP status an endpoint should answer with for this error
    pub fn status_code(&self) -> StatusCode {
        match self.categorize() {
            ErrorCategory::Auth => StatusCode::UNAUTHORIZED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Auth,
    Generator,
    Storage,
    Data,
    Configuration,
    Presentation,
}

// Convenience type alias
pub type Result<T> = std::result::Result<T, NewsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_auth_errors_map_to_401() {
        assert_eq!(
            NewsError::Unauthorized("bad token".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            NewsError::StorageError("put failed".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            NewsError::GenerationTimeout("300s".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_json_errors_are_malformed_output() {
        let err: NewsError = serde_json::from_str::<Vec<u8>>("not json").unwrap_err().into();
        assert_eq!(err.categorize(), ErrorCategory::Data);
        assert!(err.to_string().starts_with("Malformed Generator Output"));
    }
}
