//! Centralized error types for Washline.

use thiserror::Error;

/// Main error type for Washline operations.
#[derive(Error, Debug)]
pub enum WashlineError {
    #[error("Notification not found: {0}")]
    NotificationNotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for Washline operations.
pub type WashlineResult<T> = Result<T, WashlineError>;

impl WashlineError {
    /// Create a validation error.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }

    /// Create a store error from any backend failure.
    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    /// Whether the error was caused by the caller's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ValidationError(_) | Self::NotificationNotFound(_))
    }
}
