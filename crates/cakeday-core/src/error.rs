//! Unified error types for Cakeday.

use thiserror::Error;

/// Result type alias using CakedayError.
pub type Result<T> = std::result::Result<T, CakedayError>;

#[derive(Error, Debug)]
pub enum CakedayError {
    // Store errors
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    // Channel errors
    #[error("Authentication failed: {0}")]
    AuthFailed(String),

    #[error("Email error: {0}")]
    Email(String),

    // Scheduler errors
    #[error("Invalid schedule expression: {0}")]
    InvalidSchedule(String),

    #[error("A dispatch pass is already in progress")]
    PassInProgress,

    // Config errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    // Gateway errors
    #[error("Gateway error: {0}")]
    Gateway(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl CakedayError {
    pub fn store(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRecord(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True when the error means the record vanished underneath us.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
