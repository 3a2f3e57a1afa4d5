//! Error types for blitz-sync-core

use thiserror::Error;

/// Main error type for blitz-sync operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    #[error("account_id {0} is out of the known id range")]
    RegionClassification(i64),

    #[error("player {0} not found in replay")]
    PlayerNotFound(i64),

    #[error("{field} {value} does not fit in {bits} bits")]
    IdOverflow {
        field: &'static str,
        value: u64,
        bits: u32,
    },

    #[error("invalid stat id {0:?}: expected 24 hex digits")]
    InvalidStatId(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to parse upstream JSON: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a field validation failure
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Error::Validation {
            field,
            message: message.into(),
        }
    }
}

/// Result type alias for blitz-sync operations
pub type Result<T> = std::result::Result<T, Error>;
