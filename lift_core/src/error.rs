//! Error types for the lift_core library.

use serde::{Deserialize, Serialize};
use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for lift_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed input: empty plan, non-positive increment, zero-day layout
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation forbidden by current state (second active mesocycle, bad transition)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Referenced mesocycle, plan or workout does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Coarse error classification surfaced to callers in response envelopes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Conflict,
    NotFound,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Validation(_) | Error::Config(_) => ErrorKind::Validation,
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Io(_) | Error::Json(_) | Error::Csv(_) | Error::Toml(_) => {
                ErrorKind::Internal
            }
        }
    }

    /// Message without the kind prefix added by `Display`
    pub fn message(&self) -> String {
        match self {
            Error::Validation(msg)
            | Error::Conflict(msg)
            | Error::NotFound(msg)
            | Error::Config(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}
