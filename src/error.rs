//! Musebot error types

use thiserror::Error;

/// Musebot error type
#[derive(Error, Debug)]
pub enum Error {
    /// An external call exceeded its deadline
    #[error("Operation timed out")]
    Timeout,

    /// Remote generation backend returned an error or malformed payload
    #[error("Backend error: {0}")]
    Backend(String),

    /// Blob fetch or other network transfer failed
    #[error("Network error: {0}")]
    Network(String),

    /// Context or artifact absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Missing or malformed user argument
    #[error("Validation error: {0}")]
    Validation(String),

    /// Durable storage failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for musebot operations
pub type Result<T> = std::result::Result<T, Error>;
