//! Error types for fetching and storing images.

use thiserror::Error;

/// Main error type for all fetch operations.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Resolution string was not of the form `WIDTHxHEIGHT`.
    #[error("Invalid resolution: {0}")]
    InvalidResolution(String),

    /// Configuration value out of range.
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Thread carries no usable image source.
    #[error("No image in thread: {0}")]
    NoImage(String),

    /// Server answered with a non-success status.
    #[error("HTTP {status} for {url}")]
    Http {
        status: reqwest::StatusCode,
        url: String,
    },

    /// Installing or removing the scheduled task failed.
    #[error("Scheduler error: {0}")]
    Scheduler(String),

    /// HTTP request failed.
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),

    /// YAML config parsing failed.
    #[error("Config parse error: {0}")]
    ConfigError(#[from] serde_yaml::Error),

    /// I/O operation failed.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Result type alias for fetch operations.
pub type Result<T> = std::result::Result<T, FetchError>;
