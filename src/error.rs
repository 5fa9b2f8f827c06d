//! Error types for the wavelink chat client

use thiserror::Error;

/// Result type alias for wavelink operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the wavelink client
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level connection failure (open or drop)
    #[error("connection error: {0}")]
    Connection(String),

    /// HTTP or transport operation exceeded its deadline
    #[error("timeout: {0}")]
    Timeout(String),

    /// Non-2xx HTTP response
    #[error("http status {0}")]
    HttpStatus(u16),

    /// Application-level error event from the backend
    #[error("channel error: {0}")]
    Channel(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
