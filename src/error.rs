//! Error types for hearth

use thiserror::Error;

/// Result type alias for hearth operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while dispatching voice commands
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Assistant engine session error
    #[error("assistant error: {0}")]
    Assistant(String),

    /// Speech output error
    #[error("speech error: {0}")]
    Speech(String),

    /// Home-automation hub error
    #[error("hub error: {0}")]
    Hub(String),

    /// Entity or resource not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Operating system command error
    #[error("system error: {0}")]
    System(String),

    /// Operation exceeded its time budget
    #[error("timed out: {0}")]
    Timeout(String),

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

    /// URL parsing error
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}
