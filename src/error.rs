//! Error types for the affiliate relay

use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the affiliate relay
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Channel error
    #[error("channel error: {0}")]
    Channel(String),

    /// Redirect resolution error
    #[error("redirect error: {0}")]
    Redirect(String),

    /// Link shortening error
    #[error("shortener error: {0}")]
    Shorten(String),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing error
    #[error("url error: {0}")]
    Url(#[from] url::ParseError),

    /// Pattern compilation error
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}
