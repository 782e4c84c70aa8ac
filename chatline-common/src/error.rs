//! Error types for Chatline.

use thiserror::Error;

/// Result type alias using the Chatline error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for Chatline services.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// External service error (completion or messaging provider)
    #[error("External service error: {0}")]
    External(String),

    /// Timeout error
    #[error("Operation timed out")]
    Timeout,
}
