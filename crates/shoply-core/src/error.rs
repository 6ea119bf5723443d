use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type for the Shoply support bot.
///
/// Startup failures (configuration, reference data) surface as this type and
/// abort the program before the session loop starts. The chat crate wraps it
/// in its own error so `?` works across the crate boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ShoplyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid data in {}: {reason}", file.display())]
    InvalidData { file: PathBuf, reason: String },
}

impl From<toml::de::Error> for ShoplyError {
    fn from(err: toml::de::Error) -> Self {
        ShoplyError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for ShoplyError {
    fn from(err: serde_json::Error) -> Self {
        ShoplyError::Serialization(err.to_string())
    }
}

/// A specialized `Result` type for Shoply operations.
pub type Result<T> = std::result::Result<T, ShoplyError>;
