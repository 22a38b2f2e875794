//! Error types for the extract crate

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while acquiring or validating drop-files.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Filesystem failure on a specific path
    #[error("io error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File content is not parseable as the expected document shape
    #[error("invalid document in '{path}': {message}")]
    Document { path: PathBuf, message: String },

    /// Required configuration for this extractor is missing
    #[error("extractor configuration error: {0}")]
    Config(String),

    /// The API source is a reserved interface without an implementation
    #[error("api source is not implemented")]
    ApiNotImplemented,
}

impl ExtractError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn document(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Document {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for ExtractError
pub type Result<T> = std::result::Result<T, ExtractError>;
