//! Error types for the store adapter crate

use thiserror::Error;

/// Errors raised by store engines and the engine registry.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No engine registered under the configured name
    #[error("unknown store engine '{name}'. Registered engines: {registered}")]
    UnknownEngine { name: String, registered: String },

    /// Engine-specific configuration missing or invalid
    #[error("invalid store configuration: {0}")]
    InvalidConfig(String),

    /// A DDL script failed during schema initialization
    #[error("schema initialization failed in '{script}': {source}")]
    Schema {
        script: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    /// Underlying database failure
    #[error(transparent)]
    Database(#[from] rusqlite::Error),

    /// Filesystem failure while preparing the database location
    #[error("database path error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for StoreError
pub type Result<T> = std::result::Result<T, StoreError>;
