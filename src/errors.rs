//! Error types for the drawbook engine
//!
//! Computations over a snapshot never fail: bad data is dropped, zeroed or
//! reported as an empty result. Errors only come from the edges of the
//! crate (configuration, snapshot files, exports).

use thiserror::Error;

/// Root error type for all drawbook operations
#[derive(Debug, Error)]
pub enum BookError {
    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Snapshot loading and decoding errors
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    /// Report export errors
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// I/O outside snapshot reads and exports
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration and validation errors
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Missing required field: {0}")]
    MissingRequired(String),

    #[error("Invalid value for {field}: '{value}' ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("Failed to save configuration: {0}")]
    SaveFailed(String),
}

/// Errors reading a draw snapshot supplied by the data-access layer
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Failed to read snapshot {path}: {reason}")]
    ReadFailed { path: String, reason: String },

    #[error("Malformed snapshot: {0}")]
    Malformed(String),
}

/// Errors writing report exports
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}

impl From<serde_json::Error> for BookError {
    fn from(e: serde_json::Error) -> Self {
        BookError::Snapshot(SnapshotError::Malformed(e.to_string()))
    }
}

impl From<toml::de::Error> for BookError {
    fn from(e: toml::de::Error) -> Self {
        BookError::Configuration(ConfigurationError::LoadFailed(e.to_string()))
    }
}

/// Convenience type alias for Results
pub type BookResult<T> = Result<T, BookError>;
