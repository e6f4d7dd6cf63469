//! Error types for cooccur-core.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Top-level error type for cooccur-core.
///
/// Catalog and configuration problems are raised when the catalogs are
/// constructed, never mid-simulation. Simulation and aggregation are
/// infallible once the catalogs exist.
#[derive(Debug, Error)]
pub enum CooccurError {
    /// An input file does not exist.
    #[error("Input file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// An input file lacks an expected column or carries malformed cells.
    #[error("Schema error in {}: {message}", path.display())]
    Schema { path: PathBuf, message: String },

    /// A catalog failed eager validation.
    #[error("Catalog error: {field} - {message}")]
    Catalog { field: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CooccurError {
    /// Create a Catalog error.
    pub fn catalog(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Catalog {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a Schema error for the given file.
    pub fn schema(path: &Path, message: impl Into<String>) -> Self {
        Self::Schema {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Create a NotFound error for the given file.
    pub fn not_found(path: &Path) -> Self {
        Self::NotFound {
            path: path.to_path_buf(),
        }
    }
}

impl From<serde_json::Error> for CooccurError {
    fn from(err: serde_json::Error) -> Self {
        CooccurError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for CooccurError {
    fn from(err: config::ConfigError) -> Self {
        CooccurError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for CooccurError {
    fn from(err: toml::de::Error) -> Self {
        CooccurError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for CooccurError {
    fn from(err: toml::ser::Error) -> Self {
        CooccurError::Serialization(err.to_string())
    }
}

/// Result type alias for cooccur operations.
pub type CooccurResult<T> = Result<T, CooccurError>;
