//! Error types for local storage operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Record names must be plain file names
    #[error("invalid record name '{0}'")]
    InvalidName(String),

    #[error("storage I/O failed for '{name}': {source}")]
    Io {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode record '{name}': {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode record '{name}': {source}")]
    Decode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    pub(crate) fn io(name: &str, source: std::io::Error) -> Self {
        Self::Io {
            name: name.to_string(),
            source,
        }
    }
}

/// Result type alias for StorageError
pub type Result<T> = std::result::Result<T, StorageError>;
