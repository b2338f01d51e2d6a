//! Error types for the storage system

use thiserror::Error;

use super::models::PartitionKind;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Error types for storage operations
///
/// Errors returned by a [`BackendAdapter`](super::backend::BackendAdapter) reach
/// the caller of `get_data`/`save_data` unchanged.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Invalid storage configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A TTL value is missing, not a finite strictly positive number, or out of range
    #[error("Invalid TTL settings: {partition} has value {value:?}")]
    InvalidTtl {
        /// Partition whose TTL failed validation
        partition: PartitionKind,
        /// The offending value (`None` when missing)
        value: Option<f64>,
    },

    /// Connection error (for remote backends)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Failure reported by a backing store
    #[error("Backend error: {0}")]
    Backend(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Stored data could not be decoded
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a backend error
    pub fn backend<S: Into<String>>(message: S) -> Self {
        Self::Backend(message.into())
    }

    /// Create a deserialization error
    pub fn deserialization<S: Into<String>>(message: S) -> Self {
        Self::Deserialization(message.into())
    }

    /// Whether this error was raised while building the storage (as opposed to during I/O)
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            StorageError::Configuration(_) | StorageError::InvalidTtl { .. }
        )
    }
}
