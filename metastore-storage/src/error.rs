//! Storage error types.

use std::io;
use thiserror::Error;

/// Record storage errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// No content is addressable under the requested record id
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Content exists (or existence is indeterminate) but could not be read
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The record content is not well-formed XML
    #[error("Malformed document '{id}': {reason}")]
    MalformedDocument { id: String, reason: String },

    /// No backend constructor is registered under this type name
    #[error("Unknown storage type: {0}")]
    UnknownType(String),

    /// A backend constructor is already registered under this type name
    #[error("Storage type already registered: {0}")]
    DuplicateType(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration could not be parsed
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Operation not supported by this backend
    #[error("Operation not supported: {0}")]
    NotSupported(String),
}

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

impl StorageError {
    /// Check if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
            || matches!(self, StorageError::Io(e) if e.kind() == io::ErrorKind::NotFound)
    }

    /// Check if this error comes from configuration or registration.
    ///
    /// These are fatal at startup: the affected backend must not come into service.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            StorageError::UnknownType(_)
                | StorageError::DuplicateType(_)
                | StorageError::Config(_)
                | StorageError::Yaml(_)
        )
    }
}
