//! Domain error types
//!
//! Errors raised by the storage boundary. The HTTP layer maps these onto
//! client-facing statuses; `Io` is the only variant that is a server fault.

use thiserror::Error;

/// Errors that can occur in storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// No regular file with this name exists in the storage root
    #[error("File not found: {0}")]
    NotFound(String),

    /// The name is empty or addresses the root itself after sanitization
    #[error("Invalid file name: {0:?}")]
    InvalidName(String),

    /// Underlying filesystem failure
    #[error("I/O error during {op}: {source}")]
    Io {
        /// The storage operation that failed (`list`, `read`, ...)
        op: &'static str,
        /// The error reported by the operating system
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Wraps an I/O error, turning `ErrorKind::NotFound` into [`StorageError::NotFound`].
    pub fn from_io(op: &'static str, name: &str, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(name.to_string())
        } else {
            Self::Io { op, source }
        }
    }

    /// Returns true for [`StorageError::NotFound`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
