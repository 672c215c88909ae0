//! File storage port (driven/secondary port)
//!
//! This module defines the interface the request handlers use to reach the
//! flat storage directory.
//!
//! ## Design Notes
//!
//! - Every operation takes a [`FileName`], so sanitization has already
//!   happened by the time an adapter sees a name.
//! - The directory is the only source of truth. Adapters must not keep an
//!   index or cache of entries between calls.
//! - Errors use the typed [`StorageError`] so the HTTP layer can tell a
//!   missing file apart from a storage fault.

use crate::domain::{FileDescriptor, FileName, StorageError};

/// Port trait for the flat file store behind the service
///
/// ## Implementation Notes
///
/// - The root directory is created lazily on first access if absent.
/// - `write` replaces existing content silently (last write wins).
/// - Implementations must be safe to call concurrently from many tasks.
#[async_trait::async_trait]
pub trait IFileStorage: Send + Sync {
    /// Lists the names of all regular files in the root
    ///
    /// Entries whose names are not valid sanitized names are skipped.
    async fn list(&self) -> Result<Vec<FileName>, StorageError>;

    /// Returns the metadata of a single file
    ///
    /// # Errors
    /// [`StorageError::NotFound`] if no regular file with this name exists
    async fn stat(&self, name: &FileName) -> Result<FileDescriptor, StorageError>;

    /// Reads the entire contents of a file
    ///
    /// # Errors
    /// [`StorageError::NotFound`] if the file does not exist
    async fn read(&self, name: &FileName) -> Result<Vec<u8>, StorageError>;

    /// Writes data to a file, creating or replacing it
    async fn write(&self, name: &FileName, data: &[u8]) -> Result<(), StorageError>;

    /// Deletes a file
    ///
    /// # Errors
    /// [`StorageError::NotFound`] if the file does not exist
    async fn remove(&self, name: &FileName) -> Result<(), StorageError>;
}
