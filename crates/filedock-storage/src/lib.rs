//! FileDock Storage - Filesystem adapter for the `IFileStorage` port
//!
//! Provides [`DirectoryStorage`], which keeps every uploaded file as a plain
//! entry in one flat directory and uses `tokio::fs` for all I/O.

pub mod directory;

pub use directory::DirectoryStorage;
