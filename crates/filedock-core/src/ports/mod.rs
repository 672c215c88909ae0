//! Port definitions (hexagonal architecture interfaces)
//!
//! - [`IFileStorage`] - the flat directory holding uploaded files

pub mod file_storage;

pub use file_storage::IFileStorage;
