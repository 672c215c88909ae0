//! Domain entities and business rules
//!
//! - `file_name` - sanitized names, the only way to address a stored file
//! - `descriptor` - metadata projection from raw stats to client descriptors
//! - `content_type` - extension to MIME type table for downloads
//! - `errors` - the storage error taxonomy

pub mod content_type;
pub mod descriptor;
pub mod errors;
pub mod file_name;

pub use content_type::{content_type_for, DEFAULT_CONTENT_TYPE};
pub use descriptor::{EntryStat, FileDescriptor};
pub use errors::StorageError;
pub use file_name::FileName;
