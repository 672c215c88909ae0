//! JSON bodies exchanged over the `/files` endpoint
//!
//! The server serializes these and the CLI client deserializes them, so both
//! sides agree on field names. Timestamps are milliseconds since the Unix
//! epoch as produced by the change register.

use serde::{Deserialize, Serialize};

use crate::domain::FileDescriptor;

/// Query parameter naming the file for download/delete
pub const PARAM_FILE_NAME: &str = "fileName";
/// Query parameter selecting long-poll mode
pub const PARAM_POLL: &str = "poll";
/// Query parameter carrying the client's last seen timestamp
pub const PARAM_SINCE: &str = "since";
/// Multipart field holding the uploaded file
pub const UPLOAD_FIELD: &str = "file";

/// `GET /files`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListResponse {
    pub files: Vec<FileDescriptor>,
    pub timestamp: i64,
}

/// `GET /files?poll=true&since=..`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollResponse {
    /// Whether a mutation happened after `since`
    pub changes: bool,
    pub timestamp: i64,
}

/// `POST /files`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub file: FileDescriptor,
    pub timestamp: i64,
}

/// `DELETE /files?fileName=..`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub message: String,
    pub timestamp: i64,
}

/// Body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
