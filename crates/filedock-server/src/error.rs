//! Client-facing error responses.
//!
//! Every error leaves the server as `{"message": ...}` with a matching
//! status. Messages are fixed strings: storage faults are logged where they
//! happen and never echoed to the client.

use hyper::StatusCode;
use thiserror::Error;

pub const MSG_FILE_NOT_FOUND: &str = "File not found";
pub const MSG_NO_FILE: &str = "No file provided";
pub const MSG_NO_FILE_NAME: &str = "No filename provided";
pub const MSG_INVALID_FILE_NAME: &str = "Invalid filename";
pub const MSG_INVALID_MULTIPART: &str = "Invalid multipart body";
pub const MSG_INVALID_BODY: &str = "Invalid request body";
pub const MSG_FILE_TOO_LARGE: &str = "File too large";
pub const MSG_LIST_FAILED: &str = "Error listing files";
pub const MSG_DOWNLOAD_FAILED: &str = "Error downloading file";
pub const MSG_UPLOAD_FAILED: &str = "Error uploading file";
pub const MSG_DELETE_FAILED: &str = "Error deleting file";
pub const MSG_NOT_FOUND: &str = "Not found";
pub const MSG_METHOD_NOT_ALLOWED: &str = "Method not allowed";

/// Errors returned by the request handlers
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// Missing or malformed parameter or payload (400)
    #[error("{0}")]
    BadRequest(&'static str),

    /// Unknown file or route (404)
    #[error("{0}")]
    NotFound(&'static str),

    /// Method not supported on this route (405)
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Upload body over the configured limit (413)
    #[error("File too large")]
    PayloadTooLarge,

    /// Storage fault; details are only in the server log (500)
    #[error("{0}")]
    Internal(&'static str),
}

impl ApiError {
    /// HTTP status for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message sent in the response body
    pub fn message(&self) -> &'static str {
        match self {
            ApiError::BadRequest(m) | ApiError::NotFound(m) | ApiError::Internal(m) => m,
            ApiError::MethodNotAllowed => MSG_METHOD_NOT_ALLOWED,
            ApiError::PayloadTooLarge => MSG_FILE_TOO_LARGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::BadRequest(MSG_NO_FILE).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound(MSG_FILE_NOT_FOUND).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Internal(MSG_UPLOAD_FAILED).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(ApiError::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_message_matches_display() {
        for err in [
            ApiError::BadRequest(MSG_NO_FILE_NAME),
            ApiError::NotFound(MSG_FILE_NOT_FOUND),
            ApiError::MethodNotAllowed,
            ApiError::PayloadTooLarge,
            ApiError::Internal(MSG_LIST_FAILED),
        ] {
            assert_eq!(err.to_string(), err.message());
        }
    }
}
