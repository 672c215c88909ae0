//! Extraction of the uploaded file from a `multipart/form-data` body.
//!
//! The body has already been collected (and size-limited) by the router;
//! `multer` parses it from a single-chunk stream.

use std::convert::Infallible;

use filedock_core::api::UPLOAD_FIELD;
use hyper::body::Bytes;
use tracing::debug;

use crate::error::{ApiError, MSG_INVALID_MULTIPART};

/// The file part of an upload request, before its name is sanitized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    /// File name as sent by the client
    pub file_name: String,
    pub data: Bytes,
}

/// Finds the first `file` field that carries a file name.
///
/// Returns `Ok(None)` when the request is not multipart or has no such
/// field; the caller reports that as a missing payload.
///
/// # Errors
/// [`ApiError::BadRequest`] if the multipart body is malformed.
pub async fn extract_upload(
    content_type: Option<&str>,
    body: Bytes,
) -> Result<Option<UploadPayload>, ApiError> {
    let Some(boundary) = content_type.and_then(|ct| multer::parse_boundary(ct).ok()) else {
        debug!(?content_type, "upload without multipart boundary");
        return Ok(None);
    };

    let stream = futures_util::stream::once(async move { Ok::<_, Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            debug!("'{UPLOAD_FIELD}' field without a file name; ignoring");
            continue;
        };
        let data = field.bytes().await.map_err(malformed)?;
        return Ok(Some(UploadPayload { file_name, data }));
    }

    Ok(None)
}

fn malformed(e: multer::Error) -> ApiError {
    debug!(error = %e, "malformed multipart body");
    ApiError::BadRequest(MSG_INVALID_MULTIPART)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const BOUNDARY: &str = "X-FILEDOCK-BOUNDARY";

    /// Builds a multipart body with one part per `(field, file_name, data)`.
    pub(crate) fn multipart_body(parts: &[(&str, Option<&str>, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (field, file_name, data) in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match file_name {
                Some(name) => body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{field}\"; filename=\"{name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                ),
                None => body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{field}\"\r\n\r\n").as_bytes(),
                ),
            }
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    pub(crate) fn content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    #[tokio::test]
    async fn test_extracts_file_field() {
        let body = multipart_body(&[
            ("comment", None, b"ignored"),
            ("file", Some("notes.txt"), b"hello\r\nworld"),
        ]);

        let payload = extract_upload(Some(&content_type()), Bytes::from(body))
            .await
            .unwrap()
            .expect("payload");
        assert_eq!(payload.file_name, "notes.txt");
        assert_eq!(&payload.data[..], b"hello\r\nworld");
    }

    #[tokio::test]
    async fn test_missing_file_field() {
        let body = multipart_body(&[("other", Some("a.txt"), b"x")]);
        let payload = extract_upload(Some(&content_type()), Bytes::from(body))
            .await
            .unwrap();
        assert!(payload.is_none());
    }

    #[tokio::test]
    async fn test_text_field_named_file_is_not_a_file() {
        let body = multipart_body(&[("file", None, b"just text")]);
        let payload = extract_upload(Some(&content_type()), Bytes::from(body))
            .await
            .unwrap();
        assert!(payload.is_none());
    }

    #[tokio::test]
    async fn test_not_multipart() {
        let payload = extract_upload(Some("application/json"), Bytes::from_static(b"{}"))
            .await
            .unwrap();
        assert!(payload.is_none());

        let payload = extract_upload(None, Bytes::new()).await.unwrap();
        assert!(payload.is_none());
    }

    #[tokio::test]
    async fn test_truncated_body_is_bad_request() {
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\r\nno end"
        );
        let err = extract_upload(Some(&content_type()), Bytes::from(body))
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::BadRequest(MSG_INVALID_MULTIPART));
    }
}
