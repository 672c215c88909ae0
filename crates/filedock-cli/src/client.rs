//! FileDock HTTP client
//!
//! Typed wrapper around `reqwest` for the `/files` endpoint. Error responses
//! carry `{"message": ...}`; the message is surfaced in the returned error.

use anyhow::{bail, Context, Result};
use filedock_core::api::{
    DeleteResponse, ErrorBody, ListResponse, PollResponse, UploadResponse, PARAM_FILE_NAME,
    PARAM_POLL, PARAM_SINCE, UPLOAD_FIELD,
};
use reqwest::{
    multipart::{Form, Part},
    Client, Method, RequestBuilder, Response,
};
use tracing::debug;

/// Default endpoint of a locally running `filedockd`
pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:3000/files";

/// HTTP client for one FileDock endpoint
pub struct FileDockClient {
    client: Client,
    /// Full URL of the files endpoint, e.g. `http://host:3000/files`
    endpoint: String,
}

impl FileDockClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, method: Method) -> RequestBuilder {
        self.client.request(method, &self.endpoint)
    }

    /// Lists stored files and the current change timestamp.
    pub async fn list(&self) -> Result<ListResponse> {
        debug!(endpoint = %self.endpoint, "Listing files");
        let response = self
            .request(Method::GET)
            .send()
            .await
            .context("Failed to send list request")?;

        check(response)
            .await?
            .json()
            .await
            .context("Failed to parse list response")
    }

    /// Waits until something changed after `since`, or the server's poll
    /// timeout passes.
    pub async fn poll(&self, since: i64) -> Result<PollResponse> {
        debug!(since, "Polling for changes");
        let response = self
            .request(Method::GET)
            .query(&[(PARAM_POLL, "true".to_string()), (PARAM_SINCE, since.to_string())])
            .send()
            .await
            .context("Failed to send poll request")?;

        check(response)
            .await?
            .json()
            .await
            .context("Failed to parse poll response")
    }

    /// Uploads `data` as a file named `file_name`.
    pub async fn upload(&self, file_name: &str, data: Vec<u8>) -> Result<UploadResponse> {
        debug!(file_name, bytes = data.len(), "Uploading file");
        let part = Part::bytes(data).file_name(file_name.to_string());
        let form = Form::new().percent_encode_noop().part(UPLOAD_FIELD, part);

        let response = self
            .request(Method::POST)
            .multipart(form)
            .send()
            .await
            .context("Failed to send upload request")?;

        check(response)
            .await?
            .json()
            .await
            .context("Failed to parse upload response")
    }

    /// Downloads a file's contents.
    pub async fn download(&self, file_name: &str) -> Result<Vec<u8>> {
        debug!(file_name, "Downloading file");
        let response = self
            .request(Method::GET)
            .query(&[(PARAM_FILE_NAME, file_name)])
            .send()
            .await
            .context("Failed to send download request")?;

        let bytes = check(response)
            .await?
            .bytes()
            .await
            .context("Failed to read download response body")?;
        Ok(bytes.to_vec())
    }

    /// Deletes a file.
    pub async fn delete(&self, file_name: &str) -> Result<DeleteResponse> {
        debug!(file_name, "Deleting file");
        let response = self
            .request(Method::DELETE)
            .query(&[(PARAM_FILE_NAME, file_name)])
            .send()
            .await
            .context("Failed to send delete request")?;

        check(response)
            .await?
            .json()
            .await
            .context("Failed to parse delete response")
    }
}

/// Passes successful responses through; turns error responses into errors
/// carrying the server's message.
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = match response.json::<ErrorBody>().await {
        Ok(body) => body.message,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    };
    bail!("{message} (HTTP {})", status.as_u16())
}
