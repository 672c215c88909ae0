//! HTTP dispatch for the file API and the metrics endpoint.
//!
//! | Method   | Path           | Query                    | Operation |
//! |----------|----------------|--------------------------|-----------|
//! | `GET`    | `{base}`       | -                        | list      |
//! | `GET`    | `{base}`       | `fileName=X`             | download  |
//! | `GET`    | `{base}`       | `poll=..&since=<ms>`     | poll      |
//! | `POST`   | `{base}`       | multipart field `file`   | upload    |
//! | `DELETE` | `{base}`       | `fileName=X`             | delete    |
//! | `GET`    | `{metrics}`    | -                        | metrics   |

use std::sync::Arc;

use filedock_core::api::{ErrorBody, UploadResponse, PARAM_FILE_NAME, PARAM_POLL, PARAM_SINCE};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::{
    body::{Body, Bytes},
    header::{self, HeaderValue},
    Method, Request, Response, StatusCode,
};
use serde::Serialize;
use tracing::{debug, error};

use crate::{
    error::{ApiError, MSG_INVALID_BODY, MSG_NOT_FOUND},
    handlers::{Download, FilesApi},
    multipart::extract_upload,
};

/// Response type produced by every route
pub type HttpResponse = Response<Full<Bytes>>;

const JSON: &str = "application/json";
const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Query parameters understood by the `/files` routes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilesQuery {
    /// `fileName`; an empty value counts as absent
    pub file_name: Option<String>,
    /// Whether `poll` was present at all
    pub poll: bool,
    /// `since` in epoch ms; missing or unparsable values read as 0
    pub since: i64,
}

impl FilesQuery {
    /// Parses a raw query string. The first occurrence of each key wins.
    pub fn parse(query: Option<&str>) -> Self {
        let mut parsed = Self::default();
        let mut seen_since = false;

        for (key, value) in url::form_urlencoded::parse(query.unwrap_or("").as_bytes()) {
            match key.as_ref() {
                PARAM_FILE_NAME if parsed.file_name.is_none() => {
                    if !value.is_empty() {
                        parsed.file_name = Some(value.into_owned());
                    }
                }
                PARAM_POLL => parsed.poll = true,
                PARAM_SINCE if !seen_since => {
                    seen_since = true;
                    parsed.since = value.trim().parse().unwrap_or(0);
                }
                _ => {}
            }
        }

        parsed
    }
}

/// Routes requests to [`FilesApi`] and serves metrics.
pub struct Router {
    api: Arc<FilesApi>,
    base_path: String,
    metrics_path: Option<String>,
    max_upload_bytes: usize,
}

impl Router {
    /// # Arguments
    /// * `base_path` - where the file API is mounted, e.g. `/files`
    /// * `metrics_path` - where metrics are served, or `None` to disable them
    /// * `max_upload_bytes` - largest accepted upload request body
    pub fn new(
        api: Arc<FilesApi>,
        base_path: impl Into<String>,
        metrics_path: Option<String>,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            api,
            base_path: base_path.into(),
            metrics_path,
            max_upload_bytes,
        }
    }

    /// The API behind this router
    pub fn api(&self) -> &Arc<FilesApi> {
        &self.api
    }

    /// Handles one request. Never fails: errors become JSON error responses.
    pub async fn handle<B>(&self, req: Request<B>) -> HttpResponse
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let path = req.uri().path().to_owned();
        let (operation, response) = if path == self.base_path {
            self.files_route(req).await
        } else if self.metrics_path.as_deref() == Some(path.as_str()) {
            ("metrics", self.metrics_route(req.method()))
        } else {
            debug!(%path, "no route");
            ("unknown", error_response(ApiError::NotFound(MSG_NOT_FOUND)))
        };

        self.api
            .metrics()
            .record_request(operation, response.status().as_u16());
        response
    }

    async fn files_route<B>(&self, req: Request<B>) -> (&'static str, HttpResponse)
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let query = FilesQuery::parse(req.uri().query());
        let method = req.method().clone();

        match method {
            Method::GET => match query.file_name {
                Some(ref name) => ("download", into_response(self.api.download(name).await)),
                None if query.poll => {
                    let polled = self.api.poll(query.since).await;
                    ("poll", json_response(StatusCode::OK, &polled))
                }
                None => ("list", json_or_error(self.api.list().await)),
            },
            Method::POST => ("upload", json_or_error(self.upload(req).await)),
            Method::DELETE => {
                let deleted = self.api.delete(query.file_name.as_deref()).await;
                ("delete", json_or_error(deleted))
            }
            _ => ("unknown", method_not_allowed("GET, POST, DELETE")),
        }
    }

    async fn upload<B>(&self, req: Request<B>) -> Result<UploadResponse, ApiError>
    where
        B: Body<Data = Bytes>,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let (parts, body) = req.into_parts();
        let content_type = parts
            .headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());

        let body = Limited::new(body, self.max_upload_bytes)
            .collect()
            .await
            .map_err(|e| {
                if e.is::<LengthLimitError>() {
                    debug!(limit = self.max_upload_bytes, "upload over size limit");
                    ApiError::PayloadTooLarge
                } else {
                    debug!(error = %e, "failed to read upload body");
                    ApiError::BadRequest(MSG_INVALID_BODY)
                }
            })?
            .to_bytes();

        let payload = extract_upload(content_type, body).await?;
        self.api.upload(payload).await
    }

    fn metrics_route(&self, method: &Method) -> HttpResponse {
        if method != Method::GET {
            return method_not_allowed("GET");
        }

        let metrics = self.api.metrics();
        metrics.set_poll_waiters(self.api.register().waiter_count());
        match metrics.encode() {
            Ok(body) => {
                let mut response = Response::new(Full::new(Bytes::from(body)));
                response
                    .headers_mut()
                    .insert(header::CONTENT_TYPE, HeaderValue::from_static(PROMETHEUS_TEXT));
                response
            }
            Err(e) => {
                error!(error = %e, "failed to encode metrics");
                error_response(ApiError::Internal("Error encoding metrics"))
            }
        }
    }
}

// ============================================================================
// Response encoding
// ============================================================================

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> HttpResponse {
    match serde_json::to_vec(body) {
        Ok(bytes) => {
            let mut response = Response::new(Full::new(Bytes::from(bytes)));
            *response.status_mut() = status;
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON));
            response
        }
        Err(e) => {
            error!(error = %e, "failed to serialize response body");
            let mut response = Response::new(Full::new(Bytes::new()));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        }
    }
}

fn json_or_error<T: Serialize>(result: Result<T, ApiError>) -> HttpResponse {
    match result {
        Ok(body) => json_response(StatusCode::OK, &body),
        Err(e) => error_response(e),
    }
}

fn error_response(error: ApiError) -> HttpResponse {
    let body = ErrorBody {
        message: error.message().to_string(),
    };
    json_response(error.status(), &body)
}

fn method_not_allowed(allow: &'static str) -> HttpResponse {
    let mut response = error_response(ApiError::MethodNotAllowed);
    response
        .headers_mut()
        .insert(header::ALLOW, HeaderValue::from_static(allow));
    response
}

fn into_response(download: Result<Download, ApiError>) -> HttpResponse {
    let download = match download {
        Ok(d) => d,
        Err(e) => return error_response(e),
    };

    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", download.name))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));

    let mut response = Response::new(Full::new(download.data));
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(download.content_type),
    );
    headers.insert(header::CONTENT_DISPOSITION, disposition);
    response
}
