//! FileDock Server - HTTP file API with long-poll change notification
//!
//! Provides:
//! - `FilesApi`: list, download, upload, delete and poll over an `IFileStorage`
//! - `Router`: maps `GET/POST/DELETE {base_path}` and the metrics path onto `FilesApi`
//! - `FileServer`: hyper HTTP/1 accept loop with cancellation
//! - `MetricsRegistry`: Prometheus counters and gauges for the above

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod multipart;
pub mod router;
pub mod server;

use std::sync::Arc;
use std::time::Duration;

use filedock_core::config::Config;
use filedock_core::ports::IFileStorage;
use filedock_notify::ChangeRegister;

pub use error::ApiError;
pub use handlers::{Download, FilesApi};
pub use metrics::MetricsRegistry;
pub use multipart::UploadPayload;
pub use router::{FilesQuery, Router};
pub use server::FileServer;

/// Wires storage, change register, metrics and router from a validated config.
pub fn build_router(config: &Config, storage: Arc<dyn IFileStorage>) -> anyhow::Result<Router> {
    let metrics = Arc::new(MetricsRegistry::new()?);
    let api = FilesApi::new(
        storage,
        Arc::new(ChangeRegister::new()),
        Duration::from_millis(config.poll.timeout_ms),
        metrics,
    );

    let metrics_path = config
        .metrics
        .enabled
        .then(|| config.metrics.path.clone());

    Ok(Router::new(
        Arc::new(api),
        config.server.base_path.clone(),
        metrics_path,
        config.max_upload_bytes(),
    ))
}

#[cfg(test)]
mod tests {
    use filedock_core::config::ConfigBuilder;
    use filedock_storage::DirectoryStorage;
    use http_body_util::{BodyExt, Full};
    use hyper::{body::Bytes, Request, StatusCode};

    use super::*;

    fn get(uri: &str) -> Request<Full<Bytes>> {
        Request::get(uri).body(Full::new(Bytes::new())).unwrap()
    }

    #[tokio::test]
    async fn test_build_router_honours_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigBuilder::new()
            .server_base_path("/api/files")
            .metrics_enabled(false)
            .build();
        let router =
            build_router(&config, Arc::new(DirectoryStorage::new(dir.path()))).unwrap();

        let response = router.handle(get("/api/files")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["files"].as_array().unwrap().is_empty());

        assert_eq!(router.handle(get("/files")).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(router.handle(get("/metrics")).await.status(), StatusCode::NOT_FOUND);
    }
}
