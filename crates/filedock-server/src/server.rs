//! HTTP/1 listener serving the [`Router`].

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::router::Router;

/// HTTP server bound to a socket, dispatching every request to a [`Router`].
pub struct FileServer {
    listener: TcpListener,
    router: Arc<Router>,
}

impl FileServer {
    /// Binds the listening socket.
    ///
    /// Binding happens here rather than in [`FileServer::run`] so callers can
    /// bind to port 0 and read the chosen address back.
    pub async fn bind(addr: SocketAddr, router: Arc<Router>) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, router })
    }

    /// Address the server is listening on
    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until `shutdown` is cancelled.
    ///
    /// Connections already in flight (including suspended polls) are not
    /// awaited; they end when the runtime shuts down.
    pub async fn run(self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let addr = self.local_addr()?;
        info!(%addr, "File server listening");

        loop {
            tokio::select! {
                result = self.listener.accept() => {
                    let (stream, peer) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };
                    debug!(%peer, "Accepted connection");

                    let io = TokioIo::new(stream);
                    let router = Arc::clone(&self.router);

                    tokio::spawn(async move {
                        let service = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { Ok::<_, Infallible>(router.handle(req).await) }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                            error!(error = %e, %peer, "HTTP connection error");
                        }
                    });
                }
                _ = shutdown.cancelled() => {
                    info!("File server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use filedock_notify::ChangeRegister;
    use filedock_storage::DirectoryStorage;

    use super::*;
    use crate::{handlers::FilesApi, metrics::MetricsRegistry};

    fn router(root: &std::path::Path) -> Arc<Router> {
        let api = FilesApi::new(
            Arc::new(DirectoryStorage::new(root)),
            Arc::new(ChangeRegister::new()),
            Duration::from_secs(30),
            Arc::new(MetricsRegistry::new().unwrap()),
        );
        Arc::new(Router::new(Arc::new(api), "/files", None, 1024))
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let dir = tempfile::tempdir().unwrap();
        let server = FileServer::bind("127.0.0.1:0".parse().unwrap(), router(dir.path()))
            .await
            .unwrap();
        assert_ne!(server.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let server = FileServer::bind("127.0.0.1:0".parse().unwrap(), router(dir.path()))
            .await
            .unwrap();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(server.run(shutdown.clone()));

        shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server did not stop")
            .unwrap();
        assert!(result.is_ok());
    }
}
