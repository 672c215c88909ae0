//! FileDock Daemon - HTTP file service
//!
//! This binary serves the `/files` API and handles:
//! - Loading and validating the YAML configuration
//! - Preparing the storage directory
//! - Serving HTTP until SIGTERM/SIGINT
//!
//! # Architecture
//!
//! The daemon wires a `DirectoryStorage` into a `filedock_server::Router` and
//! runs a `FileServer` accept loop. The loop is controlled by a
//! `CancellationToken` that is triggered on receipt of SIGTERM or SIGINT.

use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{bail, Context, Result};
use clap::Parser;
use filedock_core::config::{Config, ConfigBuilder};
use filedock_server::{build_router, FileServer};
use filedock_storage::DirectoryStorage;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "filedockd", version, about = "FileDock file service daemon")]
struct Args {
    /// Use alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on, overriding `server.listen`
    #[arg(long)]
    listen: Option<String>,

    /// Storage directory, overriding `storage.root`
    #[arg(long)]
    root: Option<PathBuf>,

    /// Verbose output (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    /// Loads the configuration file and applies command-line overrides.
    ///
    /// An explicitly requested config file must load; the default location
    /// falls back to built-in defaults when missing.
    fn load_config(&self) -> Result<Config> {
        let config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?,
            None => Config::load_or_default(&Config::default_path()),
        };

        let mut builder = ConfigBuilder::from_config(config);
        if let Some(listen) = &self.listen {
            builder = builder.server_listen(listen.clone());
        }
        if let Some(root) = &self.root {
            builder = builder.storage_root(root.clone());
        }

        match builder.build_validated() {
            Ok(config) => Ok(config),
            Err(errors) => {
                let joined = errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; ");
                bail!("Invalid configuration: {joined}")
            }
        }
    }

    /// Log filter used when `RUST_LOG` is not set.
    fn log_level<'a>(&self, config: &'a Config) -> &'a str {
        match self.verbose {
            0 => config.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    }
}

// ============================================================================
// DaemonService
// ============================================================================

/// Owns the validated configuration and the shutdown token.
struct DaemonService {
    config: Config,
    shutdown: CancellationToken,
}

impl DaemonService {
    fn new(config: Config, shutdown: CancellationToken) -> Self {
        Self { config, shutdown }
    }

    /// Prepares storage, binds the listener and serves until shutdown.
    async fn run(&self) -> Result<()> {
        let storage = Arc::new(DirectoryStorage::new(self.config.storage.root.clone()));
        storage.ensure_root().await.with_context(|| {
            format!(
                "Failed to prepare storage root {}",
                self.config.storage.root.display()
            )
        })?;
        info!(root = %storage.root().display(), "Storage ready");

        let router = Arc::new(build_router(&self.config, storage)?);
        let addr: SocketAddr = self.config.server.listen.parse()?;
        let server = FileServer::bind(addr, router)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        info!(
            base_path = %self.config.server.base_path,
            poll_timeout_ms = self.config.poll.timeout_ms,
            metrics = self.config.metrics.enabled,
            "Serving file API"
        );

        server.run(self.shutdown.clone()).await
    }
}

// ============================================================================
// Graceful shutdown signal handler
// ============================================================================

/// Waits for SIGTERM or SIGINT and triggers the cancellation token
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received SIGTERM");
        }
    }

    token.cancel();
}

// ============================================================================
// Main entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = args.load_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level(&config)));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();

    info!(listen = %config.server.listen, "FileDock daemon starting (filedockd)");

    let shutdown_token = CancellationToken::new();

    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal(signal_token).await;
    });

    let service = DaemonService::new(config, shutdown_token);
    let result = service.run().await;

    match &result {
        Ok(()) => info!("FileDock daemon shut down gracefully"),
        Err(e) => error!(error = %e, "FileDock daemon exiting with error"),
    }

    result
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use super::*;

    fn args(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("filedockd").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn test_overrides_apply_over_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "server:\n  listen: \"0.0.0.0:8080\"\nstorage:\n  root: /srv/from-file\npoll:\n  timeout_ms: 5000"
        )
        .unwrap();

        let path = file.path().to_str().unwrap();
        let config = args(&["--config", path, "--root", "/srv/override"])
            .load_config()
            .unwrap();

        assert_eq!(config.server.listen, "0.0.0.0:8080");
        assert_eq!(config.storage.root, PathBuf::from("/srv/override"));
        assert_eq!(config.poll.timeout_ms, 5000);
    }

    #[test]
    fn test_missing_explicit_config_is_an_error() {
        let result = args(&["--config", "/nonexistent/filedock.yaml"]).load_config();
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "logging:\n  level: info").unwrap();

        let path = file.path().to_str().unwrap();
        let err = args(&["--config", path, "--listen", "not-an-address"])
            .load_config()
            .unwrap_err();
        assert!(err.to_string().contains("server.listen"));
    }

    #[test]
    fn test_log_level_from_verbosity() {
        let config = ConfigBuilder::new().logging_level("warn").build();
        assert_eq!(args(&[]).log_level(&config), "warn");
        assert_eq!(args(&["-v"]).log_level(&config), "debug");
        assert_eq!(args(&["-vv"]).log_level(&config), "trace");
    }

    #[tokio::test]
    async fn test_service_creates_root_and_stops_on_cancel() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("uploads");
        let config = ConfigBuilder::new()
            .server_listen("127.0.0.1:0")
            .storage_root(root.clone())
            .build();

        let shutdown = CancellationToken::new();
        let service = DaemonService::new(config, shutdown.clone());
        let handle = tokio::spawn(async move { service.run().await });

        tokio::time::timeout(Duration::from_secs(5), async {
            while !root.is_dir() {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("storage root was not created");

        shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("daemon did not stop")
            .unwrap();
        assert!(result.is_ok());
    }
}
