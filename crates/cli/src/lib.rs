//! Shared plumbing for the indicator binaries: error type, flag groups,
//! logging setup, signal handling, and server startup.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod args;
mod error;

pub use args::{PromqlArgs, TlsArgs, UaaArgs};
pub use error::Error;

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use indicator_domain::IndicatorDocument;
use indicator_http::TlsHttpServer;
use rustls::ServerConfig;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Installs the log subscriber. `RUST_LOG` overrides the default `info`
/// level.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}

/// Resolves on SIGTERM or SIGINT.
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("received SIGTERM"),
                    _ = sigint.recv() => info!("received SIGINT"),
                }
                return;
            }
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "failed to install signal handlers, falling back to ctrl-c");
            }
        }
    }

    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
    }
    info!("received interrupt signal");
}

/// Serves `router` on `addr` until a shutdown signal arrives: over TLS when a
/// server configuration is given, plain HTTP otherwise.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound.
pub async fn serve(
    addr: SocketAddr,
    router: Router,
    tls: Option<Arc<ServerConfig>>,
) -> Result<(), Error> {
    if let Some(config) = tls {
        let server = TlsHttpServer::new(addr, config);
        server.start(router)?;

        wait_for_shutdown().await;
        server.shutdown().await;

        return Ok(());
    }

    warn!("no tls material configured, serving plain http");

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| Error::Io(format!("failed to bind {addr}"), e))?;
    info!("http server listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(wait_for_shutdown())
        .await
        .map_err(|e| Error::Io("http server failed".to_string(), e))?;

    info!("http server shutdown");

    Ok(())
}

/// Reads and validates an indicator document.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid document.
pub fn load_document(path: &Path) -> Result<IndicatorDocument, Error> {
    let bytes =
        std::fs::read(path).map_err(|e| Error::Io(format!("failed to read {}", path.display()), e))?;

    Ok(IndicatorDocument::from_yaml(&bytes)?)
}

/// Base URL without a trailing slash, as the HTTP clients expect.
#[must_use]
pub fn base_url(url: &url::Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}
