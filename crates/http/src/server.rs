use crate::acceptor::ClientIdentityAcceptor;
use crate::error::Error;

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum_server::Handle;
use rustls::ServerConfig;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::info;

/// HTTPS server requiring client certificates.
pub struct TlsHttpServer {
    acceptor: ClientIdentityAcceptor,
    handle: Handle,
    listen_addr: SocketAddr,
    shutdown_token: CancellationToken,
    task_tracker: TaskTracker,
}

impl TlsHttpServer {
    /// Creates a new instance of `TlsHttpServer`.
    #[must_use]
    pub fn new(listen_addr: SocketAddr, config: Arc<ServerConfig>) -> Self {
        Self {
            acceptor: ClientIdentityAcceptor::new(config),
            handle: Handle::new(),
            listen_addr,
            shutdown_token: CancellationToken::new(),
            task_tracker: TaskTracker::new(),
        }
    }

    /// Starts serving `router`.
    ///
    /// # Errors
    ///
    /// Returns an error if the server was already started.
    pub fn start(&self, router: Router) -> Result<JoinHandle<()>, Error> {
        if self.task_tracker.is_closed() {
            return Err(Error::AlreadyStarted);
        }

        let acceptor = self.acceptor.clone();
        let handle = self.handle.clone();
        let listen_addr = self.listen_addr;
        let shutdown_token = self.shutdown_token.clone();

        let join_handle = self.task_tracker.spawn(async move {
            info!("https server listening on {}", listen_addr);

            tokio::select! {
                e = axum_server::bind(listen_addr)
                    .acceptor(acceptor)
                    .handle(handle)
                    .serve(router.into_make_service())
                    .into_future() => {
                    info!("https server exited {:?}", e);
                }
                () = shutdown_token.cancelled() => {}
            };
        });

        self.task_tracker.close();

        Ok(join_handle)
    }

    /// Resolves to the bound address once the listener is up. Useful when
    /// binding port 0.
    pub async fn listening(&self) -> Option<SocketAddr> {
        self.handle.listening().await
    }

    /// Stops the server and waits for the serving task to exit.
    pub async fn shutdown(&self) {
        info!("https server shutting down...");

        self.shutdown_token.cancel();
        self.task_tracker.wait().await;

        info!("https server shutdown");
    }
}
