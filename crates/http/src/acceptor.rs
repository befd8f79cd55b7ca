use crate::identity::ClientIdentity;

use std::io;
use std::sync::Arc;

use axum::Extension;
use axum::middleware::AddExtension;
use axum_server::accept::{Accept, DefaultAcceptor};
use axum_server::tls_rustls::{RustlsAcceptor, RustlsConfig};
use futures::future::BoxFuture;
use rustls::ServerConfig;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_rustls::server::TlsStream;
use tower::Layer;
use tracing::debug;

/// Completes the TLS handshake, then tags every request on the connection
/// with the [`ClientIdentity`] read from the client's leaf certificate.
#[derive(Clone)]
pub struct ClientIdentityAcceptor {
    inner: RustlsAcceptor<DefaultAcceptor>,
}

impl ClientIdentityAcceptor {
    /// Creates an acceptor for the given server configuration.
    #[must_use]
    pub fn new(config: Arc<ServerConfig>) -> Self {
        Self {
            inner: RustlsAcceptor::new(RustlsConfig::from_config(config)),
        }
    }
}

impl<I, S> Accept<I, S> for ClientIdentityAcceptor
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    S: Send + 'static,
{
    type Stream = TlsStream<I>;
    type Service = AddExtension<S, ClientIdentity>;
    type Future = BoxFuture<'static, io::Result<(Self::Stream, Self::Service)>>;

    fn accept(&self, stream: I, service: S) -> Self::Future {
        let inner = self.inner.clone();

        Box::pin(async move {
            let (stream, service) = inner.accept(stream, service).await?;

            let identity = stream
                .get_ref()
                .1
                .peer_certificates()
                .and_then(<[_]>::first)
                .and_then(|cert| ClientIdentity::from_der(cert))
                .unwrap_or_default();

            debug!(common_name = %identity.common_name, "accepted tls connection");

            Ok((stream, Extension(identity).layer(service)))
        })
    }
}
