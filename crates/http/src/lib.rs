//! HTTP plumbing shared by the registry, the registry proxy and the auth
//! gateway: mutual-TLS configuration, an mTLS server that exposes the client
//! certificate's common name to handlers, and a request forwarder.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod acceptor;
mod error;
mod forwarder;
mod identity;
mod server;
mod tls;

pub use acceptor::ClientIdentityAcceptor;
pub use error::Error;
pub use forwarder::*;
pub use identity::ClientIdentity;
pub use server::TlsHttpServer;
pub use tls::*;
