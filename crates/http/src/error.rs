use thiserror::Error;

/// Errors that can occur in this crate.
#[derive(Debug, Error)]
pub enum Error {
    /// The server has already been started.
    #[error("the server has already been started")]
    AlreadyStarted,

    /// Failed to build an HTTP client.
    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    /// Failed to read TLS material.
    #[error("{0}: {1}")]
    Io(String, #[source] std::io::Error),

    /// A PEM file held no private key.
    #[error("no private key found in {0}")]
    NoPrivateKey(String),

    /// A PEM file held no certificates.
    #[error("no certificates found in {0}")]
    NoCertificates(String),

    /// The configured server name is not a valid DNS name or IP address.
    #[error("invalid server name: {0}")]
    ServerName(String),

    /// rustls rejected the configuration.
    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),

    /// The certificate verifier could not be built.
    #[error("certificate verifier error: {0}")]
    Verifier(String),
}
