use crate::error::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use rustls::client::WebPkiServerVerifier;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{CryptoProvider, aws_lc_rs};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, ServerName, UnixTime};
use rustls::server::WebPkiClientVerifier;
use rustls::version::{TLS12, TLS13};
use rustls::{ClientConfig, DigitallySignedStruct, RootCertStore, ServerConfig, SignatureScheme};

/// Paths to the PEM material a node presents and trusts.
#[derive(Clone, Debug)]
pub struct TlsOptions {
    /// Leaf certificate chain.
    pub cert_path: PathBuf,

    /// Private key for the leaf certificate.
    pub key_path: PathBuf,

    /// CA bundle used to verify peers.
    pub root_ca_path: PathBuf,
}

/// ECDHE-only suites, AEAD ciphers only.
#[must_use]
pub fn cipher_suites() -> Vec<rustls::SupportedCipherSuite> {
    use aws_lc_rs::cipher_suite::{
        TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256, TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
        TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256, TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384, TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
        TLS13_AES_128_GCM_SHA256, TLS13_AES_256_GCM_SHA384, TLS13_CHACHA20_POLY1305_SHA256,
    };

    vec![
        TLS13_AES_128_GCM_SHA256,
        TLS13_AES_256_GCM_SHA384,
        TLS13_CHACHA20_POLY1305_SHA256,
        TLS_ECDHE_ECDSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_ECDSA_WITH_AES_256_GCM_SHA384,
        TLS_ECDHE_ECDSA_WITH_CHACHA20_POLY1305_SHA256,
        TLS_ECDHE_RSA_WITH_AES_128_GCM_SHA256,
        TLS_ECDHE_RSA_WITH_AES_256_GCM_SHA384,
        TLS_ECDHE_RSA_WITH_CHACHA20_POLY1305_SHA256,
    ]
}

fn crypto_provider() -> Arc<CryptoProvider> {
    Arc::new(CryptoProvider {
        cipher_suites: cipher_suites(),
        ..aws_lc_rs::default_provider()
    })
}

fn open(path: &Path) -> Result<BufReader<File>, Error> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| Error::Io(format!("failed to open {}", path.display()), e))
}

/// Reads every certificate in a PEM file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds no certificates.
pub fn load_certificates(path: &Path) -> Result<Vec<CertificateDer<'static>>, Error> {
    let certs = rustls_pemfile::certs(&mut open(path)?)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| Error::Io(format!("failed to parse {}", path.display()), e))?;

    if certs.is_empty() {
        return Err(Error::NoCertificates(path.display().to_string()));
    }

    Ok(certs)
}

/// Reads the first private key in a PEM file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or holds no key.
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>, Error> {
    rustls_pemfile::private_key(&mut open(path)?)
        .map_err(|e| Error::Io(format!("failed to parse {}", path.display()), e))?
        .ok_or_else(|| Error::NoPrivateKey(path.display().to_string()))
}

/// Builds a root store from a PEM CA bundle.
///
/// # Errors
///
/// Returns an error if the bundle cannot be read or a certificate is invalid.
pub fn load_root_store(path: &Path) -> Result<RootCertStore, Error> {
    let mut roots = RootCertStore::empty();
    for cert in load_certificates(path)? {
        roots.add(cert)?;
    }

    Ok(roots)
}

/// Server configuration that requires and verifies client certificates.
///
/// # Errors
///
/// Returns an error if any PEM file is unreadable or rustls rejects the
/// certificate/key pair.
pub fn server_config(options: &TlsOptions) -> Result<Arc<ServerConfig>, Error> {
    let provider = crypto_provider();
    let roots = Arc::new(load_root_store(&options.root_ca_path)?);

    let verifier = WebPkiClientVerifier::builder_with_provider(roots, provider.clone())
        .build()
        .map_err(|e| Error::Verifier(e.to_string()))?;

    let mut config = ServerConfig::builder_with_provider(provider)
        .with_protocol_versions(&[&TLS12, &TLS13])?
        .with_client_cert_verifier(verifier)
        .with_single_cert(
            load_certificates(&options.cert_path)?,
            load_private_key(&options.key_path)?,
        )?;

    config.ignore_client_order = true;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

/// Server configuration for endpoints that authenticate callers some other
/// way. Same protocol and cipher policy as [`server_config`], without client
/// certificates.
///
/// # Errors
///
/// Returns an error if either PEM file is unreadable or rustls rejects the
/// certificate/key pair.
pub fn public_server_config(cert_path: &Path, key_path: &Path) -> Result<Arc<ServerConfig>, Error> {
    let mut config = ServerConfig::builder_with_provider(crypto_provider())
        .with_protocol_versions(&[&TLS12, &TLS13])?
        .with_no_client_auth()
        .with_single_cert(load_certificates(cert_path)?, load_private_key(key_path)?)?;

    config.ignore_client_order = true;
    config.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    Ok(Arc::new(config))
}

/// Client configuration presenting this node's certificate.
///
/// When `server_name` is set, peer certificates are verified against that
/// name instead of the host in the request URL.
///
/// # Errors
///
/// Returns an error if any PEM file is unreadable, the server name is
/// invalid, or rustls rejects the certificate/key pair.
pub fn client_config(options: &TlsOptions, server_name: Option<&str>) -> Result<ClientConfig, Error> {
    let provider = crypto_provider();
    let roots = Arc::new(load_root_store(&options.root_ca_path)?);

    let builder = ClientConfig::builder_with_provider(provider.clone())
        .with_protocol_versions(&[&TLS12, &TLS13])?;

    let builder = match server_name {
        Some(name) => builder
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(PinnedNameVerifier::new(
                roots, provider, name,
            )?)),
        None => builder.with_root_certificates(roots),
    };

    Ok(builder.with_client_auth_cert(
        load_certificates(&options.cert_path)?,
        load_private_key(&options.key_path)?,
    )?)
}

/// An HTTP client that authenticates with this node's certificate.
///
/// # Errors
///
/// Returns an error if the TLS configuration cannot be built.
pub fn mtls_client(
    options: &TlsOptions,
    server_name: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, Error> {
    Ok(reqwest::Client::builder()
        .use_preconfigured_tls(client_config(options, server_name)?)
        .timeout(timeout)
        .build()?)
}

/// Standard WebPKI verification against a fixed server name.
#[derive(Debug)]
struct PinnedNameVerifier {
    inner: Arc<WebPkiServerVerifier>,
    server_name: ServerName<'static>,
}

impl PinnedNameVerifier {
    fn new(
        roots: Arc<RootCertStore>,
        provider: Arc<CryptoProvider>,
        server_name: &str,
    ) -> Result<Self, Error> {
        let inner = WebPkiServerVerifier::builder_with_provider(roots, provider)
            .build()
            .map_err(|e| Error::Verifier(e.to_string()))?;
        let server_name = ServerName::try_from(server_name.to_string())
            .map_err(|_| Error::ServerName(server_name.to_string()))?;

        Ok(Self { inner, server_name })
    }
}

impl ServerCertVerifier for PinnedNameVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        self.inner.verify_server_cert(
            end_entity,
            intermediates,
            &self.server_name,
            ocsp_response,
            now,
        )
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
