use crate::base_url;
use crate::error::Error;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use indicator_http::{TlsOptions, mtls_client, public_server_config, server_config};
use indicator_promql::PromqlClient;
use indicator_uaa::{CheckTokenClient, StaticToken, TokenFetcher, TokenFetcherOptions, TokenSource};
use rustls::ServerConfig;
use url::Url;

/// TLS material. Either all three paths are given or none.
#[derive(Args, Clone, Debug)]
pub struct TlsArgs {
    /// Certificate chain presented by this process
    #[arg(long, env = "INDICATOR_TLS_PEM_PATH")]
    pub tls_pem_path: Option<PathBuf>,

    /// Private key for the certificate chain
    #[arg(long, env = "INDICATOR_TLS_KEY_PATH")]
    pub tls_key_path: Option<PathBuf>,

    /// CA bundle used to verify peers
    #[arg(long, env = "INDICATOR_TLS_ROOT_CA_PEM")]
    pub tls_root_ca_pem: Option<PathBuf>,

    /// Name expected on certificates of servers this process dials
    #[arg(long, env = "INDICATOR_TLS_SERVER_CN")]
    pub tls_server_cn: Option<String>,
}

impl TlsArgs {
    /// The configured material, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if only some of the paths are set.
    pub fn options(&self) -> Result<Option<TlsOptions>, Error> {
        match (&self.tls_pem_path, &self.tls_key_path, &self.tls_root_ca_pem) {
            (Some(cert_path), Some(key_path), Some(root_ca_path)) => Ok(Some(TlsOptions {
                cert_path: cert_path.clone(),
                key_path: key_path.clone(),
                root_ca_path: root_ca_path.clone(),
            })),
            (None, None, None) => Ok(None),
            _ => Err(Error::Config(
                "--tls-pem-path, --tls-key-path and --tls-root-ca-pem must be set together"
                    .to_string(),
            )),
        }
    }

    /// Server configuration requiring client certificates.
    ///
    /// # Errors
    ///
    /// Returns an error if the material is incomplete or invalid.
    pub fn server_config(&self) -> Result<Option<Arc<ServerConfig>>, Error> {
        Ok(self.options()?.map(|o| server_config(&o)).transpose()?)
    }

    /// Server configuration that does not ask for client certificates. Only
    /// the certificate and key are required.
    ///
    /// # Errors
    ///
    /// Returns an error if the certificate or key is missing or invalid.
    pub fn public_server_config(&self) -> Result<Option<Arc<ServerConfig>>, Error> {
        match (&self.tls_pem_path, &self.tls_key_path) {
            (Some(cert_path), Some(key_path)) => {
                Ok(Some(public_server_config(cert_path, key_path)?))
            }
            (None, None) => Ok(None),
            _ => Err(Error::Config(
                "--tls-pem-path and --tls-key-path must be set together".to_string(),
            )),
        }
    }

    /// HTTP client for dialing registries and peers: mutual TLS when
    /// material is configured, plain otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the material is incomplete or invalid.
    pub fn client(&self, timeout: Duration) -> Result<reqwest::Client, Error> {
        match self.options()? {
            Some(options) => Ok(mtls_client(
                &options,
                self.tls_server_cn.as_deref(),
                timeout,
            )?),
            None => Ok(reqwest::Client::builder().timeout(timeout).build()?),
        }
    }
}

/// UAA coordinates and this process's client credentials.
#[derive(Args, Clone, Debug)]
pub struct UaaArgs {
    /// UAA base URL
    #[arg(long, env = "INDICATOR_UAA_URL")]
    pub uaa_url: Option<Url>,

    /// OAuth client id
    #[arg(long, env = "INDICATOR_UAA_CLIENT_ID", default_value = "")]
    pub uaa_client_id: String,

    /// OAuth client secret
    #[arg(
        long,
        env = "INDICATOR_UAA_CLIENT_SECRET",
        default_value = "",
        hide_env_values = true
    )]
    pub uaa_client_secret: String,

    /// Seconds a fetched token is reused before refreshing
    #[arg(long, env = "INDICATOR_TOKEN_LIFETIME_SECS", default_value_t = 3600)]
    pub token_lifetime_secs: u64,
}

impl UaaArgs {
    fn require_url(&self) -> Result<String, Error> {
        self.uaa_url
            .as_ref()
            .map(base_url)
            .ok_or_else(|| Error::Config("--uaa-url is required".to_string()))
    }

    /// Client for UAA's `check_token` endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if no UAA URL is configured.
    pub fn check_token_client(&self, http_client: reqwest::Client) -> Result<CheckTokenClient, Error> {
        Ok(CheckTokenClient::new(
            http_client,
            &self.require_url()?,
            self.uaa_client_id.clone(),
            self.uaa_client_secret.clone(),
        ))
    }

    /// Caching client-credentials token fetcher.
    ///
    /// # Errors
    ///
    /// Returns an error if no UAA URL is configured.
    pub fn token_fetcher(&self, http_client: reqwest::Client) -> Result<TokenFetcher, Error> {
        Ok(TokenFetcher::new(TokenFetcherOptions {
            client_id: self.uaa_client_id.clone(),
            client_secret: self.uaa_client_secret.clone(),
            http_client,
            token_lifetime: Duration::from_secs(self.token_lifetime_secs),
            uaa_url: self.require_url()?,
        }))
    }
}

/// Metrics store coordinates and how to authenticate to it.
#[derive(Args, Clone, Debug)]
pub struct PromqlArgs {
    /// Base URL of the PromQL-compatible store
    #[arg(long, env = "INDICATOR_PROMQL_URL")]
    pub promql_url: Url,

    /// Static `Authorization` header value, used when no UAA is configured
    #[arg(long, env = "INDICATOR_PROMQL_TOKEN", hide_env_values = true)]
    pub promql_token: Option<String>,

    /// Deadline for each query, in milliseconds
    #[arg(long, env = "INDICATOR_QUERY_TIMEOUT_MS", default_value_t = 2000)]
    pub query_timeout_ms: u64,

    #[command(flatten)]
    #[allow(missing_docs)]
    pub uaa: UaaArgs,
}

impl PromqlArgs {
    /// A query client authenticated through UAA when configured, or with the
    /// static token otherwise.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn client(&self) -> Result<PromqlClient, Error> {
        let http_client = reqwest::Client::builder().build()?;

        let token_source: Arc<dyn TokenSource> = if self.uaa.uaa_url.is_some() {
            Arc::new(self.uaa.token_fetcher(http_client.clone())?)
        } else {
            Arc::new(StaticToken(self.promql_token.clone().unwrap_or_default()))
        };

        Ok(
            PromqlClient::new(http_client, &base_url(&self.promql_url), token_source)
                .with_timeout(Duration::from_millis(self.query_timeout_ms)),
        )
    }
}
