use crate::endpoint;
use crate::error::{Error, Result};

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Source of the current time for expiry checks.
pub type Clock = Arc<dyn Fn() -> Instant + Send + Sync>;

/// Anything that can produce an `Authorization` header value.
#[async_trait]
pub trait TokenSource: Send + Sync + 'static {
    /// Returns a header value such as `bearer abc123`.
    async fn acquire(&self) -> Result<String>;
}

/// A fixed header value. Useful for stores that take a static API token.
#[derive(Clone, Debug)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenSource for StaticToken {
    async fn acquire(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

/// Options for [`TokenFetcher`].
#[derive(Clone, Debug)]
pub struct TokenFetcherOptions {
    /// OAuth client id.
    pub client_id: String,

    /// OAuth client secret.
    pub client_secret: String,

    /// HTTP client used for token requests.
    pub http_client: Client,

    /// How long a fetched token is considered valid.
    pub token_lifetime: Duration,

    /// Base URL of the UAA server.
    pub uaa_url: String,
}

#[derive(Clone, Debug)]
struct CachedToken {
    expires_at: Instant,
    header_value: String,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    token_type: String,
}

/// Fetches client-credentials tokens and caches them for a fixed lifetime.
///
/// The cache lock is held across a refresh, so concurrent callers that find
/// the token expired queue behind a single upstream request and then observe
/// the freshly cached value.
pub struct TokenFetcher {
    cached: Mutex<Option<CachedToken>>,
    client_id: String,
    client_secret: String,
    clock: Clock,
    http_client: Client,
    token_lifetime: Duration,
    token_url: String,
}

impl TokenFetcher {
    /// Creates a fetcher using the system monotonic clock.
    #[must_use]
    pub fn new(options: TokenFetcherOptions) -> Self {
        Self::with_clock(options, Arc::new(Instant::now))
    }

    /// Creates a fetcher with an injected clock.
    #[must_use]
    pub fn with_clock(
        TokenFetcherOptions {
            client_id,
            client_secret,
            http_client,
            token_lifetime,
            uaa_url,
        }: TokenFetcherOptions,
        clock: Clock,
    ) -> Self {
        Self {
            cached: Mutex::new(None),
            client_id,
            client_secret,
            clock,
            http_client,
            token_lifetime,
            token_url: endpoint(&uaa_url, "/oauth/token"),
        }
    }

    async fn fetch(&self) -> Result<String> {
        debug!(url = %self.token_url, client_id = %self.client_id, "fetching uaa token");

        let response = self
            .http_client
            .post(&self.token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "uaa token request rejected");
            return Err(Error::UnexpectedStatus { status, body });
        }

        let token: TokenResponse = response.json().await?;

        Ok(format!("{} {}", token.token_type, token.access_token))
    }
}

#[async_trait]
impl TokenSource for TokenFetcher {
    async fn acquire(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if (self.clock)() < token.expires_at {
                return Ok(token.header_value.clone());
            }
        }

        let header_value = self.fetch().await?;
        let expires_at = (self.clock)()
            .checked_add(self.token_lifetime)
            .ok_or(Error::TokenLifetime(self.token_lifetime))?;
        *cached = Some(CachedToken {
            expires_at,
            header_value: header_value.clone(),
        });

        Ok(header_value)
    }
}
