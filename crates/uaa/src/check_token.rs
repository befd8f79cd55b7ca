use crate::endpoint;
use crate::error::{Error, Result};

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

/// The decoded contents of an opaque token.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
pub struct TokenInfo {
    /// Client the token was issued to.
    #[serde(default)]
    pub client_id: Option<String>,

    /// Scopes granted by the token.
    #[serde(default)]
    pub scope: Vec<String>,

    /// User the token was issued for, if any.
    #[serde(default)]
    pub user_id: Option<String>,
}

impl TokenInfo {
    /// Returns whether the token carries at least one of `required`.
    #[must_use]
    pub fn has_any_scope<S: AsRef<str>>(&self, required: &[S]) -> bool {
        required
            .iter()
            .any(|r| self.scope.iter().any(|s| s == r.as_ref()))
    }
}

/// Calls UAA's `check_token` endpoint using the caller's own client credentials.
#[derive(Clone, Debug)]
pub struct CheckTokenClient {
    check_token_url: String,
    client_id: String,
    client_secret: String,
    http_client: Client,
}

impl CheckTokenClient {
    /// Creates a new `CheckTokenClient`.
    pub fn new(
        http_client: Client,
        uaa_url: &str,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            check_token_url: endpoint(uaa_url, "/check_token"),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            http_client,
        }
    }

    /// Resolves an opaque token into its scopes.
    ///
    /// # Errors
    ///
    /// Returns an error if UAA is unreachable, rejects the token, or answers
    /// with a body that is not token info JSON.
    pub async fn check(&self, token: &str) -> Result<TokenInfo> {
        debug!(url = %self.check_token_url, "checking token");

        let response = self
            .http_client
            .post(&self.check_token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("token", token.trim())])
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UnexpectedStatus { status, body });
        }

        Ok(response.json().await?)
    }
}
