use crate::error::{Error, Result};
use crate::result::{ApiResponse, QueryResult, format_timestamp};

use std::sync::Arc;
use std::time::Duration;

use indicator_domain::{Sample, Series};
use indicator_uaa::TokenSource;
use reqwest::{Client, header};
use tracing::debug;

/// Deadline applied to every query.
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(2);

/// Issues PromQL queries with an `Authorization` header from a token source.
#[derive(Clone)]
pub struct PromqlClient {
    base_url: String,
    http_client: Client,
    timeout: Duration,
    token_source: Arc<dyn TokenSource>,
}

impl PromqlClient {
    /// Creates a client for the store at `base_url`.
    pub fn new(http_client: Client, base_url: &str, token_source: Arc<dyn TokenSource>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client,
            timeout: QUERY_TIMEOUT,
            token_source,
        }
    }

    /// Overrides the per-query deadline.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Runs an instant query, optionally at a fixed time.
    ///
    /// # Errors
    ///
    /// Returns an error if no token can be acquired, the request fails or
    /// times out, or the store reports a query error.
    pub async fn query(&self, expr: &str, time_ns: Option<i64>) -> Result<QueryResult> {
        let mut params = vec![("query", expr.to_string())];
        if let Some(time_ns) = time_ns {
            params.push(("time", format_timestamp(time_ns)));
        }

        self.get("/api/v1/query", &params).await
    }

    /// Runs an instant query and requires a vector result.
    ///
    /// # Errors
    ///
    /// As [`Self::query`], plus [`Error::NotVector`] for other result shapes.
    pub async fn query_vector(&self, expr: &str) -> Result<Vec<Sample>> {
        self.query(expr, None).await?.as_vector()
    }

    /// Runs a range query.
    ///
    /// # Errors
    ///
    /// Returns an error if no token can be acquired, the request fails or
    /// times out, or the store reports a query error.
    pub async fn query_range(
        &self,
        expr: &str,
        start_ns: i64,
        end_ns: i64,
        step: Duration,
    ) -> Result<QueryResult> {
        let params = [
            ("query", expr.to_string()),
            ("start", format_timestamp(start_ns)),
            ("end", format_timestamp(end_ns)),
            ("step", format!("{}s", step.as_secs().max(1))),
        ];

        self.get("/api/v1/query_range", &params).await
    }

    /// Runs a range query and requires a matrix result.
    ///
    /// # Errors
    ///
    /// As [`Self::query_range`], plus [`Error::NotMatrix`] for other shapes.
    pub async fn query_matrix(
        &self,
        expr: &str,
        start_ns: i64,
        end_ns: i64,
        step: Duration,
    ) -> Result<Vec<Series>> {
        self.query_range(expr, start_ns, end_ns, step)
            .await?
            .as_matrix()
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<QueryResult> {
        let authorization = self.token_source.acquire().await?;
        let url = format!("{}{path}", self.base_url);

        debug!(%url, ?params, "querying metrics store");

        let response = self
            .http_client
            .get(&url)
            .query(params)
            .header(header::AUTHORIZATION, authorization)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        match serde_json::from_slice::<ApiResponse>(&body) {
            Ok(api_response) => api_response.into_result(),
            Err(_) if !status.is_success() => Err(Error::UnexpectedStatus {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
            Err(e) => Err(Error::Decode(e)),
        }
    }
}
