use std::convert::Infallible;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Request, Response, StatusCode, header};
use axum::response::IntoResponse;
use futures::future::BoxFuture;
use reqwest::Client;
use tower::Service;
use tracing::{debug, warn};

/// Largest request body the forwarder will buffer.
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Replays requests against another server, preserving method, path, query,
/// headers and body, and relays the upstream response.
///
/// Transport failures become `502 Bad Gateway`; the service never errors.
#[derive(Clone, Debug)]
pub struct HttpForwarder {
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl HttpForwarder {
    /// Creates a forwarder targeting `base_url` (scheme, host and optional
    /// path prefix).
    pub fn new(client: Client, base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeout,
        }
    }

    /// The server this forwarder targets.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Forwards one request.
    pub async fn forward(&self, request: Request<Body>) -> Response<Body> {
        let (parts, body) = request.into_parts();

        let path = parts
            .uri
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        let url = format!("{}{path}", self.base_url);

        let body = match to_bytes(body, MAX_BODY_BYTES).await {
            Ok(body) => body,
            Err(e) => {
                debug!(error = %e, "failed to read request body");
                return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
            }
        };

        debug!(method = %parts.method, %url, "forwarding request");

        let result = self
            .client
            .request(parts.method, &url)
            .headers(parts.headers)
            .body(body)
            .timeout(self.timeout)
            .send()
            .await;

        let upstream = match result {
            Ok(upstream) => upstream,
            Err(e) => {
                warn!(%url, error = %e, "forwarded request failed");
                return StatusCode::BAD_GATEWAY.into_response();
            }
        };

        let status = upstream.status();
        let headers = strip_hop_by_hop(upstream.headers().clone());

        match upstream.bytes().await {
            Ok(bytes) => {
                let mut response = Response::new(Body::from(bytes));
                *response.status_mut() = status;
                *response.headers_mut() = headers;
                response
            }
            Err(e) => {
                warn!(%url, error = %e, "failed to read forwarded response");
                StatusCode::BAD_GATEWAY.into_response()
            }
        }
    }
}

fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    for name in [
        header::CONNECTION,
        header::CONTENT_LENGTH,
        header::TRANSFER_ENCODING,
    ] {
        headers.remove(name);
    }
    headers
}

impl Service<Request<Body>> for HttpForwarder {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let forwarder = self.clone();
        Box::pin(async move { Ok(forwarder.forward(request).await) })
    }
}
