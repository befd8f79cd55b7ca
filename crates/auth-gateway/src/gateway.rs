use crate::error::Error;

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::Router;
use axum::body::Body;
use axum::extract::Query;
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Request, Response, Uri, header};
use axum::response::IntoResponse;
use futures::future::BoxFuture;
use indicator_http::HttpForwarder;
use indicator_uaa::CheckTokenClient;
use serde::Deserialize;
use tower::Service;
use tracing::debug;

/// Options for creating a new [`AuthGateway`].
pub struct AuthGatewayOptions {
    /// Forwards admitted requests to the backend registry.
    pub backend: HttpForwarder,

    /// Resolves tokens into scopes.
    pub check_token: CheckTokenClient,

    /// A token must carry at least one of these.
    pub required_scopes: Vec<String>,
}

/// Admits `GET` requests whose token carries a required scope and forwards
/// them to the backend.
///
/// The token is read from an `Authorization: bearer <token>` header, falling
/// back to a `token` query parameter. Other methods get `403`, and failed
/// validation gets an empty `401`; neither reaches the backend.
#[derive(Clone)]
pub struct AuthGateway {
    backend: HttpForwarder,
    check_token: CheckTokenClient,
    required_scopes: Arc<[String]>,
}

#[derive(Deserialize)]
struct TokenParams {
    token: Option<String>,
}

impl AuthGateway {
    /// Creates a new instance of `AuthGateway`.
    #[must_use]
    pub fn new(
        AuthGatewayOptions {
            backend,
            check_token,
            required_scopes,
        }: AuthGatewayOptions,
    ) -> Self {
        Self {
            backend,
            check_token,
            required_scopes: required_scopes.into(),
        }
    }

    /// A router that sends every request through the gateway.
    pub fn into_router(self) -> Router {
        Router::new().fallback_service(self)
    }

    /// Handles one request.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        let (parts, body) = request.into_parts();

        match self.authorize(&parts).await {
            Ok(()) => self.backend.forward(Request::from_parts(parts, body)).await,
            Err(e) => e.into_response(),
        }
    }

    async fn authorize(&self, parts: &Parts) -> Result<(), Error> {
        if parts.method != Method::GET {
            return Err(Error::MethodNotAllowed(parts.method.clone()));
        }

        let token = bearer_token(&parts.headers, &parts.uri).ok_or(Error::MissingToken)?;
        let info = self.check_token.check(&token).await?;

        if !info.has_any_scope(&self.required_scopes[..]) {
            return Err(Error::InsufficientScope);
        }

        debug!(client_id = ?info.client_id, user_id = ?info.user_id, "admitted request");

        Ok(())
    }
}

fn bearer_token(headers: &HeaderMap, uri: &Uri) -> Option<String> {
    let from_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().split_once(char::is_whitespace))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim().to_string());

    from_header
        .or_else(|| {
            Query::<TokenParams>::try_from_uri(uri)
                .ok()
                .and_then(|Query(params)| params.token)
        })
        .filter(|token| !token.trim().is_empty())
}

impl Service<Request<Body>> for AuthGateway {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let gateway = self.clone();
        Box::pin(async move { Ok(gateway.handle(request).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(authorization: Option<&str>, uri: &str) -> Option<String> {
        let mut headers = HeaderMap::new();
        if let Some(value) = authorization {
            headers.insert(header::AUTHORIZATION, value.parse().unwrap());
        }

        bearer_token(&headers, &uri.parse().unwrap())
    }

    #[test]
    fn test_bearer_token_locations() {
        assert_eq!(token(Some("bearer abc-123"), "/"), Some("abc-123".to_string()));
        assert_eq!(token(Some("Bearer  abc-123 "), "/"), Some("abc-123".to_string()));
        assert_eq!(token(Some("BEARER abc"), "/"), Some("abc".to_string()));
        assert_eq!(token(None, "/v1/indicator-documents?token=xyz"), Some("xyz".to_string()));
        assert_eq!(
            token(Some("bearer from-header"), "/?token=from-query"),
            Some("from-header".to_string())
        );
    }

    #[test]
    fn test_bearer_token_rejects_other_schemes() {
        assert_eq!(token(Some("Basic dXNlcjpwYXNz"), "/"), None);
        assert_eq!(token(Some("bearer"), "/"), None);
        assert_eq!(token(Some("Basic dXNlcjpwYXNz"), "/?token=q"), Some("q".to_string()));
        assert_eq!(token(None, "/?token="), None);
        assert_eq!(token(None, "/"), None);
    }
}
