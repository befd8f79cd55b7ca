use crate::error::Error;

use std::convert::Infallible;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::request::Parts;
use axum::http::{Method, Request, Response, Uri};
use axum::response::IntoResponse;
use bytes::Bytes;
use futures::future::{BoxFuture, join_all};
use indicator_http::MAX_BODY_BYTES;
use tower::util::BoxCloneSyncService;
use tower::{Service, ServiceExt};
use tracing::{debug, warn};

/// Path prefix peers use to deliver writes that were already broadcast.
pub const BACKEND_PREFIX: &str = "/backend";

/// How long a single peer delivery may take.
pub const DEFAULT_PEER_TIMEOUT: Duration = Duration::from_secs(10);

/// A type-erased handler the proxy dispatches to: a local registry router,
/// or an [`indicator_http::HttpForwarder`] pointed at a registry or peer.
pub type HttpService = BoxCloneSyncService<Request<Body>, Response<Body>, Infallible>;

/// A member of the mesh that receives broadcast writes.
#[derive(Clone)]
pub struct Peer {
    /// Name used in logs.
    pub name: String,

    /// Handler reaching the peer's proxy.
    pub service: HttpService,
}

impl Peer {
    /// Creates a peer from any cloneable infallible handler.
    pub fn new<S>(name: impl Into<String>, service: S) -> Self
    where
        S: Service<Request<Body>, Response = Response<Body>, Error = Infallible>
            + Clone
            + Send
            + Sync
            + 'static,
        S::Future: Send + 'static,
    {
        Self {
            name: name.into(),
            service: BoxCloneSyncService::new(service),
        }
    }
}

/// Options for creating a new [`RegistryProxy`].
pub struct RegistryProxyOptions {
    /// Handler for the registry this proxy fronts.
    pub local: HttpService,

    /// Upper bound on each peer delivery.
    pub peer_timeout: Duration,

    /// Every other proxy in the mesh.
    pub peers: Vec<Peer>,
}

/// Routes reads and peer deliveries to the local registry, and writes to the
/// local registry followed by every peer.
#[derive(Clone)]
pub struct RegistryProxy {
    local: HttpService,
    peer_timeout: Duration,
    peers: Arc<[Peer]>,
}

impl RegistryProxy {
    /// Creates a new instance of `RegistryProxy`.
    #[must_use]
    pub fn new(
        RegistryProxyOptions {
            local,
            peer_timeout,
            peers,
        }: RegistryProxyOptions,
    ) -> Self {
        Self {
            local,
            peer_timeout,
            peers: peers.into(),
        }
    }

    /// A router that sends every request through the proxy.
    pub fn into_router(self) -> Router {
        Router::new().fallback_service(self)
    }

    /// Handles one request.
    ///
    /// - `/backend/...` is stripped of the prefix and served locally only.
    /// - Anything but `POST` is served locally only.
    /// - `POST` is served locally, then delivered to every peer under
    ///   `/backend` concurrently. The caller gets the local response once all
    ///   peers have answered or timed out.
    pub async fn handle(&self, request: Request<Body>) -> Response<Body> {
        self.route(request)
            .await
            .unwrap_or_else(IntoResponse::into_response)
    }

    async fn route(&self, request: Request<Body>) -> Result<Response<Body>, Error> {
        if let Some(path) = backend_path(request.uri()) {
            let (mut parts, body) = request.into_parts();
            parts.uri = Uri::try_from(path).map_err(axum::http::Error::from)?;

            return Ok(self.serve_local(Request::from_parts(parts, body)).await);
        }

        if request.method() != Method::POST {
            return Ok(self.serve_local(request).await);
        }

        self.broadcast(request).await
    }

    async fn broadcast(&self, request: Request<Body>) -> Result<Response<Body>, Error> {
        let (parts, body) = request.into_parts();
        let body = to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(Error::Body)?;

        let mut local = copy_request(&parts, parts.uri.clone(), body.clone())?;
        *local.extensions_mut() = parts.extensions.clone();

        let path = parts.uri.path_and_query().map_or("/", |pq| pq.as_str());
        let peer_uri = Uri::try_from(format!("{BACKEND_PREFIX}{path}"))
            .map_err(axum::http::Error::from)?;

        let mut deliveries = Vec::with_capacity(self.peers.len());
        for peer in self.peers.iter() {
            deliveries.push((
                peer.clone(),
                copy_request(&parts, peer_uri.clone(), body.clone())?,
            ));
        }

        let response = self.serve_local(local).await;

        join_all(
            deliveries
                .into_iter()
                .map(|(peer, request)| deliver(peer, request, self.peer_timeout)),
        )
        .await;

        Ok(response)
    }

    async fn serve_local(&self, request: Request<Body>) -> Response<Body> {
        self.local
            .clone()
            .oneshot(request)
            .await
            .unwrap_or_else(|never| match never {})
    }
}

async fn deliver(peer: Peer, request: Request<Body>, timeout: Duration) {
    let delivery = peer.service.oneshot(request);

    match tokio::time::timeout(timeout, delivery).await {
        Ok(response) => {
            let status = response.unwrap_or_else(|never| match never {}).status();
            if status.is_success() {
                debug!(peer = %peer.name, %status, "delivered broadcast");
            } else {
                warn!(peer = %peer.name, %status, "peer rejected broadcast");
            }
        }
        Err(_) => warn!(peer = %peer.name, ?timeout, "peer broadcast timed out"),
    }
}

fn backend_path(uri: &Uri) -> Option<String> {
    let rest = uri.path().strip_prefix(BACKEND_PREFIX)?;
    if !rest.starts_with('/') {
        return None;
    }

    Some(match uri.query() {
        Some(query) => format!("{rest}?{query}"),
        None => rest.to_string(),
    })
}

fn copy_request(parts: &Parts, uri: Uri, body: Bytes) -> Result<Request<Body>, Error> {
    let mut request = Request::builder()
        .method(parts.method.clone())
        .uri(uri)
        .version(parts.version)
        .body(Body::from(body))?;
    *request.headers_mut() = parts.headers.clone();

    Ok(request)
}

impl Service<Request<Body>> for RegistryProxy {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let proxy = self.clone();
        Box::pin(async move { Ok(proxy.handle(request).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::StatusCode;
    use parking_lot::Mutex;

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<(Method, String, Bytes)>>>);

    impl Recorder {
        fn router(&self, status: StatusCode) -> Router {
            let recorder = self.clone();
            Router::new().fallback(move |request: Request<Body>| {
                let recorder = recorder.clone();
                async move {
                    let (parts, body) = request.into_parts();
                    let body = to_bytes(body, usize::MAX).await.unwrap();
                    let path = parts.uri.path_and_query().unwrap().to_string();
                    recorder.0.lock().push((parts.method, path, body));
                    (status, "recorded")
                }
            })
        }

        fn paths(&self) -> Vec<String> {
            self.0.lock().iter().map(|(_, path, _)| path.clone()).collect()
        }
    }

    fn proxy(local: &Recorder, peers: Vec<Peer>) -> RegistryProxy {
        RegistryProxy::new(RegistryProxyOptions {
            local: BoxCloneSyncService::new(local.router(StatusCode::OK)),
            peer_timeout: Duration::from_millis(200),
            peers,
        })
    }

    #[test]
    fn test_backend_path() {
        for (uri, expected) in [
            ("/backend/v1/register", Some("/v1/register")),
            ("/backend/v1/register?deployment=cf", Some("/v1/register?deployment=cf")),
            ("/backend/", Some("/")),
            ("/backend", None),
            ("/backendx/v1/register", None),
            ("/v1/register", None),
        ] {
            let uri: Uri = uri.parse().unwrap();
            assert_eq!(backend_path(&uri).as_deref(), expected, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_post_goes_to_local_then_every_peer() {
        let local = Recorder::default();
        let peer_a = Recorder::default();
        let peer_b = Recorder::default();
        let proxy = proxy(
            &local,
            vec![
                Peer::new("a", peer_a.router(StatusCode::OK)),
                Peer::new("b", peer_b.router(StatusCode::INTERNAL_SERVER_ERROR)),
            ],
        );

        let response = proxy
            .handle(
                Request::post("/v1/register?deployment=cf")
                    .header("x-custom", "kept")
                    .body(Body::from("document"))
                    .unwrap(),
            )
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(local.paths(), vec!["/v1/register?deployment=cf"]);
        for peer in [&peer_a, &peer_b] {
            let recorded = peer.0.lock().clone();
            assert_eq!(recorded.len(), 1);
            assert_eq!(recorded[0].0, Method::POST);
            assert_eq!(recorded[0].1, "/backend/v1/register?deployment=cf");
            assert_eq!(&recorded[0].2[..], b"document");
        }
    }

    #[tokio::test]
    async fn test_reads_and_backend_writes_stay_local() {
        let local = Recorder::default();
        let peer = Recorder::default();
        let proxy = proxy(&local, vec![Peer::new("peer", peer.router(StatusCode::OK))]);

        for request in [
            Request::get("/v1/indicator-documents").body(Body::empty()).unwrap(),
            Request::post("/backend/v1/register").body(Body::from("doc")).unwrap(),
            Request::delete("/v1/register").body(Body::empty()).unwrap(),
        ] {
            let response = proxy.handle(request).await;
            assert_eq!(response.status(), StatusCode::OK);
        }

        assert_eq!(
            local.paths(),
            vec!["/v1/indicator-documents", "/v1/register", "/v1/register"]
        );
        assert!(peer.paths().is_empty());
    }

    #[tokio::test]
    async fn test_slow_peer_does_not_change_local_result() {
        let local = Recorder::default();
        let stalled = Router::new().fallback(|| async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            StatusCode::OK
        });
        let proxy = proxy(&local, vec![Peer::new("stalled", stalled)]);

        let started = tokio::time::Instant::now();
        let response = proxy
            .handle(Request::post("/v1/register").body(Body::from("doc")).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(local.paths(), vec!["/v1/register"]);
    }

    #[tokio::test]
    async fn test_unreadable_body_is_bad_request() {
        let local = Recorder::default();
        let peer = Recorder::default();
        let proxy = proxy(&local, vec![Peer::new("peer", peer.router(StatusCode::OK))]);

        let body = Body::from_stream(futures::stream::iter([
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::other("connection reset")),
        ]));
        let response = proxy
            .handle(Request::post("/v1/register").body(body).unwrap())
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(local.paths().is_empty());
        assert!(peer.paths().is_empty());
    }
}
