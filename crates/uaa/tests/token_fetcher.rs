//! Token fetcher caching behaviour against a stub UAA server.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::post;
use indicator_uaa::{Error, TokenFetcher, TokenFetcherOptions, TokenSource};
use parking_lot::Mutex;
use tokio::net::TcpListener;

#[derive(Clone, Default)]
struct StubUaa {
    failing: Arc<AtomicBool>,
    last_body: Arc<Mutex<String>>,
    last_headers: Arc<Mutex<HeaderMap>>,
    requests: Arc<AtomicUsize>,
}

async fn issue_token(State(stub): State<StubUaa>, headers: HeaderMap, body: String) -> impl IntoResponse {
    let n = stub.requests.fetch_add(1, Ordering::SeqCst) + 1;
    *stub.last_body.lock() = body;
    *stub.last_headers.lock() = headers;

    // Widen the window in which concurrent callers could race.
    tokio::time::sleep(Duration::from_millis(50)).await;

    if stub.failing.load(Ordering::SeqCst) {
        return (StatusCode::UNAUTHORIZED, "bad credentials".to_string());
    }

    (
        StatusCode::OK,
        format!(r#"{{"token_type":"bearer","access_token":"token-{n}"}}"#),
    )
}

async fn start_stub() -> (StubUaa, String) {
    let stub = StubUaa::default();
    let router = Router::new()
        .route("/oauth/token", post(issue_token))
        .with_state(stub.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (stub, format!("http://{addr}"))
}

fn fetcher(uaa_url: String, now: Arc<Mutex<Instant>>) -> TokenFetcher {
    TokenFetcher::with_clock(
        TokenFetcherOptions {
            client_id: "indicator-client".to_string(),
            client_secret: "s3cret".to_string(),
            http_client: reqwest::Client::new(),
            token_lifetime: Duration::from_secs(3600),
            uaa_url,
        },
        Arc::new(move || *now.lock()),
    )
}

#[tokio::test]
async fn test_caches_until_expiry() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let (stub, url) = start_stub().await;
    let start = Instant::now();
    let now = Arc::new(Mutex::new(start));
    let fetcher = fetcher(url, now.clone());

    assert_eq!(fetcher.acquire().await.unwrap(), "bearer token-1");

    *now.lock() = start + Duration::from_secs(30 * 60);
    assert_eq!(fetcher.acquire().await.unwrap(), "bearer token-1");
    assert_eq!(stub.requests.load(Ordering::SeqCst), 1);

    *now.lock() = start + Duration::from_secs(3600) + Duration::from_millis(1);
    assert_eq!(fetcher.acquire().await.unwrap(), "bearer token-2");
    assert_eq!(stub.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_concurrent_first_calls_share_one_request() {
    let (stub, url) = start_stub().await;
    let fetcher = Arc::new(fetcher(url, Arc::new(Mutex::new(Instant::now()))));

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.acquire().await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "bearer token-1");
    }

    assert_eq!(stub.requests.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sends_client_credentials_grant() {
    let (stub, url) = start_stub().await;
    let fetcher = fetcher(url, Arc::new(Mutex::new(Instant::now())));

    fetcher.acquire().await.unwrap();

    let body = stub.last_body.lock().clone();
    assert!(body.contains("grant_type=client_credentials"), "{body}");
    assert!(body.contains("client_id=indicator-client"), "{body}");

    let headers = stub.last_headers.lock().clone();
    assert_eq!(
        headers[header::CONTENT_TYPE],
        "application/x-www-form-urlencoded"
    );
    // base64("indicator-client:s3cret")
    assert_eq!(
        headers[header::AUTHORIZATION],
        "Basic aW5kaWNhdG9yLWNsaWVudDpzM2NyZXQ="
    );
}

#[tokio::test]
async fn test_failure_is_not_cached() {
    let (stub, url) = start_stub().await;
    let fetcher = fetcher(url, Arc::new(Mutex::new(Instant::now())));

    stub.failing.store(true, Ordering::SeqCst);
    assert!(fetcher.acquire().await.is_err());

    stub.failing.store(false, Ordering::SeqCst);
    assert_eq!(fetcher.acquire().await.unwrap(), "bearer token-2");
    assert_eq!(stub.requests.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unrepresentable_lifetime_is_an_error() {
    let (stub, url) = start_stub().await;
    let fetcher = TokenFetcher::new(TokenFetcherOptions {
        client_id: "indicator-client".to_string(),
        client_secret: "s3cret".to_string(),
        http_client: reqwest::Client::new(),
        token_lifetime: Duration::MAX,
        uaa_url: url,
    });

    assert!(matches!(
        fetcher.acquire().await,
        Err(Error::TokenLifetime(lifetime)) if lifetime == Duration::MAX
    ));
    assert!(matches!(
        fetcher.acquire().await,
        Err(Error::TokenLifetime(_))
    ));
    assert_eq!(stub.requests.load(Ordering::SeqCst), 2);
}
