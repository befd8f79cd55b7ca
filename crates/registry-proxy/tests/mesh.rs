//! Two proxies peered at each other, each fronting its own registry.

use std::net::SocketAddr;
use std::time::Duration;

use indicator_http::HttpForwarder;
use indicator_registry::{RequestMetrics, Store, router};
use indicator_registry_proxy::{
    DEFAULT_PEER_TIMEOUT, Peer, RegistryProxy, RegistryProxyOptions,
};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tokio::net::TcpListener;
use tower::util::BoxCloneSyncService;

const DOCUMENT: &str = "
spec:
  product:
    name: cf-router
    version: v1
  indicators:
  - name: latency
    promql: avg(latency_ms)
    thresholds:
    - level: critical
      operator: gt
      value: 500
";

const SECOND_DOCUMENT: &str = "
spec:
  product:
    name: uaa
    version: v2
  indicators:
  - name: requests
    promql: sum(rate(requests[1m]))
";

struct Node {
    metrics: RequestMetrics,
    store: Store,
    url: String,
}

async fn bind() -> (TcpListener, SocketAddr) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

fn serve(listener: TcpListener, peer: SocketAddr) -> Node {
    let store = Store::new();
    let metrics = RequestMetrics::new().unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());

    let peer_forwarder = HttpForwarder::new(
        reqwest::Client::new(),
        &format!("http://{peer}"),
        DEFAULT_PEER_TIMEOUT,
    );
    let proxy = RegistryProxy::new(RegistryProxyOptions {
        local: BoxCloneSyncService::new(router(store.clone(), metrics.clone())),
        peer_timeout: DEFAULT_PEER_TIMEOUT,
        peers: vec![Peer::new(peer.to_string(), peer_forwarder)],
    });

    tokio::spawn(async move {
        axum::serve(listener, proxy.into_router()).await.unwrap();
    });

    Node {
        metrics,
        store,
        url,
    }
}

async fn documents(client: &reqwest::Client, node: &Node) -> Value {
    client
        .get(format!("{}/v1/indicator-documents", node.url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_broadcast_and_backend_suppression() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let (listener_1, addr_1) = bind().await;
    let (listener_2, addr_2) = bind().await;
    let p1 = serve(listener_1, addr_2);
    let p2 = serve(listener_2, addr_1);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let response = client
        .post(format!("{}/v1/register", p1.url))
        .body(DOCUMENT)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let on_p1 = documents(&client, &p1).await;
    let on_p2 = documents(&client, &p2).await;
    assert_eq!(on_p1.as_array().unwrap().len(), 1);
    assert_eq!(on_p1[0]["spec"]["product"]["name"], "cf-router");
    assert_eq!(on_p1, on_p2);

    // The delivery to P2 arrived under /backend and was not sent back.
    assert_eq!(p1.metrics.count("/v1/register", 200), 1);
    assert_eq!(p2.metrics.count("/v1/register", 200), 1);

    let response = client
        .post(format!("{}/backend/v1/register", p1.url))
        .body(SECOND_DOCUMENT)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let products = |store: &Store| -> Vec<String> {
        store
            .list()
            .into_iter()
            .map(|e| e.document.spec.product.name)
            .collect()
    };
    assert_eq!(products(&p1.store), vec!["cf-router", "uaa"]);
    assert_eq!(products(&p2.store), vec!["cf-router"]);
}

#[tokio::test]
async fn test_unreachable_peer_does_not_fail_write() {
    let (listener, _) = bind().await;
    let (dead, dead_addr) = bind().await;
    drop(dead);

    let node = serve(listener, dead_addr);
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/v1/register", node.url))
        .body(DOCUMENT)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(node.store.len(), 1);
}

#[tokio::test]
async fn test_rejected_document_is_not_accepted_anywhere() {
    let (listener_1, addr_1) = bind().await;
    let (listener_2, addr_2) = bind().await;
    let p1 = serve(listener_1, addr_2);
    let p2 = serve(listener_2, addr_1);

    let response = reqwest::Client::new()
        .post(format!("{}/v1/register", p1.url))
        .body("spec: [")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert!(p1.store.is_empty());
    assert!(p2.store.is_empty());
}
