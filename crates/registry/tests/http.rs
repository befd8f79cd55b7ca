//! The registry's HTTP surface driven in-process.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use indicator_http::ClientIdentity;
use indicator_registry::{RequestMetrics, Store, router};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

const DOCUMENT: &str = r#"
apiVersion: indicatorprotocol.io/v1
kind: IndicatorDocument
metadata:
  labels:
    deployment: cf
spec:
  product:
    name: cf-router
    version: "1.2.3"
  indicators:
  - name: latency
    promql: avg(latency_ms)
    thresholds:
    - level: critical
      operator: gt
      value: 500
"#;

fn registry() -> (Router, Store, RequestMetrics) {
    let store = Store::new();
    let metrics = RequestMetrics::new().unwrap();
    (router(store.clone(), metrics.clone()), store, metrics)
}

fn register(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri).body(Body::from(body.to_string())).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_register_then_list() {
    let (router, _, _) = registry();

    let response = router
        .clone()
        .oneshot(register("/v1/register", DOCUMENT))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "");

    let response = router
        .oneshot(Request::get("/v1/indicator-documents").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");

    let documents: Value = serde_json::from_str(&body_string(response).await).unwrap();
    assert_eq!(
        documents,
        json!([{
            "apiVersion": "indicatorprotocol.io/v1",
            "uid": "cf-router-6dc53fa0eea1c8a0192e9349b0ed36c96d78bd9f",
            "kind": "IndicatorDocument",
            "metadata": { "labels": { "deployment": "cf" } },
            "spec": {
                "product": { "name": "cf-router", "version": "1.2.3" },
                "indicators": [{
                    "name": "latency",
                    "promql": "avg(latency_ms)",
                    "thresholds": [{ "level": "critical", "operator": "gt", "value": 500.0 }]
                }],
                "layout": {
                    "title": "cf-router - 1.2.3",
                    "description": "",
                    "sections": [{ "title": "Metrics", "description": "", "indicators": ["latency"] }]
                }
            }
        }])
    );
}

#[tokio::test]
async fn test_register_rejects_malformed_document() {
    let (router, store, _) = registry();

    for body in [
        "spec: [",
        "spec:\n  product:\n    version: 1\n",
        "spec:\n  product:\n    name: p\n  indicators:\n  - name: a\n    promql: q\n    thresholds:\n    - level: critical\n      operator: between\n      value: 1\n",
        "spec:\n  product:\n    name: p\n  indicators:\n  - name: a\n    promql: q\n    thresholds:\n    - level: critical\n      operator: lt\n      value: lots\n",
    ] {
        let response = router
            .clone()
            .oneshot(register("/v1/register", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        assert!(!body_string(response).await.is_empty());
    }

    assert!(store.is_empty());
}

#[tokio::test]
async fn test_origin_from_client_identity_and_params() {
    let (router, store, _) = registry();

    let mut request = register("/v1/register?deployment=cf&service=router", DOCUMENT);
    request
        .extensions_mut()
        .insert(ClientIdentity::new("metron-agent"));

    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .oneshot(register("/v1/register", DOCUMENT))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let origins: Vec<_> = store.list().into_iter().map(|e| e.origin).collect();
    assert_eq!(origins, vec!["anonymous", "metron-agent/cf/router"]);
}

#[tokio::test]
async fn test_metrics_count_routes_and_unmatched_paths() {
    let (router, _, metrics) = registry();

    for request in [
        register("/v1/register", DOCUMENT),
        Request::get("/v1/indicator-documents").body(Body::empty()).unwrap(),
        Request::get("/v1/nope").body(Body::empty()).unwrap(),
    ] {
        router.clone().oneshot(request).await.unwrap();
    }

    let response = router
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; version=0.0.4"
    );

    let body = body_string(response).await;
    for expected in [
        r#"registry_http_requests{route="/v1/register",status="200"} 1"#,
        r#"registry_http_requests{route="/v1/indicator-documents",status="200"} 1"#,
        r#"registry_http_requests{route="invalid path",status="404"} 1"#,
    ] {
        assert!(body.contains(expected), "missing {expected} in:\n{body}");
    }

    assert_eq!(metrics.count("/metrics", 200), 1);
}

#[tokio::test]
async fn test_failed_register_counted_with_its_status() {
    let (router, _, metrics) = registry();

    router
        .oneshot(register("/v1/register", "spec: ["))
        .await
        .unwrap();

    assert_eq!(metrics.count("/v1/register", 400), 1);
    assert_eq!(metrics.count("/v1/register", 200), 0);
}
