use crate::error::Error;
use crate::metrics::{RequestMetrics, track};
use crate::origin::{RegisterParams, origin};
use crate::store::Store;

use axum::body::to_bytes;
use axum::extract::{Query, Request, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use indicator_domain::IndicatorDocument;
use indicator_http::{ClientIdentity, MAX_BODY_BYTES};
use tracing::info;

#[derive(Clone)]
struct RegistryState {
    metrics: RequestMetrics,
    store: Store,
}

/// Builds the registry's routes, every one of them (and the fallback)
/// counted by `metrics`.
pub fn router(store: Store, metrics: RequestMetrics) -> Router {
    Router::new()
        .route("/v1/register", post(register))
        .route("/v1/indicator-documents", get(list_documents))
        .route("/metrics", get(render_metrics))
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(metrics.clone(), track))
        .with_state(RegistryState { metrics, store })
}

async fn register(
    State(state): State<RegistryState>,
    Query(params): Query<RegisterParams>,
    request: Request,
) -> Result<StatusCode, Error> {
    let identity = request.extensions().get::<ClientIdentity>().cloned();
    let origin = origin(identity.as_ref(), &params);

    let body = to_bytes(request.into_body(), MAX_BODY_BYTES)
        .await
        .map_err(Error::Body)?;
    let document = IndicatorDocument::from_yaml(&body)?;

    info!(%origin, product = %document.product_name(), "registered indicator document");
    state.store.upsert(document, &origin);

    Ok(StatusCode::OK)
}

async fn list_documents(State(state): State<RegistryState>) -> Json<Vec<IndicatorDocument>> {
    Json(
        state
            .store
            .list()
            .into_iter()
            .map(|entry| entry.document)
            .collect(),
    )
}

async fn render_metrics(State(state): State<RegistryState>) -> Result<impl IntoResponse, Error> {
    Ok((
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        state.metrics.render()?,
    ))
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
