use crate::error::Error;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{IntCounterVec, Opts, Registry, TextEncoder};

/// Route label for requests that matched no route.
pub const INVALID_PATH_ROUTE: &str = "invalid path";

/// Counts served requests by route and status.
#[derive(Clone, Debug)]
pub struct RequestMetrics {
    registry: Registry,
    requests: IntCounterVec,
}

impl RequestMetrics {
    /// Creates the counters in a fresh registry.
    ///
    /// # Errors
    ///
    /// Returns an error if the counters cannot be registered.
    pub fn new() -> Result<Self, Error> {
        Self::with_registry(Registry::new())
    }

    /// Creates the counters in `registry`, which `/metrics` then exposes in
    /// full.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric with the same name is already registered.
    pub fn with_registry(registry: Registry) -> Result<Self, Error> {
        let requests = IntCounterVec::new(
            Opts::new("registry_http_requests", "HTTP requests served by the registry"),
            &["route", "status"],
        )?;
        registry.register(Box::new(requests.clone()))?;

        Ok(Self { registry, requests })
    }

    /// Records one served request.
    pub fn observe(&self, route: &str, status: u16) {
        self.requests
            .with_label_values(&[route, &status.to_string()])
            .inc();
    }

    /// Current count for `route` and `status`.
    #[must_use]
    pub fn count(&self, route: &str, status: u16) -> u64 {
        self.requests
            .with_label_values(&[route, &status.to_string()])
            .get()
    }

    /// Renders every metric in the registry in the Prometheus text format.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn render(&self) -> Result<String, Error> {
        Ok(TextEncoder::new().encode_to_string(&self.registry.gather())?)
    }
}

pub(crate) async fn track(
    State(metrics): State<RequestMetrics>,
    request: Request,
    next: Next,
) -> Response {
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| INVALID_PATH_ROUTE.to_string(), |path| path.as_str().to_string());

    let response = next.run(request).await;
    metrics.observe(&route, response.status().as_u16());

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    use prometheus::IntCounter;

    #[test]
    fn test_shared_registry_is_rendered_in_full() {
        let registry = Registry::new();
        let uptime = IntCounter::new("process_ticks", "Ticks since start").unwrap();
        registry.register(Box::new(uptime.clone())).unwrap();
        uptime.inc();

        let metrics = RequestMetrics::with_registry(registry.clone()).unwrap();
        metrics.observe("/v1/register", 200);

        let text = metrics.render().unwrap();
        assert!(text.contains("process_ticks 1"));
        assert!(text.contains(r#"registry_http_requests{route="/v1/register",status="200"} 1"#));

        assert!(RequestMetrics::with_registry(registry).is_err());
    }
}
