//! Evaluates a document's indicators against a metrics store on an interval.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use clap::Parser;
use indicator_cli::{Error, PromqlArgs, init_tracing, load_document, serve, wait_for_shutdown};
use indicator_producer::{CounterEmitter, LogEmitter, Producer, ProducerOptions};
use prometheus::{Registry, TextEncoder};
use tracing::{info, warn};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Indicator document whose indicators are evaluated
    #[arg(long, env = "INDICATOR_EVALUATOR_DOCUMENT")]
    document: PathBuf,

    /// Seconds between evaluations
    #[arg(
        long,
        default_value_t = 60,
        env = "INDICATOR_EVALUATOR_INTERVAL_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval_secs: u64,

    /// Serve event counters on this port at /metrics
    #[arg(long, env = "INDICATOR_EVALUATOR_METRICS_PORT")]
    metrics_port: Option<u16>,

    #[command(flatten)]
    promql: PromqlArgs,
}

async fn render_metrics(State(registry): State<Registry>) -> Response {
    match TextEncoder::new().encode_to_string(&registry.gather()) {
        Ok(body) => ([(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)], body).into_response(),
        Err(e) => {
            warn!(error = %e, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let args = Args::parse();
    let document = load_document(&args.document)?;
    let registry = Registry::new();

    info!(
        product = %document.product_name(),
        indicators = document.spec.indicators.len(),
        "evaluating indicator document"
    );

    let handle = Producer::start(ProducerOptions {
        emitter: (LogEmitter, CounterEmitter::new(&registry)?),
        indicators: document.spec.indicators,
        interval: Duration::from_secs(args.interval_secs),
        source: args.promql.client()?,
    })?;

    let served = match args.metrics_port {
        Some(port) => {
            let router = Router::new()
                .route("/metrics", get(render_metrics))
                .with_state(registry);
            serve(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)), router, None).await
        }
        None => {
            wait_for_shutdown().await;
            Ok(())
        }
    };

    handle.stop().await;

    served
}
