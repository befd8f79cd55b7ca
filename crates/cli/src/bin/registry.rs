//! Indicator document registry.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use indicator_cli::{Error, TlsArgs, init_tracing, serve};
use indicator_registry::{Janitor, RequestMetrics, Store, router};

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 10567, env = "INDICATOR_REGISTRY_PORT")]
    port: u16,

    /// Evict documents not re-registered within this many seconds
    #[arg(long, env = "INDICATOR_REGISTRY_EXPIRATION_SECS")]
    expiration: Option<u64>,

    #[command(flatten)]
    tls: TlsArgs,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let args = Args::parse();
    let tls = args.tls.server_config()?;

    let store = Store::new();
    let metrics = RequestMetrics::new()?;
    let janitor = args
        .expiration
        .map(|secs| Janitor::start(store.clone(), Duration::from_secs(secs)));

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, args.port));
    serve(addr, router(store, metrics), tls).await?;

    if let Some(janitor) = janitor {
        janitor.shutdown().await;
    }

    Ok(())
}
