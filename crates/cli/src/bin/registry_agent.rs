//! Keeps the indicator documents in a directory registered.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use indicator_cli::{Error, TlsArgs, base_url, init_tracing, wait_for_shutdown};
use indicator_registry::{RegistryAgent, RegistryAgentOptions};
use url::Url;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Registry (or registry proxy) to register with
    #[arg(
        long,
        default_value = "https://localhost:10567",
        env = "INDICATOR_AGENT_REGISTRY_URL"
    )]
    registry_url: Url,

    /// Directory holding *.yml / *.yaml indicator documents
    #[arg(long, env = "INDICATOR_AGENT_DOCUMENTS_DIR")]
    documents_dir: PathBuf,

    /// Deployment the documents belong to
    #[arg(long, env = "INDICATOR_AGENT_DEPLOYMENT")]
    deployment: Option<String>,

    /// Service within the deployment
    #[arg(long, env = "INDICATOR_AGENT_SERVICE")]
    service: Option<String>,

    /// Seconds between registration passes
    #[arg(
        long,
        default_value_t = 60,
        env = "INDICATOR_AGENT_INTERVAL_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    interval_secs: u64,

    /// Seconds allowed for each registration request
    #[arg(long, default_value_t = 10, env = "INDICATOR_AGENT_REQUEST_TIMEOUT_SECS")]
    request_timeout_secs: u64,

    #[command(flatten)]
    tls: TlsArgs,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let args = Args::parse();
    let agent = RegistryAgent::new(RegistryAgentOptions {
        client: args
            .tls
            .client(Duration::from_secs(args.request_timeout_secs))?,
        deployment: args.deployment,
        documents_dir: args.documents_dir,
        interval: Duration::from_secs(args.interval_secs),
        registry_url: base_url(&args.registry_url),
        service: args.service,
    });

    agent.start()?;
    wait_for_shutdown().await;
    agent.shutdown().await;

    Ok(())
}
