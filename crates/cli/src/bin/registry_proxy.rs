//! Registry proxy: local reads, mesh-wide writes.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use indicator_cli::{Error, TlsArgs, base_url, init_tracing, serve};
use indicator_http::HttpForwarder;
use indicator_registry_proxy::{Peer, RegistryProxy, RegistryProxyOptions};
use tower::util::BoxCloneSyncService;
use tracing::info;
use url::Url;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 10568, env = "INDICATOR_PROXY_PORT")]
    port: u16,

    /// Registry this proxy fronts
    #[arg(
        long,
        default_value = "https://localhost:10567",
        env = "INDICATOR_PROXY_LOCAL_REGISTRY_URL"
    )]
    local_registry_url: Url,

    /// Other proxies in the mesh
    #[arg(long, value_delimiter = ',', env = "INDICATOR_PROXY_PEER_REGISTRY_URLS")]
    peer_registry_urls: Vec<Url>,

    /// Seconds allowed for each peer delivery
    #[arg(long, default_value_t = 10, env = "INDICATOR_PROXY_PEER_TIMEOUT_SECS")]
    peer_timeout_secs: u64,

    #[command(flatten)]
    tls: TlsArgs,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let args = Args::parse();
    let tls = args.tls.server_config()?;
    let peer_timeout = Duration::from_secs(args.peer_timeout_secs);
    let client = args.tls.client(peer_timeout)?;

    let local = HttpForwarder::new(client.clone(), &base_url(&args.local_registry_url), peer_timeout);
    let peers = args
        .peer_registry_urls
        .iter()
        .map(|url| {
            let url = base_url(url);
            Peer::new(url.clone(), HttpForwarder::new(client.clone(), &url, peer_timeout))
        })
        .collect::<Vec<_>>();

    info!(
        local = %local.base_url(),
        peers = ?peers.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        "starting registry proxy"
    );

    let proxy = RegistryProxy::new(RegistryProxyOptions {
        local: BoxCloneSyncService::new(local),
        peer_timeout,
        peers,
    });

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, args.port));
    serve(addr, proxy.into_router(), tls).await
}
