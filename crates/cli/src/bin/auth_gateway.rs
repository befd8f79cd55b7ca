//! Token-checking read-only gateway in front of a registry.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use clap::Parser;
use indicator_auth_gateway::{AuthGateway, AuthGatewayOptions};
use indicator_cli::{Error, TlsArgs, UaaArgs, base_url, init_tracing, serve};
use indicator_http::HttpForwarder;
use url::Url;

#[derive(Clone, Debug, Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(long, default_value_t = 10569, env = "INDICATOR_GATEWAY_PORT")]
    port: u16,

    /// Registry (or registry proxy) requests are forwarded to
    #[arg(long, env = "INDICATOR_GATEWAY_BACKEND_URL")]
    backend_url: Url,

    /// A token must carry at least one of these scopes
    #[arg(
        long,
        value_delimiter = ',',
        required = true,
        env = "INDICATOR_GATEWAY_REQUIRED_SCOPES"
    )]
    required_scopes: Vec<String>,

    /// Seconds allowed for each backend request
    #[arg(long, default_value_t = 30, env = "INDICATOR_GATEWAY_BACKEND_TIMEOUT_SECS")]
    backend_timeout_secs: u64,

    #[command(flatten)]
    tls: TlsArgs,

    #[command(flatten)]
    uaa: UaaArgs,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_tracing();

    let args = Args::parse();
    let tls = args.tls.public_server_config()?;
    let timeout = Duration::from_secs(args.backend_timeout_secs);

    let gateway = AuthGateway::new(AuthGatewayOptions {
        backend: HttpForwarder::new(args.tls.client(timeout)?, &base_url(&args.backend_url), timeout),
        check_token: args
            .uaa
            .check_token_client(reqwest::Client::builder().timeout(timeout).build()?)?,
        required_scopes: args.required_scopes,
    });

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, args.port));
    serve(addr, gateway.into_router(), tls).await
}
