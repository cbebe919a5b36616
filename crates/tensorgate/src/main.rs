//! tensorgate — authentication gateway and reverse proxy.
//!
//! Terminates the GitHub OAuth login flow, issues signed session cookies,
//! and forwards authorized API traffic to the upstream tensors API with the
//! server-held credential injected.

use anyhow::Result;
use clap::Parser;

use tensorgate_server::{Gateway, GatewayConfig};

/// Authentication gateway and reverse proxy for the tensors API.
#[derive(Parser)]
#[command(name = "tensorgate")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Address to bind the gateway to
    #[arg(long, env = "TENSORGATE_BIND", default_value = "127.0.0.1:8787")]
    bind: std::net::SocketAddr,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "tensorgate=debug,tensorgate_server=debug,tensorgate_auth=debug,tower_http=debug,info"
    } else {
        "tensorgate=info,tensorgate_server=info,tensorgate_auth=info,warn"
    };

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let config = GatewayConfig::from_env()?.with_bind_address(cli.bind);
    tracing::debug!(?config, "loaded configuration");

    Gateway::new(config).run().await?;
    Ok(())
}
