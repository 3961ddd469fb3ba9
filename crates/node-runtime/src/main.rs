//! # Quarry Node
//!
//! Command-line entry point for the Quarry gateway.
//!
//! ## Startup Sequence
//!
//! 1. Initialise logging from the environment
//! 2. Load and validate configuration
//! 3. Assemble the gateway container
//! 4. Run the requested lookup under a cancellable context
//!
//! Ctrl-C cancels the context; in-flight lookups end promptly and print
//! whatever they found so far.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use node_runtime::commands;
use node_runtime::{GatewayConfig, GatewayContainer};
use quarry_telemetry::{init_logging, TelemetryConfig};
use shared_types::{ContentId, PeerId};

/// Quarry: read-only content routing and block retrieval gateway
#[derive(Parser, Debug)]
#[command(name = "quarry-node", version)]
#[command(about = "Read-only content routing and block retrieval gateway")]
struct Cli {
    /// Path to the TOML configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log filter, overrides QG_LOG_LEVEL / RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find providers for a content identifier
    Providers {
        cid: String,
        /// Stop after this many providers (0 = no limit)
        #[arg(short = 'n', long, default_value_t = 0)]
        limit: usize,
    },
    /// Find the addresses of a peer
    Peer { peer_id: String },
    /// Fetch the raw record of an IPNS name
    Ipns { name: String },
    /// Validate the configuration and print a summary
    CheckConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut telemetry = TelemetryConfig::from_env();
    telemetry.service_name = "quarry-node".to_string();
    if let Some(level) = &cli.log_level {
        telemetry = telemetry.with_log_level(level.clone());
    }
    init_logging(&telemetry).context("Failed to initialise logging")?;

    let config = match &cli.config {
        Some(path) => GatewayConfig::load(path).with_context(|| format!("Failed to load {}", path.display()))?,
        None => GatewayConfig::default(),
    };
    config.validate().context("Invalid configuration")?;

    if let Command::CheckConfig = cli.command {
        return check_config(&config);
    }

    let node = GatewayContainer::new(&config).context("Failed to assemble gateway")?;

    let ctx = CancellationToken::new();
    let interrupt = ctx.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling lookup");
            interrupt.cancel();
        }
    });

    let result = run(&node, &config, &ctx, cli.command).await;
    node.shutdown();
    result
}

async fn run(
    node: &GatewayContainer,
    config: &GatewayConfig,
    ctx: &CancellationToken,
    command: Command,
) -> Result<()> {
    match command {
        Command::Providers { cid, limit } => {
            let cid: ContentId = cid.parse().context("Invalid content identifier")?;
            let providers = commands::find_providers(node.router(), ctx, &cid, limit).await;
            info!(cid = %cid, found = providers.len(), "Provider lookup finished");
            for provider in providers {
                println!("{}\t{}", provider.id, provider.addrs.join(","));
            }
        }
        Command::Peer { peer_id } => {
            let peer: PeerId = peer_id.parse().context("Invalid peer identity")?;
            let info = commands::find_peer(node.router(), ctx, &peer)
                .await
                .with_context(|| format!("Peer lookup for {peer} failed"))?;
            for addr in info.addrs {
                println!("{addr}");
            }
        }
        Command::Ipns { name } => {
            let record = commands::resolve_ipns(node.router(), ctx, &name)
                .await
                .with_context(|| format!("IPNS lookup for {name} failed"))?;
            println!("{}", hex::encode(record));
        }
        Command::CheckConfig => check_config(config)?,
    }
    Ok(())
}

fn check_config(config: &GatewayConfig) -> Result<()> {
    let routing = config.routing_config()?;
    let exchange = config.exchange_config()?;
    let identity = config.identity()?;

    println!("dht_mode: {}", routing.dht_mode);
    for endpoint in &routing.endpoints {
        println!("http_router: {}", endpoint.url);
    }
    println!("delegated_timeout: {:?}", routing.delegated_timeout);
    println!("per_block_timeout: {:?}", exchange.per_block_timeout);
    println!("shared_cache: {}", exchange.serves(&config.peering()?));
    match identity {
        Some(identity) => println!("peer_id: {}", identity.peer_id()),
        None => println!("peer_id: ephemeral"),
    }
    Ok(())
}
