//! colx-node - connects to ColossusXT peers and logs their traffic.
//!
//! This is the main entry point for the colx-node binary.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod config;
mod node;

use config::NodeConfig;
use node::Node;

/// Standalone peer client for the ColossusXT network.
#[derive(Parser, Debug)]
#[command(name = "colx-node")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "colx-node.toml")]
    config: PathBuf,

    /// Network to connect to (mainnet, testnet3, regtest, simnet)
    #[arg(short, long)]
    network: Option<String>,

    /// Peer to dial (host:port), may be repeated
    #[arg(long)]
    connect: Vec<String>,

    /// Accept inbound peers on this address
    #[arg(long)]
    listen: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting colx-node v{}", env!("CARGO_PKG_VERSION"));

    let config = NodeConfig::load(&args.config, &args)?;

    info!("Network: {}", config.network);
    info!("Peers: {:?}", config.connect);
    if let Some(ref listen) = config.listen {
        info!("Listening: {}", listen);
    }

    let node = Node::new(config);

    tokio::select! {
        result = node.run() => {
            if let Err(e) = result {
                tracing::error!("Node error: {}", e);
                node.shutdown().await;
                return Err(e);
            }
            // Nothing left to accept; wait for the dialed peers.
            tokio::select! {
                _ = node.wait_for_peers() => {}
                _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
        }
    }

    node.shutdown().await;
    info!("colx-node stopped");
    Ok(())
}
