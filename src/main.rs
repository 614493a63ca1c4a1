//! CredChain registry gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     HTTP request
//!     ─────────────▶ http (axum router, request id, timeout)
//!                        │
//!                        ▼
//!                    registry (validate, link check, builder scan)
//!                        │
//!              ┌─────────┴──────────┐
//!              ▼                    ▼
//!          contract (ABI)      blockchain::TxSubmitter
//!          read / prepare      (nonce, sign, broadcast, confirm)
//!              │                    │
//!              └─────────┬──────────┘
//!                        ▼
//!                 blockchain::BlockchainClient ──▶ JSON-RPC node(s)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use credchain_gateway::config::load_or_default;
use credchain_gateway::http::GatewayServer;
use credchain_gateway::lifecycle::{initialize, shutdown_signal, Shutdown};
use credchain_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "credchain-gateway")]
#[command(about = "Gateway to the CredChain freelance registry contract", long_about = None)]
struct Args {
    /// TOML configuration file; defaults apply when omitted.
    #[arg(short, long, env = "CREDCHAIN_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_or_default(args.config.as_deref())?;

    logging::init_logging(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "credchain-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        rpc_url = %config.chain.rpc_url,
        chain_id = config.chain.chain_id,
        contract = %config.contract.address,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let state = initialize(&config).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let mut stop = shutdown.subscribe();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.trigger();
        });
    }

    let server = GatewayServer::new(state, &config.listener);
    server
        .run(listener, async move {
            let _ = stop.recv().await;
        })
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
