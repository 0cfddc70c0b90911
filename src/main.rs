//! Token minter server.
//!
//! ```text
//!   Browser (form page + wallet extension)
//!        │  POST /api/wallet/connect, POST /api/mint
//!        ▼
//!   ┌──────────┐     ┌──────────────┐     ┌──────────────┐
//!   │   http   │────▶│   minting    │────▶│  blockchain  │────▶ JSON-RPC node
//!   │  server  │     │   pipeline   │     │    ledger    │
//!   └──────────┘     └──────┬───────┘     └──────────────┘
//!        ▲                  │
//!        │ SSE              ├──▶ custody (pending keys)
//!        └── status board ◀─┘    checkpoint
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use token_minter::config::{load_config, MinterConfig};
use token_minter::lifecycle::{build_services, signals, Shutdown};
use token_minter::observability::{logging, metrics};
use token_minter::HttpServer;

#[derive(Parser)]
#[command(name = "token-minter")]
#[command(about = "Mint a fixed-supply SPL token to a connected wallet", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Mint against an in-memory ledger instead of the RPC endpoint.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => MinterConfig::default(),
    };

    logging::init(&config.observability.log_level);
    tracing::info!("token-minter v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        rpc_url = %config.rpc.url,
        commitment = %config.rpc.commitment,
        dry_run = args.dry_run,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let services = build_services(&config, args.dry_run)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(shutdown.clone());

    let server = HttpServer::new(config, services, shutdown);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
