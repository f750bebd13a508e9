//! Listing gateway server.
//!
//! ```text
//!   HTTP client ──▶ api (axum) ──▶ ListingClient ──▶ ConnectionSession
//!                                       │                 │
//!                                       ▼                 ▼
//!                              ReconciliationCache   provider (RPC endpoint
//!                                                    or in-memory ledger)
//! ```
//!
//! `--demo` swaps the RPC endpoint for a seeded in-memory ledger.

use alloy::primitives::{address, Address};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use listing_gateway::api::ApiServer;
use listing_gateway::config::{loader, validate_config, ConfigError, GatewayConfig};
use listing_gateway::gateway::{InMemoryChain, ProviderResolver};
use listing_gateway::lifecycle::Shutdown;
use listing_gateway::listings::{to_base_units, ListingClient};
use listing_gateway::observability::{logging, metrics};

const DEMO_CONTRACT: Address = address!("0x3F2e28eAf710b19e7472195CE825ca4277a9803C");
const DEMO_SELLER: Address = address!("0x90F8bf6A479f320ead074411a4B0e7944Ea8c9C1");
const DEMO_BUYER: Address = address!("0xFFcf8FDEE72ac11b5c542428B35EEF5769C409f0");

#[derive(Parser)]
#[command(name = "listing-gateway")]
#[command(about = "REST gateway for the AI-model marketplace contract", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serve a seeded in-memory ledger instead of the RPC endpoint.
    #[arg(long)]
    demo: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = loader::read_config(args.config.as_deref())?;
    loader::apply_env_overrides(&mut config);
    if args.demo {
        config
            .contract
            .addresses
            .insert(config.network.expected_network_id.to_string(), DEMO_CONTRACT.to_string());
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_tracing(&config.observability.log_level);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), demo = args.demo, "listing-gateway starting");
    tracing::info!(
        endpoint = %config.provider.endpoint,
        expected_network = config.network.expected_network_id,
        deployments = config.contract.addresses.len(),
        bind_address = %config.server.bind_address,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let client = if args.demo {
        demo_client(&config)?
    } else {
        ListingClient::from_config(&config)
    };
    let client = Arc::new(client);

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let signal = Arc::clone(&shutdown);
    tokio::spawn(async move { signal.trigger_on_ctrl_c().await });

    let server = ApiServer::new(client, Duration::from_secs(config.server.request_timeout_secs));
    server.run(listener, &shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

/// A client wired to a fresh in-memory ledger with a few listings.
fn demo_client(config: &GatewayConfig) -> Result<ListingClient, Box<dyn std::error::Error>> {
    let chain = InMemoryChain::new(config.expected_network(), DEMO_CONTRACT);
    chain.set_auto_mine(true);

    let decimals = config.contract.decimals;
    for (name, description, price) in [
        ("Sentiment classifier", "Fine-tuned transformer for review sentiment", "0.5"),
        ("Object detector", "Real-time detection for 80 COCO classes", "2.25"),
        ("Speech to text", "Multilingual transcription model", "1.0"),
    ] {
        chain.seed_listing(name, description, to_base_units(price, decimals)?, DEMO_SELLER);
    }
    tracing::info!(listings = 3, contract = %DEMO_CONTRACT, "Demo ledger seeded");

    let provider = chain.provider(vec![DEMO_BUYER, DEMO_SELLER]);
    let resolver = ProviderResolver::new().with_injected(provider);
    Ok(ListingClient::with_resolver(config, resolver))
}
