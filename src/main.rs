//! Multi-Chain DEX Scalper Bot
//!
//! Main entry point. Loads env configuration, wires one quoter + router
//! client per venue, and serves the HTTP control surface. Scanning starts
//! via POST /start (or --start for headless runs) and stays in dry-run
//! unless --live is passed.
//!
//! Author: AI-Generated
//! Created: 2026-08-21

use anyhow::Result;
use clap::Parser;
use scalper_bot::config::load_config;
use scalper_bot::engine::Engine;
use scalper_bot::server;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// DEX Scalper Bot — multi-venue round-trip scanner
#[derive(Parser)]
#[command(name = "scalper-bot")]
struct Args {
    /// Begin scanning immediately instead of waiting for POST /start
    #[arg(long)]
    start: bool,

    /// Submit real transactions (default is dry-run detection only)
    #[arg(long)]
    live: bool,

    /// HTTP port override
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_target(false)
        .init();

    let args = Args::parse();
    let config = load_config()?;
    let port = args.port.unwrap_or(config.port);

    info!("🤖 DEX Scalper Bot starting");
    info!("Wallet: {:?}", config.wallet_address);
    info!(
        "Venues: {}",
        config
            .venues
            .iter()
            .map(|v| format!("{} (chain {})", v.name, v.chain_id))
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!(
        "Scan interval: {} ms | trade sizes: {} | fee tiers: {:?}",
        config.scan_interval_ms,
        config.trade_sizes_wei.len(),
        config.fee_tiers
    );
    info!(
        "Min profit: ${:.2} | max slippage: {} bps | gas ceiling: {} gwei | concurrency: {}",
        config.min_profit_quote,
        config.max_slippage_bps,
        config.max_gas_price_gwei,
        config.max_concurrent_executions
    );
    if config.auto_execute {
        warn!("⚠️ AUTO_EXECUTE enabled - live starts will submit transactions");
    }

    let engine = Engine::new(config)?;

    if args.start {
        let dry_run = !args.live;
        engine.start(dry_run);
    } else {
        info!("Idle - POST /start to begin scanning");
    }

    server::serve(engine, port).await
}
