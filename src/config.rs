//! Configuration management
//!
//! Loads settings from the environment (.env supported). Signing credentials
//! are mandatory - startup fails with a context error if they are absent.
//! Venue definitions use prefixed variables, e.g. for `VENUES=base,arbitrum`:
//!
//!   VENUE_BASE_CHAIN_ID, VENUE_BASE_RPC_URL, VENUE_BASE_WETH,
//!   VENUE_BASE_STABLE, VENUE_BASE_STABLE_DECIMALS, VENUE_BASE_STABLE_B,
//!   VENUE_BASE_QUOTER, VENUE_BASE_ROUTER, VENUE_BASE_EXPLORER,
//!   VENUE_BASE_PRIORITY
//!
//! Author: AI-Generated
//! Created: 2026-08-21

use crate::types::{StableToken, Venue};
use anyhow::{bail, Context, Result};
use ethers::types::{Address, U256};
use std::str::FromStr;

/// Bot configuration, immutable after load
#[derive(Debug, Clone)]
pub struct ScalperConfig {
    // Wallet
    pub private_key: String,
    pub wallet_address: Address,

    // Venues
    pub venues: Vec<Venue>,

    // Scan parameters
    pub scan_interval_ms: u64,
    /// Trade sizes in base-asset smallest units
    pub trade_sizes_wei: Vec<U256>,
    /// Fee tiers enumerated pairwise for intra-venue routes
    pub fee_tiers: Vec<u32>,
    /// Fixed tiers for the three triangular legs (not enumerated)
    pub triangular_fees: [u32; 3],
    /// Notional gas units for a two-leg swap; triangular uses 1.5x
    pub gas_units_per_swap: u64,
    /// Scans abort early when the network fee price exceeds this
    pub max_gas_price_gwei: u64,
    /// Static reference price used when no quote and no cache exist
    pub fallback_ref_price: f64,
    /// Cross-venue comparison runs every Nth tick
    pub compare_interval_ticks: u64,
    /// Balance refresh runs every Nth tick
    pub balance_refresh_ticks: u64,
    /// Venue is inactive below this native balance
    pub min_active_balance_wei: U256,

    // Execution parameters
    pub min_profit_quote: f64,
    pub max_slippage_bps: u32,
    pub max_concurrent_executions: usize,
    /// Balance must cover input plus this buffer before executing
    pub balance_safety_buffer_wei: U256,
    pub auto_execute: bool,

    // Transport
    pub rpc_timeout_ms: u64,
    pub port: u16,
}

pub fn load_config() -> Result<ScalperConfig> {
    dotenv::dotenv().ok();

    let private_key =
        std::env::var("PRIVATE_KEY").context("PRIVATE_KEY not set - signing credential required")?;
    let wallet_address: Address = std::env::var("WALLET_ADDRESS")
        .context("WALLET_ADDRESS not set")?
        .parse()
        .context("WALLET_ADDRESS is not a valid address")?;

    let venue_names = std::env::var("VENUES").context("VENUES not set (comma-separated list)")?;
    let mut venues = Vec::new();
    for name in venue_names.split(',').map(|s| s.trim()).filter(|s| !s.is_empty()) {
        venues.push(load_venue(name)?);
    }
    if venues.is_empty() {
        bail!("VENUES is empty - at least one venue is required");
    }
    venues.sort_by_key(|v| v.priority);

    Ok(ScalperConfig {
        private_key,
        wallet_address,
        venues,
        scan_interval_ms: env_or("SCAN_INTERVAL_MS", 5000u64)?,
        trade_sizes_wei: parse_u256_list(&env_or(
            "TRADE_SIZES_WEI",
            // 0.005, 0.01, 0.02 ETH
            "5000000000000000,10000000000000000,20000000000000000".to_string(),
        )?)?,
        fee_tiers: parse_u32_list(&env_or("FEE_TIERS", "500,3000".to_string())?)?,
        triangular_fees: parse_triangular_fees(&env_or(
            "TRIANGULAR_FEES",
            "500,100,3000".to_string(),
        )?)?,
        gas_units_per_swap: env_or("GAS_UNITS_PER_SWAP", 250_000u64)?,
        max_gas_price_gwei: env_or("MAX_GAS_PRICE_GWEI", 20u64)?,
        fallback_ref_price: env_or("FALLBACK_REF_PRICE", 3500.0f64)?,
        compare_interval_ticks: non_zero(
            "COMPARE_INTERVAL_TICKS",
            env_or("COMPARE_INTERVAL_TICKS", 5u64)?,
        )?,
        balance_refresh_ticks: non_zero(
            "BALANCE_REFRESH_TICKS",
            env_or("BALANCE_REFRESH_TICKS", 5u64)?,
        )?,
        min_active_balance_wei: parse_u256(&env_or(
            "MIN_ACTIVE_BALANCE_WEI",
            "1000000000000000".to_string(), // 0.001 ETH
        )?)?,
        min_profit_quote: env_or("MIN_PROFIT_QUOTE", 0.10f64)?,
        max_slippage_bps: slippage_bps(env_or("MAX_SLIPPAGE_BPS", 50u32)?)?,
        max_concurrent_executions: env_or("MAX_CONCURRENT_EXECUTIONS", 2usize)?,
        balance_safety_buffer_wei: parse_u256(&env_or(
            "BALANCE_SAFETY_BUFFER_WEI",
            "500000000000000".to_string(), // 0.0005 ETH headroom for gas
        )?)?,
        auto_execute: env_or("AUTO_EXECUTE", false)?,
        rpc_timeout_ms: env_or("RPC_TIMEOUT_MS", 30_000u64)?,
        port: env_or("PORT", 3101u16)?,
    })
}

/// Load one venue from its prefixed environment variables
fn load_venue(name: &str) -> Result<Venue> {
    let prefix = format!("VENUE_{}", name.to_uppercase());
    let var = |key: &str| -> Result<String> {
        std::env::var(format!("{}_{}", prefix, key))
            .with_context(|| format!("{}_{} not set", prefix, key))
    };
    let addr = |key: &str| -> Result<Address> {
        var(key)?
            .parse()
            .with_context(|| format!("{}_{} is not a valid address", prefix, key))
    };

    let stable = StableToken {
        address: addr("STABLE")?,
        decimals: var("STABLE_DECIMALS").ok().map_or(Ok(6), |s| s.parse())?,
    };
    let stable_b = match std::env::var(format!("{}_STABLE_B", prefix)) {
        Ok(s) => Some(StableToken {
            address: s
                .parse()
                .with_context(|| format!("{}_STABLE_B is not a valid address", prefix))?,
            decimals: var("STABLE_B_DECIMALS").ok().map_or(Ok(6), |s| s.parse())?,
        }),
        Err(_) => None,
    };

    Ok(Venue {
        name: name.to_string(),
        chain_id: var("CHAIN_ID")?.parse().context("chain id must be numeric")?,
        rpc_url: var("RPC_URL")?,
        explorer: var("EXPLORER").unwrap_or_default(),
        weth: addr("WETH")?,
        stable,
        stable_b,
        quoter: addr("QUOTER")?,
        router: addr("ROUTER")?,
        priority: std::env::var(format!("{}_PRIORITY", prefix))
            .ok()
            .map_or(Ok(0), |s| s.parse())
            .context("priority must be numeric")?,
    })
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{} invalid: {}", key, e)),
        Err(_) => Ok(default),
    }
}

/// Tick cadences divide the tick counter, so zero is never valid
fn non_zero(key: &str, value: u64) -> Result<u64> {
    if value == 0 {
        bail!("{} must be at least 1", key);
    }
    Ok(value)
}

/// Slippage is a fraction of 10000; anything above that underflows the
/// min-out bound
fn slippage_bps(value: u32) -> Result<u32> {
    if value > 10_000 {
        bail!("MAX_SLIPPAGE_BPS must be at most 10000, got {}", value);
    }
    Ok(value)
}

fn parse_u256(raw: &str) -> Result<U256> {
    U256::from_dec_str(raw.trim()).with_context(|| format!("invalid integer amount: {}", raw))
}

fn parse_u256_list(raw: &str) -> Result<Vec<U256>> {
    let sizes: Result<Vec<U256>> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(parse_u256)
        .collect();
    let sizes = sizes?;
    if sizes.is_empty() {
        bail!("trade size list is empty");
    }
    Ok(sizes)
}

fn parse_u32_list(raw: &str) -> Result<Vec<u32>> {
    let tiers: Result<Vec<u32>, _> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u32>())
        .collect();
    let tiers = tiers.context("invalid fee tier list")?;
    if tiers.len() < 2 {
        bail!("at least two fee tiers required for round-trip routes");
    }
    Ok(tiers)
}

fn parse_triangular_fees(raw: &str) -> Result<[u32; 3]> {
    let fees = parse_u32_list(raw)?;
    if fees.len() != 3 {
        bail!("TRIANGULAR_FEES must list exactly three tiers");
    }
    Ok([fees[0], fees[1], fees[2]])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u256_list() {
        let sizes = parse_u256_list("5000000000000000, 10000000000000000").unwrap();
        assert_eq!(sizes.len(), 2);
        assert_eq!(sizes[0], U256::from(5_000_000_000_000_000u64));
        assert!(parse_u256_list("").is_err());
        assert!(parse_u256_list("abc").is_err());
    }

    #[test]
    fn test_parse_u32_list() {
        assert_eq!(parse_u32_list("500,3000").unwrap(), vec![500, 3000]);
        // single tier cannot form a distinct pair
        assert!(parse_u32_list("500").is_err());
    }

    #[test]
    fn test_parse_triangular_fees() {
        assert_eq!(parse_triangular_fees("500,100,3000").unwrap(), [500, 100, 3000]);
        assert!(parse_triangular_fees("500,3000").is_err());
    }

    #[test]
    fn test_tick_cadences_reject_zero() {
        assert_eq!(non_zero("COMPARE_INTERVAL_TICKS", 5).unwrap(), 5);
        assert_eq!(non_zero("BALANCE_REFRESH_TICKS", 1).unwrap(), 1);
        assert!(non_zero("COMPARE_INTERVAL_TICKS", 0).is_err());
        assert!(non_zero("BALANCE_REFRESH_TICKS", 0).is_err());
    }

    #[test]
    fn test_slippage_bps_bounded() {
        assert_eq!(slippage_bps(0).unwrap(), 0);
        assert_eq!(slippage_bps(50).unwrap(), 50);
        assert_eq!(slippage_bps(10_000).unwrap(), 10_000);
        assert!(slippage_bps(10_001).is_err());
    }
}
