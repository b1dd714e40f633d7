//! Arbitrage detection and execution
//!
//! Author: AI-Generated
//! Created: 2026-08-21

pub mod comparator;
pub mod executor;
pub mod ranker;
pub mod scanner;

pub use comparator::Comparator;
pub use executor::{ExecutionVerdict, Executor};
pub use ranker::{select_best, ExecutorGate, GateDecision};
pub use scanner::{CandidateOutcome, ScanReport, Scanner};

use crate::chain::QuoteSource;
use crate::price_cache::PriceCache;
use crate::types::Venue;
use ethers::types::U256;
use tracing::debug;

/// Observe the venue's base-asset reference price by quoting one whole base
/// unit into the primary stable on the first configured tier. A fresh
/// observation updates the cache; on failure the fallback chain is cached
/// value then the configured static price.
pub async fn reference_price(
    venue: &Venue,
    source: &dyn QuoteSource,
    cache: &PriceCache,
    probe_fee: u32,
) -> f64 {
    let one_base = U256::exp10(18);
    match source
        .quote_exact_input(venue.weth, venue.stable.address, one_base, probe_fee)
        .await
    {
        Ok(out) => {
            let price = out.as_u128() as f64 / 10f64.powi(venue.stable.decimals as i32);
            cache.update(&venue.name, price);
            price
        }
        Err(e) => {
            debug!("Reference quote failed on {}: {} - using fallback", venue.name, e);
            cache.price_or_fallback(&venue.name)
        }
    }
}
