//! Opportunity scanner
//!
//! Per venue, enumerates candidate round-trip routes (trade size x fee-tier
//! pair for intra-venue, trade size with fixed tiers for triangular) and
//! prices each one through chained quoter calls. Candidates are evaluated
//! concurrently; each resolves to a typed outcome so dropped candidates stay
//! countable instead of disappearing into a catch-all.
//!
//! Author: AI-Generated
//! Created: 2026-08-21

use super::reference_price;
use crate::chain::QuoteSource;
use crate::price_cache::PriceCache;
use crate::types::{
    signed_diff, signed_wei_to_quote, Leg, Opportunity, Strategy, Venue,
};
use chrono::Utc;
use ethers::types::{I256, U256};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of pricing one candidate route
#[derive(Debug)]
pub enum CandidateOutcome {
    /// Qualifying opportunity (net > 0 and quote-currency net >= minimum)
    Hit(Opportunity),
    /// Quotes resolved but the route does not qualify
    Miss,
    /// A quote request failed; the candidate is dropped, the scan continues
    Failed(String),
}

/// Aggregated scan result for one venue
#[derive(Debug, Default)]
pub struct ScanReport {
    pub venue: String,
    pub opportunities: Vec<Opportunity>,
    pub misses: usize,
    pub failures: usize,
    /// Venue-level failure (fee-price read) - nothing was scanned
    pub aborted: bool,
}

impl ScanReport {
    fn empty(venue: &str) -> Self {
        Self { venue: venue.to_string(), ..Default::default() }
    }
}

/// Candidate route descriptor, expanded before quoting
enum Candidate {
    Intra { size: U256, fee_in: u32, fee_out: u32 },
    Triangular { size: U256 },
}

/// Scans venues for profitable round-trip routes
pub struct Scanner {
    trade_sizes: Vec<U256>,
    fee_tiers: Vec<u32>,
    triangular_fees: [u32; 3],
    gas_units_per_swap: u64,
    max_gas_price_gwei: u64,
    min_profit_quote: f64,
    price_cache: Arc<PriceCache>,
}

impl Scanner {
    pub fn new(config: &crate::config::ScalperConfig, price_cache: Arc<PriceCache>) -> Self {
        Self {
            trade_sizes: config.trade_sizes_wei.clone(),
            fee_tiers: config.fee_tiers.clone(),
            triangular_fees: config.triangular_fees,
            gas_units_per_swap: config.gas_units_per_swap,
            max_gas_price_gwei: config.max_gas_price_gwei,
            min_profit_quote: config.min_profit_quote,
            price_cache,
        }
    }

    /// Scan one venue. Never returns an error: venue-level failures come
    /// back as an aborted report, candidate failures as counts.
    pub async fn scan(&self, venue: &Venue, source: &dyn QuoteSource) -> ScanReport {
        let mut report = ScanReport::empty(&venue.name);

        // Cost gate first: an expensive network makes every route unprofitable
        let fee_price = match source.gas_price().await {
            Ok(p) => p,
            Err(e) => {
                warn!("Fee price read failed on {}: {} - venue skipped this tick", venue.name, e);
                report.aborted = true;
                return report;
            }
        };
        let ceiling = U256::from(self.max_gas_price_gwei) * U256::exp10(9);
        if fee_price > ceiling {
            debug!(
                "Fee price {} gwei above ceiling {} gwei on {} - scan skipped",
                fee_price / U256::exp10(9),
                self.max_gas_price_gwei,
                venue.name
            );
            return report;
        }

        // Flat per-route gas estimate; triangular approximates a third leg
        let flat_gas = fee_price * U256::from(self.gas_units_per_swap);
        let triangular_gas = flat_gas * U256::from(3u8) / U256::from(2u8);

        let ref_price =
            reference_price(venue, source, &self.price_cache, self.fee_tiers[0]).await;

        let mut candidates = Vec::new();
        for &size in &self.trade_sizes {
            for &fee_in in &self.fee_tiers {
                for &fee_out in &self.fee_tiers {
                    if fee_in != fee_out {
                        candidates.push(Candidate::Intra { size, fee_in, fee_out });
                    }
                }
            }
            if venue.supports_triangular() {
                candidates.push(Candidate::Triangular { size });
            }
        }

        let outcomes = join_all(candidates.into_iter().map(|candidate| {
            self.evaluate(venue, source, candidate, flat_gas, triangular_gas, ref_price)
        }))
        .await;

        for outcome in outcomes {
            match outcome {
                CandidateOutcome::Hit(opp) => {
                    info!(
                        "💰 {} {} on {} | net ${:.4} | spread {} bps | confidence {}",
                        opp.strategy,
                        opp.route_label(),
                        venue.name,
                        opp.net_profit_quote,
                        opp.spread_bps,
                        opp.confidence
                    );
                    report.opportunities.push(opp);
                }
                CandidateOutcome::Miss => report.misses += 1,
                CandidateOutcome::Failed(reason) => {
                    debug!("Candidate dropped on {}: {}", venue.name, reason);
                    report.failures += 1;
                }
            }
        }
        report
    }

    async fn evaluate(
        &self,
        venue: &Venue,
        source: &dyn QuoteSource,
        candidate: Candidate,
        flat_gas: U256,
        triangular_gas: U256,
        ref_price: f64,
    ) -> CandidateOutcome {
        match candidate {
            Candidate::Intra { size, fee_in, fee_out } => {
                self.evaluate_intra(venue, source, size, fee_in, fee_out, flat_gas, ref_price)
                    .await
            }
            Candidate::Triangular { size } => {
                self.evaluate_triangular(venue, source, size, triangular_gas, ref_price)
                    .await
            }
        }
    }

    /// Round trip base -> stable -> base across two distinct fee tiers
    async fn evaluate_intra(
        &self,
        venue: &Venue,
        source: &dyn QuoteSource,
        size: U256,
        fee_in: u32,
        fee_out: u32,
        gas_estimate: U256,
        ref_price: f64,
    ) -> CandidateOutcome {
        let stable = venue.stable.address;

        let forward = match source
            .quote_exact_input(venue.weth, stable, size, fee_in)
            .await
        {
            Ok(out) => out,
            Err(e) => return CandidateOutcome::Failed(format!("forward quote: {}", e)),
        };
        // Return leg sized off the forward quote's output
        let returned = match source
            .quote_exact_input(stable, venue.weth, forward, fee_out)
            .await
        {
            Ok(out) => out,
            Err(e) => return CandidateOutcome::Failed(format!("return quote: {}", e)),
        };

        let legs = vec![
            Leg { token_in: venue.weth, token_out: stable, fee: fee_in },
            Leg { token_in: stable, token_out: venue.weth, fee: fee_out },
        ];
        self.qualify(venue, Strategy::IntraVenue, legs, size, returned, gas_estimate, ref_price)
    }

    /// Three-legged route base -> stableA -> stableB -> base on fixed tiers
    async fn evaluate_triangular(
        &self,
        venue: &Venue,
        source: &dyn QuoteSource,
        size: U256,
        gas_estimate: U256,
        ref_price: f64,
    ) -> CandidateOutcome {
        let stable_b = match &venue.stable_b {
            Some(s) => s.address,
            None => return CandidateOutcome::Miss,
        };
        let stable_a = venue.stable.address;
        let [fee_a, fee_b, fee_c] = self.triangular_fees;

        let out_a = match source
            .quote_exact_input(venue.weth, stable_a, size, fee_a)
            .await
        {
            Ok(out) => out,
            Err(e) => return CandidateOutcome::Failed(format!("leg 1 quote: {}", e)),
        };
        let out_b = match source
            .quote_exact_input(stable_a, stable_b, out_a, fee_b)
            .await
        {
            Ok(out) => out,
            Err(e) => return CandidateOutcome::Failed(format!("leg 2 quote: {}", e)),
        };
        let returned = match source
            .quote_exact_input(stable_b, venue.weth, out_b, fee_c)
            .await
        {
            Ok(out) => out,
            Err(e) => return CandidateOutcome::Failed(format!("leg 3 quote: {}", e)),
        };

        let legs = vec![
            Leg { token_in: venue.weth, token_out: stable_a, fee: fee_a },
            Leg { token_in: stable_a, token_out: stable_b, fee: fee_b },
            Leg { token_in: stable_b, token_out: venue.weth, fee: fee_c },
        ];
        self.qualify(venue, Strategy::Triangular, legs, size, returned, gas_estimate, ref_price)
    }

    /// Apply the profitability inequalities and build the opportunity
    #[allow(clippy::too_many_arguments)]
    fn qualify(
        &self,
        venue: &Venue,
        strategy: Strategy,
        legs: Vec<Leg>,
        amount_in: U256,
        returned: U256,
        gas_estimate: U256,
        ref_price: f64,
    ) -> CandidateOutcome {
        let gross_profit = signed_diff(returned, amount_in);
        let net_profit = gross_profit - I256::from_raw(gas_estimate);
        if net_profit <= I256::zero() {
            return CandidateOutcome::Miss;
        }
        let net_profit_quote = signed_wei_to_quote(net_profit, ref_price);
        if net_profit_quote < self.min_profit_quote {
            return CandidateOutcome::Miss;
        }

        // net > 0 implies gross > 0, so the unsigned ratio is safe
        let bps = spread_bps(gross_profit.into_raw(), amount_in);
        let multiplier = match strategy {
            Strategy::IntraVenue => 5,
            Strategy::Triangular => 3,
            Strategy::CrossVenueInfo => 0,
        };

        CandidateOutcome::Hit(Opportunity {
            venue: venue.name.clone(),
            strategy,
            legs,
            amount_in,
            gross_profit,
            gas_estimate,
            net_profit,
            net_profit_quote,
            spread_bps: bps,
            confidence: confidence(bps, multiplier),
            reference_price: ref_price,
            cross_venue: None,
            detected_at: Utc::now(),
        })
    }
}

/// floor(gross * 10000 / input), integer math on the ratio numerator
fn spread_bps(gross: U256, input: U256) -> u64 {
    if input.is_zero() {
        return 0;
    }
    (gross * U256::from(10_000u64) / input).as_u64()
}

fn confidence(spread_bps: u64, multiplier: u64) -> u32 {
    spread_bps.saturating_mul(multiplier).min(100) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScalperConfig;
    use crate::types::StableToken;
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use ethers::types::Address;
    use std::collections::HashMap;

    /// Quote source with fixed proportional rates per (in, out, fee) route.
    /// Unknown routes fail, which exercises the candidate-drop path.
    struct MockQuotes {
        /// (token_in, token_out, fee) -> (numerator, denominator)
        rates: HashMap<(Address, Address, u32), (U256, U256)>,
        gas_price_wei: U256,
    }

    #[async_trait]
    impl QuoteSource for MockQuotes {
        async fn quote_exact_input(
            &self,
            token_in: Address,
            token_out: Address,
            amount_in: U256,
            fee: u32,
        ) -> Result<U256> {
            match self.rates.get(&(token_in, token_out, fee)) {
                Some(&(num, den)) => Ok(amount_in * num / den),
                None => Err(anyhow!("no pool for route")),
            }
        }

        async fn gas_price(&self) -> Result<U256> {
            Ok(self.gas_price_wei)
        }
    }

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn test_venue() -> Venue {
        Venue {
            name: "base".to_string(),
            chain_id: 8453,
            rpc_url: "http://localhost:8545".to_string(),
            explorer: "https://basescan.org".to_string(),
            weth: addr(1),
            stable: StableToken { address: addr(2), decimals: 6 },
            stable_b: None,
            quoter: addr(3),
            router: addr(4),
            priority: 0,
        }
    }

    fn test_config() -> ScalperConfig {
        ScalperConfig {
            private_key: String::new(),
            wallet_address: Address::zero(),
            venues: vec![],
            scan_interval_ms: 5000,
            // one size: 0.01 base units
            trade_sizes_wei: vec![U256::exp10(16)],
            fee_tiers: vec![500, 3000],
            triangular_fees: [500, 100, 3000],
            gas_units_per_swap: 250_000,
            max_gas_price_gwei: 20,
            fallback_ref_price: 3500.0,
            compare_interval_ticks: 5,
            balance_refresh_ticks: 5,
            min_active_balance_wei: U256::exp10(15),
            min_profit_quote: 0.10,
            max_slippage_bps: 50,
            max_concurrent_executions: 2,
            balance_safety_buffer_wei: U256::zero(),
            auto_execute: false,
            rpc_timeout_ms: 30_000,
            port: 3101,
        }
    }

    fn scanner() -> Scanner {
        Scanner::new(&test_config(), Arc::new(PriceCache::new(3500.0)))
    }

    /// Profitable tier pair (500 -> 3000): 0.01 base in, 0.012 base back
    fn profitable_rates() -> HashMap<(Address, Address, u32), (U256, U256)> {
        let weth = addr(1);
        let stable = addr(2);
        let mut rates = HashMap::new();
        // 1 base = 3500.00 stable (6 decimals) on tier 500
        rates.insert((weth, stable, 500), (U256::from(3_500_000_000u64), U256::exp10(18)));
        // return on tier 3000: 35.00 stable -> 0.012 base
        rates.insert((stable, weth, 3000), (U256::from(12_000_000_000_000_000u64), U256::from(35_000_000u64)));
        rates
    }

    #[tokio::test]
    async fn test_scenario_profitable_pair_emits_one_opportunity() {
        let source = MockQuotes {
            rates: profitable_rates(),
            gas_price_wei: U256::from(5u64) * U256::exp10(9), // 5 gwei
        };
        let report = scanner().scan(&test_venue(), &source).await;

        assert!(!report.aborted);
        assert_eq!(report.opportunities.len(), 1);
        // the reverse pair (3000 -> 500) has no pools and drops
        assert_eq!(report.failures, 1);

        let opp = &report.opportunities[0];
        assert_eq!(opp.strategy, Strategy::IntraVenue);
        assert_eq!(opp.legs.len(), 2);
        assert_eq!(opp.legs[0].fee, 500);
        assert_eq!(opp.legs[1].fee, 3000);

        // gross = 0.012 - 0.01 = 0.002 base; gas = 5 gwei * 250k = 0.00125
        assert_eq!(opp.gross_profit, I256::from(2_000_000_000_000_000i64));
        assert_eq!(opp.gas_estimate, U256::from(1_250_000_000_000_000u64));
        assert_eq!(opp.net_profit, I256::from(750_000_000_000_000i64));
        // spread = floor(0.002 * 10000 / 0.01) = 2000 bps, capped confidence
        assert_eq!(opp.spread_bps, 2000);
        assert_eq!(opp.confidence, 100);
        // reference probe resolved 3500.00
        assert!((opp.reference_price - 3500.0).abs() < 1e-9);
        assert!(opp.net_profit_quote > 0.10);
    }

    #[tokio::test]
    async fn test_scenario_fee_price_above_ceiling_skips_scan() {
        let source = MockQuotes {
            rates: profitable_rates(),
            gas_price_wei: U256::from(25u64) * U256::exp10(9), // above 20 gwei ceiling
        };
        let report = scanner().scan(&test_venue(), &source).await;

        assert!(!report.aborted);
        assert!(report.opportunities.is_empty());
        assert_eq!(report.failures, 0);
        assert_eq!(report.misses, 0);
    }

    #[tokio::test]
    async fn test_fee_price_read_failure_aborts_venue() {
        struct Broken;
        #[async_trait]
        impl QuoteSource for Broken {
            async fn quote_exact_input(&self, _: Address, _: Address, _: U256, _: u32) -> Result<U256> {
                Err(anyhow!("down"))
            }
            async fn gas_price(&self) -> Result<U256> {
                Err(anyhow!("rpc unreachable"))
            }
        }
        let report = scanner().scan(&test_venue(), &Broken).await;
        assert!(report.aborted);
        assert!(report.opportunities.is_empty());
    }

    #[tokio::test]
    async fn test_emitted_opportunities_satisfy_profit_inequalities() {
        let mut rates = profitable_rates();
        // make the 3000 -> 500 direction quotable but barely unprofitable
        let weth = addr(1);
        let stable = addr(2);
        rates.insert((weth, stable, 3000), (U256::from(3_500_000_000u64), U256::exp10(18)));
        rates.insert((stable, weth, 500), (U256::exp10(18), U256::from(3_500_000_000u64)));

        let source = MockQuotes {
            rates,
            gas_price_wei: U256::from(5u64) * U256::exp10(9),
        };
        let config = test_config();
        let report = scanner().scan(&test_venue(), &source).await;

        for opp in &report.opportunities {
            assert!(opp.net_profit > I256::zero());
            assert!(opp.net_profit_quote >= config.min_profit_quote);
            assert_eq!(opp.net_profit, opp.gross_profit - I256::from_raw(opp.gas_estimate));
        }
        // break-even round trip minus gas is a miss, not an emission
        assert_eq!(report.opportunities.len(), 1);
        assert_eq!(report.misses, 1);
    }

    #[tokio::test]
    async fn test_triangular_route_uses_fixed_tiers_and_3x_multiplier() {
        let weth = addr(1);
        let stable_a = addr(2);
        let stable_b = addr(5);

        let mut venue = test_venue();
        venue.stable_b = Some(StableToken { address: stable_b, decimals: 6 });

        let mut rates = HashMap::new();
        rates.insert((weth, stable_a, 500), (U256::from(3_500_000_000u64), U256::exp10(18)));
        // stableA -> stableB at 1.0033
        rates.insert((stable_a, stable_b, 100), (U256::from(10_033u64), U256::from(10_000u64)));
        // stableB -> base at the forward rate
        rates.insert((stable_b, weth, 3000), (U256::exp10(18), U256::from(3_500_000_000u64)));

        let source = MockQuotes {
            rates,
            gas_price_wei: U256::from(400u64), // near-free gas keeps the spread visible
        };
        let report = scanner().scan(&venue, &source).await;

        let tri: Vec<_> = report
            .opportunities
            .iter()
            .filter(|o| o.strategy == Strategy::Triangular)
            .collect();
        assert_eq!(tri.len(), 1);

        let opp = tri[0];
        assert_eq!(opp.legs.len(), 3);
        assert_eq!(opp.legs[0].fee, 500);
        assert_eq!(opp.legs[1].fee, 100);
        assert_eq!(opp.legs[2].fee, 3000);
        // 1.5x the two-leg estimate: 400 wei * 250k * 3 / 2
        assert_eq!(opp.gas_estimate, U256::from(150_000_000u64));
        // round trip 1e16 -> 1.0033e16: gross 3.3e13, 33 bps, x3 multiplier
        assert_eq!(opp.gross_profit, I256::from(33_000_000_000_000i64));
        assert_eq!(opp.spread_bps, 33);
        assert_eq!(opp.confidence, 99);
    }

    #[test]
    fn test_spread_bps_integer_math() {
        // floor(gross * 10000 / input)
        assert_eq!(spread_bps(U256::from(2u64), U256::from(10_000u64)), 2);
        assert_eq!(spread_bps(U256::from(999u64), U256::from(1_000_000u64)), 9);
        assert_eq!(spread_bps(U256::from(1u64), U256::from(10_001u64)), 0);
        assert_eq!(spread_bps(U256::zero(), U256::from(5u64)), 0);
        assert_eq!(spread_bps(U256::from(5u64), U256::zero()), 0);
    }

    #[test]
    fn test_confidence_multipliers_and_cap() {
        assert_eq!(confidence(10, 5), 50);
        assert_eq!(confidence(10, 3), 30);
        assert_eq!(confidence(20, 5), 100);
        assert_eq!(confidence(2000, 5), 100);
        assert_eq!(confidence(34, 3), 100);
        assert_eq!(confidence(33, 3), 99);
    }
}
