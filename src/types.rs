//! Core data structures for the scalper bot
//!
//! Value objects shared by the scanner, ranker, and executor.
//! Amounts are integers in the token's smallest unit (wei for the base
//! asset); quote-currency values are f64 like the rest of the pipeline.
//!
//! Author: AI-Generated
//! Created: 2026-08-21

use chrono::{DateTime, Utc};
use ethers::types::{Address, I256, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stable token configured on a venue
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StableToken {
    pub address: Address,
    /// ERC20 decimals (USDC/USDT = 6, DAI = 18)
    pub decimals: u8,
}

/// A blockchain network plus its configured DEX contracts and tokens.
/// Immutable after config load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Venue {
    pub name: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub explorer: String,
    /// Wrapped native asset (WETH on Base/Arbitrum)
    pub weth: Address,
    /// Primary stable asset - defines the quote currency and reference price
    pub stable: StableToken,
    /// Second stable asset; enables the triangular route when present
    pub stable_b: Option<StableToken>,
    pub quoter: Address,
    pub router: Address,
    /// Lower rank scans first when venues are enumerated
    pub priority: u32,
}

impl Venue {
    /// Triangular routes need a second stable to hop through
    pub fn supports_triangular(&self) -> bool {
        self.stable_b.is_some()
    }
}

/// Strategy that produced an opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// Round trip across two fee tiers on one venue (base -> stable -> base)
    IntraVenue,
    /// Three-legged route through two stables (base -> sA -> sB -> base)
    Triangular,
    /// Cross-venue price divergence - informational only, never executable
    CrossVenueInfo,
}

impl Strategy {
    /// Only intra-venue and triangular opportunities can be dispatched.
    /// The bot has no cross-venue settlement capability.
    pub fn is_executable(&self) -> bool {
        !matches!(self, Strategy::CrossVenueInfo)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Strategy::IntraVenue => write!(f, "INTRA_VENUE"),
            Strategy::Triangular => write!(f, "TRIANGULAR"),
            Strategy::CrossVenueInfo => write!(f, "CROSS_VENUE-INFORMATIONAL"),
        }
    }
}

/// One atomic swap within a route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leg {
    pub token_in: Address,
    pub token_out: Address,
    /// Uniswap V3 fee tier (500 = 0.05%, 3000 = 0.30%)
    pub fee: u32,
}

/// A single quoter response
#[derive(Debug, Clone, Copy)]
pub struct Quote {
    pub amount_in: U256,
    pub amount_out: U256,
    pub fee: u32,
}

/// Extra detail carried by cross-venue informational records
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrossVenueDetail {
    /// Venue with the lower reference price
    pub cheap_venue: String,
    /// Venue with the higher reference price
    pub rich_venue: String,
    /// Absolute price gap in quote currency
    pub price_gap: f64,
    /// Divergence as a percent of the mean price
    pub spread_pct: f64,
}

/// A detected opportunity. Created by the scanner or comparator, read by
/// the ranker and executor, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
    pub venue: String,
    pub strategy: Strategy,
    /// Ordered swap legs; empty for cross-venue informational records
    pub legs: Vec<Leg>,
    /// Input amount in base-asset smallest units
    pub amount_in: U256,
    /// Output minus input, signed, base-asset smallest units
    pub gross_profit: I256,
    /// Flat gas estimate for the route, base-asset smallest units
    pub gas_estimate: U256,
    /// Gross minus gas estimate, signed
    pub net_profit: I256,
    /// Net profit converted at the captured reference price
    pub net_profit_quote: f64,
    /// floor(gross * 10000 / input); only meaningful when gross > 0
    pub spread_bps: u64,
    /// min(100, spread_bps * 5) intra-venue, min(100, spread_bps * 3) triangular
    pub confidence: u32,
    /// Reference price (quote per base) captured at scan time
    pub reference_price: f64,
    pub cross_venue: Option<CrossVenueDetail>,
    pub detected_at: DateTime<Utc>,
}

impl Opportunity {
    /// Executable = strategy allows dispatch AND quote-currency net profit
    /// meets the configured minimum.
    pub fn is_executable(&self, min_profit_quote: f64) -> bool {
        self.strategy.is_executable() && self.net_profit_quote >= min_profit_quote
    }

    /// Human-readable route tag for logs, e.g. "0.05%->0.30%"
    pub fn route_label(&self) -> String {
        if self.legs.is_empty() {
            return self.strategy.to_string();
        }
        self.legs
            .iter()
            .map(|l| format!("{:.2}%", l.fee as f64 / 10_000.0))
            .collect::<Vec<_>>()
            .join("->")
    }
}

/// Phase reached by an execution attempt. Transitions run strictly forward;
/// any phase can fall to Failed and nothing transitions back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionPhase {
    Idle,
    BalanceChecked,
    Wrapped,
    Leg1Submitted,
    Leg1Confirmed,
    Leg2Submitted,
    Leg2Confirmed,
    /// Third leg of a triangular route
    Leg3Submitted,
    Leg3Confirmed,
    Settled,
    Failed,
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ExecutionPhase::Idle => "Idle",
            ExecutionPhase::BalanceChecked => "BalanceChecked",
            ExecutionPhase::Wrapped => "Wrapped",
            ExecutionPhase::Leg1Submitted => "Leg1Submitted",
            ExecutionPhase::Leg1Confirmed => "Leg1Confirmed",
            ExecutionPhase::Leg2Submitted => "Leg2Submitted",
            ExecutionPhase::Leg2Confirmed => "Leg2Confirmed",
            ExecutionPhase::Leg3Submitted => "Leg3Submitted",
            ExecutionPhase::Leg3Confirmed => "Leg3Confirmed",
            ExecutionPhase::Settled => "Settled",
            ExecutionPhase::Failed => "Failed",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of one execution attempt. Appended to the engine's ring log,
/// never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub opportunity: Opportunity,
    pub success: bool,
    /// Final base balance minus original input, signed wei
    pub realized_profit: I256,
    pub realized_profit_quote: f64,
    /// Sum of each swap leg's gas_used * effective_gas_price, wei
    pub realized_gas: U256,
    pub realized_gas_quote: f64,
    pub realized_net_quote: f64,
    /// One transaction hash per confirmed leg, in order
    pub tx_hashes: Vec<String>,
    /// Furthest phase reached before settling or failing
    pub phase: ExecutionPhase,
    pub execution_time_ms: u64,
    pub error: Option<String>,
    pub executed_at: DateTime<Utc>,
}

/// Convert an unsigned wei amount to quote currency at the given price
pub fn wei_to_quote(wei: U256, price: f64) -> f64 {
    (wei.as_u128() as f64 / 1e18) * price
}

/// Convert a signed wei amount to quote currency at the given price
pub fn signed_wei_to_quote(wei: I256, price: f64) -> f64 {
    let (sign, magnitude) = wei.into_sign_and_abs();
    let value = (magnitude.as_u128() as f64 / 1e18) * price;
    match sign {
        ethers::types::Sign::Negative => -value,
        ethers::types::Sign::Positive => value,
    }
}

/// Signed difference of two unsigned amounts (out - in)
pub fn signed_diff(out: U256, input: U256) -> I256 {
    if out >= input {
        I256::from_raw(out - input)
    } else {
        -I256::from_raw(input - out)
    }
}
