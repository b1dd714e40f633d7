//! Cross-venue price comparator
//!
//! Flags reference-price divergence between venue pairs. The bot holds no
//! cross-chain settlement path, so these records are informational only and
//! never executable. Runs on a reduced cadence to bound RPC load.
//!
//! Author: AI-Generated
//! Created: 2026-08-21

use super::reference_price;
use crate::chain::QuoteSource;
use crate::price_cache::PriceCache;
use crate::types::{CrossVenueDetail, Opportunity, Strategy, Venue};
use chrono::Utc;
use ethers::types::{I256, U256};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Divergence threshold in percent of the mean price
const SPREAD_THRESHOLD_PCT: f64 = 0.1;

pub struct Comparator {
    price_cache: Arc<PriceCache>,
    probe_fee: u32,
}

impl Comparator {
    pub fn new(price_cache: Arc<PriceCache>, probe_fee: u32) -> Self {
        Self { price_cache, probe_fee }
    }

    /// Compare every unordered venue pair; emit one informational record per
    /// pair whose reference prices diverge beyond the threshold.
    pub async fn compare_all(
        &self,
        venues: &[Venue],
        sources: &HashMap<String, Arc<dyn QuoteSource>>,
    ) -> Vec<Opportunity> {
        let prices: Vec<(String, f64)> = join_all(venues.iter().filter_map(|venue| {
            let source = sources.get(&venue.name)?;
            Some(async move {
                let price =
                    reference_price(venue, source.as_ref(), &self.price_cache, self.probe_fee)
                        .await;
                (venue.name.clone(), price)
            })
        }))
        .await;

        let mut records = Vec::new();
        for i in 0..prices.len() {
            for j in (i + 1)..prices.len() {
                let (name_a, price_a) = (&prices[i].0, prices[i].1);
                let (name_b, price_b) = (&prices[j].0, prices[j].1);
                let mean = (price_a + price_b) / 2.0;
                if mean <= 0.0 {
                    continue;
                }
                let gap = (price_a - price_b).abs();
                let spread_pct = gap / mean * 100.0;
                if spread_pct <= SPREAD_THRESHOLD_PCT {
                    continue;
                }

                let (cheap, rich) = if price_a < price_b {
                    (name_a.clone(), name_b.clone())
                } else {
                    (name_b.clone(), name_a.clone())
                };
                info!(
                    "🌐 Cross-venue gap: {} < {} by ${:.2} ({:.4}%)",
                    cheap, rich, gap, spread_pct
                );
                records.push(Opportunity {
                    venue: format!("{}<->{}", name_a, name_b),
                    strategy: Strategy::CrossVenueInfo,
                    legs: Vec::new(),
                    amount_in: U256::zero(),
                    gross_profit: I256::zero(),
                    gas_estimate: U256::zero(),
                    net_profit: I256::zero(),
                    net_profit_quote: 0.0,
                    spread_bps: (spread_pct * 100.0) as u64,
                    confidence: 0,
                    reference_price: mean,
                    cross_venue: Some(CrossVenueDetail {
                        cheap_venue: cheap,
                        rich_venue: rich,
                        price_gap: gap,
                        spread_pct,
                    }),
                    detected_at: Utc::now(),
                });
            }
        }
        records
    }
}
