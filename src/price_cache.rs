//! Reference price cache
//!
//! Per-venue last observed base-asset price in quote currency. Overwritten
//! on every successful quote, read as a fallback when a fresh quote fails.
//! Never explicitly invalidated - on persistent quote failure the cached
//! value goes stale without bound, and the configured static price is the
//! last resort. Quoting never blocks on price unavailability.
//!
//! Author: AI-Generated
//! Created: 2026-08-21

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy)]
pub struct PriceSample {
    pub price: f64,
    pub observed_at: DateTime<Utc>,
}

/// Shared cache of reference prices, keyed by venue name
#[derive(Debug, Default)]
pub struct PriceCache {
    samples: RwLock<HashMap<String, PriceSample>>,
    /// Static price used when a venue has never produced a quote
    fallback_price: f64,
}

impl PriceCache {
    pub fn new(fallback_price: f64) -> Self {
        Self {
            samples: RwLock::new(HashMap::new()),
            fallback_price,
        }
    }

    /// Record a freshly observed price for a venue
    pub fn update(&self, venue: &str, price: f64) {
        let mut samples = self.samples.write().expect("price cache lock poisoned");
        samples.insert(
            venue.to_string(),
            PriceSample { price, observed_at: Utc::now() },
        );
    }

    /// Last observed sample, if the venue ever produced one
    pub fn get(&self, venue: &str) -> Option<PriceSample> {
        let samples = self.samples.read().expect("price cache lock poisoned");
        samples.get(venue).copied()
    }

    /// Fallback chain: cached sample if present, else the static price
    pub fn price_or_fallback(&self, venue: &str) -> f64 {
        self.get(venue).map(|s| s.price).unwrap_or(self.fallback_price)
    }
}
