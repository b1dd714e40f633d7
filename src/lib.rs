//! Multi-Chain DEX Scalper Bot Library
//!
//! Components for round-trip opportunity detection across Uniswap V3 venues
//! and serialized execution, with an HTTP control surface.
//!
//! Author: AI-Generated
//! Created: 2026-08-21

pub mod arbitrage;
pub mod chain;
pub mod config;
pub mod engine;
pub mod price_cache;
pub mod server;
pub mod types;

// Re-export commonly used types
pub use config::{load_config, ScalperConfig};
pub use engine::{Engine, EngineState, EngineStats};
pub use types::{Opportunity, Strategy, TradeOutcome, Venue};
