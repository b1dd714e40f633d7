//! Chain access seams
//!
//! Two traits isolate all RPC traffic so the scanner and executor can be
//! driven by mocks in tests:
//! - [`QuoteSource`]: read-only price quoting + network fee price
//! - [`VenueClient`]: wallet-side operations (balances, wrap, approve, swap)
//!
//! Every network call behind these traits is a suspension point and is
//! wrapped in an explicit timeout by the ethers-backed implementations.
//!
//! Author: AI-Generated
//! Created: 2026-08-21

pub mod client;
pub mod quoter;

use crate::types::Leg;
use anyhow::Result;
use async_trait::async_trait;
use ethers::types::{Address, U256};

pub use client::RouterClient;
pub use quoter::UniV3QuoteSource;

/// Read-only quoting capability for one venue
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Quote an exact-input single-pool swap. Returns the output amount in
    /// the output token's smallest unit.
    async fn quote_exact_input(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        fee: u32,
    ) -> Result<U256>;

    /// Current network fee price in wei
    async fn gas_price(&self) -> Result<U256>;
}

/// Receipt summary for a non-swap transaction (wrap, approve)
#[derive(Debug, Clone)]
pub struct TxCost {
    pub tx_hash: String,
    pub gas_used: U256,
    pub effective_gas_price: U256,
}

/// Receipt summary for a confirmed swap leg
#[derive(Debug, Clone)]
pub struct SwapExecution {
    pub tx_hash: String,
    pub amount_out: U256,
    pub gas_used: U256,
    pub effective_gas_price: U256,
}

/// Wallet-side operations for one venue. One transaction per call; the call
/// returns only after one confirmation.
#[async_trait]
pub trait VenueClient: Send + Sync {
    /// Spendable native-asset balance of the bot wallet
    async fn native_balance(&self) -> Result<U256>;

    /// ERC20 balance of the bot wallet
    async fn token_balance(&self, token: Address) -> Result<U256>;

    /// Deposit native asset into the wrapped-native contract
    async fn wrap_native(&self, amount: U256) -> Result<TxCost>;

    /// Grant the router allowance for `token` if the existing allowance is
    /// below `amount`. Returns None when no transaction was needed.
    async fn ensure_allowance(&self, token: Address, amount: U256) -> Result<Option<TxCost>>;

    /// Submit one exact-input swap leg and wait for confirmation
    async fn swap_exact_input(
        &self,
        leg: &Leg,
        amount_in: U256,
        min_amount_out: U256,
    ) -> Result<SwapExecution>;
}
