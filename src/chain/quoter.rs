//! Uniswap V3 QuoterV2 quote source
//!
//! Issues `quoteExactInputSingle` static calls against the venue's QuoterV2
//! contract. QuoterV2 is declared non-view (it simulates the swap) so the
//! binding goes through `.call()` to force an eth_call.
//!
//! Author: AI-Generated
//! Created: 2026-08-21

use super::QuoteSource;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::prelude::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

// Uniswap V3 QuoterV2 ABI (quoteExactInputSingle only)
abigen!(
    IQuoterV2,
    r#"[{"inputs":[{"components":[{"internalType":"address","name":"tokenIn","type":"address"},{"internalType":"address","name":"tokenOut","type":"address"},{"internalType":"uint256","name":"amountIn","type":"uint256"},{"internalType":"uint24","name":"fee","type":"uint24"},{"internalType":"uint160","name":"sqrtPriceLimitX96","type":"uint160"}],"internalType":"struct IQuoterV2.QuoteExactInputSingleParams","name":"params","type":"tuple"}],"name":"quoteExactInputSingle","outputs":[{"internalType":"uint256","name":"amountOut","type":"uint256"},{"internalType":"uint160","name":"sqrtPriceX96After","type":"uint160"},{"internalType":"uint32","name":"initializedTicksCrossed","type":"uint32"},{"internalType":"uint256","name":"gasEstimate","type":"uint256"}],"stateMutability":"nonpayable","type":"function"}]"#
);

/// QuoterV2-backed quote source for one venue
pub struct UniV3QuoteSource<M: Middleware> {
    provider: Arc<M>,
    quoter: IQuoterV2<M>,
    rpc_timeout: Duration,
}

impl<M: Middleware + 'static> UniV3QuoteSource<M> {
    pub fn new(provider: Arc<M>, quoter_address: Address, rpc_timeout: Duration) -> Self {
        let quoter = IQuoterV2::new(quoter_address, Arc::clone(&provider));
        Self { provider, quoter, rpc_timeout }
    }
}

#[async_trait]
impl<M: Middleware + 'static> QuoteSource for UniV3QuoteSource<M> {
    async fn quote_exact_input(
        &self,
        token_in: Address,
        token_out: Address,
        amount_in: U256,
        fee: u32,
    ) -> Result<U256> {
        let params = i_quoter_v2::QuoteExactInputSingleParams {
            token_in,
            token_out,
            amount_in,
            fee,
            sqrt_price_limit_x96: U256::zero(), // 0 = no price limit
        };

        let call = self.quoter.quote_exact_input_single(params);
        let (amount_out, _, _, _) = timeout(self.rpc_timeout, call.call())
            .await
            .map_err(|_| anyhow!("quoter call timed out after {:?}", self.rpc_timeout))?
            .map_err(|e| anyhow!("quoter call failed: {}", e))?;

        debug!(
            "Quote: {} {:?} -> {:?} (fee {}) = {}",
            amount_in, token_in, token_out, fee, amount_out
        );

        Ok(amount_out)
    }

    async fn gas_price(&self) -> Result<U256> {
        timeout(self.rpc_timeout, self.provider.get_gas_price())
            .await
            .map_err(|_| anyhow!("gas price read timed out after {:?}", self.rpc_timeout))?
            .map_err(|e| anyhow!("gas price read failed: {}", e))
    }
}
