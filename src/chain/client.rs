//! Venue router client
//!
//! Wallet-side chain operations for one venue: balances, wrapping the native
//! asset, ERC20 approvals, and exactInputSingle swaps on the Uniswap V3
//! SwapRouter. One transaction per call; every call waits for one
//! confirmation and checks receipt status before returning.
//!
//! Author: AI-Generated
//! Created: 2026-08-21

use super::{SwapExecution, TxCost, VenueClient};
use crate::types::Leg;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ethers::prelude::*;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::timeout;
use tracing::{debug, info};

// Uniswap V3 SwapRouter ABI (exactInputSingle for single-hop swaps)
// ExactInputSingleParams: (tokenIn, tokenOut, fee, recipient, deadline, amountIn, amountOutMinimum, sqrtPriceLimitX96)
abigen!(
    ISwapRouter,
    r#"[{"inputs":[{"components":[{"internalType":"address","name":"tokenIn","type":"address"},{"internalType":"address","name":"tokenOut","type":"address"},{"internalType":"uint24","name":"fee","type":"uint24"},{"internalType":"address","name":"recipient","type":"address"},{"internalType":"uint256","name":"deadline","type":"uint256"},{"internalType":"uint256","name":"amountIn","type":"uint256"},{"internalType":"uint256","name":"amountOutMinimum","type":"uint256"},{"internalType":"uint160","name":"sqrtPriceLimitX96","type":"uint160"}],"internalType":"struct ISwapRouter.ExactInputSingleParams","name":"params","type":"tuple"}],"name":"exactInputSingle","outputs":[{"internalType":"uint256","name":"amountOut","type":"uint256"}],"stateMutability":"payable","type":"function"}]"#
);

// ERC20 ABI for approvals and balance reads
abigen!(
    IERC20,
    r#"[
        function approve(address spender, uint256 amount) external returns (bool)
        function allowance(address owner, address spender) external view returns (uint256)
        function balanceOf(address account) external view returns (uint256)
    ]"#
);

// Wrapped-native deposit interface (WETH9)
abigen!(
    IWETH9,
    r#"[
        function deposit() external payable
    ]"#
);

/// Signing client bound to one venue's router and wrapped-native contract
pub struct RouterClient<M: Middleware> {
    client: Arc<SignerMiddleware<M, LocalWallet>>,
    owner: Address,
    weth: Address,
    router: Address,
    rpc_timeout: Duration,
}

impl<M: Middleware + 'static> RouterClient<M> {
    pub fn new(
        provider: M,
        wallet: LocalWallet,
        chain_id: u64,
        weth: Address,
        router: Address,
        rpc_timeout: Duration,
    ) -> Self {
        let wallet = wallet.with_chain_id(chain_id);
        let owner = wallet.address();
        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        Self { client, owner, weth, router, rpc_timeout }
    }

    /// Send a built contract call, wait one confirmation, and reject reverts
    async fn send_and_confirm<D: ethers::abi::Detokenize>(
        &self,
        call: ContractCall<SignerMiddleware<M, LocalWallet>, D>,
        label: &str,
    ) -> Result<TransactionReceipt> {
        let pending = timeout(self.rpc_timeout, call.send())
            .await
            .map_err(|_| anyhow!("{} send timed out after {:?}", label, self.rpc_timeout))?
            .map_err(|e| anyhow!("{} send failed: {}", label, e))?;
        let tx_hash = pending.tx_hash();

        debug!("{} tx submitted: {:?}", label, tx_hash);

        let receipt = timeout(self.rpc_timeout, pending)
            .await
            .map_err(|_| anyhow!("{} confirmation timed out after {:?}", label, self.rpc_timeout))?
            .map_err(|e| anyhow!("{} confirmation failed: {}", label, e))?
            .ok_or_else(|| anyhow!("{}: no receipt returned", label))?;

        if receipt.status != Some(U64::from(1)) {
            return Err(anyhow!("{} transaction reverted: {:?}", label, tx_hash));
        }
        Ok(receipt)
    }
}

/// Receipt summary: (hash, gas_used, effective_gas_price)
fn receipt_cost(receipt: &TransactionReceipt) -> TxCost {
    TxCost {
        tx_hash: format!("{:?}", receipt.transaction_hash),
        gas_used: receipt.gas_used.unwrap_or_default(),
        effective_gas_price: receipt.effective_gas_price.unwrap_or_default(),
    }
}

#[async_trait]
impl<M: Middleware + 'static> VenueClient for RouterClient<M> {
    async fn native_balance(&self) -> Result<U256> {
        timeout(self.rpc_timeout, self.client.get_balance(self.owner, None))
            .await
            .map_err(|_| anyhow!("balance read timed out after {:?}", self.rpc_timeout))?
            .map_err(|e| anyhow!("balance read failed: {}", e))
    }

    async fn token_balance(&self, token: Address) -> Result<U256> {
        let erc20 = IERC20::new(token, self.client.clone());
        timeout(self.rpc_timeout, erc20.balance_of(self.owner).call())
            .await
            .map_err(|_| anyhow!("token balance read timed out after {:?}", self.rpc_timeout))?
            .map_err(|e| anyhow!("token balance read failed: {}", e))
    }

    async fn wrap_native(&self, amount: U256) -> Result<TxCost> {
        let weth = IWETH9::new(self.weth, self.client.clone());
        let call = weth.deposit().value(amount);

        info!("Wrapping {} wei into {:?}", amount, self.weth);
        let receipt = self.send_and_confirm(call, "wrap").await?;
        Ok(receipt_cost(&receipt))
    }

    async fn ensure_allowance(&self, token: Address, amount: U256) -> Result<Option<TxCost>> {
        let erc20 = IERC20::new(token, self.client.clone());

        let allowance = timeout(
            self.rpc_timeout,
            erc20.allowance(self.owner, self.router).call(),
        )
        .await
        .map_err(|_| anyhow!("allowance read timed out after {:?}", self.rpc_timeout))?
        .map_err(|e| anyhow!("allowance read failed: {}", e))?;

        if allowance >= amount {
            debug!("Sufficient allowance: {} >= {}", allowance, amount);
            return Ok(None);
        }

        // Approve max so later trades skip this transaction
        info!("Approving router {:?} for token {:?}", self.router, token);
        let call = erc20.approve(self.router, U256::MAX);
        let receipt = self.send_and_confirm(call, "approve").await?;
        Ok(Some(receipt_cost(&receipt)))
    }

    async fn swap_exact_input(
        &self,
        leg: &Leg,
        amount_in: U256,
        min_amount_out: U256,
    ) -> Result<SwapExecution> {
        let router = ISwapRouter::new(self.router, self.client.clone());

        // The router does not surface amountOut in the receipt, so measure it
        // as the recipient's balance delta across the swap.
        let balance_before = self.token_balance(leg.token_out).await?;

        let deadline = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| anyhow!("system clock before epoch: {}", e))?
            .as_secs()
            + 300;

        debug!(
            "Swap: {} {:?} -> {:?} (fee {}) min out {}",
            amount_in, leg.token_in, leg.token_out, leg.fee, min_amount_out
        );

        // sqrtPriceLimitX96 = 0 means no price limit (slippage bound via min out)
        let params = i_swap_router::ExactInputSingleParams {
            token_in: leg.token_in,
            token_out: leg.token_out,
            fee: leg.fee,
            recipient: self.owner,
            deadline: U256::from(deadline),
            amount_in,
            amount_out_minimum: min_amount_out,
            sqrt_price_limit_x96: U256::zero(),
        };

        let call = router.exact_input_single(params);
        let receipt = self.send_and_confirm(call, "swap").await?;

        let balance_after = self.token_balance(leg.token_out).await?;
        let amount_out = balance_after.saturating_sub(balance_before);

        let cost = receipt_cost(&receipt);
        info!("✅ Swap confirmed: {} | received {}", cost.tx_hash, amount_out);

        Ok(SwapExecution {
            tx_hash: cost.tx_hash,
            amount_out,
            gas_used: cost.gas_used,
            effective_gas_price: cost.effective_gas_price,
        })
    }
}
