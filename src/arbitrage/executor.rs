//! Trade executor
//!
//! Runs one opportunity's swap sequence against a venue: balance check,
//! wrap, allowance, then the legs strictly in order with each leg sized off
//! the actual balance observed after the previous one. No retry and no
//! compensation - a failed leg leaves funds where they landed and the
//! outcome records how far execution got.
//!
//! Concurrency is bounded by a counting semaphore; at the ceiling the call
//! returns a skip verdict without touching the chain.
//!
//! Author: AI-Generated
//! Created: 2026-08-21

use crate::chain::{QuoteSource, VenueClient};
use crate::types::{
    signed_diff, signed_wei_to_quote, wei_to_quote, ExecutionPhase, Opportunity, TradeOutcome,
};
use chrono::Utc;
use ethers::types::U256;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Why an execution request was turned away without running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// In-flight executions already at the configured ceiling
    AtCeiling,
    /// Informational strategies cannot be dispatched
    NotExecutable,
}

/// Result of an execution request
#[derive(Debug)]
pub enum ExecutionVerdict {
    Skipped(SkipReason),
    Completed(TradeOutcome),
}

#[derive(Debug, Error)]
enum ExecutionError {
    #[error("insufficient balance: have {have} wei, need {need} wei")]
    InsufficientBalance { have: U256, need: U256 },
    #[error("{message}")]
    Step { message: String },
}

/// Mutable progress shared between the step sequence and outcome assembly
struct Attempt {
    phase: ExecutionPhase,
    tx_hashes: Vec<String>,
    /// Sum of per-leg gas_used x effective_gas_price
    realized_gas: U256,
}

pub struct Executor {
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    max_slippage_bps: u32,
    balance_safety_buffer: U256,
}

impl Executor {
    pub fn new(max_concurrent: usize, max_slippage_bps: u32, balance_safety_buffer: U256) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            max_slippage_bps,
            balance_safety_buffer,
        }
    }

    /// Executions currently holding a permit
    pub fn in_flight(&self) -> usize {
        self.max_concurrent - self.semaphore.available_permits()
    }

    /// Execute one opportunity. The semaphore permit is scoped to this call,
    /// so release happens on every exit path.
    pub async fn execute(
        &self,
        opportunity: &Opportunity,
        client: &dyn VenueClient,
        quoter: &dyn QuoteSource,
    ) -> ExecutionVerdict {
        if !opportunity.strategy.is_executable() {
            return ExecutionVerdict::Skipped(SkipReason::NotExecutable);
        }
        let _permit = match self.semaphore.try_acquire() {
            Ok(permit) => permit,
            Err(_) => {
                info!(
                    "Execution slot full - skipping {} on {}",
                    opportunity.strategy, opportunity.venue
                );
                return ExecutionVerdict::Skipped(SkipReason::AtCeiling);
            }
        };

        info!(
            "🚀 Executing {} {} on {} | expected net ${:.4}",
            opportunity.strategy,
            opportunity.route_label(),
            opportunity.venue,
            opportunity.net_profit_quote
        );

        let started = Instant::now();
        let mut attempt = Attempt {
            phase: ExecutionPhase::Idle,
            tx_hashes: Vec::new(),
            realized_gas: U256::zero(),
        };
        let result = self.run_steps(opportunity, client, quoter, &mut attempt).await;

        let price = opportunity.reference_price;
        let realized_gas_quote = wei_to_quote(attempt.realized_gas, price);
        let outcome = match result {
            Ok(final_balance) => {
                let realized_profit = signed_diff(final_balance, opportunity.amount_in);
                let realized_profit_quote = signed_wei_to_quote(realized_profit, price);
                let realized_net_quote = realized_profit_quote - realized_gas_quote;
                if realized_net_quote >= 0.0 {
                    info!(
                        "🎉 Settled: net ${:.4} (gross ${:.4}, gas ${:.4})",
                        realized_net_quote, realized_profit_quote, realized_gas_quote
                    );
                } else {
                    warn!(
                        "📉 Settled at a loss: net ${:.4} (gross ${:.4}, gas ${:.4})",
                        realized_net_quote, realized_profit_quote, realized_gas_quote
                    );
                }
                TradeOutcome {
                    opportunity: opportunity.clone(),
                    success: true,
                    realized_profit,
                    realized_profit_quote,
                    realized_gas: attempt.realized_gas,
                    realized_gas_quote,
                    realized_net_quote,
                    tx_hashes: attempt.tx_hashes,
                    phase: ExecutionPhase::Settled,
                    execution_time_ms: started.elapsed().as_millis() as u64,
                    error: None,
                    executed_at: Utc::now(),
                }
            }
            Err(e) => {
                warn!("❌ Execution failed at {}: {}", attempt.phase, e);
                TradeOutcome {
                    opportunity: opportunity.clone(),
                    success: false,
                    realized_profit: ethers::types::I256::zero(),
                    realized_profit_quote: 0.0,
                    realized_gas: attempt.realized_gas,
                    realized_gas_quote,
                    realized_net_quote: -realized_gas_quote,
                    tx_hashes: attempt.tx_hashes,
                    phase: attempt.phase,
                    execution_time_ms: started.elapsed().as_millis() as u64,
                    error: Some(e.to_string()),
                    executed_at: Utc::now(),
                }
            }
        };
        ExecutionVerdict::Completed(outcome)
    }

    /// Steps 1-8, strictly sequential, no rollback. Returns the final
    /// base-asset token balance for realized-profit accounting.
    async fn run_steps(
        &self,
        opportunity: &Opportunity,
        client: &dyn VenueClient,
        quoter: &dyn QuoteSource,
        attempt: &mut Attempt,
    ) -> Result<U256, ExecutionError> {
        let step = |message: String| ExecutionError::Step { message };

        // 1. spendable balance must cover input plus the safety buffer
        let need = opportunity.amount_in + self.balance_safety_buffer;
        let have = client
            .native_balance()
            .await
            .map_err(|e| step(format!("balance read: {}", e)))?;
        if have < need {
            return Err(ExecutionError::InsufficientBalance { have, need });
        }
        attempt.phase = ExecutionPhase::BalanceChecked;

        // 2. wrap the input
        client
            .wrap_native(opportunity.amount_in)
            .await
            .map_err(|e| step(format!("wrap: {}", e)))?;
        attempt.phase = ExecutionPhase::Wrapped;

        // 3-7. each leg: allowance if needed, fresh quote for the slippage
        // bound, swap, then re-read the actual balance for the next leg
        let mut amount = opportunity.amount_in;
        for (index, leg) in opportunity.legs.iter().enumerate() {
            client
                .ensure_allowance(leg.token_in, amount)
                .await
                .map_err(|e| step(format!("allowance leg {}: {}", index + 1, e)))?;

            let quoted = quoter
                .quote_exact_input(leg.token_in, leg.token_out, amount, leg.fee)
                .await
                .map_err(|e| step(format!("quote leg {}: {}", index + 1, e)))?;
            let min_out = min_output(quoted, self.max_slippage_bps);

            attempt.phase = leg_submitted(index);
            let executed = client
                .swap_exact_input(leg, amount, min_out)
                .await
                .map_err(|e| step(format!("swap leg {}: {}", index + 1, e)))?;
            attempt.realized_gas =
                attempt.realized_gas + executed.gas_used * executed.effective_gas_price;
            attempt.tx_hashes.push(executed.tx_hash);
            attempt.phase = leg_confirmed(index);

            // actual balance, not the quoted estimate - partial fills happen
            amount = client
                .token_balance(leg.token_out)
                .await
                .map_err(|e| step(format!("balance after leg {}: {}", index + 1, e)))?;
        }

        attempt.phase = ExecutionPhase::Settled;
        Ok(amount)
    }
}

/// quoted x (10000 - slippageBps) / 10000, integer division
fn min_output(quoted: U256, slippage_bps: u32) -> U256 {
    quoted * U256::from(10_000u32 - slippage_bps) / U256::from(10_000u32)
}

fn leg_submitted(index: usize) -> ExecutionPhase {
    match index {
        0 => ExecutionPhase::Leg1Submitted,
        1 => ExecutionPhase::Leg2Submitted,
        _ => ExecutionPhase::Leg3Submitted,
    }
}

fn leg_confirmed(index: usize) -> ExecutionPhase {
    match index {
        0 => ExecutionPhase::Leg1Confirmed,
        1 => ExecutionPhase::Leg2Confirmed,
        _ => ExecutionPhase::Leg3Confirmed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{SwapExecution, TxCost};
    use crate::types::{Leg, Strategy};
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use ethers::types::{Address, I256};
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    fn weth() -> Address {
        addr(1)
    }
    fn stable() -> Address {
        addr(2)
    }
    fn stable_b() -> Address {
        addr(3)
    }

    fn triangular_opportunity() -> Opportunity {
        Opportunity {
            venue: "base".to_string(),
            strategy: Strategy::Triangular,
            legs: vec![
                Leg { token_in: weth(), token_out: stable(), fee: 500 },
                Leg { token_in: stable(), token_out: stable_b(), fee: 100 },
                Leg { token_in: stable_b(), token_out: weth(), fee: 3000 },
            ],
            amount_in: U256::exp10(16),
            gross_profit: I256::from(33_000_000_000_000i64),
            gas_estimate: U256::from(15_000_000_000_000u64),
            net_profit: I256::from(18_000_000_000_000i64),
            net_profit_quote: 0.063,
            spread_bps: 33,
            confidence: 99,
            reference_price: 3500.0,
            cross_venue: None,
            detected_at: Utc::now(),
        }
    }

    fn opportunity() -> Opportunity {
        Opportunity {
            venue: "base".to_string(),
            strategy: Strategy::IntraVenue,
            legs: vec![
                Leg { token_in: weth(), token_out: stable(), fee: 500 },
                Leg { token_in: stable(), token_out: weth(), fee: 3000 },
            ],
            amount_in: U256::exp10(16), // 0.01 base
            gross_profit: I256::from(200_000_000_000_000i64),
            gas_estimate: U256::from(10_000_000_000_000u64),
            net_profit: I256::from(190_000_000_000_000i64),
            net_profit_quote: 0.66,
            spread_bps: 200,
            confidence: 100,
            reference_price: 3500.0,
            cross_venue: None,
            detected_at: Utc::now(),
        }
    }

    /// Quotes the input amount back 1:1 - slippage math stays transparent
    struct IdentityQuoter;

    #[async_trait]
    impl QuoteSource for IdentityQuoter {
        async fn quote_exact_input(&self, _: Address, _: Address, amount: U256, _: u32) -> Result<U256> {
            Ok(amount)
        }
        async fn gas_price(&self) -> Result<U256> {
            Ok(U256::exp10(9))
        }
    }

    struct MockVenue {
        native: U256,
        /// token balances observed after each leg
        balances: HashMap<Address, U256>,
        /// fail the Nth swap (0-based)
        fail_swap_index: Option<usize>,
        /// held by the test to stall execution inside the balance read
        stall: Option<Arc<tokio::sync::Mutex<()>>>,
        balance_calls: AtomicUsize,
        swap_calls: AtomicUsize,
        min_outs: Mutex<Vec<U256>>,
    }

    impl MockVenue {
        fn new(native: U256) -> Self {
            let mut balances = HashMap::new();
            balances.insert(stable(), U256::from(35_000_000u64));
            // 0.0102 base back after the round trip
            balances.insert(weth(), U256::from(10_200_000_000_000_000u64));
            Self {
                native,
                balances,
                fail_swap_index: None,
                stall: None,
                balance_calls: AtomicUsize::new(0),
                swap_calls: AtomicUsize::new(0),
                min_outs: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl VenueClient for MockVenue {
        async fn native_balance(&self) -> Result<U256> {
            self.balance_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(lock) = &self.stall {
                let _held = lock.lock().await;
            }
            Ok(self.native)
        }

        async fn token_balance(&self, token: Address) -> Result<U256> {
            Ok(self.balances.get(&token).copied().unwrap_or_default())
        }

        async fn wrap_native(&self, _: U256) -> Result<TxCost> {
            Ok(TxCost {
                tx_hash: "0xwrap".to_string(),
                gas_used: U256::from(45_000u64),
                effective_gas_price: U256::exp10(9),
            })
        }

        async fn ensure_allowance(&self, _: Address, _: U256) -> Result<Option<TxCost>> {
            Ok(None)
        }

        async fn swap_exact_input(
            &self,
            _leg: &Leg,
            amount_in: U256,
            min_amount_out: U256,
        ) -> Result<SwapExecution> {
            let index = self.swap_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_swap_index == Some(index) {
                return Err(anyhow!("execution reverted: Too little received"));
            }
            self.min_outs.lock().unwrap().push(min_amount_out);
            Ok(SwapExecution {
                tx_hash: format!("0xleg{}", index + 1),
                amount_out: amount_in,
                gas_used: U256::from(100_000u64),
                effective_gas_price: U256::exp10(8),
            })
        }
    }

    fn executor(max_concurrent: usize) -> Executor {
        Executor::new(max_concurrent, 50, U256::zero())
    }

    #[test]
    fn test_min_output_integer_math() {
        // quoted x (10000 - bps) / 10000, floor division
        assert_eq!(min_output(U256::from(1_000_000u64), 50), U256::from(995_000u64));
        assert_eq!(min_output(U256::from(10_001u64), 50), U256::from(9_950u64));
        assert_eq!(min_output(U256::from(35_000_000u64), 50), U256::from(34_825_000u64));
        assert_eq!(min_output(U256::from(777u64), 0), U256::from(777u64));
    }

    #[tokio::test]
    async fn test_settled_round_trip_outcome() {
        let client = MockVenue::new(U256::exp10(17));
        let exec = executor(2);
        let opp = opportunity();

        let verdict = exec.execute(&opp, &client, &IdentityQuoter).await;
        let outcome = match verdict {
            ExecutionVerdict::Completed(o) => o,
            other => panic!("expected completion, got {:?}", other),
        };

        assert!(outcome.success);
        assert_eq!(outcome.phase, ExecutionPhase::Settled);
        assert_eq!(outcome.tx_hashes, vec!["0xleg1", "0xleg2"]);
        assert!(outcome.error.is_none());

        // final 0.0102 base minus 0.01 input
        assert_eq!(outcome.realized_profit, I256::from(200_000_000_000_000i64));
        // two legs at 100k gas x 0.1 gwei each
        assert_eq!(outcome.realized_gas, U256::from(20_000_000_000_000u64));
        let expected_profit_quote = 0.0002 * 3500.0;
        let expected_gas_quote = 0.00002 * 3500.0;
        assert!((outcome.realized_profit_quote - expected_profit_quote).abs() < 1e-9);
        assert!((outcome.realized_gas_quote - expected_gas_quote).abs() < 1e-9);
        assert!(
            (outcome.realized_net_quote - (expected_profit_quote - expected_gas_quote)).abs()
                < 1e-9
        );

        // every leg's min out = quoted x 9950 / 10000; leg 2 sized off the
        // actual 35.00 stable balance, not the original quote
        let min_outs = client.min_outs.lock().unwrap().clone();
        assert_eq!(min_outs[0], U256::from(9_950_000_000_000_000u64));
        assert_eq!(min_outs[1], U256::from(34_825_000u64));
    }

    #[tokio::test]
    async fn test_insufficient_balance_fails_fast() {
        let mut client = MockVenue::new(U256::from(1u64));
        client.fail_swap_index = Some(0); // must never be reached
        let exec = Executor::new(2, 50, U256::exp10(15));
        let opp = opportunity();

        let verdict = exec.execute(&opp, &client, &IdentityQuoter).await;
        let outcome = match verdict {
            ExecutionVerdict::Completed(o) => o,
            other => panic!("expected completion, got {:?}", other),
        };
        assert!(!outcome.success);
        assert_eq!(outcome.phase, ExecutionPhase::Idle);
        assert!(outcome.error.as_deref().unwrap_or("").contains("insufficient balance"));
        assert!(outcome.tx_hashes.is_empty());
        assert_eq!(client.swap_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_scenario_leg1_failure_stops_sequence() {
        let mut client = MockVenue::new(U256::exp10(17));
        client.fail_swap_index = Some(0);
        let exec = executor(2);
        let opp = opportunity();

        let verdict = exec.execute(&opp, &client, &IdentityQuoter).await;
        let outcome = match verdict {
            ExecutionVerdict::Completed(o) => o,
            other => panic!("expected completion, got {:?}", other),
        };

        assert!(!outcome.success);
        assert!(outcome.error.as_deref().unwrap_or("").contains("Too little received"));
        assert_eq!(outcome.phase, ExecutionPhase::Leg1Submitted);
        assert!(outcome.tx_hashes.is_empty());
        // no second leg attempted
        assert_eq!(client.swap_calls.load(Ordering::SeqCst), 1);

        // the permit was released: a fresh call runs again
        let verdict = exec.execute(&opp, &client, &IdentityQuoter).await;
        assert!(matches!(verdict, ExecutionVerdict::Completed(_)));
    }

    #[tokio::test]
    async fn test_scenario_concurrency_ceiling_skips_without_side_effects() {
        let stall = Arc::new(tokio::sync::Mutex::new(()));
        let mut client = MockVenue::new(U256::zero()); // stalled calls later fail fast
        client.stall = Some(stall.clone());
        let client = Arc::new(client);
        let exec = Arc::new(executor(2));
        let opp = opportunity();

        // hold the stall lock so two executions park inside the balance read
        let held = stall.lock().await;
        let mut handles = Vec::new();
        for _ in 0..2 {
            let exec = exec.clone();
            let client = client.clone();
            let opp = opp.clone();
            handles.push(tokio::spawn(async move {
                exec.execute(&opp, client.as_ref(), &IdentityQuoter).await
            }));
        }
        // let both tasks reach the stalled read
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(client.balance_calls.load(Ordering::SeqCst), 2);

        // third call hits the ceiling without touching the client
        let verdict = exec.execute(&opp, client.as_ref(), &IdentityQuoter).await;
        assert!(matches!(verdict, ExecutionVerdict::Skipped(SkipReason::AtCeiling)));
        assert_eq!(client.balance_calls.load(Ordering::SeqCst), 2);
        assert_eq!(client.swap_calls.load(Ordering::SeqCst), 0);

        // release the stall; both parked executions finish and free permits
        drop(held);
        for handle in handles {
            let verdict = handle.await.unwrap();
            assert!(matches!(verdict, ExecutionVerdict::Completed(_)));
        }

        let verdict = exec.execute(&opp, client.as_ref(), &IdentityQuoter).await;
        assert!(matches!(verdict, ExecutionVerdict::Completed(_)));
    }

    #[tokio::test]
    async fn test_triangular_third_leg_failure_reports_leg3() {
        let mut client = MockVenue::new(U256::exp10(17));
        client.balances.insert(stable_b(), U256::from(35_070_000u64));
        client.fail_swap_index = Some(2);
        let exec = executor(2);
        let opp = triangular_opportunity();

        let verdict = exec.execute(&opp, &client, &IdentityQuoter).await;
        let outcome = match verdict {
            ExecutionVerdict::Completed(o) => o,
            other => panic!("expected completion, got {:?}", other),
        };

        assert!(!outcome.success);
        assert_eq!(outcome.phase, ExecutionPhase::Leg3Submitted);
        assert_eq!(outcome.tx_hashes, vec!["0xleg1", "0xleg2"]);
        assert_eq!(client.swap_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_triangular_settles_through_all_legs() {
        let mut client = MockVenue::new(U256::exp10(17));
        client.balances.insert(stable_b(), U256::from(35_070_000u64));
        let exec = executor(2);
        let opp = triangular_opportunity();

        let verdict = exec.execute(&opp, &client, &IdentityQuoter).await;
        let outcome = match verdict {
            ExecutionVerdict::Completed(o) => o,
            other => panic!("expected completion, got {:?}", other),
        };

        assert!(outcome.success);
        assert_eq!(outcome.phase, ExecutionPhase::Settled);
        assert_eq!(outcome.tx_hashes, vec!["0xleg1", "0xleg2", "0xleg3"]);
        // three legs at 100k gas x 0.1 gwei each
        assert_eq!(outcome.realized_gas, U256::from(30_000_000_000_000u64));
    }

    #[tokio::test]
    async fn test_informational_strategy_rejected_outright() {
        let client = MockVenue::new(U256::exp10(17));
        let exec = executor(2);
        let mut opp = opportunity();
        opp.strategy = Strategy::CrossVenueInfo;
        opp.legs.clear();

        let verdict = exec.execute(&opp, &client, &IdentityQuoter).await;
        assert!(matches!(verdict, ExecutionVerdict::Skipped(SkipReason::NotExecutable)));
        assert_eq!(client.balance_calls.load(Ordering::SeqCst), 0);
    }
}
