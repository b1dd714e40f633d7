//! Scan engine
//!
//! Owns the periodic tick loop and the process-wide mutable state: stats,
//! ring logs, venue activation. The loop body runs to completion before the
//! next tick fires (`MissedTickBehavior::Skip`), so tick bodies never
//! overlap. All other readers get point-in-time snapshots.
//!
//! Author: AI-Generated
//! Created: 2026-08-21

use crate::arbitrage::{
    select_best, Comparator, ExecutionVerdict, Executor, ExecutorGate, GateDecision, ScanReport,
    Scanner,
};
use crate::chain::{QuoteSource, RouterClient, UniV3QuoteSource, VenueClient};
use crate::config::ScalperConfig;
use crate::price_cache::PriceCache;
use crate::types::{Opportunity, TradeOutcome, Venue};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use ethers::prelude::*;
use futures::future::join_all;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

const OPPORTUNITY_LOG_CAP: usize = 20;
const TRADE_LOG_CAP: usize = 100;
const SCAN_WINDOW: usize = 50;

/// Monotonic counters and running sums, reset on every start
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStats {
    pub total_scans: u64,
    pub opportunities_found: u64,
    pub cross_venue_records: u64,
    pub candidate_failures: u64,
    pub trades_attempted: u64,
    pub trades_executed: u64,
    pub trades_successful: u64,
    pub gross_profit_quote: f64,
    pub gas_cost_quote: f64,
    pub net_profit_quote: f64,
    pub win_rate: f64,
    pub scans_per_sec: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VenueStatus {
    pub name: String,
    pub chain_id: u64,
    /// Balance at or above the configured threshold
    pub active: bool,
    pub balance_wei: String,
    pub explorer: String,
}

/// Process-wide engine state. Written only from the tick loop and the
/// start/stop entry points; everyone else reads snapshots.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    pub running: bool,
    pub dry_run: bool,
    pub auto_execute: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub tick_count: u64,
    pub in_flight: usize,
    pub venues: Vec<VenueStatus>,
    pub stats: EngineStats,
    /// Most-recent-first, capped
    pub opportunities: VecDeque<Opportunity>,
    /// Most-recent-first, capped
    pub trade_log: VecDeque<TradeOutcome>,
    #[serde(skip)]
    scan_durations_ms: VecDeque<u64>,
}

impl EngineState {
    fn initial(config: &ScalperConfig) -> Self {
        Self {
            running: false,
            dry_run: true,
            auto_execute: config.auto_execute,
            started_at: None,
            tick_count: 0,
            in_flight: 0,
            venues: config
                .venues
                .iter()
                .map(|v| VenueStatus {
                    name: v.name.clone(),
                    chain_id: v.chain_id,
                    active: false,
                    balance_wei: "0".to_string(),
                    explorer: v.explorer.clone(),
                })
                .collect(),
            stats: EngineStats::default(),
            opportunities: VecDeque::new(),
            trade_log: VecDeque::new(),
            scan_durations_ms: VecDeque::new(),
        }
    }
}

pub struct Engine {
    config: ScalperConfig,
    scanner: Scanner,
    comparator: Comparator,
    executor: Executor,
    sources: HashMap<String, Arc<dyn QuoteSource>>,
    clients: HashMap<String, Arc<dyn VenueClient>>,
    state: RwLock<EngineState>,
}

impl Engine {
    /// Build an engine with live RPC-backed components, one provider per venue
    pub fn new(config: ScalperConfig) -> Result<Arc<Self>> {
        let wallet: LocalWallet = config
            .private_key
            .parse()
            .context("PRIVATE_KEY is not a valid signing key")?;
        let rpc_timeout = Duration::from_millis(config.rpc_timeout_ms);

        let mut sources: HashMap<String, Arc<dyn QuoteSource>> = HashMap::new();
        let mut clients: HashMap<String, Arc<dyn VenueClient>> = HashMap::new();
        for venue in &config.venues {
            let provider = Provider::<Http>::try_from(venue.rpc_url.as_str())
                .with_context(|| format!("invalid RPC URL for venue {}", venue.name))?;
            sources.insert(
                venue.name.clone(),
                Arc::new(UniV3QuoteSource::new(
                    Arc::new(provider.clone()),
                    venue.quoter,
                    rpc_timeout,
                )),
            );
            clients.insert(
                venue.name.clone(),
                Arc::new(RouterClient::new(
                    provider,
                    wallet.clone(),
                    venue.chain_id,
                    venue.weth,
                    venue.router,
                    rpc_timeout,
                )),
            );
        }
        Ok(Self::with_components(config, sources, clients))
    }

    /// Wire an engine from pre-built chain components
    pub fn with_components(
        config: ScalperConfig,
        sources: HashMap<String, Arc<dyn QuoteSource>>,
        clients: HashMap<String, Arc<dyn VenueClient>>,
    ) -> Arc<Self> {
        let price_cache = Arc::new(PriceCache::new(config.fallback_ref_price));
        let scanner = Scanner::new(&config, price_cache.clone());
        let comparator = Comparator::new(price_cache, config.fee_tiers[0]);
        let executor = Executor::new(
            config.max_concurrent_executions,
            config.max_slippage_bps,
            config.balance_safety_buffer_wei,
        );
        let state = RwLock::new(EngineState::initial(&config));
        Arc::new(Self { config, scanner, comparator, executor, sources, clients, state })
    }

    pub fn config(&self) -> &ScalperConfig {
        &self.config
    }

    /// Point-in-time copy of the engine state
    pub fn snapshot(&self) -> EngineState {
        let mut state = self.state.read().expect("engine state lock poisoned").clone();
        state.in_flight = self.executor.in_flight();
        state
    }

    pub fn is_running(&self) -> bool {
        self.state.read().expect("engine state lock poisoned").running
    }

    /// Start the scan loop. Returns false (without side effects) when a loop
    /// is already running; otherwise resets counters and logs, then spawns.
    pub fn start(self: &Arc<Self>, dry_run: bool) -> bool {
        if !self.activate(dry_run) {
            return false;
        }
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.run_loop().await });
        true
    }

    /// Reset state and mark running; the caller owns driving ticks
    fn activate(&self, dry_run: bool) -> bool {
        {
            let mut state = self.state.write().expect("engine state lock poisoned");
            if state.running {
                return false;
            }
            let venues = std::mem::take(&mut state.venues);
            *state = EngineState::initial(&self.config);
            state.venues = venues;
            state.running = true;
            state.dry_run = dry_run;
            state.started_at = Some(Utc::now());
        }
        info!(
            "▶️ Engine started | mode: {} | interval {} ms | {} venue(s)",
            if dry_run { "DRY RUN" } else { "LIVE" },
            self.config.scan_interval_ms,
            self.config.venues.len()
        );
        true
    }

    /// Halt the loop at the next tick boundary. Idempotent.
    pub fn stop(&self) {
        let mut state = self.state.write().expect("engine state lock poisoned");
        if state.running {
            state.running = false;
            info!("⏹️ Engine stopped");
        }
    }

    async fn run_loop(self: Arc<Self>) {
        let mut interval =
            tokio::time::interval(Duration::from_millis(self.config.scan_interval_ms));
        // a long tick swallows the missed fire instead of bursting to catch up
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            if !self.is_running() {
                break;
            }
            self.tick().await;
        }
        debug!("Scan loop exited");
    }

    /// One scan cycle: refresh balances on cadence, scan active venues,
    /// compare venues on cadence, rank, gate, execute at most one candidate.
    pub async fn tick(&self) {
        let started = Instant::now();
        let (tick, dry_run) = {
            let mut state = self.state.write().expect("engine state lock poisoned");
            state.tick_count += 1;
            (state.tick_count, state.dry_run)
        };

        if (tick - 1) % self.config.balance_refresh_ticks == 0 {
            self.refresh_balances().await;
        }

        let active_names: Vec<String> = {
            let state = self.state.read().expect("engine state lock poisoned");
            state.venues.iter().filter(|v| v.active).map(|v| v.name.clone()).collect()
        };
        let active_venues: Vec<&Venue> = self
            .config
            .venues
            .iter()
            .filter(|v| active_names.contains(&v.name))
            .collect();

        let reports: Vec<ScanReport> = join_all(active_venues.iter().filter_map(|venue| {
            let source = self.sources.get(&venue.name)?;
            Some(self.scanner.scan(venue, source.as_ref()))
        }))
        .await;

        let cross_records = if tick % self.config.compare_interval_ticks == 0 {
            self.comparator.compare_all(&self.config.venues, &self.sources).await
        } else {
            Vec::new()
        };

        let mut merged: Vec<Opportunity> = Vec::new();
        let mut failures = 0usize;
        for report in &reports {
            failures += report.failures;
            merged.extend(report.opportunities.iter().cloned());
        }
        merged.extend(cross_records.iter().cloned());

        {
            let mut state = self.state.write().expect("engine state lock poisoned");
            state.stats.total_scans += 1;
            state.stats.opportunities_found +=
                (merged.len() - cross_records.len()) as u64;
            state.stats.cross_venue_records += cross_records.len() as u64;
            state.stats.candidate_failures += failures as u64;
            for opp in &merged {
                state.opportunities.push_front(opp.clone());
            }
            state.opportunities.truncate(OPPORTUNITY_LOG_CAP);
        }

        if let Some(best) = select_best(&merged) {
            let gate = ExecutorGate {
                dry_run,
                auto_execute: self.config.auto_execute,
                min_profit_quote: self.config.min_profit_quote,
            };
            match gate.check(&best) {
                GateDecision::Dispatch => self.dispatch(&best).await,
                decision => debug!(
                    "Best candidate held ({}): {} on {} net ${:.4}",
                    decision, best.strategy, best.venue, best.net_profit_quote
                ),
            }
        }

        let elapsed = started.elapsed().as_millis() as u64;
        let mut state = self.state.write().expect("engine state lock poisoned");
        state.scan_durations_ms.push_front(elapsed);
        state.scan_durations_ms.truncate(SCAN_WINDOW);
        let total_ms: u64 = state.scan_durations_ms.iter().sum();
        state.stats.scans_per_sec = if total_ms > 0 {
            state.scan_durations_ms.len() as f64 * 1000.0 / total_ms as f64
        } else {
            0.0
        };
    }

    async fn dispatch(&self, best: &Opportunity) {
        let (client, source) = match (self.clients.get(&best.venue), self.sources.get(&best.venue))
        {
            (Some(c), Some(s)) => (c, s),
            _ => {
                warn!("No chain components for venue {} - dispatch dropped", best.venue);
                return;
            }
        };

        {
            let mut state = self.state.write().expect("engine state lock poisoned");
            state.stats.trades_attempted += 1;
        }
        let verdict = self.executor.execute(best, client.as_ref(), source.as_ref()).await;

        match verdict {
            ExecutionVerdict::Skipped(reason) => {
                debug!("Execution skipped: {:?}", reason);
            }
            ExecutionVerdict::Completed(outcome) => {
                let mut state = self.state.write().expect("engine state lock poisoned");
                state.stats.trades_executed += 1;
                if outcome.success {
                    state.stats.trades_successful += 1;
                }
                state.stats.gross_profit_quote += outcome.realized_profit_quote;
                state.stats.gas_cost_quote += outcome.realized_gas_quote;
                state.stats.net_profit_quote += outcome.realized_net_quote;
                state.stats.win_rate = if state.stats.trades_executed > 0 {
                    state.stats.trades_successful as f64 / state.stats.trades_executed as f64
                } else {
                    0.0
                };
                state.trade_log.push_front(outcome);
                state.trade_log.truncate(TRADE_LOG_CAP);
            }
        }
    }

    /// Read native balances and derive per-venue activation. A failed read
    /// keeps the venue's previous status.
    async fn refresh_balances(&self) {
        for venue in &self.config.venues {
            let client = match self.clients.get(&venue.name) {
                Some(c) => c,
                None => continue,
            };
            match client.native_balance().await {
                Ok(balance) => {
                    let active = balance >= self.config.min_active_balance_wei;
                    let mut state = self.state.write().expect("engine state lock poisoned");
                    if let Some(status) = state.venues.iter_mut().find(|v| v.name == venue.name) {
                        status.active = active;
                        status.balance_wei = balance.to_string();
                    }
                    debug!(
                        "Balance on {}: {} wei ({})",
                        venue.name,
                        balance,
                        if active { "active" } else { "below threshold" }
                    );
                }
                Err(e) => warn!("Balance refresh failed on {}: {}", venue.name, e),
            }
        }
    }
}
