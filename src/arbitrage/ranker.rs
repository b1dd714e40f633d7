//! Opportunity ranking and the executor gate
//!
//! `select_best` is a pure function over the merged scan results; the gate
//! applies the engine-mode checks right before dispatch. Gate rejections are
//! decisions, not errors.
//!
//! Author: AI-Generated
//! Created: 2026-08-21

use crate::types::{Opportunity, Strategy};
use std::fmt;
use tracing::debug;

/// Filter out informational records, sort descending by quote-currency net
/// profit (stable sort - equal profits keep their scan order), return the head.
pub fn select_best(opportunities: &[Opportunity]) -> Option<Opportunity> {
    let mut executable: Vec<&Opportunity> = opportunities
        .iter()
        .filter(|o| o.strategy != Strategy::CrossVenueInfo)
        .collect();
    executable.sort_by(|a, b| {
        b.net_profit_quote
            .partial_cmp(&a.net_profit_quote)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    executable.first().map(|o| (*o).clone())
}

/// Gate verdict; only `Dispatch` reaches the executor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Dispatch,
    /// Dry-run mode: detect and log, never submit
    DryRun,
    /// Automatic execution disabled by config
    AutoExecuteOff,
    /// Informational strategy cannot be dispatched
    NotExecutable,
    /// Net profit fell below the minimum between scan and dispatch
    BelowMinProfit,
}

impl fmt::Display for GateDecision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            GateDecision::Dispatch => "dispatch",
            GateDecision::DryRun => "dry-run mode",
            GateDecision::AutoExecuteOff => "auto-execute disabled",
            GateDecision::NotExecutable => "strategy not executable",
            GateDecision::BelowMinProfit => "below minimum profit",
        };
        write!(f, "{}", s)
    }
}

/// Pre-dispatch checks. Pure given its fields, so repeated checks with
/// unchanged inputs always agree.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorGate {
    pub dry_run: bool,
    pub auto_execute: bool,
    pub min_profit_quote: f64,
}

impl ExecutorGate {
    pub fn check(&self, opportunity: &Opportunity) -> GateDecision {
        if !opportunity.strategy.is_executable() {
            return GateDecision::NotExecutable;
        }
        if self.dry_run {
            return GateDecision::DryRun;
        }
        if !self.auto_execute {
            return GateDecision::AutoExecuteOff;
        }
        // Re-checked at dispatch time, not assumed from scan time
        if opportunity.net_profit_quote < self.min_profit_quote {
            debug!(
                "Gate: profit ${:.4} below minimum ${:.4}",
                opportunity.net_profit_quote, self.min_profit_quote
            );
            return GateDecision::BelowMinProfit;
        }
        GateDecision::Dispatch
    }
}
