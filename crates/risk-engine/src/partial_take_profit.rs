//! Staged partial take-profit.
//!
//! Locks in gains by closing a portion of the position at each profit
//! milestone while letting the remainder run. Stages fire strictly in
//! order and at most one per price update, even when price gaps past
//! several triggers in a single tick.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use risk_core::Side;
use risk_profiles::{PartialTakeProfitStage, ProfileConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Record of an executed take-profit stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TakeProfitExecution {
    /// 1-based stage number
    pub stage: usize,
    pub trigger_pct: Decimal,
    /// Percentage of the then-remaining position that was closed
    pub close_percent: Decimal,
    pub closed_size: Decimal,
    pub remaining_size: Decimal,
    pub price: Decimal,
    pub pnl_pct: Decimal,
    pub executed_at: DateTime<Utc>,
}

/// A pending stage reported by the non-mutating peek.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingClose {
    /// 1-based stage number
    pub stage: usize,
    pub close_percent: Decimal,
    pub reason: String,
}

/// Per-position partial take-profit state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartialTakeProfitState {
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub initial_size: Decimal,
    /// Remaining open size; non-increasing, floored at zero
    pub current_size: Decimal,
    pub current_price: Decimal,
    pub pnl_pct: Decimal,
    /// Executions in stage order
    pub completed_stages: Vec<TakeProfitExecution>,
    /// Index of the next stage to fire; advances by exactly one per trigger
    pub next_stage_index: usize,
    pub last_updated: DateTime<Utc>,
}

impl PartialTakeProfitState {
    /// Percentage of the original position still open.
    pub fn remaining_percent(&self) -> Decimal {
        if self.initial_size <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        self.current_size / self.initial_size * dec!(100)
    }

    pub fn is_fully_closed(&self) -> bool {
        self.current_size <= Decimal::ZERO
    }
}

/// Manages the staged close schedule for all open positions.
#[derive(Debug, Clone)]
pub struct PartialTakeProfitManager {
    stages: Vec<PartialTakeProfitStage>,
    positions: HashMap<String, PartialTakeProfitState>,
}

impl PartialTakeProfitManager {
    /// Create a manager from a profile's stage table.
    pub fn new(profile: &ProfileConfig) -> Self {
        Self {
            stages: profile.partial_take_profit.clone(),
            positions: HashMap::new(),
        }
    }

    /// Start tracking a position. Re-adding a symbol replaces prior state.
    pub fn add_position(&mut self, symbol: &str, side: Side, entry_price: Decimal, size: Decimal) {
        self.positions.insert(
            symbol.to_string(),
            PartialTakeProfitState {
                symbol: symbol.to_string(),
                side,
                entry_price,
                initial_size: size,
                current_size: size,
                current_price: entry_price,
                pnl_pct: Decimal::ZERO,
                completed_stages: Vec::new(),
                next_stage_index: 0,
                last_updated: Utc::now(),
            },
        );

        info!(symbol, %side, %entry_price, %size, "partial take-profit tracking added");
    }

    /// Feed a new price and execute the next pending stage if triggered.
    ///
    /// At most one stage fires per call; if price has gapped past multiple
    /// triggers the remaining stages fire on subsequent updates.
    pub fn update_position(
        &mut self,
        symbol: &str,
        current_price: Decimal,
    ) -> Option<TakeProfitExecution> {
        let stages = &self.stages;
        let state = self.positions.get_mut(symbol)?;

        state.pnl_pct = state.side.pnl_percent(state.entry_price, current_price);
        state.current_price = current_price;
        state.last_updated = Utc::now();

        let stage = stages.get(state.next_stage_index)?;
        if state.pnl_pct < stage.trigger_pct {
            return None;
        }

        let closed_size = state.current_size * stage.close_percent / dec!(100);
        state.current_size = (state.current_size - closed_size).max(Decimal::ZERO);
        state.next_stage_index += 1;

        let execution = TakeProfitExecution {
            stage: state.next_stage_index,
            trigger_pct: stage.trigger_pct,
            close_percent: stage.close_percent,
            closed_size,
            remaining_size: state.current_size,
            price: current_price,
            pnl_pct: state.pnl_pct,
            executed_at: Utc::now(),
        };
        state.completed_stages.push(execution.clone());

        info!(
            symbol,
            stage = execution.stage,
            pnl = %state.pnl_pct,
            close_percent = %stage.close_percent,
            closed = %closed_size,
            remaining = %state.current_size,
            "partial take-profit stage executed"
        );

        Some(execution)
    }

    /// Non-mutating peek at the next pending stage.
    ///
    /// Used by callers to decide whether to submit a reduce order before
    /// any internal bookkeeping is committed.
    pub fn should_close_position(&self, symbol: &str) -> Option<PendingClose> {
        let state = self.positions.get(symbol)?;
        let stage = self.stages.get(state.next_stage_index)?;

        if state.pnl_pct >= stage.trigger_pct {
            let number = state.next_stage_index + 1;
            return Some(PendingClose {
                stage: number,
                close_percent: stage.close_percent,
                reason: format!(
                    "take-profit stage {}: profit {:.2}% reached trigger {:.2}%",
                    number, state.pnl_pct, stage.trigger_pct
                ),
            });
        }

        None
    }

    /// Record an externally-confirmed partial close.
    ///
    /// Decrements the tracked size by the exchange-confirmed amount,
    /// independent of internal stage bookkeeping.
    pub fn record_partial_close(&mut self, symbol: &str, closed_size: Decimal) {
        if let Some(state) = self.positions.get_mut(symbol) {
            state.current_size = (state.current_size - closed_size).max(Decimal::ZERO);
            info!(symbol, %closed_size, remaining = %state.current_size, "partial close recorded");
        }
    }

    /// Current state for a tracked position.
    pub fn state(&self, symbol: &str) -> Option<&PartialTakeProfitState> {
        self.positions.get(symbol)
    }

    /// All tracked position states.
    pub fn all_states(&self) -> &HashMap<String, PartialTakeProfitState> {
        &self.positions
    }

    /// Stop tracking a position.
    pub fn remove_position(&mut self, symbol: &str) {
        if self.positions.remove(symbol).is_some() {
            info!(symbol, "partial take-profit tracking removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_profiles::TradingProfile;

    fn balanced_manager() -> PartialTakeProfitManager {
        PartialTakeProfitManager::new(&TradingProfile::Balanced.config())
    }

    #[test]
    fn test_stage_one_fires_at_trigger() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), dec!(1.0));

        // 30% profit hits the first Balanced stage: close 50%
        let execution = manager.update_position("BTC/USDT", dec!(65000)).unwrap();
        assert_eq!(execution.stage, 1);
        assert_eq!(execution.close_percent, dec!(50.0));
        assert_eq!(execution.closed_size, dec!(0.50));
        assert_eq!(execution.remaining_size, dec!(0.50));
    }

    #[test]
    fn test_one_stage_per_update_on_gap() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), dec!(1.0));

        // 60% profit gaps past all three triggers; stages still fire one
        // at a time across successive updates
        let first = manager.update_position("BTC/USDT", dec!(80000)).unwrap();
        assert_eq!(first.stage, 1);

        let second = manager.update_position("BTC/USDT", dec!(80000)).unwrap();
        assert_eq!(second.stage, 2);
        assert_eq!(second.remaining_size, dec!(0.2500));

        let third = manager.update_position("BTC/USDT", dec!(80000)).unwrap();
        assert_eq!(third.stage, 3);
        assert_eq!(third.close_percent, dec!(100.0));
        assert!(manager.state("BTC/USDT").unwrap().is_fully_closed());

        // All stages done; nothing left to fire
        assert!(manager.update_position("BTC/USDT", dec!(80000)).is_none());
    }

    #[test]
    fn test_no_refire_below_next_trigger() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), dec!(1.0));

        assert!(manager.update_position("BTC/USDT", dec!(65000)).is_some());
        // Still 30%: stage 2 trigger is 40%, nothing fires
        assert!(manager.update_position("BTC/USDT", dec!(65000)).is_none());
        assert_eq!(manager.state("BTC/USDT").unwrap().next_stage_index, 1);
    }

    #[test]
    fn test_peek_does_not_mutate() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), dec!(2.0));
        manager.update_position("BTC/USDT", dec!(64000)); // 28%, below trigger

        assert!(manager.should_close_position("BTC/USDT").is_none());

        manager.update_position("BTC/USDT", dec!(65000)); // fires stage 1
        let state_after = manager.state("BTC/USDT").unwrap().clone();

        // Peek now reports nothing pending and changes no state
        assert!(manager.should_close_position("BTC/USDT").is_none());
        assert_eq!(
            manager.state("BTC/USDT").unwrap().next_stage_index,
            state_after.next_stage_index
        );
    }

    #[test]
    fn test_record_partial_close_clamps_at_zero() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), dec!(1.0));

        manager.record_partial_close("BTC/USDT", dec!(0.4));
        assert_eq!(manager.state("BTC/USDT").unwrap().current_size, dec!(0.6));

        manager.record_partial_close("BTC/USDT", dec!(2.0));
        let state = manager.state("BTC/USDT").unwrap();
        assert_eq!(state.current_size, Decimal::ZERO);
        assert!(state.is_fully_closed());
    }

    #[test]
    fn test_remaining_percent() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), dec!(4.0));
        manager.update_position("BTC/USDT", dec!(65000));

        assert_eq!(
            manager.state("BTC/USDT").unwrap().remaining_percent(),
            dec!(50)
        );
    }

    #[test]
    fn test_unknown_symbol_is_silent() {
        let mut manager = balanced_manager();
        assert!(manager.update_position("NOPE", dec!(1)).is_none());
        assert!(manager.should_close_position("NOPE").is_none());
        manager.record_partial_close("NOPE", dec!(1)); // no panic
    }
}
