//! Profit-ratcheted trailing stops.
//!
//! Stops are keyed to profit milestones rather than raw price: when a
//! position's P&L crosses a level's trigger, the stop floor jumps to that
//! level's `stop_at_pct`. Floors only ever tighten.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use risk_core::Side;
use risk_profiles::{ProfileConfig, TrailingStopLevel};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Per-position trailing stop state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailingStopState {
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub pnl_pct: Decimal,
    /// Highest profit reached; never retreats
    pub peak_pnl_pct: Decimal,
    /// Current stop floor (% profit); once set, never loosens
    pub current_stop_pct: Option<Decimal>,
    /// Highest level activated so far (0 = none); never rewinds
    pub active_level: usize,
    pub last_updated: DateTime<Utc>,
}

impl TrailingStopState {
    /// True if the current P&L has fallen to or below the stop floor.
    pub fn is_stopped_out(&self) -> bool {
        match self.current_stop_pct {
            Some(stop) => self.pnl_pct <= stop,
            None => false,
        }
    }
}

/// A stop-level transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailingStopUpdate {
    pub symbol: String,
    /// 1-based level that was activated
    pub level: usize,
    pub trigger_pct: Decimal,
    pub old_stop_pct: Option<Decimal>,
    pub new_stop_pct: Decimal,
    pub pnl_pct: Decimal,
}

/// Manages trailing stops for all open positions.
#[derive(Debug, Clone)]
pub struct TrailingStopManager {
    levels: Vec<TrailingStopLevel>,
    positions: HashMap<String, TrailingStopState>,
}

impl TrailingStopManager {
    /// Create a manager from a profile's level table.
    pub fn new(profile: &ProfileConfig) -> Self {
        Self {
            levels: profile.trailing_stops.clone(),
            positions: HashMap::new(),
        }
    }

    /// Start tracking a position. Re-adding a symbol replaces prior state.
    pub fn add_position(
        &mut self,
        symbol: &str,
        side: Side,
        entry_price: Decimal,
        initial_stop_pct: Option<Decimal>,
    ) {
        self.positions.insert(
            symbol.to_string(),
            TrailingStopState {
                symbol: symbol.to_string(),
                side,
                entry_price,
                current_price: entry_price,
                pnl_pct: Decimal::ZERO,
                peak_pnl_pct: Decimal::ZERO,
                current_stop_pct: initial_stop_pct,
                active_level: 0,
                last_updated: Utc::now(),
            },
        );

        info!(
            symbol,
            %side,
            %entry_price,
            initial_stop = ?initial_stop_pct,
            "trailing stop tracking added"
        );
    }

    /// Feed a new price and advance the stop level if a milestone was hit.
    ///
    /// Levels are scanned from the highest trigger down and the position
    /// jumps directly to the highest qualifying level, so a price gap can
    /// skip intermediate levels in a single update. Unknown symbols are
    /// ignored.
    pub fn update_position(
        &mut self,
        symbol: &str,
        current_price: Decimal,
    ) -> Option<TrailingStopUpdate> {
        let state = self.positions.get_mut(symbol)?;

        state.pnl_pct = state.side.pnl_percent(state.entry_price, current_price);
        state.current_price = current_price;
        state.last_updated = Utc::now();

        if state.pnl_pct > state.peak_pnl_pct {
            state.peak_pnl_pct = state.pnl_pct;
        }

        let levels = &self.levels;
        for (idx, level) in levels.iter().enumerate().rev() {
            let ordinal = idx + 1;
            if state.pnl_pct >= level.trigger_pct && state.active_level < ordinal {
                let old_stop = state.current_stop_pct;
                state.current_stop_pct = Some(level.stop_at_pct);
                state.active_level = ordinal;

                info!(
                    symbol,
                    level = ordinal,
                    pnl = %state.pnl_pct,
                    new_stop = %level.stop_at_pct,
                    old_stop = ?old_stop,
                    "trailing stop level activated"
                );

                return Some(TrailingStopUpdate {
                    symbol: symbol.to_string(),
                    level: ordinal,
                    trigger_pct: level.trigger_pct,
                    old_stop_pct: old_stop,
                    new_stop_pct: level.stop_at_pct,
                    pnl_pct: state.pnl_pct,
                });
            }
        }

        None
    }

    /// Check whether the position has hit its stop floor.
    ///
    /// Returns the exit reason if so; unknown symbols are simply not
    /// stopped out.
    pub fn should_exit_position(&self, symbol: &str) -> Option<String> {
        let state = self.positions.get(symbol)?;

        if state.is_stopped_out() {
            let stop = state.current_stop_pct.unwrap_or_default();
            let reason = format!(
                "profit {:.2}% fell to stop floor {:.2}% (peak was {:.2}%)",
                state.pnl_pct, stop, state.peak_pnl_pct
            );
            warn!(symbol, %reason, "trailing stop exit triggered");
            return Some(reason);
        }

        None
    }

    /// Current state for a tracked position.
    pub fn state(&self, symbol: &str) -> Option<&TrailingStopState> {
        self.positions.get(symbol)
    }

    /// All tracked position states.
    pub fn all_states(&self) -> &HashMap<String, TrailingStopState> {
        &self.positions
    }

    /// Stop tracking a position.
    pub fn remove_position(&mut self, symbol: &str) {
        if self.positions.remove(symbol).is_some() {
            info!(symbol, "trailing stop tracking removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_profiles::TradingProfile;
    use rust_decimal_macros::dec;

    fn balanced_manager() -> TrailingStopManager {
        TrailingStopManager::new(&TradingProfile::Balanced.config())
    }

    #[test]
    fn test_level_one_activation() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), None);

        // 8% profit hits the first Balanced trigger, floor moves to +3%
        let update = manager.update_position("BTC/USDT", dec!(54000)).unwrap();
        assert_eq!(update.level, 1);
        assert_eq!(update.new_stop_pct, dec!(3.0));
        assert_eq!(update.old_stop_pct, None);

        let state = manager.state("BTC/USDT").unwrap();
        assert_eq!(state.active_level, 1);
        assert_eq!(state.current_stop_pct, Some(dec!(3.0)));
    }

    #[test]
    fn test_gap_jumps_to_highest_level() {
        let mut manager = balanced_manager();
        manager.add_position("ETH/USDT", Side::Long, dec!(2000), None);

        // 30% profit gaps past triggers 8/15/25; a single update jumps to
        // level 3 without walking the intermediate floors
        let update = manager.update_position("ETH/USDT", dec!(2600)).unwrap();
        assert_eq!(update.level, 3);
        assert_eq!(update.new_stop_pct, dec!(15.0));
        assert_eq!(manager.state("ETH/USDT").unwrap().active_level, 3);
    }

    #[test]
    fn test_same_price_does_not_refire() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), None);

        assert!(manager.update_position("BTC/USDT", dec!(54000)).is_some());
        assert!(manager.update_position("BTC/USDT", dec!(54000)).is_none());
    }

    #[test]
    fn test_stop_never_loosens() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), None);

        manager.update_position("BTC/USDT", dec!(57500)); // 15% -> level 2, stop +8%
        assert_eq!(
            manager.state("BTC/USDT").unwrap().current_stop_pct,
            Some(dec!(8.0))
        );

        // Profit drops back below the level-1 trigger; the floor stays put
        manager.update_position("BTC/USDT", dec!(54500)); // 9%
        let state = manager.state("BTC/USDT").unwrap();
        assert_eq!(state.current_stop_pct, Some(dec!(8.0)));
        assert_eq!(state.active_level, 2);
        assert_eq!(state.peak_pnl_pct, dec!(15));
    }

    #[test]
    fn test_stop_floor_exit() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), None);

        manager.update_position("BTC/USDT", dec!(54000)); // floor +3%
        assert!(manager.should_exit_position("BTC/USDT").is_none());

        manager.update_position("BTC/USDT", dec!(51000)); // 2% <= 3%
        let reason = manager.should_exit_position("BTC/USDT").unwrap();
        assert!(reason.contains("stop floor"));
    }

    #[test]
    fn test_short_position_pnl() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Short, dec!(50000), None);

        // Price fell 10%, short is up 10% -> level 1 (trigger 8%)
        let update = manager.update_position("BTC/USDT", dec!(45000)).unwrap();
        assert_eq!(update.level, 1);
        assert_eq!(update.pnl_pct, dec!(10));
    }

    #[test]
    fn test_initial_stop_triggers_without_levels() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), Some(dec!(-2.5)));

        manager.update_position("BTC/USDT", dec!(48500)); // -3%
        assert!(manager.should_exit_position("BTC/USDT").is_some());
    }

    #[test]
    fn test_unknown_symbol_is_silent() {
        let mut manager = balanced_manager();
        assert!(manager.update_position("NOPE", dec!(1)).is_none());
        assert!(manager.should_exit_position("NOPE").is_none());
    }
}
