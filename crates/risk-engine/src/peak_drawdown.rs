//! Peak drawdown protection.
//!
//! Tracks the highest profit each position has reached and exits when the
//! accumulated *profit* (not price) retraces beyond a threshold. A position
//! that peaked at +40% and falls to +30% has retraced (40-30)/40 = 25% of
//! its profit.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use risk_core::Side;
use risk_profiles::ProfileConfig;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Per-position peak drawdown state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeakDrawdownState {
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub pnl_pct: Decimal,
    /// Highest profit ever reached; 0 = no profit peak yet
    pub peak_pnl_pct: Decimal,
    pub peak_price: Decimal,
    pub peak_time: DateTime<Utc>,
    pub threshold_pct: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl PeakDrawdownState {
    /// Retracement of profit from the peak, as a percentage of the peak.
    ///
    /// 0% while no profit peak exists; never negative.
    pub fn drawdown_from_peak(&self) -> Decimal {
        if self.peak_pnl_pct <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let drawdown = (self.peak_pnl_pct - self.pnl_pct) / self.peak_pnl_pct * dec!(100);
        drawdown.max(Decimal::ZERO)
    }

    /// True if the retracement has reached the exit threshold.
    pub fn should_exit(&self) -> bool {
        self.drawdown_from_peak() >= self.threshold_pct
    }
}

/// Outcome of a peak drawdown update; exactly one per call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum PeakDrawdownUpdate {
    /// A new profit peak was recorded
    PeakUpdated {
        symbol: String,
        old_peak_pct: Decimal,
        new_peak_pct: Decimal,
        peak_price: Decimal,
    },
    /// Retracement from the peak reached the threshold
    ExitTriggered {
        symbol: String,
        peak_pct: Decimal,
        pnl_pct: Decimal,
        drawdown_pct: Decimal,
        threshold_pct: Decimal,
    },
}

/// Manages peak drawdown protection for all open positions.
#[derive(Debug, Clone)]
pub struct PeakDrawdownManager {
    default_threshold: Decimal,
    positions: HashMap<String, PeakDrawdownState>,
}

impl PeakDrawdownManager {
    /// Create a manager using the profile's drawdown threshold.
    pub fn new(profile: &ProfileConfig) -> Self {
        Self {
            default_threshold: profile.peak_drawdown_threshold,
            positions: HashMap::new(),
        }
    }

    /// Start tracking a position. A custom threshold overrides the
    /// profile default. Re-adding a symbol replaces prior state.
    pub fn add_position(
        &mut self,
        symbol: &str,
        side: Side,
        entry_price: Decimal,
        custom_threshold: Option<Decimal>,
    ) {
        let threshold = custom_threshold.unwrap_or(self.default_threshold);
        let now = Utc::now();

        self.positions.insert(
            symbol.to_string(),
            PeakDrawdownState {
                symbol: symbol.to_string(),
                side,
                entry_price,
                current_price: entry_price,
                pnl_pct: Decimal::ZERO,
                peak_pnl_pct: Decimal::ZERO,
                peak_price: entry_price,
                peak_time: now,
                threshold_pct: threshold,
                last_updated: now,
            },
        );

        info!(symbol, %side, %entry_price, %threshold, "peak drawdown protection added");
    }

    /// Feed a new price; raise the peak or flag an exit.
    ///
    /// The peak only moves on a strictly greater profit. Unknown symbols
    /// are ignored.
    pub fn update_position(
        &mut self,
        symbol: &str,
        current_price: Decimal,
    ) -> Option<PeakDrawdownUpdate> {
        let state = self.positions.get_mut(symbol)?;

        let old_peak = state.peak_pnl_pct;
        state.pnl_pct = state.side.pnl_percent(state.entry_price, current_price);
        state.current_price = current_price;
        state.last_updated = Utc::now();

        let mut peak_updated = false;
        if state.pnl_pct > state.peak_pnl_pct {
            state.peak_pnl_pct = state.pnl_pct;
            state.peak_price = current_price;
            state.peak_time = state.last_updated;
            peak_updated = true;
        }

        if state.should_exit() {
            let drawdown = state.drawdown_from_peak();
            warn!(
                symbol,
                peak = %state.peak_pnl_pct,
                pnl = %state.pnl_pct,
                drawdown = %drawdown,
                threshold = %state.threshold_pct,
                "peak drawdown exit triggered"
            );

            return Some(PeakDrawdownUpdate::ExitTriggered {
                symbol: symbol.to_string(),
                peak_pct: state.peak_pnl_pct,
                pnl_pct: state.pnl_pct,
                drawdown_pct: drawdown,
                threshold_pct: state.threshold_pct,
            });
        }

        if peak_updated {
            info!(symbol, new_peak = %state.peak_pnl_pct, old_peak = %old_peak, "new profit peak");

            return Some(PeakDrawdownUpdate::PeakUpdated {
                symbol: symbol.to_string(),
                old_peak_pct: old_peak,
                new_peak_pct: state.peak_pnl_pct,
                peak_price: current_price,
            });
        }

        None
    }

    /// Check whether the position should be exited for peak retracement.
    pub fn should_exit_position(&self, symbol: &str) -> Option<String> {
        let state = self.positions.get(symbol)?;

        if state.should_exit() {
            return Some(format!(
                "profit retraced {:.2}% from peak {:.2}% (current: {:.2}%, threshold: {:.1}%)",
                state.drawdown_from_peak(),
                state.peak_pnl_pct,
                state.pnl_pct,
                state.threshold_pct
            ));
        }

        None
    }

    /// Current state for a tracked position.
    pub fn state(&self, symbol: &str) -> Option<&PeakDrawdownState> {
        self.positions.get(symbol)
    }

    /// All tracked position states.
    pub fn all_states(&self) -> &HashMap<String, PeakDrawdownState> {
        &self.positions
    }

    /// Stop tracking a position.
    pub fn remove_position(&mut self, symbol: &str) {
        if self.positions.remove(symbol).is_some() {
            info!(symbol, "peak drawdown protection removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use risk_profiles::TradingProfile;

    fn balanced_manager() -> PeakDrawdownManager {
        // Balanced threshold: 30%
        PeakDrawdownManager::new(&TradingProfile::Balanced.config())
    }

    #[test]
    fn test_peak_updates_are_strictly_increasing() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), None);

        let update = manager.update_position("BTC/USDT", dec!(55000)).unwrap();
        assert!(matches!(
            update,
            PeakDrawdownUpdate::PeakUpdated { new_peak_pct, .. } if new_peak_pct == dec!(10)
        ));

        // Equal profit is not a new peak
        assert!(manager.update_position("BTC/USDT", dec!(55000)).is_none());

        let state = manager.state("BTC/USDT").unwrap();
        assert_eq!(state.peak_pnl_pct, dec!(10));
    }

    #[test]
    fn test_retracement_below_threshold_is_quiet() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), None);

        manager.update_position("BTC/USDT", dec!(65000)); // peak 30%
        // 26%: retracement (30-26)/30 = 13.33% < 30% threshold
        assert!(manager.update_position("BTC/USDT", dec!(63000)).is_none());
        assert!(manager.should_exit_position("BTC/USDT").is_none());
    }

    #[test]
    fn test_exit_at_threshold() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), None);

        manager.update_position("BTC/USDT", dec!(70000)); // peak 40%
        // 28%: retracement (40-28)/40 = 30% >= threshold
        let update = manager.update_position("BTC/USDT", dec!(64000)).unwrap();
        assert!(matches!(
            update,
            PeakDrawdownUpdate::ExitTriggered { drawdown_pct, .. } if drawdown_pct == dec!(30)
        ));

        let reason = manager.should_exit_position("BTC/USDT").unwrap();
        assert!(reason.contains("retraced"));
    }

    #[test]
    fn test_no_peak_means_no_drawdown() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), None);

        // Straight into loss: no profit peak, drawdown stays 0%
        assert!(manager.update_position("BTC/USDT", dec!(40000)).is_none());
        let state = manager.state("BTC/USDT").unwrap();
        assert_eq!(state.drawdown_from_peak(), Decimal::ZERO);
        assert!(!state.should_exit());
    }

    #[test]
    fn test_custom_threshold_overrides_profile() {
        let mut manager = balanced_manager();
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), Some(dec!(10)));

        manager.update_position("BTC/USDT", dec!(60000)); // peak 20%
        // 17%: retracement 15% >= custom 10%
        let update = manager.update_position("BTC/USDT", dec!(58500)).unwrap();
        assert!(matches!(update, PeakDrawdownUpdate::ExitTriggered { .. }));
    }

    #[test]
    fn test_unknown_symbol_is_silent() {
        let mut manager = balanced_manager();
        assert!(manager.update_position("NOPE", dec!(1)).is_none());
        assert!(manager.should_exit_position("NOPE").is_none());
    }
}
