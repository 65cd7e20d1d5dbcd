//! Maximum holding time enforcement.
//!
//! Time-boxes every position: once a position has been open for the
//! configured number of hours it must be closed regardless of P&L. The
//! manager is purely poll-driven; expiry is only observed when
//! `update_position` or one of the query methods is called.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use risk_core::Side;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

const APPROACHING_EXPIRY_HOURS: f64 = 2.0;

/// Per-position holding time state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoldingTimeState {
    pub symbol: String,
    pub side: Side,
    pub entry_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub max_holding_hours: f64,
    pub current_price: Decimal,
    /// For display only; expiry is purely time-driven
    pub pnl_pct: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl HoldingTimeState {
    /// Hours the position has been open.
    pub fn holding_hours(&self) -> f64 {
        let elapsed = Utc::now() - self.entry_time;
        elapsed.num_milliseconds() as f64 / 3_600_000.0
    }

    /// Hours remaining before expiry; never negative.
    pub fn remaining_hours(&self) -> f64 {
        (self.max_holding_hours - self.holding_hours()).max(0.0)
    }

    /// True once the position has exceeded its time box.
    pub fn is_expired(&self) -> bool {
        self.holding_hours() >= self.max_holding_hours
    }

    /// The instant at which the position expires.
    pub fn expiry_time(&self) -> DateTime<Utc> {
        self.entry_time + Duration::milliseconds((self.max_holding_hours * 3_600_000.0) as i64)
    }
}

/// Outcome of a holding time poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HoldingTimeUpdate {
    /// The time box has been exceeded
    Expired {
        symbol: String,
        holding_hours: f64,
        max_holding_hours: f64,
        exceeded_by_hours: f64,
        pnl_pct: Decimal,
    },
    /// Two hours or less remain
    ApproachingExpiry {
        symbol: String,
        holding_hours: f64,
        remaining_hours: f64,
        max_holding_hours: f64,
    },
}

/// Manages holding time enforcement for all open positions.
#[derive(Debug, Clone)]
pub struct MaxHoldingTimeManager {
    max_holding_hours: f64,
    positions: HashMap<String, HoldingTimeState>,
}

impl MaxHoldingTimeManager {
    pub fn new(max_holding_hours: f64) -> Self {
        Self {
            max_holding_hours,
            positions: HashMap::new(),
        }
    }

    /// Start tracking a position. Entry time defaults to now; a custom
    /// limit overrides the manager default. Re-adding a symbol replaces
    /// prior state.
    pub fn add_position(
        &mut self,
        symbol: &str,
        side: Side,
        entry_price: Decimal,
        entry_time: Option<DateTime<Utc>>,
        custom_max_hours: Option<f64>,
    ) {
        let entry_time = entry_time.unwrap_or_else(Utc::now);
        let max_hours = custom_max_hours.unwrap_or(self.max_holding_hours);

        let state = HoldingTimeState {
            symbol: symbol.to_string(),
            side,
            entry_time,
            entry_price,
            max_holding_hours: max_hours,
            current_price: entry_price,
            pnl_pct: Decimal::ZERO,
            last_updated: Utc::now(),
        };

        info!(
            symbol,
            %side,
            %entry_time,
            max_hours,
            expires = %state.expiry_time(),
            "holding time tracking added"
        );
        self.positions.insert(symbol.to_string(), state);
    }

    /// Feed a new price and poll the time box.
    pub fn update_position(
        &mut self,
        symbol: &str,
        current_price: Decimal,
    ) -> Option<HoldingTimeUpdate> {
        let state = self.positions.get_mut(symbol)?;

        state.pnl_pct = state.side.pnl_percent(state.entry_price, current_price);
        state.current_price = current_price;
        state.last_updated = Utc::now();

        let holding = state.holding_hours();
        let remaining = state.remaining_hours();

        if state.is_expired() {
            warn!(
                symbol,
                holding_hours = holding,
                max_hours = state.max_holding_hours,
                pnl = %state.pnl_pct,
                "max holding time exceeded"
            );

            return Some(HoldingTimeUpdate::Expired {
                symbol: symbol.to_string(),
                holding_hours: holding,
                max_holding_hours: state.max_holding_hours,
                exceeded_by_hours: holding - state.max_holding_hours,
                pnl_pct: state.pnl_pct,
            });
        }

        if remaining <= APPROACHING_EXPIRY_HOURS {
            info!(symbol, remaining_hours = remaining, "position approaching max holding time");

            return Some(HoldingTimeUpdate::ApproachingExpiry {
                symbol: symbol.to_string(),
                holding_hours: holding,
                remaining_hours: remaining,
                max_holding_hours: state.max_holding_hours,
            });
        }

        None
    }

    /// Check whether the position must be closed for exceeding its time box.
    pub fn should_close_position(&self, symbol: &str) -> Option<String> {
        let state = self.positions.get(symbol)?;

        if state.is_expired() {
            return Some(format!(
                "position held for {:.1} hours (max: {} hours), closing regardless of P&L ({:.2}%)",
                state.holding_hours(),
                state.max_holding_hours,
                state.pnl_pct
            ));
        }

        None
    }

    /// All symbols past their time box, for batch sweeps.
    pub fn positions_to_close(&self) -> Vec<String> {
        self.positions
            .iter()
            .filter(|(_, state)| state.is_expired())
            .map(|(symbol, _)| symbol.clone())
            .collect()
    }

    /// Current state for a tracked position.
    pub fn state(&self, symbol: &str) -> Option<&HoldingTimeState> {
        self.positions.get(symbol)
    }

    /// All tracked position states.
    pub fn all_states(&self) -> &HashMap<String, HoldingTimeState> {
        &self.positions
    }

    /// Stop tracking a position.
    pub fn remove_position(&mut self, symbol: &str) {
        if let Some(state) = self.positions.remove(symbol) {
            info!(symbol, holding_hours = state.holding_hours(), "holding time tracking removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn hours_ago(hours: i64) -> DateTime<Utc> {
        Utc::now() - Duration::hours(hours)
    }

    #[test]
    fn test_fresh_position_is_not_expired() {
        let mut manager = MaxHoldingTimeManager::new(36.0);
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), None, None);

        assert!(manager.update_position("BTC/USDT", dec!(50500)).is_none());
        assert!(manager.should_close_position("BTC/USDT").is_none());
        assert!(manager.positions_to_close().is_empty());
    }

    #[test]
    fn test_expired_position_must_close() {
        let mut manager = MaxHoldingTimeManager::new(36.0);
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), Some(hours_ago(37)), None);

        let update = manager.update_position("BTC/USDT", dec!(50500)).unwrap();
        assert!(matches!(update, HoldingTimeUpdate::Expired { .. }));

        let reason = manager.should_close_position("BTC/USDT").unwrap();
        assert!(reason.contains("36 hours"));
        assert_eq!(manager.positions_to_close(), vec!["BTC/USDT".to_string()]);
    }

    #[test]
    fn test_approaching_expiry_warning() {
        let mut manager = MaxHoldingTimeManager::new(36.0);
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), Some(hours_ago(35)), None);

        let update = manager.update_position("BTC/USDT", dec!(50500)).unwrap();
        match update {
            HoldingTimeUpdate::ApproachingExpiry {
                remaining_hours, ..
            } => assert!(remaining_hours > 0.0 && remaining_hours <= 2.0),
            other => panic!("expected ApproachingExpiry, got {:?}", other),
        }

        // Not yet past the box
        assert!(manager.should_close_position("BTC/USDT").is_none());
    }

    #[test]
    fn test_custom_max_hours() {
        let mut manager = MaxHoldingTimeManager::new(36.0);
        manager.add_position("ETH/USDT", Side::Short, dec!(2000), Some(hours_ago(9)), Some(8.0));

        assert!(manager.state("ETH/USDT").unwrap().is_expired());
        assert!(manager.should_close_position("ETH/USDT").is_some());
    }

    #[test]
    fn test_expiry_time() {
        let mut manager = MaxHoldingTimeManager::new(36.0);
        let entry = hours_ago(10);
        manager.add_position("BTC/USDT", Side::Long, dec!(50000), Some(entry), None);

        let state = manager.state("BTC/USDT").unwrap();
        assert_eq!(state.expiry_time(), entry + Duration::hours(36));
        assert!(state.remaining_hours() > 25.9 && state.remaining_hours() < 26.1);
    }

    #[test]
    fn test_unknown_symbol_is_silent() {
        let mut manager = MaxHoldingTimeManager::new(36.0);
        assert!(manager.update_position("NOPE", dec!(1)).is_none());
        assert!(manager.should_close_position("NOPE").is_none());
    }
}
