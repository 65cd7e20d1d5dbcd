//! Unified risk coordinator.
//!
//! Owns one instance of each protection manager plus the active profile
//! and exposes the engine's lifecycle API. Price ticks fan out to the four
//! position-level managers; exit verdicts are aggregated into a union,
//! with partial take-profit deliberately kept out of it (a partial close
//! is non-terminal and queried separately).

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use risk_core::{RiskResult, Side};
use risk_profiles::{ProfileConfig, TradingProfile};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::{
    AccountDrawdownManager, AdmissionCheck, DrawdownEvent, HoldingTimeUpdate,
    MaxHoldingTimeManager, PartialTakeProfitManager, PeakDrawdownManager, PeakDrawdownUpdate,
    PendingClose, RiskEngineConfig, TakeProfitExecution, TrailingStopManager, TrailingStopUpdate,
};

/// Raw per-manager events from a single price update, unsuppressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub symbol: String,
    pub current_price: Decimal,
    pub trailing_stop: Option<TrailingStopUpdate>,
    pub partial_take_profit: Option<TakeProfitExecution>,
    pub peak_drawdown: Option<PeakDrawdownUpdate>,
    pub holding_time: Option<HoldingTimeUpdate>,
}

/// Aggregated exit verdict for a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExitDecision {
    pub should_exit: bool,
    /// Reasons in subsystem order, each prefixed with its source
    pub reasons: Vec<String>,
}

/// Composite risk snapshot for a position.
///
/// Only available while all four position-level managers hold state for
/// the symbol; uniform registration is an invariant `add_position`
/// preserves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionRiskState {
    pub symbol: String,
    pub side: Side,
    pub entry_price: Decimal,
    pub current_price: Decimal,
    pub pnl_pct: Decimal,

    pub trailing_stop_active: bool,
    pub trailing_stop_level: usize,
    pub current_stop_pct: Option<Decimal>,

    pub partial_tp_stages_completed: usize,
    pub remaining_position_percent: Decimal,

    pub peak_pnl_pct: Decimal,
    pub drawdown_from_peak: Decimal,

    pub holding_hours: f64,
    pub remaining_hours: f64,
    pub is_expired: bool,

    pub should_exit: bool,
    pub exit_reasons: Vec<String>,
}

/// Owns every protection manager and drives them as one engine.
///
/// Not internally thread-safe: a single logical caller is assumed, and
/// concurrent updates to the same symbol require external mutual
/// exclusion.
#[derive(Debug)]
pub struct RiskCoordinator {
    config: RiskEngineConfig,
    profile_config: ProfileConfig,
    trailing_stops: TrailingStopManager,
    partial_take_profit: PartialTakeProfitManager,
    peak_drawdown: PeakDrawdownManager,
    holding_time: MaxHoldingTimeManager,
    account_drawdown: AccountDrawdownManager,
}

impl RiskCoordinator {
    /// Build the engine from a validated configuration.
    pub fn new(config: RiskEngineConfig) -> RiskResult<Self> {
        config.validate()?;

        let profile_config = config.profile.config();
        let coordinator = Self {
            trailing_stops: TrailingStopManager::new(&profile_config),
            partial_take_profit: PartialTakeProfitManager::new(&profile_config),
            peak_drawdown: PeakDrawdownManager::new(&profile_config),
            holding_time: MaxHoldingTimeManager::new(config.max_holding_hours),
            account_drawdown: AccountDrawdownManager::new(
                config.initial_equity,
                config.warning_threshold,
                config.no_new_positions_threshold,
                config.force_close_threshold,
            ),
            profile_config,
            config,
        };

        info!(
            profile = %coordinator.config.profile,
            initial_equity = %coordinator.config.initial_equity,
            max_holding_hours = coordinator.config.max_holding_hours,
            "risk coordinator initialized"
        );

        Ok(coordinator)
    }

    /// Register a new position with the four position-level managers.
    ///
    /// The account manager is position-count-agnostic and is not
    /// involved. Re-adding a symbol silently replaces prior state in all
    /// four managers.
    pub fn add_position(
        &mut self,
        symbol: &str,
        side: Side,
        entry_price: Decimal,
        size: Decimal,
        initial_stop_pct: Option<Decimal>,
        entry_time: Option<DateTime<Utc>>,
    ) {
        self.trailing_stops
            .add_position(symbol, side, entry_price, initial_stop_pct);
        self.partial_take_profit
            .add_position(symbol, side, entry_price, size);
        self.peak_drawdown.add_position(symbol, side, entry_price, None);
        self.holding_time
            .add_position(symbol, side, entry_price, entry_time, None);

        info!(symbol, %side, %entry_price, %size, "position registered with risk engine");
    }

    /// Fan a price tick out to the four position-level managers.
    ///
    /// Returns the raw per-manager events with no suppression.
    pub fn update_position(&mut self, symbol: &str, current_price: Decimal) -> PositionUpdate {
        PositionUpdate {
            symbol: symbol.to_string(),
            current_price,
            trailing_stop: self.trailing_stops.update_position(symbol, current_price),
            partial_take_profit: self
                .partial_take_profit
                .update_position(symbol, current_price),
            peak_drawdown: self.peak_drawdown.update_position(symbol, current_price),
            holding_time: self.holding_time.update_position(symbol, current_price),
        }
    }

    /// Feed a fresh portfolio valuation into the account circuit breaker.
    pub fn update_account_equity(&mut self, current_equity: Decimal) -> Option<DrawdownEvent> {
        self.account_drawdown.update_equity(current_equity)
    }

    /// Union of all terminal exit verdicts for a position.
    ///
    /// Combines trailing-stop, peak-drawdown, holding-time and account
    /// force-close. Partial take-profit is excluded: it is non-terminal
    /// and queried via [`should_partial_close`](Self::should_partial_close).
    pub fn should_exit_position(&self, symbol: &str) -> ExitDecision {
        let mut reasons = Vec::new();

        if let Some(reason) = self.trailing_stops.should_exit_position(symbol) {
            reasons.push(format!("Trailing stop: {}", reason));
        }

        if let Some(reason) = self.peak_drawdown.should_exit_position(symbol) {
            reasons.push(format!("Peak drawdown: {}", reason));
        }

        if let Some(reason) = self.holding_time.should_close_position(symbol) {
            reasons.push(format!("Max holding time: {}", reason));
        }

        if let Some(reason) = self.account_drawdown.should_force_close_all() {
            reasons.push(format!("Account force close: {}", reason));
        }

        let should_exit = !reasons.is_empty();
        if should_exit {
            warn!(symbol, count = reasons.len(), reasons = ?reasons, "exit recommended");
        }

        ExitDecision {
            should_exit,
            reasons,
        }
    }

    /// Non-mutating peek at the next pending partial take-profit stage.
    pub fn should_partial_close(&self, symbol: &str) -> Option<PendingClose> {
        self.partial_take_profit.should_close_position(symbol)
    }

    /// Admission control, delegated solely to the account manager.
    pub fn can_open_new_position(&self) -> AdmissionCheck {
        self.account_drawdown.can_open_new_position()
    }

    /// True only while the account is in the force-close tier.
    pub fn should_force_close_all(&self) -> Option<String> {
        self.account_drawdown.should_force_close_all()
    }

    /// Record an externally-confirmed partial close.
    pub fn record_partial_close(&mut self, symbol: &str, closed_size: Decimal) {
        self.partial_take_profit
            .record_partial_close(symbol, closed_size);
    }

    /// Composite snapshot for a position, or `None` unless all four
    /// position-level managers hold state for the symbol.
    pub fn get_position_risk_state(&self, symbol: &str) -> Option<PositionRiskState> {
        let ts = self.trailing_stops.state(symbol)?;
        let ptp = self.partial_take_profit.state(symbol)?;
        let pd = self.peak_drawdown.state(symbol)?;
        let ht = self.holding_time.state(symbol)?;

        let decision = self.should_exit_position(symbol);

        Some(PositionRiskState {
            symbol: symbol.to_string(),
            side: ts.side,
            entry_price: ts.entry_price,
            current_price: ts.current_price,
            pnl_pct: ts.pnl_pct,

            trailing_stop_active: ts.active_level > 0,
            trailing_stop_level: ts.active_level,
            current_stop_pct: ts.current_stop_pct,

            partial_tp_stages_completed: ptp.next_stage_index,
            remaining_position_percent: ptp.remaining_percent(),

            peak_pnl_pct: pd.peak_pnl_pct,
            drawdown_from_peak: pd.drawdown_from_peak(),

            holding_hours: ht.holding_hours(),
            remaining_hours: ht.remaining_hours(),
            is_expired: ht.is_expired(),

            should_exit: decision.should_exit,
            exit_reasons: decision.reasons,
        })
    }

    /// Snapshots for every fully-registered position.
    pub fn all_position_states(&self) -> HashMap<String, PositionRiskState> {
        let symbols: BTreeSet<&String> = self
            .trailing_stops
            .all_states()
            .keys()
            .chain(self.partial_take_profit.all_states().keys())
            .chain(self.peak_drawdown.all_states().keys())
            .chain(self.holding_time.all_states().keys())
            .collect();

        symbols
            .into_iter()
            .filter_map(|symbol| {
                self.get_position_risk_state(symbol)
                    .map(|state| (symbol.clone(), state))
            })
            .collect()
    }

    /// Symbols past their holding time box, for batch sweeps.
    pub fn positions_past_max_holding(&self) -> Vec<String> {
        self.holding_time.positions_to_close()
    }

    /// Deregister a position from all four position-level managers.
    pub fn remove_position(&mut self, symbol: &str) {
        self.trailing_stops.remove_position(symbol);
        self.partial_take_profit.remove_position(symbol);
        self.peak_drawdown.remove_position(symbol);
        self.holding_time.remove_position(symbol);

        info!(symbol, "position removed from risk engine");
    }

    /// Swap the active profile.
    ///
    /// Reconstructs the three profile-bound managers (trailing stop,
    /// partial take-profit, peak drawdown) against the new thresholds,
    /// **discarding** any per-position state they currently track. The
    /// holding-time and account managers are unaffected. Callers must
    /// decide whether to forbid this while positions remain open.
    pub fn set_profile(&mut self, profile: TradingProfile) {
        let old_profile = self.config.profile;
        self.config.profile = profile;
        self.profile_config = profile.config();

        self.trailing_stops = TrailingStopManager::new(&self.profile_config);
        self.partial_take_profit = PartialTakeProfitManager::new(&self.profile_config);
        self.peak_drawdown = PeakDrawdownManager::new(&self.profile_config);

        warn!(
            %old_profile,
            new_profile = %profile,
            "trading profile changed, profile-bound position state discarded"
        );
    }

    /// Operator action: restart account drawdown tracking from current
    /// equity without clearing the transition log.
    pub fn reset_account_drawdown(&mut self) {
        self.account_drawdown.reset_to_current_equity();
    }

    pub fn config(&self) -> &RiskEngineConfig {
        &self.config
    }

    /// The active profile's parameter set.
    pub fn profile_config(&self) -> &ProfileConfig {
        &self.profile_config
    }

    pub fn trailing_stops(&self) -> &TrailingStopManager {
        &self.trailing_stops
    }

    pub fn partial_take_profit(&self) -> &PartialTakeProfitManager {
        &self.partial_take_profit
    }

    pub fn peak_drawdown(&self) -> &PeakDrawdownManager {
        &self.peak_drawdown
    }

    pub fn holding_time(&self) -> &MaxHoldingTimeManager {
        &self.holding_time
    }

    pub fn account_drawdown(&self) -> &AccountDrawdownManager {
        &self.account_drawdown
    }
}
