//! Account-level drawdown circuit breaker.
//!
//! Maps equity drawdown from the account's peak onto three ascending
//! tiers: warning, no-new-positions, and force-close-all. Tier
//! transitions in either direction are appended to a process-lifetime
//! event log.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

/// Account drawdown protection tier, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrawdownLevel {
    /// No drawdown concerns
    Normal,
    /// Warning threshold breached
    Warning,
    /// New positions blocked, closes still allowed
    NoNewPositions,
    /// Emergency liquidation of all positions
    ForceClose,
}

impl std::fmt::Display for DrawdownLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrawdownLevel::Normal => write!(f, "normal"),
            DrawdownLevel::Warning => write!(f, "warning"),
            DrawdownLevel::NoNewPositions => write!(f, "no_new_positions"),
            DrawdownLevel::ForceClose => write!(f, "force_close"),
        }
    }
}

/// A tier transition, recorded in either direction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawdownEvent {
    pub timestamp: DateTime<Utc>,
    pub from_level: DrawdownLevel,
    pub to_level: DrawdownLevel,
    pub peak_equity: Decimal,
    pub current_equity: Decimal,
    pub drawdown_percent: Decimal,
    pub action: String,
}

/// Current state of the account circuit breaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDrawdownState {
    /// Highest equity reached; never retreats except via operator reset
    pub peak_equity: Decimal,
    pub peak_equity_time: DateTime<Utc>,
    pub current_equity: Decimal,
    pub current_drawdown_percent: Decimal,
    pub current_level: DrawdownLevel,
    pub warning_threshold: Decimal,
    pub no_new_positions_threshold: Decimal,
    pub force_close_threshold: Decimal,
    pub last_updated: DateTime<Utc>,
}

impl AccountDrawdownState {
    /// Drawdown from peak equity as a percentage; 0% on a non-positive peak.
    pub fn drawdown(&self) -> Decimal {
        if self.peak_equity <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let drawdown = (self.peak_equity - self.current_equity) / self.peak_equity * dec!(100);
        drawdown.max(Decimal::ZERO)
    }

    /// The tier is a pure function of drawdown vs. the three thresholds.
    pub fn determine_level(&self) -> DrawdownLevel {
        let drawdown = self.drawdown();

        if drawdown >= self.force_close_threshold {
            DrawdownLevel::ForceClose
        } else if drawdown >= self.no_new_positions_threshold {
            DrawdownLevel::NoNewPositions
        } else if drawdown >= self.warning_threshold {
            DrawdownLevel::Warning
        } else {
            DrawdownLevel::Normal
        }
    }
}

/// Result of the admission-control check for new positions.
#[derive(Debug, Clone)]
pub enum AdmissionCheck {
    /// New positions allowed
    Allowed,
    /// Allowed, but the account is in the warning tier
    AllowedWithWarning { warning: String },
    /// New positions blocked
    Blocked { reason: String },
}

impl AdmissionCheck {
    pub fn can_open(&self) -> bool {
        matches!(
            self,
            AdmissionCheck::Allowed | AdmissionCheck::AllowedWithWarning { .. }
        )
    }
}

/// Manages the account-wide drawdown circuit breaker.
#[derive(Debug, Clone)]
pub struct AccountDrawdownManager {
    state: AccountDrawdownState,
    events: Vec<DrawdownEvent>,
}

impl AccountDrawdownManager {
    pub fn new(
        initial_equity: Decimal,
        warning_threshold: Decimal,
        no_new_positions_threshold: Decimal,
        force_close_threshold: Decimal,
    ) -> Self {
        let now = Utc::now();

        info!(
            %initial_equity,
            %warning_threshold,
            %no_new_positions_threshold,
            %force_close_threshold,
            "account drawdown protection initialized"
        );

        Self {
            state: AccountDrawdownState {
                peak_equity: initial_equity,
                peak_equity_time: now,
                current_equity: initial_equity,
                current_drawdown_percent: Decimal::ZERO,
                current_level: DrawdownLevel::Normal,
                warning_threshold,
                no_new_positions_threshold,
                force_close_threshold,
                last_updated: now,
            },
            events: Vec::new(),
        }
    }

    /// Feed a fresh equity valuation.
    ///
    /// Raises the peak on a new high, recomputes the tier, and returns a
    /// transition event when the tier changed in either direction
    /// (including recovery to a lower tier).
    pub fn update_equity(&mut self, current_equity: Decimal) -> Option<DrawdownEvent> {
        let old_level = self.state.current_level;

        self.state.current_equity = current_equity;
        self.state.last_updated = Utc::now();

        if current_equity > self.state.peak_equity {
            let old_peak = self.state.peak_equity;
            self.state.peak_equity = current_equity;
            self.state.peak_equity_time = self.state.last_updated;
            info!(new_peak = %current_equity, old_peak = %old_peak, "new account equity peak");
        }

        self.state.current_drawdown_percent = self.state.drawdown();
        let new_level = self.state.determine_level();
        self.state.current_level = new_level;

        if new_level != old_level {
            return Some(self.record_transition(old_level, new_level));
        }

        None
    }

    fn record_transition(
        &mut self,
        from_level: DrawdownLevel,
        to_level: DrawdownLevel,
    ) -> DrawdownEvent {
        let action = match to_level {
            DrawdownLevel::Normal => "Drawdown level returned to normal",
            DrawdownLevel::Warning => "Risk warning issued - monitor account closely",
            DrawdownLevel::NoNewPositions => "New positions blocked - only position closes allowed",
            DrawdownLevel::ForceClose => {
                "FORCE CLOSE ALL POSITIONS - emergency protection activated"
            }
        };

        let event = DrawdownEvent {
            timestamp: Utc::now(),
            from_level,
            to_level,
            peak_equity: self.state.peak_equity,
            current_equity: self.state.current_equity,
            drawdown_percent: self.state.current_drawdown_percent,
            action: action.to_string(),
        };

        match to_level {
            DrawdownLevel::Normal => info!(
                %from_level, %to_level,
                drawdown = %event.drawdown_percent,
                "account drawdown level changed"
            ),
            DrawdownLevel::Warning => warn!(
                %from_level, %to_level,
                drawdown = %event.drawdown_percent,
                "account drawdown level changed"
            ),
            DrawdownLevel::NoNewPositions | DrawdownLevel::ForceClose => error!(
                %from_level, %to_level,
                drawdown = %event.drawdown_percent,
                peak = %event.peak_equity,
                equity = %event.current_equity,
                "account drawdown level changed"
            ),
        }

        self.events.push(event.clone());
        event
    }

    /// Admission control: may a new position be opened right now?
    pub fn can_open_new_position(&self) -> AdmissionCheck {
        let drawdown = self.state.current_drawdown_percent;

        match self.state.current_level {
            DrawdownLevel::Normal => AdmissionCheck::Allowed,
            DrawdownLevel::Warning => AdmissionCheck::AllowedWithWarning {
                warning: format!("account drawdown at {:.2}%", drawdown),
            },
            DrawdownLevel::NoNewPositions => AdmissionCheck::Blocked {
                reason: format!(
                    "new positions blocked: account drawdown {:.2}% exceeds threshold {:.1}%",
                    drawdown, self.state.no_new_positions_threshold
                ),
            },
            DrawdownLevel::ForceClose => AdmissionCheck::Blocked {
                reason: format!(
                    "account drawdown {:.2}% exceeds critical threshold {:.1}%, \
                     all positions must be closed",
                    drawdown, self.state.force_close_threshold
                ),
            },
        }
    }

    /// True only in the force-close tier; returns the reason.
    pub fn should_force_close_all(&self) -> Option<String> {
        if self.state.current_level == DrawdownLevel::ForceClose {
            return Some(format!(
                "account drawdown {:.2}% reached critical threshold {:.1}% \
                 (peak equity: {:.2}, current: {:.2})",
                self.state.current_drawdown_percent,
                self.state.force_close_threshold,
                self.state.peak_equity,
                self.state.current_equity
            ));
        }

        None
    }

    /// Operator action: restart drawdown tracking from the current equity.
    ///
    /// Resets the peak and tier without clearing the event log.
    pub fn reset_to_current_equity(&mut self) {
        let old_peak = self.state.peak_equity;
        self.state.peak_equity = self.state.current_equity;
        self.state.peak_equity_time = Utc::now();
        self.state.current_drawdown_percent = Decimal::ZERO;
        self.state.current_level = DrawdownLevel::Normal;

        info!(
            old_peak = %old_peak,
            new_peak = %self.state.peak_equity,
            "account drawdown protection reset"
        );
    }

    /// Current circuit-breaker state.
    pub fn state(&self) -> &AccountDrawdownState {
        &self.state
    }

    /// Current drawdown percentage.
    pub fn drawdown_percent(&self) -> Decimal {
        self.state.current_drawdown_percent
    }

    /// Full transition log, oldest first.
    pub fn events(&self) -> &[DrawdownEvent] {
        &self.events
    }

    /// The most recent transitions, oldest first.
    pub fn recent_events(&self, limit: usize) -> &[DrawdownEvent] {
        let start = self.events.len().saturating_sub(limit);
        &self.events[start..]
    }
}
