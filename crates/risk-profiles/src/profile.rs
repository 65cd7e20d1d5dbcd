//! Profile configuration and validation.

use risk_core::{ProfileError, SignalStrength};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// A single trailing stop level.
///
/// When profit reaches `trigger_pct`, the stop floor moves to `stop_at_pct`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingStopLevel {
    /// Profit % that activates this level
    pub trigger_pct: Decimal,
    /// Profit % the stop is moved to
    pub stop_at_pct: Decimal,
}

/// A single partial take-profit stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PartialTakeProfitStage {
    /// Profit % that triggers this stage
    pub trigger_pct: Decimal,
    /// Percentage of the remaining position to close (0-100]
    pub close_percent: Decimal,
}

/// Volatility-banded adjustment factors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolatilityAdjustment {
    /// Multiply leverage by this factor
    pub leverage_factor: Decimal,
    /// Multiply position size by this factor
    pub position_factor: Decimal,
}

/// Complete trading profile configuration.
///
/// Immutable once validated; the ascending-order invariants on the level
/// and stage tables are enforced by [`ProfileConfig::validate`] at
/// construction time rather than trusted at each read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileConfig {
    pub name: String,
    pub description: String,

    /// Leverage range and signal-strength tiers
    pub leverage_min: u32,
    pub leverage_max: u32,
    pub leverage_normal: u32,
    pub leverage_good: u32,
    pub leverage_strong: u32,

    /// Position size (% of equity) range and signal-strength tiers
    pub position_size_min: Decimal,
    pub position_size_max: Decimal,
    pub position_size_normal: Decimal,
    pub position_size_good: Decimal,
    pub position_size_strong: Decimal,

    /// Leverage-banded initial stop-losses (% profit, negative for loss)
    pub stop_loss_low: Decimal,
    pub stop_loss_mid: Decimal,
    pub stop_loss_high: Decimal,

    /// Trailing stop levels, strictly ascending in trigger and stop
    pub trailing_stops: Vec<TrailingStopLevel>,

    /// Partial take-profit stages, strictly ascending in trigger
    pub partial_take_profit: Vec<PartialTakeProfitStage>,

    /// Exit threshold for retracement from peak profit (%)
    pub peak_drawdown_threshold: Decimal,

    /// ATR > 5%
    pub high_volatility_adjustment: VolatilityAdjustment,
    /// ATR 2-5%
    pub normal_volatility_adjustment: VolatilityAdjustment,
    /// ATR < 2%
    pub low_volatility_adjustment: VolatilityAdjustment,

    /// Minimum timeframes that must agree before entry
    pub min_timeframe_confirmations: u32,
}

impl ProfileConfig {
    /// Validate the ordering and range invariants of the threshold tables.
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.leverage_min > self.leverage_max {
            return Err(ProfileError::LeverageRange {
                min: self.leverage_min,
                max: self.leverage_max,
            });
        }

        if self.position_size_min > self.position_size_max {
            return Err(ProfileError::PositionSizeRange {
                min: self.position_size_min,
                max: self.position_size_max,
            });
        }

        for (index, pair) in self.trailing_stops.windows(2).enumerate() {
            let (prev, next) = (pair[0], pair[1]);
            if next.trigger_pct <= prev.trigger_pct || next.stop_at_pct <= prev.stop_at_pct {
                return Err(ProfileError::TrailingStopOrder {
                    index: index + 1,
                    trigger: next.trigger_pct,
                    stop_at: next.stop_at_pct,
                });
            }
        }

        for (index, pair) in self.partial_take_profit.windows(2).enumerate() {
            if pair[1].trigger_pct <= pair[0].trigger_pct {
                return Err(ProfileError::TakeProfitOrder {
                    index: index + 1,
                    trigger: pair[1].trigger_pct,
                });
            }
        }

        for (index, stage) in self.partial_take_profit.iter().enumerate() {
            if stage.close_percent <= Decimal::ZERO || stage.close_percent > dec!(100) {
                return Err(ProfileError::ClosePercentRange {
                    index,
                    close_percent: stage.close_percent,
                });
            }
        }

        if self.peak_drawdown_threshold <= Decimal::ZERO {
            return Err(ProfileError::PeakDrawdownThreshold {
                value: self.peak_drawdown_threshold,
            });
        }

        Ok(())
    }

    /// Recommended leverage for a given signal strength.
    pub fn leverage_for_signal_strength(&self, strength: SignalStrength) -> u32 {
        match strength {
            SignalStrength::Normal => self.leverage_normal,
            SignalStrength::Good => self.leverage_good,
            SignalStrength::Strong => self.leverage_strong,
        }
    }

    /// Recommended position size (% of equity) for a given signal strength.
    pub fn position_size_for_signal_strength(&self, strength: SignalStrength) -> Decimal {
        match strength {
            SignalStrength::Normal => self.position_size_normal,
            SignalStrength::Good => self.position_size_good,
            SignalStrength::Strong => self.position_size_strong,
        }
    }

    /// Recommended initial stop-loss for the leverage actually used.
    ///
    /// Higher leverage gets the tighter stop band.
    pub fn stop_loss_for_leverage(&self, leverage: u32) -> Decimal {
        let mid = (self.leverage_min + self.leverage_max) as f64 / 2.0;
        let high = (self.leverage_min + self.leverage_max) as f64 * 0.75;

        if (leverage as f64) <= mid {
            self.stop_loss_low
        } else if (leverage as f64) <= high {
            self.stop_loss_mid
        } else {
            self.stop_loss_high
        }
    }

    /// Volatility adjustment band for a given ATR (as % of price).
    pub fn volatility_adjustment(&self, atr_percent: Decimal) -> &VolatilityAdjustment {
        if atr_percent > dec!(5) {
            &self.high_volatility_adjustment
        } else if atr_percent >= dec!(2) {
            &self.normal_volatility_adjustment
        } else {
            &self.low_volatility_adjustment
        }
    }
}
