//! The three built-in profiles.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::{PartialTakeProfitStage, ProfileConfig, TrailingStopLevel, VolatilityAdjustment};

/// Profile tag selecting one of the built-in parameter sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TradingProfile {
    Conservative,
    #[default]
    Balanced,
    Aggressive,
}

impl TradingProfile {
    pub const ALL: [TradingProfile; 3] = [
        TradingProfile::Conservative,
        TradingProfile::Balanced,
        TradingProfile::Aggressive,
    ];

    /// Build the parameter set for this profile.
    pub fn config(self) -> ProfileConfig {
        match self {
            TradingProfile::Conservative => conservative(),
            TradingProfile::Balanced => balanced(),
            TradingProfile::Aggressive => aggressive(),
        }
    }
}

impl std::fmt::Display for TradingProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingProfile::Conservative => write!(f, "conservative"),
            TradingProfile::Balanced => write!(f, "balanced"),
            TradingProfile::Aggressive => write!(f, "aggressive"),
        }
    }
}

fn conservative() -> ProfileConfig {
    ProfileConfig {
        name: "Conservative".to_string(),
        description: "Low risk, strict entry conditions, early profit-taking".to_string(),

        leverage_min: 3,
        leverage_max: 6,
        leverage_normal: 3,
        leverage_good: 4,
        leverage_strong: 6,

        position_size_min: dec!(15.0),
        position_size_max: dec!(22.0),
        position_size_normal: dec!(16.0),
        position_size_good: dec!(18.5),
        position_size_strong: dec!(21.0),

        stop_loss_low: dec!(-3.5),
        stop_loss_mid: dec!(-3.0),
        stop_loss_high: dec!(-2.5),

        trailing_stops: vec![
            TrailingStopLevel {
                trigger_pct: dec!(6.0),
                stop_at_pct: dec!(2.0),
            },
            TrailingStopLevel {
                trigger_pct: dec!(12.0),
                stop_at_pct: dec!(6.0),
            },
            TrailingStopLevel {
                trigger_pct: dec!(20.0),
                stop_at_pct: dec!(12.0),
            },
        ],

        partial_take_profit: vec![
            PartialTakeProfitStage {
                trigger_pct: dec!(20.0),
                close_percent: dec!(50.0),
            },
            PartialTakeProfitStage {
                trigger_pct: dec!(30.0),
                close_percent: dec!(50.0),
            },
            PartialTakeProfitStage {
                trigger_pct: dec!(40.0),
                close_percent: dec!(100.0),
            },
        ],

        peak_drawdown_threshold: dec!(25.0),

        high_volatility_adjustment: VolatilityAdjustment {
            leverage_factor: dec!(0.6),
            position_factor: dec!(0.7),
        },
        normal_volatility_adjustment: VolatilityAdjustment {
            leverage_factor: dec!(1.0),
            position_factor: dec!(1.0),
        },
        low_volatility_adjustment: VolatilityAdjustment {
            leverage_factor: dec!(1.0),
            position_factor: dec!(1.0),
        },

        min_timeframe_confirmations: 3,
    }
}

fn balanced() -> ProfileConfig {
    ProfileConfig {
        name: "Balanced".to_string(),
        description: "Medium risk, moderate entry conditions, balanced profit-taking".to_string(),

        leverage_min: 6,
        leverage_max: 8,
        leverage_normal: 6,
        leverage_good: 7,
        leverage_strong: 8,

        position_size_min: dec!(20.0),
        position_size_max: dec!(27.0),
        position_size_normal: dec!(21.5),
        position_size_good: dec!(24.0),
        position_size_strong: dec!(26.0),

        stop_loss_low: dec!(-3.0),
        stop_loss_mid: dec!(-2.5),
        stop_loss_high: dec!(-2.0),

        trailing_stops: vec![
            TrailingStopLevel {
                trigger_pct: dec!(8.0),
                stop_at_pct: dec!(3.0),
            },
            TrailingStopLevel {
                trigger_pct: dec!(15.0),
                stop_at_pct: dec!(8.0),
            },
            TrailingStopLevel {
                trigger_pct: dec!(25.0),
                stop_at_pct: dec!(15.0),
            },
        ],

        partial_take_profit: vec![
            PartialTakeProfitStage {
                trigger_pct: dec!(30.0),
                close_percent: dec!(50.0),
            },
            PartialTakeProfitStage {
                trigger_pct: dec!(40.0),
                close_percent: dec!(50.0),
            },
            PartialTakeProfitStage {
                trigger_pct: dec!(50.0),
                close_percent: dec!(100.0),
            },
        ],

        peak_drawdown_threshold: dec!(30.0),

        high_volatility_adjustment: VolatilityAdjustment {
            leverage_factor: dec!(0.7),
            position_factor: dec!(0.8),
        },
        normal_volatility_adjustment: VolatilityAdjustment {
            leverage_factor: dec!(1.0),
            position_factor: dec!(1.0),
        },
        low_volatility_adjustment: VolatilityAdjustment {
            leverage_factor: dec!(1.1),
            position_factor: dec!(1.0),
        },

        min_timeframe_confirmations: 2,
    }
}

fn aggressive() -> ProfileConfig {
    ProfileConfig {
        name: "Aggressive".to_string(),
        description: "High risk, relaxed entry conditions, late profit-taking".to_string(),

        leverage_min: 8,
        leverage_max: 10,
        leverage_normal: 8,
        leverage_good: 9,
        leverage_strong: 10,

        position_size_min: dec!(25.0),
        position_size_max: dec!(32.0),
        position_size_normal: dec!(26.5),
        position_size_good: dec!(29.0),
        position_size_strong: dec!(31.0),

        stop_loss_low: dec!(-2.5),
        stop_loss_mid: dec!(-2.0),
        stop_loss_high: dec!(-1.5),

        trailing_stops: vec![
            TrailingStopLevel {
                trigger_pct: dec!(10.0),
                stop_at_pct: dec!(4.0),
            },
            TrailingStopLevel {
                trigger_pct: dec!(18.0),
                stop_at_pct: dec!(10.0),
            },
            TrailingStopLevel {
                trigger_pct: dec!(30.0),
                stop_at_pct: dec!(18.0),
            },
        ],

        partial_take_profit: vec![
            PartialTakeProfitStage {
                trigger_pct: dec!(40.0),
                close_percent: dec!(50.0),
            },
            PartialTakeProfitStage {
                trigger_pct: dec!(50.0),
                close_percent: dec!(50.0),
            },
            PartialTakeProfitStage {
                trigger_pct: dec!(60.0),
                close_percent: dec!(100.0),
            },
        ],

        peak_drawdown_threshold: dec!(35.0),

        high_volatility_adjustment: VolatilityAdjustment {
            leverage_factor: dec!(0.8),
            position_factor: dec!(0.85),
        },
        normal_volatility_adjustment: VolatilityAdjustment {
            leverage_factor: dec!(1.0),
            position_factor: dec!(1.0),
        },
        low_volatility_adjustment: VolatilityAdjustment {
            leverage_factor: dec!(1.2),
            position_factor: dec!(1.1),
        },

        min_timeframe_confirmations: 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile_is_balanced() {
        assert_eq!(TradingProfile::default(), TradingProfile::Balanced);
    }

    #[test]
    fn test_profile_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&TradingProfile::Conservative).unwrap(),
            "\"conservative\""
        );
        assert_eq!(
            serde_json::from_str::<TradingProfile>("\"aggressive\"").unwrap(),
            TradingProfile::Aggressive
        );
    }

    #[test]
    fn test_profiles_escalate_risk() {
        let conservative = conservative();
        let balanced = balanced();
        let aggressive = aggressive();

        assert!(conservative.leverage_max < balanced.leverage_max);
        assert!(balanced.leverage_max < aggressive.leverage_max);
        assert!(conservative.peak_drawdown_threshold < balanced.peak_drawdown_threshold);
        assert!(balanced.peak_drawdown_threshold < aggressive.peak_drawdown_threshold);
    }

    #[test]
    fn test_balanced_trailing_stop_table() {
        let config = balanced();
        assert_eq!(config.trailing_stops.len(), 3);
        assert_eq!(config.trailing_stops[0].trigger_pct, dec!(8.0));
        assert_eq!(config.trailing_stops[0].stop_at_pct, dec!(3.0));
        assert_eq!(config.partial_take_profit[0].trigger_pct, dec!(30.0));
        assert_eq!(config.partial_take_profit[0].close_percent, dec!(50.0));
    }
}
