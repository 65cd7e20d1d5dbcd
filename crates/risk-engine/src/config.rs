//! Engine configuration.

use risk_core::RiskError;
use risk_profiles::TradingProfile;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Risk engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskEngineConfig {
    /// Active trading profile
    pub profile: TradingProfile,
    /// Starting account equity
    pub initial_equity: Decimal,
    /// Maximum hours a position may be held
    pub max_holding_hours: f64,
    /// Account drawdown % that raises a warning
    pub warning_threshold: Decimal,
    /// Account drawdown % that blocks new positions
    pub no_new_positions_threshold: Decimal,
    /// Account drawdown % that force-closes everything
    pub force_close_threshold: Decimal,
}

impl Default for RiskEngineConfig {
    fn default() -> Self {
        Self {
            profile: TradingProfile::Balanced,
            initial_equity: dec!(10000),
            max_holding_hours: 36.0,
            warning_threshold: dec!(20),
            no_new_positions_threshold: dec!(30),
            force_close_threshold: dec!(50),
        }
    }
}

impl RiskEngineConfig {
    /// Validate the configuration.
    ///
    /// The three account thresholds must be positive and strictly
    /// ascending; the profile tables must satisfy their ordering
    /// invariants.
    pub fn validate(&self) -> Result<(), RiskError> {
        self.profile.config().validate()?;

        if self.initial_equity <= Decimal::ZERO {
            return Err(RiskError::Config(format!(
                "initial equity must be positive: {}",
                self.initial_equity
            )));
        }

        if self.max_holding_hours <= 0.0 {
            return Err(RiskError::Config(format!(
                "max holding hours must be positive: {}",
                self.max_holding_hours
            )));
        }

        if self.warning_threshold <= Decimal::ZERO
            || self.warning_threshold >= self.no_new_positions_threshold
            || self.no_new_positions_threshold >= self.force_close_threshold
        {
            return Err(RiskError::Config(format!(
                "account thresholds must be positive and strictly ascending: {}% / {}% / {}%",
                self.warning_threshold,
                self.no_new_positions_threshold,
                self.force_close_threshold
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(RiskEngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_unordered_thresholds_rejected() {
        let config = RiskEngineConfig {
            warning_threshold: dec!(30),
            no_new_positions_threshold: dec!(30),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_non_positive_equity_rejected() {
        let config = RiskEngineConfig {
            initial_equity: Decimal::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
