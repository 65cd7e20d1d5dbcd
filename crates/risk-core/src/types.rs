//! Shared domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Position side (long or short).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// Side-adjusted percentage move from entry to the current price.
    ///
    /// Long positions profit from price rising, shorts from price falling.
    /// Not leverage-scaled. A zero or negative entry price yields 0%.
    pub fn pnl_percent(&self, entry_price: Decimal, current_price: Decimal) -> Decimal {
        if entry_price <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let move_pct = match self {
            Side::Long => (current_price - entry_price) / entry_price,
            Side::Short => (entry_price - current_price) / entry_price,
        };

        move_pct * Decimal::from(100)
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// Signal strength tiers consumed by the profile store.
///
/// The signal source itself is external; strength only selects which
/// leverage / position-size tier a profile recommends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStrength {
    Normal,
    Good,
    Strong,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_long_pnl_percent() {
        let pnl = Side::Long.pnl_percent(dec!(50000), dec!(54000));
        assert_eq!(pnl, dec!(8));

        let pnl = Side::Long.pnl_percent(dec!(50000), dec!(49000));
        assert_eq!(pnl, dec!(-2));
    }

    #[test]
    fn test_short_pnl_percent() {
        let pnl = Side::Short.pnl_percent(dec!(100), dec!(90));
        assert_eq!(pnl, dec!(10));

        let pnl = Side::Short.pnl_percent(dec!(100), dec!(105));
        assert_eq!(pnl, dec!(-5));
    }

    #[test]
    fn test_zero_entry_price_guarded() {
        assert_eq!(Side::Long.pnl_percent(Decimal::ZERO, dec!(100)), Decimal::ZERO);
        assert_eq!(Side::Short.pnl_percent(dec!(-1), dec!(100)), Decimal::ZERO);
    }

    #[test]
    fn test_side_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Side::Long).unwrap(), "\"long\"");
        assert_eq!(
            serde_json::from_str::<Side>("\"short\"").unwrap(),
            Side::Short
        );
    }
}
