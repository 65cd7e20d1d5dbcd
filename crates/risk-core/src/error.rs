//! Error types for the risk management engine.

use rust_decimal::Decimal;
use thiserror::Error;

/// Top-level risk engine error.
#[derive(Error, Debug)]
pub enum RiskError {
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Profile table validation errors.
///
/// Produced when a profile's threshold tables violate the ordering
/// invariants they are assumed to satisfy at read time.
#[derive(Error, Debug)]
pub enum ProfileError {
    #[error(
        "trailing stop levels must be strictly ascending in trigger and stop: \
         level {index} ({trigger}% / {stop_at}%)"
    )]
    TrailingStopOrder {
        index: usize,
        trigger: Decimal,
        stop_at: Decimal,
    },

    #[error("take-profit stages must be strictly ascending in trigger: stage {index} ({trigger}%)")]
    TakeProfitOrder { index: usize, trigger: Decimal },

    #[error("take-profit close percent must be in (0, 100]: stage {index} ({close_percent}%)")]
    ClosePercentRange {
        index: usize,
        close_percent: Decimal,
    },

    #[error("peak drawdown threshold must be positive: {value}%")]
    PeakDrawdownThreshold { value: Decimal },

    #[error("leverage range is inverted: {min}x..{max}x")]
    LeverageRange { min: u32, max: u32 },

    #[error("position size range is inverted: {min}%..{max}%")]
    PositionSizeRange { min: Decimal, max: Decimal },
}

/// Result type alias for risk operations.
pub type RiskResult<T> = Result<T, RiskError>;
