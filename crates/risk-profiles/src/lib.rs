//! Trading profile store.
//!
//! Three named, immutable parameter sets (Conservative / Balanced /
//! Aggressive) supplying every numeric threshold used by the risk engine:
//! leverage and position-size tiers, leverage-banded stop-losses, trailing
//! stop levels, partial take-profit stages, the peak-drawdown threshold and
//! ATR-banded volatility factors.

mod presets;
mod profile;

pub use presets::TradingProfile;
pub use profile::{
    PartialTakeProfitStage, ProfileConfig, TrailingStopLevel, VolatilityAdjustment,
};
