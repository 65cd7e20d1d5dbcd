//! Position and account protection engine.
//!
//! A set of independent, continuously-updated protection mechanisms that
//! decide, per open position and for the account as a whole, whether a
//! position must be closed (fully or partially) and whether new positions
//! may be opened:
//! - Trailing stops ratcheted to profit milestones
//! - Staged partial take-profit
//! - Exit on retracement from peak profit
//! - Maximum holding time enforcement
//! - Account-wide 3-tier drawdown circuit breaker
//!
//! All operations are synchronous and CPU-bound; the engine performs no
//! I/O and must be driven by a single logical caller (see
//! [`RiskCoordinator`]). It is not internally thread-safe.

mod account_drawdown;
mod config;
mod coordinator;
mod holding_time;
mod partial_take_profit;
mod peak_drawdown;
mod trailing_stop;

pub use account_drawdown::{
    AccountDrawdownManager, AccountDrawdownState, AdmissionCheck, DrawdownEvent, DrawdownLevel,
};
pub use config::RiskEngineConfig;
pub use coordinator::{ExitDecision, PositionRiskState, PositionUpdate, RiskCoordinator};
pub use holding_time::{HoldingTimeState, HoldingTimeUpdate, MaxHoldingTimeManager};
pub use partial_take_profit::{
    PartialTakeProfitManager, PartialTakeProfitState, PendingClose, TakeProfitExecution,
};
pub use peak_drawdown::{PeakDrawdownManager, PeakDrawdownState, PeakDrawdownUpdate};
pub use trailing_stop::{TrailingStopManager, TrailingStopState, TrailingStopUpdate};
