//! Core types and errors for the risk management engine.
//!
//! This crate provides the foundational building blocks shared by the
//! profile store and the risk engine:
//! - Position side and side-adjusted P&L math
//! - Signal strength tiers
//! - Error types

pub mod error;
pub mod types;

pub use error::{ProfileError, RiskError, RiskResult};
pub use types::{Side, SignalStrength};
