//! Feature extraction
//!
//! Converts chronologically ordered games into leakage-free rolling features.

pub mod rolling;
pub mod team_stats;

pub use rolling::{GameFeatures, HistoryPolicy, RollingFeatureBuilder, Sentinels, SideFeatures};
pub use team_stats::{RollingWindow, TeamGameStat, TeamState};
