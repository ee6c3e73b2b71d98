//! Data ingestion and dataset assembly
//!
//! CSV loading of historical games and the labeled feature table built from them.

pub mod dataset;
pub mod loader;

pub use dataset::{DatasetAssembler, FeatureRow, FeatureTable, OverUnderStats, TiePolicy};
pub use loader::{GameLoader, GameLog, TeamRegistry};
