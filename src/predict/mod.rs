//! Prediction and inference
//!
//! Score upcoming games from the rolling state left after the full history.

pub mod inference;

pub use inference::{format_prediction, Matchup, Predictor};
