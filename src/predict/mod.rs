//! Prediction
//!
//! Calibrates raw model outputs into bounded probabilities and assembles predictions.

pub mod calibrate;
pub mod engine;
pub mod prediction;

pub use engine::{Health, PredictionEngine};
pub use prediction::{format_prediction, Analysis, Prediction};
