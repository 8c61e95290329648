//! Prediction model
//!
//! A multi-head network behind the `PredictionModel` trait:
//! - net: trunk and heads, plus the hand-weighted baseline
//! - artifact: versioned manifest and weights on disk
//! - inference: the inference wrapper and the write-once model slot

pub mod artifact;
pub mod inference;
pub mod net;

pub use artifact::{Calibration, ModelManifest};
pub use inference::{BurnModel, ModelSlot, PredictionModel, RawModelOutput};
pub use net::{MatchNet, MatchNetConfig};
