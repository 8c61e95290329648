//! Z-score feature scaling
//!
//! Parameters are fitted offline and shipped inside the model artifact, so the
//! vector a model sees at inference is scaled exactly as during training.

use serde::{Deserialize, Serialize};

use crate::features::schema::FEATURE_COUNT;
use crate::{FootballError, Result};

/// Smallest standard deviation an artifact may ship
const MIN_STD: f32 = 0.001;

/// Per-feature z-score parameters: (x - mean) / std
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScaling {
    pub mean: Vec<f32>,
    pub std: Vec<f32>,
}

impl FeatureScaling {
    /// Pass-through scaling (mean 0, std 1)
    pub fn identity() -> Self {
        FeatureScaling {
            mean: vec![0.0; FEATURE_COUNT],
            std: vec![1.0; FEATURE_COUNT],
        }
    }

    /// Check the parameters can scale a vector of the current layout
    pub fn validate(&self) -> Result<()> {
        if self.mean.len() != FEATURE_COUNT || self.std.len() != FEATURE_COUNT {
            return Err(FootballError::ModelIncompatible(format!(
                "scaling has {}/{} parameters, expected {}",
                self.mean.len(),
                self.std.len(),
                FEATURE_COUNT
            )));
        }
        let bad = self
            .mean
            .iter()
            .chain(self.std.iter())
            .any(|v| !v.is_finite())
            || self.std.iter().any(|s| *s < MIN_STD);
        if bad {
            return Err(FootballError::ModelIncompatible(
                "scaling parameters must be finite with std of at least 0.001".to_string(),
            ));
        }
        Ok(())
    }

    /// Scale a raw feature row
    pub fn apply(&self, raw: &[f32]) -> Vec<f32> {
        raw.iter()
            .zip(self.mean.iter().zip(self.std.iter()))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }
}

impl Default for FeatureScaling {
    fn default() -> Self {
        Self::identity()
    }
}
