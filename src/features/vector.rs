//! The model input vector

use serde::Serialize;

use crate::features::scaling::FeatureScaling;
use crate::features::schema::{FeatureId, FEATURE_COUNT};
use crate::{FootballError, Result};

/// Fixed-order feature vector for one fixture
///
/// Holds both the raw (interpretable) values and the scaled values fed to the model.
/// Built once per query and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector {
    raw: Vec<f32>,
    scaled: Vec<f32>,
}

impl FeatureVector {
    /// Scale a raw row with the model's parameters
    pub fn new(raw: Vec<f32>, scaling: &FeatureScaling) -> Self {
        let scaled = scaling.apply(&raw);
        FeatureVector { raw, scaled }
    }

    pub fn raw(&self) -> &[f32] {
        &self.raw
    }

    /// Values the model consumes
    pub fn scaled(&self) -> &[f32] {
        &self.scaled
    }

    pub fn len(&self) -> usize {
        self.scaled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scaled.is_empty()
    }

    /// Enforce the input contract: exactly `FEATURE_COUNT` finite values
    pub fn validate(&self) -> Result<()> {
        if self.raw.len() != FEATURE_COUNT || self.scaled.len() != FEATURE_COUNT {
            return Err(FootballError::FeatureContract(format!(
                "expected {} features, got {} raw / {} scaled",
                FEATURE_COUNT,
                self.raw.len(),
                self.scaled.len()
            )));
        }

        let bad: Vec<&str> = self
            .raw
            .iter()
            .zip(self.scaled.iter())
            .enumerate()
            .filter(|(_, (r, s))| !r.is_finite() || !s.is_finite())
            .filter_map(|(i, _)| FeatureId::from_index(i).map(FeatureId::name))
            .collect();
        if !bad.is_empty() {
            return Err(FootballError::FeatureContract(format!(
                "non-finite features: {}",
                bad.join(", ")
            )));
        }
        Ok(())
    }

    /// Named raw values, for logging
    pub fn named(&self) -> Vec<(&'static str, f32)> {
        FeatureId::ALL
            .iter()
            .zip(self.raw.iter())
            .map(|(id, v)| (id.name(), *v))
            .collect()
    }
}
