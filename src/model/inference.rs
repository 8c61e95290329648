//! Inference wrapper
//!
//! `PredictionModel` is the seam between the engine and whatever produces raw
//! outputs; `BurnModel` is the production implementation over `MatchNet`.

use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::features::scaling::FeatureScaling;
use crate::features::schema::FEATURE_COUNT;
use crate::features::vector::FeatureVector;
use crate::model::artifact::{load_artifact, ModelManifest};
use crate::model::net::{FrozenNet, MatchNet};
use crate::{FootballError, Result};

/// Unsquashed outputs of the four heads
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RawModelOutput {
    /// Home / draw / away scores
    pub result_logits: [f32; 3],
    /// Home / away expected goals
    pub expected_goals: [f32; 2],
    pub over_under_logit: f32,
    pub btts_logit: f32,
}

impl RawModelOutput {
    /// Names of any non-finite outputs
    pub fn non_finite(&self) -> Vec<&'static str> {
        let checks = [
            ("result_home", self.result_logits[0]),
            ("result_draw", self.result_logits[1]),
            ("result_away", self.result_logits[2]),
            ("expected_goals_home", self.expected_goals[0]),
            ("expected_goals_away", self.expected_goals[1]),
            ("over_under", self.over_under_logit),
            ("btts", self.btts_logit),
        ];
        checks
            .iter()
            .filter(|(_, v)| !v.is_finite())
            .map(|(name, _)| *name)
            .collect()
    }
}

/// A loaded model: a pure function from features to raw outputs
pub trait PredictionModel {
    /// Run inference on one validated vector
    fn infer(&self, features: &FeatureVector) -> Result<RawModelOutput>;

    /// Manifest the model was loaded with
    fn manifest(&self) -> &ModelManifest;

    fn version(&self) -> &str {
        &self.manifest().model_version
    }

    fn scaling(&self) -> &FeatureScaling {
        &self.manifest().scaling
    }
}

/// Frozen `MatchNet` weights plus their manifest
///
/// `Send + Sync`, so one instance serves concurrent requests behind an `Arc`.
#[derive(Debug)]
pub struct BurnModel<B: Backend> {
    net: FrozenNet<B>,
    manifest: ModelManifest,
    device: B::Device,
}

impl<B: Backend> BurnModel<B> {
    pub fn new(net: MatchNet<B>, manifest: ModelManifest, device: B::Device) -> Result<Self> {
        manifest.validate()?;
        Ok(BurnModel {
            net: net.freeze(),
            manifest,
            device,
        })
    }

    /// Load from an artifact directory
    pub fn load<P: AsRef<Path>>(dir: P, device: B::Device) -> Result<Self>
    where
        B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
        B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
    {
        let (net, manifest) = load_artifact::<B, _>(dir, &device)?;
        Self::new(net, manifest, device)
    }

    /// The hand-weighted baseline with identity scaling
    pub fn baseline(device: B::Device) -> Result<Self> {
        let (net, config) = MatchNet::baseline(&device);
        Self::new(net, ModelManifest::baseline(config), device)
    }
}

fn tensor_values<B: Backend>(t: Tensor<B, 2>, head: &str) -> Result<Vec<f32>> {
    t.to_data()
        .convert::<f32>()
        .to_vec::<f32>()
        .map_err(|e| FootballError::ModelOutputInvalid(format!("{} head: {:?}", head, e)))
}

impl<B: Backend> PredictionModel for BurnModel<B> {
    fn infer(&self, features: &FeatureVector) -> Result<RawModelOutput> {
        let input = features.scaled();
        if input.len() != FEATURE_COUNT {
            return Err(FootballError::FeatureContract(format!(
                "expected {} features, got {}",
                FEATURE_COUNT,
                input.len()
            )));
        }

        let x = Tensor::<B, 2>::from_data(TensorData::new(input.to_vec(), [1, FEATURE_COUNT]), &self.device);
        let out = self.net.forward(x);

        let result = tensor_values(out.result_logits, "result")?;
        let goals = tensor_values(out.expected_goals, "expected goals")?;
        let over_under = tensor_values(out.over_under_logit, "over/under")?;
        let btts = tensor_values(out.btts_logit, "btts")?;

        if result.len() != 3 || goals.len() != 2 || over_under.len() != 1 || btts.len() != 1 {
            return Err(FootballError::ModelOutputInvalid(format!(
                "unexpected head widths {}/{}/{}/{}",
                result.len(),
                goals.len(),
                over_under.len(),
                btts.len()
            )));
        }

        Ok(RawModelOutput {
            result_logits: [result[0], result[1], result[2]],
            expected_goals: [goals[0], goals[1]],
            over_under_logit: over_under[0],
            btts_logit: btts[0],
        })
    }

    fn manifest(&self) -> &ModelManifest {
        &self.manifest
    }
}

/// Write-once shared handle to the loaded model
#[derive(Debug)]
pub struct ModelSlot<M> {
    cell: OnceLock<Arc<M>>,
}

impl<M> ModelSlot<M> {
    pub const fn new() -> Self {
        ModelSlot {
            cell: OnceLock::new(),
        }
    }

    /// Install the model; a slot can be filled only once
    pub fn install(&self, model: M) -> Result<Arc<M>> {
        let model = Arc::new(model);
        self.cell
            .set(Arc::clone(&model))
            .map_err(|_| FootballError::ModelAlreadyLoaded)?;
        Ok(model)
    }

    /// The loaded model, or `ModelUnavailable`
    pub fn get(&self) -> Result<Arc<M>> {
        self.cell.get().cloned().ok_or(FootballError::ModelUnavailable)
    }

    pub fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<M> Default for ModelSlot<M> {
    fn default() -> Self {
        Self::new()
    }
}
