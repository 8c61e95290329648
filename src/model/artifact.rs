//! Versioned model artifacts
//!
//! An artifact is a directory:
//!   manifest.json  - versions, layout hash, architecture, scaling, calibration
//!   weights.mpk    - network parameters (burn named MessagePack, full precision)

use burn::module::Module;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::features::scaling::FeatureScaling;
use crate::features::schema::{layout_hash, FEATURE_COUNT, FEATURE_VERSION};
use crate::model::net::{record_shapes, MatchNet, MatchNetConfig, MatchNetRecord};
use crate::{FootballError, Result};

/// Artifact layout version understood by this build
pub const FORMAT_VERSION: u32 = 1;

const MANIFEST_FILE: &str = "manifest.json";
/// Recorder appends `.mpk`
const WEIGHTS_STEM: &str = "weights";

/// Temperatures applied to logits before squashing; 1.0 = uncalibrated
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub result_temperature: f64,
    pub over_under_temperature: f64,
    pub btts_temperature: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            result_temperature: 1.0,
            over_under_temperature: 1.0,
            btts_temperature: 1.0,
        }
    }
}

/// Everything needed to use a set of weights correctly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub format_version: u32,
    pub model_version: String,
    pub feature_version: u8,
    pub layout_hash: u32,
    pub feature_count: usize,
    pub architecture: MatchNetConfig,
    pub scaling: FeatureScaling,
    #[serde(default)]
    pub calibration: Calibration,
    /// Goal lines the over/under head was trained on
    #[serde(default)]
    pub over_under_lines: Vec<f32>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl ModelManifest {
    /// Manifest for the current feature layout
    pub fn new(model_version: &str, architecture: MatchNetConfig, scaling: FeatureScaling) -> Self {
        ModelManifest {
            format_version: FORMAT_VERSION,
            model_version: model_version.to_string(),
            feature_version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            feature_count: FEATURE_COUNT,
            architecture,
            scaling,
            calibration: Calibration::default(),
            over_under_lines: vec![2.5],
            created_at: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    /// Manifest for the hand-weighted baseline, which reads unscaled features
    pub fn baseline(architecture: MatchNetConfig) -> Self {
        Self::new(
            &format!("baseline-{}", env!("CARGO_PKG_VERSION")),
            architecture,
            FeatureScaling::identity(),
        )
    }

    /// Reject artifacts built for another layout or format
    pub fn validate(&self) -> Result<()> {
        let incompatible = |msg: String| Err(FootballError::ModelIncompatible(msg));

        if self.format_version != FORMAT_VERSION {
            return incompatible(format!(
                "artifact format v{}, expected v{}",
                self.format_version, FORMAT_VERSION
            ));
        }
        if self.feature_version != FEATURE_VERSION || self.layout_hash != layout_hash() {
            return incompatible(format!(
                "feature layout v{} (hash: {:08x}), expected v{} (hash: {:08x})",
                self.feature_version,
                self.layout_hash,
                FEATURE_VERSION,
                layout_hash()
            ));
        }
        if self.feature_count != FEATURE_COUNT || self.architecture.input_dim != FEATURE_COUNT {
            return incompatible(format!(
                "model expects {} features (input {}), layout has {}",
                self.feature_count, self.architecture.input_dim, FEATURE_COUNT
            ));
        }
        if self.model_version.trim().is_empty() {
            return incompatible("model_version is empty".to_string());
        }

        let temps = [
            self.calibration.result_temperature,
            self.calibration.over_under_temperature,
            self.calibration.btts_temperature,
        ];
        if temps.iter().any(|t| !t.is_finite() || *t <= 0.0) {
            return incompatible("calibration temperatures must be positive".to_string());
        }

        self.scaling.validate()
    }

    /// Whether the over/under head was trained on this line
    pub fn supports_line(&self, line: f32) -> bool {
        self.over_under_lines.is_empty()
            || self.over_under_lines.iter().any(|l| (l - line).abs() < 1e-6)
    }
}

fn manifest_path(dir: &Path) -> PathBuf {
    dir.join(MANIFEST_FILE)
}

fn weights_path(dir: &Path) -> PathBuf {
    dir.join(WEIGHTS_STEM)
}

fn recorder_error(e: impl std::fmt::Display) -> FootballError {
    FootballError::Io(std::io::Error::other(e.to_string()))
}

/// Read and validate an artifact manifest without touching the weights
pub fn read_manifest<P: AsRef<Path>>(dir: P) -> Result<ModelManifest> {
    let path = manifest_path(dir.as_ref());
    let content = std::fs::read_to_string(&path).map_err(|e| {
        FootballError::ModelIncompatible(format!("cannot read {}: {}", path.display(), e))
    })?;
    let manifest: ModelManifest = serde_json::from_str(&content)
        .map_err(|e| FootballError::ModelIncompatible(format!("invalid manifest: {}", e)))?;
    manifest.validate()?;
    Ok(manifest)
}

/// Write a network and its manifest to `dir`
pub fn save_artifact<B: Backend, P: AsRef<Path>>(
    dir: P,
    manifest: &ModelManifest,
    net: &MatchNet<B>,
) -> Result<()>
where
    B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
    B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
{
    manifest.validate()?;
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    recorder
        .record(net.clone().into_record(), weights_path(dir))
        .map_err(recorder_error)?;

    std::fs::write(manifest_path(dir), serde_json::to_string_pretty(manifest)?)?;
    log::info!("Saved model {} to {}", manifest.model_version, dir.display());
    Ok(())
}

/// Load a network, checking the manifest first
pub fn load_artifact<B: Backend, P: AsRef<Path>>(
    dir: P,
    device: &B::Device,
) -> Result<(MatchNet<B>, ModelManifest)>
where
    B::FloatElem: serde::Serialize + serde::de::DeserializeOwned,
    B::IntElem: serde::Serialize + serde::de::DeserializeOwned,
{
    let dir = dir.as_ref();
    let manifest = read_manifest(dir)?;

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let record: MatchNetRecord<B> = recorder
        .load(weights_path(dir), device)
        .map_err(|e| FootballError::ModelIncompatible(format!("cannot load weights: {}", e)))?;

    // load_record trusts the record, so a mismatched architecture must stop here
    let expected = manifest.architecture.parameter_shapes();
    let found = record_shapes(&record);
    if found != expected {
        let detail = expected
            .iter()
            .zip(&found)
            .find(|(e, f)| e != f)
            .map(|((name, shape), (found_name, found_shape))| {
                format!("{} {:?}, weights have {} {:?}", name, shape, found_name, found_shape)
            })
            .unwrap_or_else(|| {
                format!("{} parameters, weights have {}", expected.len(), found.len())
            });
        return Err(FootballError::ModelIncompatible(format!(
            "architecture does not match weights: manifest expects {}",
            detail
        )));
    }

    let net = MatchNet::new(device, &manifest.architecture).load_record(record);
    log::info!(
        "Loaded model {} (feature layout v{}, {:08x})",
        manifest.model_version,
        manifest.feature_version,
        manifest.layout_hash
    );
    Ok((net, manifest))
}
