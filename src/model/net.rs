//! Multi-head match network
//!
//! Architecture: Input(78) → [Hidden(d) → ReLU → Dropout]* (shared trunk)
//!                        → result_head(3)       3-way logits
//!                        → goals_head(2)        expected goals, ReLU (>= 0)
//!                        → over_under_head(1)   logit for total > line
//!                        → btts_head(1)         logit for both teams scoring

use burn::module::{Module, Param};
use burn::nn::{Dropout, DropoutConfig, Linear, LinearConfig, LinearRecord};
use burn::tensor::activation::relu;
use burn::tensor::backend::Backend;
use burn::tensor::{Tensor, TensorData};
use serde::{Deserialize, Serialize};

use crate::features::schema::{FeatureId, FEATURE_COUNT};

/// Network shape, stored in the artifact manifest
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchNetConfig {
    pub input_dim: usize,
    /// Trunk layer widths (e.g., [128, 64] for two layers)
    pub hidden_dims: Vec<usize>,
    /// Width of each head's hidden layer; 0 = linear heads
    pub head_hidden_dim: usize,
    pub dropout: f64,
}

/// Parameter name and tensor dimensions, in module order
pub type ParamShapes = Vec<(String, Vec<usize>)>;

const HEADS: [(&str, usize); 4] = [
    ("result_head", 3),
    ("goals_head", 2),
    ("over_under_head", 1),
    ("btts_head", 1),
];

impl MatchNetConfig {
    /// Shape over the current feature layout
    pub fn new(hidden_dims: Vec<usize>, head_hidden_dim: usize, dropout: f64) -> Self {
        MatchNetConfig {
            input_dim: FEATURE_COUNT,
            hidden_dims,
            head_hidden_dim,
            dropout,
        }
    }

    /// Width of the representation the heads read
    pub fn trunk_output_dim(&self) -> usize {
        self.hidden_dims.last().copied().unwrap_or(self.input_dim)
    }

    /// Parameter shapes a network built from this config carries
    pub fn parameter_shapes(&self) -> ParamShapes {
        let mut shapes = Vec::new();
        let mut linear = |name: String, d_in: usize, d_out: usize| {
            shapes.push((format!("{}.weight", name), vec![d_in, d_out]));
            shapes.push((format!("{}.bias", name), vec![d_out]));
        };

        let mut in_dim = self.input_dim;
        for (i, &dim) in self.hidden_dims.iter().enumerate() {
            linear(format!("trunk.{}.linear", i), in_dim, dim);
            in_dim = dim;
        }
        for (head, out_dim) in HEADS {
            if self.head_hidden_dim == 0 {
                linear(format!("{}.out", head), in_dim, out_dim);
            } else {
                linear(format!("{}.hidden.linear", head), in_dim, self.head_hidden_dim);
                linear(format!("{}.out", head), self.head_hidden_dim, out_dim);
            }
        }
        shapes
    }
}

/// A single hidden layer block: Linear → ReLU → Dropout
#[derive(Module, Debug)]
pub struct HiddenBlock<B: Backend> {
    linear: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> HiddenBlock<B> {
    pub fn new(device: &B::Device, in_dim: usize, out_dim: usize, dropout: f64) -> Self {
        HiddenBlock {
            linear: LinearConfig::new(in_dim, out_dim).init(device),
            dropout: DropoutConfig::new(dropout).init(),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.linear.forward(x);
        let x = relu(x);
        self.dropout.forward(x)
    }
}

/// Output head: optional hidden block, then a linear projection
#[derive(Module, Debug)]
pub struct Head<B: Backend> {
    hidden: Option<HiddenBlock<B>>,
    out: Linear<B>,
}

impl<B: Backend> Head<B> {
    pub fn new(device: &B::Device, in_dim: usize, hidden_dim: usize, out_dim: usize, dropout: f64) -> Self {
        if hidden_dim == 0 {
            return Head {
                hidden: None,
                out: LinearConfig::new(in_dim, out_dim).init(device),
            };
        }
        Head {
            hidden: Some(HiddenBlock::new(device, in_dim, hidden_dim, dropout)),
            out: LinearConfig::new(hidden_dim, out_dim).init(device),
        }
    }

    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = match &self.hidden {
            Some(hidden) => hidden.forward(x),
            None => x,
        };
        self.out.forward(x)
    }
}

/// Raw network outputs for a batch
#[derive(Debug, Clone)]
pub struct NetOutput<B: Backend> {
    /// [batch, 3] home / draw / away logits
    pub result_logits: Tensor<B, 2>,
    /// [batch, 2] home / away expected goals, always >= 0
    pub expected_goals: Tensor<B, 2>,
    /// [batch, 1] over the line logit
    pub over_under_logit: Tensor<B, 2>,
    /// [batch, 1] both teams to score logit
    pub btts_logit: Tensor<B, 2>,
}

/// Shared trunk with four prediction heads
#[derive(Module, Debug)]
pub struct MatchNet<B: Backend> {
    trunk: Vec<HiddenBlock<B>>,
    result_head: Head<B>,
    goals_head: Head<B>,
    over_under_head: Head<B>,
    btts_head: Head<B>,
}

impl<B: Backend> MatchNet<B> {
    /// Create a randomly initialized network
    pub fn new(device: &B::Device, config: &MatchNetConfig) -> Self {
        let mut trunk = Vec::with_capacity(config.hidden_dims.len());
        let mut in_dim = config.input_dim;
        for &dim in &config.hidden_dims {
            trunk.push(HiddenBlock::new(device, in_dim, dim, config.dropout));
            in_dim = dim;
        }

        let head = |out_dim| Head::new(device, in_dim, config.head_hidden_dim, out_dim, config.dropout);

        MatchNet {
            trunk,
            result_head: head(3),
            goals_head: head(2),
            over_under_head: head(1),
            btts_head: head(1),
        }
    }

    /// Forward pass
    ///
    /// # Arguments
    /// * `features` - Scaled feature rows [batch, input_dim]
    pub fn forward(&self, features: Tensor<B, 2>) -> NetOutput<B> {
        let mut x = features;
        for block in &self.trunk {
            x = block.forward(x);
        }

        NetOutput {
            result_logits: self.result_head.forward(x.clone()),
            // ReLU ensures expected goals are non-negative
            expected_goals: relu(self.goals_head.forward(x.clone())),
            over_under_logit: self.over_under_head.forward(x.clone()),
            btts_logit: self.btts_head.forward(x),
        }
    }

    /// Hand-weighted network for bootstrapping without a trained artifact
    ///
    /// The trunk is a single ReLU layer holding `[x, -x]`, so each head sees every raw
    /// feature both signed (`relu(x) - relu(-x)`) and absolute (`relu(x) + relu(-x)`).
    /// Meant to be paired with identity scaling.
    pub fn baseline(device: &B::Device) -> (Self, MatchNetConfig) {
        let l = FEATURE_COUNT;
        let config = MatchNetConfig {
            input_dim: l,
            hidden_dims: vec![2 * l],
            head_hidden_dim: 0,
            dropout: 0.0,
        };

        let mut trunk_weights = vec![0.0f32; l * 2 * l];
        for k in 0..l {
            trunk_weights[k * 2 * l + k] = 1.0;
            trunk_weights[k * 2 * l + l + k] = -1.0;
        }

        let trunk = vec![HiddenBlock {
            linear: linear_from(device, trunk_weights, vec![0.0; 2 * l], l, 2 * l),
            dropout: DropoutConfig::new(0.0).init(),
        }];

        let net = MatchNet {
            trunk,
            result_head: fixed_head(device, &baseline::RESULT, &baseline::RESULT_BIAS),
            goals_head: fixed_head(device, &baseline::GOALS, &baseline::GOALS_BIAS),
            over_under_head: fixed_head(device, &baseline::OVER_UNDER, &baseline::OVER_UNDER_BIAS),
            btts_head: fixed_head(device, &baseline::BTTS, &baseline::BTTS_BIAS),
        };
        (net, config)
    }

    /// Copy the weights into plain tensors for shared inference
    pub fn freeze(&self) -> FrozenNet<B> {
        FrozenNet {
            trunk: self.trunk.iter().map(|b| FrozenLinear::from(&b.linear)).collect(),
            result_head: FrozenHead::from(&self.result_head),
            goals_head: FrozenHead::from(&self.goals_head),
            over_under_head: FrozenHead::from(&self.over_under_head),
            btts_head: FrozenHead::from(&self.btts_head),
        }
    }
}

/// Parameter shapes held by a loaded record, named like `parameter_shapes`
pub fn record_shapes<B: Backend>(record: &MatchNetRecord<B>) -> ParamShapes {
    let mut shapes = Vec::new();
    let mut linear = |name: String, rec: &LinearRecord<B>| {
        shapes.push((format!("{}.weight", name), rec.weight.val().dims().to_vec()));
        if let Some(bias) = &rec.bias {
            shapes.push((format!("{}.bias", name), bias.val().dims().to_vec()));
        }
    };

    for (i, block) in record.trunk.iter().enumerate() {
        linear(format!("trunk.{}.linear", i), &block.linear);
    }
    let heads = [
        &record.result_head,
        &record.goals_head,
        &record.over_under_head,
        &record.btts_head,
    ];
    for ((name, _), head) in HEADS.iter().zip(heads) {
        if let Some(hidden) = &head.hidden {
            linear(format!("{}.hidden.linear", name), &hidden.linear);
        }
        linear(format!("{}.out", name), &head.out);
    }
    shapes
}

/// Inference-only linear layer over plain tensors
#[derive(Debug, Clone)]
struct FrozenLinear<B: Backend> {
    weight: Tensor<B, 2>,
    bias: Option<Tensor<B, 1>>,
}

impl<B: Backend> From<&Linear<B>> for FrozenLinear<B> {
    fn from(linear: &Linear<B>) -> Self {
        FrozenLinear {
            weight: linear.weight.val(),
            bias: linear.bias.as_ref().map(|b| b.val()),
        }
    }
}

impl<B: Backend> FrozenLinear<B> {
    fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = x.matmul(self.weight.clone());
        match &self.bias {
            Some(bias) => x + bias.clone().unsqueeze::<2>(),
            None => x,
        }
    }
}

#[derive(Debug, Clone)]
struct FrozenHead<B: Backend> {
    hidden: Option<FrozenLinear<B>>,
    out: FrozenLinear<B>,
}

impl<B: Backend> From<&Head<B>> for FrozenHead<B> {
    fn from(head: &Head<B>) -> Self {
        FrozenHead {
            hidden: head.hidden.as_ref().map(|h| FrozenLinear::from(&h.linear)),
            out: FrozenLinear::from(&head.out),
        }
    }
}

impl<B: Backend> FrozenHead<B> {
    fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = match &self.hidden {
            Some(hidden) => relu(hidden.forward(x)),
            None => x,
        };
        self.out.forward(x)
    }
}

/// `MatchNet` weights as plain tensors
///
/// Unlike the module, which holds lazily initialized parameters, this is `Sync` and can
/// be shared across request threads. Dropout is the identity at inference and is skipped.
#[derive(Debug, Clone)]
pub struct FrozenNet<B: Backend> {
    trunk: Vec<FrozenLinear<B>>,
    result_head: FrozenHead<B>,
    goals_head: FrozenHead<B>,
    over_under_head: FrozenHead<B>,
    btts_head: FrozenHead<B>,
}

impl<B: Backend> FrozenNet<B> {
    pub fn forward(&self, features: Tensor<B, 2>) -> NetOutput<B> {
        let mut x = features;
        for layer in &self.trunk {
            x = relu(layer.forward(x));
        }

        NetOutput {
            result_logits: self.result_head.forward(x.clone()),
            expected_goals: relu(self.goals_head.forward(x.clone())),
            over_under_logit: self.over_under_head.forward(x.clone()),
            btts_logit: self.btts_head.forward(x),
        }
    }
}

/// How a head term reads its feature
#[derive(Debug, Clone, Copy)]
enum Term {
    /// w * x
    Signed(usize, FeatureId, f32),
    /// w * |x|
    Abs(usize, FeatureId, f32),
}

mod baseline {
    use super::Term::{self, Abs, Signed};
    use crate::features::schema::FeatureId::*;

    // Result logits: home = 0.45 + s, draw = -0.05 - 0.3|ppg_diff|, away = -s
    // where s is a weighted sum of home-minus-away strength signals
    pub(super) const RESULT: [Term; 21] = [
        Signed(0, PpgDiff, 0.6),
        Signed(0, WinRateDiff, 1.0),
        Signed(0, HomeMomentum, 0.5),
        Signed(0, AwayMomentum, -0.5),
        Signed(0, TablePositionGap, 0.5),
        Signed(0, H2hDominance, 0.3),
        Signed(0, HomeAtHomePpg, 0.1),
        Signed(0, AwayOnRoadPpg, -0.1),
        Signed(0, ExpectedHomeGoals, 0.2),
        Signed(0, ExpectedAwayGoals, -0.2),
        Signed(2, PpgDiff, -0.6),
        Signed(2, WinRateDiff, -1.0),
        Signed(2, HomeMomentum, -0.5),
        Signed(2, AwayMomentum, 0.5),
        Signed(2, TablePositionGap, -0.5),
        Signed(2, H2hDominance, -0.3),
        Signed(2, HomeAtHomePpg, -0.1),
        Signed(2, AwayOnRoadPpg, 0.1),
        Signed(2, ExpectedHomeGoals, -0.2),
        Signed(2, ExpectedAwayGoals, 0.2),
        Abs(1, PpgDiff, -0.3),
    ];
    pub(super) const RESULT_BIAS: [f32; 3] = [0.45, -0.05, 0.0];

    pub(super) const GOALS: [Term; 6] = [
        Signed(0, ExpectedHomeGoals, 0.6),
        Signed(0, HomeFormGoalsFor, 0.2),
        Signed(0, AwayFormGoalsAgainst, 0.2),
        Signed(1, ExpectedAwayGoals, 0.6),
        Signed(1, AwayFormGoalsFor, 0.2),
        Signed(1, HomeFormGoalsAgainst, 0.2),
    ];
    pub(super) const GOALS_BIAS: [f32; 2] = [0.1, 0.0];

    pub(super) const OVER_UNDER: [Term; 3] = [
        Signed(0, ExpectedTotalGoals, 1.2),
        Signed(0, OverUnderLine, -1.2),
        Signed(0, H2hOverLineRate, 0.5),
    ];
    pub(super) const OVER_UNDER_BIAS: [f32; 1] = [-0.25];

    pub(super) const BTTS: [Term; 2] = [Signed(0, BttsPrior, 3.0), Signed(0, H2hBttsRate, 0.5)];
    pub(super) const BTTS_BIAS: [f32; 1] = [-1.75];
}

fn linear_from<B: Backend>(
    device: &B::Device,
    weights: Vec<f32>,
    bias: Vec<f32>,
    d_in: usize,
    d_out: usize,
) -> Linear<B> {
    Linear {
        weight: Param::from_tensor(Tensor::from_data(TensorData::new(weights, [d_in, d_out]), device)),
        bias: Some(Param::from_tensor(Tensor::from_data(TensorData::new(bias, [d_out]), device))),
    }
}

/// Linear head over the `[relu(x), relu(-x)]` trunk
fn fixed_head<B: Backend>(device: &B::Device, terms: &[Term], bias: &[f32]) -> Head<B> {
    let l = FEATURE_COUNT;
    let d_out = bias.len();
    let mut weights = vec![0.0f32; 2 * l * d_out];

    for term in terms {
        let (out, id, pos, neg) = match *term {
            Term::Signed(out, id, w) => (out, id, w, -w),
            Term::Abs(out, id, w) => (out, id, w, w),
        };
        weights[id.index() * d_out + out] += pos;
        weights[(l + id.index()) * d_out + out] += neg;
    }

    Head {
        hidden: None,
        out: linear_from(device, weights, bias.to_vec(), 2 * l, d_out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn values(t: Tensor<TestBackend, 2>) -> Vec<f32> {
        t.to_data().as_slice::<f32>().unwrap().to_vec()
    }

    #[test]
    fn test_match_net_shapes() {
        let device = Default::default();
        let config = MatchNetConfig::new(vec![128, 64], 32, 0.1);
        let model = MatchNet::<TestBackend>::new(&device, &config);

        let features = Tensor::random(
            [4, FEATURE_COUNT],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let out = model.forward(features);

        assert_eq!(out.result_logits.dims(), [4, 3]);
        assert_eq!(out.expected_goals.dims(), [4, 2]);
        assert_eq!(out.over_under_logit.dims(), [4, 1]);
        assert_eq!(out.btts_logit.dims(), [4, 1]);

        // Expected goals should be non-negative (ReLU output)
        for val in values(out.expected_goals) {
            assert!(val >= 0.0, "Expected goals should be non-negative, got {}", val);
        }
    }

    #[test]
    fn test_linear_heads() {
        let device = Default::default();
        let config = MatchNetConfig::new(vec![16], 0, 0.1);
        let model = MatchNet::<TestBackend>::new(&device, &config);
        let features = Tensor::zeros([2, FEATURE_COUNT], &device);
        assert_eq!(model.forward(features).result_logits.dims(), [2, 3]);
    }

    fn baseline_row(set: &[(FeatureId, f32)]) -> Tensor<TestBackend, 2> {
        let mut row = vec![0.0f32; FEATURE_COUNT];
        for (id, v) in set {
            row[id.index()] = *v;
        }
        Tensor::from_data(TensorData::new(row, [1, FEATURE_COUNT]), &Default::default())
    }

    #[test]
    fn test_baseline_trunk_passes_features_through() {
        let device = Default::default();
        let (net, config) = MatchNet::<TestBackend>::baseline(&device);
        assert_eq!(config.trunk_output_dim(), 2 * FEATURE_COUNT);

        let row = baseline_row(&[
            (FeatureId::ExpectedHomeGoals, 2.0),
            (FeatureId::ExpectedAwayGoals, 0.5),
        ]);
        let goals = values(net.forward(row).expected_goals);
        assert!((goals[0] - 1.3).abs() < 1e-5);
        assert!((goals[1] - 0.3).abs() < 1e-5);
    }

    #[test]
    fn test_baseline_favours_stronger_side() {
        let device = Default::default();
        let (net, _) = MatchNet::<TestBackend>::baseline(&device);

        let home_strong = baseline_row(&[(FeatureId::PpgDiff, 2.0), (FeatureId::WinRateDiff, 0.8)]);
        let logits = values(net.forward(home_strong).result_logits);
        assert!(logits[0] > logits[2]);
        // Draw weight falls with the size of the gap
        assert!((logits[1] - (-0.05 - 0.6)).abs() < 1e-5);

        let away_strong = baseline_row(&[(FeatureId::PpgDiff, -2.0), (FeatureId::WinRateDiff, -0.8)]);
        let logits = values(net.forward(away_strong).result_logits);
        assert!(logits[2] > logits[0]);
    }

    #[test]
    fn test_baseline_over_under_reads_line() {
        let device = Default::default();
        let (net, _) = MatchNet::<TestBackend>::baseline(&device);

        let low = baseline_row(&[(FeatureId::ExpectedTotalGoals, 2.7), (FeatureId::OverUnderLine, 1.5)]);
        let high = baseline_row(&[(FeatureId::ExpectedTotalGoals, 2.7), (FeatureId::OverUnderLine, 3.5)]);
        let low = values(net.forward(low).over_under_logit)[0];
        let high = values(net.forward(high).over_under_logit)[0];
        assert!(low > high);
    }

    #[test]
    fn test_frozen_matches_module() {
        let device = Default::default();
        let config = MatchNetConfig::new(vec![32, 16], 8, 0.0);
        let model = MatchNet::<TestBackend>::new(&device, &config);
        let frozen = model.freeze();

        let features: Tensor<TestBackend, 2> = Tensor::random(
            [3, FEATURE_COUNT],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );
        let a = model.forward(features.clone());
        let b = frozen.forward(features);

        for (x, y) in values(a.result_logits).iter().zip(values(b.result_logits)) {
            assert!((x - y).abs() < 1e-5);
        }
        for (x, y) in values(a.expected_goals).iter().zip(values(b.expected_goals)) {
            assert!((x - y).abs() < 1e-5);
        }
        for (x, y) in values(a.btts_logit).iter().zip(values(b.btts_logit)) {
            assert!((x - y).abs() < 1e-5);
        }
    }

    #[test]
    fn test_frozen_net_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FrozenNet<TestBackend>>();
    }

    #[test]
    fn test_record_shapes_follow_config() {
        let device = Default::default();
        for config in [
            MatchNetConfig::new(vec![32, 16], 8, 0.1),
            MatchNetConfig::new(vec![16], 0, 0.0),
            MatchNetConfig::new(Vec::new(), 0, 0.0),
        ] {
            let record = MatchNet::<TestBackend>::new(&device, &config).into_record();
            assert_eq!(record_shapes(&record), config.parameter_shapes());
        }

        let (net, config) = MatchNet::<TestBackend>::baseline(&device);
        assert_eq!(record_shapes(&net.into_record()), config.parameter_shapes());
    }

    #[test]
    fn test_parameter_shapes_differ_across_architectures() {
        let (_, baseline) = MatchNet::<TestBackend>::baseline(&Default::default());
        let other = MatchNetConfig::new(vec![2 * FEATURE_COUNT, 64], 32, 0.0);
        assert_ne!(baseline.parameter_shapes(), other.parameter_shapes());
        assert_eq!(baseline.parameter_shapes().len(), 2 + 4 * 2);
    }
}
