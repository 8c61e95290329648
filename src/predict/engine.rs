//! Prediction engine
//!
//! Wires the statistics store, normalizer, feature engineer and loaded model into a
//! single synchronous `predict` call. The engine holds no per-request state; the model
//! sits behind a write-once shared handle so concurrent callers need no locking.

use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::data::raw::LeagueHistory;
use crate::data::record::TeamRecord;
use crate::data::store::{gather_history, StatisticsStore};
use crate::data::Normalizer;
use crate::features::engineer::{FeatureEngineer, FeatureSet};
use crate::features::schema::{layout_hash, FEATURE_VERSION};
use crate::features::vector::FeatureVector;
use crate::model::inference::{ModelSlot, PredictionModel, RawModelOutput};
use crate::predict::calibrate;
use crate::predict::prediction::{
    Analysis, Btts, ExpectedGoals, OverUnder, Prediction, ResultProbabilities,
};
use crate::{
    name_key, Config, EngineConfig, ErrorResponse, FootballError, MatchContext,
    PredictionRequest, Result,
};

/// Readiness report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Health {
    pub ready: bool,
    pub model_version: Option<String>,
    pub feature_version: u8,
    pub layout_hash: String,
}

/// Orchestrates one prediction per call
pub struct PredictionEngine<S, M> {
    store: S,
    engineer: FeatureEngineer,
    config: EngineConfig,
    model: ModelSlot<M>,
}

impl<S: StatisticsStore, M: PredictionModel> PredictionEngine<S, M> {
    /// Engine with no model; predictions fail until `load_model` is called
    pub fn new(store: S, config: &Config) -> Self {
        PredictionEngine {
            store,
            engineer: FeatureEngineer::new(config.features.clone()),
            config: config.engine.clone(),
            model: ModelSlot::new(),
        }
    }

    /// Engine with a model already installed
    pub fn with_model(store: S, config: &Config, model: M) -> Result<Self> {
        config.features.validate()?;
        let engine = Self::new(store, config);
        engine.load_model(model)?;
        Ok(engine)
    }

    /// Install the model; only the first call succeeds
    pub fn load_model(&self, model: M) -> Result<()> {
        model.manifest().validate()?;
        let model = self.model.install(model)?;
        log::info!("Model {} ready", model.version());
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.model.is_loaded()
    }

    pub fn health(&self) -> Health {
        Health {
            ready: self.is_ready(),
            model_version: self.model.get().ok().map(|m| m.version().to_string()),
            feature_version: FEATURE_VERSION,
            layout_hash: format!("{:08x}", layout_hash()),
        }
    }

    /// Predict a fixture from the statistics store
    pub fn predict(&self, ctx: &MatchContext) -> Result<Prediction> {
        ctx.validate()?;
        let model = self.model.get()?;

        let home_team = self.resolve(&ctx.home_team);
        let away_team = self.resolve(&ctx.away_team);
        if name_key(&home_team) == name_key(&away_team) {
            return Err(FootballError::InvalidRequest(format!(
                "{} and {} are the same team",
                ctx.home_team, ctx.away_team
            )));
        }

        let gathered = gather_history(&self.store, &home_team, &away_team, &ctx.league);
        self.predict_from(
            &model,
            ctx,
            &home_team,
            &away_team,
            &gathered.history,
            gathered.unavailable,
        )
    }

    /// Predict a fixture from histories supplied by the caller
    pub fn predict_with(&self, ctx: &MatchContext, history: &LeagueHistory) -> Result<Prediction> {
        ctx.validate()?;
        let model = self.model.get()?;
        self.predict_from(
            &model,
            ctx,
            &ctx.home_team,
            &ctx.away_team,
            history,
            Vec::new(),
        )
    }

    /// Answer a request with a prediction document or a structured error
    pub fn respond(&self, request: PredictionRequest) -> Value {
        let ctx = MatchContext::from(request);
        match self.predict(&ctx) {
            Ok(prediction) => prediction.to_json(),
            Err(e) => {
                log::warn!(
                    "Prediction {} vs {} failed: {}",
                    ctx.home_team,
                    ctx.away_team,
                    e
                );
                json!(ErrorResponse::from(&e))
            }
        }
    }

    /// Check a vector against the input contract and run the model on it
    pub fn infer(&self, features: &FeatureVector) -> Result<RawModelOutput> {
        let model = self.model.get()?;
        self.run_model(&model, features)
    }

    fn resolve(&self, name: &str) -> String {
        match self.store.resolve_team(name) {
            Ok(Some(canonical)) => {
                if canonical != name {
                    log::debug!("Resolved {} to {}", name, canonical);
                }
                canonical
            }
            Ok(None) => name.to_string(),
            Err(e) => {
                log::warn!("Could not resolve {}: {}", name, e);
                name.to_string()
            }
        }
    }

    fn predict_from(
        &self,
        model: &Arc<M>,
        ctx: &MatchContext,
        home_team: &str,
        away_team: &str,
        history: &LeagueHistory,
        mut unavailable: Vec<FootballError>,
    ) -> Result<Prediction> {
        let league = Normalizer::new(ctx.as_of).normalize_league(&ctx.league, history);
        let home = league.record_or_empty(home_team);
        let away = league.record_or_empty(away_team);
        for record in [&home, &away] {
            if record.data_unavailable && !reported(&unavailable, &record.team) {
                unavailable.push(FootballError::DataUnavailable {
                    team: record.team.clone(),
                    reason: "no history supplied".to_string(),
                });
            }
        }

        let line = ctx.over_under_line.unwrap_or(self.config.over_under_line);
        if !model.manifest().supports_line(line) {
            log::warn!(
                "Model {} was not trained on the {} goal line; over/under may be unreliable",
                model.version(),
                line
            );
        }

        let features = self
            .engineer
            .build(&home, &away, &league, ctx.as_of, line);
        let vector = features.to_vector(model.scaling());
        let raw = self.run_model(model, &vector)?;

        let markets = self
            .calibrate(model.as_ref(), &raw, line)
            .map_err(|e| {
                log_rejected(&vector, &e);
                e
            })?;

        Ok(self.assemble(
            ctx,
            &home,
            &away,
            &features,
            markets,
            model.version(),
            &unavailable,
        ))
    }

    fn run_model(&self, model: &M, features: &FeatureVector) -> Result<RawModelOutput> {
        if let Err(e) = features.validate() {
            log_rejected(features, &e);
            return Err(e);
        }

        let raw = model.infer(features)?;
        let bad = raw.non_finite();
        if !bad.is_empty() {
            let err =
                FootballError::ModelOutputInvalid(format!("non-finite outputs: {}", bad.join(", ")));
            log_rejected(features, &err);
            return Err(err);
        }
        Ok(raw)
    }

    fn calibrate(
        &self,
        model: &M,
        raw: &RawModelOutput,
        line: f32,
    ) -> Result<Calibrated> {
        let calibration = model.manifest().calibration;
        let tolerance = self.config.clamp_tolerance as f64;

        let p = calibrate::softmax(&raw.result_logits, calibration.result_temperature)?;
        calibrate::check_distribution(&p, self.config.probability_tolerance)?;

        let expected_goals = ExpectedGoals {
            home: calibrate::expected_goals("home", raw.expected_goals[0], tolerance)?,
            away: calibrate::expected_goals("away", raw.expected_goals[1], tolerance)?,
        };

        let over = calibrate::logit_probability(
            "over/under",
            raw.over_under_logit,
            calibration.over_under_temperature,
            tolerance,
        )?;
        let yes = calibrate::logit_probability(
            "btts",
            raw.btts_logit,
            calibration.btts_temperature,
            tolerance,
        )?;

        Ok(Calibrated {
            result: ResultProbabilities {
                home_win: p[0],
                draw: p[1],
                away_win: p[2],
            },
            expected_goals,
            over_under: OverUnder {
                line,
                over,
                under: 1.0 - over,
            },
            btts: Btts { yes, no: 1.0 - yes },
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble(
        &self,
        ctx: &MatchContext,
        home: &TeamRecord,
        away: &TeamRecord,
        features: &FeatureSet,
        markets: Calibrated,
        model_version: &str,
        unavailable: &[FootballError],
    ) -> Prediction {
        let analysis = Analysis::build(
            features,
            &markets.result,
            &markets.over_under,
            &markets.btts,
        );

        Prediction {
            home_team: home.team.clone(),
            away_team: away.team.clone(),
            league: ctx.league.clone(),
            as_of: ctx.as_of,
            result: markets.result,
            expected_goals: markets.expected_goals,
            over_under: markets.over_under,
            btts: markets.btts,
            confidence: features.completeness as f64,
            model_version: model_version.to_string(),
            analysis,
            data_warnings: unavailable.iter().map(|e| e.to_string()).collect(),
        }
    }
}

/// Bounded market probabilities for one fixture
struct Calibrated {
    result: ResultProbabilities,
    expected_goals: ExpectedGoals,
    over_under: OverUnder,
    btts: Btts,
}

fn reported(unavailable: &[FootballError], team: &str) -> bool {
    unavailable.iter().any(|e| match e {
        FootballError::DataUnavailable { team: t, .. } => name_key(t) == name_key(team),
        _ => false,
    })
}

fn log_rejected(features: &FeatureVector, err: &FootballError) {
    let values: Vec<String> = features
        .named()
        .iter()
        .map(|(name, v)| format!("{}={}", name, v))
        .collect();
    log::error!("{}; features: {}", err, values.join(" "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::raw::RawMatchEntry;
    use crate::data::store::MemoryStore;
    use crate::features::scaling::FeatureScaling;
    use crate::features::schema::FEATURE_COUNT;
    use crate::model::artifact::ModelManifest;
    use crate::model::inference::BurnModel;
    use crate::model::net::MatchNetConfig;
    use burn::backend::NdArray;
    use chrono::{Duration, NaiveDate};
    use std::sync::atomic::{AtomicUsize, Ordering};

    type TestBackend = NdArray<f32>;

    struct StubModel {
        manifest: ModelManifest,
        output: RawModelOutput,
        calls: AtomicUsize,
    }

    impl StubModel {
        fn new(output: RawModelOutput) -> Self {
            StubModel {
                manifest: ModelManifest::new(
                    "stub-1",
                    MatchNetConfig::new(vec![64], 0, 0.0),
                    FeatureScaling::identity(),
                ),
                output,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl PredictionModel for StubModel {
        fn infer(&self, _features: &FeatureVector) -> Result<RawModelOutput> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.output)
        }

        fn manifest(&self) -> &ModelManifest {
            &self.manifest
        }
    }

    fn output() -> RawModelOutput {
        RawModelOutput {
            result_logits: [0.8, 0.1, -0.4],
            expected_goals: [1.6, 0.9],
            over_under_logit: 0.3,
            btts_logit: -0.2,
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()
    }

    fn ctx() -> MatchContext {
        MatchContext::new("Arsenal", "Chelsea", "Premier League").with_as_of(as_of())
    }

    fn history(opponent: &str, scores: &[(u8, u8)]) -> Vec<RawMatchEntry> {
        scores
            .iter()
            .enumerate()
            .map(|(i, &(gf, ga))| {
                let date = as_of() - Duration::days(7 * (scores.len() - i) as i64);
                let venue = if i % 2 == 0 { "home" } else { "away" };
                RawMatchEntry::new(&date.format("%Y-%m-%d").to_string(), opponent)
                    .competition("Premier League")
                    .score(gf, ga)
                    .venue(venue)
            })
            .collect()
    }

    fn store(home: &[(u8, u8)], away: &[(u8, u8)]) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.add_team("Arsenal", "Premier League", history("Spurs", home));
        store.add_team("Chelsea", "Premier League", history("Everton", away));
        store.add_team("Spurs", "Premier League", history("Arsenal", &[(1, 1); 4]));
        store
    }

    fn engine(store: MemoryStore) -> PredictionEngine<MemoryStore, StubModel> {
        PredictionEngine::with_model(store, &Config::default(), StubModel::new(output())).unwrap()
    }

    fn assert_valid(p: &Prediction) {
        let sum = p.result.home_win + p.result.draw + p.result.away_win;
        assert!((sum - 1.0).abs() < 1e-6);
        assert!(p.expected_goals.home >= 0.0 && p.expected_goals.away >= 0.0);
        assert!((p.over_under.over + p.over_under.under - 1.0).abs() < 1e-9);
        assert!((p.btts.yes + p.btts.no - 1.0).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&p.confidence));
    }

    #[test]
    fn test_prediction_is_valid() {
        let engine = engine(store(&[(2, 1), (1, 1), (0, 2)], &[(1, 0), (3, 3)]));
        let p = engine.predict(&ctx()).unwrap();

        assert_valid(&p);
        assert_eq!(p.model_version, "stub-1");
        assert_eq!(p.over_under.line, 2.5);
        assert!(p.result.home_win > p.result.away_win);
        assert!(p.data_warnings.is_empty());
    }

    #[test]
    fn test_predict_is_idempotent() {
        let engine = engine(store(&[(2, 1), (1, 1), (0, 2)], &[(1, 0), (3, 3)]));
        let first = engine.predict(&ctx()).unwrap();
        let second = engine.predict(&ctx()).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.to_json(), second.to_json());
    }

    #[test]
    fn test_confidence_monotonic_in_history() {
        let full = [(1, 0), (2, 2), (0, 1), (3, 1), (1, 1), (2, 0)];
        let mut previous = -1.0;
        for n in 0..=full.len() {
            let engine = engine(store(&full[..n], &full[..n]));
            let p = engine.predict(&ctx()).unwrap();
            assert!(p.confidence >= previous);
            previous = p.confidence;
        }
    }

    #[test]
    fn test_zero_history() {
        let engine = engine(MemoryStore::new());
        let p = engine.predict(&ctx()).unwrap();

        assert_valid(&p);
        assert_eq!(p.confidence, 0.0);
        assert_eq!(p.data_warnings.len(), 2);
        assert!(p
            .analysis
            .key_factors
            .contains(&"Limited historical data".to_string()));
    }

    #[test]
    fn test_dominant_home_side_with_baseline() {
        let store = store(&[(3, 0); 6], &[(0, 2); 6]);
        let model = BurnModel::<TestBackend>::baseline(Default::default()).unwrap();
        let engine = PredictionEngine::with_model(store, &Config::default(), model).unwrap();

        let p = engine.predict(&ctx()).unwrap();
        assert_valid(&p);
        assert!(p.result.home_win > p.result.away_win);
        assert!(p.expected_goals.home > p.expected_goals.away);
        assert!(p.model_version.starts_with("baseline-"));
    }

    #[test]
    fn test_model_unavailable() {
        let engine: PredictionEngine<MemoryStore, StubModel> =
            PredictionEngine::new(store(&[(1, 0)], &[(0, 1)]), &Config::default());

        assert!(!engine.is_ready());
        assert!(!engine.health().ready);
        let err = engine.predict(&ctx()).unwrap_err();
        assert_eq!(err.kind(), "model_unavailable");

        let response = engine.respond(PredictionRequest {
            home_team: "Arsenal".to_string(),
            away_team: "Chelsea".to_string(),
            league: "Premier League".to_string(),
            as_of_date: Some(as_of()),
        });
        assert_eq!(response["error"], "model_unavailable");
    }

    #[test]
    fn test_model_loads_once() {
        let engine = engine(MemoryStore::new());
        assert!(engine.is_ready());
        assert_eq!(engine.health().model_version.as_deref(), Some("stub-1"));
        let err = engine.load_model(StubModel::new(output())).unwrap_err();
        assert_eq!(err.kind(), "model_already_loaded");
    }

    #[test]
    fn test_nan_feature_never_reaches_model() {
        let engine = engine(MemoryStore::new());
        let mut raw = vec![0.0; FEATURE_COUNT];
        raw[3] = f32::NAN;
        let vector = FeatureVector::new(raw, &FeatureScaling::identity());

        let err = engine.infer(&vector).unwrap_err();
        assert_eq!(err.kind(), "feature_contract_violation");
        assert_eq!(engine.model.get().unwrap().calls(), 0);

        let short = FeatureVector::new(vec![0.0; 10], &FeatureScaling::identity());
        assert_eq!(engine.infer(&short).unwrap_err().kind(), "feature_contract_violation");
        assert_eq!(engine.model.get().unwrap().calls(), 0);
    }

    #[test]
    fn test_nan_output_rejected() {
        let mut bad = output();
        bad.btts_logit = f32::NAN;
        let engine =
            PredictionEngine::with_model(MemoryStore::new(), &Config::default(), StubModel::new(bad))
                .unwrap();

        let err = engine.predict(&ctx()).unwrap_err();
        assert_eq!(err.kind(), "model_output_invalid");
    }

    #[test]
    fn test_expected_goals_tolerance() {
        let mut slightly = output();
        slightly.expected_goals = [-1e-6, 1.0];
        let engine = PredictionEngine::with_model(
            MemoryStore::new(),
            &Config::default(),
            StubModel::new(slightly),
        )
        .unwrap();
        assert_eq!(engine.predict(&ctx()).unwrap().expected_goals.home, 0.0);

        let mut far = output();
        far.expected_goals = [-0.5, 1.0];
        let engine =
            PredictionEngine::with_model(MemoryStore::new(), &Config::default(), StubModel::new(far))
                .unwrap();
        assert_eq!(
            engine.predict(&ctx()).unwrap_err().kind(),
            "model_output_invalid"
        );
    }

    #[test]
    fn test_aliases_and_line() {
        let mut store = store(&[(1, 0)], &[(0, 1)]);
        store.insert(crate::data::store::TeamSnapshot {
            name: "Manchester United".to_string(),
            league: "Premier League".to_string(),
            aliases: vec!["Man Utd".to_string()],
            history: history("Spurs", &[(2, 0), (1, 0)]),
        });
        let engine = engine(store);

        let ctx = MatchContext::new("Man Utd", "Chelsea", "Premier League")
            .with_as_of(as_of())
            .with_over_under_line(3.5);
        let p = engine.predict(&ctx).unwrap();

        assert_eq!(p.home_team, "Manchester United");
        assert_eq!(p.over_under.line, 3.5);
        assert!(p.to_json().get("over_under_3_5").is_some());
    }

    #[test]
    fn test_invalid_request() {
        let engine = engine(MemoryStore::new());
        let ctx = MatchContext::new("Arsenal", "arsenal", "Premier League");
        assert_eq!(engine.predict(&ctx).unwrap_err().kind(), "invalid_request");
    }

    #[test]
    fn test_predict_with_supplied_history() {
        let engine = engine(MemoryStore::new());
        let mut h = LeagueHistory::new();
        h.insert("Arsenal".to_string(), history("Spurs", &[(2, 0); 5]));

        let p = engine.predict_with(&ctx(), &h).unwrap();
        assert_valid(&p);
        assert!(p.confidence > 0.0);
        assert_eq!(p.data_warnings.len(), 1);
        assert!(p.data_warnings[0].contains("Chelsea"));
    }

    #[test]
    fn test_concurrent_predictions() {
        let engine = engine(store(&[(2, 1), (1, 1), (0, 2)], &[(1, 0), (3, 3)]));
        let expected = engine.predict(&ctx()).unwrap();

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| engine.predict(&ctx()).unwrap()))
                .collect();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), expected);
            }
        });
        assert_eq!(engine.model.get().unwrap().calls(), 9);
    }

    #[test]
    fn test_concurrent_predictions_with_baseline() {
        let model = BurnModel::<TestBackend>::baseline(Default::default()).unwrap();
        let store = store(&[(2, 1), (1, 1), (0, 2), (3, 0)], &[(1, 0), (3, 3), (0, 0)]);
        let engine = PredictionEngine::with_model(store, &Config::default(), model).unwrap();
        let expected = engine.predict(&ctx()).unwrap();

        std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let engine = &engine;
                    s.spawn(move || {
                        let line = if i % 2 == 0 { 2.5 } else { 3.5 };
                        let p = engine.predict(&ctx().with_over_under_line(line)).unwrap();
                        (line, p)
                    })
                })
                .collect();
            for handle in handles {
                let (line, p) = handle.join().unwrap();
                assert_valid(&p);
                if line == 2.5 {
                    assert_eq!(p, expected);
                }
            }
        });
    }

    #[test]
    fn test_long_gap_since_last_meeting_with_short_half_life() {
        let mut config = Config::default();
        config.features.h2h_half_life_days = 1.0;

        let mut store = store(&[(1, 0); 4], &[(0, 1); 4]);
        let mut arsenal = history("Spurs", &[(1, 0); 4]);
        arsenal.push(
            RawMatchEntry::new("2020-01-01", "Chelsea")
                .competition("Premier League")
                .score(2, 1)
                .venue("home"),
        );
        store.add_team("Arsenal", "Premier League", arsenal);

        let model = BurnModel::<TestBackend>::baseline(Default::default()).unwrap();
        let engine = PredictionEngine::with_model(store, &config, model).unwrap();

        let p = engine.predict(&ctx()).unwrap();
        assert_valid(&p);
        assert!(p.result.home_win.is_finite());
        assert!(p.expected_goals.total().is_finite());

        config.features.h2h_half_life_days = 0.0;
        let err = PredictionEngine::with_model(MemoryStore::new(), &config, StubModel::new(output()))
            .err()
            .unwrap();
        assert_eq!(err.kind(), "config");
    }
}
