//! The public prediction and its analysis

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};

use crate::features::engineer::FeatureSet;
use crate::features::form::FormRating;

/// Three-way result distribution; sums to 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResultProbabilities {
    pub home_win: f64,
    pub draw: f64,
    pub away_win: f64,
}

impl ResultProbabilities {
    /// Most likely outcome and its probability
    pub fn most_likely(&self) -> (PredictedOutcome, f64) {
        let mut best = (PredictedOutcome::HomeWin, self.home_win);
        if self.draw > best.1 {
            best = (PredictedOutcome::Draw, self.draw);
        }
        if self.away_win > best.1 {
            best = (PredictedOutcome::AwayWin, self.away_win);
        }
        best
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictedOutcome {
    HomeWin,
    Draw,
    AwayWin,
}

impl std::fmt::Display for PredictedOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PredictedOutcome::HomeWin => "Home Win",
            PredictedOutcome::Draw => "Draw",
            PredictedOutcome::AwayWin => "Away Win",
        };
        write!(f, "{}", s)
    }
}

/// Non-negative expected goals
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExpectedGoals {
    pub home: f64,
    pub away: f64,
}

impl ExpectedGoals {
    pub fn total(&self) -> f64 {
        self.home + self.away
    }
}

/// Over/under market for one goal line
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverUnder {
    #[serde(skip)]
    pub line: f32,
    pub over: f64,
    pub under: f64,
}

impl OverUnder {
    /// Response key for this line, e.g. `over_under_2_5`
    pub fn key(&self) -> String {
        format!("over_under_{}", self.line).replace('.', "_")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Btts {
    pub yes: f64,
    pub no: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormSummary {
    /// Points per game over the form window, scaled to [0, 1]
    pub score: f64,
    pub rating: FormRating,
    /// Scored matches in the window
    pub matches: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeadToHeadSummary {
    pub matches: usize,
    pub home_wins: usize,
    pub draws: usize,
    pub away_wins: usize,
    pub avg_goals: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum InsightConfidence {
    High,
    Medium,
    Low,
}

/// Plain-language reading of the markets
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub match_result: String,
    pub result_confidence: InsightConfidence,
    pub goals: String,
    pub btts: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    pub predicted_outcome: PredictedOutcome,
    pub key_factors: Vec<String>,
    pub home_form: FormSummary,
    pub away_form: FormSummary,
    pub head_to_head: HeadToHeadSummary,
    pub insights: Insights,
}

impl Analysis {
    pub fn build(
        features: &FeatureSet,
        result: &ResultProbabilities,
        over_under: &OverUnder,
        btts: &Btts,
    ) -> Self {
        let (predicted_outcome, top) = result.most_likely();

        let mut key_factors = Vec::new();
        for (side, form) in [("Home", &features.home_form), ("Away", &features.away_form)] {
            if form.depth() == 0 {
                continue;
            }
            let score = form.stats.form_score();
            if score > 0.7 {
                key_factors.push(format!("{} team in excellent form", side));
            } else if score < 0.3 {
                key_factors.push(format!("{} team struggling with poor form", side));
            }
        }

        let h2h = &features.h2h;
        if h2h.matches > 0 {
            if h2h.home_win_rate > 0.6 {
                key_factors.push("Home team dominates head-to-head history".to_string());
            } else if h2h.away_win_rate > 0.6 {
                key_factors.push("Away team dominates head-to-head history".to_string());
            }
        }
        if features.completeness < 0.3 {
            key_factors.push("Limited historical data".to_string());
        }

        let (match_result, result_confidence) = if top > 0.7 {
            (format!("Strong {}", predicted_outcome), InsightConfidence::High)
        } else if top > 0.5 {
            (format!("Moderate {}", predicted_outcome), InsightConfidence::Medium)
        } else {
            ("Uncertain outcome".to_string(), InsightConfidence::Low)
        };

        let goals = if over_under.over > 0.65 {
            format!("Over {} goals likely", over_under.line)
        } else if over_under.under > 0.65 {
            format!("Under {} goals likely", over_under.line)
        } else {
            "Goals market uncertain".to_string()
        };

        let btts_insight = if btts.yes > 0.6 {
            "Both teams likely to score"
        } else if btts.no > 0.6 {
            "Clean sheet likely"
        } else {
            "BTTS market uncertain"
        };

        let summary = |form: &crate::features::form::FormFeatures| FormSummary {
            score: form.stats.form_score() as f64,
            rating: form.rating(),
            matches: form.depth(),
        };

        Analysis {
            predicted_outcome,
            key_factors,
            home_form: summary(&features.home_form),
            away_form: summary(&features.away_form),
            head_to_head: HeadToHeadSummary {
                matches: h2h.matches,
                home_wins: h2h.home_wins,
                draws: h2h.draws,
                away_wins: h2h.away_wins,
                avg_goals: h2h.avg_goals as f64,
            },
            insights: Insights {
                match_result,
                result_confidence,
                goals,
                btts: btts_insight.to_string(),
            },
        }
    }
}

/// A complete prediction for one fixture
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    pub as_of: NaiveDate,
    pub result: ResultProbabilities,
    pub expected_goals: ExpectedGoals,
    pub over_under: OverUnder,
    pub btts: Btts,
    /// Data completeness in [0, 1]
    pub confidence: f64,
    pub model_version: String,
    pub analysis: Analysis,
    /// Teams the statistics store could not serve
    pub data_warnings: Vec<String>,
}

impl Prediction {
    /// Response document; the over/under key follows the requested line
    pub fn to_json(&self) -> Value {
        let mut doc = json!({
            "home_team": self.home_team,
            "away_team": self.away_team,
            "league": self.league,
            "as_of_date": self.as_of.format("%Y-%m-%d").to_string(),
            "result": self.result,
            "expected_goals": {
                "home": self.expected_goals.home,
                "away": self.expected_goals.away,
                "total": self.expected_goals.total(),
            },
            "btts": self.btts,
            "confidence": self.confidence,
            "model_version": self.model_version,
            "analysis": self.analysis,
            "data_warnings": self.data_warnings,
        });
        if let Value::Object(map) = &mut doc {
            map.insert(self.over_under.key(), json!(self.over_under));
        }
        doc
    }
}

impl Serialize for Prediction {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

/// Format a prediction for display
pub fn format_prediction(pred: &Prediction) -> String {
    let (outcome, prob) = pred.result.most_likely();
    let factors = if pred.analysis.key_factors.is_empty() {
        "-".to_string()
    } else {
        pred.analysis.key_factors.join("; ")
    };

    format!(
        r#"
┌─────────────────────────────────────────────────┐
│  {} vs {} ({}, {})
├─────────────────────────────────────────────────┤
│  Result:           H {:.1}%  D {:.1}%  A {:.1}%
│  Most likely:      {} ({:.1}%)
│  Expected goals:   {:.2} - {:.2} (total {:.2})
│  Over/Under {}:   {:.1}% / {:.1}%
│  BTTS yes/no:      {:.1}% / {:.1}%
│  Confidence:       {:.2}
│  Key factors:      {}
│  Model:            {}
└─────────────────────────────────────────────────┘
"#,
        pred.home_team,
        pred.away_team,
        pred.league,
        pred.as_of,
        pred.result.home_win * 100.0,
        pred.result.draw * 100.0,
        pred.result.away_win * 100.0,
        outcome,
        prob * 100.0,
        pred.expected_goals.home,
        pred.expected_goals.away,
        pred.expected_goals.total(),
        pred.over_under.line,
        pred.over_under.over * 100.0,
        pred.over_under.under * 100.0,
        pred.btts.yes * 100.0,
        pred.btts.no * 100.0,
        pred.confidence,
        factors,
        pred.model_version
    )
}
