//! Football match prediction
//!
//! Turns raw per-team match histories into a fixed-length feature vector and runs it
//! through a multi-head network producing result probabilities, expected goals,
//! over/under and both-teams-to-score predictions.

pub mod data;
pub mod features;
pub mod model;
pub mod predict;

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Canonical lookup key for a team or league name
pub fn name_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Where a team played a given match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    Home,
    Away,
    Neutral,
    Unknown,
}

impl Venue {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "home" | "h" => Venue::Home,
            "away" | "a" => Venue::Away,
            "neutral" | "n" => Venue::Neutral,
            _ => Venue::Unknown,
        }
    }
}

impl fmt::Display for Venue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Venue::Home => write!(f, "home"),
            Venue::Away => write!(f, "away"),
            Venue::Neutral => write!(f, "neutral"),
            Venue::Unknown => write!(f, "unknown"),
        }
    }
}

/// A single prediction query
#[derive(Debug, Clone, PartialEq)]
pub struct MatchContext {
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    /// Only matches strictly before this date are used
    pub as_of: NaiveDate,
    /// Goal line for the over/under head; engine default when `None`
    pub over_under_line: Option<f32>,
}

impl MatchContext {
    /// Create a query dated today
    pub fn new(home_team: &str, away_team: &str, league: &str) -> Self {
        MatchContext {
            home_team: home_team.trim().to_string(),
            away_team: away_team.trim().to_string(),
            league: league.trim().to_string(),
            as_of: Local::now().date_naive(),
            over_under_line: None,
        }
    }

    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = as_of;
        self
    }

    pub fn with_over_under_line(mut self, line: f32) -> Self {
        self.over_under_line = Some(line);
        self
    }

    /// Reject queries that cannot describe a real fixture
    pub fn validate(&self) -> Result<()> {
        if self.home_team.is_empty() || self.away_team.is_empty() {
            return Err(FootballError::InvalidRequest(
                "home_team and away_team are required".to_string(),
            ));
        }
        if name_key(&self.home_team) == name_key(&self.away_team) {
            return Err(FootballError::InvalidRequest(format!(
                "{} cannot play itself",
                self.home_team
            )));
        }
        if let Some(line) = self.over_under_line {
            if !line.is_finite() || line <= 0.0 {
                return Err(FootballError::InvalidRequest(format!(
                    "over/under line must be positive, got {}",
                    line
                )));
            }
        }
        Ok(())
    }
}

/// Request shape consumed from the orchestration layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub home_team: String,
    pub away_team: String,
    pub league: String,
    #[serde(default)]
    pub as_of_date: Option<NaiveDate>,
}

impl From<PredictionRequest> for MatchContext {
    fn from(req: PredictionRequest) -> Self {
        let ctx = MatchContext::new(&req.home_team, &req.away_team, &req.league);
        match req.as_of_date {
            Some(date) => ctx.with_as_of(date),
            None => ctx,
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum FootballError {
    #[error("No history available for {team}: {reason}")]
    DataUnavailable { team: String, reason: String },

    #[error("Feature contract violation: {0}")]
    FeatureContract(String),

    #[error("Model unavailable - no model has been loaded")]
    ModelUnavailable,

    #[error("Model already loaded")]
    ModelAlreadyLoaded,

    #[error("Model output invalid: {0}")]
    ModelOutputInvalid(String),

    #[error("Model artifact incompatible: {0}")]
    ModelIncompatible(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl FootballError {
    /// Stable machine-readable error code
    pub fn kind(&self) -> &'static str {
        match self {
            FootballError::DataUnavailable { .. } => "data_unavailable",
            FootballError::FeatureContract(_) => "feature_contract_violation",
            FootballError::ModelUnavailable => "model_unavailable",
            FootballError::ModelAlreadyLoaded => "model_already_loaded",
            FootballError::ModelOutputInvalid(_) => "model_output_invalid",
            FootballError::ModelIncompatible(_) => "model_incompatible",
            FootballError::InvalidRequest(_) => "invalid_request",
            FootballError::Database(_) => "database",
            FootballError::Json(_) => "json",
            FootballError::Config(_) => "config",
            FootballError::Io(_) => "io",
            FootballError::Parse(_) => "parse",
        }
    }
}

/// Structured error surfaced to callers in place of a prediction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl From<&FootballError> for ErrorResponse {
    fn from(err: &FootballError) -> Self {
        ErrorResponse {
            error: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, FootballError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    /// Number of recent matches in the form window
    pub form_window: usize,
    /// Age at which a head-to-head result carries half weight
    pub h2h_half_life_days: f32,
    /// Most recent meetings considered for head-to-head
    pub h2h_max_matches: usize,
    pub congestion_window_days: i64,
    /// League table is built from matches within this many days
    pub table_window_days: i64,
    pub short_turnaround_days: i64,
}

impl FeatureConfig {
    /// Reject settings that would make the feature pipeline produce nonsense
    pub fn validate(&self) -> Result<()> {
        if self.form_window == 0 {
            return Err(FootballError::Config(
                "features.form_window must be at least 1".to_string(),
            ));
        }
        if !self.h2h_half_life_days.is_finite() || self.h2h_half_life_days <= 0.0 {
            return Err(FootballError::Config(format!(
                "features.h2h_half_life_days must be positive, got {}",
                self.h2h_half_life_days
            )));
        }
        if self.congestion_window_days <= 0 || self.table_window_days <= 0 {
            return Err(FootballError::Config(
                "features window lengths must be positive".to_string(),
            ));
        }
        if self.short_turnaround_days < 0 {
            return Err(FootballError::Config(
                "features.short_turnaround_days cannot be negative".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for FeatureConfig {
    fn default() -> Self {
        FeatureConfig {
            form_window: 5,
            h2h_half_life_days: 365.0,
            h2h_max_matches: 10,
            congestion_window_days: 14,
            table_window_days: 365,
            short_turnaround_days: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    pub over_under_line: f32,
    /// Allowed deviation of result probabilities from summing to 1
    pub probability_tolerance: f64,
    /// Excursion outside [0, 1] that is clamped with a warning instead of rejected
    pub clamp_tolerance: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            over_under_line: 2.5,
            probability_tolerance: 1e-6,
            clamp_tolerance: 1e-4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub artifact_dir: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        ModelConfig {
            artifact_dir: "model/current".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub database_path: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            database_path: "data/football.db".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            FootballError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| FootballError::Config(format!("Failed to parse config: {}", e)))?;
        config.features.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| FootballError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
