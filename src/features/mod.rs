//! Feature extraction
//!
//! Derives the fixed-order model input from normalized team records.

pub mod engineer;
pub mod form;
pub mod head_to_head;
pub mod league;
pub mod matchup;
pub mod scaling;
pub mod schedule;
pub mod schema;
pub mod team_stats;
pub mod vector;

pub use engineer::{FeatureEngineer, FeatureSet};
pub use form::{FormFeatures, FormRating};
pub use head_to_head::HeadToHead;
pub use league::{LeagueAverages, LeagueTable};
pub use scaling::FeatureScaling;
pub use schema::{layout_hash, FeatureId, FEATURE_COUNT, FEATURE_VERSION};
pub use team_stats::TeamStatistics;
pub use vector::FeatureVector;
