//! Matchup and trend features
//!
//! Derived from the per-team families: how the two sides compare, and whether each
//! side is trending above or below its season level.

use crate::features::form::FormFeatures;
use crate::features::team_stats::{SeasonFeatures, VenueFeatures};
use crate::predict::calibrate::sigmoid;

/// Head-to-head comparison of the two sides
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchupFeatures {
    pub ppg_diff: f32,
    pub win_rate_diff: f32,
    /// Home goals scored minus away goals conceded, per game
    pub home_attack_vs_defense: f32,
    pub away_attack_vs_defense: f32,
    pub expected_home_goals: f32,
    pub expected_away_goals: f32,
    pub expected_total_goals: f32,
    /// Logistic prior that the total goes over the line
    pub over_line_prior: f32,
    /// Product of both sides' scoring rates
    pub btts_prior: f32,
    /// Clean-sheet rate times the opponent's failure-to-score rate
    pub home_clean_sheet_prob: f32,
    pub away_clean_sheet_prob: f32,
}

impl MatchupFeatures {
    pub const DIM: usize = 11;

    pub fn compute(
        home_form: &FormFeatures,
        away_form: &FormFeatures,
        season: &SeasonFeatures,
        venue: &VenueFeatures,
        line: f32,
    ) -> Self {
        let expected_home_goals =
            (venue.home_at_home.goals_for + venue.away_on_road.goals_against) / 2.0;
        let expected_away_goals =
            (venue.away_on_road.goals_for + venue.home_at_home.goals_against) / 2.0;
        let expected_total_goals = expected_home_goals + expected_away_goals;

        MatchupFeatures {
            ppg_diff: home_form.stats.ppg - away_form.stats.ppg,
            win_rate_diff: home_form.stats.win_rate - away_form.stats.win_rate,
            home_attack_vs_defense: season.home.goals_for - season.away.goals_against,
            away_attack_vs_defense: season.away.goals_for - season.home.goals_against,
            expected_home_goals,
            expected_away_goals,
            expected_total_goals,
            over_line_prior: sigmoid((expected_total_goals - line) as f64) as f32,
            btts_prior: season.home.scoring_rate * season.away.scoring_rate,
            home_clean_sheet_prob: season.home.clean_sheet_rate * (1.0 - season.away.scoring_rate),
            away_clean_sheet_prob: season.away.clean_sheet_rate * (1.0 - season.home.scoring_rate),
        }
    }

    pub fn to_vec(&self) -> Vec<f32> {
        vec![
            self.ppg_diff,
            self.win_rate_diff,
            self.home_attack_vs_defense,
            self.away_attack_vs_defense,
            self.expected_home_goals,
            self.expected_away_goals,
            self.expected_total_goals,
            self.over_line_prior,
            self.btts_prior,
            self.home_clean_sheet_prob,
            self.away_clean_sheet_prob,
        ]
    }
}

/// Recent form relative to season level; positive = improving
#[derive(Debug, Clone, Copy, Default)]
pub struct TrendFeatures {
    pub home_scoring_trend: f32,
    pub away_scoring_trend: f32,
    pub home_defense_trend: f32,
    pub away_defense_trend: f32,
    /// Form score minus 0.8 x season win rate
    pub home_form_vs_season: f32,
    pub away_form_vs_season: f32,
}

impl TrendFeatures {
    pub const DIM: usize = 6;

    pub fn compute(home_form: &FormFeatures, away_form: &FormFeatures, season: &SeasonFeatures) -> Self {
        TrendFeatures {
            home_scoring_trend: home_form.stats.goals_for - season.home.goals_for,
            away_scoring_trend: away_form.stats.goals_for - season.away.goals_for,
            home_defense_trend: season.home.goals_against - home_form.stats.goals_against,
            away_defense_trend: season.away.goals_against - away_form.stats.goals_against,
            home_form_vs_season: home_form.stats.form_score() - 0.8 * season.home.win_rate,
            away_form_vs_season: away_form.stats.form_score() - 0.8 * season.away.win_rate,
        }
    }

    pub fn to_vec(&self) -> Vec<f32> {
        vec![
            self.home_scoring_trend,
            self.away_scoring_trend,
            self.home_defense_trend,
            self.away_defense_trend,
            self.home_form_vs_season,
            self.away_form_vs_season,
        ]
    }
}
