//! Recent form over the last N scored matches

use crate::data::record::{SplitStats, TeamRecord};
use crate::features::league::LeagueAverages;
use crate::features::team_stats::TeamStatistics;

/// Qualitative form band
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum FormRating {
    Excellent,
    Good,
    Average,
    Poor,
}

impl FormRating {
    pub fn from_score(score: f32) -> Self {
        if score >= 0.7 {
            FormRating::Excellent
        } else if score >= 0.5 {
            FormRating::Good
        } else if score >= 0.3 {
            FormRating::Average
        } else {
            FormRating::Poor
        }
    }
}

impl std::fmt::Display for FormRating {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FormRating::Excellent => "Excellent",
            FormRating::Good => "Good",
            FormRating::Average => "Average",
            FormRating::Poor => "Poor",
        };
        write!(f, "{}", s)
    }
}

/// Form features for one team
#[derive(Debug, Clone, Copy)]
pub struct FormFeatures {
    pub stats: TeamStatistics,
    /// 0.7 x form score + 0.3 x win rate, capped at 1
    pub momentum: f32,
}

impl FormFeatures {
    pub const DIM: usize = 9;

    /// Compute over the last `window` scored matches; shorter histories use what exists
    pub fn compute(record: &TeamRecord, window: usize, avg: &LeagueAverages) -> Self {
        let recent = SplitStats::from_matches(record.recent_scored(window));
        let stats = TeamStatistics::from_split(&recent, avg);
        let momentum = (0.7 * stats.form_score() + 0.3 * stats.win_rate).min(1.0);

        FormFeatures { stats, momentum }
    }

    /// Scored matches in the window
    pub fn depth(&self) -> usize {
        self.stats.depth
    }

    pub fn rating(&self) -> FormRating {
        FormRating::from_score(self.stats.form_score())
    }

    pub fn to_vec(&self) -> Vec<f32> {
        vec![
            self.stats.ppg,
            self.stats.goal_diff,
            self.stats.win_rate,
            self.stats.draw_rate,
            self.stats.goals_for,
            self.stats.goals_against,
            self.stats.clean_sheet_rate,
            self.stats.scoring_rate,
            self.momentum,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::MatchResult;
    use crate::Venue;
    use chrono::NaiveDate;

    fn record(scores: &[(u8, u8)]) -> TeamRecord {
        let matches = scores
            .iter()
            .enumerate()
            .map(|(i, &(gf, ga))| MatchResult {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Duration::days(7 * i as i64),
                opponent: format!("Team {}", i),
                competition: None,
                venue: Venue::Home,
                goals_for: Some(gf),
                goals_against: Some(ga),
            })
            .collect();
        TeamRecord::new("Arsenal", "Premier League", matches)
    }

    #[test]
    fn test_window_uses_most_recent() {
        // Three early losses, then five wins
        let record = record(&[(0, 1), (0, 1), (0, 1), (2, 0), (2, 0), (2, 0), (2, 0), (2, 0)]);
        let form = FormFeatures::compute(&record, 5, &LeagueAverages::FALLBACK);

        assert_eq!(form.depth(), 5);
        assert_eq!(form.stats.ppg, 3.0);
        assert_eq!(form.stats.win_rate, 1.0);
        assert_eq!(form.momentum, 1.0);
        assert_eq!(form.rating(), FormRating::Excellent);
    }

    #[test]
    fn test_short_history_uses_available() {
        let record = record(&[(1, 1), (0, 2)]);
        let form = FormFeatures::compute(&record, 5, &LeagueAverages::FALLBACK);
        assert_eq!(form.depth(), 2);
        assert!((form.stats.ppg - 0.5).abs() < 1e-6);
        assert_eq!(form.rating(), FormRating::Poor);
    }

    #[test]
    fn test_empty_history_imputed() {
        let form = FormFeatures::compute(&record(&[]), 5, &LeagueAverages::FALLBACK);
        assert_eq!(form.depth(), 0);
        assert_eq!(form.stats.ppg, LeagueAverages::FALLBACK.ppg);
        assert!(form.to_vec().iter().all(|v| v.is_finite()));
        assert_eq!(form.to_vec().len(), FormFeatures::DIM);
    }

    #[test]
    fn test_rating_bands() {
        assert_eq!(FormRating::from_score(0.7), FormRating::Excellent);
        assert_eq!(FormRating::from_score(0.5), FormRating::Good);
        assert_eq!(FormRating::from_score(0.3), FormRating::Average);
        assert_eq!(FormRating::from_score(0.1), FormRating::Poor);
    }
}
