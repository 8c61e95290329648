//! Feature layout
//!
//! `FeatureId` is the single source of truth for the order of the feature vector.
//! Adding, removing or reordering a feature must bump `FEATURE_VERSION`; the layout
//! hash is stored in every model artifact and checked at load time.

use crc32fast::Hasher;

/// Current feature layout version
pub const FEATURE_VERSION: u8 = 2;

macro_rules! feature_layout {
    ($($(#[$doc:meta])* $variant:ident => $name:literal,)+) => {
        /// Position of a feature in the vector
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum FeatureId {
            $($(#[$doc])* $variant,)+
        }

        impl FeatureId {
            /// Every feature, in vector order
            pub const ALL: &'static [FeatureId] = &[$(FeatureId::$variant,)+];

            pub fn name(self) -> &'static str {
                match self {
                    $(FeatureId::$variant => $name,)+
                }
            }
        }
    };
}

feature_layout! {
    // === Recent form, home team (0-8) ===
    HomeFormPpg => "home_form_ppg",
    HomeFormGoalDiff => "home_form_goal_diff",
    HomeFormWinRate => "home_form_win_rate",
    HomeFormDrawRate => "home_form_draw_rate",
    HomeFormGoalsFor => "home_form_goals_for",
    HomeFormGoalsAgainst => "home_form_goals_against",
    HomeFormCleanSheetRate => "home_form_clean_sheet_rate",
    HomeFormScoringRate => "home_form_scoring_rate",
    /// 0.7 x form score + 0.3 x form win rate, capped at 1
    HomeMomentum => "home_momentum",

    // === Recent form, away team (9-17) ===
    AwayFormPpg => "away_form_ppg",
    AwayFormGoalDiff => "away_form_goal_diff",
    AwayFormWinRate => "away_form_win_rate",
    AwayFormDrawRate => "away_form_draw_rate",
    AwayFormGoalsFor => "away_form_goals_for",
    AwayFormGoalsAgainst => "away_form_goals_against",
    AwayFormCleanSheetRate => "away_form_clean_sheet_rate",
    AwayFormScoringRate => "away_form_scoring_rate",
    AwayMomentum => "away_momentum",

    // === Season aggregates (18-25) ===
    HomeSeasonPpg => "home_season_ppg",
    HomeSeasonWinRate => "home_season_win_rate",
    HomeSeasonGoalsFor => "home_season_goals_for",
    HomeSeasonGoalsAgainst => "home_season_goals_against",
    AwaySeasonPpg => "away_season_ppg",
    AwaySeasonWinRate => "away_season_win_rate",
    AwaySeasonGoalsFor => "away_season_goals_for",
    AwaySeasonGoalsAgainst => "away_season_goals_against",

    // === Venue splits (26-35) ===
    HomeAtHomePpg => "home_at_home_ppg",
    HomeAtHomeWinRate => "home_at_home_win_rate",
    HomeAtHomeGoalsFor => "home_at_home_goals_for",
    HomeAtHomeGoalsAgainst => "home_at_home_goals_against",
    AwayOnRoadPpg => "away_on_road_ppg",
    AwayOnRoadWinRate => "away_on_road_win_rate",
    AwayOnRoadGoalsFor => "away_on_road_goals_for",
    AwayOnRoadGoalsAgainst => "away_on_road_goals_against",
    /// Home PPG at home minus season PPG
    HomeVenueStrength => "home_venue_strength",
    /// Season PPG minus PPG on the road
    AwayTravelWeakness => "away_travel_weakness",

    // === Head-to-head, recency weighted (36-43) ===
    H2hMatches => "h2h_matches",
    H2hHomeWinRate => "h2h_home_win_rate",
    H2hDrawRate => "h2h_draw_rate",
    H2hAwayWinRate => "h2h_away_win_rate",
    H2hAvgGoals => "h2h_avg_goals",
    H2hBttsRate => "h2h_btts_rate",
    H2hOverLineRate => "h2h_over_line_rate",
    H2hDominance => "h2h_dominance",

    // === League context (44-51) ===
    /// 0.0 = top of the table, 1.0 = bottom
    HomeTablePosition => "home_table_position",
    AwayTablePosition => "away_table_position",
    /// Positive when the home team sits higher
    TablePositionGap => "table_position_gap",
    HomeScoringVsLeague => "home_scoring_vs_league",
    AwayScoringVsLeague => "away_scoring_vs_league",
    HomeConcedingVsLeague => "home_conceding_vs_league",
    AwayConcedingVsLeague => "away_conceding_vs_league",
    LeagueAvgGoals => "league_avg_goals",

    // === Matchup (52-62) ===
    PpgDiff => "ppg_diff",
    WinRateDiff => "win_rate_diff",
    HomeAttackVsDefense => "home_attack_vs_defense",
    AwayAttackVsDefense => "away_attack_vs_defense",
    ExpectedHomeGoals => "expected_home_goals",
    ExpectedAwayGoals => "expected_away_goals",
    ExpectedTotalGoals => "expected_total_goals",
    OverLinePrior => "over_line_prior",
    BttsPrior => "btts_prior",
    /// Clean-sheet rate times the opponent's failure-to-score rate
    HomeCleanSheetProb => "home_clean_sheet_prob",
    AwayCleanSheetProb => "away_clean_sheet_prob",

    // === Trends, form vs season (63-68) ===
    HomeScoringTrend => "home_scoring_trend",
    AwayScoringTrend => "away_scoring_trend",
    HomeDefenseTrend => "home_defense_trend",
    AwayDefenseTrend => "away_defense_trend",
    /// Form score minus 0.8 x season win rate
    HomeFormVsSeason => "home_form_vs_season",
    AwayFormVsSeason => "away_form_vs_season",

    // === Rest and schedule (69-75) ===
    HomeRestDays => "home_rest_days",
    AwayRestDays => "away_rest_days",
    RestAdvantage => "rest_advantage",
    HomeCongestion => "home_congestion",
    AwayCongestion => "away_congestion",
    HomeShortTurnaround => "home_short_turnaround",
    AwayShortTurnaround => "away_short_turnaround",

    // === Query (76-77) ===
    /// Goal line the over/under head is asked about
    OverUnderLine => "over_under_line",
    DataCompleteness => "data_completeness",
}

/// Total number of features
pub const FEATURE_COUNT: usize = FeatureId::ALL.len();

impl FeatureId {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<FeatureId> {
        Self::ALL.get(index).copied()
    }
}

/// CRC32 over the version byte and the ordered feature names
pub fn layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);
    for id in FeatureId::ALL {
        hasher.update(id.name().as_bytes());
        hasher.update(&[0]);
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_feature_count() {
        assert_eq!(FEATURE_COUNT, 78);
        assert_eq!(FeatureId::DataCompleteness.index(), FEATURE_COUNT - 1);
    }

    #[test]
    fn test_indices_follow_declaration_order() {
        for (i, id) in FeatureId::ALL.iter().enumerate() {
            assert_eq!(id.index(), i);
            assert_eq!(FeatureId::from_index(i), Some(*id));
        }
        assert_eq!(FeatureId::from_index(FEATURE_COUNT), None);
    }

    #[test]
    fn test_names_unique() {
        let names: HashSet<_> = FeatureId::ALL.iter().map(|id| id.name()).collect();
        assert_eq!(names.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_layout_hash_stable() {
        assert_eq!(layout_hash(), layout_hash());
        assert_eq!(FeatureId::HomeCleanSheetProb.index(), 61);
        assert_eq!(FeatureId::OverUnderLine.index(), 76);
    }
}
