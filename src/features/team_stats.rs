//! Team statistics with imputation
//!
//! Rates over a set of matches, falling back to league averages wherever the team
//! has no scored match to compute them from.

use crate::data::record::{SplitStats, TeamRecord};
use crate::features::league::LeagueAverages;

/// Per-game rates for one team over one set of matches
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamStatistics {
    /// Points per game (0-3)
    pub ppg: f32,
    /// Average goal difference per match
    pub goal_diff: f32,
    pub win_rate: f32,
    pub draw_rate: f32,
    /// Goals scored per match
    pub goals_for: f32,
    /// Goals conceded per match
    pub goals_against: f32,
    pub clean_sheet_rate: f32,
    /// Share of matches with at least one goal scored
    pub scoring_rate: f32,
    /// Scored matches behind these values; 0 = fully imputed
    pub depth: usize,
}

impl TeamStatistics {
    pub fn from_split(stats: &SplitStats, avg: &LeagueAverages) -> Self {
        TeamStatistics {
            ppg: stats.points_per_game().unwrap_or(avg.ppg),
            goal_diff: stats.goal_diff_avg().unwrap_or(0.0),
            win_rate: stats.win_rate().unwrap_or(avg.win_rate),
            draw_rate: stats.draw_rate().unwrap_or(avg.draw_rate),
            goals_for: stats.goals_for_avg().unwrap_or(avg.goals),
            goals_against: stats.goals_against_avg().unwrap_or(avg.goals),
            clean_sheet_rate: stats.clean_sheet_rate().unwrap_or(avg.clean_sheet_rate),
            scoring_rate: stats.scoring_rate().unwrap_or(avg.scoring_rate),
            depth: stats.scored,
        }
    }

    /// A team about which nothing is known
    pub fn imputed(avg: &LeagueAverages) -> Self {
        Self::from_split(&SplitStats::default(), avg)
    }

    /// Points per game scaled to [0, 1]
    pub fn form_score(&self) -> f32 {
        (self.ppg / 3.0).clamp(0.0, 1.0)
    }
}

/// Season aggregates for both teams
#[derive(Debug, Clone, Copy)]
pub struct SeasonFeatures {
    pub home: TeamStatistics,
    pub away: TeamStatistics,
}

impl SeasonFeatures {
    pub const DIM: usize = 8;

    pub fn compute(home: &SplitStats, away: &SplitStats, avg: &LeagueAverages) -> Self {
        SeasonFeatures {
            home: TeamStatistics::from_split(home, avg),
            away: TeamStatistics::from_split(away, avg),
        }
    }

    pub fn to_vec(&self) -> Vec<f32> {
        vec![
            self.home.ppg,
            self.home.win_rate,
            self.home.goals_for,
            self.home.goals_against,
            self.away.ppg,
            self.away.win_rate,
            self.away.goals_for,
            self.away.goals_against,
        ]
    }
}

/// Home team's record at home and away team's record on the road
#[derive(Debug, Clone, Copy)]
pub struct VenueFeatures {
    pub home_at_home: TeamStatistics,
    pub away_on_road: TeamStatistics,
    pub home_venue_strength: f32,
    pub away_travel_weakness: f32,
}

impl VenueFeatures {
    pub const DIM: usize = 10;

    pub fn compute(
        home: &TeamRecord,
        away: &TeamRecord,
        season: &SeasonFeatures,
        avg: &LeagueAverages,
    ) -> Self {
        // Venue splits cannot be imputed from the league alone; fall back to the
        // team's own season numbers first
        let home_avg = team_as_average(&season.home, avg);
        let away_avg = team_as_average(&season.away, avg);

        let home_at_home = TeamStatistics::from_split(&home.home, &home_avg);
        let away_on_road = TeamStatistics::from_split(&away.away, &away_avg);

        VenueFeatures {
            home_venue_strength: home_at_home.ppg - season.home.ppg,
            away_travel_weakness: season.away.ppg - away_on_road.ppg,
            home_at_home,
            away_on_road,
        }
    }

    pub fn to_vec(&self) -> Vec<f32> {
        vec![
            self.home_at_home.ppg,
            self.home_at_home.win_rate,
            self.home_at_home.goals_for,
            self.home_at_home.goals_against,
            self.away_on_road.ppg,
            self.away_on_road.win_rate,
            self.away_on_road.goals_for,
            self.away_on_road.goals_against,
            self.home_venue_strength,
            self.away_travel_weakness,
        ]
    }
}

fn team_as_average(stats: &TeamStatistics, league: &LeagueAverages) -> LeagueAverages {
    LeagueAverages {
        ppg: stats.ppg,
        win_rate: stats.win_rate,
        draw_rate: stats.draw_rate,
        goals: stats.goals_for,
        clean_sheet_rate: stats.clean_sheet_rate,
        scoring_rate: stats.scoring_rate,
        sample: league.sample,
    }
}
