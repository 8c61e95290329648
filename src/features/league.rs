//! League context features
//!
//! A points table rebuilt from every team record in the query's league, plus the
//! league averages used to impute unknown team rates.

use chrono::NaiveDate;
use std::cmp::Ordering;

use crate::data::record::{SplitStats, TeamRecord};
use crate::features::team_stats::TeamStatistics;
use crate::name_key;

/// League-wide per-team, per-game averages
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeagueAverages {
    pub ppg: f32,
    pub win_rate: f32,
    pub draw_rate: f32,
    /// Goals scored by one team in one match
    pub goals: f32,
    pub clean_sheet_rate: f32,
    pub scoring_rate: f32,
    /// Scored matches the averages were computed from
    pub sample: usize,
}

impl LeagueAverages {
    /// Typical top-flight values, used when the league has no scored matches
    pub const FALLBACK: LeagueAverages = LeagueAverages {
        ppg: 1.37,
        win_rate: 0.37,
        draw_rate: 0.26,
        goals: 1.35,
        clean_sheet_rate: 0.30,
        scoring_rate: 0.72,
        sample: 0,
    };

    /// Averages over every league match since `since`, across all records
    pub fn from_records(records: &[TeamRecord], since: NaiveDate) -> Self {
        let mut totals = SplitStats::default();
        for record in records {
            for m in record.league_matches_since(since) {
                totals.update(m);
            }
        }
        Self::from_stats(&totals)
    }

    pub fn from_stats(totals: &SplitStats) -> Self {
        let fallback = Self::FALLBACK;
        LeagueAverages {
            ppg: totals.points_per_game().unwrap_or(fallback.ppg),
            win_rate: totals.win_rate().unwrap_or(fallback.win_rate),
            draw_rate: totals.draw_rate().unwrap_or(fallback.draw_rate),
            goals: totals.goals_for_avg().unwrap_or(fallback.goals),
            clean_sheet_rate: totals.clean_sheet_rate().unwrap_or(fallback.clean_sheet_rate),
            scoring_rate: totals.scoring_rate().unwrap_or(fallback.scoring_rate),
            sample: totals.scored,
        }
    }
}

impl Default for LeagueAverages {
    fn default() -> Self {
        Self::FALLBACK
    }
}

/// One row of the league table
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub team: String,
    pub played: usize,
    pub points: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

impl TableRow {
    pub fn goal_difference(&self) -> i64 {
        self.goals_for as i64 - self.goals_against as i64
    }
}

/// Standings built from each team's own league matches
#[derive(Debug, Clone, Default)]
pub struct LeagueTable {
    rows: Vec<TableRow>,
}

impl LeagueTable {
    /// Teams without a scored league match since `since` are left out
    pub fn build(records: &[TeamRecord], since: NaiveDate) -> Self {
        let mut rows: Vec<TableRow> = records
            .iter()
            .filter_map(|record| {
                let stats = SplitStats::from_matches(record.league_matches_since(since));
                if stats.scored == 0 {
                    return None;
                }
                Some(TableRow {
                    team: record.team.clone(),
                    played: stats.scored,
                    points: stats.points(),
                    goals_for: stats.goals_for,
                    goals_against: stats.goals_against,
                })
            })
            .collect();

        rows.sort_by(|a, b| {
            b.points
                .cmp(&a.points)
                .then_with(|| b.goal_difference().cmp(&a.goal_difference()))
                .then_with(|| b.goals_for.cmp(&a.goals_for))
                .then_with(|| name_key(&a.team).cmp(&name_key(&b.team)))
        });

        LeagueTable { rows }
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 1-based position
    pub fn position(&self, team: &str) -> Option<usize> {
        let key = name_key(team);
        self.rows
            .iter()
            .position(|r| name_key(&r.team) == key)
            .map(|i| i + 1)
    }

    /// Position scaled to [0, 1], 0 = top; 0.5 when unknown
    pub fn normalized_position(&self, team: &str) -> f32 {
        match self.position(team) {
            Some(_) if self.rows.len() == 1 => 0.5,
            Some(pos) => (pos - 1) as f32 / (self.rows.len() - 1) as f32,
            None => 0.5,
        }
    }
}

/// League context for a fixture
#[derive(Debug, Clone, Copy, Default)]
pub struct LeagueContext {
    pub home_table_position: f32,
    pub away_table_position: f32,
    pub table_position_gap: f32,
    /// Season goals scored relative to the league average (1.0 = average)
    pub home_scoring_vs_league: f32,
    pub away_scoring_vs_league: f32,
    pub home_conceding_vs_league: f32,
    pub away_conceding_vs_league: f32,
    pub league_avg_goals: f32,
}

impl LeagueContext {
    pub const DIM: usize = 8;

    pub fn compute(
        table: &LeagueTable,
        averages: &LeagueAverages,
        home_team: &str,
        away_team: &str,
        home_season: &TeamStatistics,
        away_season: &TeamStatistics,
    ) -> Self {
        let home_pos = table.normalized_position(home_team);
        let away_pos = table.normalized_position(away_team);
        let ratio = |v: f32| ratio_to(v, averages.goals);

        LeagueContext {
            home_table_position: home_pos,
            away_table_position: away_pos,
            table_position_gap: away_pos - home_pos,
            home_scoring_vs_league: ratio(home_season.goals_for),
            away_scoring_vs_league: ratio(away_season.goals_for),
            home_conceding_vs_league: ratio(home_season.goals_against),
            away_conceding_vs_league: ratio(away_season.goals_against),
            league_avg_goals: averages.goals,
        }
    }

    pub fn to_vec(&self) -> Vec<f32> {
        vec![
            self.home_table_position,
            self.away_table_position,
            self.table_position_gap,
            self.home_scoring_vs_league,
            self.away_scoring_vs_league,
            self.home_conceding_vs_league,
            self.away_conceding_vs_league,
            self.league_avg_goals,
        ]
    }
}

fn ratio_to(value: f32, average: f32) -> f32 {
    match average.partial_cmp(&0.0) {
        Some(Ordering::Greater) => value / average,
        _ => 1.0,
    }
}
