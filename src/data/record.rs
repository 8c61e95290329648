//! Canonical per-team records produced by the normalizer

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{name_key, Venue};

/// Outcome of a match from one team's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Draw,
    Loss,
}

impl Outcome {
    pub fn points(&self) -> u32 {
        match self {
            Outcome::Win => 3,
            Outcome::Draw => 1,
            Outcome::Loss => 0,
        }
    }
}

/// A normalized match result from one team's point of view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub date: NaiveDate,
    pub opponent: String,
    pub competition: Option<String>,
    pub venue: Venue,
    /// `None` = unknown, never a silent zero
    pub goals_for: Option<u8>,
    pub goals_against: Option<u8>,
}

impl MatchResult {
    /// Both scores, when known
    pub fn score(&self) -> Option<(u8, u8)> {
        match (self.goals_for, self.goals_against) {
            (Some(gf), Some(ga)) => Some((gf, ga)),
            _ => None,
        }
    }

    pub fn outcome(&self) -> Option<Outcome> {
        self.score().map(|(gf, ga)| match gf.cmp(&ga) {
            std::cmp::Ordering::Greater => Outcome::Win,
            std::cmp::Ordering::Equal => Outcome::Draw,
            std::cmp::Ordering::Less => Outcome::Loss,
        })
    }

    pub fn is_scored(&self) -> bool {
        self.score().is_some()
    }

    pub fn is_against(&self, opponent: &str) -> bool {
        name_key(&self.opponent) == name_key(opponent)
    }

    /// Whether the match belongs to the given league; untagged matches count
    pub fn in_competition(&self, league: &str) -> bool {
        self.competition
            .as_deref()
            .map_or(true, |c| name_key(c) == name_key(league))
    }
}

/// Aggregate statistics over a set of matches
///
/// Rates are `None` when no match in the set has a known score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SplitStats {
    /// All matches, including those with unknown scores
    pub played: usize,
    /// Matches with both scores known
    pub scored: usize,
    pub wins: usize,
    pub draws: usize,
    pub losses: usize,
    pub goals_for: u32,
    pub goals_against: u32,
    pub clean_sheets: usize,
    pub failed_to_score: usize,
}

impl SplitStats {
    pub fn from_matches<'a>(matches: impl IntoIterator<Item = &'a MatchResult>) -> Self {
        let mut stats = SplitStats::default();
        for m in matches {
            stats.update(m);
        }
        stats
    }

    /// Update statistics with a match result
    pub fn update(&mut self, m: &MatchResult) {
        self.played += 1;

        let (gf, ga) = match m.score() {
            Some(score) => score,
            None => return,
        };

        self.scored += 1;
        self.goals_for += gf as u32;
        self.goals_against += ga as u32;
        if ga == 0 {
            self.clean_sheets += 1;
        }
        if gf == 0 {
            self.failed_to_score += 1;
        }

        match gf.cmp(&ga) {
            std::cmp::Ordering::Greater => self.wins += 1,
            std::cmp::Ordering::Equal => self.draws += 1,
            std::cmp::Ordering::Less => self.losses += 1,
        }
    }

    pub fn points(&self) -> u32 {
        self.wins as u32 * 3 + self.draws as u32
    }

    fn rate(&self, count: f32) -> Option<f32> {
        if self.scored == 0 {
            None
        } else {
            Some(count / self.scored as f32)
        }
    }

    pub fn points_per_game(&self) -> Option<f32> {
        self.rate(self.points() as f32)
    }

    pub fn win_rate(&self) -> Option<f32> {
        self.rate(self.wins as f32)
    }

    pub fn draw_rate(&self) -> Option<f32> {
        self.rate(self.draws as f32)
    }

    pub fn goals_for_avg(&self) -> Option<f32> {
        self.rate(self.goals_for as f32)
    }

    pub fn goals_against_avg(&self) -> Option<f32> {
        self.rate(self.goals_against as f32)
    }

    /// Average goal difference per match
    pub fn goal_diff_avg(&self) -> Option<f32> {
        self.rate(self.goals_for as f32 - self.goals_against as f32)
    }

    pub fn clean_sheet_rate(&self) -> Option<f32> {
        self.rate(self.clean_sheets as f32)
    }

    /// Share of matches in which the team scored at least once
    pub fn scoring_rate(&self) -> Option<f32> {
        self.rate((self.scored - self.failed_to_score) as f32)
    }
}

/// What the normalizer had to fix while building a record
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationReport {
    /// Entries without a usable date or opponent
    pub dropped: usize,
    /// Entries merged into an earlier entry with the same identity
    pub duplicates: usize,
    /// Entries on or after the as-of date
    pub future: usize,
    /// Kept matches with at least one unknown score
    pub unknown_scores: usize,
}

/// Canonical history of one team, rebuilt per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub team: String,
    pub league: String,
    /// Ordered by date, oldest first
    pub matches: Vec<MatchResult>,
    pub overall: SplitStats,
    pub home: SplitStats,
    pub away: SplitStats,
    /// The data collaborator could not supply any history
    pub data_unavailable: bool,
    pub report: NormalizationReport,
}

impl TeamRecord {
    /// Build a record from already-normalized, date-ordered matches
    pub fn new(team: &str, league: &str, matches: Vec<MatchResult>) -> Self {
        let overall = SplitStats::from_matches(&matches);
        let home = SplitStats::from_matches(matches.iter().filter(|m| m.venue == Venue::Home));
        let away = SplitStats::from_matches(matches.iter().filter(|m| m.venue == Venue::Away));

        TeamRecord {
            team: team.to_string(),
            league: league.to_string(),
            matches,
            overall,
            home,
            away,
            data_unavailable: false,
            report: NormalizationReport::default(),
        }
    }

    /// A valid record with no history
    pub fn empty(team: &str, league: &str) -> Self {
        Self::new(team, league, Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Last `n` matches with known scores, oldest first
    pub fn recent_scored(&self, n: usize) -> Vec<&MatchResult> {
        let mut recent: Vec<_> = self.matches.iter().rev().filter(|m| m.is_scored()).take(n).collect();
        recent.reverse();
        recent
    }

    pub fn last_match_date(&self) -> Option<NaiveDate> {
        self.matches.last().map(|m| m.date)
    }

    /// Matches against a specific opponent, oldest first
    pub fn meetings_with(&self, opponent: &str) -> Vec<&MatchResult> {
        self.matches.iter().filter(|m| m.is_against(opponent)).collect()
    }

    /// League matches on or after `since`
    pub fn league_matches_since(&self, since: NaiveDate) -> impl Iterator<Item = &MatchResult> {
        let league = self.league.clone();
        self.matches
            .iter()
            .filter(move |m| m.date >= since && m.in_competition(&league))
    }
}
