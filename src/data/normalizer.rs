//! Raw history normalization
//!
//! The single boundary where loosely typed collaborator data becomes `TeamRecord`s:
//! dates are parsed, goals are validated, duplicates are merged and anything dated on
//! or after the query date is discarded.

use chrono::{DateTime, NaiveDate};
use std::collections::HashMap;

use crate::data::raw::{LeagueHistory, RawMatchEntry};
use crate::data::record::{MatchResult, NormalizationReport, TeamRecord};
use crate::{name_key, Venue};

/// Accepted date layouts, tried in order
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%Y/%m/%d", "%d.%m.%Y"];

/// Parse a collaborator date string
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    // Timestamps without an offset, e.g. "2024-03-01T15:00:00"
    let date_part = raw.split(['T', ' ']).next().unwrap_or(raw);
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

/// Converts raw histories into canonical team records
#[derive(Debug, Clone, Copy)]
pub struct Normalizer {
    as_of: NaiveDate,
}

impl Normalizer {
    pub fn new(as_of: NaiveDate) -> Self {
        Normalizer { as_of }
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Normalize one team's raw history
    ///
    /// `None` means the collaborator had nothing for this team; the result is an
    /// empty record flagged as unavailable.
    pub fn normalize_team(
        &self,
        team: &str,
        league: &str,
        entries: Option<&[RawMatchEntry]>,
    ) -> TeamRecord {
        let entries = match entries {
            Some(entries) => entries,
            None => {
                let mut record = TeamRecord::empty(team, league);
                record.data_unavailable = true;
                return record;
            }
        };

        let mut report = NormalizationReport::default();
        let mut matches: Vec<MatchResult> = Vec::with_capacity(entries.len());
        let mut index: HashMap<(NaiveDate, String, String), usize> = HashMap::new();

        for entry in entries {
            let result = match self.convert(entry) {
                Some(result) => result,
                None => {
                    report.dropped += 1;
                    continue;
                }
            };

            if result.date >= self.as_of {
                report.future += 1;
                continue;
            }

            let identity = (
                result.date,
                name_key(&result.opponent),
                result.competition.as_deref().map(name_key).unwrap_or_default(),
            );

            match index.get(&identity) {
                Some(&i) => {
                    report.duplicates += 1;
                    merge_into(&mut matches[i], result);
                }
                None => {
                    index.insert(identity, matches.len());
                    matches.push(result);
                }
            }
        }

        // Stable sort keeps collaborator order within a day
        matches.sort_by_key(|m| m.date);
        report.unknown_scores = matches.iter().filter(|m| !m.is_scored()).count();

        if report.dropped + report.duplicates > 0 {
            log::warn!(
                "{}: dropped {} unusable and merged {} duplicate entries",
                team,
                report.dropped,
                report.duplicates
            );
        }

        let mut record = TeamRecord::new(team, league, matches);
        record.report = report;
        record
    }

    /// Normalize every team in a league history
    pub fn normalize_league(&self, league: &str, history: &LeagueHistory) -> NormalizedLeague {
        let mut teams: Vec<&String> = history.keys().collect();
        teams.sort();

        let records = teams
            .into_iter()
            .map(|team| self.normalize_team(team, league, history.get(team).map(|v| v.as_slice())))
            .collect();

        NormalizedLeague {
            league: league.to_string(),
            records,
        }
    }

    fn convert(&self, entry: &RawMatchEntry) -> Option<MatchResult> {
        let date = parse_date(&entry.date)?;
        let opponent = entry.opponent.trim();
        if opponent.is_empty() {
            return None;
        }

        Some(MatchResult {
            date,
            opponent: opponent.to_string(),
            competition: entry
                .competition
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string),
            venue: entry.venue.as_deref().map(Venue::parse).unwrap_or(Venue::Unknown),
            goals_for: entry.goals_for.as_goals(),
            goals_against: entry.goals_against.as_goals(),
        })
    }
}

/// Fill unknown fields of `kept` from a duplicate entry
fn merge_into(kept: &mut MatchResult, dup: MatchResult) {
    if kept.goals_for.is_none() {
        kept.goals_for = dup.goals_for;
    }
    if kept.goals_against.is_none() {
        kept.goals_against = dup.goals_against;
    }
    if kept.venue == Venue::Unknown {
        kept.venue = dup.venue;
    }
}

/// Canonical records for a league, sorted by team name
#[derive(Debug, Clone)]
pub struct NormalizedLeague {
    pub league: String,
    pub records: Vec<TeamRecord>,
}

impl NormalizedLeague {
    pub fn get(&self, team: &str) -> Option<&TeamRecord> {
        let key = name_key(team);
        self.records.iter().find(|r| name_key(&r.team) == key)
    }

    /// Record for a team, or an empty unavailable record when absent
    pub fn record_or_empty(&self, team: &str) -> TeamRecord {
        self.get(team).cloned().unwrap_or_else(|| {
            let mut record = TeamRecord::empty(team, &self.league);
            record.data_unavailable = true;
            record
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::raw::RawNumber;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 4, 1).unwrap()
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9);
        assert_eq!(parse_date("2024-03-09"), expected);
        assert_eq!(parse_date("09/03/2024"), expected);
        assert_eq!(parse_date("2024-03-09T15:00:00Z"), expected);
        assert_eq!(parse_date("2024-03-09T15:00:00"), expected);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
    }

    #[test]
    fn test_missing_history_is_empty_record() {
        let record = Normalizer::new(as_of()).normalize_team("Arsenal", "Premier League", None);
        assert!(record.is_empty());
        assert!(record.data_unavailable);
        assert_eq!(record.overall.played, 0);
        assert_eq!(record.overall.win_rate(), None);
    }

    #[test]
    fn test_sorts_and_filters_future() {
        let entries = vec![
            RawMatchEntry::new("2024-03-15", "Chelsea").score(1, 0).venue("H"),
            RawMatchEntry::new("2024-03-01", "Spurs").score(2, 2).venue("A"),
            RawMatchEntry::new("2024-04-01", "Everton").score(3, 0),
            RawMatchEntry::new("2024-05-01", "Fulham").score(3, 0),
        ];
        let record = Normalizer::new(as_of()).normalize_team("Arsenal", "Premier League", Some(&entries));

        assert_eq!(record.matches.len(), 2);
        assert_eq!(record.matches[0].opponent, "Spurs");
        assert_eq!(record.report.future, 2);
        assert_eq!(record.home.played, 1);
        assert_eq!(record.away.played, 1);
    }

    #[test]
    fn test_deduplicates_and_merges() {
        let mut partial = RawMatchEntry::new("2024-03-01", "Chelsea").competition("Premier League");
        partial.goals_for = RawNumber::Int(2);
        let full = RawMatchEntry::new("2024-03-01", " chelsea ")
            .competition("premier league")
            .score(2, 1)
            .venue("home");
        let cup = RawMatchEntry::new("2024-03-01", "Chelsea").competition("FA Cup").score(0, 1);

        let entries = vec![partial, full, cup];
        let record = Normalizer::new(as_of()).normalize_team("Arsenal", "Premier League", Some(&entries));

        assert_eq!(record.matches.len(), 2);
        assert_eq!(record.report.duplicates, 1);
        let league_match = &record.matches[0];
        assert_eq!(league_match.score(), Some((2, 1)));
        assert_eq!(league_match.venue, Venue::Home);
    }

    #[test]
    fn test_unknown_goals_are_flagged_not_zero() {
        let mut entry = RawMatchEntry::new("2024-03-01", "Chelsea");
        entry.goals_for = RawNumber::Text("n/a".to_string());
        entry.goals_against = RawNumber::Int(1);

        let record = Normalizer::new(as_of()).normalize_team("Arsenal", "Premier League", Some(&[entry]));

        assert_eq!(record.matches[0].goals_for, None);
        assert_eq!(record.matches[0].goals_against, Some(1));
        assert_eq!(record.report.unknown_scores, 1);
        assert_eq!(record.overall.played, 1);
        assert_eq!(record.overall.scored, 0);
        assert_eq!(record.overall.goals_against, 0);
    }

    #[test]
    fn test_drops_unusable_entries() {
        let entries = vec![
            RawMatchEntry::new("yesterday", "Chelsea").score(1, 0),
            RawMatchEntry::new("2024-03-01", "  ").score(1, 0),
            RawMatchEntry::new("2024-03-08", "Spurs").score(1, 0),
        ];
        let record = Normalizer::new(as_of()).normalize_team("Arsenal", "Premier League", Some(&entries));
        assert_eq!(record.matches.len(), 1);
        assert_eq!(record.report.dropped, 2);
    }

    #[test]
    fn test_normalize_league() {
        let mut history = LeagueHistory::new();
        history.insert(
            "Arsenal".to_string(),
            vec![RawMatchEntry::new("2024-03-01", "Chelsea").score(1, 0)],
        );
        history.insert(
            "Chelsea".to_string(),
            vec![RawMatchEntry::new("2024-03-01", "Arsenal").score(0, 1)],
        );

        let league = Normalizer::new(as_of()).normalize_league("Premier League", &history);
        assert_eq!(league.records.len(), 2);
        assert_eq!(league.get("arsenal").unwrap().overall.wins, 1);
        assert!(league.record_or_empty("Spurs").data_unavailable);
    }
}
