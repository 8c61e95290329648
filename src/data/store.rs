//! Read-only statistics store interface
//!
//! The store is the data collaborator's side of the boundary: it hands out raw,
//! untrusted match histories. Failures here never abort a prediction; the affected
//! team is reported as unavailable and predicted from an empty record.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::data::raw::{LeagueHistory, RawMatchEntry};
use crate::{name_key, FootballError, Result};

/// Source of raw match histories
pub trait StatisticsStore {
    /// Canonical names of every team registered in a league
    fn league_teams(&self, league: &str) -> Result<Vec<String>>;

    /// Raw history for a team; `Ok(None)` when the store does not know the team
    fn team_history(&self, team: &str) -> Result<Option<Vec<RawMatchEntry>>>;

    /// Resolve a name or alias to the store's canonical team name
    fn resolve_team(&self, name: &str) -> Result<Option<String>> {
        Ok(Some(name.to_string()))
    }
}

/// A team and its raw history, as exchanged in JSON snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSnapshot {
    pub name: String,
    pub league: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub history: Vec<RawMatchEntry>,
}

/// File format accepted by `MemoryStore::load` and `Database::import_snapshot`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub teams: Vec<TeamSnapshot>,
}

impl StoreSnapshot {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// In-memory store, mainly for fixtures and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    teams: HashMap<String, TeamSnapshot>,
    aliases: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: StoreSnapshot) -> Self {
        let mut store = Self::new();
        for team in snapshot.teams {
            store.insert(team);
        }
        store
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::from_snapshot(StoreSnapshot::load(path)?))
    }

    pub fn insert(&mut self, team: TeamSnapshot) {
        let key = name_key(&team.name);
        for alias in &team.aliases {
            self.aliases.insert(name_key(alias), key.clone());
        }
        self.teams.insert(key, team);
    }

    /// Register a team with its history
    pub fn add_team(&mut self, name: &str, league: &str, history: Vec<RawMatchEntry>) {
        self.insert(TeamSnapshot {
            name: name.to_string(),
            league: league.to_string(),
            aliases: Vec::new(),
            history,
        });
    }

    fn lookup(&self, name: &str) -> Option<&TeamSnapshot> {
        let key = name_key(name);
        self.teams
            .get(&key)
            .or_else(|| self.aliases.get(&key).and_then(|k| self.teams.get(k)))
    }
}

impl StatisticsStore for MemoryStore {
    fn league_teams(&self, league: &str) -> Result<Vec<String>> {
        let key = name_key(league);
        let mut teams: Vec<String> = self
            .teams
            .values()
            .filter(|t| name_key(&t.league) == key)
            .map(|t| t.name.clone())
            .collect();
        teams.sort();
        Ok(teams)
    }

    fn team_history(&self, team: &str) -> Result<Option<Vec<RawMatchEntry>>> {
        Ok(self.lookup(team).map(|t| t.history.clone()))
    }

    fn resolve_team(&self, name: &str) -> Result<Option<String>> {
        Ok(self.lookup(name).map(|t| t.name.clone()))
    }
}

/// Raw histories for a fixture plus the teams the store could not serve
#[derive(Debug, Default)]
pub struct GatheredHistory {
    pub history: LeagueHistory,
    /// Teams with no history, with the reason
    pub unavailable: Vec<FootballError>,
}

/// Collect raw histories for both teams and the rest of their league
///
/// Store failures are downgraded to `DataUnavailable` entries; the caller keeps going.
pub fn gather_history<S: StatisticsStore + ?Sized>(
    store: &S,
    home_team: &str,
    away_team: &str,
    league: &str,
) -> GatheredHistory {
    let mut gathered = GatheredHistory::default();

    let mut teams = match store.league_teams(league) {
        Ok(teams) => teams,
        Err(e) => {
            log::warn!("League table for {} unavailable: {}", league, e);
            Vec::new()
        }
    };
    for team in [home_team, away_team] {
        if !teams.iter().any(|t| name_key(t) == name_key(team)) {
            teams.push(team.to_string());
        }
    }

    for team in teams {
        match store.team_history(&team) {
            Ok(Some(entries)) => {
                gathered.history.insert(team, entries);
            }
            Ok(None) => {
                log::debug!("Store has no history for {}", team);
                gathered.unavailable.push(FootballError::DataUnavailable {
                    team,
                    reason: "unknown to the statistics store".to_string(),
                });
            }
            Err(e) => {
                log::warn!("History for {} unavailable: {}", team, e);
                gathered.unavailable.push(FootballError::DataUnavailable {
                    team,
                    reason: e.to_string(),
                });
            }
        }
    }

    gathered
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStore;

    impl StatisticsStore for FailingStore {
        fn league_teams(&self, _league: &str) -> Result<Vec<String>> {
            Err(FootballError::Parse("timeout".to_string()))
        }

        fn team_history(&self, team: &str) -> Result<Option<Vec<RawMatchEntry>>> {
            Err(FootballError::DataUnavailable {
                team: team.to_string(),
                reason: "upstream down".to_string(),
            })
        }
    }

    fn store() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert(TeamSnapshot {
            name: "Manchester United".to_string(),
            league: "Premier League".to_string(),
            aliases: vec!["Man Utd".to_string()],
            history: vec![RawMatchEntry::new("2024-03-01", "Chelsea").score(1, 0)],
        });
        store.add_team("Chelsea", "Premier League", Vec::new());
        store.add_team("Barcelona", "La Liga", Vec::new());
        store
    }

    #[test]
    fn test_aliases() {
        let store = store();
        assert_eq!(
            store.resolve_team("man utd").unwrap(),
            Some("Manchester United".to_string())
        );
        assert_eq!(store.team_history("Man Utd").unwrap().unwrap().len(), 1);
        assert_eq!(store.resolve_team("Spurs").unwrap(), None);
    }

    #[test]
    fn test_league_teams() {
        let store = store();
        assert_eq!(
            store.league_teams("premier league").unwrap(),
            vec!["Chelsea".to_string(), "Manchester United".to_string()]
        );
    }

    #[test]
    fn test_gather_marks_unknown_teams() {
        let store = store();
        let gathered = gather_history(&store, "Manchester United", "Spurs", "Premier League");

        assert!(gathered.history.contains_key("Manchester United"));
        assert!(gathered.history.contains_key("Chelsea"));
        assert_eq!(gathered.unavailable.len(), 1);
        assert_eq!(gathered.unavailable[0].kind(), "data_unavailable");
    }

    #[test]
    fn test_gather_survives_failing_store() {
        let gathered = gather_history(&FailingStore, "Arsenal", "Chelsea", "Premier League");
        assert!(gathered.history.is_empty());
        assert_eq!(gathered.unavailable.len(), 2);
    }

    #[test]
    fn test_snapshot_json() {
        let json = r#"{"teams": [{"name": "Arsenal", "league": "Premier League",
            "history": [{"date": "2024-03-01", "opponent": "Chelsea", "goals_for": 2, "goals_against": 2}]}]}"#;
        let snapshot: StoreSnapshot = serde_json::from_str(json).unwrap();
        let store = MemoryStore::from_snapshot(snapshot);
        assert_eq!(store.team_history("Arsenal").unwrap().unwrap().len(), 1);
    }
}
