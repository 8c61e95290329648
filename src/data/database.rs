//! SQLite-backed statistics store
//!
//! Raw entries are stored as received; goal fields keep their original JSON shape
//! so the normalizer sees exactly what the collaborator delivered.

use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use crate::data::normalizer::parse_date;
use crate::data::raw::{RawMatchEntry, RawNumber};
use crate::data::store::{StatisticsStore, StoreSnapshot};
use crate::{name_key, FootballError, Result};

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL UNIQUE,
                name_key TEXT NOT NULL UNIQUE,
                league TEXT NOT NULL,
                league_key TEXT NOT NULL,
                aliases TEXT DEFAULT '[]'
            );

            CREATE TABLE IF NOT EXISTS history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                team_id INTEGER NOT NULL REFERENCES teams(id),
                date TEXT NOT NULL,
                opponent TEXT NOT NULL,
                competition TEXT NOT NULL DEFAULT '',
                goals_for TEXT,
                goals_against TEXT,
                venue TEXT,
                UNIQUE(team_id, date, opponent, competition)
            );

            CREATE INDEX IF NOT EXISTS idx_history_team ON history(team_id, date);
            CREATE INDEX IF NOT EXISTS idx_teams_league ON teams(league_key);
            "#,
        )?;
        Ok(())
    }

    // ==================== Team Operations ====================

    /// Get or create a team, returning its row id
    pub fn get_or_create_team(&self, name: &str, league: &str) -> Result<i64> {
        if let Some(id) = self.find_team_id(name)? {
            return Ok(id);
        }

        self.conn.execute(
            "INSERT INTO teams (name, name_key, league, league_key, aliases) VALUES (?1, ?2, ?3, ?4, '[]')",
            params![name, name_key(name), league, name_key(league)],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Find a team by name or alias
    fn find_team_id(&self, name: &str) -> Result<Option<i64>> {
        let key = name_key(name);
        let id: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM teams WHERE name_key = ?1",
                params![&key],
                |row| row.get(0),
            )
            .optional()?;
        if id.is_some() {
            return Ok(id);
        }

        let mut stmt = self.conn.prepare("SELECT id, aliases FROM teams")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (id, aliases_json) in rows {
            let aliases: Vec<String> = serde_json::from_str(&aliases_json).unwrap_or_default();
            if aliases.iter().any(|a| name_key(a) == key) {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    fn team_name(&self, id: i64) -> Result<String> {
        Ok(self
            .conn
            .query_row("SELECT name FROM teams WHERE id = ?1", params![id], |row| row.get(0))?)
    }

    /// Add an alias for a team
    pub fn add_team_alias(&self, team: &str, alias: &str) -> Result<()> {
        let id = self
            .find_team_id(team)?
            .ok_or_else(|| FootballError::InvalidRequest(format!("Unknown team: {}", team)))?;

        let aliases_json: String = self.conn.query_row(
            "SELECT aliases FROM teams WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?;
        let mut aliases: Vec<String> = serde_json::from_str(&aliases_json).unwrap_or_default();
        if !aliases.iter().any(|a| name_key(a) == name_key(alias)) {
            aliases.push(alias.to_string());
            self.conn.execute(
                "UPDATE teams SET aliases = ?1 WHERE id = ?2",
                params![serde_json::to_string(&aliases)?, id],
            )?;
        }
        Ok(())
    }

    // ==================== History Operations ====================

    /// Insert a raw entry; returns false when an identical match is already stored
    pub fn insert_entry(&self, team_id: i64, entry: &RawMatchEntry) -> Result<bool> {
        let inserted = self.conn.execute(
            r#"
            INSERT OR IGNORE INTO history (team_id, date, opponent, competition,
                                           goals_for, goals_against, venue)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                team_id,
                entry.date,
                entry.opponent,
                entry.competition.clone().unwrap_or_default(),
                encode_number(&entry.goals_for)?,
                encode_number(&entry.goals_against)?,
                entry.venue,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Import a snapshot, returning the number of new history rows
    pub fn import_snapshot(&self, snapshot: &StoreSnapshot) -> Result<usize> {
        let mut count = 0;
        for team in &snapshot.teams {
            let id = self.get_or_create_team(&team.name, &team.league)?;
            for alias in &team.aliases {
                self.add_team_alias(&team.name, alias)?;
            }
            for entry in &team.history {
                if self.insert_entry(id, entry)? {
                    count += 1;
                }
            }
        }
        log::info!("Imported {} history rows for {} teams", count, snapshot.teams.len());
        Ok(count)
    }

    fn history_for(&self, team_id: i64) -> Result<Vec<RawMatchEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT date, opponent, competition, goals_for, goals_against, venue
             FROM history
             WHERE team_id = ?1
             ORDER BY date, id",
        )?;

        let rows = stmt
            .query_map(params![team_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(date, opponent, competition, gf, ga, venue)| {
                Ok(RawMatchEntry {
                    date,
                    opponent,
                    competition: if competition.is_empty() { None } else { Some(competition) },
                    goals_for: decode_number(gf)?,
                    goals_against: decode_number(ga)?,
                    venue,
                })
            })
            .collect()
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let team_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM teams", [], |row| row.get(0))?;

        let entry_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM history", [], |row| row.get(0))?;

        let league_count: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT league_key) FROM teams",
            [],
            |row| row.get(0),
        )?;

        // Dates are stored raw, so the range is computed after parsing
        let mut stmt = self.conn.prepare("SELECT date FROM history")?;
        let dates: Vec<NaiveDate> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .filter_map(|d| d.ok())
            .filter_map(|d| parse_date(&d))
            .collect();

        Ok(DatabaseStats {
            team_count: team_count as usize,
            league_count: league_count as usize,
            entry_count: entry_count as usize,
            earliest_match: dates.iter().min().copied(),
            latest_match: dates.iter().max().copied(),
        })
    }
}

fn encode_number(value: &RawNumber) -> Result<Option<String>> {
    if value.is_missing() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(value)?))
    }
}

fn decode_number(value: Option<String>) -> Result<RawNumber> {
    match value {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Ok(RawNumber::Missing),
    }
}

impl StatisticsStore for Database {
    fn league_teams(&self, league: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM teams WHERE league_key = ?1 ORDER BY name")?;
        let teams = stmt
            .query_map(params![name_key(league)], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(teams)
    }

    fn team_history(&self, team: &str) -> Result<Option<Vec<RawMatchEntry>>> {
        match self.find_team_id(team)? {
            Some(id) => Ok(Some(self.history_for(id)?)),
            None => Ok(None),
        }
    }

    fn resolve_team(&self, name: &str) -> Result<Option<String>> {
        match self.find_team_id(name)? {
            Some(id) => Ok(Some(self.team_name(id)?)),
            None => Ok(None),
        }
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub team_count: usize,
    pub league_count: usize,
    pub entry_count: usize,
    pub earliest_match: Option<NaiveDate>,
    pub latest_match: Option<NaiveDate>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::store::TeamSnapshot;

    fn snapshot() -> StoreSnapshot {
        let mut loose = RawMatchEntry::new("08/03/2024", "Spurs").competition("Premier League");
        loose.goals_for = RawNumber::Text("3".to_string());
        loose.goals_against = RawNumber::Float(1.0);

        StoreSnapshot {
            teams: vec![
                TeamSnapshot {
                    name: "Arsenal".to_string(),
                    league: "Premier League".to_string(),
                    aliases: vec!["The Gunners".to_string()],
                    history: vec![
                        RawMatchEntry::new("2024-03-01", "Chelsea")
                            .competition("Premier League")
                            .score(2, 1)
                            .venue("H"),
                        loose,
                    ],
                },
                TeamSnapshot {
                    name: "Chelsea".to_string(),
                    league: "Premier League".to_string(),
                    aliases: Vec::new(),
                    history: vec![RawMatchEntry::new("2024-03-01", "Arsenal").score(1, 2)],
                },
            ],
        }
    }

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.team_count, 0);
        assert_eq!(stats.entry_count, 0);
    }

    #[test]
    fn test_create_team() {
        let db = Database::in_memory().unwrap();
        let id = db.get_or_create_team("Arsenal", "Premier League").unwrap();

        // Getting again should return same team
        let id2 = db.get_or_create_team("arsenal", "Premier League").unwrap();
        assert_eq!(id, id2);
    }

    #[test]
    fn test_import_is_idempotent() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.import_snapshot(&snapshot()).unwrap(), 3);
        assert_eq!(db.import_snapshot(&snapshot()).unwrap(), 0);

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.team_count, 2);
        assert_eq!(stats.league_count, 1);
        assert_eq!(stats.entry_count, 3);
        assert_eq!(stats.earliest_match, NaiveDate::from_ymd_opt(2024, 3, 1));
        assert_eq!(stats.latest_match, NaiveDate::from_ymd_opt(2024, 3, 8));
    }

    #[test]
    fn test_history_preserves_raw_shapes() {
        let db = Database::in_memory().unwrap();
        db.import_snapshot(&snapshot()).unwrap();

        let history = db.team_history("the gunners").unwrap().unwrap();
        assert_eq!(history.len(), 2);
        let loose = history.iter().find(|e| e.opponent == "Spurs").unwrap();
        assert_eq!(loose.goals_for, RawNumber::Text("3".to_string()));
        assert_eq!(loose.goals_against.as_goals(), Some(1));
        assert_eq!(loose.venue, None);

        assert_eq!(db.team_history("Everton").unwrap(), None);
    }

    #[test]
    fn test_league_teams() {
        let db = Database::in_memory().unwrap();
        db.import_snapshot(&snapshot()).unwrap();
        assert_eq!(
            db.league_teams("premier league").unwrap(),
            vec!["Arsenal".to_string(), "Chelsea".to_string()]
        );
        assert_eq!(db.resolve_team("The Gunners").unwrap(), Some("Arsenal".to_string()));
    }
}
