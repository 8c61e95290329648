//! Raw match entries as supplied by the data collaborator
//!
//! Fields arrive loosely typed (numbers as strings, floats for goal counts, nulls).
//! `RawMatchEntry` makes required and optional fields explicit; the normalizer is the
//! only place these values are interpreted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A numeric field of unknown shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    #[default]
    Missing,
    Int(i64),
    Float(f64),
    Text(String),
}

impl RawNumber {
    /// Interpret as a goal count, `None` when unknown or nonsensical
    pub fn as_goals(&self) -> Option<u8> {
        let value = match self {
            RawNumber::Missing => return None,
            RawNumber::Int(v) => *v as f64,
            RawNumber::Float(v) => *v,
            RawNumber::Text(s) => {
                let s = s.trim();
                if s.is_empty() || s == "-" {
                    return None;
                }
                s.parse::<f64>().ok()?
            }
        };

        if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u8::MAX as f64 {
            return None;
        }
        Some(value as u8)
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, RawNumber::Missing)
    }
}

impl From<u8> for RawNumber {
    fn from(v: u8) -> Self {
        RawNumber::Int(v as i64)
    }
}

impl From<Option<u8>> for RawNumber {
    fn from(v: Option<u8>) -> Self {
        v.map(RawNumber::from).unwrap_or_default()
    }
}

/// One historical match from a single team's point of view
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMatchEntry {
    /// Match date; ISO (`2024-03-01`), RFC 3339 or `dd/mm/yyyy`
    pub date: String,
    pub opponent: String,
    #[serde(default)]
    pub competition: Option<String>,
    #[serde(default)]
    pub goals_for: RawNumber,
    #[serde(default)]
    pub goals_against: RawNumber,
    /// `home`, `away`, `neutral` or their initials
    #[serde(default)]
    pub venue: Option<String>,
}

impl RawMatchEntry {
    pub fn new(date: &str, opponent: &str) -> Self {
        RawMatchEntry {
            date: date.to_string(),
            opponent: opponent.to_string(),
            competition: None,
            goals_for: RawNumber::Missing,
            goals_against: RawNumber::Missing,
            venue: None,
        }
    }

    pub fn competition(mut self, competition: &str) -> Self {
        self.competition = Some(competition.to_string());
        self
    }

    pub fn score(mut self, goals_for: u8, goals_against: u8) -> Self {
        self.goals_for = goals_for.into();
        self.goals_against = goals_against.into();
        self
    }

    pub fn venue(mut self, venue: &str) -> Self {
        self.venue = Some(venue.to_string());
        self
    }
}

/// Raw histories keyed by team name
pub type LeagueHistory = HashMap<String, Vec<RawMatchEntry>>;
