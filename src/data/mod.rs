//! Data access and normalization
//!
//! Raw histories come from a `StatisticsStore` (in memory or SQLite) and are turned
//! into canonical `TeamRecord`s by the `Normalizer`.

pub mod database;
pub mod normalizer;
pub mod raw;
pub mod record;
pub mod store;

pub use database::Database;
pub use normalizer::{NormalizedLeague, Normalizer};
pub use raw::{LeagueHistory, RawMatchEntry, RawNumber};
pub use record::{MatchResult, Outcome, SplitStats, TeamRecord};
pub use store::{gather_history, GatheredHistory, MemoryStore, StatisticsStore, StoreSnapshot};
