//! Rest and schedule features
//!
//! Days since each team last played and how crowded their recent calendar was.

use chrono::NaiveDate;

use crate::data::record::TeamRecord;

/// Rest assumed when a team has no prior match
pub const DEFAULT_REST_DAYS: i64 = 7;

/// Schedule features for a fixture
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleFeatures {
    /// Days rest for home team (normalized: 0=1 day, 1=14+ days)
    pub home_rest_days: f32,
    /// Days rest for away team (normalized)
    pub away_rest_days: f32,
    /// Rest advantage: home_rest - away_rest (normalized -1 to 1)
    pub rest_advantage: f32,
    /// Matches in the congestion window for home team (normalized 0-1)
    pub home_congestion: f32,
    pub away_congestion: f32,
    /// 1.0 if the home team last played at most `short_turnaround_days` before the fixture
    pub home_short_turnaround: f32,
    pub away_short_turnaround: f32,
}

impl ScheduleFeatures {
    pub const DIM: usize = 7;

    pub fn compute(
        home: &TeamRecord,
        away: &TeamRecord,
        as_of: NaiveDate,
        congestion_window_days: i64,
        short_turnaround_days: i64,
    ) -> Self {
        let home_rest = days_since_last_match(home, as_of);
        let away_rest = days_since_last_match(away, as_of);

        let rest_diff = home_rest.unwrap_or(DEFAULT_REST_DAYS) as f32
            - away_rest.unwrap_or(DEFAULT_REST_DAYS) as f32;

        let short = |rest: Option<i64>| {
            if rest.map_or(false, |d| d <= short_turnaround_days) {
                1.0
            } else {
                0.0
            }
        };

        ScheduleFeatures {
            home_rest_days: normalize_rest_days(home_rest),
            away_rest_days: normalize_rest_days(away_rest),
            rest_advantage: (rest_diff / 7.0).clamp(-1.0, 1.0),
            home_congestion: match_density(home, as_of, congestion_window_days),
            away_congestion: match_density(away, as_of, congestion_window_days),
            home_short_turnaround: short(home_rest),
            away_short_turnaround: short(away_rest),
        }
    }

    pub fn to_vec(&self) -> Vec<f32> {
        vec![
            self.home_rest_days,
            self.away_rest_days,
            self.rest_advantage,
            self.home_congestion,
            self.away_congestion,
            self.home_short_turnaround,
            self.away_short_turnaround,
        ]
    }
}

/// Days between the team's last match and the query date
pub fn days_since_last_match(record: &TeamRecord, as_of: NaiveDate) -> Option<i64> {
    record.last_match_date().map(|d| (as_of - d).num_days())
}

/// Normalize: 0 = 1 day (minimum), 1 = 14+ days; unknown counts as a normal week
fn normalize_rest_days(days: Option<i64>) -> f32 {
    let days = days.unwrap_or(DEFAULT_REST_DAYS);
    ((days as f32 - 1.0) / 13.0).clamp(0.0, 1.0)
}

/// Matches in the `days` before `as_of`, 4 or more = 1.0
fn match_density(record: &TeamRecord, as_of: NaiveDate, days: i64) -> f32 {
    let count = record
        .matches
        .iter()
        .filter(|m| {
            let diff = (as_of - m.date).num_days();
            diff > 0 && diff <= days
        })
        .count();
    (count as f32 / 4.0).min(1.0)
}
