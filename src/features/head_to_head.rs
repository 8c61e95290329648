//! Head-to-head features with exponential recency decay
//!
//! A meeting `age` days older than the newest retained meeting carries weight
//! `0.5^(age / half_life)`. Measuring from the newest meeting rather than the query
//! date keeps the newest weight at 1, so a long gap since the teams last met cannot
//! underflow every weight to zero.

use chrono::NaiveDate;
use std::collections::HashSet;

use crate::data::record::{Outcome, TeamRecord};
use crate::features::league::LeagueAverages;

/// A past meeting seen from the query's home team
#[derive(Debug, Clone, Copy, PartialEq)]
struct Meeting {
    date: NaiveDate,
    home_goals: u8,
    away_goals: u8,
}

/// Recency-weighted head-to-head summary
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadToHead {
    /// Scored meetings considered
    pub matches: usize,
    pub home_wins: usize,
    pub draws: usize,
    pub away_wins: usize,
    pub home_win_rate: f32,
    pub draw_rate: f32,
    pub away_win_rate: f32,
    pub avg_goals: f32,
    pub btts_rate: f32,
    pub over_line_rate: f32,
}

impl HeadToHead {
    pub const DIM: usize = 8;

    /// Neutral summary when the teams have never met
    pub fn no_history(avg: &LeagueAverages) -> Self {
        HeadToHead {
            matches: 0,
            home_wins: 0,
            draws: 0,
            away_wins: 0,
            home_win_rate: 1.0 / 3.0,
            draw_rate: 1.0 / 3.0,
            away_win_rate: 1.0 / 3.0,
            avg_goals: 2.0 * avg.goals,
            btts_rate: 0.5,
            over_line_rate: 0.5,
        }
    }

    /// Combine both teams' views of their meetings
    ///
    /// The home record is authoritative; the away record only adds meetings on dates
    /// the home record lacks.
    pub fn compute(
        home: &TeamRecord,
        away: &TeamRecord,
        as_of: NaiveDate,
        half_life_days: f32,
        max_matches: usize,
        line: f32,
        avg: &LeagueAverages,
    ) -> Self {
        let mut meetings: Vec<Meeting> = Vec::new();
        let mut seen: HashSet<NaiveDate> = HashSet::new();

        for m in home.meetings_with(&away.team) {
            seen.insert(m.date);
            if let Some((gf, ga)) = m.score() {
                meetings.push(Meeting {
                    date: m.date,
                    home_goals: gf,
                    away_goals: ga,
                });
            }
        }
        for m in away.meetings_with(&home.team) {
            if seen.contains(&m.date) {
                continue;
            }
            if let Some((gf, ga)) = m.score() {
                meetings.push(Meeting {
                    date: m.date,
                    home_goals: ga,
                    away_goals: gf,
                });
            }
        }

        // Most recent first, then keep the newest `max_matches`
        meetings.sort_by(|a, b| b.date.cmp(&a.date));
        meetings.truncate(max_matches);

        if meetings.is_empty() {
            return Self::no_history(avg);
        }

        let mut summary = HeadToHead {
            matches: meetings.len(),
            home_wins: 0,
            draws: 0,
            away_wins: 0,
            home_win_rate: 0.0,
            draw_rate: 0.0,
            away_win_rate: 0.0,
            avg_goals: 0.0,
            btts_rate: 0.0,
            over_line_rate: 0.0,
        };

        let newest_age = (as_of - meetings[0].date).num_days();
        let mut total_weight = 0.0f64;
        let (mut home_w, mut draw_w, mut away_w) = (0.0f64, 0.0f64, 0.0f64);
        let (mut goals_w, mut btts_w, mut over_w) = (0.0f64, 0.0f64, 0.0f64);

        for m in &meetings {
            let age = (as_of - m.date).num_days() - newest_age;
            let weight = decay_weight(age, half_life_days);
            total_weight += weight;

            match outcome(m.home_goals, m.away_goals) {
                Outcome::Win => {
                    summary.home_wins += 1;
                    home_w += weight;
                }
                Outcome::Draw => {
                    summary.draws += 1;
                    draw_w += weight;
                }
                Outcome::Loss => {
                    summary.away_wins += 1;
                    away_w += weight;
                }
            }

            let total = m.home_goals as f64 + m.away_goals as f64;
            goals_w += weight * total;
            if m.home_goals > 0 && m.away_goals > 0 {
                btts_w += weight;
            }
            if total > line as f64 {
                over_w += weight;
            }
        }

        if !total_weight.is_finite() || total_weight <= 0.0 {
            log::warn!(
                "Head-to-head weights degenerate ({}), treating {} v {} as unmet",
                total_weight,
                home.team,
                away.team
            );
            return Self::no_history(avg);
        }

        summary.home_win_rate = (home_w / total_weight) as f32;
        summary.draw_rate = (draw_w / total_weight) as f32;
        summary.away_win_rate = (away_w / total_weight) as f32;
        summary.avg_goals = (goals_w / total_weight) as f32;
        summary.btts_rate = (btts_w / total_weight) as f32;
        summary.over_line_rate = (over_w / total_weight) as f32;
        summary
    }

    /// Positive when the home team has the better of recent meetings
    pub fn dominance(&self) -> f32 {
        self.home_win_rate - self.away_win_rate
    }

    pub fn to_vec(&self) -> Vec<f32> {
        vec![
            self.matches as f32,
            self.home_win_rate,
            self.draw_rate,
            self.away_win_rate,
            self.avg_goals,
            self.btts_rate,
            self.over_line_rate,
            self.dominance(),
        ]
    }
}

/// Weight of a result `age_days` old; future-dated ages count as fresh
///
/// A half-life that is not a positive number disables decay.
pub fn decay_weight(age_days: i64, half_life_days: f32) -> f64 {
    if !half_life_days.is_finite() || half_life_days <= 0.0 {
        return 1.0;
    }
    let age = age_days.max(0) as f64;
    (-std::f64::consts::LN_2 * age / half_life_days as f64).exp()
}

fn outcome(home_goals: u8, away_goals: u8) -> Outcome {
    match home_goals.cmp(&away_goals) {
        std::cmp::Ordering::Greater => Outcome::Win,
        std::cmp::Ordering::Equal => Outcome::Draw,
        std::cmp::Ordering::Less => Outcome::Loss,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::record::MatchResult;
    use crate::Venue;

    fn meeting(date: NaiveDate, opponent: &str, gf: u8, ga: u8) -> MatchResult {
        MatchResult {
            date,
            opponent: opponent.to_string(),
            competition: Some("Premier League".to_string()),
            venue: Venue::Unknown,
            goals_for: Some(gf),
            goals_against: Some(ga),
        }
    }

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    #[test]
    fn test_decay_weight() {
        assert!((decay_weight(0, 365.0) - 1.0).abs() < 1e-12);
        assert!((decay_weight(365, 365.0) - 0.5).abs() < 1e-12);
        assert!((decay_weight(730, 365.0) - 0.25).abs() < 1e-12);
        assert_eq!(decay_weight(-5, 365.0), 1.0);
        assert_eq!(decay_weight(100, f32::NAN), 1.0);
    }

    #[test]
    fn test_short_half_life_on_old_meetings_stays_finite() {
        // 0.5^(1583 / 1) underflows to zero when measured from the query date
        let long_ago = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let query = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let home = TeamRecord::new(
            "Arsenal",
            "Premier League",
            vec![meeting(long_ago, "Chelsea", 2, 1)],
        );
        let away = TeamRecord::empty("Chelsea", "Premier League");
        let h2h = HeadToHead::compute(&home, &away, query, 1.0, 10, 2.5, &LeagueAverages::FALLBACK);

        assert_eq!(h2h.matches, 1);
        assert!(h2h.to_vec().iter().all(|v| v.is_finite()));
        assert_eq!(h2h.home_win_rate, 1.0);
        assert!((h2h.avg_goals - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_weights_relative_to_newest_meeting() {
        // Two meetings a year apart, both long before the query
        let newer = NaiveDate::from_ymd_opt(2019, 6, 1).unwrap();
        let older = NaiveDate::from_ymd_opt(2018, 6, 1).unwrap();
        let home = TeamRecord::new(
            "Arsenal",
            "Premier League",
            vec![meeting(older, "Chelsea", 0, 1), meeting(newer, "Chelsea", 1, 0)],
        );
        let away = TeamRecord::empty("Chelsea", "Premier League");
        let h2h = HeadToHead::compute(&home, &away, as_of(), 365.0, 10, 2.5, &LeagueAverages::FALLBACK);

        // Weights 1 and 0.5 (365 days apart)
        assert!((h2h.home_win_rate - 2.0 / 3.0).abs() < 1e-6);
        assert!((h2h.away_win_rate - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_meetings() {
        let home = TeamRecord::empty("Arsenal", "Premier League");
        let away = TeamRecord::empty("Chelsea", "Premier League");
        let h2h = HeadToHead::compute(&home, &away, as_of(), 365.0, 10, 2.5, &LeagueAverages::FALLBACK);

        assert_eq!(h2h.matches, 0);
        assert!((h2h.home_win_rate - 1.0 / 3.0).abs() < 1e-6);
        assert!((h2h.avg_goals - 2.7).abs() < 1e-6);
        assert_eq!(h2h.dominance(), 0.0);
    }

    #[test]
    fn test_recent_meetings_weigh_more() {
        let recent = as_of() - chrono::Duration::days(1);
        let old = as_of() - chrono::Duration::days(730);
        let home = TeamRecord::new(
            "Arsenal",
            "Premier League",
            vec![meeting(old, "Chelsea", 0, 3), meeting(recent, "Chelsea", 2, 1)],
        );
        let away = TeamRecord::empty("Chelsea", "Premier League");
        let h2h = HeadToHead::compute(&home, &away, as_of(), 365.0, 10, 2.5, &LeagueAverages::FALLBACK);

        assert_eq!(h2h.matches, 2);
        assert_eq!((h2h.home_wins, h2h.away_wins), (1, 1));
        assert!(h2h.home_win_rate > 0.75);
        assert!(h2h.dominance() > 0.5);
        assert!((h2h.home_win_rate + h2h.draw_rate + h2h.away_win_rate - 1.0).abs() < 1e-6);
        // Both meetings had 3 goals
        assert!((h2h.avg_goals - 3.0).abs() < 1e-5);
        assert!((h2h.over_line_rate - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_away_record_fills_gaps_without_double_counting() {
        let d1 = as_of() - chrono::Duration::days(30);
        let d2 = as_of() - chrono::Duration::days(60);
        let home = TeamRecord::new("Arsenal", "Premier League", vec![meeting(d1, "Chelsea", 1, 1)]);
        let away = TeamRecord::new(
            "Chelsea",
            "Premier League",
            vec![meeting(d2, "arsenal", 2, 0), meeting(d1, "Arsenal", 1, 1)],
        );
        let h2h = HeadToHead::compute(&home, &away, as_of(), 365.0, 10, 2.5, &LeagueAverages::FALLBACK);

        assert_eq!(h2h.matches, 2);
        assert_eq!(h2h.draws, 1);
        assert_eq!(h2h.away_wins, 1);
        assert!(h2h.btts_rate > 0.0);
    }

    #[test]
    fn test_max_matches_keeps_newest() {
        let matches: Vec<_> = (1..=5)
            .map(|i| meeting(as_of() - chrono::Duration::days(i * 10), "Chelsea", 1, 0))
            .chain(std::iter::once(meeting(
                as_of() - chrono::Duration::days(400),
                "Chelsea",
                0,
                5,
            )))
            .collect();
        let home = TeamRecord::new("Arsenal", "Premier League", matches);
        let away = TeamRecord::empty("Chelsea", "Premier League");
        let h2h = HeadToHead::compute(&home, &away, as_of(), 365.0, 5, 2.5, &LeagueAverages::FALLBACK);

        assert_eq!(h2h.matches, 5);
        assert_eq!(h2h.home_win_rate, 1.0);
        assert_eq!(h2h.to_vec().len(), HeadToHead::DIM);
    }
}
