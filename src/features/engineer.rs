//! Feature engineering
//!
//! Builds the full feature set for one fixture from the two team records and the
//! rest of the league. Every family falls back to league averages, so the output is
//! always a complete vector of `FEATURE_COUNT` finite values.

use chrono::{Duration, NaiveDate};

use crate::data::normalizer::NormalizedLeague;
use crate::data::record::{SplitStats, TeamRecord};
use crate::features::form::FormFeatures;
use crate::features::head_to_head::HeadToHead;
use crate::features::league::{LeagueAverages, LeagueContext, LeagueTable};
use crate::features::matchup::{MatchupFeatures, TrendFeatures};
use crate::features::scaling::FeatureScaling;
use crate::features::schedule::ScheduleFeatures;
use crate::features::schema::FEATURE_COUNT;
use crate::features::team_stats::{SeasonFeatures, VenueFeatures};
use crate::features::vector::FeatureVector;
use crate::FeatureConfig;

/// Weights of the completeness scalar
const FORM_COMPLETENESS_WEIGHT: f32 = 0.4;
const H2H_COMPLETENESS_WEIGHT: f32 = 0.2;
/// Meetings needed for full head-to-head completeness
const H2H_FULL_DEPTH: usize = 3;

/// Every feature family for one fixture, before flattening
#[derive(Debug, Clone)]
pub struct FeatureSet {
    pub home_form: FormFeatures,
    pub away_form: FormFeatures,
    pub season: SeasonFeatures,
    pub venue: VenueFeatures,
    pub h2h: HeadToHead,
    pub league: LeagueContext,
    pub matchup: MatchupFeatures,
    pub trend: TrendFeatures,
    pub schedule: ScheduleFeatures,
    pub over_under_line: f32,
    /// Share of the inputs backed by real history, in [0, 1]
    pub completeness: f32,
}

impl FeatureSet {
    /// Flatten in `FeatureId` order
    pub fn to_raw(&self) -> Vec<f32> {
        let mut v = Vec::with_capacity(FEATURE_COUNT);
        v.extend(self.home_form.to_vec());
        v.extend(self.away_form.to_vec());
        v.extend(self.season.to_vec());
        v.extend(self.venue.to_vec());
        v.extend(self.h2h.to_vec());
        v.extend(self.league.to_vec());
        v.extend(self.matchup.to_vec());
        v.extend(self.trend.to_vec());
        v.extend(self.schedule.to_vec());
        v.push(self.over_under_line);
        v.push(self.completeness);
        v
    }

    pub fn to_vector(&self, scaling: &FeatureScaling) -> FeatureVector {
        FeatureVector::new(self.to_raw(), scaling)
    }
}

/// Derives feature sets from normalized records
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    config: FeatureConfig,
}

impl FeatureEngineer {
    pub fn new(config: FeatureConfig) -> Self {
        FeatureEngineer { config }
    }


    /// Build the feature set for `home` vs `away`
    ///
    /// `league` supplies the table and league averages; it may or may not contain the
    /// two teams' own records.
    pub fn build(
        &self,
        home: &TeamRecord,
        away: &TeamRecord,
        league: &NormalizedLeague,
        as_of: NaiveDate,
        over_under_line: f32,
    ) -> FeatureSet {
        let cfg = &self.config;
        let season_start = as_of - Duration::days(cfg.table_window_days);

        let averages = LeagueAverages::from_records(&league.records, season_start);
        let table = LeagueTable::build(&league.records, season_start);

        let home_form = FormFeatures::compute(home, cfg.form_window, &averages);
        let away_form = FormFeatures::compute(away, cfg.form_window, &averages);

        let season = SeasonFeatures::compute(
            &season_stats(home, season_start),
            &season_stats(away, season_start),
            &averages,
        );
        let venue = VenueFeatures::compute(home, away, &season, &averages);

        let h2h = HeadToHead::compute(
            home,
            away,
            as_of,
            cfg.h2h_half_life_days,
            cfg.h2h_max_matches,
            over_under_line,
            &averages,
        );

        let league_ctx = LeagueContext::compute(
            &table,
            &averages,
            &home.team,
            &away.team,
            &season.home,
            &season.away,
        );
        let matchup = MatchupFeatures::compute(&home_form, &away_form, &season, &venue, over_under_line);
        let trend = TrendFeatures::compute(&home_form, &away_form, &season);
        let schedule = ScheduleFeatures::compute(
            home,
            away,
            as_of,
            cfg.congestion_window_days,
            cfg.short_turnaround_days,
        );

        let completeness = self.completeness(home_form.depth(), away_form.depth(), h2h.matches);

        log::debug!(
            "{} vs {}: form depth {}/{}, h2h {}, league sample {}, completeness {:.3}",
            home.team,
            away.team,
            home_form.depth(),
            away_form.depth(),
            h2h.matches,
            averages.sample,
            completeness
        );

        FeatureSet {
            home_form,
            away_form,
            season,
            venue,
            h2h,
            league: league_ctx,
            matchup,
            trend,
            schedule,
            over_under_line,
            completeness,
        }
    }

    /// Completeness from form depth on both sides and head-to-head depth
    pub fn completeness(&self, home_depth: usize, away_depth: usize, h2h_depth: usize) -> f32 {
        let window = self.config.form_window.max(1);
        let form = |depth: usize| depth.min(window) as f32 / window as f32;
        let h2h = h2h_depth.min(H2H_FULL_DEPTH) as f32 / H2H_FULL_DEPTH as f32;

        (FORM_COMPLETENESS_WEIGHT * form(home_depth)
            + FORM_COMPLETENESS_WEIGHT * form(away_depth)
            + H2H_COMPLETENESS_WEIGHT * h2h)
            .clamp(0.0, 1.0)
    }
}

impl Default for FeatureEngineer {
    fn default() -> Self {
        Self::new(FeatureConfig::default())
    }
}

fn season_stats(record: &TeamRecord, since: NaiveDate) -> SplitStats {
    SplitStats::from_matches(record.matches.iter().filter(|m| m.date >= since))
}
