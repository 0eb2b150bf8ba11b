//! Aggregation of normalized metrics and external ratings into one power
//! rating per team.
//!
//! All sub-ratings are expressed in points relative to an average team, so
//! they can be blended linearly and the result read directly as points of
//! margin against an average opponent.

use serde::Serialize;
use tracing::debug;

use crate::config::AggregationConfig;
use crate::constants::*;
use crate::normalize::NormalizedMetrics;
use crate::team::{CoachingVsRanked, ExternalRatings};

/// Sources that can contribute to a power rating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingSource {
    Efficiency,
    Composite,
    Record,
    Talent,
    Coaching,
}

impl RatingSource {
    pub fn name(&self) -> &'static str {
        match self {
            RatingSource::Efficiency => "efficiency",
            RatingSource::Composite => "composite",
            RatingSource::Record => "strength of record",
            RatingSource::Talent => "talent",
            RatingSource::Coaching => "coaching vs ranked",
        }
    }
}

/// Aggregated rating for one team. Replaced wholesale on every refresh.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TeamRating {
    pub team: String,
    /// Weighted blend of every available source
    pub power_rating: f64,
    /// Derived from normalized statistics; always present
    pub efficiency_rating: f64,
    /// Mean of ELO, FPI and SP+ overall, where present
    pub composite_rating: Option<f64>,
    /// SRS
    pub record_rating: Option<f64>,
    pub talent_rating: Option<f64>,
    pub coaching_rating: Option<f64>,
    /// Points scored above average
    pub offense_rating: f64,
    /// Points prevented relative to average; positive is better
    pub defense_rating: f64,
    /// Sources that contributed to `power_rating`
    pub sources: Vec<RatingSource>,
    /// Both per-play efficiency inputs came from real data
    pub has_core_efficiency: bool,
}

impl TeamRating {
    /// An exactly average team with no external inputs.
    pub fn neutral(team: &str) -> Self {
        TeamRating {
            team: team.to_string(),
            power_rating: NEUTRAL_RATING,
            efficiency_rating: NEUTRAL_RATING,
            composite_rating: None,
            record_rating: None,
            talent_rating: None,
            coaching_rating: None,
            offense_rating: NEUTRAL_RATING,
            defense_rating: NEUTRAL_RATING,
            sources: vec![RatingSource::Efficiency],
            has_core_efficiency: false,
        }
    }
}

fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}

/// Points-scale rating from the normalized statistics alone.
pub fn efficiency_rating(metrics: &NormalizedMetrics) -> f64 {
    ((metrics.offense_index() - METRIC_MID)
        + (metrics.defense_index() - METRIC_MID)
        + TEAM_INDEX_WEIGHT * (metrics.team_index() - METRIC_MID))
        * METRIC_POINTS_SCALE
}

/// Mean of the composite systems present, each converted to points.
pub fn composite_rating(external: &ExternalRatings) -> Option<f64> {
    let parts: Vec<f64> = [
        finite(external.elo).map(|elo| (elo - ELO_BASELINE) / ELO_POINTS_PER_RATING),
        finite(external.fpi),
        finite(external.sp_overall),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.iter().sum::<f64>() / parts.len() as f64)
    }
}

pub fn talent_rating(external: &ExternalRatings) -> Option<f64> {
    finite(external.talent).map(|t| (t - TALENT_BASELINE) / TALENT_POINTS_PER_RATING)
}

/// Coaching sub-rating from the record against ranked opponents.
///
/// Small samples are shrunk toward a neutral record so a single upset does
/// not swing the rating.
///
/// # Arguments
/// * `record` - The coach's wins and losses against ranked opponents
/// * `full_sample` - Ranked games at which the record counts in full
///
/// # Returns
/// Rating points above an average coach, or `None` with no ranked games
pub fn coaching_rating(record: &CoachingVsRanked, full_sample: f64) -> Option<f64> {
    let pct = record.tier_adjusted_win_pct()?;
    let w = (record.games() as f64 / full_sample).clamp(0.0, 1.0);
    let shrunk = (1.0 - w) * COACHING_NEUTRAL_PCT + w * pct;
    Some((shrunk - COACHING_NEUTRAL_PCT) * COACHING_SCALE)
}

/// Build a team's rating from its normalized metrics and whatever external
/// inputs exist.
///
/// Absent sources are dropped and the remaining weights re-normalized, so
/// the power rating stays on the same points scale however many sources
/// contributed.
pub fn aggregate_rating(
    metrics: &NormalizedMetrics,
    external: Option<&ExternalRatings>,
    coaching: Option<&CoachingVsRanked>,
    config: &AggregationConfig,
) -> TeamRating {
    let efficiency = efficiency_rating(metrics);
    let composite = external.and_then(composite_rating);
    let record = external.and_then(|e| finite(e.srs));
    let talent = external.and_then(talent_rating);
    let coach = coaching.and_then(|c| coaching_rating(c, config.coaching_full_sample));

    let candidates = [
        (RatingSource::Efficiency, Some(efficiency), config.efficiency_weight),
        (RatingSource::Composite, composite, config.composite_weight),
        (RatingSource::Record, record, config.record_weight),
        (RatingSource::Talent, talent, config.talent_weight),
        (RatingSource::Coaching, coach, config.coaching_weight),
    ];

    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    let mut sources = Vec::new();
    for (source, value, weight) in candidates {
        match value {
            Some(v) if weight > 0.0 => {
                weighted += v * weight;
                total_weight += weight;
                sources.push(source);
            }
            Some(_) => {}
            None => debug!(team = %metrics.team, source = source.name(), "rating source absent"),
        }
    }
    let power_rating = if total_weight > 0.0 {
        weighted / total_weight
    } else {
        NEUTRAL_RATING
    };

    let stats_offense = (metrics.offense_index() - METRIC_MID) * METRIC_POINTS_SCALE;
    let stats_defense = (metrics.defense_index() - METRIC_MID) * METRIC_POINTS_SCALE;
    let blend = config.sp_unit_blend;
    let offense_rating = match external.and_then(|e| finite(e.sp_offense)) {
        Some(sp) => (1.0 - blend) * stats_offense + blend * (sp - SP_UNIT_BASELINE),
        None => stats_offense,
    };
    let defense_rating = match external.and_then(|e| finite(e.sp_defense)) {
        Some(sp) => (1.0 - blend) * stats_defense + blend * (SP_UNIT_BASELINE - sp),
        None => stats_defense,
    };

    TeamRating {
        team: metrics.team.clone(),
        power_rating,
        efficiency_rating: efficiency,
        composite_rating: composite,
        record_rating: record,
        talent_rating: talent,
        coaching_rating: coach,
        offense_rating,
        defense_rating,
        sources,
        has_core_efficiency: metrics.has_core_efficiency(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_stats;
    use crate::team::{RankTier, TeamSeasonStats, TierRecord};

    fn neutral_metrics(team: &str) -> NormalizedMetrics {
        normalize_stats(&TeamSeasonStats::new(team, 2024))
    }

    #[test]
    fn test_neutral_inputs_give_zero_rating() {
        let rating = aggregate_rating(
            &neutral_metrics("Avg"),
            None,
            None,
            &AggregationConfig::default(),
        );
        assert!(rating.power_rating.abs() < 1e-9);
        assert_eq!(rating.sources, vec![RatingSource::Efficiency]);
    }

    #[test]
    fn test_composite_averages_systems() {
        let external = ExternalRatings {
            elo: Some(1750.0), // 10 points
            fpi: Some(14.0),
            sp_overall: Some(18.0),
            ..Default::default()
        };
        assert!((composite_rating(&external).unwrap() - 14.0).abs() < 1e-9);
        assert_eq!(composite_rating(&ExternalRatings::default()), None);
    }

    #[test]
    fn test_missing_sources_renormalize_weights() {
        // Every present source agrees on +10, so the blend must be +10
        // regardless of which sources are absent.
        let external = ExternalRatings {
            fpi: Some(10.0),
            srs: Some(10.0),
            ..Default::default()
        };
        let config = AggregationConfig {
            efficiency_weight: 1e-9,
            ..Default::default()
        };
        let rating = aggregate_rating(&neutral_metrics("A"), Some(&external), None, &config);
        assert!((rating.power_rating - 10.0).abs() < 1e-6);
        assert_eq!(rating.talent_rating, None);
        assert!(!rating.sources.contains(&RatingSource::Talent));
    }

    #[test]
    fn test_full_weighting() {
        let external = ExternalRatings {
            sp_overall: Some(20.0),
            srs: Some(10.0),
            talent: Some(950.0), // 10 points
            ..Default::default()
        };
        let rating = aggregate_rating(
            &neutral_metrics("A"),
            Some(&external),
            None,
            &AggregationConfig::default(),
        );
        let expected = (0.35 * 20.0 + 0.15 * 10.0 + 0.10 * 10.0) / (0.30 + 0.35 + 0.15 + 0.10);
        assert!((rating.power_rating - expected).abs() < 1e-9);
    }

    #[test]
    fn test_coaching_rating_shrinks_small_samples() {
        let one_upset = CoachingVsRanked {
            coach: "New".to_string(),
            records: vec![TierRecord { tier: RankTier::Top25, wins: 1, losses: 0 }],
        };
        let veteran = CoachingVsRanked {
            coach: "Veteran".to_string(),
            records: vec![TierRecord { tier: RankTier::Top25, wins: 10, losses: 0 }],
        };
        let small = coaching_rating(&one_upset, COACHING_FULL_SAMPLE).unwrap();
        let large = coaching_rating(&veteran, COACHING_FULL_SAMPLE).unwrap();
        assert!(small > 0.0 && small < large, "One upset should count for less than ten wins");
        let unshrunk = (TIER_MULTIPLIER_TOP25 / TIER_MULTIPLIER_MAX - COACHING_NEUTRAL_PCT) * COACHING_SCALE;
        assert!((large - unshrunk).abs() < 1e-9);
        assert_eq!(coaching_rating(&CoachingVsRanked::default(), COACHING_FULL_SAMPLE), None);
    }

    #[test]
    fn test_coaching_enters_power_rating() {
        let external = ExternalRatings {
            sp_overall: Some(10.0),
            ..Default::default()
        };
        let veteran = CoachingVsRanked {
            coach: "Veteran".to_string(),
            records: vec![TierRecord { tier: RankTier::Top5, wins: 10, losses: 0 }],
        };
        let config = AggregationConfig::default();
        let rating = aggregate_rating(&neutral_metrics("A"), Some(&external), Some(&veteran), &config);

        let coach = coaching_rating(&veteran, config.coaching_full_sample).unwrap();
        assert!((coach - 0.5 * COACHING_SCALE).abs() < 1e-9);
        assert_eq!(rating.coaching_rating, Some(coach));
        assert!(rating.sources.contains(&RatingSource::Coaching));

        // Efficiency is neutral (0), so only composite and coaching move the blend
        let expected = (WEIGHT_COMPOSITE * 10.0 + WEIGHT_COACHING * coach)
            / (WEIGHT_EFFICIENCY + WEIGHT_COMPOSITE + WEIGHT_COACHING);
        assert!(
            (rating.power_rating - expected).abs() < 1e-9,
            "Coaching should be blended at its configured weight"
        );
    }

    #[test]
    fn test_absent_coaching_weight_is_redistributed() {
        // Every present source agrees on +8, so dropping coaching must not
        // pull the rating toward zero.
        let external = ExternalRatings {
            sp_overall: Some(8.0),
            srs: Some(8.0),
            ..Default::default()
        };
        let config = AggregationConfig {
            efficiency_weight: 1e-9,
            ..Default::default()
        };
        let no_games = CoachingVsRanked {
            coach: "Rookie".to_string(),
            records: vec![],
        };
        let without = aggregate_rating(&neutral_metrics("A"), Some(&external), None, &config);
        let empty = aggregate_rating(&neutral_metrics("A"), Some(&external), Some(&no_games), &config);
        for rating in [&without, &empty] {
            assert!((rating.power_rating - 8.0).abs() < 1e-6);
            assert_eq!(rating.coaching_rating, None);
            assert!(!rating.sources.contains(&RatingSource::Coaching));
        }
    }

    #[test]
    fn test_sp_units_blend_into_offense_and_defense() {
        let external = ExternalRatings {
            sp_offense: Some(38.0),
            sp_defense: Some(18.0),
            ..Default::default()
        };
        let rating = aggregate_rating(
            &neutral_metrics("A"),
            Some(&external),
            None,
            &AggregationConfig::default(),
        );
        assert!((rating.offense_rating - 5.0).abs() < 1e-9);
        assert!((rating.defense_rating - 5.0).abs() < 1e-9);
    }
}
