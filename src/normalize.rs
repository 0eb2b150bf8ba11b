//! Raw season statistics to bounded 0-100 sub-metrics.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::constants::*;
use crate::team::TeamSeasonStats;

/// One normalized sub-metric. Higher is always better for the team.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    OffensiveEfficiency,
    OffensiveSuccessRate,
    OffensiveExplosiveness,
    PassingEfficiency,
    RushingEfficiency,
    ThirdDownConversion,
    OffensivePointsPerOpportunity,
    OffensiveFieldPosition,
    TimeOfPossession,
    DefensiveEfficiency,
    DefensiveSuccessRate,
    DefensiveExplosiveness,
    DefensivePointsPerOpportunity,
    Havoc,
    DefensiveFieldPosition,
    SpecialTeams,
    Penalties,
    TurnoverMargin,
}

impl Metric {
    pub const ALL: [Metric; 18] = [
        Metric::OffensiveEfficiency,
        Metric::OffensiveSuccessRate,
        Metric::OffensiveExplosiveness,
        Metric::PassingEfficiency,
        Metric::RushingEfficiency,
        Metric::ThirdDownConversion,
        Metric::OffensivePointsPerOpportunity,
        Metric::OffensiveFieldPosition,
        Metric::TimeOfPossession,
        Metric::DefensiveEfficiency,
        Metric::DefensiveSuccessRate,
        Metric::DefensiveExplosiveness,
        Metric::DefensivePointsPerOpportunity,
        Metric::Havoc,
        Metric::DefensiveFieldPosition,
        Metric::SpecialTeams,
        Metric::Penalties,
        Metric::TurnoverMargin,
    ];

    pub const OFFENSE: [Metric; 8] = [
        Metric::OffensiveEfficiency,
        Metric::OffensiveSuccessRate,
        Metric::OffensiveExplosiveness,
        Metric::PassingEfficiency,
        Metric::RushingEfficiency,
        Metric::ThirdDownConversion,
        Metric::OffensivePointsPerOpportunity,
        Metric::OffensiveFieldPosition,
    ];

    pub const DEFENSE: [Metric; 6] = [
        Metric::DefensiveEfficiency,
        Metric::DefensiveSuccessRate,
        Metric::DefensiveExplosiveness,
        Metric::DefensivePointsPerOpportunity,
        Metric::Havoc,
        Metric::DefensiveFieldPosition,
    ];

    pub const TEAM: [Metric; 4] = [
        Metric::SpecialTeams,
        Metric::Penalties,
        Metric::TurnoverMargin,
        Metric::TimeOfPossession,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::OffensiveEfficiency => "offensive_efficiency",
            Metric::OffensiveSuccessRate => "offensive_success_rate",
            Metric::OffensiveExplosiveness => "offensive_explosiveness",
            Metric::PassingEfficiency => "passing_efficiency",
            Metric::RushingEfficiency => "rushing_efficiency",
            Metric::ThirdDownConversion => "third_down_conversion",
            Metric::OffensivePointsPerOpportunity => "offensive_points_per_opportunity",
            Metric::OffensiveFieldPosition => "offensive_field_position",
            Metric::TimeOfPossession => "time_of_possession",
            Metric::DefensiveEfficiency => "defensive_efficiency",
            Metric::DefensiveSuccessRate => "defensive_success_rate",
            Metric::DefensiveExplosiveness => "defensive_explosiveness",
            Metric::DefensivePointsPerOpportunity => "defensive_points_per_opportunity",
            Metric::Havoc => "havoc",
            Metric::DefensiveFieldPosition => "defensive_field_position",
            Metric::SpecialTeams => "special_teams",
            Metric::Penalties => "penalties",
            Metric::TurnoverMargin => "turnover_margin",
        }
    }
}

/// Bounded sub-metrics for one team.
///
/// Every `Metric` has a value in `[METRIC_MIN, METRIC_MAX]`. Metrics that
/// fell back to a neutral default for at least one raw input are listed in
/// `defaulted`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NormalizedMetrics {
    pub team: String,
    values: BTreeMap<Metric, f64>,
    pub defaulted: BTreeSet<Metric>,
}

impl NormalizedMetrics {
    pub fn get(&self, metric: Metric) -> f64 {
        self.values.get(&metric).copied().unwrap_or(METRIC_MID)
    }

    pub fn iter(&self) -> impl Iterator<Item = (Metric, f64)> + '_ {
        self.values.iter().map(|(m, v)| (*m, *v))
    }

    pub fn is_defaulted(&self, metric: Metric) -> bool {
        self.defaulted.contains(&metric)
    }

    /// Mean of the offensive metrics
    pub fn offense_index(&self) -> f64 {
        self.mean_of(&Metric::OFFENSE)
    }

    /// Mean of the defensive metrics
    pub fn defense_index(&self) -> f64 {
        self.mean_of(&Metric::DEFENSE)
    }

    pub fn team_index(&self) -> f64 {
        self.mean_of(&Metric::TEAM)
    }

    /// True if the per-play efficiency metrics came from real data.
    pub fn has_core_efficiency(&self) -> bool {
        !self.is_defaulted(Metric::OffensiveEfficiency)
            && !self.is_defaulted(Metric::DefensiveEfficiency)
    }

    fn mean_of(&self, metrics: &[Metric]) -> f64 {
        metrics.iter().map(|m| self.get(*m)).sum::<f64>() / metrics.len() as f64
    }
}

/// Tracks which raw inputs fell back to defaults while normalizing.
struct Normalizer<'a> {
    team: &'a str,
    values: BTreeMap<Metric, f64>,
    defaulted: BTreeSet<Metric>,
}

impl<'a> Normalizer<'a> {
    fn value(&mut self, metric: Metric, field: &str, raw: Option<f64>, default: f64) -> f64 {
        match raw.filter(|v| v.is_finite()) {
            Some(v) => v,
            None => self.missing(metric, field, default),
        }
    }

    /// `num / max(den, RATIO_FLOOR)`, or `default` if either side is missing.
    fn ratio(
        &mut self,
        metric: Metric,
        field: &str,
        num: Option<f64>,
        den: Option<f64>,
        default: f64,
    ) -> f64 {
        match (num.filter(|v| v.is_finite()), den.filter(|v| v.is_finite())) {
            (Some(n), Some(d)) => n / d.max(RATIO_FLOOR),
            _ => self.missing(metric, field, default),
        }
    }

    fn missing(&mut self, metric: Metric, field: &str, default: f64) -> f64 {
        debug!(team = self.team, field, default, "missing input, using neutral default");
        self.defaulted.insert(metric);
        default
    }

    fn set(&mut self, metric: Metric, score: f64) {
        self.values.insert(metric, score);
    }
}

/// Map a raw value onto the bounded metric range.
///
/// `baseline` lands on the midpoint; a negative `scale` is used for
/// statistics where lower raw values are better.
pub fn scale_metric(raw: f64, baseline: f64, scale: f64) -> f64 {
    let score = METRIC_MID + (raw - baseline) * scale;
    if score.is_nan() {
        return METRIC_MID;
    }
    score.clamp(METRIC_MIN, METRIC_MAX)
}

/// Normalize one team's raw statistics.
///
/// Never fails: missing or non-finite fields fall back to league-average
/// defaults and zero denominators are floored at one.
pub fn normalize_stats(stats: &TeamSeasonStats) -> NormalizedMetrics {
    let mut n = Normalizer {
        team: &stats.team,
        values: BTreeMap::new(),
        defaulted: BTreeSet::new(),
    };
    use Metric::*;

    let ppa = n.value(OffensiveEfficiency, "offense_ppa", stats.offense_ppa, LEAGUE_PPA);
    n.set(OffensiveEfficiency, scale_metric(ppa, LEAGUE_PPA, PPA_SCALE));
    let ppa = n.value(DefensiveEfficiency, "defense_ppa", stats.defense_ppa, LEAGUE_PPA);
    n.set(DefensiveEfficiency, scale_metric(ppa, LEAGUE_PPA, -PPA_SCALE));

    let sr = n.value(
        OffensiveSuccessRate,
        "offense_success_rate",
        stats.offense_success_rate,
        LEAGUE_SUCCESS_RATE,
    );
    n.set(OffensiveSuccessRate, scale_metric(sr, LEAGUE_SUCCESS_RATE, SUCCESS_RATE_SCALE));
    let sr = n.value(
        DefensiveSuccessRate,
        "defense_success_rate",
        stats.defense_success_rate,
        LEAGUE_SUCCESS_RATE,
    );
    n.set(DefensiveSuccessRate, scale_metric(sr, LEAGUE_SUCCESS_RATE, -SUCCESS_RATE_SCALE));

    let ex = n.value(
        OffensiveExplosiveness,
        "offense_explosiveness",
        stats.offense_explosiveness,
        LEAGUE_EXPLOSIVENESS,
    );
    n.set(OffensiveExplosiveness, scale_metric(ex, LEAGUE_EXPLOSIVENESS, EXPLOSIVENESS_SCALE));
    let ex = n.value(
        DefensiveExplosiveness,
        "defense_explosiveness",
        stats.defense_explosiveness,
        LEAGUE_EXPLOSIVENESS,
    );
    n.set(DefensiveExplosiveness, scale_metric(ex, LEAGUE_EXPLOSIVENESS, -EXPLOSIVENESS_SCALE));

    let ppo = n.value(
        OffensivePointsPerOpportunity,
        "offense_points_per_opportunity",
        stats.offense_points_per_opportunity,
        LEAGUE_POINTS_PER_OPPORTUNITY,
    );
    n.set(
        OffensivePointsPerOpportunity,
        scale_metric(ppo, LEAGUE_POINTS_PER_OPPORTUNITY, POINTS_PER_OPPORTUNITY_SCALE),
    );
    let ppo = n.value(
        DefensivePointsPerOpportunity,
        "defense_points_per_opportunity",
        stats.defense_points_per_opportunity,
        LEAGUE_POINTS_PER_OPPORTUNITY,
    );
    n.set(
        DefensivePointsPerOpportunity,
        scale_metric(ppo, LEAGUE_POINTS_PER_OPPORTUNITY, -POINTS_PER_OPPORTUNITY_SCALE),
    );

    let comp = n.ratio(
        PassingEfficiency,
        "pass_completions",
        stats.pass_completions,
        stats.pass_attempts,
        LEAGUE_COMPLETION_PCT,
    );
    let ypa = n.ratio(
        PassingEfficiency,
        "passing_yards",
        stats.passing_yards,
        stats.pass_attempts,
        LEAGUE_YARDS_PER_ATTEMPT,
    );
    n.set(
        PassingEfficiency,
        (scale_metric(comp, LEAGUE_COMPLETION_PCT, COMPLETION_SCALE)
            + scale_metric(ypa, LEAGUE_YARDS_PER_ATTEMPT, YARDS_PER_ATTEMPT_SCALE))
            / 2.0,
    );

    let ypc = n.ratio(
        RushingEfficiency,
        "rushing_yards",
        stats.rushing_yards,
        stats.rush_attempts,
        LEAGUE_YARDS_PER_CARRY,
    );
    n.set(RushingEfficiency, scale_metric(ypc, LEAGUE_YARDS_PER_CARRY, YARDS_PER_CARRY_SCALE));

    let third = n.ratio(
        ThirdDownConversion,
        "third_down_conversions",
        stats.third_down_conversions,
        stats.third_downs,
        LEAGUE_THIRD_DOWN_PCT,
    );
    n.set(ThirdDownConversion, scale_metric(third, LEAGUE_THIRD_DOWN_PCT, THIRD_DOWN_SCALE));

    let start = n.value(
        OffensiveFieldPosition,
        "offense_field_position",
        stats.offense_field_position,
        LEAGUE_FIELD_POSITION,
    );
    n.set(OffensiveFieldPosition, scale_metric(start, LEAGUE_FIELD_POSITION, FIELD_POSITION_SCALE));
    let start = n.value(
        DefensiveFieldPosition,
        "defense_field_position",
        stats.defense_field_position,
        LEAGUE_FIELD_POSITION,
    );
    n.set(
        DefensiveFieldPosition,
        scale_metric(start, LEAGUE_FIELD_POSITION, -FIELD_POSITION_SCALE),
    );

    let havoc = match stats.defense_havoc_rate.filter(|v| v.is_finite()) {
        Some(rate) => rate,
        None => n.ratio(
            Havoc,
            "havoc_events",
            stats.havoc_events,
            stats.defensive_plays,
            LEAGUE_HAVOC_RATE,
        ),
    };
    n.set(Havoc, scale_metric(havoc, LEAGUE_HAVOC_RATE, HAVOC_SCALE));

    let kr = n.ratio(
        SpecialTeams,
        "kick_return_yards",
        stats.kick_return_yards,
        stats.kick_returns,
        LEAGUE_KICK_RETURN_AVG,
    );
    let pr = n.ratio(
        SpecialTeams,
        "punt_return_yards",
        stats.punt_return_yards,
        stats.punt_returns,
        LEAGUE_PUNT_RETURN_AVG,
    );
    n.set(
        SpecialTeams,
        (scale_metric(kr, LEAGUE_KICK_RETURN_AVG, KICK_RETURN_SCALE)
            + scale_metric(pr, LEAGUE_PUNT_RETURN_AVG, PUNT_RETURN_SCALE))
            / 2.0,
    );

    let pen = n.ratio(
        Penalties,
        "penalty_yards",
        stats.penalty_yards,
        stats.games,
        LEAGUE_PENALTY_YARDS_PER_GAME,
    );
    n.set(Penalties, scale_metric(pen, LEAGUE_PENALTY_YARDS_PER_GAME, -PENALTY_SCALE));

    let margin = match (
        stats.takeaways.filter(|v| v.is_finite()),
        stats.turnovers.filter(|v| v.is_finite()),
    ) {
        (Some(take), Some(give)) => n.ratio(
            TurnoverMargin,
            "games",
            Some(take - give),
            stats.games,
            0.0,
        ),
        _ => n.missing(TurnoverMargin, "takeaways/turnovers", 0.0),
    };
    n.set(TurnoverMargin, scale_metric(margin, 0.0, TURNOVER_MARGIN_SCALE));

    let top = n.ratio(
        TimeOfPossession,
        "possession_time",
        stats.possession_time.map(|secs| secs / 60.0),
        stats.games,
        LEAGUE_POSSESSION_MINUTES,
    );
    n.set(TimeOfPossession, scale_metric(top, LEAGUE_POSSESSION_MINUTES, POSSESSION_SCALE));

    NormalizedMetrics {
        team: stats.team.clone(),
        values: n.values,
        defaulted: n.defaulted,
    }
}
