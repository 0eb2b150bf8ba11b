//! Confidence score and key-factor explanation for a prediction.
//!
//! The score is the sum of three independently computed terms, each with
//! its own bounded range, clamped to the global floor and ceiling:
//!
//! * base data quality (70 to 95 by default): which inputs were available
//! * consistency (-5 to +10): model vs market, and direction of the signals
//! * differential strength (0 to 15): how decisive the statistical gaps are
//!
//! Ranges and point values come from `ConfidenceConfig`.
//!
//! None of the terms reads another's output.

use serde::Serialize;
use std::cmp::Ordering;

use crate::config::ConfidenceConfig;
use crate::constants::*;
use crate::market::MarketConsensus;
use crate::projector::{Projection, TeamSide};
use crate::rating::TeamRating;

/// Everything the scorer may look at.
#[derive(Clone, Copy, Debug)]
pub struct ConfidenceInputs<'a> {
    pub projection: &'a Projection,
    pub home: &'a TeamRating,
    pub away: &'a TeamRating,
    pub market: Option<&'a MarketConsensus>,
    pub has_situational_data: bool,
}

/// A named contribution, in points.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Factor {
    pub label: String,
    pub points: f64,
}

impl Factor {
    fn new(label: impl Into<String>, points: f64) -> Self {
        Factor {
            label: label.into(),
            points,
        }
    }
}

/// One confidence term and the factors behind it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Term {
    pub value: f64,
    pub factors: Vec<Factor>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfidenceScore {
    pub value: f64,
    pub base: f64,
    pub consistency: f64,
    pub differential: f64,
    pub key_factors: Vec<String>,
}

fn bounded(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        lo
    } else {
        value.clamp(lo, hi)
    }
}

/// Which team a difference favors, ignoring gaps inside the deadband.
fn direction(home_minus_away: f64, deadband: f64) -> Option<TeamSide> {
    if !home_minus_away.is_finite() || home_minus_away.abs() < deadband {
        None
    } else if home_minus_away > 0.0 {
        Some(TeamSide::Home)
    } else {
        Some(TeamSide::Away)
    }
}

fn both(home: Option<f64>, away: Option<f64>) -> Option<f64> {
    Some(home? - away?)
}

/// Data completeness. Absent inputs withhold points; nothing subtracts.
///
/// # Arguments
/// * `inputs` - Projection, ratings and market consensus for the game
/// * `config` - Range the term is clamped into
///
/// # Returns
/// The term value, starting from `base_min`, and one factor per awarded
/// input plus a single "Limited data" factor for everything withheld
pub fn base_data_quality(inputs: &ConfidenceInputs<'_>, config: &ConfidenceConfig) -> Term {
    let mut value = config.base_min;
    let mut factors = Vec::new();
    let mut missing = Vec::new();
    let mut withheld = 0.0;

    let mut award = |present: bool, points: f64, label: &str, absent: &str| {
        if present {
            value += points;
            factors.push(Factor::new(label, points));
        } else {
            withheld += points;
            missing.push(absent.to_string());
        }
    };

    let market = inputs.market;
    award(
        market.map_or(false, |m| m.spread.is_some()),
        QUALITY_POINTS_MARKET_SPREAD,
        "Market spread available",
        "no market spread",
    );
    award(
        market.map_or(false, |m| m.total.is_some()),
        QUALITY_POINTS_MARKET_TOTAL,
        "Market total available",
        "no market total",
    );
    let books = market.map_or(0, |m| m.books);
    award(
        books >= 2,
        QUALITY_POINTS_TWO_BOOKS,
        "Multiple sportsbooks quoted",
        "single or no sportsbook",
    );
    award(
        books >= 3,
        QUALITY_POINTS_THREE_BOOKS,
        "Three or more sportsbooks quoted",
        "fewer than three sportsbooks",
    );

    let efficiency = [inputs.home, inputs.away]
        .iter()
        .filter(|r| r.has_core_efficiency)
        .count();
    award(
        efficiency >= 1,
        QUALITY_POINTS_EFFICIENCY_ONE,
        "Efficiency data available",
        "no efficiency data",
    );
    award(
        efficiency == 2,
        QUALITY_POINTS_EFFICIENCY_BOTH,
        "Efficiency data for both teams",
        "efficiency data for one team only",
    );
    award(
        inputs.home.composite_rating.is_some() && inputs.away.composite_rating.is_some(),
        QUALITY_POINTS_EXTERNAL_RATINGS,
        "External ratings for both teams",
        "external ratings incomplete",
    );
    award(
        inputs.has_situational_data,
        QUALITY_POINTS_WEATHER,
        "Weather data available",
        "no weather data",
    );

    if withheld > 0.0 {
        factors.push(Factor::new(format!("Limited data: {}", missing.join(", ")), -withheld));
    }

    Term {
        value: bounded(value, config.base_min, config.base_max),
        factors,
    }
}

/// Agreement with the market and between the statistical signals.
///
/// Divergence from the market costs only a little, since divergence is also
/// where the betting edges come from.
pub fn consistency_factor(inputs: &ConfidenceInputs<'_>, config: &ConfidenceConfig) -> Term {
    let mut value = 0.0;
    let mut factors = Vec::new();
    let model = inputs.projection.spread;

    if let Some(market) = inputs.market.and_then(|m| m.spread) {
        let gap = (model.value() - market.value()).abs();
        let band = config
            .market_agreement_bands
            .iter()
            .position(|edge| gap <= *edge)
            .unwrap_or(config.market_agreement_bands.len());
        let points = config.market_agreement_points[band];
        let label = if points > 0.0 {
            format!("Model within {gap:.1} pts of market")
        } else {
            format!("Model diverges from market by {gap:.1} pts")
        };
        value += points;
        factors.push(Factor::new(label, points));
    }

    if let Some(favored) = model.favored() {
        let signals = [
            (
                "Efficiency edge",
                Some(inputs.home.efficiency_rating - inputs.away.efficiency_rating),
            ),
            ("Talent edge", both(inputs.home.talent_rating, inputs.away.talent_rating)),
        ];
        for (name, diff) in signals {
            match diff.and_then(|d| direction(d, config.direction_deadband)) {
                Some(side) if side == favored => {
                    let points = config.signal_agree_points;
                    value += points;
                    factors.push(Factor::new(format!("{name} agrees with spread"), points));
                }
                Some(_) => {
                    let points = config.signal_contradict_points;
                    value += points;
                    factors.push(Factor::new(format!("{name} contradicts spread"), points));
                }
                None => {}
            }
        }
    }

    Term {
        value: bounded(value, config.consistency_min, config.consistency_max),
        factors,
    }
}

/// Size of the statistical gaps and how many indicators point the same way.
pub fn differential_strength(inputs: &ConfidenceInputs<'_>, config: &ConfidenceConfig) -> Term {
    let (home, away) = (inputs.home, inputs.away);
    let mut value = 0.0;
    let mut factors = Vec::new();

    let efficiency_gap = (home.efficiency_rating - away.efficiency_rating).abs();
    if efficiency_gap.is_finite() {
        let points = (efficiency_gap / config.efficiency_gap_divisor).min(config.efficiency_gap_cap);
        if points > 0.0 {
            value += points;
            factors.push(Factor::new(format!("Efficiency gap {efficiency_gap:.1} pts"), points));
        }
    }

    if let Some(gap) = both(home.talent_rating, away.talent_rating).map(f64::abs) {
        if gap.is_finite() {
            let points = (gap / config.talent_gap_divisor).min(config.talent_gap_cap);
            if points > 0.0 {
                value += points;
                factors.push(Factor::new(format!("Talent gap {gap:.1} pts"), points));
            }
        }
    }

    let indicators = [
        Some(home.power_rating - away.power_rating),
        Some(home.efficiency_rating - away.efficiency_rating),
        both(home.composite_rating, away.composite_rating),
        both(home.talent_rating, away.talent_rating),
        both(home.record_rating, away.record_rating),
    ];
    let directions: Vec<TeamSide> = indicators
        .iter()
        .filter_map(|d| d.and_then(|d| direction(d, config.direction_deadband)))
        .collect();
    let for_home = directions.iter().filter(|s| **s == TeamSide::Home).count();
    let for_away = directions.len() - for_home;
    let (agreeing, dissenting, side) = if for_home >= for_away {
        (for_home, for_away, TeamSide::Home)
    } else {
        (for_away, for_home, TeamSide::Away)
    };
    if dissenting == 0 && agreeing >= 2 {
        let points = if agreeing >= 3 {
            config.agreement_bonus_strong
        } else {
            config.agreement_bonus
        };
        let team = match side {
            TeamSide::Home => &home.team,
            TeamSide::Away => &away.team,
        };
        value += points;
        factors.push(Factor::new(format!("{agreeing} indicators favor {team}"), points));
    }

    Term {
        value: bounded(value, config.differential_min, config.differential_max),
        factors,
    }
}

/// Factors describing where the projected margin came from.
fn margin_factors(inputs: &ConfidenceInputs<'_>) -> Vec<Factor> {
    let c = &inputs.projection.components;
    let mut factors = Vec::new();
    if c.rating != 0.0 {
        let team = if c.rating > 0.0 {
            &inputs.home.team
        } else {
            &inputs.away.team
        };
        factors.push(Factor::new(format!("Power rating edge: {team}"), c.rating.abs()));
    }
    if c.home_field != 0.0 {
        factors.push(Factor::new("Home field advantage", c.home_field));
    }
    if c.rest != 0.0 {
        factors.push(Factor::new("Rest advantage", c.rest));
    }
    if c.conference != 0.0 {
        factors.push(Factor::new("Conference game", c.conference));
    }
    factors
}

/// Score a projection. Always within the configured floor and ceiling.
pub fn score_confidence(inputs: &ConfidenceInputs<'_>, config: &ConfidenceConfig) -> ConfidenceScore {
    let base = base_data_quality(inputs, config);
    let consistency = consistency_factor(inputs, config);
    let differential = differential_strength(inputs, config);

    let value = bounded(
        base.value + consistency.value + differential.value,
        config.floor,
        config.ceiling,
    );

    let mut factors: Vec<Factor> = margin_factors(inputs);
    factors.extend(base.factors);
    factors.extend(consistency.factors);
    factors.extend(differential.factors);
    factors.retain(|f| f.points.is_finite());
    factors.sort_by(|a, b| {
        b.points
            .abs()
            .partial_cmp(&a.points.abs())
            .unwrap_or(Ordering::Equal)
    });

    let key_factors = factors
        .into_iter()
        .take(config.max_key_factors)
        .map(|f| format!("{} ({:+.1})", f.label, f.points))
        .collect();

    ConfidenceScore {
        value,
        base: base.value,
        consistency: consistency.value,
        differential: differential.value,
        key_factors,
    }
}
