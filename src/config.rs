use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::constants::*;
use crate::error::{PredictionError, Result};

/// Tunable constants for one pipeline run.
///
/// Every section defaults to the fixed constant table, so a JSON file only
/// needs to name the values it overrides. Nothing in the pipeline writes
/// back to a config; retuning is done by hand from a backtest report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub projection: ProjectionConfig,
    pub aggregation: AggregationConfig,
    pub confidence: ConfidenceConfig,
    pub grading: GradingConfig,
    pub market: MarketConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectionConfig {
    pub points_per_rating_unit: f64,
    pub home_field_advantage: f64,
    pub conference_game_shrink: f64,
    pub rest_points_per_day: f64,
    pub max_rest_advantage_days: f64,
    pub baseline_total: f64,
    pub offense_total_scale: f64,
    pub defense_total_scale: f64,
    pub min_team_score: f64,
    pub margin_stddev: f64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            points_per_rating_unit: POINTS_PER_RATING_UNIT,
            home_field_advantage: HOME_FIELD_ADVANTAGE,
            conference_game_shrink: CONFERENCE_GAME_SHRINK,
            rest_points_per_day: REST_POINTS_PER_DAY,
            max_rest_advantage_days: MAX_REST_ADVANTAGE_DAYS,
            baseline_total: BASELINE_TOTAL,
            offense_total_scale: OFFENSE_TOTAL_SCALE,
            defense_total_scale: DEFENSE_TOTAL_SCALE,
            min_team_score: MIN_TEAM_SCORE,
            margin_stddev: MARGIN_STDDEV,
        }
    }
}

/// Weights of each rating source in the power rating.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub efficiency_weight: f64,
    pub composite_weight: f64,
    pub record_weight: f64,
    pub talent_weight: f64,
    pub coaching_weight: f64,
    pub sp_unit_blend: f64,
    /// Ranked games before a coaching record counts in full
    pub coaching_full_sample: f64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            efficiency_weight: WEIGHT_EFFICIENCY,
            composite_weight: WEIGHT_COMPOSITE,
            record_weight: WEIGHT_RECORD,
            talent_weight: WEIGHT_TALENT,
            coaching_weight: WEIGHT_COACHING,
            sp_unit_blend: SP_UNIT_BLEND,
            coaching_full_sample: COACHING_FULL_SAMPLE,
        }
    }
}

/// Bounds and point values of the three confidence terms.
///
/// The data-quality awards per input stay in the constant table; the range
/// they are clamped into is tunable here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceConfig {
    pub floor: f64,
    pub ceiling: f64,
    pub max_key_factors: usize,

    pub base_min: f64,
    pub base_max: f64,
    pub consistency_min: f64,
    pub consistency_max: f64,
    pub differential_min: f64,
    pub differential_max: f64,

    /// Upper edges of the model-vs-market gap bands
    pub market_agreement_bands: [f64; 4],
    /// Points per band; the last entry applies beyond every edge
    pub market_agreement_points: [f64; 5],
    pub signal_agree_points: f64,
    pub signal_contradict_points: f64,
    pub direction_deadband: f64,

    pub efficiency_gap_divisor: f64,
    pub efficiency_gap_cap: f64,
    pub talent_gap_divisor: f64,
    pub talent_gap_cap: f64,
    pub agreement_bonus_strong: f64,
    pub agreement_bonus: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            floor: CONFIDENCE_FLOOR,
            ceiling: CONFIDENCE_CEILING,
            max_key_factors: MAX_KEY_FACTORS,
            base_min: BASE_QUALITY_MIN,
            base_max: BASE_QUALITY_MAX,
            consistency_min: CONSISTENCY_MIN,
            consistency_max: CONSISTENCY_MAX,
            differential_min: DIFFERENTIAL_MIN,
            differential_max: DIFFERENTIAL_MAX,
            market_agreement_bands: MARKET_AGREEMENT_BANDS,
            market_agreement_points: MARKET_AGREEMENT_POINTS,
            signal_agree_points: SIGNAL_AGREE_POINTS,
            signal_contradict_points: SIGNAL_CONTRADICT_POINTS,
            direction_deadband: DIRECTION_DEADBAND,
            efficiency_gap_divisor: EFFICIENCY_GAP_DIVISOR,
            efficiency_gap_cap: EFFICIENCY_GAP_CAP,
            talent_gap_divisor: TALENT_GAP_DIVISOR,
            talent_gap_cap: TALENT_GAP_CAP,
            agreement_bonus_strong: AGREEMENT_BONUS_STRONG,
            agreement_bonus: AGREEMENT_BONUS,
        }
    }
}

/// Edge-magnitude cutoffs for SLIGHT, GOOD and STRONG, per market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingConfig {
    pub spread_cutoffs: [f64; 3],
    pub total_cutoffs: [f64; 3],
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            spread_cutoffs: SPREAD_EDGE_CUTOFFS,
            total_cutoffs: TOTAL_EDGE_CUTOFFS,
        }
    }
}

/// Sanity limits a sportsbook quote must pass to enter the consensus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub max_spread: f64,
    pub min_total: f64,
    pub max_total: f64,
    pub max_moneyline: f64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            max_spread: MAX_SANE_SPREAD,
            min_total: MIN_SANE_TOTAL,
            max_total: MAX_SANE_TOTAL,
            max_moneyline: MAX_SANE_MONEYLINE,
        }
    }
}

impl ModelConfig {
    /// Parse a (possibly partial) JSON config and validate it.
    pub fn from_json_str(raw: &str) -> Result<Self> {
        let config: ModelConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Check the invariants the pipeline relies on.
    pub fn validate(&self) -> Result<()> {
        let p = &self.projection;
        if !(p.points_per_rating_unit.is_finite() && p.points_per_rating_unit > 0.0) {
            return Err(invalid("points_per_rating_unit must be positive"));
        }
        if !(p.margin_stddev.is_finite() && p.margin_stddev > 0.0) {
            return Err(invalid("margin_stddev must be positive"));
        }
        if !(p.min_team_score.is_finite() && p.min_team_score > 0.0) {
            return Err(invalid("min_team_score must be positive"));
        }
        let finite = [
            p.home_field_advantage,
            p.conference_game_shrink,
            p.rest_points_per_day,
            p.max_rest_advantage_days,
            p.baseline_total,
            p.offense_total_scale,
            p.defense_total_scale,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(invalid("projection constants must be finite"));
        }
        if p.conference_game_shrink < 0.0 || p.max_rest_advantage_days < 0.0 {
            return Err(invalid("conference shrink and rest cap must be non-negative"));
        }

        let a = &self.aggregation;
        let weights = [
            a.efficiency_weight,
            a.composite_weight,
            a.record_weight,
            a.talent_weight,
            a.coaching_weight,
        ];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(invalid("aggregation weights must be finite and non-negative"));
        }
        if a.efficiency_weight <= 0.0 {
            return Err(invalid("efficiency_weight must be positive"));
        }
        if !(0.0..=1.0).contains(&a.sp_unit_blend) {
            return Err(invalid("sp_unit_blend must lie in [0, 1]"));
        }
        if !(a.coaching_full_sample.is_finite() && a.coaching_full_sample > 0.0) {
            return Err(invalid("coaching_full_sample must be positive"));
        }

        let c = &self.confidence;
        for (name, lo, hi) in [
            ("confidence", c.floor, c.ceiling),
            ("base quality", c.base_min, c.base_max),
            ("consistency", c.consistency_min, c.consistency_max),
            ("differential", c.differential_min, c.differential_max),
        ] {
            if !(lo.is_finite() && hi.is_finite() && lo <= hi) {
                return Err(invalid(&format!("{name} lower bound must not exceed upper bound")));
            }
        }
        let bands = &c.market_agreement_bands;
        if bands.iter().any(|b| !b.is_finite() || *b < 0.0) || bands.windows(2).any(|w| w[0] >= w[1]) {
            return Err(invalid("market_agreement_bands must be non-negative and strictly increasing"));
        }
        let points = [
            c.signal_agree_points,
            c.signal_contradict_points,
            c.agreement_bonus_strong,
            c.agreement_bonus,
            c.efficiency_gap_cap,
            c.talent_gap_cap,
        ];
        if points.iter().chain(&c.market_agreement_points).any(|v| !v.is_finite()) {
            return Err(invalid("confidence point values must be finite"));
        }
        if !(c.efficiency_gap_divisor > 0.0 && c.talent_gap_divisor > 0.0) {
            return Err(invalid("gap divisors must be positive"));
        }
        if !(c.direction_deadband.is_finite() && c.direction_deadband >= 0.0) {
            return Err(invalid("direction_deadband must be non-negative"));
        }

        for (name, cutoffs) in [
            ("spread_cutoffs", &self.grading.spread_cutoffs),
            ("total_cutoffs", &self.grading.total_cutoffs),
        ] {
            let increasing = cutoffs[0] > 0.0 && cutoffs[0] < cutoffs[1] && cutoffs[1] < cutoffs[2];
            if !increasing {
                return Err(invalid(&format!("{name} must be positive and strictly increasing")));
            }
        }

        let m = &self.market;
        if !(m.max_spread > 0.0 && m.min_total < m.max_total && m.max_moneyline >= EVEN_MONEYLINE) {
            return Err(invalid("market sanity limits are inconsistent"));
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> PredictionError {
    PredictionError::InvalidConfig(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_matches_constants() {
        let config = ModelConfig::default();
        assert_eq!(config.projection.home_field_advantage, HOME_FIELD_ADVANTAGE);
        assert_eq!(config.grading.spread_cutoffs, SPREAD_EDGE_CUTOFFS);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_overrides_only_named_fields() {
        let config =
            ModelConfig::from_json_str(r#"{"projection": {"home_field_advantage": 3.0}}"#).unwrap();
        assert_eq!(config.projection.home_field_advantage, 3.0);
        assert_eq!(config.projection.margin_stddev, MARGIN_STDDEV);
        assert_eq!(config.aggregation, AggregationConfig::default());
    }

    #[test]
    fn test_rejects_non_increasing_cutoffs() {
        let err = ModelConfig::from_json_str(r#"{"grading": {"spread_cutoffs": [3.0, 2.0, 6.0]}}"#)
            .unwrap_err();
        assert!(matches!(err, PredictionError::InvalidConfig(_)));
    }

    #[test]
    fn test_rejects_inverted_confidence_bounds() {
        let err = ModelConfig::from_json_str(r#"{"confidence": {"floor": 90.0, "ceiling": 60.0}}"#)
            .unwrap_err();
        assert!(matches!(err, PredictionError::InvalidConfig(_)));
    }

    #[test]
    fn test_confidence_terms_are_configurable() {
        let config = ModelConfig::from_json_str(
            r#"{"confidence": {"base_max": 90.0, "market_agreement_points": [8, 4, 1, -1, -2]}}"#,
        )
        .unwrap();
        assert_eq!(config.confidence.base_max, 90.0);
        assert_eq!(config.confidence.market_agreement_points[0], 8.0);
        assert_eq!(
            config.confidence.direction_deadband, DIRECTION_DEADBAND,
            "Fields not named in the file keep their defaults"
        );
    }

    #[test]
    fn test_rejects_unordered_agreement_bands() {
        let err = ModelConfig::from_json_str(
            r#"{"confidence": {"market_agreement_bands": [1.5, 7.0, 3.5, 10.0]}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, PredictionError::InvalidConfig(_)));

        let err = ModelConfig::from_json_str(r#"{"aggregation": {"coaching_full_sample": 0}}"#)
            .unwrap_err();
        assert!(matches!(err, PredictionError::InvalidConfig(_)));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = ModelConfig::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, PredictionError::ConfigParse(_)));
    }
}
