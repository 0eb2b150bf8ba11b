//! Fixed calibration constants.
//!
//! Every neutral default and scale factor used by the pipeline is declared
//! here once. `ModelConfig::default()` is built from this table.

// ---------------------------------------------------------------------------
// Normalized metric range
// ---------------------------------------------------------------------------

/// Lower bound of every normalized metric
pub const METRIC_MIN: f64 = 0.0;

/// Upper bound of every normalized metric
pub const METRIC_MAX: f64 = 100.0;

/// League-typical performance maps here
pub const METRIC_MID: f64 = 50.0;

// ---------------------------------------------------------------------------
// League baselines, also used as neutral defaults for missing raw fields
// ---------------------------------------------------------------------------

/// Predicted points added per play, league average
pub const LEAGUE_PPA: f64 = 0.25;

/// Success rate, league average
pub const LEAGUE_SUCCESS_RATE: f64 = 0.5;

/// Explosiveness (average PPA of successful plays)
pub const LEAGUE_EXPLOSIVENESS: f64 = 1.25;

/// Points per scoring opportunity (drive reaching the opponent 40)
pub const LEAGUE_POINTS_PER_OPPORTUNITY: f64 = 4.0;

/// Havoc rate
pub const LEAGUE_HAVOC_RATE: f64 = 0.16;

/// Average starting field position, yards from own goal line
pub const LEAGUE_FIELD_POSITION: f64 = 29.0;

pub const LEAGUE_COMPLETION_PCT: f64 = 0.60;
pub const LEAGUE_YARDS_PER_ATTEMPT: f64 = 7.0;
pub const LEAGUE_YARDS_PER_CARRY: f64 = 4.5;
pub const LEAGUE_THIRD_DOWN_PCT: f64 = 0.40;
pub const LEAGUE_KICK_RETURN_AVG: f64 = 21.0;
pub const LEAGUE_PUNT_RETURN_AVG: f64 = 8.0;
pub const LEAGUE_PENALTY_YARDS_PER_GAME: f64 = 55.0;

/// Time of possession per game, minutes
pub const LEAGUE_POSSESSION_MINUTES: f64 = 30.0;

/// Denominator floor for every per-attempt and per-game ratio
pub const RATIO_FLOOR: f64 = 1.0;

// ---------------------------------------------------------------------------
// Normalization scales (metric points per raw unit)
// ---------------------------------------------------------------------------

pub const PPA_SCALE: f64 = 100.0;
pub const SUCCESS_RATE_SCALE: f64 = 250.0;
pub const EXPLOSIVENESS_SCALE: f64 = 80.0;
pub const POINTS_PER_OPPORTUNITY_SCALE: f64 = 20.0;
pub const HAVOC_SCALE: f64 = 300.0;
pub const FIELD_POSITION_SCALE: f64 = 5.0;
pub const COMPLETION_SCALE: f64 = 100.0;
pub const YARDS_PER_ATTEMPT_SCALE: f64 = 10.0;
pub const YARDS_PER_CARRY_SCALE: f64 = 15.0;
pub const THIRD_DOWN_SCALE: f64 = 150.0;
pub const KICK_RETURN_SCALE: f64 = 2.0;
pub const PUNT_RETURN_SCALE: f64 = 3.0;
pub const PENALTY_SCALE: f64 = 1.0;
pub const TURNOVER_MARGIN_SCALE: f64 = 25.0;
pub const POSSESSION_SCALE: f64 = 5.0;

// ---------------------------------------------------------------------------
// Rating aggregation
// ---------------------------------------------------------------------------

/// Rating points per normalized metric point above the midpoint
pub const METRIC_POINTS_SCALE: f64 = 0.5;

/// ELO points per rating point
pub const ELO_POINTS_PER_RATING: f64 = 25.0;
pub const ELO_BASELINE: f64 = 1500.0;

/// Talent composite points per rating point
pub const TALENT_POINTS_PER_RATING: f64 = 25.0;
pub const TALENT_BASELINE: f64 = 700.0;

/// SP+ offense/defense are expressed in points per game
pub const SP_UNIT_BASELINE: f64 = 28.0;

/// Share of the team-level index in the efficiency rating, relative to
/// the offense and defense indices
pub const TEAM_INDEX_WEIGHT: f64 = 0.5;

/// Rating points per unit of tier-adjusted win percentage above neutral
pub const COACHING_SCALE: f64 = 20.0;

/// Tier-adjusted win percentage treated as an average coach
pub const COACHING_NEUTRAL_PCT: f64 = 0.5;

/// Ranked games needed before a coaching record is taken at face value
pub const COACHING_FULL_SAMPLE: f64 = 10.0;

/// Credit per win over a ranked opponent, by opponent rank
pub const TIER_MULTIPLIER_TOP5: f64 = 1.3;
pub const TIER_MULTIPLIER_TOP10: f64 = 1.15;
pub const TIER_MULTIPLIER_TOP25: f64 = 1.0;
/// Largest tier multiplier; an unbeaten record against top-5 teams scores 1.0
pub const TIER_MULTIPLIER_MAX: f64 = TIER_MULTIPLIER_TOP5;

/// Value substituted for any absent rating source
pub const NEUTRAL_RATING: f64 = 0.0;

pub const WEIGHT_EFFICIENCY: f64 = 0.30;
pub const WEIGHT_COMPOSITE: f64 = 0.35;
pub const WEIGHT_RECORD: f64 = 0.15;
pub const WEIGHT_TALENT: f64 = 0.10;
pub const WEIGHT_COACHING: f64 = 0.10;

/// Share of the offense/defense sub-rating taken from SP+ when present
pub const SP_UNIT_BLEND: f64 = 0.5;

// ---------------------------------------------------------------------------
// Matchup projection
// ---------------------------------------------------------------------------

/// Points of margin per point of power-rating difference
pub const POINTS_PER_RATING_UNIT: f64 = 1.0;

pub const HOME_FIELD_ADVANTAGE: f64 = 2.2;

/// Conference games pull the margin this many points toward a pick'em
pub const CONFERENCE_GAME_SHRINK: f64 = 0.5;

pub const REST_POINTS_PER_DAY: f64 = 0.25;
pub const MAX_REST_ADVANTAGE_DAYS: f64 = 7.0;

/// League-average combined score
pub const BASELINE_TOTAL: f64 = 52.0;

pub const OFFENSE_TOTAL_SCALE: f64 = 1.0;
pub const DEFENSE_TOTAL_SCALE: f64 = 1.0;

/// The projected total never drops below twice this
pub const MIN_TEAM_SCORE: f64 = 7.0;

/// Standard deviation of the final scoring margin around the projection
pub const MARGIN_STDDEV: f64 = 14.0;

// ---------------------------------------------------------------------------
// Confidence
// ---------------------------------------------------------------------------

pub const CONFIDENCE_FLOOR: f64 = 50.0;
pub const CONFIDENCE_CEILING: f64 = 95.0;

pub const BASE_QUALITY_MIN: f64 = 70.0;
pub const BASE_QUALITY_MAX: f64 = 95.0;
pub const CONSISTENCY_MIN: f64 = -5.0;
pub const CONSISTENCY_MAX: f64 = 10.0;
pub const DIFFERENTIAL_MIN: f64 = 0.0;
pub const DIFFERENTIAL_MAX: f64 = 15.0;

pub const MAX_KEY_FACTORS: usize = 5;

/// Data-quality points for each input that is present
pub const QUALITY_POINTS_MARKET_SPREAD: f64 = 5.0;
pub const QUALITY_POINTS_MARKET_TOTAL: f64 = 4.0;
pub const QUALITY_POINTS_TWO_BOOKS: f64 = 3.0;
pub const QUALITY_POINTS_THREE_BOOKS: f64 = 2.0;
pub const QUALITY_POINTS_EFFICIENCY_ONE: f64 = 3.0;
pub const QUALITY_POINTS_EFFICIENCY_BOTH: f64 = 3.0;
pub const QUALITY_POINTS_EXTERNAL_RATINGS: f64 = 3.0;
pub const QUALITY_POINTS_WEATHER: f64 = 2.0;

/// Upper edges of the model-vs-market spread gap bands, in points
pub const MARKET_AGREEMENT_BANDS: [f64; 4] = [1.5, 3.5, 7.0, 10.0];

/// Consistency points for each gap band, the last one beyond every edge
pub const MARKET_AGREEMENT_POINTS: [f64; 5] = [6.0, 4.0, 1.0, -1.0, -3.0];

/// Consistency points when a statistical signal agrees with the spread
pub const SIGNAL_AGREE_POINTS: f64 = 2.0;
/// Consistency points when it points at the other team
pub const SIGNAL_CONTRADICT_POINTS: f64 = -1.0;

/// Rating differences smaller than this favor neither team
pub const DIRECTION_DEADBAND: f64 = 0.5;

/// Rating points of gap per differential point, and the cap per gap
pub const EFFICIENCY_GAP_DIVISOR: f64 = 2.0;
pub const EFFICIENCY_GAP_CAP: f64 = 6.0;
pub const TALENT_GAP_DIVISOR: f64 = 2.0;
pub const TALENT_GAP_CAP: f64 = 4.0;

/// Bonus when three or more indicators favor one team and none dissent
pub const AGREEMENT_BONUS_STRONG: f64 = 5.0;
/// Bonus when exactly two indicators agree and none dissent
pub const AGREEMENT_BONUS: f64 = 2.0;

// ---------------------------------------------------------------------------
// Market comparison
// ---------------------------------------------------------------------------

/// Spread edge cutoffs: NO EDGE below the first, then SLIGHT, GOOD, STRONG
pub const SPREAD_EDGE_CUTOFFS: [f64; 3] = [2.5, 4.0, 6.0];

/// Total edge cutoffs: NO EDGE below the first, then SLIGHT, GOOD, STRONG
pub const TOTAL_EDGE_CUTOFFS: [f64; 3] = [3.5, 5.5, 8.0];

/// A quoted spread beyond this is rejected as malformed
pub const MAX_SANE_SPREAD: f64 = 70.0;

pub const MIN_SANE_TOTAL: f64 = 20.0;
pub const MAX_SANE_TOTAL: f64 = 130.0;

/// American odds pivot: +100 and -100 are both an even-money price
pub const EVEN_MONEYLINE: f64 = 100.0;

/// American odds must lie in [EVEN_MONEYLINE, MAX_SANE_MONEYLINE] in magnitude
pub const MAX_SANE_MONEYLINE: f64 = 100_000.0;

// ---------------------------------------------------------------------------
// Backtest reporting
// ---------------------------------------------------------------------------

/// Equal-width home win probability buckets in the calibration curve
pub const CALIBRATION_BUCKETS: usize = 10;

/// Lower edges of the confidence tiers reported separately
pub const CONFIDENCE_TIERS: [f64; 5] = [50.0, 60.0, 70.0, 80.0, 90.0];

pub const BOOTSTRAP_SAMPLES: usize = 1000;
pub const BOOTSTRAP_SEED: u64 = 42;
