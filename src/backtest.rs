//! Replays the pipeline over completed games and reports accuracy.
//!
//! The report is descriptive only. Nothing here feeds back into the
//! constants used for live predictions.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::constants::{BOOTSTRAP_SAMPLES, BOOTSTRAP_SEED, CALIBRATION_BUCKETS, CONFIDENCE_TIERS};
use crate::context::PredictionContext;
use crate::market::{Grade, MarketKind, MarketLine};
use crate::pipeline::predict_game;
use crate::projector::Matchup;

/// A completed (or not yet completed) game with the lines quoted before it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoricalGame {
    pub matchup: Matchup,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
    #[serde(default)]
    pub lines: Vec<MarketLine>,
}

impl HistoricalGame {
    fn final_score(&self) -> Option<(u32, u32)> {
        Some((self.home_score?, self.away_score?))
    }
}

/// Weekly contexts, looked up by the week a game was played.
#[derive(Clone, Debug, Default)]
pub struct SnapshotIndex {
    snapshots: BTreeMap<(u16, u8), PredictionContext>,
}

impl SnapshotIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a context. A later revision of the same week replaces an earlier one.
    pub fn insert(&mut self, ctx: PredictionContext) {
        let v = ctx.version();
        let replace = self
            .snapshots
            .get(&(v.season, v.week))
            .map_or(true, |old| old.version().revision <= v.revision);
        if replace {
            self.snapshots.insert((v.season, v.week), ctx);
        }
    }

    /// Most recent context of the same season at or before `week`.
    pub fn as_of(&self, season: u16, week: u8) -> Option<&PredictionContext> {
        self.snapshots
            .range((season, 0)..=(season, week))
            .next_back()
            .map(|(_, ctx)| ctx)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct BacktestOptions {
    pub bootstrap_samples: usize,
    pub seed: u64,
}

impl Default for BacktestOptions {
    fn default() -> Self {
        Self {
            bootstrap_samples: BOOTSTRAP_SAMPLES,
            seed: BOOTSTRAP_SEED,
        }
    }
}

/// Against-the-spread result of the model's pick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Ats {
    Hit,
    Miss,
    Push,
}

/// Replay of one game with a final score.
#[derive(Clone, Debug)]
struct GameResult {
    season: u16,
    week: u8,
    /// Predicted minus actual home margin
    spread_error: f64,
    total_error: f64,
    home_win_probability: f64,
    /// `None` for a tie
    home_won: Option<bool>,
    confidence: f64,
    ats: Option<Ats>,
    spread_grade: Option<Grade>,
    over_under_hit: Option<bool>,
}

impl GameResult {
    fn winner_correct(&self) -> Option<bool> {
        self.home_won
            .map(|home_won| (self.home_win_probability > 0.5) == home_won)
    }
}

enum Replay {
    Tested(GameResult),
    Pending,
    Skipped,
}

fn replay_game(game: &HistoricalGame, snapshots: &SnapshotIndex) -> Replay {
    let Some((home_score, away_score)) = game.final_score() else {
        return Replay::Pending;
    };
    let m = &game.matchup;
    let Some(ctx) = snapshots.as_of(m.season, m.week) else {
        warn!(season = m.season, week = m.week, "no snapshot for game week, skipping");
        return Replay::Skipped;
    };
    let predicted = match predict_game(ctx, m, &game.lines) {
        Ok(p) => p,
        Err(e) => {
            warn!(home = %m.home_team, away = %m.away_team, error = %e, "skipping game");
            return Replay::Skipped;
        }
    };

    let p = &predicted.prediction;
    let (home_score, away_score) = (f64::from(home_score), f64::from(away_score));
    let actual_margin = home_score - away_score;
    let actual_total = home_score + away_score;

    let ats = predicted.consensus.spread.and_then(|market| {
        let cover = actual_margin + market.value();
        let pick_home = if p.predicted_spread < market.value() {
            true
        } else if p.predicted_spread > market.value() {
            false
        } else {
            return None;
        };
        Some(if cover == 0.0 {
            Ats::Push
        } else if (cover > 0.0) == pick_home {
            Ats::Hit
        } else {
            Ats::Miss
        })
    });

    let over_under_hit = predicted.consensus.total.and_then(|market| {
        if actual_total == market || p.predicted_total == market {
            None
        } else {
            Some((actual_total > market) == (p.predicted_total > market))
        }
    });

    let spread_grade = predicted
        .edges
        .iter()
        .find(|e| e.market == MarketKind::Spread)
        .map(|e| e.grade);

    Replay::Tested(GameResult {
        season: m.season,
        week: m.week,
        spread_error: -p.predicted_spread - actual_margin,
        total_error: p.predicted_total - actual_total,
        home_win_probability: p.win_probability.home,
        home_won: if actual_margin > 0.0 {
            Some(true)
        } else if actual_margin < 0.0 {
            Some(false)
        } else {
            None
        },
        confidence: p.confidence,
        ats,
        spread_grade,
        over_under_hit,
    })
}

/// Sums for one slice of the results. Adding games in any order gives the
/// same totals.
#[derive(Clone, Debug, Default)]
struct Tally {
    games: usize,
    abs_error: f64,
    sq_error: f64,
    winner_games: usize,
    winner_correct: usize,
    ats_hits: usize,
    ats_decisions: usize,
    ats_pushes: usize,
}

impl Tally {
    fn add(&mut self, r: &GameResult) {
        self.games += 1;
        self.abs_error += r.spread_error.abs();
        self.sq_error += r.spread_error * r.spread_error;
        if let Some(correct) = r.winner_correct() {
            self.winner_games += 1;
            self.winner_correct += correct as usize;
        }
        match r.ats {
            Some(Ats::Hit) => {
                self.ats_hits += 1;
                self.ats_decisions += 1;
            }
            Some(Ats::Miss) => self.ats_decisions += 1,
            Some(Ats::Push) => self.ats_pushes += 1,
            None => {}
        }
    }

    fn stats(&self) -> BucketStats {
        BucketStats {
            games: self.games,
            winner_accuracy: ratio(self.winner_correct, self.winner_games),
            mean_absolute_error: mean(self.abs_error, self.games),
            rmse: mean(self.sq_error, self.games).sqrt(),
            ats_hit_rate: ratio(self.ats_hits, self.ats_decisions),
            ats_games: self.ats_decisions,
        }
    }
}

fn ratio(n: usize, d: usize) -> f64 {
    if d == 0 {
        0.0
    } else {
        n as f64 / d as f64
    }
}

fn mean(sum: f64, n: usize) -> f64 {
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Accuracy for one season, week, grade or confidence tier.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BucketStats {
    pub games: usize,
    pub winner_accuracy: f64,
    pub mean_absolute_error: f64,
    pub rmse: f64,
    pub ats_hit_rate: f64,
    pub ats_games: usize,
}

/// Predicted vs observed home win rate for one probability bucket.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CalibrationBin {
    pub bucket_start: f64,
    pub bucket_end: f64,
    pub count: usize,
    pub avg_predicted: f64,
    pub actual_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfidenceTier {
    pub min_confidence: f64,
    pub stats: BucketStats,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BacktestReport {
    pub games_tested: usize,
    /// Games without a final score
    pub pending: usize,
    /// Games with a score but no usable snapshot or team data
    pub skipped: usize,
    pub winner_accuracy: f64,
    pub mean_absolute_error: f64,
    pub rmse: f64,
    pub ats_hit_rate: f64,
    pub ats_games: usize,
    pub ats_pushes: usize,
    /// 90% bootstrap interval for `ats_hit_rate`
    pub ats_hit_rate_interval: Option<(f64, f64)>,
    pub total_mean_absolute_error: f64,
    pub over_under_hit_rate: f64,
    /// Mean squared error of the home win probability (ties excluded)
    pub brier_score: f64,
    pub per_season: BTreeMap<u16, BucketStats>,
    pub per_week: BTreeMap<u8, BucketStats>,
    pub per_grade: BTreeMap<Grade, BucketStats>,
    pub per_confidence: Vec<ConfidenceTier>,
    pub calibration: Vec<CalibrationBin>,
}

/// Replay every game against the snapshot for its week and aggregate.
///
/// Games without a final score are counted as pending; games that cannot
/// be predicted are counted as skipped. Neither aborts the run.
///
/// # Arguments
/// * `games` - Historical games, scored or not, with their pre-game lines
/// * `snapshots` - Contexts as they stood each week
/// * `options` - Bootstrap sample count and seed
///
/// # Returns
/// Aggregate accuracy; all rates are 0.0 when no game could be tested
pub fn run_backtest(
    games: &[HistoricalGame],
    snapshots: &SnapshotIndex,
    options: &BacktestOptions,
) -> BacktestReport {
    if snapshots.is_empty() && !games.is_empty() {
        warn!(games = games.len(), "backtest has no snapshots, scored games will be skipped");
    }
    let replays: Vec<Replay> = games
        .par_iter()
        .map(|game| replay_game(game, snapshots))
        .collect();

    let mut report = BacktestReport::default();
    let mut results = Vec::with_capacity(replays.len());
    for replay in replays {
        match replay {
            Replay::Tested(r) => results.push(r),
            Replay::Pending => report.pending += 1,
            Replay::Skipped => report.skipped += 1,
        }
    }

    let mut overall = Tally::default();
    let mut seasons: BTreeMap<u16, Tally> = BTreeMap::new();
    let mut weeks: BTreeMap<u8, Tally> = BTreeMap::new();
    let mut grades: BTreeMap<Grade, Tally> = BTreeMap::new();
    let mut tiers: Vec<Tally> = vec![Tally::default(); CONFIDENCE_TIERS.len()];
    let mut bins = vec![(0usize, 0.0f64, 0usize); CALIBRATION_BUCKETS];
    let (mut total_abs, mut ou_hits, mut ou_decisions) = (0.0, 0usize, 0usize);
    let (mut brier_sum, mut brier_games) = (0.0, 0usize);

    for r in &results {
        overall.add(r);
        seasons.entry(r.season).or_default().add(r);
        weeks.entry(r.week).or_default().add(r);
        if let Some(grade) = r.spread_grade {
            grades.entry(grade).or_default().add(r);
        }
        let tier = CONFIDENCE_TIERS
            .iter()
            .rposition(|lo| r.confidence >= *lo)
            .unwrap_or(0);
        tiers[tier].add(r);

        total_abs += r.total_error.abs();
        if let Some(hit) = r.over_under_hit {
            ou_decisions += 1;
            ou_hits += hit as usize;
        }

        if let Some(home_won) = r.home_won {
            let y = if home_won { 1.0 } else { 0.0 };
            brier_sum += (r.home_win_probability - y).powi(2);
            brier_games += 1;

            let idx = ((r.home_win_probability * CALIBRATION_BUCKETS as f64) as usize)
                .min(CALIBRATION_BUCKETS - 1);
            let bin = &mut bins[idx];
            bin.0 += 1;
            bin.1 += r.home_win_probability;
            bin.2 += home_won as usize;
        }
    }

    let summary = overall.stats();
    report.games_tested = summary.games;
    report.winner_accuracy = summary.winner_accuracy;
    report.mean_absolute_error = summary.mean_absolute_error;
    report.rmse = summary.rmse;
    report.ats_hit_rate = summary.ats_hit_rate;
    report.ats_games = summary.ats_games;
    report.ats_pushes = overall.ats_pushes;
    report.total_mean_absolute_error = mean(total_abs, results.len());
    report.over_under_hit_rate = ratio(ou_hits, ou_decisions);
    report.brier_score = mean(brier_sum, brier_games);
    report.per_season = seasons.into_iter().map(|(k, t)| (k, t.stats())).collect();
    report.per_week = weeks.into_iter().map(|(k, t)| (k, t.stats())).collect();
    report.per_grade = grades.into_iter().map(|(k, t)| (k, t.stats())).collect();
    report.per_confidence = CONFIDENCE_TIERS
        .iter()
        .zip(&tiers)
        .filter(|(_, t)| t.games > 0)
        .map(|(lo, t)| ConfidenceTier {
            min_confidence: *lo,
            stats: t.stats(),
        })
        .collect();
    report.calibration = bins
        .iter()
        .enumerate()
        .filter(|(_, (count, _, _))| *count > 0)
        .map(|(i, (count, pred_sum, wins))| CalibrationBin {
            bucket_start: i as f64 / CALIBRATION_BUCKETS as f64,
            bucket_end: (i + 1) as f64 / CALIBRATION_BUCKETS as f64,
            count: *count,
            avg_predicted: pred_sum / *count as f64,
            actual_rate: *wins as f64 / *count as f64,
        })
        .collect();

    let ats_outcomes: Vec<bool> = results
        .iter()
        .filter_map(|r| match r.ats {
            Some(Ats::Hit) => Some(true),
            Some(Ats::Miss) => Some(false),
            _ => None,
        })
        .collect();
    report.ats_hit_rate_interval = bootstrap_interval(&ats_outcomes, options);

    info!(
        snapshots = snapshots.len(),
        tested = report.games_tested,
        pending = report.pending,
        skipped = report.skipped,
        mae = report.mean_absolute_error,
        ats = report.ats_hit_rate,
        "backtest complete"
    );

    report
}

/// 5th and 95th percentile of the hit rate over seeded resamples.
fn bootstrap_interval(outcomes: &[bool], options: &BacktestOptions) -> Option<(f64, f64)> {
    if outcomes.is_empty() || options.bootstrap_samples == 0 {
        return None;
    }
    let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
    let n = outcomes.len();
    let mut rates: Vec<f64> = (0..options.bootstrap_samples)
        .map(|_| {
            let hits = (0..n).filter(|_| outcomes[rng.gen_range(0..n)]).count();
            hits as f64 / n as f64
        })
        .collect();
    rates.sort_by(|a, b| a.total_cmp(b));
    let at = |q: f64| rates[((rates.len() - 1) as f64 * q).round() as usize];
    Some((at(0.05), at(0.95)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::context::SnapshotVersion;
    use crate::team::ExternalRatings;

    fn context(season: u16, week: u8, teams: &[(&str, f64)]) -> PredictionContext {
        let mut config = ModelConfig::default();
        config.aggregation.efficiency_weight = 1e-12;
        PredictionContext::builder()
            .config(config)
            .ratings(teams.iter().map(|(name, power)| {
                (
                    name.to_string(),
                    ExternalRatings {
                        sp_overall: Some(*power),
                        ..Default::default()
                    },
                )
            }))
            .build(SnapshotVersion::new(season, week))
            .unwrap()
    }

    fn game(
        home: &str,
        away: &str,
        week: u8,
        score: Option<(u32, u32)>,
        spread: Option<f64>,
    ) -> HistoricalGame {
        HistoricalGame {
            matchup: Matchup::new(home, away, 2023, week),
            home_score: score.map(|s| s.0),
            away_score: score.map(|s| s.1),
            lines: spread
                .map(|s| vec![MarketLine::new("Book", Some(s), Some(50.0))])
                .unwrap_or_default(),
        }
    }

    fn index() -> SnapshotIndex {
        let mut idx = SnapshotIndex::new();
        idx.insert(context(2023, 1, &[("Strong", 10.0), ("Weak", -10.0), ("Mid", 0.0)]));
        idx
    }

    #[test]
    fn test_all_pending_reports_zero_games() {
        let games = vec![
            game("Strong", "Weak", 2, None, Some(-20.0)),
            game("Weak", "Mid", 2, None, None),
        ];
        let report = run_backtest(&games, &index(), &BacktestOptions::default());
        assert_eq!(report.games_tested, 0);
        assert_eq!(report.pending, 2);
        assert_eq!(report.mean_absolute_error, 0.0);
        assert_eq!(report.ats_hit_rate_interval, None);
        assert!(report.per_season.is_empty());
    }

    #[test]
    fn test_empty_corpus() {
        let report = run_backtest(&[], &SnapshotIndex::new(), &BacktestOptions::default());
        assert_eq!(report, BacktestReport::default());
    }

    #[test]
    fn test_errors_and_winner_accuracy() {
        // Strong at home vs Weak: model margin 22.2
        let games = vec![
            game("Strong", "Weak", 3, Some((30, 10)), None),
            game("Weak", "Strong", 3, Some((24, 21)), None),
        ];
        let report = run_backtest(&games, &index(), &BacktestOptions::default());
        assert_eq!(report.games_tested, 2);
        assert!((report.winner_accuracy - 0.5).abs() < 1e-9);

        // Errors: 22.2 - 20 = 2.2 and (-20 + 2.2) - 3 = -20.8
        let expected_mae = (2.2 + 20.8) / 2.0;
        assert!((report.mean_absolute_error - expected_mae).abs() < 1e-6);
        let expected_rmse = ((2.2f64.powi(2) + 20.8f64.powi(2)) / 2.0).sqrt();
        assert!((report.rmse - expected_rmse).abs() < 1e-6);
        assert_eq!(report.per_week[&3].games, 2);
        assert_eq!(report.per_season[&2023].games, 2);
    }

    #[test]
    fn test_ats_hits_and_pushes() {
        let games = vec![
            // Model -22.2 vs market -14: picks Strong, wins by 28 -> hit
            game("Strong", "Weak", 2, Some((38, 10)), Some(-14.0)),
            // Same pick, wins by only 7 -> miss
            game("Strong", "Weak", 2, Some((14, 7)), Some(-14.0)),
            // Wins by exactly 14 -> push
            game("Strong", "Weak", 2, Some((21, 7)), Some(-14.0)),
        ];
        let report = run_backtest(&games, &index(), &BacktestOptions::default());
        assert_eq!(report.ats_games, 2);
        assert_eq!(report.ats_pushes, 1);
        assert!((report.ats_hit_rate - 0.5).abs() < 1e-9);
        let (lo, hi) = report.ats_hit_rate_interval.unwrap();
        assert!(lo <= 0.5 && hi >= 0.5);
        assert_eq!(report.per_grade[&Grade::Strong].games, 3);
    }

    #[test]
    fn test_missing_snapshot_is_skipped() {
        let games = vec![
            HistoricalGame {
                matchup: Matchup::new("Strong", "Weak", 2022, 5),
                home_score: Some(20),
                away_score: Some(3),
                lines: vec![],
            },
            game("Strong", "Nobody", 4, Some((20, 3)), None),
            game("Strong", "Weak", 4, Some((20, 3)), None),
        ];
        let report = run_backtest(&games, &index(), &BacktestOptions::default());
        assert_eq!(report.skipped, 2);
        assert_eq!(report.games_tested, 1);
    }

    #[test]
    fn test_snapshot_lookup_uses_latest_prior_week() {
        let mut idx = index();
        idx.insert(context(2023, 5, &[("Strong", 0.0), ("Weak", 0.0)]));
        assert_eq!(idx.as_of(2023, 4).unwrap().version().week, 1);
        assert_eq!(idx.as_of(2023, 9).unwrap().version().week, 5);
        assert!(idx.as_of(2024, 1).is_none());
        assert_eq!(idx.len(), 2);
        assert!(SnapshotIndex::new().is_empty());
    }

    #[test]
    fn test_extreme_scores_do_not_overflow() {
        let games = vec![game("Strong", "Weak", 2, Some((u32::MAX, u32::MAX - 1)), Some(-14.0))];
        let report = run_backtest(&games, &index(), &BacktestOptions::default());
        assert_eq!(report.games_tested, 1);
        assert!(report.total_mean_absolute_error.is_finite());
        assert!(report.total_mean_absolute_error > f64::from(u32::MAX));
        assert_eq!(report.winner_accuracy, 1.0, "Home won by one point");
    }

    #[test]
    fn test_calibration_and_brier() {
        let games: Vec<HistoricalGame> = (0..20)
            .map(|i| game("Strong", "Weak", 2, Some((30, 10 + i)), None))
            .collect();
        let report = run_backtest(&games, &index(), &BacktestOptions::default());
        assert_eq!(report.calibration.len(), 1);
        let bin = &report.calibration[0];
        assert_eq!(bin.count, 20);
        assert!(bin.bucket_start >= 0.9);
        assert_eq!(bin.actual_rate, 1.0);
        assert!(report.brier_score < 0.02);
    }
}
