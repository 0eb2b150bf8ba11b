//! Gridiron Core - scoring and calibration for college football predictions.
//!
//! Raw season statistics are normalized to a 0-100 scale, blended with
//! external ratings into a power rating, projected into a spread, total and
//! win probability, scored for confidence and compared against sportsbook
//! lines. The backtest module replays the same pipeline over completed games.

pub mod backtest;
pub mod confidence;
pub mod config;
pub mod constants;
pub mod context;
pub mod error;
pub mod market;
pub mod normalize;
pub mod pipeline;
pub mod projector;
pub mod rating;
pub mod team;
pub mod win_prob;

pub use backtest::{run_backtest, BacktestOptions, BacktestReport, HistoricalGame, SnapshotIndex};
pub use confidence::{score_confidence, ConfidenceScore};
pub use config::ModelConfig;
pub use context::{ContextBuilder, PredictionContext, SnapshotVersion};
pub use error::{PredictionError, Result};
pub use market::{build_consensus, compare_to_market, EdgeRecommendation, Grade, MarketConsensus, MarketLine};
pub use normalize::{normalize_stats, Metric, NormalizedMetrics};
pub use pipeline::{predict_game, predict_slate, GamePrediction, Prediction, SlateGame};
pub use projector::{project_matchup, HomeSpread, Matchup, Projection};
pub use rating::{aggregate_rating, TeamRating};
pub use team::{CoachingVsRanked, ExternalRatings, TeamSeasonStats};
pub use win_prob::WinProbability;
