//! The forward pass for one matchup: rate, project, score, compare.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::confidence::{score_confidence, ConfidenceInputs};
use crate::context::{PredictionContext, SnapshotVersion};
use crate::error::{PredictionError, Result};
use crate::market::{
    build_consensus, compare_to_market, moneyline_value, EdgeRecommendation, MarketConsensus,
    MarketLine, MoneylineValue,
};
use crate::projector::{project_matchup, Matchup};
use crate::win_prob::WinProbability;

/// The model's forecast for one game.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    pub home_team: String,
    pub away_team: String,
    /// Home perspective; negative means the home team is favored
    pub predicted_spread: f64,
    pub predicted_total: f64,
    pub home_score: f64,
    pub away_score: f64,
    pub win_probability: WinProbability,
    pub confidence: f64,
    pub key_factors: Vec<String>,
}

/// A prediction together with its market comparison.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GamePrediction {
    pub snapshot: SnapshotVersion,
    pub matchup: Matchup,
    pub prediction: Prediction,
    pub consensus: MarketConsensus,
    pub edges: Vec<EdgeRecommendation>,
    pub moneyline: Option<MoneylineValue>,
}

/// One entry in a weekly slate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlateGame {
    pub matchup: Matchup,
    #[serde(default)]
    pub lines: Vec<MarketLine>,
}

/// Run the full pipeline for a single game.
///
/// Fails only when a team has no data of any kind or the matchup names the
/// same team twice; every other gap lowers the confidence instead.
///
/// # Arguments
/// * `ctx` - Snapshot the ratings and config are read from
/// * `matchup` - Teams and game context
/// * `lines` - Sportsbook quotes, possibly empty or partly malformed
///
/// # Returns
/// The prediction with its market comparison, or `UnknownTeam`/`SameTeam`
pub fn predict_game(
    ctx: &PredictionContext,
    matchup: &Matchup,
    lines: &[MarketLine],
) -> Result<GamePrediction> {
    if matchup.home_team == matchup.away_team {
        return Err(PredictionError::SameTeam {
            team: matchup.home_team.clone(),
        });
    }
    let config = ctx.config();
    let home = ctx.rating(&matchup.home_team)?;
    let away = ctx.rating(&matchup.away_team)?;

    let projection = project_matchup(home, away, matchup, &config.projection);
    let consensus = build_consensus(lines, &config.market);

    let confidence = score_confidence(
        &ConfidenceInputs {
            projection: &projection,
            home,
            away,
            market: (!consensus.is_empty()).then_some(&consensus),
            has_situational_data: matchup.has_weather(),
        },
        &config.confidence,
    );

    let edges = compare_to_market(projection.spread, projection.total, &consensus, &config.grading);
    let moneyline = moneyline_value(&projection.win_probability, &consensus);

    let (home_score, away_score) = projection.implied_scores();
    let prediction = Prediction {
        home_team: matchup.home_team.clone(),
        away_team: matchup.away_team.clone(),
        predicted_spread: projection.spread.value(),
        predicted_total: projection.total,
        home_score,
        away_score,
        win_probability: projection.win_probability,
        confidence: confidence.value,
        key_factors: confidence.key_factors,
    };

    debug!(
        home = %prediction.home_team,
        away = %prediction.away_team,
        spread = prediction.predicted_spread,
        total = prediction.predicted_total,
        confidence = prediction.confidence,
        "prediction computed"
    );

    Ok(GamePrediction {
        snapshot: ctx.version(),
        matchup: matchup.clone(),
        prediction,
        consensus,
        edges,
        moneyline,
    })
}

/// Predict every game of a slate in parallel. Results keep input order.
pub fn predict_slate(ctx: &PredictionContext, games: &[SlateGame]) -> Vec<Result<GamePrediction>> {
    games
        .par_iter()
        .map(|game| predict_game(ctx, &game.matchup, &game.lines))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use crate::constants::*;
    use crate::market::{Grade, MarketKind, Side};
    use crate::projector::Weather;
    use crate::team::{ExternalRatings, TeamSeasonStats};

    /// Ratings chosen so the power rating equals the SP+ value exactly:
    /// efficiency weight is effectively zero and every external source agrees.
    fn context_with_power(teams: &[(&str, f64)]) -> PredictionContext {
        let mut config = ModelConfig::default();
        config.aggregation.efficiency_weight = 1e-12;
        PredictionContext::builder()
            .config(config)
            .ratings(teams.iter().map(|(name, power)| {
                (
                    name.to_string(),
                    ExternalRatings {
                        sp_overall: Some(*power),
                        srs: Some(*power),
                        ..Default::default()
                    },
                )
            }))
            .build(SnapshotVersion::new(2024, 9))
            .unwrap()
    }

    #[test]
    fn test_rating_gap_spread_regression() {
        let ctx = context_with_power(&[("Alpha", 20.0), ("Beta", 0.0)]);
        let game = predict_game(&ctx, &Matchup::new("Alpha", "Beta", 2024, 9), &[]).unwrap();
        let expected = -(20.0 * POINTS_PER_RATING_UNIT + HOME_FIELD_ADVANTAGE);
        assert!((game.prediction.predicted_spread - expected).abs() < 1e-6);
        assert!(game.prediction.win_probability.home > 0.9);
        assert!(game.edges.is_empty());
        assert!(game.moneyline.is_none());
    }

    #[test]
    fn test_strong_edge_against_market() {
        // Home by 7.8 on ratings plus 2.2 home field: model spread -10.0.
        let ctx = context_with_power(&[("Alpha", 7.8), ("Beta", 0.0)]);
        let lines = vec![
            MarketLine::new("A", Some(-1.5), Some(50.0)),
            MarketLine::new("B", Some(-2.5), Some(51.0)),
            MarketLine::new("Bad", Some(f64::NAN), None),
        ];
        let game = predict_game(&ctx, &Matchup::new("Alpha", "Beta", 2024, 9), &lines).unwrap();
        assert!((game.prediction.predicted_spread + 10.0).abs() < 1e-6);
        assert_eq!(game.consensus.dropped, vec!["Bad".to_string()]);

        let spread = game
            .edges
            .iter()
            .find(|e| e.market == MarketKind::Spread)
            .unwrap();
        assert!((spread.edge_magnitude - 8.0).abs() < 1e-6);
        assert_eq!(spread.grade, Grade::Strong);
        assert_eq!(spread.side, Side::Home);
    }

    #[test]
    fn test_all_defaults_still_predicts() {
        let mut stats = TeamSeasonStats::new("Sparse", 2024);
        stats.games = Some(3.0);
        let ctx = PredictionContext::builder()
            .stats([stats, {
                let mut s = TeamSeasonStats::new("Thin", 2024);
                s.penalty_yards = Some(120.0);
                s
            }])
            .build(SnapshotVersion::new(2024, 3))
            .unwrap();
        let game = predict_game(&ctx, &Matchup::new("Sparse", "Thin", 2024, 3), &[]).unwrap();
        let p = &game.prediction;
        assert!(p.confidence >= CONFIDENCE_FLOOR && p.confidence <= CONFIDENCE_CEILING);
        assert!((p.win_probability.home + p.win_probability.away - 1.0).abs() < 1e-6);
        assert!(p.predicted_total > 0.0);
        assert!(p.key_factors.iter().any(|f| f.starts_with("Limited data")));
    }

    #[test]
    fn test_empty_weather_report_earns_nothing() {
        let ctx = context_with_power(&[("Alpha", 3.0), ("Beta", 0.0)]);
        let confidence = |weather: Option<Weather>| {
            let mut matchup = Matchup::new("Alpha", "Beta", 2024, 9);
            matchup.weather = weather;
            predict_game(&ctx, &matchup, &[]).unwrap().prediction.confidence
        };
        let none = confidence(None);
        let empty = confidence(Some(Weather::default()));
        let windy = confidence(Some(Weather {
            wind_mph: Some(18.0),
            ..Default::default()
        }));
        assert_eq!(empty, none, "A weather record with no readings is not data");
        assert!((windy - none - QUALITY_POINTS_WEATHER).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_and_same_team_errors() {
        let ctx = context_with_power(&[("Alpha", 1.0)]);
        let err = predict_game(&ctx, &Matchup::new("Alpha", "Ghost", 2024, 9), &[]).unwrap_err();
        assert!(matches!(err, PredictionError::UnknownTeam { team } if team == "Ghost"));
        let err = predict_game(&ctx, &Matchup::new("Alpha", "Alpha", 2024, 9), &[]).unwrap_err();
        assert!(matches!(err, PredictionError::SameTeam { .. }));
    }

    #[test]
    fn test_slate_keeps_order() {
        let ctx = context_with_power(&[("A", 5.0), ("B", 0.0), ("C", -5.0)]);
        let games = vec![
            SlateGame { matchup: Matchup::new("A", "B", 2024, 9), lines: vec![] },
            SlateGame { matchup: Matchup::new("C", "Nobody", 2024, 9), lines: vec![] },
            SlateGame { matchup: Matchup::new("B", "C", 2024, 9), lines: vec![] },
        ];
        let results = predict_slate(&ctx, &games);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().prediction.home_team, "A");
        assert!(results[1].is_err());
        assert_eq!(results[2].as_ref().unwrap().prediction.away_team, "C");
    }

    #[test]
    fn test_prediction_serializes() {
        let ctx = context_with_power(&[("A", 5.0), ("B", 0.0)]);
        let game = predict_game(&ctx, &Matchup::new("A", "B", 2024, 9), &[]).unwrap();
        let json = serde_json::to_value(&game.prediction).unwrap();
        assert!(json["predicted_spread"].is_number());
        assert!(json["win_probability"]["home"].is_number());
        assert!(json["key_factors"].is_array());
    }
}
