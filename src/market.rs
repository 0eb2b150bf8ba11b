//! Sportsbook consensus and model-versus-market edges.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::config::{GradingConfig, MarketConfig};
use crate::constants::EVEN_MONEYLINE;
use crate::projector::{HomeSpread, TeamSide};
use crate::win_prob::WinProbability;

/// One sportsbook's quote for a game.
///
/// Spreads are home-perspective (negative = home favored). Numeric fields
/// are parsed leniently: numeric strings are accepted, and anything else
/// present but non-numeric becomes NaN so the quote is rejected as
/// malformed rather than failing the whole batch.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketLine {
    #[serde(alias = "provider")]
    pub sportsbook: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub spread: Option<f64>,
    #[serde(alias = "overUnder", deserialize_with = "lenient_f64")]
    pub total: Option<f64>,
    #[serde(alias = "homeMoneyline", deserialize_with = "lenient_f64")]
    pub home_moneyline: Option<f64>,
    #[serde(alias = "awayMoneyline", deserialize_with = "lenient_f64")]
    pub away_moneyline: Option<f64>,
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        None | Some(Value::Null) => None,
        Some(Value::Number(n)) => Some(n.as_f64().unwrap_or(f64::NAN)),
        Some(Value::String(s)) if s.trim().is_empty() => None,
        Some(Value::String(s)) => Some(s.trim().parse::<f64>().unwrap_or(f64::NAN)),
        Some(_) => Some(f64::NAN),
    })
}

impl MarketLine {
    pub fn new(sportsbook: &str, spread: Option<f64>, total: Option<f64>) -> Self {
        MarketLine {
            sportsbook: sportsbook.to_string(),
            spread,
            total,
            ..Default::default()
        }
    }

    /// Why this quote fails the sanity limits, if it does. Missing fields
    /// are fine; present-but-absurd fields are not.
    pub fn defect(&self, limits: &MarketConfig) -> Option<String> {
        if let Some(spread) = self.spread {
            if !spread.is_finite() || spread.abs() > limits.max_spread {
                return Some(format!("spread {spread} out of range"));
            }
        }
        if let Some(total) = self.total {
            if !total.is_finite() || total < limits.min_total || total > limits.max_total {
                return Some(format!("total {total} out of range"));
            }
        }
        for (name, ml) in [("home", self.home_moneyline), ("away", self.away_moneyline)] {
            if let Some(ml) = ml {
                let magnitude = ml.abs();
                if !ml.is_finite() || magnitude < EVEN_MONEYLINE || magnitude > limits.max_moneyline {
                    return Some(format!("{name} moneyline {ml} out of range"));
                }
            }
        }
        None
    }
}

/// Decimal odds for an American moneyline.
///
/// # Arguments
/// * `moneyline` - American odds, positive for the underdog
///
/// # Returns
/// Total payout per unit staked, stake included (always above 1.0)
pub fn american_to_decimal(moneyline: f64) -> f64 {
    if moneyline > 0.0 {
        1.0 + moneyline / EVEN_MONEYLINE
    } else {
        1.0 + EVEN_MONEYLINE / moneyline.abs()
    }
}

/// Break-even probability for an American moneyline, vig included.
pub fn american_to_probability(moneyline: f64) -> f64 {
    1.0 / american_to_decimal(moneyline)
}

/// Mean of every valid quote for one game.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MarketConsensus {
    pub spread: Option<HomeSpread>,
    pub total: Option<f64>,
    /// De-vigged home win probability, averaged across books
    pub home_win_probability: Option<f64>,
    pub home_decimal_odds: Option<f64>,
    pub away_decimal_odds: Option<f64>,
    /// Valid quotes that contributed at least one field
    pub books: usize,
    pub spread_quotes: usize,
    pub total_quotes: usize,
    /// Sportsbooks whose quote was rejected
    pub dropped: Vec<String>,
}

impl MarketConsensus {
    pub fn is_empty(&self) -> bool {
        self.books == 0
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Reduce a game's quotes to a consensus line.
///
/// A malformed quote is dropped whole and logged; it never fails the
/// reduction.
pub fn build_consensus(lines: &[MarketLine], limits: &MarketConfig) -> MarketConsensus {
    let mut spreads = Vec::new();
    let mut totals = Vec::new();
    let mut home_probs = Vec::new();
    let mut home_odds = Vec::new();
    let mut away_odds = Vec::new();
    let mut books = 0;
    let mut dropped = Vec::new();

    for line in lines {
        if let Some(reason) = line.defect(limits) {
            warn!(sportsbook = %line.sportsbook, %reason, "dropping malformed market line");
            dropped.push(line.sportsbook.clone());
            continue;
        }
        let mut used = false;
        if let Some(spread) = line.spread {
            spreads.push(spread);
            used = true;
        }
        if let Some(total) = line.total {
            totals.push(total);
            used = true;
        }
        if let Some(ml) = line.home_moneyline {
            home_odds.push(american_to_decimal(ml));
            used = true;
        }
        if let Some(ml) = line.away_moneyline {
            away_odds.push(american_to_decimal(ml));
            used = true;
        }
        if let (Some(h), Some(a)) = (line.home_moneyline, line.away_moneyline) {
            let (ph, pa) = (american_to_probability(h), american_to_probability(a));
            home_probs.push(ph / (ph + pa));
        }
        if used {
            books += 1;
        }
    }

    MarketConsensus {
        spread: mean(&spreads).and_then(HomeSpread::new),
        total: mean(&totals),
        home_win_probability: mean(&home_probs),
        home_decimal_odds: mean(&home_odds),
        away_decimal_odds: mean(&away_odds),
        books,
        spread_quotes: spreads.len(),
        total_quotes: totals.len(),
        dropped,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    Spread,
    Total,
}

/// Recommended side of a market.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Home,
    Away,
    Over,
    Under,
    None,
}

impl From<TeamSide> for Side {
    fn from(side: TeamSide) -> Self {
        match side {
            TeamSide::Home => Side::Home,
            TeamSide::Away => Side::Away,
        }
    }
}

/// Edge strength, ordered from weakest to strongest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Grade {
    #[serde(rename = "NO EDGE")]
    NoEdge,
    #[serde(rename = "SLIGHT")]
    Slight,
    #[serde(rename = "GOOD")]
    Good,
    #[serde(rename = "STRONG")]
    Strong,
}

/// Bucket an absolute edge by the (slight, good, strong) cutoffs.
pub fn grade_edge(magnitude: f64, cutoffs: &[f64; 3]) -> Grade {
    if !(magnitude >= cutoffs[0]) {
        Grade::NoEdge
    } else if magnitude < cutoffs[1] {
        Grade::Slight
    } else if magnitude < cutoffs[2] {
        Grade::Good
    } else {
        Grade::Strong
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EdgeRecommendation {
    pub market: MarketKind,
    pub side: Side,
    /// Signed edge: toward home for spreads, toward the over for totals
    pub edge: f64,
    pub edge_magnitude: f64,
    pub grade: Grade,
    pub model_line: f64,
    pub market_line: f64,
}

/// Spread edge with both lines expressed from the home side.
///
/// When model and market favor the same team this equals
/// `|model| - |market|`, signed toward the model's favorite; when they
/// disagree on the favorite it is still the full distance between the lines.
pub fn spread_edge(model: HomeSpread, market: HomeSpread, cutoffs: &[f64; 3]) -> EdgeRecommendation {
    let edge = market.value() - model.value();
    let edge_magnitude = edge.abs();
    let grade = grade_edge(edge_magnitude, cutoffs);
    let side = if grade == Grade::NoEdge {
        Side::None
    } else if edge > 0.0 {
        Side::Home
    } else {
        Side::Away
    };
    EdgeRecommendation {
        market: MarketKind::Spread,
        side,
        edge,
        edge_magnitude,
        grade,
        model_line: model.value(),
        market_line: market.value(),
    }
}

/// Total edge; positive favors the over.
pub fn total_edge(model_total: f64, market_total: f64, cutoffs: &[f64; 3]) -> EdgeRecommendation {
    let edge = model_total - market_total;
    let edge_magnitude = edge.abs();
    let grade = grade_edge(edge_magnitude, cutoffs);
    let side = if grade == Grade::NoEdge {
        Side::None
    } else if edge > 0.0 {
        Side::Over
    } else {
        Side::Under
    };
    EdgeRecommendation {
        market: MarketKind::Total,
        side,
        edge,
        edge_magnitude,
        grade,
        model_line: model_total,
        market_line: market_total,
    }
}

/// Zero, one or two recommendations: one per market the consensus quotes.
pub fn compare_to_market(
    model_spread: HomeSpread,
    model_total: f64,
    consensus: &MarketConsensus,
    grading: &GradingConfig,
) -> Vec<EdgeRecommendation> {
    let mut edges = Vec::with_capacity(2);
    if let Some(market) = consensus.spread {
        edges.push(spread_edge(model_spread, market, &grading.spread_cutoffs));
    }
    if let Some(market) = consensus.total {
        edges.push(total_edge(model_total, market, &grading.total_cutoffs));
    }
    edges
}

/// Model win probability against the de-vigged moneyline market.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MoneylineValue {
    pub side: TeamSide,
    pub model_probability: f64,
    pub implied_probability: f64,
    /// Model minus implied probability for `side`
    pub edge: f64,
    /// Expected profit per unit staked at the consensus price, if quoted
    pub expected_value: Option<f64>,
}

/// Compare the model's win probability with the moneyline consensus, for
/// whichever side the model rates higher than the market does.
pub fn moneyline_value(
    win_probability: &WinProbability,
    consensus: &MarketConsensus,
) -> Option<MoneylineValue> {
    let implied_home = consensus.home_win_probability?;
    let home_edge = win_probability.home - implied_home;
    let (side, model_probability, implied_probability, odds) = if home_edge >= 0.0 {
        (
            TeamSide::Home,
            win_probability.home,
            implied_home,
            consensus.home_decimal_odds,
        )
    } else {
        (
            TeamSide::Away,
            win_probability.away,
            1.0 - implied_home,
            consensus.away_decimal_odds,
        )
    };
    Some(MoneylineValue {
        side,
        model_probability,
        implied_probability,
        edge: model_probability - implied_probability,
        expected_value: odds.map(|d| model_probability * (d - 1.0) - (1.0 - model_probability)),
    })
}
