//! Raw spread and total projection for a single matchup.

use serde::{Deserialize, Serialize};

use crate::config::ProjectionConfig;
use crate::rating::TeamRating;
use crate::win_prob::WinProbability;

/// One side of a matchup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TeamSide {
    Home,
    Away,
}

/// Point spread from the home team's perspective. Negative means the home
/// team is favored.
///
/// Model projections and market quotes are both converted into this type
/// before they meet, so the sign convention is checked once at the boundary
/// rather than assumed by every caller.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct HomeSpread(f64);

impl HomeSpread {
    /// `None` for non-finite values.
    pub fn new(value: f64) -> Option<Self> {
        value.is_finite().then_some(HomeSpread(value))
    }

    /// Spread for a projected home margin (home points minus away points).
    pub fn from_home_margin(margin: f64) -> Option<Self> {
        Self::new(-margin)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn home_margin(&self) -> f64 {
        -self.0
    }

    /// Favored side, `None` for a pick'em.
    pub fn favored(&self) -> Option<TeamSide> {
        if self.0 < 0.0 {
            Some(TeamSide::Home)
        } else if self.0 > 0.0 {
            Some(TeamSide::Away)
        } else {
            None
        }
    }
}

impl TryFrom<f64> for HomeSpread {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        HomeSpread::new(value).ok_or_else(|| format!("non-finite spread: {value}"))
    }
}

impl From<HomeSpread> for f64 {
    fn from(spread: HomeSpread) -> f64 {
        spread.0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    pub temperature_f: Option<f64>,
    pub wind_mph: Option<f64>,
    #[serde(default)]
    pub precipitation: bool,
}

impl Weather {
    /// True if any reading was actually reported.
    pub fn has_data(&self) -> bool {
        self.temperature_f.map_or(false, f64::is_finite)
            || self.wind_mph.map_or(false, f64::is_finite)
            || self.precipitation
    }
}

/// A game to predict. Built fresh per request.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Matchup {
    pub home_team: String,
    pub away_team: String,
    pub season: u16,
    pub week: u8,
    #[serde(default)]
    pub neutral_site: bool,
    #[serde(default)]
    pub conference_game: bool,
    #[serde(default)]
    pub home_rest_days: Option<u8>,
    #[serde(default)]
    pub away_rest_days: Option<u8>,
    /// Only its presence is used, as a data-quality signal
    #[serde(default)]
    pub weather: Option<Weather>,
}

impl Matchup {
    pub fn new(home_team: &str, away_team: &str, season: u16, week: u8) -> Self {
        Matchup {
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            season,
            week,
            neutral_site: false,
            conference_game: false,
            home_rest_days: None,
            away_rest_days: None,
            weather: None,
        }
    }

    /// The same game with home and away labels exchanged.
    pub fn swapped(&self) -> Self {
        Matchup {
            home_team: self.away_team.clone(),
            away_team: self.home_team.clone(),
            home_rest_days: self.away_rest_days,
            away_rest_days: self.home_rest_days,
            ..self.clone()
        }
    }

    /// Whether a usable weather report came with the matchup.
    pub fn has_weather(&self) -> bool {
        self.weather.as_ref().map_or(false, Weather::has_data)
    }
}

/// Contributions to the projected home margin, in points.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct MarginComponents {
    pub rating: f64,
    pub home_field: f64,
    pub rest: f64,
    pub conference: f64,
}

/// Uncalibrated projection. No rounding is applied.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Projection {
    pub spread: HomeSpread,
    pub total: f64,
    pub win_probability: WinProbability,
    pub components: MarginComponents,
}

impl Projection {
    pub fn home_margin(&self) -> f64 {
        self.spread.home_margin()
    }

    /// Implied (home, away) points.
    pub fn implied_scores(&self) -> (f64, f64) {
        let margin = self.home_margin();
        ((self.total + margin) / 2.0, (self.total - margin) / 2.0)
    }
}

/// Project spread, total and win probability from two team ratings.
///
/// # Arguments
/// * `home` - Rating of the home (or designated home) team
/// * `away` - Rating of the away team
/// * `matchup` - Neutral site, conference and rest context
/// * `config` - Projection constants
///
/// # Returns
/// Unrounded projection with the margin broken into its components
pub fn project_matchup(
    home: &TeamRating,
    away: &TeamRating,
    matchup: &Matchup,
    config: &ProjectionConfig,
) -> Projection {
    let mut components = MarginComponents {
        rating: (home.power_rating - away.power_rating) * config.points_per_rating_unit,
        home_field: if matchup.neutral_site {
            0.0
        } else {
            config.home_field_advantage
        },
        ..Default::default()
    };

    if let (Some(h), Some(a)) = (matchup.home_rest_days, matchup.away_rest_days) {
        let cap = config.max_rest_advantage_days;
        let advantage = (h as f64 - a as f64).clamp(-cap, cap);
        components.rest = advantage * config.rest_points_per_day;
    }

    let mut margin = components.rating + components.home_field + components.rest;
    if !margin.is_finite() {
        margin = 0.0;
    }

    // Conference familiarity narrows the margin without flipping the favorite.
    if matchup.conference_game {
        let shrink = config.conference_game_shrink.min(margin.abs());
        components.conference = -shrink * margin.signum();
        margin += components.conference;
    }

    let spread = HomeSpread::from_home_margin(margin).unwrap_or(HomeSpread(0.0));

    let mut total = config.baseline_total
        + config.offense_total_scale * (home.offense_rating + away.offense_rating)
        - config.defense_total_scale * (home.defense_rating + away.defense_rating);
    if !total.is_finite() {
        total = config.baseline_total;
    }
    let total = total.max(2.0 * config.min_team_score);

    Projection {
        spread,
        total,
        win_probability: WinProbability::from_margin(margin, config.margin_stddev),
        components,
    }
}
