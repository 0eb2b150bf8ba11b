use serde::Serialize;
use statrs::distribution::{ContinuousCDF, Normal};

use crate::constants::MARGIN_STDDEV;

/// Win probability split for one game. `home + away == 1`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct WinProbability {
    pub home: f64,
    pub away: f64,
}

impl WinProbability {
    /// Probability split for a projected home margin.
    ///
    /// The final margin is modelled as normally distributed around the
    /// projection with a fixed standard deviation.
    pub fn from_margin(home_margin: f64, stddev: f64) -> Self {
        let home = home_win_probability(home_margin, stddev);
        WinProbability {
            home,
            away: 1.0 - home,
        }
    }
}

/// Probability that the home team wins given its projected margin.
///
/// A non-positive or non-finite `stddev` falls back to the default margin
/// deviation; a non-finite margin is treated as a pick'em.
///
/// # Arguments
/// * `home_margin` - Projected home points minus away points
/// * `stddev` - Standard deviation of the final margin
///
/// # Returns
/// Probability of a home win (0.0-1.0)
pub fn home_win_probability(home_margin: f64, stddev: f64) -> f64 {
    let stddev = if stddev.is_finite() && stddev > 0.0 {
        stddev
    } else {
        MARGIN_STDDEV
    };
    if !home_margin.is_finite() {
        return 0.5;
    }
    Normal::standard().cdf(home_margin / stddev)
}
