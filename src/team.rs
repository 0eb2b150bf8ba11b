//! Per-team inputs handed to the pipeline by the data collaborators.
//!
//! Every raw field is optional. Neutral defaults for missing values live in
//! `constants` and are applied by the normalizer, not here.

use serde::{Deserialize, Serialize};

use crate::constants::{
    TIER_MULTIPLIER_MAX, TIER_MULTIPLIER_TOP10, TIER_MULTIPLIER_TOP25, TIER_MULTIPLIER_TOP5,
};

/// Raw season-to-date statistics for one team, as of one week.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TeamSeasonStats {
    pub team: String,
    pub season: u16,

    pub games: Option<f64>,
    pub total_yards: Option<f64>,
    pub pass_attempts: Option<f64>,
    pub pass_completions: Option<f64>,
    #[serde(alias = "netPassingYards")]
    pub passing_yards: Option<f64>,
    pub rush_attempts: Option<f64>,
    pub rushing_yards: Option<f64>,
    pub third_downs: Option<f64>,
    pub third_down_conversions: Option<f64>,
    /// Giveaways (interceptions thrown plus fumbles lost)
    pub turnovers: Option<f64>,
    /// Interceptions plus fumbles recovered
    pub takeaways: Option<f64>,
    pub penalty_yards: Option<f64>,
    /// Total time of possession in seconds
    pub possession_time: Option<f64>,
    pub kick_returns: Option<f64>,
    pub kick_return_yards: Option<f64>,
    pub punt_returns: Option<f64>,
    pub punt_return_yards: Option<f64>,

    #[serde(alias = "offense_ppa")]
    pub offense_ppa: Option<f64>,
    #[serde(alias = "offense_successRate")]
    pub offense_success_rate: Option<f64>,
    #[serde(alias = "offense_explosiveness")]
    pub offense_explosiveness: Option<f64>,
    #[serde(alias = "offense_pointsPerOpportunity")]
    pub offense_points_per_opportunity: Option<f64>,
    /// Average starting field position, yards from own goal line
    #[serde(alias = "offense_fieldPosition.averageStart")]
    pub offense_field_position: Option<f64>,

    #[serde(alias = "defense_ppa")]
    pub defense_ppa: Option<f64>,
    #[serde(alias = "defense_successRate")]
    pub defense_success_rate: Option<f64>,
    #[serde(alias = "defense_explosiveness")]
    pub defense_explosiveness: Option<f64>,
    #[serde(alias = "defense_pointsPerOpportunity")]
    pub defense_points_per_opportunity: Option<f64>,
    /// Average starting field position allowed to opponents
    #[serde(alias = "defense_fieldPosition.averageStart")]
    pub defense_field_position: Option<f64>,
    /// Havoc rate, when the provider reports it directly
    #[serde(alias = "defense_havoc.total")]
    pub defense_havoc_rate: Option<f64>,
    /// Raw havoc plays, used with `defensive_plays` when no rate is given
    pub havoc_events: Option<f64>,
    pub defensive_plays: Option<f64>,
}

impl TeamSeasonStats {
    pub fn new(team: &str, season: u16) -> Self {
        TeamSeasonStats {
            team: team.to_string(),
            season,
            ..Default::default()
        }
    }

    /// True if at least one raw statistic is present and finite.
    pub fn has_any_data(&self) -> bool {
        self.raw_fields().iter().any(|v| v.map_or(false, f64::is_finite))
    }

    /// True if both offensive and defensive PPA are present and finite.
    pub fn has_core_efficiency(&self) -> bool {
        [self.offense_ppa, self.defense_ppa]
            .iter()
            .all(|v| v.map_or(false, f64::is_finite))
    }

    fn raw_fields(&self) -> [Option<f64>; 30] {
        [
            self.games,
            self.total_yards,
            self.pass_attempts,
            self.pass_completions,
            self.passing_yards,
            self.rush_attempts,
            self.rushing_yards,
            self.third_downs,
            self.third_down_conversions,
            self.turnovers,
            self.takeaways,
            self.penalty_yards,
            self.possession_time,
            self.kick_returns,
            self.kick_return_yards,
            self.punt_returns,
            self.punt_return_yards,
            self.offense_ppa,
            self.offense_success_rate,
            self.offense_explosiveness,
            self.offense_points_per_opportunity,
            self.offense_field_position,
            self.defense_ppa,
            self.defense_success_rate,
            self.defense_explosiveness,
            self.defense_points_per_opportunity,
            self.defense_field_position,
            self.defense_havoc_rate,
            self.havoc_events,
            self.defensive_plays,
        ]
    }
}

/// External composite ratings for one team.
///
/// ELO and talent are on their native scales; FPI, SP+ overall and SRS are
/// points above an average team. SP+ offense and defense are points per
/// game scored and allowed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalRatings {
    pub elo: Option<f64>,
    pub fpi: Option<f64>,
    pub sp_overall: Option<f64>,
    pub sp_offense: Option<f64>,
    pub sp_defense: Option<f64>,
    pub srs: Option<f64>,
    pub talent: Option<f64>,
}

impl ExternalRatings {
    pub fn has_any(&self) -> bool {
        [
            self.elo,
            self.fpi,
            self.sp_overall,
            self.sp_offense,
            self.sp_defense,
            self.srs,
            self.talent,
        ]
        .iter()
        .any(|v| v.map_or(false, f64::is_finite))
    }
}

/// Opponent rank bucket for records against ranked teams.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RankTier {
    Top5,
    Top10,
    Top25,
}

impl RankTier {
    /// Credit per win relative to a win over a 11-25 ranked opponent.
    pub fn multiplier(&self) -> f64 {
        match self {
            RankTier::Top5 => TIER_MULTIPLIER_TOP5,
            RankTier::Top10 => TIER_MULTIPLIER_TOP10,
            RankTier::Top25 => TIER_MULTIPLIER_TOP25,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TierRecord {
    pub tier: RankTier,
    pub wins: u32,
    pub losses: u32,
}

/// A head coach's record against ranked opponents.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoachingVsRanked {
    pub coach: String,
    pub records: Vec<TierRecord>,
}

impl CoachingVsRanked {
    pub fn games(&self) -> u64 {
        self.records
            .iter()
            .map(|r| u64::from(r.wins) + u64::from(r.losses))
            .sum()
    }

    /// Win percentage with each win weighted by its tier multiplier, scaled
    /// by the largest multiplier so the result stays in [0, 1].
    ///
    /// # Returns
    /// 1.0 only for an unbeaten record against top-5 opponents, `None` when
    /// no ranked games were played
    pub fn tier_adjusted_win_pct(&self) -> Option<f64> {
        let games = self.games();
        if games == 0 {
            return None;
        }
        let credit: f64 = self
            .records
            .iter()
            .map(|r| r.wins as f64 * r.tier.multiplier())
            .sum();
        Some(credit / (games as f64 * TIER_MULTIPLIER_MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stats_have_no_data() {
        let stats = TeamSeasonStats::new("Nowhere State", 2024);
        assert!(!stats.has_any_data());
        assert!(!stats.has_core_efficiency());
    }

    #[test]
    fn test_deserialize_provider_field_names() {
        let raw = r#"{
            "team": "Georgia",
            "season": 2024,
            "games": 12,
            "passAttempts": 380,
            "offense_ppa": 0.31,
            "offense_successRate": 0.47,
            "defense_havoc.total": 0.19
        }"#;
        let stats: TeamSeasonStats = serde_json::from_str(raw).unwrap();
        assert_eq!(stats.pass_attempts, Some(380.0));
        assert_eq!(stats.offense_ppa, Some(0.31));
        assert_eq!(stats.offense_success_rate, Some(0.47));
        assert_eq!(stats.defense_havoc_rate, Some(0.19));
        assert!(stats.has_any_data());
    }

    #[test]
    fn test_tier_adjusted_win_pct() {
        let record = CoachingVsRanked {
            coach: "Coach".to_string(),
            records: vec![
                TierRecord { tier: RankTier::Top5, wins: 1, losses: 1 },
                TierRecord { tier: RankTier::Top25, wins: 2, losses: 0 },
            ],
        };
        let pct = record.tier_adjusted_win_pct().unwrap();
        assert!((pct - (1.3 + 2.0) / (4.0 * 1.3)).abs() < 1e-12);
        assert_eq!(CoachingVsRanked::default().tier_adjusted_win_pct(), None);
    }

    #[test]
    fn test_unbeaten_against_top5_beats_unbeaten_against_top25() {
        let unbeaten = |tier| CoachingVsRanked {
            coach: "Coach".to_string(),
            records: vec![TierRecord { tier, wins: 4, losses: 0 }],
        };
        let top5 = unbeaten(RankTier::Top5).tier_adjusted_win_pct().unwrap();
        let top25 = unbeaten(RankTier::Top25).tier_adjusted_win_pct().unwrap();
        assert!((top5 - 1.0).abs() < 1e-12, "Unbeaten against the top 5 is the best record");
        assert!(top25 < top5, "Tier should still separate unbeaten records");
    }

    #[test]
    fn test_game_count_does_not_overflow() {
        let record = CoachingVsRanked {
            coach: "Ironman".to_string(),
            records: vec![
                TierRecord { tier: RankTier::Top5, wins: u32::MAX, losses: u32::MAX },
                TierRecord { tier: RankTier::Top10, wins: 1, losses: 0 },
            ],
        };
        assert_eq!(record.games(), 2 * u64::from(u32::MAX) + 1);
        let pct = record.tier_adjusted_win_pct().unwrap();
        assert!(pct.is_finite() && (0.0..=1.0).contains(&pct));
    }

    #[test]
    fn test_non_finite_stats_are_not_data() {
        let mut stats = TeamSeasonStats::new("Ghost", 2024);
        stats.offense_ppa = Some(f64::NAN);
        stats.games = Some(f64::INFINITY);
        assert!(!stats.has_any_data(), "NaN and infinite fields carry no information");
        stats.games = Some(4.0);
        assert!(stats.has_any_data());
    }

    #[test]
    fn test_ratings_ignore_non_finite() {
        let ratings = ExternalRatings { fpi: Some(f64::NAN), ..Default::default() };
        assert!(!ratings.has_any());
    }
}
