//! Immutable per-refresh snapshot of everything the pipeline reads.
//!
//! A context is built once per refresh cycle (typically once per week),
//! then shared by reference across every prediction in that cycle. A new
//! refresh builds a new context; nothing mutates one in place, so parallel
//! readers never observe a partial update.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::config::ModelConfig;
use crate::error::{PredictionError, Result};
use crate::normalize::{normalize_stats, NormalizedMetrics};
use crate::rating::{aggregate_rating, TeamRating};
use crate::team::{CoachingVsRanked, ExternalRatings, TeamSeasonStats};

/// Identifies the data a context was built from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SnapshotVersion {
    pub season: u16,
    pub week: u8,
    /// Bumped when the same week is refreshed again
    pub revision: u32,
}

impl SnapshotVersion {
    pub fn new(season: u16, week: u8) -> Self {
        SnapshotVersion {
            season,
            week,
            revision: 0,
        }
    }
}

/// Team inputs for one refresh, keyed by team name.
#[derive(Clone, Debug, Default)]
pub struct ContextBuilder {
    stats: HashMap<String, TeamSeasonStats>,
    ratings: HashMap<String, ExternalRatings>,
    coaching: HashMap<String, CoachingVsRanked>,
    config: ModelConfig,
}

impl ContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: ModelConfig) -> Self {
        self.config = config;
        self
    }

    pub fn stats(mut self, stats: impl IntoIterator<Item = TeamSeasonStats>) -> Self {
        for s in stats {
            self.stats.insert(s.team.clone(), s);
        }
        self
    }

    pub fn ratings(mut self, ratings: impl IntoIterator<Item = (String, ExternalRatings)>) -> Self {
        self.ratings.extend(ratings);
        self
    }

    pub fn coaching(mut self, records: impl IntoIterator<Item = (String, CoachingVsRanked)>) -> Self {
        self.coaching.extend(records);
        self
    }

    /// Validate the config and rate every team that has any data at all.
    pub fn build(self, version: SnapshotVersion) -> Result<PredictionContext> {
        self.config.validate()?;

        let mut names: Vec<&String> = self
            .stats
            .keys()
            .chain(self.ratings.keys())
            .chain(self.coaching.keys())
            .collect();
        names.sort();
        names.dedup();

        let mut teams = HashMap::with_capacity(names.len());
        for name in names {
            let stats = self.stats.get(name);
            let external = self.ratings.get(name);
            let coaching = self.coaching.get(name);

            let has_data = stats.map_or(false, TeamSeasonStats::has_any_data)
                || external.map_or(false, ExternalRatings::has_any)
                || coaching.map_or(false, |c| c.games() > 0);
            if !has_data {
                debug!(team = %name, "no usable data, team left unrated");
                continue;
            }

            let metrics = match stats {
                Some(s) => normalize_stats(s),
                None => normalize_stats(&TeamSeasonStats::new(name, version.season)),
            };
            let rating = aggregate_rating(&metrics, external, coaching, &self.config.aggregation);
            teams.insert(name.clone(), RatedTeam { metrics, rating });
        }

        Ok(PredictionContext {
            version,
            config: self.config,
            teams,
        })
    }
}

/// Normalized metrics and rating computed for one team at build time.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RatedTeam {
    pub metrics: NormalizedMetrics,
    pub rating: TeamRating,
}

#[derive(Clone, Debug)]
pub struct PredictionContext {
    version: SnapshotVersion,
    config: ModelConfig,
    teams: HashMap<String, RatedTeam>,
}

impl PredictionContext {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::new()
    }

    pub fn version(&self) -> SnapshotVersion {
        self.version
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn team(&self, name: &str) -> Result<&RatedTeam> {
        self.teams.get(name).ok_or_else(|| PredictionError::UnknownTeam {
            team: name.to_string(),
        })
    }

    pub fn rating(&self, name: &str) -> Result<&TeamRating> {
        self.team(name).map(|t| &t.rating)
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }
}
