use thiserror::Error;

/// Errors that escape the prediction pipeline.
///
/// Missing statistics, zero denominators, malformed sportsbook quotes and
/// unfinished historical games are all absorbed where they occur. Only
/// input with no meaningful default ends up here.
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("no statistics or ratings of any kind for team: {team}")]
    UnknownTeam { team: String },

    #[error("matchup lists {team} as both home and away")]
    SameTeam { team: String },

    #[error("invalid model config: {0}")]
    InvalidConfig(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PredictionError>;
