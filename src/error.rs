use thiserror::Error;

use crate::game_result::Sport;

/// Failures that abort a ranking run
#[derive(Error, Debug)]
pub enum RankError {
    /// Data-access failure reported by the store, passed through unchanged
    #[error("data store error: {0}")]
    Store(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("no seasons found for {0}")]
    NoSeasons(Sport),
}

pub type Result<T> = std::result::Result<T, RankError>;
