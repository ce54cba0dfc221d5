//! Power rankings for college divisions.
//!
//! Builds a weekly (or end-of-season) ranking from completed games: records, a
//! margin-based power rating, strength of schedule/victory, and a blended final score.

pub mod composite;
pub mod config;
pub mod error;
pub mod game_result;
pub mod rank;
pub mod ranker;
pub mod rating;
pub mod record;
pub mod schedule;
pub mod score;
pub mod solve;
pub mod store;
pub mod team;

pub use config::{generate_sample_config, Config};
pub use error::{RankError, Result};
pub use game_result::{CompositeEntry, Division, Game, Sport, TeamId, TeamSeason, UNRANKED_OPPONENT};
pub use ranker::{EngineOptions, RankedTeam, Ranker, Ranking, ResolvedRun, RunParams};
pub use rating::RatingMethod;
pub use store::{DataStore, MemoryStore};
pub use team::{Record, Team, TeamList};
