// This module defines the read-only facts a ranking run is built from:
// completed games, team season membership, and externally supplied composite ratings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric team identifier as supplied by the data provider
pub type TeamId = u32;

/// Stand-in id for opponents outside the ranked universe (exhibition or other-tier teams)
pub const UNRANKED_OPPONENT: TeamId = 0;

/// Sport being ranked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sport {
    Football,
    Basketball,
}

impl Sport {
    /// Football splits into FBS/FCS; basketball is ranked as a single tier
    pub fn has_tier_split(&self) -> bool {
        matches!(self, Sport::Football)
    }
}

impl fmt::Display for Sport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Sport::Football => write!(f, "football"),
            Sport::Basketball => write!(f, "basketball"),
        }
    }
}

/// Division tier selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Division {
    /// FBS in football, the whole field elsewhere
    Top,
    /// FCS in football
    Lower,
}

impl Division {
    /// The tier actually used for a sport; sports without a split always rank the top tier
    pub fn effective(self, sport: Sport) -> Division {
        if sport.has_tier_split() {
            self
        } else {
            Division::Top
        }
    }

    pub fn is_top(&self) -> bool {
        matches!(self, Division::Top)
    }
}

impl fmt::Display for Division {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Division::Top => write!(f, "top"),
            Division::Lower => write!(f, "lower"),
        }
    }
}

/// Represents the result of a single completed game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Game {
    pub sport: Sport,
    pub home_team_id: TeamId,
    pub away_team_id: TeamId,
    pub home_score: u32,
    pub away_score: u32,
    pub season: i32,
    pub week: u32,
    #[serde(default)]
    pub postseason: bool,
    #[serde(default)]
    pub conference_game: bool,
    pub kickoff: DateTime<Utc>,
}

impl Game {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sport: Sport,
        home_team_id: TeamId,
        away_team_id: TeamId,
        home_score: u32,
        away_score: u32,
        season: i32,
        week: u32,
        kickoff: DateTime<Utc>,
    ) -> Self {
        Game {
            sport,
            home_team_id,
            away_team_id,
            home_score,
            away_score,
            season,
            week,
            postseason: false,
            conference_game: false,
            kickoff,
        }
    }

    /// Home score minus away score
    pub fn home_margin(&self) -> i64 {
        self.home_score as i64 - self.away_score as i64
    }

    /// Point margin from `team`'s side of the game
    pub fn margin_for(&self, team: TeamId) -> i64 {
        if team == self.home_team_id {
            self.home_margin()
        } else {
            -self.home_margin()
        }
    }

    /// The other team in the game
    pub fn opponent_of(&self, team: TeamId) -> TeamId {
        if team == self.home_team_id {
            self.away_team_id
        } else {
            self.home_team_id
        }
    }

    pub fn involves(&self, team: TeamId) -> bool {
        self.home_team_id == team || self.away_team_id == team
    }

    /// Returns true if the home team won
    pub fn home_won(&self) -> bool {
        self.home_score > self.away_score
    }

    pub fn is_tie(&self) -> bool {
        self.home_score == self.away_score
    }
}

/// One team's registration for a season
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamSeason {
    pub team_id: TeamId,
    pub name: String,
    #[serde(default)]
    pub conference: Option<String>,
    pub sport: Sport,
    pub year: i32,
    pub division: Division,
}

/// Externally supplied composite (recruiting/talent) rating for a team-year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeEntry {
    pub team_id: TeamId,
    pub year: i32,
    pub average: f64,
    pub rating: f64,
}
