// Data-access seam for the ranking engine.
// The engine only ever reads games, team seasons and composite ratings through `DataStore`;
// `MemoryStore` is the bundled implementation, filled from CSV exports or built directly in tests.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::error::Result;
use crate::game_result::{CompositeEntry, Division, Game, Sport, TeamSeason};

/// Read-only queries the ranking engine issues against persisted game and team data
pub trait DataStore {
    /// Most recent season year with any team registered for the sport
    fn max_season_year(&self, sport: Sport) -> Result<Option<i32>>;

    /// Latest game (by kickoff) at or before `time`
    fn latest_game_at_or_before(&self, sport: Sport, time: DateTime<Utc>) -> Result<Option<Game>>;

    /// Earliest game (by kickoff) of the given season week
    fn earliest_game_of_week(&self, sport: Sport, year: i32, week: u32) -> Result<Option<Game>>;

    /// Games of seasons `from_year` onward kicking off at or before `through`, newest first
    fn games_in_season_range(
        &self,
        sport: Sport,
        from_year: i32,
        through: DateTime<Utc>,
    ) -> Result<Vec<Game>>;

    /// Team seasons registered in one division tier
    fn teams_in_division(
        &self,
        sport: Sport,
        year: i32,
        division: Division,
    ) -> Result<Vec<TeamSeason>>;

    /// Composite ratings for a year; stores without a composite source return nothing
    fn composite_ratings(&self, _year: i32) -> Result<Vec<CompositeEntry>> {
        Ok(Vec::new())
    }

    /// Every team registered for the season, across both tiers where the sport has them
    fn season_teams(&self, sport: Sport, year: i32) -> Result<Vec<TeamSeason>> {
        let mut teams = self.teams_in_division(sport, year, Division::Top)?;
        if sport.has_tier_split() {
            teams.extend(self.teams_in_division(sport, year, Division::Lower)?);
        }
        Ok(teams)
    }
}

/// In-memory store over plain vectors
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub games: Vec<Game>,
    pub teams: Vec<TeamSeason>,
    pub composites: Vec<CompositeEntry>,
}

impl MemoryStore {
    pub fn new(games: Vec<Game>, teams: Vec<TeamSeason>) -> Self {
        MemoryStore {
            games,
            teams,
            composites: Vec::new(),
        }
    }

    pub fn with_composites(mut self, composites: Vec<CompositeEntry>) -> Self {
        self.composites = composites;
        self
    }

    /// Load a store from headered CSV exports
    pub fn from_csv<P: AsRef<Path>>(games: P, teams: P, composites: Option<P>) -> Result<Self> {
        let games: Vec<Game> = read_csv(games.as_ref())?;
        let teams: Vec<TeamSeason> = read_csv(teams.as_ref())?;
        let composites: Vec<CompositeEntry> = match composites {
            Some(path) => read_csv(path.as_ref())?,
            None => Vec::new(),
        };
        info!(
            games = games.len(),
            teams = teams.len(),
            composites = composites.len(),
            "loaded CSV data"
        );
        Ok(MemoryStore {
            games,
            teams,
            composites,
        })
    }
}

fn read_csv<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<Vec<T>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        rows.push(result?);
    }
    Ok(rows)
}

impl DataStore for MemoryStore {
    fn max_season_year(&self, sport: Sport) -> Result<Option<i32>> {
        Ok(self
            .teams
            .iter()
            .filter(|t| t.sport == sport)
            .map(|t| t.year)
            .chain(self.games.iter().filter(|g| g.sport == sport).map(|g| g.season))
            .max())
    }

    fn latest_game_at_or_before(&self, sport: Sport, time: DateTime<Utc>) -> Result<Option<Game>> {
        Ok(self
            .games
            .iter()
            .filter(|g| g.sport == sport && g.kickoff <= time)
            .max_by_key(|g| g.kickoff)
            .cloned())
    }

    fn earliest_game_of_week(&self, sport: Sport, year: i32, week: u32) -> Result<Option<Game>> {
        Ok(self
            .games
            .iter()
            .filter(|g| g.sport == sport && g.season == year && g.week == week)
            .min_by_key(|g| g.kickoff)
            .cloned())
    }

    fn games_in_season_range(
        &self,
        sport: Sport,
        from_year: i32,
        through: DateTime<Utc>,
    ) -> Result<Vec<Game>> {
        let mut games: Vec<Game> = self
            .games
            .iter()
            .filter(|g| g.sport == sport && g.season >= from_year && g.kickoff <= through)
            .cloned()
            .collect();
        games.sort_by(|a, b| b.kickoff.cmp(&a.kickoff));
        Ok(games)
    }

    fn teams_in_division(
        &self,
        sport: Sport,
        year: i32,
        division: Division,
    ) -> Result<Vec<TeamSeason>> {
        let division = division.effective(sport);
        Ok(self
            .teams
            .iter()
            .filter(|t| {
                t.sport == sport && t.year == year && t.division.effective(sport) == division
            })
            .cloned()
            .collect())
    }

    fn composite_ratings(&self, year: i32) -> Result<Vec<CompositeEntry>> {
        Ok(self.composites.iter().filter(|c| c.year == year).cloned().collect())
    }
}
