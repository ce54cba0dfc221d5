// Working set for one ranking run: one Team per ranked team, filled in place by each stage.

use fnv::FnvHashMap;
use serde::Serialize;

use crate::game_result::{TeamId, TeamSeason};

/// Win/loss/tie counts plus the smoothed win rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Record {
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub rate: f64,
}

impl Record {
    pub fn games(&self) -> u32 {
        self.wins + self.losses + self.ties
    }
}

/// A ranked team and every metric computed for it during a run
#[derive(Debug, Clone, Default, Serialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub conference: Option<String>,
    pub year: i32,
    pub week: u32,
    pub postseason: bool,

    pub record: Record,

    pub rating: f64,
    pub rating_norm: f64,
    pub rating_rank: u32,

    pub sos: f64,
    pub sos_norm: f64,
    pub sos_rank: u32,

    pub sov: f64,
    pub sov_norm: f64,
    pub sov_rank: u32,

    /// Composite rating as supplied; `composite_average` is carried alongside unranked
    pub composite: f64,
    pub composite_average: f64,
    pub composite_norm: f64,
    pub composite_rank: u32,

    pub final_score: f64,
    pub final_rank: u32,
}

impl Team {
    pub fn new(season: &TeamSeason, week: u32, postseason: bool) -> Self {
        Team {
            id: season.team_id,
            name: season.name.clone(),
            conference: season.conference.clone(),
            year: season.year,
            week,
            postseason,
            ..Default::default()
        }
    }
}

/// All teams in scope for one run, keyed by id
#[derive(Debug, Clone, Default)]
pub struct TeamList {
    teams: FnvHashMap<TeamId, Team>,
}

impl TeamList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, team: Team) {
        self.teams.insert(team.id, team);
    }

    pub fn get(&self, id: TeamId) -> Option<&Team> {
        self.teams.get(&id)
    }

    pub fn get_mut(&mut self, id: TeamId) -> Option<&mut Team> {
        self.teams.get_mut(&id)
    }

    pub fn contains(&self, id: TeamId) -> bool {
        self.teams.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    /// Team ids in ascending order; every order-sensitive computation iterates this
    pub fn sorted_ids(&self) -> Vec<TeamId> {
        let mut ids: Vec<TeamId> = self.teams.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn iter(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Team> {
        self.teams.values_mut()
    }

    /// Find team by name (case-insensitive partial match), lowest id first
    pub fn find_by_name(&self, name: &str) -> Option<&Team> {
        let name_lower = name.to_lowercase();
        self.sorted_ids()
            .into_iter()
            .filter_map(|id| self.teams.get(&id))
            .find(|t| t.name.to_lowercase().contains(&name_lower))
    }
}

impl FromIterator<Team> for TeamList {
    fn from_iter<I: IntoIterator<Item = Team>>(iter: I) -> Self {
        let mut list = TeamList::new();
        for team in iter {
            list.insert(team);
        }
        list
    }
}
