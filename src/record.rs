// Record calculator: wins, losses and ties per team from games up to the run cutoff,
// plus the win rate the final score blends in.

use fnv::FnvHashSet;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::game_result::{Game, TeamId};
use crate::ranker::ResolvedRun;
use crate::team::{Record, TeamList};

/// How a record turns into a rate
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordFormula {
    /// `(1 + W + T/2) / (2 + W + L + T)`: one phantom win and one phantom loss
    #[default]
    Smoothed,
    /// Legacy `W / (W + L)` with ties dropped
    Unsmoothed,
}

impl RecordFormula {
    pub fn rate(&self, wins: u32, losses: u32, ties: u32) -> f64 {
        match self {
            RecordFormula::Smoothed => {
                (1.0 + wins as f64 + 0.5 * ties as f64) / (2.0 + (wins + losses + ties) as f64)
            }
            RecordFormula::Unsmoothed => {
                if wins + losses == 0 {
                    0.5
                } else {
                    wins as f64 / (wins + losses) as f64
                }
            }
        }
    }
}

/// Games that count toward records: the run's season, at or before the cutoff,
/// with both sides registered for that season.
pub fn counted_games<'g>(
    games: &'g [Game],
    registered: &'g FnvHashSet<TeamId>,
    run: &ResolvedRun,
) -> impl Iterator<Item = &'g Game> + 'g {
    let year = run.year;
    let cutoff = run.start_time;
    games.iter().filter(move |g| {
        g.season == year
            && g.kickoff <= cutoff
            && registered.contains(&g.home_team_id)
            && registered.contains(&g.away_team_id)
    })
}

/// Fill `record` on every team in the list
pub fn calculate_records(
    teams: &mut TeamList,
    games: &[Game],
    registered: &FnvHashSet<TeamId>,
    run: &ResolvedRun,
    formula: RecordFormula,
) {
    for team in teams.iter_mut() {
        team.record = Record::default();
    }

    let mut counted = 0usize;
    for game in counted_games(games, registered, run) {
        counted += 1;
        let (home, away) = (game.home_team_id, game.away_team_id);
        if game.is_tie() {
            for id in [home, away] {
                if let Some(team) = teams.get_mut(id) {
                    team.record.ties += 1;
                }
            }
            continue;
        }
        let (winner, loser) = if game.home_won() { (home, away) } else { (away, home) };
        if let Some(team) = teams.get_mut(winner) {
            team.record.wins += 1;
        }
        if let Some(team) = teams.get_mut(loser) {
            team.record.losses += 1;
        }
    }

    for team in teams.iter_mut() {
        let r = &mut team.record;
        r.rate = formula.rate(r.wins, r.losses, r.ties);
    }

    info!(teams = teams.len(), games = counted, ?formula, "records calculated");
}
