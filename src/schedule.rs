// Strength of schedule (SOS) and strength of victory (SOV).
// Opponents' win totals are gathered one hop out, then propagated a second hop so
// opponents-of-opponents count too, with direct opponents weighted more heavily.

use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::game_result::{Game, TeamId};
use crate::rank::{rank_and_normalize, Metric};
use crate::team::TeamList;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMethod {
    /// Opponents plus opponents' opponents
    #[default]
    TwoStage,
    /// Legacy: opponents only
    SinglePass,
}

/// Relative weight of direct opponents against opponents' opponents
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleWeights {
    pub direct: f64,
    pub indirect: f64,
}

impl Default for ScheduleWeights {
    fn default() -> Self {
        ScheduleWeights {
            direct: 2.0,
            indirect: 1.0,
        }
    }
}

/// Opponent totals for one team
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OpponentTotals {
    /// Opponents' season wins
    pub wins: f64,
    /// Opponents' season games; unranked opponents add one game each
    pub games: f64,
    /// Season wins of the opponents this team beat
    pub victory_wins: f64,
}

/// Opponent totals of every team in the list over `games`
pub fn one_hop(teams: &TeamList, games: &[Game]) -> FnvHashMap<TeamId, OpponentTotals> {
    let mut totals: FnvHashMap<TeamId, OpponentTotals> =
        teams.iter().map(|t| (t.id, OpponentTotals::default())).collect();

    for game in games {
        for side in [game.home_team_id, game.away_team_id] {
            let Some(entry) = totals.get_mut(&side) else {
                continue;
            };
            match teams.get(game.opponent_of(side)) {
                Some(opponent) => {
                    let wins = opponent.record.wins as f64;
                    entry.wins += wins;
                    entry.games += opponent.record.games() as f64;
                    if game.margin_for(side) > 0 {
                        entry.victory_wins += wins;
                    }
                }
                None => entry.games += 1.0,
            }
        }
    }
    totals
}

/// Sum of the opponents' own one-hop totals, once per game played against them
pub fn two_hop(
    teams: &TeamList,
    games: &[Game],
    first: &FnvHashMap<TeamId, OpponentTotals>,
) -> FnvHashMap<TeamId, OpponentTotals> {
    let mut totals: FnvHashMap<TeamId, OpponentTotals> =
        teams.iter().map(|t| (t.id, OpponentTotals::default())).collect();

    for game in games {
        for side in [game.home_team_id, game.away_team_id] {
            let Some(entry) = totals.get_mut(&side) else {
                continue;
            };
            if let Some(opponent) = first.get(&game.opponent_of(side)) {
                entry.wins += opponent.wins;
                entry.games += opponent.games;
                entry.victory_wins += opponent.victory_wins;
            }
        }
    }
    totals
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Fill SOS and SOV for every team from this season's games, then rank and normalize both.
/// Records must already be calculated.
pub fn calculate_schedule_strength(
    teams: &mut TeamList,
    games: &[Game],
    method: ScheduleMethod,
    weights: ScheduleWeights,
) {
    let first = one_hop(teams, games);
    let second = match method {
        ScheduleMethod::TwoStage => two_hop(teams, games, &first),
        ScheduleMethod::SinglePass => FnvHashMap::default(),
    };

    for team in teams.iter_mut() {
        let o = first.get(&team.id).copied().unwrap_or_default();
        let oo = second.get(&team.id).copied().unwrap_or_default();
        let (sos, sov) = match method {
            ScheduleMethod::TwoStage => {
                let games = weights.direct * o.games + weights.indirect * oo.games;
                (
                    ratio(weights.direct * o.wins + weights.indirect * oo.wins, games),
                    ratio(
                        weights.direct * o.victory_wins + weights.indirect * oo.victory_wins,
                        games,
                    ),
                )
            }
            ScheduleMethod::SinglePass => (ratio(o.wins, o.games), ratio(o.victory_wins, o.games)),
        };
        team.sos = sos;
        team.sov = sov;
    }

    let ids = teams.sorted_ids();
    rank_and_normalize(teams, &ids, Metric::Sos);
    rank_and_normalize(teams, &ids, Metric::Sov);
    info!(teams = ids.len(), games = games.len(), ?method, "schedule strength calculated");
}
