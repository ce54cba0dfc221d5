// This module implements the point-based power rating.
// The active method is an SRS-style fixed point: a team's rating is its average (clamped)
// margin plus the average rating of its opponents, iterated until it settles.
// The direct least-squares method solves the same relation in one shot and is kept
// selectable for reproducing older rankings. A run uses exactly one of them.

use fnv::FnvHashMap;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::game_result::{Game, TeamId, UNRANKED_OPPONENT};
use crate::rank::{rank_and_normalize, Metric};
use crate::ranker::ResolvedRun;
use crate::solve::{least_squares, recenter};
use crate::team::TeamList;

/// Which rating algorithm a run uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatingMethod {
    #[default]
    Iterative,
    LeastSquares,
}

/// Tunables for both rating methods
#[derive(Debug, Clone, PartialEq)]
pub struct RatingParams {
    pub min_divisional_games: usize,
    pub margin_floor: i64,
    pub margin_ceiling: i64,
    pub max_iterations: usize,
    pub tolerance: f64,
    pub clamp_stddevs: f64,
    pub lookback_seasons: i32,
}

impl Default for RatingParams {
    fn default() -> Self {
        RatingParams {
            min_divisional_games: 6,
            margin_floor: 7,
            margin_ceiling: 24,
            max_iterations: 10_000,
            tolerance: 1e-9,
            clamp_stddevs: 1.5,
            lookback_seasons: 2,
        }
    }
}

/// One game from a team's side
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameEntry {
    /// Opponent id, or `UNRANKED_OPPONENT` for teams outside the ranked universe
    pub opponent: TeamId,
    pub margin: f64,
}

/// Per-team game entries, ordered by team id
pub type GameSet = BTreeMap<TeamId, Vec<GameEntry>>;

/// Raise any non-zero margin to at least `floor` and cap it at `ceiling`, keeping the sign
pub fn clamp_margin(margin: i64, floor: i64, ceiling: i64) -> i64 {
    match margin {
        0 => 0,
        m if m > 0 => m.clamp(floor, ceiling),
        m => m.clamp(-ceiling, -floor),
    }
}

/// Cap the magnitude of a margin, keeping the sign
pub fn cap_margin(margin: f64, cap: f64) -> f64 {
    margin.signum() * margin.abs().min(cap)
}

/// Game set for the fixed-point method.
///
/// `games` must be newest first. Every current-season game counts; prior-season games are
/// pulled in for a team only while it has fewer than `min_divisional_games` games against
/// ranked opponents. Opponents outside the list are recorded as `UNRANKED_OPPONENT`.
pub fn build_game_set(
    games: &[Game],
    teams: &TeamList,
    year: i32,
    params: &RatingParams,
) -> GameSet {
    let mut set: GameSet = teams.sorted_ids().into_iter().map(|id| (id, Vec::new())).collect();
    let mut divisional: FnvHashMap<TeamId, usize> = FnvHashMap::default();

    for game in games.iter().filter(|g| g.season <= year && g.season >= year - 1) {
        for side in [game.home_team_id, game.away_team_id] {
            let Some(entries) = set.get_mut(&side) else {
                continue;
            };
            let count = divisional.entry(side).or_insert(0);
            if game.season < year && *count >= params.min_divisional_games {
                continue;
            }
            let opponent = game.opponent_of(side);
            let opponent = if teams.contains(opponent) {
                *count += 1;
                opponent
            } else {
                UNRANKED_OPPONENT
            };
            let margin =
                clamp_margin(game.margin_for(side), params.margin_floor, params.margin_ceiling);
            entries.push(GameEntry {
                opponent,
                margin: margin as f64,
            });
        }
    }
    set
}

/// Game set for the least-squares method: only games against ranked opponents, reaching
/// back up to `lookback_seasons` seasons until a team has `min_divisional_games` of them.
/// Margins are raw here; the statistical cap is applied when solving.
pub fn build_divisional_game_set(
    games: &[Game],
    teams: &TeamList,
    year: i32,
    params: &RatingParams,
) -> GameSet {
    let mut set: GameSet = teams.sorted_ids().into_iter().map(|id| (id, Vec::new())).collect();
    let oldest = year - params.lookback_seasons.max(0);

    for game in games.iter().filter(|g| g.season <= year && g.season >= oldest) {
        if !teams.contains(game.home_team_id) || !teams.contains(game.away_team_id) {
            continue;
        }
        for side in [game.home_team_id, game.away_team_id] {
            if let Some(entries) = set.get_mut(&side) {
                if game.season < year && entries.len() >= params.min_divisional_games {
                    continue;
                }
                entries.push(GameEntry {
                    opponent: game.opponent_of(side),
                    margin: game.margin_for(side) as f64,
                });
            }
        }
    }
    set
}

fn average_margin(entries: &[GameEntry]) -> f64 {
    if entries.is_empty() {
        0.0
    } else {
        entries.iter().map(|e| e.margin).sum::<f64>() / entries.len() as f64
    }
}

/// Result of the fixed-point iteration
#[derive(Debug, Clone)]
pub struct IterationOutcome {
    pub ratings: BTreeMap<TeamId, f64>,
    pub rounds: usize,
    pub converged: bool,
}

/// Fixed-point ratings: each round, rating = own average margin + average of the
/// opponents' current ratings. Unranked opponents count toward the average margin only.
///
/// Every round is shifted to average zero. Only rating differences are determined, and
/// without the shift uneven schedules drift by a constant each round and never settle.
pub fn iterate_ratings(set: &GameSet, params: &RatingParams) -> IterationOutcome {
    let base: BTreeMap<TeamId, f64> = set.iter().map(|(id, e)| (*id, average_margin(e))).collect();
    let mut ratings = base.clone();
    let mut rounds = 0;
    let mut converged = set.is_empty();

    while !converged && rounds < params.max_iterations {
        rounds += 1;
        let mut next: Vec<f64> = set
            .iter()
            .map(|(id, entries)| {
                let (sum, n) = entries
                    .iter()
                    .filter(|e| e.opponent != UNRANKED_OPPONENT)
                    .filter_map(|e| ratings.get(&e.opponent))
                    .fold((0.0, 0usize), |(s, n), r| (s + r, n + 1));
                let opponents = if n == 0 { 0.0 } else { sum / n as f64 };
                base[id] + opponents
            })
            .collect();
        recenter(&mut next);

        let mut delta = 0.0f64;
        for (current, rating) in ratings.values_mut().zip(next) {
            delta = delta.max((rating - *current).abs());
            *current = rating;
        }
        converged = delta <= params.tolerance;
    }

    ratings.remove(&UNRANKED_OPPONENT);
    if converged {
        debug!(rounds, "fixed-point ratings converged");
    } else {
        warn!(rounds, "fixed-point ratings hit the iteration cap");
    }
    IterationOutcome {
        ratings,
        rounds,
        converged,
    }
}

/// Margin cap for the least-squares method: mean + `stddevs` standard deviations of the
/// absolute margins, or no cap when there are too few margins to estimate one
pub fn statistical_cap(set: &GameSet, stddevs: f64) -> f64 {
    let margins: Vec<f64> = set.values().flatten().map(|e| e.margin.abs()).collect();
    if margins.len() < 2 {
        return f64::INFINITY;
    }
    let mean = margins.iter().mean();
    let sd = margins.iter().std_dev();
    if sd.is_finite() {
        mean + stddevs * sd
    } else {
        f64::INFINITY
    }
}

/// Direct ratings from `M · r = b` with row i: `r_i - mean(r_opponents) = avg margin_i`.
/// Rows and columns follow ascending team id. The solution is centered on zero.
pub fn least_squares_ratings(set: &GameSet, params: &RatingParams) -> BTreeMap<TeamId, f64> {
    let cap = statistical_cap(set, params.clamp_stddevs);
    let ids: Vec<TeamId> = set.keys().copied().collect();
    let index: FnvHashMap<TeamId, usize> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

    let n = ids.len();
    let mut m = vec![vec![0.0; n]; n];
    let mut b = vec![0.0; n];
    for (i, id) in ids.iter().enumerate() {
        let entries = &set[id];
        m[i][i] = 1.0;
        if entries.is_empty() {
            continue;
        }
        let weight = 1.0 / entries.len() as f64;
        for entry in entries {
            if let Some(&j) = index.get(&entry.opponent) {
                m[i][j] -= weight;
            }
        }
        b[i] = entries.iter().map(|e| cap_margin(e.margin, cap)).sum::<f64>() * weight;
    }

    let mut solution = least_squares(&m, &b);
    recenter(&mut solution);
    ids.into_iter().zip(solution).collect()
}

impl RatingMethod {
    /// Fill `rating` for every team, then rank and normalize it
    pub fn rate(
        &self,
        teams: &mut TeamList,
        games: &[Game],
        run: &ResolvedRun,
        params: &RatingParams,
    ) {
        let ratings = match self {
            RatingMethod::Iterative => {
                let set = build_game_set(games, teams, run.year, params);
                let outcome = iterate_ratings(&set, params);
                info!(
                    rounds = outcome.rounds,
                    converged = outcome.converged,
                    "iterative ratings done"
                );
                outcome.ratings
            }
            RatingMethod::LeastSquares => {
                let set = build_divisional_game_set(games, teams, run.year, params);
                let ratings = least_squares_ratings(&set, params);
                info!(teams = ratings.len(), "least-squares ratings done");
                ratings
            }
        };

        for (id, rating) in ratings {
            if let Some(team) = teams.get_mut(id) {
                team.rating = rating;
            }
        }
        let ids = teams.sorted_ids();
        rank_and_normalize(teams, &ids, Metric::Rating);
    }
}
