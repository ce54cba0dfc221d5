// Composite (recruiting/talent) ratings: ranked and normalized like every other metric.
// Teams without an entry keep zero values and no rank.

use tracing::info;

use crate::game_result::{CompositeEntry, TeamId};
use crate::rank::{rank_and_normalize, Metric};
use crate::team::TeamList;

pub fn apply_composites(teams: &mut TeamList, entries: &[CompositeEntry]) {
    let mut ids: Vec<TeamId> = Vec::with_capacity(entries.len());
    for entry in entries {
        if let Some(team) = teams.get_mut(entry.team_id) {
            team.composite = entry.rating;
            team.composite_average = entry.average;
            ids.push(entry.team_id);
        }
    }
    ids.sort_unstable();
    ids.dedup();
    rank_and_normalize(teams, &ids, Metric::Composite);
    info!(ranked = ids.len(), supplied = entries.len(), "composite ratings applied");
}
