// Shared dense-rank and min/max normalization used by every ranked metric.

use crate::game_result::TeamId;
use crate::team::{Team, TeamList};
use tracing::warn;

/// Ranked metrics of a Team
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Rating,
    Sos,
    Sov,
    Composite,
    Final,
}

impl Metric {
    pub fn value(&self, team: &Team) -> f64 {
        match self {
            Metric::Rating => team.rating,
            Metric::Sos => team.sos,
            Metric::Sov => team.sov,
            Metric::Composite => team.composite,
            Metric::Final => team.final_score,
        }
    }

    fn set_rank(&self, team: &mut Team, rank: u32) {
        match self {
            Metric::Rating => team.rating_rank = rank,
            Metric::Sos => team.sos_rank = rank,
            Metric::Sov => team.sov_rank = rank,
            Metric::Composite => team.composite_rank = rank,
            Metric::Final => team.final_rank = rank,
        }
    }

    fn set_norm(&self, team: &mut Team, norm: f64) {
        match self {
            Metric::Rating => team.rating_norm = norm,
            Metric::Sos => team.sos_norm = norm,
            Metric::Sov => team.sov_norm = norm,
            Metric::Composite => team.composite_norm = norm,
            Metric::Final => {}
        }
    }
}

/// Dense ranks for already-sorted (descending) values.
///
/// Equal neighbours share a rank; the next distinct value takes its 1-based position,
/// so `[9, 9, 5]` ranks as `[1, 1, 3]`.
pub fn dense_ranks(sorted_desc: &[f64]) -> Vec<u32> {
    let mut ranks = Vec::with_capacity(sorted_desc.len());
    for (i, value) in sorted_desc.iter().enumerate() {
        if i > 0 && *value == sorted_desc[i - 1] {
            ranks.push(ranks[i - 1]);
        } else {
            ranks.push(i as u32 + 1);
        }
    }
    ranks
}

/// `(value - min) / (max - min)`, or None when the range has zero width
pub fn normalizer(values: &[f64]) -> Option<(f64, f64)> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = max - min;
    if values.is_empty() || width == 0.0 || !width.is_finite() {
        None
    } else {
        Some((min, width))
    }
}

/// Rank teams by `metric` descending and write back rank (and normalized value where the
/// metric carries one). Only `ids` take part; all other teams are left untouched.
pub fn rank_and_normalize(teams: &mut TeamList, ids: &[TeamId], metric: Metric) {
    let mut scored: Vec<(TeamId, f64)> = ids
        .iter()
        .filter_map(|id| teams.get(*id).map(|t| (*id, metric.value(t))))
        .collect();
    if scored.is_empty() {
        return;
    }
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));

    let values: Vec<f64> = scored.iter().map(|(_, v)| *v).collect();
    let ranks = dense_ranks(&values);
    let scale = normalizer(&values);
    if scale.is_none() && scored.len() > 1 {
        warn!(?metric, teams = scored.len(), "zero-width range, normalized values left at 0");
    }

    for ((id, value), rank) in scored.iter().zip(ranks) {
        if let Some(team) = teams.get_mut(*id) {
            metric.set_rank(team, rank);
            let norm = match scale {
                Some((min, width)) => (value - min) / width,
                None => 0.0,
            };
            metric.set_norm(team, norm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn list_with_ratings(ratings: &[f64]) -> TeamList {
        ratings
            .iter()
            .enumerate()
            .map(|(i, r)| Team {
                id: i as TeamId + 1,
                rating: *r,
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn test_dense_ranks_skip_after_ties() {
        assert_eq!(dense_ranks(&[9.0, 9.0, 5.0, 4.0, 4.0, 1.0]), vec![1, 1, 3, 4, 4, 6]);
        assert!(dense_ranks(&[]).is_empty());
    }

    #[test]
    fn test_normalize_bounds() {
        let mut teams = list_with_ratings(&[3.0, -1.0, 7.0, 2.0]);
        let ids = teams.sorted_ids();
        rank_and_normalize(&mut teams, &ids, Metric::Rating);
        let top = teams.get(3).unwrap();
        let bottom = teams.get(2).unwrap();
        assert_eq!(top.rating_rank, 1);
        assert!((top.rating_norm - 1.0).abs() < 1e-12);
        assert_eq!(bottom.rating_rank, 4);
        assert!(bottom.rating_norm.abs() < 1e-12);
    }

    #[test]
    fn test_all_equal_leaves_zero_norm() {
        let mut teams = list_with_ratings(&[5.0, 5.0, 5.0]);
        let ids = teams.sorted_ids();
        rank_and_normalize(&mut teams, &ids, Metric::Rating);
        for team in teams.iter() {
            assert_eq!(team.rating_rank, 1);
            assert_eq!(team.rating_norm, 0.0);
        }
    }

    #[test]
    fn test_empty_and_singleton() {
        let mut empty = TeamList::new();
        rank_and_normalize(&mut empty, &[], Metric::Rating);
        assert!(empty.is_empty());

        let mut single = list_with_ratings(&[42.0]);
        rank_and_normalize(&mut single, &[1], Metric::Rating);
        let team = single.get(1).unwrap();
        assert_eq!(team.rating_rank, 1);
        assert_eq!(team.rating_norm, 0.0);
    }

    #[test]
    fn test_random_values_keep_rank_order() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            // small integer pool so ties show up often
            let ratings: Vec<f64> = (0..25).map(|_| rng.gen_range(0..8) as f64).collect();
            let mut teams = list_with_ratings(&ratings);
            let ids = teams.sorted_ids();
            rank_and_normalize(&mut teams, &ids, Metric::Rating);

            let all: Vec<&Team> = teams.iter().collect();
            for a in &all {
                assert!((0.0..=1.0).contains(&a.rating_norm));
                for b in &all {
                    if a.rating == b.rating {
                        assert_eq!(a.rating_rank, b.rating_rank);
                    } else if a.rating > b.rating {
                        assert!(a.rating_rank < b.rating_rank);
                    }
                }
            }
        }
    }
}
