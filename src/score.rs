// Final scorer: blends record, rating and schedule strength into the externally visible rank.

use tracing::info;

use crate::rank::{rank_and_normalize, Metric};
use crate::team::TeamList;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub record: f64,
    pub rating: f64,
    pub sos: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        ScoreWeights {
            record: 0.60,
            rating: 0.30,
            sos: 0.10,
        }
    }
}

/// `record · rate + rating · ratingNorm + sos · sosNorm`, then dense-rank descending.
/// Needs records, normalized ratings and normalized SOS already filled.
pub fn calculate_final_scores(teams: &mut TeamList, weights: ScoreWeights) {
    for team in teams.iter_mut() {
        team.final_score = weights.record * team.record.rate
            + weights.rating * team.rating_norm
            + weights.sos * team.sos_norm;
    }
    let ids = teams.sorted_ids();
    rank_and_normalize(teams, &ids, Metric::Final);
    info!(teams = ids.len(), "final scores ranked");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team::{Record, Team};

    fn team(id: u32, rate: f64, rating_norm: f64, sos_norm: f64) -> Team {
        Team {
            id,
            record: Record {
                rate,
                ..Default::default()
            },
            rating_norm,
            sos_norm,
            ..Default::default()
        }
    }

    #[test]
    fn test_blend_and_tie_compression() {
        let mut teams: TeamList = [
            team(1, 0.75, 1.0, 0.5),
            team(2, 0.75, 1.0, 0.5),
            team(3, 0.5, 0.2, 1.0),
            team(4, 0.25, 0.0, 0.0),
        ]
        .into_iter()
        .collect();
        calculate_final_scores(&mut teams, ScoreWeights::default());

        let a = teams.get(1).unwrap();
        assert!((a.final_score - (0.45 + 0.30 + 0.05)).abs() < 1e-12);
        assert_eq!(a.final_rank, 1);
        assert_eq!(teams.get(2).unwrap().final_rank, 1);
        assert_eq!(teams.get(3).unwrap().final_rank, 3);
        assert_eq!(teams.get(4).unwrap().final_rank, 4);
    }
}
