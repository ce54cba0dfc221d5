// This module drives a ranking run: resolve the run parameters once against the store,
// build the Team List for the division, run each stage in order, and hand back the
// finished list with helpers to flatten and render it.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveTime, Offset, TimeZone, Utc, Weekday};
use fnv::FnvHashSet;
use serde::Serialize;
use tracing::info;

use crate::composite::apply_composites;
use crate::config::{Config, RunSettings};
use crate::error::{RankError, Result};
use crate::game_result::{Division, Game, Sport, TeamId};
use crate::rating::{RatingMethod, RatingParams};
use crate::record::{calculate_records, counted_games, RecordFormula};
use crate::schedule::{calculate_schedule_strength, ScheduleMethod, ScheduleWeights};
use crate::score::{calculate_final_scores, ScoreWeights};
use crate::store::DataStore;
use crate::team::{Team, TeamList};

/// What the caller asks for; unset year/week are resolved against the store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunParams {
    pub sport: Sport,
    pub division: Division,
    pub year: Option<i32>,
    pub week: Option<u32>,
}

impl RunParams {
    pub fn latest(sport: Sport, division: Division) -> Self {
        RunParams {
            sport,
            division,
            year: None,
            week: None,
        }
    }
}

impl From<&RunSettings> for RunParams {
    fn from(run: &RunSettings) -> Self {
        RunParams {
            sport: run.sport,
            division: run.division,
            year: run.year,
            week: run.week,
        }
    }
}

/// Run parameters after resolution; every stage reads these and nothing else
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ResolvedRun {
    pub sport: Sport,
    pub division: Division,
    pub year: i32,
    pub week: u32,
    /// Only games kicking off at or before this instant are considered
    pub start_time: DateTime<Utc>,
    pub postseason: bool,
}

/// Algorithm choices and tunables for a run
#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub rating_method: RatingMethod,
    pub rating: RatingParams,
    pub record_formula: RecordFormula,
    pub schedule_method: ScheduleMethod,
    pub schedule_weights: ScheduleWeights,
    pub score_weights: ScoreWeights,
    /// Timezone the Tuesday-midnight cutoff is computed in
    pub utc_offset: FixedOffset,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            rating_method: RatingMethod::default(),
            rating: RatingParams::default(),
            record_formula: RecordFormula::default(),
            schedule_method: ScheduleMethod::default(),
            schedule_weights: ScheduleWeights::default(),
            score_weights: ScoreWeights::default(),
            utc_offset: Utc.fix(),
        }
    }
}

impl EngineOptions {
    pub fn from_config(config: &Config) -> Result<Self> {
        let hours = config.data.utc_offset_hours;
        let utc_offset = FixedOffset::east_opt(hours * 3600)
            .ok_or_else(|| RankError::Config(format!("invalid UTC offset: {} hours", hours)))?;
        Ok(EngineOptions {
            rating_method: config.rating.method,
            rating: config.rating_params(),
            record_formula: config.record.formula,
            schedule_method: config.schedule.method,
            schedule_weights: config.schedule_weights(),
            score_weights: config.score_weights(),
            utc_offset,
        })
    }
}

/// Midnight (in `offset`) of the Tuesday on or before `time`
pub fn preceding_tuesday_midnight(time: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local = time.with_timezone(&offset);
    let days_back = (local.weekday().num_days_from_monday() + 7
        - Weekday::Tue.num_days_from_monday())
        % 7;
    let midnight =
        (local.date_naive() - Duration::days(days_back as i64)).and_time(NaiveTime::default());
    Utc.from_utc_datetime(&(midnight - Duration::seconds(offset.local_minus_utc() as i64)))
}

/// Ranking engine bound to one data store. Holds no per-run state, so one Ranker can
/// serve concurrent runs.
pub struct Ranker<'a, S: DataStore> {
    store: &'a S,
    options: EngineOptions,
    now: Option<DateTime<Utc>>,
}

impl<'a, S: DataStore> Ranker<'a, S> {
    pub fn new(store: &'a S, options: EngineOptions) -> Self {
        Ranker {
            store,
            options,
            now: None,
        }
    }

    /// Pin "now" instead of reading the system clock
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        self.now.unwrap_or_else(Utc::now)
    }

    /// Fix year, week, cutoff and postseason for a run
    pub fn resolve(&self, params: &RunParams) -> Result<ResolvedRun> {
        let sport = params.sport;
        let division = params.division.effective(sport);
        let year = match params.year {
            Some(year) => year,
            None => self
                .store
                .max_season_year(sport)?
                .ok_or(RankError::NoSeasons(sport))?,
        };

        if let Some(week) = params.week {
            if let Some(game) = self.store.earliest_game_of_week(sport, year, week)? {
                return Ok(ResolvedRun {
                    sport,
                    division,
                    year,
                    week,
                    start_time: preceding_tuesday_midnight(game.kickoff, self.options.utc_offset),
                    postseason: game.postseason,
                });
            }
        }

        let now = self.now();
        let (week, postseason) = match self.store.latest_game_at_or_before(sport, now)? {
            None => (1, false),
            Some(game) if game.season < year => (1, false),
            Some(game) if game.season > year => {
                // finished season: rank after its last game
                let last = self
                    .store
                    .games_in_season_range(sport, year, now)?
                    .into_iter()
                    .find(|g| g.season == year);
                last.map_or((1, false), |g| (g.week + 1, g.postseason))
            }
            Some(game) => (game.week + 1, game.postseason),
        };
        Ok(ResolvedRun {
            sport,
            division,
            year,
            week,
            start_time: now,
            postseason,
        })
    }

    /// One empty Team per team registered in the run's division
    pub fn build_team_list(&self, run: &ResolvedRun) -> Result<TeamList> {
        Ok(self
            .store
            .teams_in_division(run.sport, run.year, run.division)?
            .iter()
            .map(|season| Team::new(season, run.week, run.postseason))
            .collect())
    }

    /// Resolve, then record → rating → schedule strength → composite → final score.
    /// Any store failure aborts the whole run.
    pub fn calculate_ranking(&self, params: &RunParams) -> Result<Ranking> {
        let run = self.resolve(params)?;
        info!(
            sport = %run.sport,
            division = %run.division,
            year = run.year,
            week = run.week,
            postseason = run.postseason,
            start_time = %run.start_time,
            "resolved ranking run"
        );

        let mut teams = self.build_team_list(&run)?;
        let registered: FnvHashSet<TeamId> = self
            .store
            .season_teams(run.sport, run.year)?
            .iter()
            .map(|t| t.team_id)
            .collect();

        let lookback = match self.options.rating_method {
            RatingMethod::Iterative => 1,
            RatingMethod::LeastSquares => self.options.rating.lookback_seasons.max(1),
        };
        let games = self
            .store
            .games_in_season_range(run.sport, run.year - lookback, run.start_time)?;

        calculate_records(&mut teams, &games, &registered, &run, self.options.record_formula);
        self.options
            .rating_method
            .rate(&mut teams, &games, &run, &self.options.rating);

        let season_games: Vec<Game> = counted_games(&games, &registered, &run).cloned().collect();
        calculate_schedule_strength(
            &mut teams,
            &season_games,
            self.options.schedule_method,
            self.options.schedule_weights,
        );

        let composites = self.store.composite_ratings(run.year)?;
        if !composites.is_empty() {
            apply_composites(&mut teams, &composites);
        }

        calculate_final_scores(&mut teams, self.options.score_weights);
        info!(teams = teams.len(), games = season_games.len(), "ranking complete");
        Ok(Ranking { run, teams })
    }
}

/// Flat output record for one ranked team
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedTeam {
    pub team_id: TeamId,
    pub name: String,
    pub conference: Option<String>,
    pub wins: u32,
    pub losses: u32,
    pub ties: u32,
    pub record_rate: f64,
    pub final_raw: f64,
    pub final_rank: u32,
    pub rating: f64,
    pub rating_rank: u32,
    pub sos: f64,
    pub sos_rank: u32,
    pub sov: f64,
    pub sov_rank: u32,
    pub composite_rank: u32,
    pub top_tier: bool,
    pub postseason: bool,
    pub year: i32,
    pub week: u32,
}

/// A finished run
#[derive(Debug, Clone)]
pub struct Ranking {
    pub run: ResolvedRun,
    pub teams: TeamList,
}

impl Ranking {
    /// Output records ordered by final rank, ties by name
    pub fn ranked(&self) -> Vec<RankedTeam> {
        let mut teams: Vec<&Team> = self.teams.iter().collect();
        teams.sort_by(|a, b| {
            a.final_rank
                .cmp(&b.final_rank)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        teams
            .into_iter()
            .map(|t| RankedTeam {
                team_id: t.id,
                name: t.name.clone(),
                conference: t.conference.clone(),
                wins: t.record.wins,
                losses: t.record.losses,
                ties: t.record.ties,
                record_rate: t.record.rate,
                final_raw: t.final_score,
                final_rank: t.final_rank,
                rating: t.rating,
                rating_rank: t.rating_rank,
                sos: t.sos,
                sos_rank: t.sos_rank,
                sov: t.sov,
                sov_rank: t.sov_rank,
                composite_rank: t.composite_rank,
                top_tier: self.run.division.is_top(),
                postseason: t.postseason,
                year: t.year,
                week: t.week,
            })
            .collect()
    }

    /// Tabular rendering of the top `limit` teams
    pub fn render_table(&self, limit: usize) -> String {
        let mut out = format!(
            "{} {} {} week {}{}\n",
            self.run.sport,
            self.run.division,
            self.run.year,
            self.run.week,
            if self.run.postseason { " (postseason)" } else { "" }
        );
        out.push_str(&format!(
            "{:>4} {:<25} {:<15} {:>8} {:>6} {:>4} {:>4} {:>9}\n",
            "Rank", "Team", "Conference", "W-L-T", "Rating", "SOS", "SOV", "Final"
        ));
        out.push_str(&"-".repeat(82));
        out.push('\n');
        for team in self.ranked().iter().take(limit) {
            let record = format!("{}-{}-{}", team.wins, team.losses, team.ties);
            let name: String = team.name.chars().take(25).collect();
            let conference: String =
                team.conference.as_deref().unwrap_or("-").chars().take(15).collect();
            out.push_str(&format!(
                "{:>4} {:<25} {:<15} {:>8} {:>6} {:>4} {:>4} {:>9.5}\n",
                team.final_rank,
                name,
                conference,
                record,
                team.rating_rank,
                team.sos_rank,
                team.sov_rank,
                team.final_raw
            ));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_result::{CompositeEntry, TeamSeason};
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    /// Saturday of week 1
    fn week_one() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 9, 2, 18, 0, 0).unwrap()
    }

    fn game(home: TeamId, away: TeamId, hs: u32, aws: u32, week: u32) -> Game {
        let kickoff = week_one() + Duration::days(7 * (week as i64 - 1));
        Game::new(Sport::Football, home, away, hs, aws, 2023, week, kickoff)
    }

    fn season(id: TeamId, name: &str, division: Division) -> TeamSeason {
        TeamSeason {
            team_id: id,
            name: name.to_string(),
            conference: Some("Test".to_string()),
            sport: Sport::Football,
            year: 2023,
            division,
        }
    }

    fn four_team_store() -> MemoryStore {
        // team 1 wins all four of its games over five weeks
        let games = vec![
            game(1, 2, 28, 7, 1),
            game(3, 4, 21, 14, 1),
            game(3, 1, 10, 31, 2),
            game(2, 4, 24, 20, 2),
            game(1, 4, 35, 14, 3),
            game(2, 3, 17, 13, 3),
            game(4, 3, 27, 24, 4),
            game(2, 1, 3, 21, 5),
        ];
        let teams = vec![
            season(1, "Alpha", Division::Top),
            season(2, "Bravo", Division::Top),
            season(3, "Charlie", Division::Top),
            season(4, "Delta", Division::Top),
        ];
        MemoryStore::new(games, teams)
    }

    fn ranker(store: &MemoryStore) -> Ranker<'_, MemoryStore> {
        Ranker::new(store, EngineOptions::default()).with_now(week_one() + Duration::days(40))
    }

    #[test]
    fn test_tuesday_walk_back() {
        let saturday = week_one();
        assert_eq!(
            preceding_tuesday_midnight(saturday, Utc.fix()),
            Utc.with_ymd_and_hms(2023, 8, 29, 0, 0, 0).unwrap()
        );
        let eastern = FixedOffset::west_opt(5 * 3600).unwrap();
        assert_eq!(
            preceding_tuesday_midnight(saturday, eastern),
            Utc.with_ymd_and_hms(2023, 8, 29, 5, 0, 0).unwrap()
        );
        let tuesday = Utc.with_ymd_and_hms(2023, 8, 29, 20, 0, 0).unwrap();
        assert_eq!(
            preceding_tuesday_midnight(tuesday, Utc.fix()),
            Utc.with_ymd_and_hms(2023, 8, 29, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_resolve_explicit_week() {
        let store = four_team_store();
        let params = RunParams {
            week: Some(3),
            ..RunParams::latest(Sport::Football, Division::Top)
        };
        let run = ranker(&store).resolve(&params).unwrap();
        assert_eq!(run.year, 2023);
        assert_eq!(run.week, 3);
        assert_eq!(run.start_time, Utc.with_ymd_and_hms(2023, 9, 12, 0, 0, 0).unwrap());
        assert!(!run.postseason);
    }

    #[test]
    fn test_resolve_explicit_postseason_week() {
        let mut store = four_team_store();
        store.games.last_mut().unwrap().postseason = true;
        // a later game of the same week does not decide the flag
        let mut late = game(3, 4, 10, 7, 5);
        late.kickoff += Duration::days(1);
        store.games.push(late);

        let params = RunParams {
            week: Some(5),
            ..RunParams::latest(Sport::Football, Division::Top)
        };
        let run = ranker(&store).resolve(&params).unwrap();
        assert_eq!(run.week, 5);
        assert_eq!(run.start_time, Utc.with_ymd_and_hms(2023, 9, 26, 0, 0, 0).unwrap());
        assert!(run.postseason);
    }

    #[test]
    fn test_resolve_latest_week() {
        let mut store = four_team_store();
        store.games.last_mut().unwrap().postseason = true;
        let run = ranker(&store)
            .resolve(&RunParams::latest(Sport::Football, Division::Top))
            .unwrap();
        assert_eq!(run.week, 6);
        assert!(run.postseason);
        assert_eq!(run.start_time, week_one() + Duration::days(40));
    }

    #[test]
    fn test_resolve_missing_week_falls_back() {
        let store = four_team_store();
        let params = RunParams {
            week: Some(12),
            ..RunParams::latest(Sport::Football, Division::Top)
        };
        let run = ranker(&store).resolve(&params).unwrap();
        assert_eq!(run.week, 6);
    }

    #[test]
    fn test_resolve_unstarted_season() {
        let mut store = four_team_store();
        let mut next = season(1, "Alpha", Division::Top);
        next.year = 2024;
        store.teams.push(next);
        let run = ranker(&store)
            .resolve(&RunParams::latest(Sport::Football, Division::Top))
            .unwrap();
        assert_eq!(run.year, 2024);
        assert_eq!(run.week, 1);
        assert!(!run.postseason);
    }

    #[test]
    fn test_resolve_finished_season() {
        let mut store = four_team_store();
        let mut later = game(1, 2, 10, 0, 1);
        later.season = 2024;
        later.kickoff = week_one() + Duration::days(30);
        store.games.push(later);
        let params = RunParams {
            year: Some(2023),
            ..RunParams::latest(Sport::Football, Division::Top)
        };
        let run = ranker(&store).resolve(&params).unwrap();
        assert_eq!(run.year, 2023);
        assert_eq!(run.week, 6);
    }

    #[test]
    fn test_resolve_without_data() {
        let store = MemoryStore::default();
        let err = ranker(&store)
            .resolve(&RunParams::latest(Sport::Basketball, Division::Top))
            .unwrap_err();
        assert!(matches!(err, RankError::NoSeasons(Sport::Basketball)));
    }

    #[test]
    fn test_full_run_undefeated_team_ranks_first() {
        let store = four_team_store();
        let ranking = ranker(&store)
            .calculate_ranking(&RunParams::latest(Sport::Football, Division::Top))
            .unwrap();
        let alpha = ranking.teams.get(1).unwrap();
        assert_eq!(alpha.record.wins, 4);
        assert_eq!(alpha.record.losses, 0);
        assert_eq!(alpha.final_rank, 1);
        assert_eq!(alpha.rating_rank, 1);

        let ranked = ranking.ranked();
        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[0].name, "Alpha");
        assert!(ranked.windows(2).all(|w| w[0].final_rank <= w[1].final_rank));
        assert!(ranked.iter().all(|t| t.top_tier && t.week == 6));

        let table = ranking.render_table(10);
        assert!(table.contains("Alpha"));
        assert!(table.contains(&format!("{:.5}", ranked[0].final_raw)));
    }

    #[test]
    fn test_explicit_week_excludes_later_games() {
        let store = four_team_store();
        let params = RunParams {
            week: Some(2),
            ..RunParams::latest(Sport::Football, Division::Top)
        };
        let ranking = ranker(&store).calculate_ranking(&params).unwrap();
        for team in ranking.teams.iter() {
            assert_eq!(team.record.games(), 1);
        }
    }

    #[test]
    fn test_identical_teams_share_rank() {
        let games = vec![game(1, 3, 21, 0, 1), game(2, 3, 21, 0, 2)];
        let teams = vec![
            season(1, "Alpha", Division::Top),
            season(2, "Bravo", Division::Top),
            season(3, "Charlie", Division::Top),
        ];
        let store = MemoryStore::new(games, teams);
        let ranking = ranker(&store)
            .calculate_ranking(&RunParams::latest(Sport::Football, Division::Top))
            .unwrap();
        let a = ranking.teams.get(1).unwrap();
        let b = ranking.teams.get(2).unwrap();
        assert_eq!(a.final_score, b.final_score);
        assert_eq!(a.final_rank, 1);
        assert_eq!(b.final_rank, 1);
        assert_eq!(ranking.teams.get(3).unwrap().final_rank, 3);
    }

    #[test]
    fn test_division_split_and_other_tier_games() {
        let mut store = four_team_store();
        store.teams.push(season(5, "Echo", Division::Lower));
        store.games.push(game(5, 4, 3, 38, 5));
        let ranking = ranker(&store)
            .calculate_ranking(&RunParams::latest(Sport::Football, Division::Top))
            .unwrap();
        assert_eq!(ranking.teams.len(), 4);
        assert!(!ranking.teams.contains(5));
        // the lower-tier opponent is registered, so the game still counts toward the record
        assert_eq!(ranking.teams.get(4).unwrap().record.wins, 2);

        let lower = ranker(&store)
            .calculate_ranking(&RunParams::latest(Sport::Football, Division::Lower))
            .unwrap();
        assert_eq!(lower.teams.len(), 1);
        assert!(lower.ranked().iter().all(|t| !t.top_tier));
        assert_eq!(lower.teams.get(5).unwrap().record.losses, 1);
    }

    #[test]
    fn test_least_squares_run() {
        let store = four_team_store();
        let options = EngineOptions {
            rating_method: RatingMethod::LeastSquares,
            ..Default::default()
        };
        let ranking = Ranker::new(&store, options)
            .with_now(week_one() + Duration::days(40))
            .calculate_ranking(&RunParams::latest(Sport::Football, Division::Top))
            .unwrap();
        assert_eq!(ranking.teams.get(1).unwrap().rating_rank, 1);
        assert_eq!(ranking.teams.get(1).unwrap().final_rank, 1);
    }

    #[test]
    fn test_composites_are_ranked_when_supplied() {
        let store = four_team_store().with_composites(vec![
            CompositeEntry { team_id: 2, year: 2023, average: 88.0, rating: 290.0 },
            CompositeEntry { team_id: 3, year: 2023, average: 85.0, rating: 250.0 },
        ]);
        let ranking = ranker(&store)
            .calculate_ranking(&RunParams::latest(Sport::Football, Division::Top))
            .unwrap();
        assert_eq!(ranking.teams.get(2).unwrap().composite_rank, 1);
        assert_eq!(ranking.teams.get(3).unwrap().composite_rank, 2);
        assert_eq!(ranking.teams.get(1).unwrap().composite_rank, 0);
    }

    struct FailingStore;

    impl DataStore for FailingStore {
        fn max_season_year(&self, _sport: Sport) -> Result<Option<i32>> {
            Ok(Some(2023))
        }

        fn latest_game_at_or_before(
            &self,
            _sport: Sport,
            _time: DateTime<Utc>,
        ) -> Result<Option<Game>> {
            Ok(None)
        }

        fn earliest_game_of_week(
            &self,
            _sport: Sport,
            _year: i32,
            _week: u32,
        ) -> Result<Option<Game>> {
            Ok(None)
        }

        fn games_in_season_range(
            &self,
            _sport: Sport,
            _from: i32,
            _through: DateTime<Utc>,
        ) -> Result<Vec<Game>> {
            Err(RankError::Store("connection refused".to_string()))
        }

        fn teams_in_division(
            &self,
            _sport: Sport,
            year: i32,
            division: Division,
        ) -> Result<Vec<TeamSeason>> {
            Ok(vec![TeamSeason {
                team_id: 1,
                name: "Alpha".to_string(),
                conference: None,
                sport: Sport::Football,
                year,
                division,
            }])
        }
    }

    #[test]
    fn test_store_failure_aborts_run() {
        let store = FailingStore;
        let err = Ranker::new(&store, EngineOptions::default())
            .with_now(week_one())
            .calculate_ranking(&RunParams::latest(Sport::Football, Division::Top))
            .unwrap_err();
        match err {
            RankError::Store(msg) => assert_eq!(msg, "connection refused"),
            other => panic!("unexpected error: {}", other),
        }
    }
}
