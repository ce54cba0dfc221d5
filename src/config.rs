// Configuration module for the power rankings engine
// Supports YAML configuration files for score weights, rating parameters, data sources and runs

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::error::{RankError, Result};
use crate::game_result::{Division, Sport};
use crate::rating::{RatingMethod, RatingParams};
use crate::record::RecordFormula;
use crate::schedule::{ScheduleMethod, ScheduleWeights};
use crate::score::ScoreWeights;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub rating: RatingSettings,
    #[serde(default)]
    pub record: RecordSettings,
    #[serde(default)]
    pub schedule: ScheduleSettings,
    #[serde(default)]
    pub data: DataSettings,
    #[serde(default = "default_runs")]
    pub runs: Vec<RunSettings>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            scoring: ScoringSettings::default(),
            rating: RatingSettings::default(),
            record: RecordSettings::default(),
            schedule: ScheduleSettings::default(),
            data: DataSettings::default(),
            runs: default_runs(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file(path: &str) -> Result<Self> {
        if !Path::new(path).exists() {
            return Err(RankError::Config(format!("config file not found: {}", path)));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| RankError::Config(format!("failed to read config file: {}", e)))?;

        serde_yaml::from_str(&content)
            .map_err(|e| RankError::Config(format!("failed to parse config file: {}", e)))
    }

    /// Load configuration from file if it exists, otherwise use defaults
    pub fn load_or_default(path: Option<&str>) -> Self {
        match path {
            Some(p) => Self::from_file(p).unwrap_or_else(|e| {
                warn!("{}; using default configuration", e);
                Self::default()
            }),
            None => {
                for default_path in &["power_rank.yaml", "power_rank.yml", "config.yaml"] {
                    if Path::new(default_path).exists() {
                        if let Ok(config) = Self::from_file(default_path) {
                            info!("loaded configuration from {}", default_path);
                            return config;
                        }
                    }
                }
                Self::default()
            }
        }
    }

    pub fn score_weights(&self) -> ScoreWeights {
        ScoreWeights {
            record: self.scoring.record_weight,
            rating: self.scoring.rating_weight,
            sos: self.scoring.sos_weight,
        }
    }

    pub fn schedule_weights(&self) -> ScheduleWeights {
        ScheduleWeights {
            direct: self.schedule.direct_weight,
            indirect: self.schedule.indirect_weight,
        }
    }

    pub fn rating_params(&self) -> RatingParams {
        RatingParams {
            min_divisional_games: self.rating.min_divisional_games,
            margin_floor: self.rating.margin_floor,
            margin_ceiling: self.rating.margin_ceiling,
            max_iterations: self.rating.max_iterations,
            tolerance: self.rating.tolerance,
            clamp_stddevs: self.rating.clamp_stddevs,
            lookback_seasons: self.rating.lookback_seasons,
        }
    }
}

/// Final score blend weights
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringSettings {
    #[serde(default = "default_record_weight")]
    pub record_weight: f64,
    #[serde(default = "default_rating_weight")]
    pub rating_weight: f64,
    #[serde(default = "default_sos_weight")]
    pub sos_weight: f64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        ScoringSettings {
            record_weight: default_record_weight(),
            rating_weight: default_rating_weight(),
            sos_weight: default_sos_weight(),
        }
    }
}

fn default_record_weight() -> f64 {
    0.60
}

fn default_rating_weight() -> f64 {
    0.30
}

fn default_sos_weight() -> f64 {
    0.10
}

/// Power rating settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingSettings {
    /// "iterative" or "least_squares"
    #[serde(default)]
    pub method: RatingMethod,

    /// Divisional games a team needs before prior-season games stop being pulled in
    #[serde(default = "default_min_divisional_games")]
    pub min_divisional_games: usize,

    /// Any non-zero margin is raised to at least this magnitude
    #[serde(default = "default_margin_floor")]
    pub margin_floor: i64,

    /// Margins are capped at this magnitude
    #[serde(default = "default_margin_ceiling")]
    pub margin_ceiling: i64,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Largest per-team change still treated as "stopped changing"
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Least-squares margin cap is mean + this many standard deviations
    #[serde(default = "default_clamp_stddevs")]
    pub clamp_stddevs: f64,

    /// Seasons the least-squares game set may reach back
    #[serde(default = "default_lookback_seasons")]
    pub lookback_seasons: i32,
}

impl Default for RatingSettings {
    fn default() -> Self {
        RatingSettings {
            method: RatingMethod::default(),
            min_divisional_games: default_min_divisional_games(),
            margin_floor: default_margin_floor(),
            margin_ceiling: default_margin_ceiling(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            clamp_stddevs: default_clamp_stddevs(),
            lookback_seasons: default_lookback_seasons(),
        }
    }
}

fn default_min_divisional_games() -> usize {
    6
}

fn default_margin_floor() -> i64 {
    7
}

fn default_margin_ceiling() -> i64 {
    24
}

fn default_max_iterations() -> usize {
    10_000
}

fn default_tolerance() -> f64 {
    1e-9
}

fn default_clamp_stddevs() -> f64 {
    1.5
}

fn default_lookback_seasons() -> i32 {
    2
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSettings {
    /// "smoothed" or "unsmoothed"
    #[serde(default)]
    pub formula: RecordFormula,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSettings {
    /// "two_stage" or "single_pass"
    #[serde(default)]
    pub method: ScheduleMethod,
    /// Weight of direct opponents
    #[serde(default = "default_direct_weight")]
    pub direct_weight: f64,
    /// Weight of opponents' opponents
    #[serde(default = "default_indirect_weight")]
    pub indirect_weight: f64,
}

impl Default for ScheduleSettings {
    fn default() -> Self {
        ScheduleSettings {
            method: ScheduleMethod::default(),
            direct_weight: default_direct_weight(),
            indirect_weight: default_indirect_weight(),
        }
    }
}

fn default_direct_weight() -> f64 {
    2.0
}

fn default_indirect_weight() -> f64 {
    1.0
}

/// Where the demo binary loads its data from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSettings {
    #[serde(default = "default_games_csv")]
    pub games_csv: String,
    #[serde(default = "default_teams_csv")]
    pub teams_csv: String,
    #[serde(default)]
    pub composite_csv: Option<String>,
    /// Offset east of UTC used when snapping cutoffs to Tuesday midnight
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

impl Default for DataSettings {
    fn default() -> Self {
        DataSettings {
            games_csv: default_games_csv(),
            teams_csv: default_teams_csv(),
            composite_csv: None,
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

fn default_games_csv() -> String {
    "data/games.csv".to_string()
}

fn default_teams_csv() -> String {
    "data/teams.csv".to_string()
}

fn default_utc_offset_hours() -> i32 {
    -5
}

/// One ranking to produce
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSettings {
    pub sport: Sport,
    #[serde(default = "default_division")]
    pub division: Division,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub week: Option<u32>,
}

fn default_division() -> Division {
    Division::Top
}

fn default_runs() -> Vec<RunSettings> {
    vec![
        RunSettings {
            sport: Sport::Football,
            division: Division::Top,
            year: None,
            week: None,
        },
        RunSettings {
            sport: Sport::Football,
            division: Division::Lower,
            year: None,
            week: None,
        },
    ]
}

/// Generate a sample configuration file
pub fn generate_sample_config() -> String {
    r#"# Power Rankings Configuration
# All values shown are defaults - uncomment and modify as needed

# Final score = record_weight * record rate + rating_weight * rating + sos_weight * SOS
scoring:
  record_weight: 0.60
  rating_weight: 0.30
  sos_weight: 0.10

rating:
  # "iterative" (fixed point) or "least_squares" (direct solve)
  method: iterative
  # Prior-season games are pulled in until a team has this many divisional games
  min_divisional_games: 6
  # Non-zero margins are raised to the floor and capped at the ceiling
  margin_floor: 7
  margin_ceiling: 24
  # Hard cap on fixed-point rounds
  max_iterations: 10000
  tolerance: 0.000000001
  # least_squares only: cap margins at mean + clamp_stddevs * stddev
  clamp_stddevs: 1.5
  lookback_seasons: 2

record:
  # "smoothed" = (1 + W + T/2) / (2 + G), "unsmoothed" = W / (W + L)
  formula: smoothed

schedule:
  # "two_stage" (opponents and opponents' opponents) or "single_pass"
  method: two_stage
  # two_stage only: SOS = (direct * opp wins + indirect * opp-opp wins) / (same for games)
  direct_weight: 2.0
  indirect_weight: 1.0

data:
  games_csv: data/games.csv
  teams_csv: data/teams.csv
  # composite_csv: data/composite.csv
  utc_offset_hours: -5

# Omit year/week to rank the most recent week of the latest season
runs:
  - sport: football
    division: top
  - sport: football
    division: lower
"#.to_string()
}
