//! NFL game outcome prediction
//!
//! Rolling team statistics computed from historical scores, assembled into a
//! leakage-free feature table and fed to a decision-tree ensemble.

pub mod data;
pub mod features;
pub mod predict;
pub mod training;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::data::dataset::TiePolicy;
use crate::features::rolling::HistoryPolicy;
use crate::training::SplitStrategy;

/// Dense identifier for a team, assigned by [`data::TeamRegistry`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub u32);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Team({})", self.0)
    }
}

/// Week of the NFL schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Week {
    Regular(u8),
    Wildcard,
    Division,
    Conference,
    SuperBowl,
}

impl Week {
    pub fn is_playoff(&self) -> bool {
        !matches!(self, Week::Regular(_))
    }
}

impl fmt::Display for Week {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Week::Regular(n) => write!(f, "{}", n),
            Week::Wildcard => write!(f, "Wildcard"),
            Week::Division => write!(f, "Division"),
            Week::Conference => write!(f, "Conference"),
            Week::SuperBowl => write!(f, "Superbowl"),
        }
    }
}

impl FromStr for Week {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<u8>() {
            return Ok(Week::Regular(n));
        }
        match trimmed.to_lowercase().replace(' ', "").as_str() {
            "wildcard" => Ok(Week::Wildcard),
            "division" => Ok(Week::Division),
            "conference" => Ok(Week::Conference),
            "superbowl" => Ok(Week::SuperBowl),
            _ => Err(format!("Unknown week: {}", s)),
        }
    }
}

/// A single historical game, immutable once loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    /// Ordinal of the source row; secondary sort key
    pub game_id: u32,
    pub date: NaiveDate,
    pub season: u16,
    pub week: Week,
    pub home_team: TeamId,
    pub away_team: TeamId,
    pub home_score: u16,
    pub away_score: u16,
    /// Favorite's spread exactly as published
    pub vegas_spread: Option<f64>,
    pub over_under_line: Option<f64>,
    pub is_playoff: bool,
    pub is_neutral_site: bool,
    pub weather: Weather,
}

impl GameRecord {
    pub fn is_tie(&self) -> bool {
        self.home_score == self.away_score
    }
}

/// Game-day conditions as published; missing readings use typical values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Weather {
    /// Degrees Fahrenheit
    pub temperature: Option<f64>,
    pub wind_mph: Option<f64>,
    /// Percent
    pub humidity: Option<f64>,
    /// Free-text description, lowercased
    pub detail: String,
}

impl Weather {
    /// Mild conditions, as in a dome
    pub const DEFAULT_TEMPERATURE: f64 = 70.0;
    pub const DEFAULT_WIND_MPH: f64 = 0.0;
    pub const DEFAULT_HUMIDITY: f64 = 50.0;

    pub fn temperature(&self) -> f64 {
        self.temperature.unwrap_or(Self::DEFAULT_TEMPERATURE)
    }

    pub fn wind_mph(&self) -> f64 {
        self.wind_mph.unwrap_or(Self::DEFAULT_WIND_MPH)
    }

    pub fn humidity(&self) -> f64 {
        self.humidity.unwrap_or(Self::DEFAULT_HUMIDITY)
    }

    /// Below freezing
    pub fn extreme_cold(&self) -> bool {
        self.temperature() < 32.0
    }

    pub fn extreme_heat(&self) -> bool {
        self.temperature() > 85.0
    }

    pub fn high_wind(&self) -> bool {
        self.wind_mph() > 15.0
    }

    pub fn is_rainy(&self) -> bool {
        self.detail.contains("rain") || self.detail.contains("showers")
    }

    pub fn is_snowy(&self) -> bool {
        self.detail.contains("snow") || self.detail.contains("flurr")
    }

    /// Any condition that suppresses offense; heat does not count
    pub fn is_bad(&self) -> bool {
        self.extreme_cold() || self.high_wind() || self.is_rainy() || self.is_snowy()
    }
}

/// Model output for one upcoming game
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub home_team: String,
    pub away_team: String,
    pub date: NaiveDate,
    pub home_win_prob: f64,
    pub confidence: ConfidenceLevel,
}

impl Prediction {
    pub fn predicted_winner(&self) -> &str {
        if self.home_win_prob >= 0.5 {
            &self.home_team
        } else {
            &self.away_team
        }
    }
}

/// Confidence level based on available game history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    High,   // Both teams have a full window
    Medium, // One team has a partial window
    Low,    // Both teams have partial windows
}

impl ConfidenceLevel {
    pub fn from_history(home_games: usize, away_games: usize, window: usize) -> Self {
        match (home_games >= window, away_games >= window) {
            (true, true) => ConfidenceLevel::High,
            (false, false) => ConfidenceLevel::Low,
            _ => ConfidenceLevel::Medium,
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "High"),
            ConfidenceLevel::Medium => write!(f, "Medium"),
            ConfidenceLevel::Low => write!(f, "Low"),
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum GridironError {
    #[error("Data format error at row {row}: {message}")]
    DataFormat { row: usize, message: String },

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Insufficient history: no game has {window} prior games for both teams ({games} games scanned)")]
    InsufficientHistory { window: usize, games: usize },

    #[error("Unknown team: {0}")]
    UnknownTeam(String),

    #[error("Invalid matchup: {0}")]
    InvalidMatchup(String),

    #[error("No game with id {0}")]
    UnknownGame(u32),

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, GridironError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub data: DataConfig,
    pub features: FeatureConfig,
    pub training: TrainingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub games_path: String,
    pub features_path: String,
    /// Games from earlier seasons are dropped before any rolling computation
    pub min_season: Option<u16>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureConfig {
    pub window: usize,
    pub history_policy: HistoryPolicy,
    pub tie_policy: TiePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub test_ratio: f64,
    pub seed: u64,
    pub split: SplitStrategy,
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; sqrt of the feature count when unset
    pub max_features: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data: DataConfig {
                games_path: "data/spreadspoke_scores.csv".to_string(),
                features_path: "data/features.csv".to_string(),
                min_season: Some(2002),
            },
            features: FeatureConfig {
                window: 3,
                history_policy: HistoryPolicy::Partial,
                tie_policy: TiePolicy::Exclude,
            },
            training: TrainingConfig {
                test_ratio: 0.2,
                seed: 42,
                split: SplitStrategy::Random,
                n_trees: 100,
                max_depth: 10,
                min_samples_split: 5,
                min_samples_leaf: 2,
                max_features: None,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            GridironError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| GridironError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| GridironError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.features.window == 0 {
            return Err(GridironError::Config("features.window must be at least 1".to_string()));
        }
        if !(0.0..1.0).contains(&self.training.test_ratio) {
            return Err(GridironError::Config(format!(
                "training.test_ratio must be in [0, 1), got {}",
                self.training.test_ratio
            )));
        }
        if self.training.n_trees == 0 {
            return Err(GridironError::Config("training.n_trees must be at least 1".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_game(home_score: u16, away_score: u16) -> GameRecord {
        GameRecord {
            game_id: 0,
            date: NaiveDate::from_ymd_opt(2024, 9, 8).unwrap(),
            season: 2024,
            week: Week::Regular(1),
            home_team: TeamId(1),
            away_team: TeamId(2),
            home_score,
            away_score,
            vegas_spread: Some(-3.5),
            over_under_line: Some(44.5),
            is_playoff: false,
            is_neutral_site: false,
            weather: Weather::default(),
        }
    }

    #[test]
    fn test_tie() {
        assert!(make_game(17, 17).is_tie());
        assert!(!make_game(27, 20).is_tie());
    }

    #[test]
    fn test_weather_defaults() {
        let weather = Weather::default();
        assert_eq!(weather.temperature(), 70.0);
        assert_eq!(weather.wind_mph(), 0.0);
        assert_eq!(weather.humidity(), 50.0);
        assert!(!weather.is_bad());
        assert!(!weather.extreme_heat());
    }

    #[test]
    fn test_weather_flags() {
        let cold = Weather {
            temperature: Some(31.0),
            ..Weather::default()
        };
        assert!(cold.extreme_cold());
        assert!(cold.is_bad());

        let hot = Weather {
            temperature: Some(90.0),
            humidity: Some(80.0),
            ..Weather::default()
        };
        assert!(hot.extreme_heat());
        assert!(!hot.is_bad());

        let windy = Weather {
            wind_mph: Some(16.0),
            ..Weather::default()
        };
        assert!(windy.high_wind());
        assert!(!Weather { wind_mph: Some(15.0), ..Weather::default() }.high_wind());

        let showers = Weather {
            detail: "rain showers".to_string(),
            ..Weather::default()
        };
        assert!(showers.is_rainy() && showers.is_bad());

        let flurries = Weather {
            detail: "snow flurries".to_string(),
            ..Weather::default()
        };
        assert!(flurries.is_snowy());
        assert!(!flurries.is_rainy());
    }

    #[test]
    fn test_week_parsing() {
        assert_eq!("7".parse::<Week>(), Ok(Week::Regular(7)));
        assert_eq!("Wildcard".parse::<Week>(), Ok(Week::Wildcard));
        assert_eq!("SuperBowl".parse::<Week>(), Ok(Week::SuperBowl));
        assert_eq!("super bowl".parse::<Week>(), Ok(Week::SuperBowl));
        assert!("Preseason".parse::<Week>().is_err());
        assert!(Week::Division.is_playoff());
        assert!(!Week::Regular(18).is_playoff());
    }

    #[test]
    fn test_config_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.features.window = 5;
        config.features.history_policy = HistoryPolicy::Exclude;
        config.save(path).unwrap();

        let loaded = Config::load(path).unwrap();
        assert_eq!(loaded.features.window, 5);
        assert_eq!(loaded.features.history_policy, HistoryPolicy::Exclude);
        assert_eq!(loaded.data.min_season, Some(2002));
    }

    #[test]
    fn test_config_rejects_zero_window() {
        let mut config = Config::default();
        config.features.window = 0;
        assert!(matches!(config.validate(), Err(GridironError::Config(_))));
    }
}
