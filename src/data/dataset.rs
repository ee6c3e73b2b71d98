//! Labeled feature table
//!
//! Joins rolling feature candidates with game outcomes and betting lines into
//! the model-ready table.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::str::FromStr;

use crate::data::GameLog;
use crate::features::{GameFeatures, HistoryPolicy, RollingFeatureBuilder};
use crate::{GameRecord, GridironError, Result};

/// How tie games are labeled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TiePolicy {
    /// Leave ties out of the labeled table
    #[default]
    Exclude,
    /// Keep ties, labeled as a home non-win
    HomeLoss,
}

impl fmt::Display for TiePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiePolicy::Exclude => write!(f, "exclude"),
            TiePolicy::HomeLoss => write!(f, "home_loss"),
        }
    }
}

impl FromStr for TiePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "exclude" => Ok(TiePolicy::Exclude),
            "home_loss" => Ok(TiePolicy::HomeLoss),
            _ => Err(format!("Unknown tie policy: {}. Use exclude or home_loss.", s)),
        }
    }
}

/// Model input columns, in [`FeatureRow::feature_vector`] order
pub const FEATURE_NAMES: [&str; 35] = [
    "home_team_code",
    "away_team_code",
    "vegas_spread",
    "home_rolling_points_for",
    "away_rolling_points_for",
    "home_rolling_points_against",
    "away_rolling_points_against",
    "home_win_pct",
    "away_win_pct",
    "diff_points_for",
    "diff_points_against",
    "diff_win_pct",
    "home_field_advantage",
    "home_rest_days",
    "away_rest_days",
    "diff_rest_days",
    "home_momentum",
    "away_momentum",
    "diff_momentum",
    "over_under_line",
    "is_playoff",
    "is_neutral_site",
    "spread_strength_interaction",
    "spread_defense_interaction",
    "over_under_normalized",
    "weather_temperature",
    "weather_wind_mph",
    "weather_humidity",
    "extreme_cold",
    "extreme_heat",
    "high_wind",
    "is_rainy",
    "is_snowy",
    "bad_weather",
    "weather_offense_interaction",
];

/// CSV header, matching the serialized field order of [`FeatureRow`]
pub const CSV_COLUMNS: [&str; 41] = [
    "game_id",
    "date",
    "season",
    "home_team",
    "away_team",
    "home_team_code",
    "away_team_code",
    "home_rolling_points_for",
    "home_rolling_points_against",
    "home_win_pct",
    "away_rolling_points_for",
    "away_rolling_points_against",
    "away_win_pct",
    "diff_points_for",
    "diff_points_against",
    "diff_win_pct",
    "home_rest_days",
    "away_rest_days",
    "diff_rest_days",
    "home_momentum",
    "away_momentum",
    "diff_momentum",
    "home_field_advantage",
    "vegas_spread",
    "over_under_line",
    "is_playoff",
    "is_neutral_site",
    "spread_strength_interaction",
    "spread_defense_interaction",
    "over_under_normalized",
    "weather_temperature",
    "weather_wind_mph",
    "weather_humidity",
    "extreme_cold",
    "extreme_heat",
    "high_wind",
    "is_rainy",
    "is_snowy",
    "bad_weather",
    "weather_offense_interaction",
    "label",
];

/// One labeled game
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureRow {
    pub game_id: u32,
    pub date: NaiveDate,
    pub season: u16,
    pub home_team: String,
    pub away_team: String,
    pub home_team_code: u32,
    pub away_team_code: u32,
    pub home_rolling_points_for: f64,
    pub home_rolling_points_against: f64,
    pub home_win_pct: f64,
    pub away_rolling_points_for: f64,
    pub away_rolling_points_against: f64,
    pub away_win_pct: f64,
    pub diff_points_for: f64,
    pub diff_points_against: f64,
    pub diff_win_pct: f64,
    pub home_rest_days: f64,
    pub away_rest_days: f64,
    pub diff_rest_days: f64,
    pub home_momentum: f64,
    pub away_momentum: f64,
    pub diff_momentum: f64,
    pub home_field_advantage: f64,
    pub vegas_spread: f64,
    pub over_under_line: f64,
    pub is_playoff: bool,
    pub is_neutral_site: bool,
    /// Spread times the points-for gap
    pub spread_strength_interaction: f64,
    /// Spread times the points-against gap
    pub spread_defense_interaction: f64,
    pub over_under_normalized: f64,
    pub weather_temperature: f64,
    pub weather_wind_mph: f64,
    pub weather_humidity: f64,
    pub extreme_cold: bool,
    pub extreme_heat: bool,
    pub high_wind: bool,
    pub is_rainy: bool,
    pub is_snowy: bool,
    pub bad_weather: bool,
    /// Points-for gap when the weather is bad, 0 otherwise
    pub weather_offense_interaction: f64,
    /// 1 if the home team won
    pub label: u8,
}

impl FeatureRow {
    /// Combine a feature candidate with its game; `label` is decided by the caller
    pub fn from_parts(
        game: &GameRecord,
        features: &GameFeatures,
        (home_team, away_team): (&str, &str),
        over_under: &OverUnderStats,
        label: u8,
    ) -> Self {
        let vegas_spread = game.vegas_spread.unwrap_or(0.0);
        let over_under_line = over_under.fill(game.over_under_line);
        let weather = &game.weather;
        let bad_weather = weather.is_bad();
        FeatureRow {
            game_id: game.game_id,
            date: game.date,
            season: game.season,
            home_team: home_team.to_string(),
            away_team: away_team.to_string(),
            home_team_code: game.home_team.0,
            away_team_code: game.away_team.0,
            home_rolling_points_for: features.home.points_for,
            home_rolling_points_against: features.home.points_against,
            home_win_pct: features.home.win_pct,
            away_rolling_points_for: features.away.points_for,
            away_rolling_points_against: features.away.points_against,
            away_win_pct: features.away.win_pct,
            diff_points_for: features.diff_points_for,
            diff_points_against: features.diff_points_against,
            diff_win_pct: features.diff_win_pct,
            home_rest_days: features.home.rest_days,
            away_rest_days: features.away.rest_days,
            diff_rest_days: features.diff_rest_days,
            home_momentum: features.home.momentum,
            away_momentum: features.away.momentum,
            diff_momentum: features.diff_momentum,
            home_field_advantage: features.home_field_advantage,
            vegas_spread,
            over_under_line,
            is_playoff: game.is_playoff,
            is_neutral_site: game.is_neutral_site,
            spread_strength_interaction: vegas_spread * features.diff_points_for,
            spread_defense_interaction: vegas_spread * features.diff_points_against,
            over_under_normalized: over_under.normalize(over_under_line),
            weather_temperature: weather.temperature(),
            weather_wind_mph: weather.wind_mph(),
            weather_humidity: weather.humidity(),
            extreme_cold: weather.extreme_cold(),
            extreme_heat: weather.extreme_heat(),
            high_wind: weather.high_wind(),
            is_rainy: weather.is_rainy(),
            is_snowy: weather.is_snowy(),
            bad_weather,
            weather_offense_interaction: if bad_weather { features.diff_points_for } else { 0.0 },
            label,
        }
    }

    /// Numeric model inputs, ordered as [`FEATURE_NAMES`]
    pub fn feature_vector(&self) -> Vec<f64> {
        vec![
            self.home_team_code as f64,
            self.away_team_code as f64,
            self.vegas_spread,
            self.home_rolling_points_for,
            self.away_rolling_points_for,
            self.home_rolling_points_against,
            self.away_rolling_points_against,
            self.home_win_pct,
            self.away_win_pct,
            self.diff_points_for,
            self.diff_points_against,
            self.diff_win_pct,
            self.home_field_advantage,
            self.home_rest_days,
            self.away_rest_days,
            self.diff_rest_days,
            self.home_momentum,
            self.away_momentum,
            self.diff_momentum,
            self.over_under_line,
            flag(self.is_playoff),
            flag(self.is_neutral_site),
            self.spread_strength_interaction,
            self.spread_defense_interaction,
            self.over_under_normalized,
            self.weather_temperature,
            self.weather_wind_mph,
            self.weather_humidity,
            flag(self.extreme_cold),
            flag(self.extreme_heat),
            flag(self.high_wind),
            flag(self.is_rainy),
            flag(self.is_snowy),
            flag(self.bad_weather),
            self.weather_offense_interaction,
        ]
    }
}

fn flag(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

/// Counts from one assembly pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssemblyStats {
    pub input_games: usize,
    pub history_excluded: usize,
    pub ties_excluded: usize,
    pub rows: usize,
}

/// Immutable labeled feature table
#[derive(Debug, Clone)]
pub struct FeatureTable {
    rows: Vec<FeatureRow>,
    stats: AssemblyStats,
}

impl FeatureTable {
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn stats(&self) -> AssemblyStats {
        self.stats
    }

    pub fn feature_names(&self) -> Vec<String> {
        FEATURE_NAMES.iter().map(|s| s.to_string()).collect()
    }

    /// Feature matrix and label vector, row-aligned
    pub fn matrix(&self) -> (Vec<Vec<f64>>, Vec<f64>) {
        let features = self.rows.iter().map(FeatureRow::feature_vector).collect();
        let labels = self.rows.iter().map(|r| r.label as f64).collect();
        (features, labels)
    }

    /// Fraction of rows won by the home team
    pub fn home_win_rate(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        self.rows.iter().filter(|r| r.label == 1).count() as f64 / self.rows.len() as f64
    }

    /// Write the table as CSV; the header is written even with no rows
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(writer);
        writer.write_record(&CSV_COLUMNS)?;
        for row in &self.rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        self.write_csv(File::create(path)?)?;
        log::info!("Wrote {} feature rows to {}", self.rows.len(), path.display());
        Ok(())
    }
}

/// Joins feature candidates with labels and passthrough columns
#[derive(Debug, Clone, Copy, Default)]
pub struct DatasetAssembler {
    tie_policy: TiePolicy,
}

impl DatasetAssembler {
    pub fn new(tie_policy: TiePolicy) -> Self {
        DatasetAssembler { tie_policy }
    }

    /// Run the rolling builder over the whole log and assemble the table.
    /// The builder is returned with every game committed, ready for
    /// upcoming-game reads.
    pub fn assemble_from_log(
        &self,
        log: &GameLog,
        window: usize,
        policy: HistoryPolicy,
    ) -> Result<(FeatureTable, RollingFeatureBuilder)> {
        let mut builder = RollingFeatureBuilder::new(window, policy);
        let candidates = builder.build(&log.games)?;
        let table = self.assemble(log, &candidates)?;

        // Games with enough history may all be ties dropped afterwards
        if policy == HistoryPolicy::Exclude && table.is_empty() && table.stats.history_excluded > 0 {
            return Err(GridironError::InsufficientHistory {
                window,
                games: table.stats.input_games,
            });
        }
        Ok((table, builder))
    }

    pub fn assemble(&self, log: &GameLog, candidates: &[GameFeatures]) -> Result<FeatureTable> {
        let games: HashMap<u32, &GameRecord> = log.games.iter().map(|g| (g.game_id, g)).collect();
        let over_under = OverUnderStats::from_log(log);

        let mut rows = Vec::with_capacity(candidates.len());
        let mut ties_excluded = 0;

        for features in candidates {
            let game = games
                .get(&features.game_id)
                .ok_or(GridironError::UnknownGame(features.game_id))?;

            if game.is_tie() && self.tie_policy == TiePolicy::Exclude {
                ties_excluded += 1;
                continue;
            }
            let label = u8::from(game.home_score > game.away_score);
            let names = (log.team_name(game.home_team), log.team_name(game.away_team));
            rows.push(FeatureRow::from_parts(game, features, names, &over_under, label));
        }

        let stats = AssemblyStats {
            input_games: log.games.len(),
            history_excluded: log.games.len() - candidates.len(),
            ties_excluded,
            rows: rows.len(),
        };

        log::info!(
            "Assembled {} rows from {} games ({} ties and {} short-history games excluded)",
            stats.rows,
            stats.input_games,
            stats.ties_excluded,
            stats.history_excluded
        );

        Ok(FeatureTable { rows, stats })
    }
}

/// Over/under fill value and scaling, taken from every loaded game
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OverUnderStats {
    /// Median of the published lines, used for missing ones
    pub fill: f64,
    pub mean: f64,
    /// Sample standard deviation of the filled lines
    pub std: f64,
}

impl OverUnderStats {
    pub fn from_log(log: &GameLog) -> Self {
        let fill = median(log.games.iter().filter_map(|g| g.over_under_line));
        let filled: Vec<f64> = log
            .games
            .iter()
            .map(|g| g.over_under_line.unwrap_or(fill))
            .collect();

        let n = filled.len() as f64;
        let mean = if filled.is_empty() {
            0.0
        } else {
            filled.iter().sum::<f64>() / n
        };
        let std = if filled.len() < 2 {
            0.0
        } else {
            (filled.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        };

        OverUnderStats { fill, mean, std }
    }

    pub fn fill(&self, line: Option<f64>) -> f64 {
        line.unwrap_or(self.fill)
    }

    /// Z-score of a line; 0.0 when the lines do not vary
    pub fn normalize(&self, line: f64) -> f64 {
        if self.std > 0.0 {
            (line - self.mean) / self.std
        } else {
            0.0
        }
    }
}

/// Median of the values, 0.0 when there are none
fn median(values: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = values.collect();
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GameLoader;

    const SCORES: &str = "\
schedule_date,schedule_season,schedule_week,schedule_playoff,team_home,score_home,score_away,team_away,spread_favorite,over_under_line,stadium_neutral
9/8/2024,2024,1,FALSE,Chicago Bears,24,17,Tennessee Titans,-4,44,FALSE
9/8/2024,2024,1,FALSE,Houston Texans,29,27,Indianapolis Colts,-3,48,FALSE
9/15/2024,2024,2,FALSE,Tennessee Titans,17,20,New York Jets,-4,41,FALSE
9/15/2024,2024,2,FALSE,Houston Texans,19,13,Chicago Bears,-6.5,,FALSE
9/22/2024,2024,3,FALSE,Indianapolis Colts,21,21,Chicago Bears,-1.5,43,FALSE
9/29/2024,2024,4,FALSE,New York Jets,9,10,Houston Texans,,45,TRUE
";

    fn load() -> GameLog {
        GameLoader::new().load_reader(SCORES.as_bytes()).unwrap()
    }

    #[test]
    fn test_ties_excluded_by_default() {
        let log = load();
        let (table, _) = DatasetAssembler::default()
            .assemble_from_log(&log, 2, HistoryPolicy::Partial)
            .unwrap();

        let stats = table.stats();
        assert_eq!(stats.input_games, 6);
        assert_eq!(stats.ties_excluded, 1);
        assert_eq!(stats.history_excluded, 0);
        assert_eq!(table.len(), stats.input_games - stats.ties_excluded - stats.history_excluded);
        assert!(table.rows().iter().all(|r| r.game_id != 4));
    }

    #[test]
    fn test_ties_kept_as_home_loss() {
        let log = load();
        let (table, _) = DatasetAssembler::new(TiePolicy::HomeLoss)
            .assemble_from_log(&log, 2, HistoryPolicy::Partial)
            .unwrap();

        assert_eq!(table.len(), 6);
        let tie = table.rows().iter().find(|r| r.game_id == 4).unwrap();
        assert_eq!(tie.label, 0);
    }

    #[test]
    fn test_row_count_with_history_exclusion() {
        let log = load();
        let (table, _) = DatasetAssembler::default()
            .assemble_from_log(&log, 1, HistoryPolicy::Exclude)
            .unwrap();

        let stats = table.stats();
        // Only the week-2 Texans/Bears, week-3 tie and week-4 Jets/Texans games have history
        assert_eq!(stats.history_excluded, 3);
        assert_eq!(stats.ties_excluded, 1);
        assert_eq!(table.len(), 6 - 1 - 3);
    }

    #[test]
    fn test_labels_spread_and_fills() {
        let log = load();
        let (table, _) = DatasetAssembler::default()
            .assemble_from_log(&log, 2, HistoryPolicy::Partial)
            .unwrap();

        let first = &table.rows()[0];
        assert_eq!(first.home_team, "Chicago Bears");
        assert_eq!(first.label, 1);
        assert_eq!(first.vegas_spread, -4.0);

        let texans_bears = table.rows().iter().find(|r| r.game_id == 3).unwrap();
        // Missing over/under takes the median of 44, 48, 41, 43, 45
        assert_eq!(texans_bears.over_under_line, 44.0);
        assert_eq!(texans_bears.vegas_spread, -6.5);

        let jets_texans = table.rows().iter().find(|r| r.game_id == 5).unwrap();
        assert_eq!(jets_texans.vegas_spread, 0.0);
        assert_eq!(jets_texans.label, 0);
        assert!(jets_texans.is_neutral_site);
    }

    #[test]
    fn test_diff_matches_sides_in_table() {
        let log = load();
        let (table, _) = DatasetAssembler::default()
            .assemble_from_log(&log, 2, HistoryPolicy::Partial)
            .unwrap();

        for row in table.rows() {
            assert_eq!(row.diff_points_for, row.home_rolling_points_for - row.away_rolling_points_for);
        }
    }

    #[test]
    fn test_rebuild_is_byte_identical() {
        let render = || {
            let log = load();
            let (table, _) = DatasetAssembler::default()
                .assemble_from_log(&log, 2, HistoryPolicy::Partial)
                .unwrap();
            let mut out = Vec::new();
            table.write_csv(&mut out).unwrap();
            out
        };

        let first = render();
        let second = render();
        assert!(!first.is_empty());
        assert_eq!(first, second);

        let text = String::from_utf8(first).unwrap();
        assert!(text.starts_with("game_id,date,season,home_team,away_team"));
        assert_eq!(text.lines().count(), 1 + 5);
    }

    #[test]
    fn test_matrix_shape() {
        let log = load();
        let (table, _) = DatasetAssembler::default()
            .assemble_from_log(&log, 2, HistoryPolicy::Partial)
            .unwrap();
        let (x, y) = table.matrix();

        assert_eq!(x.len(), table.len());
        assert_eq!(y.len(), table.len());
        assert!(x.iter().all(|row| row.len() == FEATURE_NAMES.len()));
        assert!(x.iter().flatten().all(|v| v.is_finite()));
        assert_eq!(table.feature_names().len(), FEATURE_NAMES.len());
    }

    #[test]
    fn test_save_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("features.csv");
        let log = load();
        let (table, _) = DatasetAssembler::default()
            .assemble_from_log(&log, 2, HistoryPolicy::Partial)
            .unwrap();

        table.save(&path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), table.len() + 1);
    }

    #[test]
    fn test_over_under_stats() {
        let stats = OverUnderStats::from_log(&load());
        // Lines 44, 48, 41, 43, 45 plus the filled 44
        assert_eq!(stats.fill, 44.0);
        assert!((stats.mean - 265.0 / 6.0).abs() < 1e-12);
        assert!((stats.std - (161.0_f64 / 30.0).sqrt()).abs() < 1e-12);
        assert_eq!(stats.fill(None), 44.0);
        assert_eq!(stats.fill(Some(50.5)), 50.5);
        assert_eq!(OverUnderStats::default().normalize(47.0), 0.0);
    }

    #[test]
    fn test_interaction_columns() {
        let log = load();
        let stats = OverUnderStats::from_log(&log);
        let (table, _) = DatasetAssembler::default()
            .assemble_from_log(&log, 2, HistoryPolicy::Partial)
            .unwrap();

        for row in table.rows() {
            assert_eq!(row.spread_strength_interaction, row.vegas_spread * row.diff_points_for);
            assert_eq!(row.spread_defense_interaction, row.vegas_spread * row.diff_points_against);
            assert_eq!(row.over_under_normalized, (row.over_under_line - stats.mean) / stats.std);
            // No weather columns in this file
            assert_eq!(row.weather_temperature, 70.0);
            assert_eq!(row.weather_wind_mph, 0.0);
            assert_eq!(row.weather_humidity, 50.0);
            assert!(!row.bad_weather);
            assert_eq!(row.weather_offense_interaction, 0.0);
        }
    }

    #[test]
    fn test_weather_columns() {
        let data = "\
schedule_date,schedule_season,schedule_week,team_home,score_home,score_away,team_away,spread_favorite,weather_temperature,weather_wind_mph,weather_humidity,weather_detail
11/3/2024,2024,9,Chicago Bears,9,3,Green Bay Packers,-3,55,5,60,
11/10/2024,2024,10,Green Bay Packers,13,10,Chicago Bears,-3,25,18,70,Light Snow
11/17/2024,2024,11,Chicago Bears,30,27,Green Bay Packers,-1,92,,40,
11/24/2024,2024,12,Green Bay Packers,20,17,Chicago Bears,-2,48,4,90,Rain Showers
";
        let log = GameLoader::new().load_reader(data.as_bytes()).unwrap();
        let (table, _) = DatasetAssembler::default()
            .assemble_from_log(&log, 1, HistoryPolicy::Partial)
            .unwrap();
        let rows = table.rows();

        assert!(!rows[0].bad_weather);
        assert_eq!(rows[0].weather_offense_interaction, 0.0);

        let snow = &rows[1];
        assert!(snow.extreme_cold && snow.high_wind && snow.is_snowy && snow.bad_weather);
        assert!(!snow.is_rainy);
        // Packers scored 3 and Bears 9 in the previous meeting
        assert_eq!(snow.diff_points_for, -6.0);
        assert_eq!(snow.weather_offense_interaction, -6.0);

        let heat = &rows[2];
        assert!(heat.extreme_heat);
        assert!(!heat.bad_weather);
        assert_eq!(heat.weather_wind_mph, 0.0);

        let rain = &rows[3];
        assert!(rain.is_rainy && rain.bad_weather);
        assert_eq!(rain.weather_offense_interaction, rain.diff_points_for);
        assert_eq!(rain.weather_humidity, 90.0);
    }

    #[test]
    fn test_exclude_policy_with_only_ties_left_errors() {
        let data = "\
schedule_date,schedule_season,schedule_week,team_home,score_home,score_away,team_away
9/8/2024,2024,1,Team A,24,17,Team B
9/15/2024,2024,2,Team B,10,10,Team A
";
        let log = GameLoader::new().load_reader(data.as_bytes()).unwrap();
        let err = DatasetAssembler::default()
            .assemble_from_log(&log, 1, HistoryPolicy::Exclude)
            .unwrap_err();
        assert!(matches!(err, GridironError::InsufficientHistory { window: 1, games: 2 }));
    }

    #[test]
    fn test_empty_table_still_has_header() {
        let data = "\
schedule_date,schedule_season,schedule_week,team_home,score_home,score_away,team_away
9/8/2024,2024,1,Team A,20,20,Team B
";
        let log = GameLoader::new().load_reader(data.as_bytes()).unwrap();
        let (table, _) = DatasetAssembler::default()
            .assemble_from_log(&log, 1, HistoryPolicy::Partial)
            .unwrap();
        assert!(table.is_empty());

        let mut out = Vec::new();
        table.write_csv(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().collect::<Vec<_>>(), vec![CSV_COLUMNS.join(",")]);
    }

    #[test]
    fn test_header_matches_serialized_fields() {
        let log = load();
        let (table, _) = DatasetAssembler::default()
            .assemble_from_log(&log, 2, HistoryPolicy::Partial)
            .unwrap();

        let mut buf = Vec::new();
        {
            let mut derived = csv::Writer::from_writer(&mut buf);
            derived.serialize(&table.rows()[0]).unwrap();
            derived.flush().unwrap();
        }
        let derived = String::from_utf8(buf).unwrap();

        assert_eq!(derived.lines().next().unwrap(), CSV_COLUMNS.join(","));
    }

    #[test]
    fn test_median() {
        assert_eq!(median([3.0, 1.0, 2.0].into_iter()), 2.0);
        assert_eq!(median([4.0, 1.0, 2.0, 3.0].into_iter()), 2.5);
        assert_eq!(median(std::iter::empty()), 0.0);
    }
}
