//! Historical game loading
//!
//! Reads the spreadspoke-style score table into chronologically ordered
//! [`GameRecord`]s and interns team names into dense [`TeamId`]s.

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};
use std::collections::{BTreeSet, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::{GameRecord, GridironError, Result, TeamId, Weather, Week};

const COL_DATE: &str = "schedule_date";
const COL_SEASON: &str = "schedule_season";
const COL_WEEK: &str = "schedule_week";
const COL_HOME: &str = "team_home";
const COL_AWAY: &str = "team_away";
const COL_HOME_SCORE: &str = "score_home";
const COL_AWAY_SCORE: &str = "score_away";
const COL_SPREAD: &str = "spread_favorite";
const COL_OVER_UNDER: &str = "over_under_line";
const COL_PLAYOFF: &str = "schedule_playoff";
const COL_NEUTRAL: &str = "stadium_neutral";
const COL_TEMPERATURE: &str = "weather_temperature";
const COL_WIND: &str = "weather_wind_mph";
const COL_HUMIDITY: &str = "weather_humidity";
const COL_WEATHER_DETAIL: &str = "weather_detail";

const REQUIRED_COLUMNS: [&str; 7] = [
    COL_DATE,
    COL_SEASON,
    COL_WEEK,
    COL_HOME,
    COL_AWAY,
    COL_HOME_SCORE,
    COL_AWAY_SCORE,
];

/// Team name to dense id mapping, ids assigned in sorted-name order
#[derive(Debug, Clone, Default)]
pub struct TeamRegistry {
    names: Vec<String>,
    ids: HashMap<String, TeamId>,
}

impl TeamRegistry {
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let sorted: BTreeSet<String> = names.into_iter().map(Into::into).collect();
        let names: Vec<String> = sorted.into_iter().collect();
        let ids = names
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), TeamId(idx as u32)))
            .collect();
        TeamRegistry { names, ids }
    }

    pub fn id(&self, name: &str) -> Option<TeamId> {
        self.ids.get(name).copied()
    }

    pub fn name(&self, id: TeamId) -> Option<&str> {
        self.names.get(id.0 as usize).map(String::as_str)
    }

    /// Look up a team by exact or case-insensitive name
    pub fn resolve(&self, name: &str) -> Result<TeamId> {
        if let Some(id) = self.id(name) {
            return Ok(id);
        }
        let lower = name.to_lowercase();
        self.names
            .iter()
            .position(|n| n.to_lowercase() == lower)
            .map(|idx| TeamId(idx as u32))
            .ok_or_else(|| GridironError::UnknownTeam(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TeamId, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, name)| (TeamId(idx as u32), name.as_str()))
    }
}

/// Loaded games in replay order plus the team registry
#[derive(Debug, Clone)]
pub struct GameLog {
    pub games: Vec<GameRecord>,
    pub teams: TeamRegistry,
    /// Rows without scores (unplayed games)
    pub unplayed: usize,
    /// Rows dropped by the season filter
    pub filtered: usize,
}

/// Summary of a loaded game log
#[derive(Debug, Clone, Default)]
pub struct GameLogStats {
    pub game_count: usize,
    pub team_count: usize,
    pub tie_count: usize,
    pub playoff_count: usize,
    pub first_season: Option<u16>,
    pub last_season: Option<u16>,
    pub earliest_game: Option<NaiveDate>,
    pub latest_game: Option<NaiveDate>,
}

impl GameLog {
    pub fn stats(&self) -> GameLogStats {
        GameLogStats {
            game_count: self.games.len(),
            team_count: self.teams.len(),
            tie_count: self.games.iter().filter(|g| g.is_tie()).count(),
            playoff_count: self.games.iter().filter(|g| g.is_playoff).count(),
            first_season: self.games.iter().map(|g| g.season).min(),
            last_season: self.games.iter().map(|g| g.season).max(),
            earliest_game: self.games.first().map(|g| g.date),
            latest_game: self.games.last().map(|g| g.date),
        }
    }

    pub fn team_name(&self, id: TeamId) -> &str {
        self.teams.name(id).unwrap_or("?")
    }
}

/// A parsed row before team names are interned
struct RawGame {
    game_id: u32,
    date: NaiveDate,
    season: u16,
    week: Week,
    home: String,
    away: String,
    home_score: u16,
    away_score: u16,
    vegas_spread: Option<f64>,
    over_under_line: Option<f64>,
    is_playoff: bool,
    is_neutral_site: bool,
    weather: Weather,
}

/// Column positions resolved from the header row
struct Columns {
    date: usize,
    season: usize,
    week: usize,
    home: usize,
    away: usize,
    home_score: usize,
    away_score: usize,
    spread: Option<usize>,
    over_under: Option<usize>,
    playoff: Option<usize>,
    neutral: Option<usize>,
    temperature: Option<usize>,
    wind: Option<usize>,
    humidity: Option<usize>,
    weather_detail: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h == name);
        let require = |name: &str| find(name).ok_or_else(|| GridironError::MissingColumn(name.to_string()));

        for name in REQUIRED_COLUMNS {
            require(name)?;
        }

        Ok(Columns {
            date: require(COL_DATE)?,
            season: require(COL_SEASON)?,
            week: require(COL_WEEK)?,
            home: require(COL_HOME)?,
            away: require(COL_AWAY)?,
            home_score: require(COL_HOME_SCORE)?,
            away_score: require(COL_AWAY_SCORE)?,
            spread: find(COL_SPREAD),
            over_under: find(COL_OVER_UNDER),
            playoff: find(COL_PLAYOFF),
            neutral: find(COL_NEUTRAL),
            temperature: find(COL_TEMPERATURE),
            wind: find(COL_WIND),
            humidity: find(COL_HUMIDITY),
            weather_detail: find(COL_WEATHER_DETAIL),
        })
    }
}

/// Loader for historical game results
#[derive(Debug, Clone, Default)]
pub struct GameLoader {
    min_season: Option<u16>,
}

impl GameLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop games from seasons before `min_season`
    pub fn with_min_season(mut self, min_season: Option<u16>) -> Self {
        self.min_season = min_season;
        self
    }

    /// Load games from a CSV file
    pub fn load<P: AsRef<Path>>(&self, path: P) -> Result<GameLog> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            GridironError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to open {}: {}", path.display(), e),
            ))
        })?;
        let game_log = self.load_reader(file)?;
        log::info!(
            "Loaded {} games for {} teams from {}",
            game_log.games.len(),
            game_log.teams.len(),
            path.display()
        );
        Ok(game_log)
    }

    /// Load games from any CSV source
    pub fn load_reader<R: Read>(&self, reader: R) -> Result<GameLog> {
        let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);
        let columns = Columns::from_headers(reader.headers()?)?;

        let mut raw_games = Vec::new();
        let mut unplayed = 0;
        let mut filtered = 0;

        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            let row = idx + 1;

            let season: u16 = parse_field(&record, columns.season, row, COL_SEASON)?;
            if self.min_season.is_some_and(|min| season < min) {
                filtered += 1;
                continue;
            }

            let (home_score, away_score) = match (
                field(&record, columns.home_score),
                field(&record, columns.away_score),
            ) {
                ("", "") => {
                    log::debug!("Row {}: no score, skipping unplayed game", row);
                    unplayed += 1;
                    continue;
                }
                _ => (
                    parse_field::<u16>(&record, columns.home_score, row, COL_HOME_SCORE)?,
                    parse_field::<u16>(&record, columns.away_score, row, COL_AWAY_SCORE)?,
                ),
            };

            let home = field(&record, columns.home).to_string();
            let away = field(&record, columns.away).to_string();
            if home.is_empty() || away.is_empty() {
                return Err(GridironError::DataFormat {
                    row,
                    message: "blank team name".to_string(),
                });
            }
            if home == away {
                return Err(GridironError::DataFormat {
                    row,
                    message: format!("{} listed as both home and away team", home),
                });
            }

            let week: Week = field(&record, columns.week)
                .parse()
                .map_err(|message| GridironError::DataFormat { row, message })?;
            let is_playoff = match columns.playoff {
                Some(col) => parse_bool(field(&record, col), row, COL_PLAYOFF)?,
                None => week.is_playoff(),
            };

            raw_games.push(RawGame {
                game_id: idx as u32,
                date: parse_date(field(&record, columns.date), row)?,
                season,
                week,
                home,
                away,
                home_score,
                away_score,
                vegas_spread: optional_f64(&record, columns.spread, row, COL_SPREAD)?,
                over_under_line: optional_f64(&record, columns.over_under, row, COL_OVER_UNDER)?,
                is_playoff,
                is_neutral_site: match columns.neutral {
                    Some(col) => parse_bool(field(&record, col), row, COL_NEUTRAL)?,
                    None => false,
                },
                weather: Weather {
                    temperature: lenient_f64(&record, columns.temperature, row, COL_TEMPERATURE),
                    wind_mph: lenient_f64(&record, columns.wind, row, COL_WIND),
                    humidity: lenient_f64(&record, columns.humidity, row, COL_HUMIDITY),
                    detail: columns
                        .weather_detail
                        .map(|col| field(&record, col).to_lowercase())
                        .unwrap_or_default(),
                },
            });
        }

        if unplayed > 0 {
            log::warn!("Skipped {} rows without scores", unplayed);
        }
        if filtered > 0 {
            log::info!(
                "Dropped {} games before season {}",
                filtered,
                self.min_season.unwrap_or_default()
            );
        }

        let teams = TeamRegistry::from_names(
            raw_games
                .iter()
                .flat_map(|g| [g.home.clone(), g.away.clone()]),
        );

        let mut games: Vec<GameRecord> = raw_games
            .into_iter()
            .map(|g| GameRecord {
                game_id: g.game_id,
                date: g.date,
                season: g.season,
                week: g.week,
                home_team: teams.ids[&g.home],
                away_team: teams.ids[&g.away],
                home_score: g.home_score,
                away_score: g.away_score,
                vegas_spread: g.vegas_spread,
                over_under_line: g.over_under_line,
                is_playoff: g.is_playoff,
                is_neutral_site: g.is_neutral_site,
                weather: g.weather,
            })
            .collect();

        games.sort_by_key(|g| (g.date, g.game_id));

        Ok(GameLog {
            games,
            teams,
            unplayed,
            filtered,
        })
    }
}

fn field(record: &StringRecord, col: usize) -> &str {
    record.get(col).unwrap_or("")
}

fn parse_field<T: std::str::FromStr>(
    record: &StringRecord,
    col: usize,
    row: usize,
    name: &str,
) -> Result<T> {
    let raw = field(record, col);
    raw.parse().map_err(|_| GridironError::DataFormat {
        row,
        message: format!("column {} is not numeric: {:?}", name, raw),
    })
}

fn optional_f64(
    record: &StringRecord,
    col: Option<usize>,
    row: usize,
    name: &str,
) -> Result<Option<f64>> {
    match col.map(|c| field(record, c)) {
        None | Some("") => Ok(None),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| GridironError::DataFormat {
                row,
                message: format!("column {} is not numeric: {:?}", name, raw),
            }),
    }
}

/// Weather readings are free-form; anything unparseable counts as missing
fn lenient_f64(record: &StringRecord, col: Option<usize>, row: usize, name: &str) -> Option<f64> {
    let raw = field(record, col?);
    if raw.is_empty() {
        return None;
    }
    let value = raw.parse::<f64>().ok().filter(|v| v.is_finite());
    if value.is_none() {
        log::debug!("Row {}: ignoring {} value {:?}", row, name, raw);
    }
    value
}

fn parse_date(raw: &str, row: usize) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%m/%d/%Y")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .map_err(|_| GridironError::DataFormat {
            row,
            message: format!("column {} is not a date: {:?}", COL_DATE, raw),
        })
}

fn parse_bool(raw: &str, row: usize, name: &str) -> Result<bool> {
    match raw.to_lowercase().as_str() {
        "" | "false" | "0" => Ok(false),
        "true" | "1" => Ok(true),
        _ => Err(GridironError::DataFormat {
            row,
            message: format!("column {} is not a boolean: {:?}", name, raw),
        }),
    }
}
