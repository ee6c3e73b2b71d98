//! Leakage-free rolling feature extraction
//!
//! Games are streamed in chronological order. For every game the builder first
//! reads both teams' current aggregates and only then stages the game's result.
//! Staged results are committed once the stream moves past the game's date, so
//! a team's features for a game never include that game, a later game, or
//! another game played on the same date.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::team_stats::{TeamGameStat, TeamState};
use crate::{GameRecord, GridironError, Result, TeamId};

/// How to treat games where a team has fewer than N prior games
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryPolicy {
    /// Average over the games available; sentinels when there are none
    #[default]
    Partial,
    /// Drop the game unless both teams have a full window
    Exclude,
}

impl fmt::Display for HistoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryPolicy::Partial => write!(f, "partial"),
            HistoryPolicy::Exclude => write!(f, "exclude"),
        }
    }
}

impl FromStr for HistoryPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "partial" => Ok(HistoryPolicy::Partial),
            "exclude" => Ok(HistoryPolicy::Exclude),
            _ => Err(format!("Unknown history policy: {}. Use partial or exclude.", s)),
        }
    }
}

/// Values substituted when a team has no usable history
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sentinels {
    /// League-average points per game
    pub points_for: f64,
    pub points_against: f64,
    pub win_pct: f64,
    /// A regular week of rest
    pub rest_days: f64,
    pub momentum: f64,
    pub home_field_advantage: f64,
}

impl Default for Sentinels {
    fn default() -> Self {
        Sentinels {
            points_for: 21.0,
            points_against: 21.0,
            win_pct: 0.5,
            rest_days: 7.0,
            momentum: 0.0,
            home_field_advantage: 0.0,
        }
    }
}

/// Rolling aggregates for one team going into a game
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SideFeatures {
    pub points_for: f64,
    pub points_against: f64,
    pub win_pct: f64,
    pub rest_days: f64,
    pub momentum: f64,
    /// Games in the window the averages were taken over
    pub window_games: usize,
}

/// Feature candidate for one game, before labels are joined
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GameFeatures {
    pub game_id: u32,
    pub home: SideFeatures,
    pub away: SideFeatures,
    pub diff_points_for: f64,
    pub diff_points_against: f64,
    pub diff_win_pct: f64,
    pub diff_rest_days: f64,
    pub diff_momentum: f64,
    pub home_field_advantage: f64,
}

impl GameFeatures {
    pub fn new(game_id: u32, home: SideFeatures, away: SideFeatures, home_field_advantage: f64) -> Self {
        GameFeatures {
            game_id,
            home,
            away,
            diff_points_for: home.points_for - away.points_for,
            diff_points_against: home.points_against - away.points_against,
            diff_win_pct: home.win_pct - away.win_pct,
            diff_rest_days: home.rest_days - away.rest_days,
            diff_momentum: home.momentum - away.momentum,
            home_field_advantage,
        }
    }
}

/// Streams games and emits one [`GameFeatures`] per game that passes the
/// history policy
#[derive(Debug)]
pub struct RollingFeatureBuilder {
    window: usize,
    policy: HistoryPolicy,
    sentinels: Sentinels,
    teams: HashMap<TeamId, TeamState>,
    /// Results staged for `pending_date`, not yet visible to reads
    pending: Vec<(TeamId, TeamGameStat)>,
    pending_date: Option<NaiveDate>,
    /// Team sides read with zero prior games
    substitutions: usize,
    excluded: usize,
}

impl RollingFeatureBuilder {
    pub fn new(window: usize, policy: HistoryPolicy) -> Self {
        RollingFeatureBuilder {
            window: window.max(1),
            policy,
            sentinels: Sentinels::default(),
            teams: HashMap::new(),
            pending: Vec::new(),
            pending_date: None,
            substitutions: 0,
            excluded: 0,
        }
    }

    pub fn with_sentinels(mut self, sentinels: Sentinels) -> Self {
        self.sentinels = sentinels;
        self
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn policy(&self) -> HistoryPolicy {
        self.policy
    }

    /// Number of team sides that fell back to sentinel values
    pub fn substitutions(&self) -> usize {
        self.substitutions
    }

    /// Number of games dropped by [`HistoryPolicy::Exclude`]
    pub fn excluded(&self) -> usize {
        self.excluded
    }

    /// Committed prior games for a team
    pub fn games_played(&self, team: TeamId) -> usize {
        self.teams.get(&team).map_or(0, TeamState::games_played)
    }

    /// Build features for every game; `games` must be in chronological order
    pub fn build(&mut self, games: &[GameRecord]) -> Result<Vec<GameFeatures>> {
        let mut features = Vec::with_capacity(games.len());

        for (idx, game) in games.iter().enumerate() {
            if self.pending_date.is_some_and(|d| game.date < d) {
                return Err(GridironError::DataFormat {
                    row: idx + 1,
                    message: format!(
                        "game {} on {} is out of chronological order",
                        game.game_id, game.date
                    ),
                });
            }
            if let Some(f) = self.process(game) {
                features.push(f);
            }
        }
        self.commit();

        if self.substitutions > 0 {
            log::warn!(
                "{} team sides had no prior games; substituted defaults ({:.1} pts for/against, {:.2} win pct)",
                self.substitutions,
                self.sentinels.points_for,
                self.sentinels.win_pct
            );
        }

        if self.policy == HistoryPolicy::Exclude {
            log::info!(
                "Excluded {} of {} games lacking {} prior games",
                self.excluded,
                games.len(),
                self.window
            );
            if features.is_empty() && !games.is_empty() {
                return Err(GridironError::InsufficientHistory {
                    window: self.window,
                    games: games.len(),
                });
            }
        }

        log::info!(
            "Built rolling features for {} games (window {}, {} policy)",
            features.len(),
            self.window,
            self.policy
        );
        Ok(features)
    }

    /// Read both teams' aggregates for `game`, then stage its result
    pub fn process(&mut self, game: &GameRecord) -> Option<GameFeatures> {
        if self.pending_date.is_some_and(|d| game.date > d) {
            self.commit();
        }

        let home_games = self.window_games(game.home_team);
        let away_games = self.window_games(game.away_team);
        let candidate = self.features_for(game.game_id, game.home_team, game.away_team, game.date);

        for (team, prior) in [(game.home_team, home_games), (game.away_team, away_games)] {
            if prior == 0 && self.policy == HistoryPolicy::Partial {
                log::debug!("{} has no prior games before {}, using defaults", team, game.date);
                self.substitutions += 1;
            }
        }

        let (home_stat, away_stat) = TeamGameStat::pair(game);
        self.pending.push((game.home_team, home_stat));
        self.pending.push((game.away_team, away_stat));
        self.pending_date = Some(game.date);

        match self.policy {
            HistoryPolicy::Exclude if home_games < self.window || away_games < self.window => {
                self.excluded += 1;
                None
            }
            _ => Some(candidate),
        }
    }

    /// Make staged results visible to subsequent reads
    pub fn commit(&mut self) {
        let window = self.window;
        for (team, stat) in self.pending.drain(..) {
            self.teams
                .entry(team)
                .or_insert_with(|| TeamState::new(window))
                .record(stat);
        }
        self.pending_date = None;
    }

    /// Current aggregates for a game between `home` and `away` on `date`,
    /// using committed results only
    pub fn features_for(
        &self,
        game_id: u32,
        home: TeamId,
        away: TeamId,
        date: NaiveDate,
    ) -> GameFeatures {
        let home_state = self.teams.get(&home);
        let home_field_advantage = home_state
            .and_then(TeamState::home_field_advantage)
            .unwrap_or(self.sentinels.home_field_advantage);

        GameFeatures::new(
            game_id,
            self.side(home_state, date),
            self.side(self.teams.get(&away), date),
            home_field_advantage,
        )
    }

    fn window_games(&self, team: TeamId) -> usize {
        self.teams.get(&team).map_or(0, |s| s.recent().len())
    }

    fn side(&self, state: Option<&TeamState>, date: NaiveDate) -> SideFeatures {
        let s = &self.sentinels;
        match state {
            None => SideFeatures {
                points_for: s.points_for,
                points_against: s.points_against,
                win_pct: s.win_pct,
                rest_days: s.rest_days,
                momentum: s.momentum,
                window_games: 0,
            },
            Some(state) => {
                let recent = state.recent();
                SideFeatures {
                    points_for: recent.avg_points_for().unwrap_or(s.points_for),
                    points_against: recent.avg_points_against().unwrap_or(s.points_against),
                    win_pct: recent.win_pct().unwrap_or(s.win_pct),
                    rest_days: state.rest_days(date).unwrap_or(s.rest_days),
                    momentum: state.momentum().unwrap_or(s.momentum),
                    window_games: recent.len(),
                }
            }
        }
    }
}
