//! Team statistics computation
//!
//! Per-game team results and the bounded trailing windows built from them.

use chrono::NaiveDate;
use std::collections::VecDeque;

use crate::GameRecord;

/// One team's result in one game
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamGameStat {
    pub date: NaiveDate,
    pub points_for: u16,
    pub points_against: u16,
    /// 1.0 win, 0.0 loss, 0.5 tie
    pub win: f64,
    pub at_home: bool,
}

/// 1.0 for a win, 0.0 for a loss, 0.5 for a tie
pub fn win_value(points_for: u16, points_against: u16) -> f64 {
    match points_for.cmp(&points_against) {
        std::cmp::Ordering::Greater => 1.0,
        std::cmp::Ordering::Less => 0.0,
        std::cmp::Ordering::Equal => 0.5,
    }
}

impl TeamGameStat {
    /// Home and away stat lines for a game
    pub fn pair(record: &GameRecord) -> (Self, Self) {
        let (home_for, home_against) = (record.home_score, record.away_score);
        let home = TeamGameStat {
            date: record.date,
            points_for: home_for,
            points_against: home_against,
            win: win_value(home_for, home_against),
            at_home: true,
        };
        let away = TeamGameStat {
            date: record.date,
            points_for: home_against,
            points_against: home_for,
            win: win_value(home_against, home_for),
            at_home: false,
        };
        (home, away)
    }
}

/// Bounded trailing sequence of a team's games, oldest first
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    games: VecDeque<TeamGameStat>,
}

impl RollingWindow {
    pub fn new(capacity: usize) -> Self {
        RollingWindow {
            capacity,
            games: VecDeque::with_capacity(capacity + 1),
        }
    }

    /// Append the newest game, returning the evicted oldest game when full
    pub fn push(&mut self, stat: TeamGameStat) -> Option<TeamGameStat> {
        debug_assert!(
            self.games.back().map_or(true, |last| last.date <= stat.date),
            "games must be pushed in chronological order"
        );
        self.games.push_back(stat);
        if self.games.len() > self.capacity {
            self.games.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.games.len() >= self.capacity
    }

    /// Average points scored, None for an empty window
    pub fn avg_points_for(&self) -> Option<f64> {
        self.average(|g| g.points_for as f64)
    }

    /// Average points allowed, None for an empty window
    pub fn avg_points_against(&self) -> Option<f64> {
        self.average(|g| g.points_against as f64)
    }

    /// Share of games won (ties count half), None for an empty window
    pub fn win_pct(&self) -> Option<f64> {
        self.average(|g| g.win)
    }

    fn average(&self, value: impl Fn(&TeamGameStat) -> f64) -> Option<f64> {
        if self.games.is_empty() {
            return None;
        }
        Some(self.games.iter().map(value).sum::<f64>() / self.games.len() as f64)
    }
}

/// Everything the builder tracks for one team
#[derive(Debug, Clone)]
pub struct TeamState {
    /// Last N games
    recent: RollingWindow,
    /// The N games before `recent`
    previous: RollingWindow,
    last_game: Option<NaiveDate>,
    games_played: usize,
    home_games: usize,
    home_wins: f64,
    away_games: usize,
    away_wins: f64,
}

impl TeamState {
    pub fn new(window: usize) -> Self {
        TeamState {
            recent: RollingWindow::new(window),
            previous: RollingWindow::new(window),
            last_game: None,
            games_played: 0,
            home_games: 0,
            home_wins: 0.0,
            away_games: 0,
            away_wins: 0.0,
        }
    }

    /// Fold a completed game into the state
    pub fn record(&mut self, stat: TeamGameStat) {
        if let Some(evicted) = self.recent.push(stat) {
            self.previous.push(evicted);
        }

        self.last_game = Some(stat.date);
        self.games_played += 1;
        if stat.at_home {
            self.home_games += 1;
            self.home_wins += stat.win;
        } else {
            self.away_games += 1;
            self.away_wins += stat.win;
        }
    }

    pub fn recent(&self) -> &RollingWindow {
        &self.recent
    }

    pub fn games_played(&self) -> usize {
        self.games_played
    }

    /// Days since the previous game
    pub fn rest_days(&self, on: NaiveDate) -> Option<f64> {
        self.last_game
            .map(|last| (on - last).num_days() as f64)
    }

    /// Recent scoring average minus the average of the window before it
    pub fn momentum(&self) -> Option<f64> {
        Some(self.recent.avg_points_for()? - self.previous.avg_points_for()?)
    }

    /// Home win percentage minus away win percentage over all prior games
    pub fn home_field_advantage(&self) -> Option<f64> {
        if self.home_games == 0 || self.away_games == 0 {
            return None;
        }
        Some(self.home_wins / self.home_games as f64 - self.away_wins / self.away_games as f64)
    }
}
