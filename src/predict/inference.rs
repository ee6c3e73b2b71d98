//! Scoring upcoming games

use chrono::{Datelike, Duration, NaiveDate};

use crate::data::{DatasetAssembler, FeatureRow, GameLog, OverUnderStats, TeamRegistry};
use crate::features::{HistoryPolicy, RollingFeatureBuilder};
use crate::training::{RandomForest, Trainer};
use crate::{
    Config, ConfidenceLevel, GameRecord, GridironError, Prediction, Result, TeamId, Weather, Week,
};

/// Betting, venue and weather context for an upcoming game
#[derive(Debug, Clone, Default)]
pub struct Matchup {
    /// Defaults to a week after the last loaded game
    pub date: Option<NaiveDate>,
    pub spread: Option<f64>,
    pub over_under: Option<f64>,
    pub is_playoff: bool,
    pub is_neutral_site: bool,
    pub weather: Weather,
}

/// Fitted forest plus the rolling state after every loaded game
pub struct Predictor {
    model: RandomForest,
    builder: RollingFeatureBuilder,
    teams: TeamRegistry,
    last_game: Option<NaiveDate>,
    over_under: OverUnderStats,
}

impl Predictor {
    pub fn new(model: RandomForest, builder: RollingFeatureBuilder, log: &GameLog) -> Self {
        Predictor {
            model,
            builder,
            teams: log.teams.clone(),
            last_game: log.games.last().map(|g| g.date),
            over_under: OverUnderStats::from_log(log),
        }
    }

    /// Build features for the whole log and fit on every labeled row
    pub fn train(config: &Config, log: &GameLog) -> Result<Self> {
        let (table, builder) = DatasetAssembler::new(config.features.tie_policy).assemble_from_log(
            log,
            config.features.window,
            config.features.history_policy,
        )?;
        if table.is_empty() {
            return Err(GridironError::EmptyDataset(
                "no labeled games to train on".to_string(),
            ));
        }
        let model = Trainer::new(config.training.clone()).fit_all(&table)?;
        Ok(Self::new(model, builder, log))
    }

    pub fn default_date(&self) -> NaiveDate {
        self.last_game
            .map(|d| d + Duration::days(7))
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    }

    /// Predict a game between two named teams
    pub fn predict(&self, home_team: &str, away_team: &str, matchup: Matchup) -> Result<Prediction> {
        let home = self.teams.resolve(home_team)?;
        let away = self.teams.resolve(away_team)?;
        self.predict_teams(home, away, matchup)
    }

    pub fn predict_teams(&self, home: TeamId, away: TeamId, matchup: Matchup) -> Result<Prediction> {
        if home == away {
            return Err(GridironError::InvalidMatchup(format!(
                "{} cannot play itself",
                self.team_name(home)
            )));
        }

        let date = matchup.date.unwrap_or_else(|| self.default_date());
        if let Some(last) = self.last_game.filter(|&last| date <= last) {
            return Err(GridironError::InvalidMatchup(format!(
                "{} is not after the last loaded game ({})",
                date, last
            )));
        }

        let window = self.builder.window();
        let home_games = self.builder.games_played(home);
        let away_games = self.builder.games_played(away);
        if self.builder.policy() == HistoryPolicy::Exclude && home_games.min(away_games) < window {
            return Err(GridironError::InsufficientHistory {
                window,
                games: home_games.min(away_games),
            });
        }

        let game = GameRecord {
            game_id: u32::MAX,
            date,
            season: season_of(date),
            week: if matchup.is_playoff {
                Week::Wildcard
            } else {
                Week::Regular(0)
            },
            home_team: home,
            away_team: away,
            home_score: 0,
            away_score: 0,
            vegas_spread: matchup.spread,
            over_under_line: matchup.over_under,
            is_playoff: matchup.is_playoff,
            is_neutral_site: matchup.is_neutral_site,
            weather: matchup.weather,
        };
        let features = self.builder.features_for(game.game_id, home, away, date);
        let row = FeatureRow::from_parts(
            &game,
            &features,
            (self.team_name(home), self.team_name(away)),
            &self.over_under,
            0,
        );

        let home_win_prob = self.model.predict_proba(&row.feature_vector());
        log::debug!(
            "{} vs {} on {}: features {:?}, p(home) = {:.3}",
            row.home_team,
            row.away_team,
            date,
            row.feature_vector(),
            home_win_prob
        );

        Ok(Prediction {
            home_team: row.home_team,
            away_team: row.away_team,
            date,
            home_win_prob,
            confidence: ConfidenceLevel::from_history(home_games, away_games, window),
        })
    }

    pub fn team_name(&self, id: TeamId) -> &str {
        self.teams.name(id).unwrap_or("?")
    }
}

/// NFL seasons run September to February
fn season_of(date: NaiveDate) -> u16 {
    let year = if date.month() < 3 {
        date.year() - 1
    } else {
        date.year()
    };
    u16::try_from(year).unwrap_or(0)
}

/// Format a prediction for display
pub fn format_prediction(pred: &Prediction) -> String {
    let winner = pred.predicted_winner();
    let win_prob = if pred.home_win_prob >= 0.5 {
        pred.home_win_prob
    } else {
        1.0 - pred.home_win_prob
    };

    format!(
        r#"
┌─────────────────────────────────────────────────┐
│  {} vs {}  ({})
├─────────────────────────────────────────────────┤
│  Home win probability:  {:.1}%
│  Predicted winner:      {} ({:.1}%)
│  Confidence:            {}
└─────────────────────────────────────────────────┘
"#,
        pred.home_team,
        pred.away_team,
        pred.date,
        pred.home_win_prob * 100.0,
        winner,
        win_prob * 100.0,
        pred.confidence
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::GameLoader;
    use std::fmt::Write;

    /// Bears win every game, Titans lose every game
    fn scores() -> String {
        let mut out = String::from(
            "schedule_date,schedule_season,schedule_week,team_home,score_home,score_away,team_away,spread_favorite,over_under_line\n",
        );
        let start = NaiveDate::from_ymd_opt(2023, 9, 10).unwrap();
        let pairs = [
            ("Chicago Bears", 31, 10, "Tennessee Titans"),
            ("Green Bay Packers", 20, 17, "Detroit Lions"),
        ];
        for week in 0..16 {
            let date = start + Duration::days(7 * week);
            for (i, (home, hs, aws, away)) in pairs.iter().enumerate() {
                let (home, away, hs, aws) = if (week as usize + i) % 2 == 0 {
                    (home, away, hs, aws)
                } else {
                    (away, home, aws, hs)
                };
                writeln!(out, "{},2023,{},{},{},{},{},-3,44", date, week + 1, home, hs, aws, away).unwrap();
            }
        }
        out
    }

    fn config() -> Config {
        let mut config = Config::default();
        config.data.min_season = None;
        config.training.n_trees = 15;
        config.training.min_samples_split = 2;
        config.training.min_samples_leaf = 1;
        config
    }

    fn predictor(config: &Config) -> Predictor {
        let log = GameLoader::new().load_reader(scores().as_bytes()).unwrap();
        Predictor::train(config, &log).unwrap()
    }

    #[test]
    fn test_predicts_stronger_team() {
        let predictor = predictor(&config());
        let pred = predictor
            .predict("Chicago Bears", "Tennessee Titans", Matchup::default())
            .unwrap();

        assert!(pred.home_win_prob > 0.5, "p = {}", pred.home_win_prob);
        assert_eq!(pred.predicted_winner(), "Chicago Bears");
        assert_eq!(pred.confidence, ConfidenceLevel::High);
        // Last loaded game is 2023-12-24
        assert_eq!(pred.date, NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());

        let reverse = predictor
            .predict("tennessee titans", "chicago bears", Matchup::default())
            .unwrap();
        assert!(reverse.home_win_prob < 0.5, "p = {}", reverse.home_win_prob);
    }

    #[test]
    fn test_unknown_team() {
        let predictor = predictor(&config());
        assert!(matches!(
            predictor.predict("Chicago Bears", "London Monarchs", Matchup::default()),
            Err(GridironError::UnknownTeam(ref t)) if t == "London Monarchs"
        ));
    }

    #[test]
    fn test_invalid_matchups() {
        let predictor = predictor(&config());
        assert!(matches!(
            predictor.predict("Chicago Bears", "Chicago Bears", Matchup::default()),
            Err(GridironError::InvalidMatchup(_))
        ));

        let past = Matchup {
            date: NaiveDate::from_ymd_opt(2023, 10, 1),
            ..Matchup::default()
        };
        assert!(matches!(
            predictor.predict("Chicago Bears", "Detroit Lions", past),
            Err(GridironError::InvalidMatchup(_))
        ));
    }

    #[test]
    fn test_matchup_context_changes_features() {
        let predictor = predictor(&config());
        let home = predictor.teams.resolve("Chicago Bears").unwrap();
        let away = predictor.teams.resolve("Tennessee Titans").unwrap();
        let date = predictor.default_date();
        let features = predictor.builder.features_for(u32::MAX, home, away, date);

        let plain = GameRecord {
            game_id: u32::MAX,
            date,
            season: season_of(date),
            week: Week::Regular(0),
            home_team: home,
            away_team: away,
            home_score: 0,
            away_score: 0,
            vegas_spread: None,
            over_under_line: None,
            is_playoff: false,
            is_neutral_site: false,
            weather: Weather::default(),
        };
        let stormy = GameRecord {
            is_playoff: true,
            is_neutral_site: true,
            weather: Weather {
                temperature: Some(20.0),
                wind_mph: Some(25.0),
                humidity: None,
                detail: "snow".to_string(),
            },
            ..plain.clone()
        };
        let names = ("Chicago Bears", "Tennessee Titans");
        let plain = FeatureRow::from_parts(&plain, &features, names, &predictor.over_under, 0);
        let stormy = FeatureRow::from_parts(&stormy, &features, names, &predictor.over_under, 0);

        assert!(stormy.is_playoff && stormy.is_neutral_site);
        assert!(stormy.bad_weather && stormy.high_wind && stormy.extreme_cold);
        assert_eq!(stormy.weather_offense_interaction, stormy.diff_points_for);
        assert_ne!(plain.feature_vector(), stormy.feature_vector());

        // All lines are 44, so the fill is 44 and the z-score is 0
        assert_eq!(plain.over_under_line, 44.0);
        assert_eq!(plain.over_under_normalized, 0.0);
    }

    #[test]
    fn test_predict_accepts_full_matchup() {
        let predictor = predictor(&config());
        let matchup = Matchup {
            date: NaiveDate::from_ymd_opt(2024, 1, 13),
            spread: Some(-7.0),
            over_under: Some(41.5),
            is_playoff: true,
            is_neutral_site: true,
            weather: Weather {
                temperature: Some(5.0),
                wind_mph: Some(20.0),
                humidity: Some(60.0),
                detail: "snow".to_string(),
            },
        };
        let pred = predictor
            .predict("Chicago Bears", "Tennessee Titans", matchup)
            .unwrap();
        assert!((0.0..=1.0).contains(&pred.home_win_prob));
        assert_eq!(pred.date, NaiveDate::from_ymd_opt(2024, 1, 13).unwrap());
    }

    #[test]
    fn test_format_prediction() {
        let pred = Prediction {
            home_team: "Chicago Bears".to_string(),
            away_team: "Detroit Lions".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 9, 8).unwrap(),
            home_win_prob: 0.25,
            confidence: ConfidenceLevel::Medium,
        };
        let text = format_prediction(&pred);
        assert!(text.contains("Home win probability:  25.0%"));
        assert!(text.contains("Detroit Lions (75.0%)"));
        assert!(text.contains("Medium"));
    }

    #[test]
    fn test_season_of() {
        assert_eq!(season_of(NaiveDate::from_ymd_opt(2024, 9, 8).unwrap()), 2024);
        assert_eq!(season_of(NaiveDate::from_ymd_opt(2025, 2, 9).unwrap()), 2024);
    }
}
