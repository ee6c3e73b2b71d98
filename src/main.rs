//! NFL game prediction CLI
//!
//! Builds leakage-free rolling features from historical scores and trains a
//! random forest to pick winners.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use gridiron::features::HistoryPolicy;
use gridiron::predict::Matchup;
use gridiron::{Config, Result, Weather};

#[derive(Parser)]
#[command(name = "gridiron")]
#[command(about = "NFL game winner prediction from rolling team statistics", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Data inspection commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Build the labeled feature table and write it as CSV
    Features {
        /// Scores CSV (overrides config)
        #[arg(long)]
        input: Option<String>,
        /// Output CSV (overrides config)
        #[arg(long)]
        output: Option<String>,
        /// Rolling window size
        #[arg(long)]
        window: Option<usize>,
        /// History policy: partial or exclude
        #[arg(long)]
        policy: Option<HistoryPolicy>,
    },
    /// Train the forest and report held-out accuracy
    Train {
        /// Scores CSV (overrides config)
        #[arg(long)]
        input: Option<String>,
        /// Number of trees
        #[arg(long)]
        trees: Option<usize>,
        /// Random seed
        #[arg(long)]
        seed: Option<u64>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Predict an upcoming game
    Predict {
        /// Home team name
        home: String,
        /// Away team name
        away: String,
        /// Game date (YYYY-MM-DD), defaults to a week after the last game
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Favorite's spread
        #[arg(long, allow_hyphen_values = true)]
        spread: Option<f64>,
        /// Over/under line
        #[arg(long)]
        over_under: Option<f64>,
        /// Playoff game
        #[arg(long)]
        playoff: bool,
        /// Played at a neutral site
        #[arg(long)]
        neutral: bool,
        /// Forecast temperature (Fahrenheit)
        #[arg(long, allow_hyphen_values = true)]
        temperature: Option<f64>,
        /// Forecast wind speed (mph)
        #[arg(long)]
        wind: Option<f64>,
        /// Forecast humidity (percent)
        #[arg(long)]
        humidity: Option<f64>,
        /// Forecast description, e.g. "light snow"
        #[arg(long)]
        weather: Option<String>,
        /// Scores CSV (overrides config)
        #[arg(long)]
        input: Option<String>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Show loaded game counts and ranges
    Status {
        /// Scores CSV (overrides config)
        #[arg(long)]
        input: Option<String>,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown format: {}. Use table, json, or csv.", s)),
        }
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Data { action } => match action {
            DataCommands::Status { input } => commands::data_status(&config, input),
        },
        Commands::Features {
            input,
            output,
            window,
            policy,
        } => commands::features(&config, input, output, window, policy),
        Commands::Train {
            input,
            trees,
            seed,
            format,
        } => commands::train(&config, input, trees, seed, format),
        Commands::Predict {
            home,
            away,
            date,
            spread,
            over_under,
            playoff,
            neutral,
            temperature,
            wind,
            humidity,
            weather,
            input,
            format,
        } => {
            let matchup = Matchup {
                date,
                spread,
                over_under,
                is_playoff: playoff,
                is_neutral_site: neutral,
                weather: Weather {
                    temperature,
                    wind_mph: wind,
                    humidity,
                    detail: weather.unwrap_or_default().to_lowercase(),
                },
            };
            commands::predict(&config, &home, &away, matchup, input, format)
        }
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use gridiron::data::{DatasetAssembler, GameLoader, GameLog};
    use gridiron::predict::{format_prediction, Predictor};
    use gridiron::training::Trainer;

    fn load_games(config: &Config, input: Option<String>) -> Result<GameLog> {
        let path = input.unwrap_or_else(|| config.data.games_path.clone());
        GameLoader::new()
            .with_min_season(config.data.min_season)
            .load(&path)
    }

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        println!("Created data/ directory");

        println!("\nNext steps:");
        println!("  1. Place spreadspoke_scores.csv at {}", config.data.games_path);
        println!("  2. Run 'gridiron features' to build the feature table");
        println!("  3. Run 'gridiron train' to evaluate the model");
        println!("  4. Run 'gridiron predict \"Team A\" \"Team B\"' to score a game");

        Ok(())
    }

    pub fn data_status(config: &Config, input: Option<String>) -> Result<()> {
        let path = input.clone().unwrap_or_else(|| config.data.games_path.clone());
        let game_log = load_games(config, input)?;
        let stats = game_log.stats();

        println!("Data Status");
        println!("───────────────────────────────");
        println!("  Path:      {}", path);
        println!("  Teams:     {}", stats.team_count);
        println!("  Games:     {}", stats.game_count);
        println!("  Ties:      {}", stats.tie_count);
        println!("  Playoffs:  {}", stats.playoff_count);
        println!("  Unplayed:  {}", game_log.unplayed);
        if game_log.filtered > 0 {
            println!("  Filtered:  {} (before season {:?})", game_log.filtered, config.data.min_season);
        }
        if let (Some(first), Some(last)) = (stats.first_season, stats.last_season) {
            println!("  Seasons:   {} to {}", first, last);
        }
        if let (Some(earliest), Some(latest)) = (stats.earliest_game, stats.latest_game) {
            println!("  Range:     {} to {}", earliest, latest);
        }

        Ok(())
    }

    pub fn features(
        config: &Config,
        input: Option<String>,
        output: Option<String>,
        window: Option<usize>,
        policy: Option<HistoryPolicy>,
    ) -> Result<()> {
        let mut config = config.clone();
        if let Some(w) = window {
            config.features.window = w;
        }
        if let Some(p) = policy {
            config.features.history_policy = p;
        }
        config.validate()?;

        let game_log = load_games(&config, input)?;
        let (table, builder) = DatasetAssembler::new(config.features.tie_policy).assemble_from_log(
            &game_log,
            config.features.window,
            config.features.history_policy,
        )?;

        let output = output.unwrap_or_else(|| config.data.features_path.clone());
        table.save(&output)?;

        let stats = table.stats();
        println!("Feature Table");
        println!("───────────────────────────────");
        println!("  Output:          {}", output);
        println!("  Rows:            {}", stats.rows);
        println!("  Window:          {} ({} policy)", builder.window(), builder.policy());
        println!("  Ties excluded:   {}", stats.ties_excluded);
        println!("  Short history:   {}", stats.history_excluded);
        println!("  Default fills:   {}", builder.substitutions());
        println!("  Home win rate:   {:.1}%", table.home_win_rate() * 100.0);

        Ok(())
    }

    pub fn train(
        config: &Config,
        input: Option<String>,
        trees: Option<usize>,
        seed: Option<u64>,
        format: OutputFormat,
    ) -> Result<()> {
        let mut config = config.clone();
        if let Some(t) = trees {
            config.training.n_trees = t;
        }
        if let Some(s) = seed {
            config.training.seed = s;
        }
        config.validate()?;

        let game_log = load_games(&config, input)?;
        let (table, _) = DatasetAssembler::new(config.features.tie_policy).assemble_from_log(
            &game_log,
            config.features.window,
            config.features.history_policy,
        )?;

        let report = Trainer::new(config.training.clone()).train(&table)?;

        match format {
            OutputFormat::Table => {
                println!("\nTraining complete!");
                println!("  Trees:          {}", report.model.n_trees());
                println!("  Train rows:     {}", report.train_size);
                println!("  Test rows:      {}", report.test_size);
                println!("  Accuracy:       {:.1}%", report.accuracy * 100.0);
                println!("  Home baseline:  {:.1}%", report.baseline_accuracy * 100.0);
                println!("  Precision:      {:.3}", report.metrics.precision());
                println!("  Recall:         {:.3}", report.metrics.recall());
                println!("  Brier score:    {:.4}", report.metrics.brier_score());
                println!("\nFeature importance");
                println!("───────────────────────────────────────────");
                for imp in &report.importances {
                    println!("  {:<30} {:.4}", imp.feature, imp.importance);
                }
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "accuracy": report.accuracy,
                    "baseline_accuracy": report.baseline_accuracy,
                    "train_size": report.train_size,
                    "test_size": report.test_size,
                    "metrics": {
                        "precision": report.metrics.precision(),
                        "recall": report.metrics.recall(),
                        "brier_score": report.metrics.brier_score(),
                        "confusion": &report.metrics,
                    },
                    "importances": &report.importances,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Csv => {
                println!("feature,importance");
                for imp in &report.importances {
                    println!("{},{:.6}", imp.feature, imp.importance);
                }
            }
        }

        Ok(())
    }

    pub fn predict(
        config: &Config,
        home: &str,
        away: &str,
        matchup: Matchup,
        input: Option<String>,
        format: OutputFormat,
    ) -> Result<()> {
        let game_log = load_games(config, input)?;
        let predictor = Predictor::train(config, &game_log)?;

        let prediction = predictor.predict(home, away, matchup)?;

        match format {
            OutputFormat::Table => {
                print!("{}", format_prediction(&prediction));
            }
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "home": prediction.home_team,
                    "away": prediction.away_team,
                    "date": prediction.date,
                    "home_win_prob": prediction.home_win_prob,
                    "winner": prediction.predicted_winner(),
                    "confidence": format!("{}", prediction.confidence),
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Csv => {
                println!("home,away,date,home_win_prob,winner,confidence");
                println!(
                    "{},{},{},{:.3},{},{}",
                    prediction.home_team,
                    prediction.away_team,
                    prediction.date,
                    prediction.home_win_prob,
                    prediction.predicted_winner(),
                    prediction.confidence
                );
            }
        }

        Ok(())
    }
}
