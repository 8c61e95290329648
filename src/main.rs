//! Football Prediction CLI
//!
//! Match outcome, goals, over/under and BTTS predictions from team histories.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use football::{Config, Result};

#[derive(Parser)]
#[command(name = "football")]
#[command(about = "Football match prediction", long_about = None)]
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
    /// Data management commands
    Data {
        #[command(subcommand)]
        action: DataCommands,
    },
    /// Predict a match
    Predict {
        /// Home team name
        home: String,
        /// Away team name
        away: String,
        /// League the fixture belongs to
        #[arg(long)]
        league: String,
        /// Only use matches before this date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Over/under goal line
        #[arg(long)]
        line: Option<f32>,
        /// Output format
        #[arg(long, default_value = "table")]
        format: OutputFormat,
    },
    /// Model management commands
    Model {
        #[command(subcommand)]
        action: ModelCommands,
    },
    /// Report whether a model is loaded and ready
    Health,
    /// Initialize a new project with default config
    Init,
}

#[derive(Subcommand)]
enum DataCommands {
    /// Import team histories from a JSON snapshot
    Import {
        /// Snapshot file
        path: String,
    },
    /// Show database status
    Status,
}

#[derive(Subcommand)]
enum ModelCommands {
    /// Show model information
    Info,
    /// Write the hand-weighted baseline model as an artifact
    Baseline {
        /// Output directory (defaults to the configured artifact directory)
        dir: Option<String>,
    },
}

#[derive(Clone, Debug)]
enum OutputFormat {
    Table,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use table or json.", s)),
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
            DataCommands::Import { path } => commands::data_import(&config, &path),
            DataCommands::Status => commands::data_status(&config),
        },
        Commands::Predict {
            home,
            away,
            league,
            date,
            line,
            format,
        } => commands::predict(&config, &home, &away, &league, date, line, format),
        Commands::Model { action } => match action {
            ModelCommands::Info => commands::model_info(&config),
            ModelCommands::Baseline { dir } => commands::model_baseline(&config, dir),
        },
        Commands::Health => commands::health(&config),
        Commands::Init => commands::init(&cli.config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use burn::backend::NdArray;
    use football::data::{Database, StoreSnapshot};
    use football::model::artifact::{read_manifest, save_artifact};
    use football::model::{BurnModel, MatchNet, ModelManifest};
    use football::predict::{format_prediction, PredictionEngine};
    use football::{FootballError, MatchContext};
    use std::path::Path;

    type MyBackend = NdArray<f32>;

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all("data")?;
        std::fs::create_dir_all("model")?;
        println!("Created data/ and model/ directories");

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!("  2. Run 'football data import <snapshot.json>' to load team histories");
        println!("  3. Run 'football model baseline' or copy a trained artifact into model/current");
        println!("  4. Run 'football predict \"Team A\" \"Team B\" --league \"League\"' to make predictions");

        Ok(())
    }

    pub fn data_import(config: &Config, path: &str) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let snapshot = StoreSnapshot::load(path)?;

        println!("Importing {} teams from {}...", snapshot.teams.len(), path);
        let count = db.import_snapshot(&snapshot)?;
        println!("Stored {} new history entries", count);

        Ok(())
    }

    pub fn data_status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:     {}", config.data.database_path);
        println!("  Teams:    {}", stats.team_count);
        println!("  Leagues:  {}", stats.league_count);
        println!("  Entries:  {}", stats.entry_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_match, stats.latest_match) {
            println!("  Range:    {} to {}", earliest, latest);
        }

        Ok(())
    }

    fn open_engine(config: &Config) -> Result<PredictionEngine<Database, BurnModel<MyBackend>>> {
        let db = Database::open(&config.data.database_path)?;
        let engine = PredictionEngine::new(db, config);

        let dir = Path::new(&config.model.artifact_dir);
        if dir.join("manifest.json").exists() {
            let model = BurnModel::<MyBackend>::load(dir, Default::default())?;
            engine.load_model(model)?;
        } else {
            log::warn!("No model artifact at {}", dir.display());
        }

        Ok(engine)
    }

    pub fn predict(
        config: &Config,
        home: &str,
        away: &str,
        league: &str,
        date: Option<NaiveDate>,
        line: Option<f32>,
        format: OutputFormat,
    ) -> Result<()> {
        let engine = open_engine(config)?;
        if !engine.is_ready() {
            println!("Run 'football model baseline' to create a model artifact");
            return Err(FootballError::ModelUnavailable);
        }

        let mut ctx = MatchContext::new(home, away, league);
        if let Some(date) = date {
            ctx = ctx.with_as_of(date);
        }
        if let Some(line) = line {
            ctx = ctx.with_over_under_line(line);
        }

        let prediction = engine.predict(&ctx)?;
        match format {
            OutputFormat::Table => {
                print!("{}", format_prediction(&prediction));
                for warning in &prediction.data_warnings {
                    println!("  warning: {}", warning);
                }
            }
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&prediction.to_json())?);
            }
        }

        Ok(())
    }

    pub fn health(config: &Config) -> Result<()> {
        let engine = open_engine(config)?;
        println!("{}", serde_json::to_string_pretty(&engine.health())?);
        Ok(())
    }

    pub fn model_info(config: &Config) -> Result<()> {
        let manifest = read_manifest(&config.model.artifact_dir)?;
        let arch = &manifest.architecture;

        println!("Model Information");
        println!("───────────────────────────────");
        println!("  Path:           {}", config.model.artifact_dir);
        println!("  Version:        {}", manifest.model_version);
        println!(
            "  Features:       {} (layout v{}, {:08x})",
            manifest.feature_count, manifest.feature_version, manifest.layout_hash
        );
        println!("  Hidden dims:    {:?}", arch.hidden_dims);
        println!("  Head hidden:    {}", arch.head_hidden_dim);
        println!("  O/U lines:      {:?}", manifest.over_under_lines);
        println!(
            "  Temperatures:   result {}, o/u {}, btts {}",
            manifest.calibration.result_temperature,
            manifest.calibration.over_under_temperature,
            manifest.calibration.btts_temperature
        );
        if let Some(created) = &manifest.created_at {
            println!("  Created:        {}", created);
        }

        Ok(())
    }

    pub fn model_baseline(config: &Config, dir: Option<String>) -> Result<()> {
        let dir = dir.unwrap_or_else(|| config.model.artifact_dir.clone());
        let (net, architecture) = MatchNet::<MyBackend>::baseline(&Default::default());
        let manifest = ModelManifest::baseline(architecture);

        save_artifact(&dir, &manifest, &net)?;
        println!("Baseline model {} written to {}", manifest.model_version, dir);

        Ok(())
    }
}
