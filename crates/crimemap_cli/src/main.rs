//! Command-line request layer over the crime-map engine.
//!
//! # Responsibility
//! - Load the engine once from a data directory or JSON config.
//! - Run one query per invocation and print its JSON result to stdout.
//!
//! Exit codes: `0` success, `2` bad arguments or config, `4` not found,
//! `5` any other failure.

use clap::{Parser, Subcommand};
use crimemap_core::{
    default_log_level, init_logging, BoundaryError, ChartError, CrimeMapEngine, EngineConfig,
};
use log::{error, info};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;

const EXIT_CONFIG: u8 = 2;
const EXIT_NOT_FOUND: u8 = 4;
const EXIT_FAILURE: u8 = 5;

/// Query London crime statistics from local data files
#[derive(Parser, Debug)]
#[command(name = "crimemap")]
#[command(about = "Query region totals, time series, boundaries and charts")]
struct Cli {
    /// Directory holding the crime, population and boundary files
    #[arg(long, env = "CRIMEMAP_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// JSON configuration file; `--data-dir` overrides its data directory
    #[arg(long, env = "CRIMEMAP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, env = "CRIMEMAP_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off without it
    #[arg(long, env = "CRIMEMAP_LOG_DIR")]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Per-region counts and rates per 1,000 residents
    Totals {
        /// Exact category name, or `All`
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Monthly counts for one region
    Series {
        region: String,

        /// Exact category name, or `All`
        #[arg(short, long)]
        category: Option<String>,
    },

    /// `All` followed by every category in the window
    Categories,

    /// Region boundaries as WGS84 GeoJSON
    Boundaries,

    /// Registered chart datasets and their titles
    Charts,

    /// Rows of one chart dataset
    Chart { key: String },

    /// Load diagnostics for every source
    Report,
}

#[derive(Debug)]
enum CommandError {
    NotFound(String),
    Failed(String),
}

impl CommandError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::NotFound(_) => EXIT_NOT_FOUND,
            Self::Failed(_) => EXIT_FAILURE,
        }
    }

    fn message(&self) -> &str {
        match self {
            Self::NotFound(message) | Self::Failed(message) => message,
        }
    }
}

impl From<BoundaryError> for CommandError {
    fn from(value: BoundaryError) -> Self {
        match value {
            BoundaryError::NotLoaded => Self::NotFound(value.to_string()),
            BoundaryError::Projection(_) => Self::Failed(value.to_string()),
        }
    }
}

impl From<ChartError> for CommandError {
    fn from(value: ChartError) -> Self {
        if value.is_not_found() {
            Self::NotFound(value.to_string())
        } else {
            Self::Failed(value.to_string())
        }
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(value: serde_json::Error) -> Self {
        Self::Failed(format!("could not serialize result: {value}"))
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("error: {err}");
            return ExitCode::from(EXIT_CONFIG);
        }
    }

    let config = match build_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let engine = CrimeMapEngine::load(&config);
    for unavailable in &engine.load_report().unavailable {
        eprintln!("warning: {unavailable}");
    }

    match run(&engine, cli.command) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            match &err {
                CommandError::NotFound(_) => {
                    info!("event=cli_command module=cli status=warn reason=not_found")
                }
                CommandError::Failed(message) => {
                    error!("event=cli_command module=cli status=error error={message}")
                }
            }
            eprintln!("error: {}", err.message());
            ExitCode::from(err.exit_code())
        }
    }
}

fn build_config(cli: &Cli) -> Result<EngineConfig, crimemap_core::ConfigError> {
    let mut config = match cli.config.as_ref() {
        Some(path) => EngineConfig::load_json_file(path)?,
        None => EngineConfig::default(),
    };
    if let Some(data_dir) = cli.data_dir.as_ref() {
        config.data_dir = data_dir.clone();
    }
    Ok(config)
}

fn run(engine: &CrimeMapEngine, command: Commands) -> Result<String, CommandError> {
    let value: Value = match command {
        Commands::Totals { category } => {
            serde_json::to_value(engine.region_totals(category.as_deref()))?
        }
        Commands::Series { region, category } => {
            serde_json::to_value(engine.time_series(&region, category.as_deref()))?
        }
        Commands::Categories => json!(engine.categories()),
        Commands::Boundaries => engine.standard_projected_boundaries()?,
        Commands::Charts => json!(engine.chart_titles()),
        Commands::Chart { key } => serde_json::to_value(engine.chart_data(&key)?)?,
        Commands::Report => serde_json::to_value(engine.load_report())?,
    };
    Ok(serde_json::to_string_pretty(&value)?)
}
