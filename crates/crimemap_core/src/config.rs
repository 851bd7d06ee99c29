//! Engine configuration.
//!
//! # Responsibility
//! - Name the data files and observation window used at startup.
//! - Load overrides from JSON, defaulting every omitted field.
//!
//! # Invariants
//! - The window is validated when the configuration is built or parsed.

use crate::model::window::{ObservationWindow, WindowError};
use crate::service::chart_service::ChartDefinition;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_DIR: &str = "static/data";
pub const DEFAULT_CRIME_FILE: &str = "Crime_Data.csv";
pub const DEFAULT_POPULATION_FILE: &str = "Population_Forecast.csv";
pub const DEFAULT_BOUNDARY_FILE: &str = "london_boroughs.geojson";

/// Startup configuration for [`crate::CrimeMapEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding every data file.
    pub data_dir: PathBuf,
    pub crime_file: String,
    pub population_file: String,
    pub boundary_file: String,
    pub window: ObservationWindow,
    pub charts: Vec<ChartDefinition>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            crime_file: DEFAULT_CRIME_FILE.to_string(),
            population_file: DEFAULT_POPULATION_FILE.to_string(),
            boundary_file: DEFAULT_BOUNDARY_FILE.to_string(),
            window: ObservationWindow::default(),
            charts: ChartDefinition::defaults(),
        }
    }
}

/// Configuration load error.
#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Json(serde_json::Error),
    Window(WindowError),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Json(err) => write!(f, "invalid config: {err}"),
            Self::Window(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Json(err) => Some(err),
            Self::Window(err) => Some(err),
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

impl From<WindowError> for ConfigError {
    fn from(value: WindowError) -> Self {
        Self::Window(value)
    }
}

impl EngineConfig {
    /// Default file names under a custom data directory.
    pub fn from_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    /// Replaces the window with one spanning whole years.
    pub fn with_year_window(mut self, start_year: i32, end_year: i32) -> Result<Self, ConfigError> {
        self.window = ObservationWindow::from_years(start_year, end_year)?;
        Ok(self)
    }

    /// Parses a JSON configuration; omitted fields keep their defaults.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Reads a JSON configuration file.
    pub fn load_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    pub fn crime_path(&self) -> PathBuf {
        self.data_dir.join(&self.crime_file)
    }

    pub fn population_path(&self) -> PathBuf {
        self.data_dir.join(&self.population_file)
    }

    pub fn boundary_path(&self) -> PathBuf {
        self.data_dir.join(&self.boundary_file)
    }
}
