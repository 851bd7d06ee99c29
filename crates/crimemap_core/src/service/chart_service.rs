//! Static chart datasets served next to the map.
//!
//! # Responsibility
//! - Keep the registry of chart datasets and their column mappings.
//! - Extract `{x, y, label}` rows from the registered files on request.
//!
//! # Invariants
//! - Column names are matched exactly as configured.
//! - Rows with an empty or NA-marker selected cell are dropped.

use crate::store::source::{read_csv_table, SourceError};
use log::{error, info};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Visualization kind rendered by the front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartKind {
    Line,
    RadialBar,
}

/// One registered chart dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDefinition {
    /// Dataset key used by callers.
    pub key: String,
    /// File name relative to the data directory (`.csv` or `.json`).
    pub file_name: String,
    pub x: String,
    pub y: String,
    pub label: String,
    pub chart: ChartKind,
    pub title: String,
}

impl ChartDefinition {
    /// Built-in datasets shipped with the map.
    pub fn defaults() -> Vec<Self> {
        vec![
            Self {
                key: "Major_Crimes_Trend".to_string(),
                file_name: "Crime_Major_Trend.csv".to_string(),
                x: "Year".to_string(),
                y: "Count".to_string(),
                label: "Offence Group".to_string(),
                chart: ChartKind::Line,
                title: "Trend of Major Crimes in London (2014–2024)".to_string(),
            },
            Self {
                key: "Crime_Lockdown_Patterns".to_string(),
                file_name: "COVID_Crime_Data.csv".to_string(),
                x: "Phase".to_string(),
                y: "Count".to_string(),
                label: "CrimeCategory".to_string(),
                chart: ChartKind::RadialBar,
                title: "Crime Counts across COVID Lockdown Phases (2014–2024)".to_string(),
            },
        ]
    }
}

/// Column mapping echoed back with chart data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartColumns {
    pub x: String,
    pub y: String,
    pub label: String,
    pub chart: ChartKind,
    pub title: String,
}

impl From<&ChartDefinition> for ChartColumns {
    fn from(value: &ChartDefinition) -> Self {
        Self {
            x: value.x.clone(),
            y: value.y.clone(),
            label: value.label.clone(),
            chart: value.chart,
            title: value.title.clone(),
        }
    }
}

/// Chart payload: extracted rows (or raw JSON) plus the mapping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartData {
    pub data: Value,
    pub columns: ChartColumns,
}

/// Chart dataset error.
#[derive(Debug)]
pub enum ChartError {
    UnknownDataset(String),
    SourceMissing(String),
    MissingColumns(Vec<String>),
    Read(SourceError),
}

impl ChartError {
    /// Whether the error means "nothing to serve" rather than a broken file.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownDataset(_) | Self::SourceMissing(_))
    }
}

impl Display for ChartError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownDataset(key) => write!(f, "invalid dataset name for charts: {key}"),
            Self::SourceMissing(file) => write!(f, "data file not found: {file}"),
            Self::MissingColumns(columns) => {
                write!(f, "expected columns not found in dataset: {}", columns.join(", "))
            }
            Self::Read(err) => write!(f, "could not process chart data: {err}"),
        }
    }
}

impl Error for ChartError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read(err) => Some(err),
            _ => None,
        }
    }
}

impl From<SourceError> for ChartError {
    fn from(value: SourceError) -> Self {
        Self::Read(value)
    }
}

/// Serves registered chart datasets from a data directory.
#[derive(Debug, Clone)]
pub struct ChartService {
    data_dir: PathBuf,
    charts: Vec<ChartDefinition>,
}

impl ChartService {
    pub fn new(data_dir: impl Into<PathBuf>, charts: Vec<ChartDefinition>) -> Self {
        Self {
            data_dir: data_dir.into(),
            charts,
        }
    }

    /// Maps every dataset key to its title.
    pub fn chart_titles(&self) -> BTreeMap<String, String> {
        self.charts
            .iter()
            .map(|chart| (chart.key.clone(), chart.title.clone()))
            .collect()
    }

    /// Reads one dataset.
    ///
    /// # Errors
    /// - `UnknownDataset` for an unregistered key.
    /// - `SourceMissing` when the file does not exist.
    /// - `MissingColumns` when a mapped column is absent.
    /// - `Read` when the file cannot be decoded.
    pub fn chart_data(&self, key: &str) -> Result<ChartData, ChartError> {
        let Some(definition) = self.charts.iter().find(|chart| chart.key == key) else {
            return Err(ChartError::UnknownDataset(key.to_string()));
        };

        let path = self.data_dir.join(&definition.file_name);
        if !path.is_file() {
            return Err(ChartError::SourceMissing(definition.file_name.clone()));
        }

        let result = if is_json(&path) {
            read_json(&path)
        } else {
            read_csv_points(&path, definition)
        };

        match result {
            Ok(data) => {
                info!(
                    "event=chart_data module=chart status=ok dataset={} rows={}",
                    key,
                    data.as_array().map_or(0, Vec::len)
                );
                Ok(ChartData {
                    data,
                    columns: definition.into(),
                })
            }
            Err(err) => {
                error!("event=chart_data module=chart status=error dataset={key} error={err}");
                Err(err)
            }
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn read_json(path: &Path) -> Result<Value, ChartError> {
    let file = File::open(path).map_err(|source| {
        ChartError::Read(SourceError::Io {
            path: path.to_path_buf(),
            source,
        })
    })?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|err| ChartError::Read(SourceError::Json(err)))
}

fn read_csv_points(path: &Path, definition: &ChartDefinition) -> Result<Value, ChartError> {
    let table = read_csv_table(path)?;
    let wanted = [&definition.x, &definition.y, &definition.label];

    let mut indices = Vec::with_capacity(wanted.len());
    let mut missing = Vec::new();
    for column in wanted {
        match table.headers.iter().position(|header| header == column) {
            Some(index) => indices.push(index),
            None => missing.push(column.clone()),
        }
    }
    if !missing.is_empty() {
        return Err(ChartError::MissingColumns(missing));
    }

    let points = table
        .rows
        .iter()
        .filter_map(|row| {
            let cells = indices
                .iter()
                .map(|index| row.get(*index).map(|cell| cell.trim()).unwrap_or(""))
                .collect::<Vec<_>>();
            if cells.iter().any(|cell| is_missing_cell(cell)) {
                return None;
            }
            let mut point = Map::new();
            point.insert("x".to_string(), typed_cell(cells[0]));
            point.insert("y".to_string(), typed_cell(cells[1]));
            point.insert("label".to_string(), typed_cell(cells[2]));
            Some(Value::Object(point))
        })
        .collect::<Vec<_>>();

    Ok(json!(points))
}

/// Cell spellings treated as missing, matching pandas' default NA markers.
const NA_MARKERS: &[&str] = &[
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing_cell(cell: &str) -> bool {
    cell.is_empty() || NA_MARKERS.contains(&cell)
}

fn typed_cell(cell: &str) -> Value {
    if let Ok(integer) = cell.parse::<i64>() {
        return Value::Number(integer.into());
    }
    cell.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| Value::String(cell.to_string()), Value::Number)
}

#[cfg(test)]
mod tests {
    use super::{is_missing_cell, typed_cell};
    use serde_json::json;

    #[test]
    fn numeric_cells_become_numbers() {
        assert_eq!(typed_cell("2019"), json!(2019));
        assert_eq!(typed_cell("1.5"), json!(1.5));
        assert_eq!(typed_cell("Theft"), json!("Theft"));
    }

    #[test]
    fn na_markers_count_as_missing() {
        for cell in ["", "NaN", "NA", "N/A", "null", "None", "#N/A"] {
            assert!(is_missing_cell(cell), "`{cell}` should be missing");
        }
        assert!(!is_missing_cell("0"));
        assert!(!is_missing_cell("Nando"));
    }
}
