//! Source readers feeding the record store.
//!
//! # Responsibility
//! - Deliver raw tabular rows and raw boundary documents.
//! - Keep file-format details (CSV, GeoJSON) out of the loader.
//!
//! # Invariants
//! - Readers never normalize values; they only transport text and geometry.
//! - A missing file is reported as `SourceError::Missing`, distinct from
//!   decode failures.

use crate::model::geometry::Geometry;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Reader-level failure.
#[derive(Debug)]
pub enum SourceError {
    Missing(PathBuf),
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Csv(csv::Error),
    Json(serde_json::Error),
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Missing(path) => write!(f, "source file not found: {}", path.display()),
            Self::Io { path, source } => write!(f, "failed to read `{}`: {source}", path.display()),
            Self::Csv(err) => write!(f, "{err}"),
            Self::Json(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Missing(_) => None,
            Self::Io { source, .. } => Some(source),
            Self::Csv(err) => Some(err),
            Self::Json(err) => Some(err),
        }
    }
}

impl From<csv::Error> for SourceError {
    fn from(value: csv::Error) -> Self {
        Self::Csv(value)
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

/// Header plus text cells, as delivered by a tabular reader.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Builds a table from string slices; convenient for fixtures.
    pub fn from_rows(headers: &[&str], rows: &[&[&str]]) -> Self {
        Self {
            headers: headers.iter().map(|h| (*h).to_string()).collect(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
                .collect(),
        }
    }
}

/// Tabular reader seam.
pub trait TabularSource {
    /// Human-readable origin used in logs and load diagnostics.
    fn describe(&self) -> String;
    fn read_table(&self) -> Result<RawTable, SourceError>;
}

impl TabularSource for RawTable {
    fn describe(&self) -> String {
        "in-memory table".to_string()
    }

    fn read_table(&self) -> Result<RawTable, SourceError> {
        Ok(self.clone())
    }
}

/// CSV file reader with a header row.
#[derive(Debug, Clone)]
pub struct CsvFileSource {
    path: PathBuf,
}

impl CsvFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TabularSource for CsvFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read_table(&self) -> Result<RawTable, SourceError> {
        read_csv_table(&self.path)
    }
}

/// Reads a headed CSV file into a [`RawTable`].
///
/// Short rows are padded with empty cells so every row lines up with the
/// header.
pub fn read_csv_table(path: &Path) -> Result<RawTable, SourceError> {
    if !path.is_file() {
        return Err(SourceError::Missing(path.to_path_buf()));
    }

    let file = File::open(path).map_err(|source| SourceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = reader
        .headers()?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').to_string())
        .collect::<Vec<_>>();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut row = record.iter().map(str::to_string).collect::<Vec<_>>();
        row.resize(headers.len().max(row.len()), String::new());
        rows.push(row);
    }

    Ok(RawTable { headers, rows })
}

/// One boundary feature before name detection and canonicalization.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawFeature {
    #[serde(default, deserialize_with = "null_as_empty_map")]
    pub properties: Map<String, Value>,
    pub geometry: Geometry,
}

/// Boundary document before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawBoundaries {
    /// Value of `crs.properties.name`, when declared.
    pub crs_name: Option<String>,
    pub features: Vec<RawFeature>,
}

/// Boundary reader seam.
pub trait BoundarySource {
    fn describe(&self) -> String;
    fn read_boundaries(&self) -> Result<RawBoundaries, SourceError>;
}

impl BoundarySource for RawBoundaries {
    fn describe(&self) -> String {
        "in-memory boundaries".to_string()
    }

    fn read_boundaries(&self) -> Result<RawBoundaries, SourceError> {
        Ok(self.clone())
    }
}

/// GeoJSON `FeatureCollection` file reader.
#[derive(Debug, Clone)]
pub struct GeoJsonFileSource {
    path: PathBuf,
}

impl GeoJsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BoundarySource for GeoJsonFileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn read_boundaries(&self) -> Result<RawBoundaries, SourceError> {
        if !self.path.is_file() {
            return Err(SourceError::Missing(self.path.clone()));
        }
        let file = File::open(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        let document: FeatureCollectionDoc = serde_json::from_reader(BufReader::new(file))?;
        Ok(document.into())
    }
}

/// Parses a GeoJSON `FeatureCollection` held in memory.
pub fn parse_geojson(text: &str) -> Result<RawBoundaries, SourceError> {
    let document: FeatureCollectionDoc = serde_json::from_str(text)?;
    Ok(document.into())
}

#[derive(Deserialize)]
struct FeatureCollectionDoc {
    #[serde(default)]
    crs: Option<CrsDoc>,
    features: Vec<RawFeature>,
}

#[derive(Deserialize)]
struct CrsDoc {
    properties: CrsPropertiesDoc,
}

#[derive(Deserialize)]
struct CrsPropertiesDoc {
    name: String,
}

impl From<FeatureCollectionDoc> for RawBoundaries {
    fn from(value: FeatureCollectionDoc) -> Self {
        Self {
            crs_name: value.crs.map(|crs| crs.properties.name),
            features: value.features,
        }
    }
}

fn null_as_empty_map<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::{parse_geojson, read_csv_table, SourceError};
    use std::io::Write;

    #[test]
    fn csv_reader_pads_short_rows_and_strips_bom() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "\u{feff}Borough,Offence Group,Count,Month_Year\nCamden,Burglary,5,01/01/2015\nHackney,Theft\n"
        )
        .unwrap();

        let table = read_csv_table(file.path()).unwrap();
        assert_eq!(table.headers[0], "Borough");
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[1], vec!["Hackney", "Theft", "", ""]);
    }

    #[test]
    fn csv_reader_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_csv_table(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, SourceError::Missing(_)));
    }

    #[test]
    fn geojson_reader_reads_crs_and_null_properties() {
        let raw = parse_geojson(
            r#"{
                "type": "FeatureCollection",
                "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::27700"}},
                "features": [
                    {"type": "Feature", "properties": null,
                     "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(raw.crs_name.as_deref(), Some("urn:ogc:def:crs:EPSG::27700"));
        assert_eq!(raw.features.len(), 1);
        assert!(raw.features[0].properties.is_empty());
    }

    #[test]
    fn geojson_reader_rejects_unsupported_geometry() {
        let err = parse_geojson(
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{},"geometry":{"type":"Point","coordinates":[0,0]}}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, SourceError::Json(_)));
    }
}
