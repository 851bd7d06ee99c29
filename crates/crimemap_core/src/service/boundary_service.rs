//! Boundary serialization in the standard WGS84 reference.
//!
//! # Invariants
//! - Output coordinates are always EPSG:4326 `[lon, lat]`.
//! - "Not loaded" and projection failures are distinct errors.

use crate::model::geometry::{BoundaryCollection, Geometry};
use crate::projection::{geometry_to_wgs84, ProjectionError};
use crate::store::RecordRepository;
use log::{error, info};
use serde::Serialize;
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

const MIN_RING_POSITIONS: usize = 4;
const MIN_POSITION_ORDINATES: usize = 2;

/// Boundary query error.
#[derive(Debug)]
pub enum BoundaryError {
    /// The boundary source was not loaded at startup.
    NotLoaded,
    /// Reprojection or serialization failed.
    Projection(ProjectionError),
}

impl Display for BoundaryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotLoaded => write!(f, "boundary data not loaded"),
            Self::Projection(err) => write!(f, "could not format boundary data: {err}"),
        }
    }
}

impl Error for BoundaryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NotLoaded => None,
            Self::Projection(err) => Some(err),
        }
    }
}

impl From<ProjectionError> for BoundaryError {
    fn from(value: ProjectionError) -> Self {
        Self::Projection(value)
    }
}

#[derive(Serialize)]
struct FeatureCollectionOut {
    #[serde(rename = "type")]
    kind: &'static str,
    features: Vec<FeatureOut>,
}

#[derive(Serialize)]
struct FeatureOut {
    #[serde(rename = "type")]
    kind: &'static str,
    properties: Map<String, Value>,
    geometry: Geometry,
}

/// Projects stored boundaries to WGS84 GeoJSON.
#[derive(Debug, Clone)]
pub struct BoundaryService<R: RecordRepository> {
    repo: R,
}

impl<R: RecordRepository> BoundaryService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the boundary `FeatureCollection` in EPSG:4326.
    ///
    /// # Errors
    /// - `BoundaryError::NotLoaded` when the source was unavailable.
    /// - `BoundaryError::Projection` for unsupported CRS, malformed rings or
    ///   serialization failures.
    pub fn standard_projected_boundaries(&self) -> Result<Value, BoundaryError> {
        let Some(collection) = self.repo.boundaries() else {
            return Err(BoundaryError::NotLoaded);
        };

        match project_collection(collection) {
            Ok(value) => {
                info!(
                    "event=boundary_projection module=boundary status=ok source_crs={} features={}",
                    collection.crs.label(),
                    collection.features.len()
                );
                Ok(value)
            }
            Err(err) => {
                error!(
                    "event=boundary_projection module=boundary status=error source_crs={} error={}",
                    collection.crs.label(),
                    err
                );
                Err(err.into())
            }
        }
    }
}

fn project_collection(collection: &BoundaryCollection) -> Result<Value, ProjectionError> {
    let mut features = Vec::with_capacity(collection.features.len());
    for (feature_index, feature) in collection.features.iter().enumerate() {
        if let Some(ring) = feature
            .geometry
            .rings()
            .find(|ring| ring.len() < MIN_RING_POSITIONS)
        {
            return Err(ProjectionError::DegenerateRing {
                feature_index,
                positions: ring.len(),
            });
        }
        if let Some(position) = feature
            .geometry
            .positions()
            .find(|position| position.len() < MIN_POSITION_ORDINATES)
        {
            return Err(ProjectionError::IncompletePosition {
                ordinates: position.len(),
            });
        }

        features.push(FeatureOut {
            kind: "Feature",
            properties: feature.properties.clone(),
            geometry: geometry_to_wgs84(&collection.crs, &feature.geometry)?,
        });
    }

    Ok(serde_json::to_value(FeatureCollectionOut {
        kind: "FeatureCollection",
        features,
    })?)
}
