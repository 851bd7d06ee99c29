//! Boundary geometry as loaded from GeoJSON sources.
//!
//! # Invariants
//! - `BoundaryFeature::region` is canonicalized like every other region key.
//! - Coordinates are kept in the collection's source CRS until projected.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Horizontal `[x, y]` or `[lon, lat]` ordinates, depending on the collection CRS.
pub type Point = [f64; 2];

/// GeoJSON position: horizontal ordinates followed by any extra ordinates
/// (altitude). Extra ordinates are carried through reprojection unchanged.
pub type Position = Vec<f64>;

/// Linear ring; closed rings repeat the first position at the end.
pub type Ring = Vec<Position>;

/// Polygonal geometry supported for boundary features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// Applies `transform` to every position, stopping at the first error.
    pub fn try_map_positions<E>(
        &self,
        mut transform: impl FnMut(&[f64]) -> Result<Position, E>,
    ) -> Result<Geometry, E> {
        match self {
            Self::Polygon(rings) => Ok(Self::Polygon(map_rings(rings, &mut transform)?)),
            Self::MultiPolygon(polygons) => Ok(Self::MultiPolygon(
                polygons
                    .iter()
                    .map(|rings| map_rings(rings, &mut transform))
                    .collect::<Result<_, E>>()?,
            )),
        }
    }

    /// Iterates over every ring of the geometry.
    pub fn rings(&self) -> Box<dyn Iterator<Item = &Ring> + '_> {
        match self {
            Self::Polygon(rings) => Box::new(rings.iter()),
            Self::MultiPolygon(polygons) => Box::new(polygons.iter().flatten()),
        }
    }

    /// Iterates over every position of every ring.
    pub fn positions(&self) -> impl Iterator<Item = &Position> + '_ {
        self.rings().flatten()
    }
}

fn map_rings<E>(
    rings: &[Ring],
    transform: &mut impl FnMut(&[f64]) -> Result<Position, E>,
) -> Result<Vec<Ring>, E> {
    rings
        .iter()
        .map(|ring| ring.iter().map(|pos| transform(pos.as_slice())).collect())
        .collect()
}

/// One named boundary polygon.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryFeature {
    /// Canonical region key; `None` when the source has no name property.
    pub region: Option<String>,
    /// Source properties, with the detected name property stored as `name`.
    pub properties: Map<String, Value>,
    pub geometry: Geometry,
}

/// Boundary features sharing one coordinate reference.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryCollection {
    pub crs: crate::projection::Crs,
    pub features: Vec<BoundaryFeature>,
}
