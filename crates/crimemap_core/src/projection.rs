//! Coordinate reference detection and reprojection to WGS84.
//!
//! # Responsibility
//! - Identify the CRS declared by a boundary source.
//! - Convert positions from supported projected CRSs to EPSG:4326.
//!
//! # Invariants
//! - Output positions are `[longitude, latitude]` in decimal degrees.
//! - Non-finite input or output coordinates are errors, never passed through.
//!
//! British National Grid conversion follows the Ordnance Survey series
//! formulas for the inverse Transverse Mercator on Airy 1830, then a
//! 7-parameter Helmert shift (the EPSG:27700 `towgs84` parameters).

use crate::model::geometry::{Geometry, Point, Position};
use std::error::Error;
use std::f64::consts::PI;
use std::fmt::{Display, Formatter};

/// Coordinate reference of a boundary collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Crs {
    /// EPSG:4326 / OGC CRS84, longitude-latitude degrees.
    Wgs84,
    /// EPSG:3857 spherical Web Mercator metres.
    WebMercator,
    /// EPSG:27700 OSGB36 / British National Grid metres.
    BritishNationalGrid,
    /// Any other declared reference, kept verbatim.
    Other(String),
}

impl Crs {
    /// Parses a GeoJSON `crs.properties.name` value.
    ///
    /// Accepts `EPSG:<code>`, `urn:ogc:def:crs:EPSG::<code>`,
    /// `urn:ogc:def:crs:OGC:1.3:CRS84` and similar spellings.
    pub fn from_name(name: &str) -> Self {
        let trimmed = name.trim();
        let upper = trimmed.to_ascii_uppercase();
        if upper.ends_with("CRS84") {
            return Self::Wgs84;
        }

        let code = upper
            .rsplit(|ch: char| ch == ':' || ch == '/')
            .find(|part| !part.is_empty())
            .unwrap_or_default();
        match code {
            "4326" => Self::Wgs84,
            "3857" | "900913" | "3785" | "102100" => Self::WebMercator,
            "27700" => Self::BritishNationalGrid,
            _ => Self::Other(trimmed.to_string()),
        }
    }

    pub fn is_standard(&self) -> bool {
        matches!(self, Self::Wgs84)
    }

    /// Short display label used in logs.
    pub fn label(&self) -> &str {
        match self {
            Self::Wgs84 => "EPSG:4326",
            Self::WebMercator => "EPSG:3857",
            Self::BritishNationalGrid => "EPSG:27700",
            Self::Other(name) => name.as_str(),
        }
    }
}

/// Boundary reprojection or serialization failure.
#[derive(Debug)]
pub enum ProjectionError {
    /// Source CRS has no conversion to WGS84.
    UnsupportedCrs(String),
    /// A coordinate was NaN/infinite before or after conversion.
    NonFiniteCoordinate { x: f64, y: f64 },
    /// A ring has fewer than four positions.
    DegenerateRing { feature_index: usize, positions: usize },
    /// A position has fewer than two ordinates.
    IncompletePosition { ordinates: usize },
    /// JSON serialization failed.
    Serialize(serde_json::Error),
}

impl Display for ProjectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedCrs(name) => write!(f, "unsupported coordinate reference `{name}`"),
            Self::NonFiniteCoordinate { x, y } => {
                write!(f, "non-finite coordinate ({x}, {y})")
            }
            Self::DegenerateRing {
                feature_index,
                positions,
            } => write!(
                f,
                "feature {feature_index} has a ring with {positions} positions (need >= 4)"
            ),
            Self::IncompletePosition { ordinates } => {
                write!(f, "position has {ordinates} ordinates (need >= 2)")
            }
            Self::Serialize(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ProjectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Serialize(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for ProjectionError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}

/// Converts one point from `crs` to WGS84 `[lon, lat]`.
pub fn to_wgs84(crs: &Crs, point: Point) -> Result<Point, ProjectionError> {
    let [x, y] = point;
    if !x.is_finite() || !y.is_finite() {
        return Err(ProjectionError::NonFiniteCoordinate { x, y });
    }

    let projected = match crs {
        Crs::Wgs84 => point,
        Crs::WebMercator => web_mercator_to_wgs84(x, y),
        Crs::BritishNationalGrid => british_national_grid_to_wgs84(x, y),
        Crs::Other(name) => return Err(ProjectionError::UnsupportedCrs(name.clone())),
    };

    let [lon, lat] = projected;
    if !lon.is_finite() || !lat.is_finite() {
        return Err(ProjectionError::NonFiniteCoordinate { x, y });
    }
    Ok(projected)
}

/// Reprojects every position of `geometry` to WGS84.
pub fn geometry_to_wgs84(crs: &Crs, geometry: &Geometry) -> Result<Geometry, ProjectionError> {
    if crs.is_standard() {
        return Ok(geometry.clone());
    }
    geometry.try_map_positions(|position| position_to_wgs84(crs, position))
}

/// Reprojects the horizontal ordinates of a position, keeping any extra ones.
pub fn position_to_wgs84(crs: &Crs, position: &[f64]) -> Result<Position, ProjectionError> {
    let [x, y, extra @ ..] = position else {
        return Err(ProjectionError::IncompletePosition {
            ordinates: position.len(),
        });
    };
    let [lon, lat] = to_wgs84(crs, [*x, *y])?;
    let mut projected = Vec::with_capacity(position.len());
    projected.extend([lon, lat]);
    projected.extend_from_slice(extra);
    Ok(projected)
}

const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

fn web_mercator_to_wgs84(x: f64, y: f64) -> Point {
    let lon = (x / WEB_MERCATOR_RADIUS).to_degrees();
    let lat = (y / WEB_MERCATOR_RADIUS).sinh().atan().to_degrees();
    [lon, lat]
}

struct Ellipsoid {
    a: f64,
    b: f64,
}

impl Ellipsoid {
    fn e2(&self) -> f64 {
        1.0 - (self.b * self.b) / (self.a * self.a)
    }
}

const AIRY_1830: Ellipsoid = Ellipsoid {
    a: 6_377_563.396,
    b: 6_356_256.909,
};
const WGS84: Ellipsoid = Ellipsoid {
    a: 6_378_137.0,
    b: 6_356_752.314_245,
};

// National Grid true origin.
const NG_F0: f64 = 0.999_601_271_7;
const NG_LAT0_DEG: f64 = 49.0;
const NG_LON0_DEG: f64 = -2.0;
const NG_E0: f64 = 400_000.0;
const NG_N0: f64 = -100_000.0;

// OSGB36 -> WGS84, position-vector convention.
const HELMERT_TX: f64 = 446.448;
const HELMERT_TY: f64 = -125.157;
const HELMERT_TZ: f64 = 542.06;
const HELMERT_RX_SEC: f64 = 0.15;
const HELMERT_RY_SEC: f64 = 0.247;
const HELMERT_RZ_SEC: f64 = 0.842;
const HELMERT_SCALE_PPM: f64 = -20.489;

const MAX_MERIDIAN_ITERATIONS: usize = 32;

fn british_national_grid_to_wgs84(easting: f64, northing: f64) -> Point {
    let (lat, lon) = national_grid_to_osgb36(easting, northing);
    let (x, y, z) = geodetic_to_cartesian(lat, lon, &AIRY_1830);
    let (x, y, z) = helmert_osgb36_to_wgs84(x, y, z);
    let (lat, lon) = cartesian_to_geodetic(x, y, z, &WGS84);
    [lon.to_degrees(), lat.to_degrees()]
}

/// Inverse Transverse Mercator on Airy 1830. Returns radians.
pub(crate) fn national_grid_to_osgb36(easting: f64, northing: f64) -> (f64, f64) {
    let Ellipsoid { a, b } = AIRY_1830;
    let e2 = AIRY_1830.e2();
    let n = (a - b) / (a + b);
    let lat0 = NG_LAT0_DEG.to_radians();
    let lon0 = NG_LON0_DEG.to_radians();

    let mut lat = lat0;
    let mut m = 0.0;
    for _ in 0..MAX_MERIDIAN_ITERATIONS {
        lat += (northing - NG_N0 - m) / (a * NG_F0);
        m = meridional_arc(lat, lat0, b, n);
        if (northing - NG_N0 - m).abs() < 1e-5 {
            break;
        }
    }

    let (sin_lat, cos_lat) = lat.sin_cos();
    let tan_lat = lat.tan();
    let t2 = tan_lat * tan_lat;
    let t4 = t2 * t2;
    let t6 = t4 * t2;
    let sin2 = 1.0 - e2 * sin_lat * sin_lat;
    let nu = a * NG_F0 / sin2.sqrt();
    let rho = a * NG_F0 * (1.0 - e2) / sin2.powf(1.5);
    let eta2 = nu / rho - 1.0;

    let vii = tan_lat / (2.0 * rho * nu);
    let viii = tan_lat / (24.0 * rho * nu.powi(3)) * (5.0 + 3.0 * t2 + eta2 - 9.0 * t2 * eta2);
    let ix = tan_lat / (720.0 * rho * nu.powi(5)) * (61.0 + 90.0 * t2 + 45.0 * t4);
    let x = 1.0 / (cos_lat * nu);
    let xi = 1.0 / (cos_lat * 6.0 * nu.powi(3)) * (nu / rho + 2.0 * t2);
    let xii = 1.0 / (cos_lat * 120.0 * nu.powi(5)) * (5.0 + 28.0 * t2 + 24.0 * t4);
    let xiia =
        1.0 / (cos_lat * 5040.0 * nu.powi(7)) * (61.0 + 662.0 * t2 + 1320.0 * t4 + 720.0 * t6);

    let de = easting - NG_E0;
    let lat = lat - vii * de.powi(2) + viii * de.powi(4) - ix * de.powi(6);
    let lon = lon0 + x * de - xi * de.powi(3) + xii * de.powi(5) - xiia * de.powi(7);
    (lat, lon)
}

fn meridional_arc(lat: f64, lat0: f64, b: f64, n: f64) -> f64 {
    let n2 = n * n;
    let n3 = n2 * n;
    let d = lat - lat0;
    let s = lat + lat0;
    let ma = (1.0 + n + 1.25 * n2 + 1.25 * n3) * d;
    let mb = (3.0 * n + 3.0 * n2 + 21.0 / 8.0 * n3) * d.sin() * s.cos();
    let mc = (15.0 / 8.0 * n2 + 15.0 / 8.0 * n3) * (2.0 * d).sin() * (2.0 * s).cos();
    let md = 35.0 / 24.0 * n3 * (3.0 * d).sin() * (3.0 * s).cos();
    b * NG_F0 * (ma - mb + mc - md)
}

fn geodetic_to_cartesian(lat: f64, lon: f64, ellipsoid: &Ellipsoid) -> (f64, f64, f64) {
    let e2 = ellipsoid.e2();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let nu = ellipsoid.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
    (
        nu * cos_lat * lon.cos(),
        nu * cos_lat * lon.sin(),
        (1.0 - e2) * nu * sin_lat,
    )
}

fn helmert_osgb36_to_wgs84(x: f64, y: f64, z: f64) -> (f64, f64, f64) {
    let arcsec = PI / (180.0 * 3600.0);
    let rx = HELMERT_RX_SEC * arcsec;
    let ry = HELMERT_RY_SEC * arcsec;
    let rz = HELMERT_RZ_SEC * arcsec;
    let scale = 1.0 + HELMERT_SCALE_PPM * 1e-6;
    (
        HELMERT_TX + scale * (x - rz * y + ry * z),
        HELMERT_TY + scale * (rz * x + y - rx * z),
        HELMERT_TZ + scale * (-ry * x + rx * y + z),
    )
}

fn cartesian_to_geodetic(x: f64, y: f64, z: f64, ellipsoid: &Ellipsoid) -> (f64, f64) {
    let e2 = ellipsoid.e2();
    let p = x.hypot(y);
    let mut lat = z.atan2(p * (1.0 - e2));
    for _ in 0..10 {
        let sin_lat = lat.sin();
        let nu = ellipsoid.a / (1.0 - e2 * sin_lat * sin_lat).sqrt();
        lat = (z + e2 * nu * sin_lat).atan2(p);
    }
    (lat, y.atan2(x))
}

#[cfg(test)]
mod tests {
    use super::{national_grid_to_osgb36, position_to_wgs84, to_wgs84, Crs, ProjectionError};

    fn dms(deg: f64, min: f64, sec: f64) -> f64 {
        deg + min / 60.0 + sec / 3600.0
    }

    #[test]
    fn crs_names_are_recognized() {
        assert_eq!(Crs::from_name("EPSG:4326"), Crs::Wgs84);
        assert_eq!(Crs::from_name("urn:ogc:def:crs:OGC:1.3:CRS84"), Crs::Wgs84);
        assert_eq!(
            Crs::from_name("urn:ogc:def:crs:EPSG::27700"),
            Crs::BritishNationalGrid
        );
        assert_eq!(Crs::from_name("epsg:3857"), Crs::WebMercator);
        assert_eq!(
            Crs::from_name("EPSG:2154"),
            Crs::Other("EPSG:2154".to_string())
        );
    }

    #[test]
    fn inverse_transverse_mercator_matches_ordnance_survey_example() {
        // OS "A guide to coordinate systems in Great Britain", worked example.
        let (lat, lon) = national_grid_to_osgb36(651_409.903, 313_177.270);
        assert!((lat.to_degrees() - dms(52.0, 39.0, 27.2531)).abs() < 1e-7);
        assert!((lon.to_degrees() - dms(1.0, 43.0, 4.5177)).abs() < 1e-7);
    }

    #[test]
    fn national_grid_converts_to_wgs84() {
        let [lon, lat] = to_wgs84(&Crs::BritishNationalGrid, [530_000.0, 180_000.0]).unwrap();
        assert!((lat - 51.503_990_8).abs() < 1e-5, "lat {lat}");
        assert!((lon - -0.128_353_9).abs() < 1e-5, "lon {lon}");
    }

    #[test]
    fn web_mercator_inverse_matches_closed_form() {
        let [lon, lat] = to_wgs84(&Crs::WebMercator, [-13_580.977_876_779, 6_710_219.083_220_741])
            .unwrap();
        assert!((lon - -0.122).abs() < 1e-9);
        assert!((lat - 51.5).abs() < 1e-9);

        let [lon, lat] = to_wgs84(&Crs::WebMercator, [20_037_508.342_789_244, 0.0]).unwrap();
        assert!((lon - 180.0).abs() < 1e-9);
        assert!(lat.abs() < 1e-12);
    }

    #[test]
    fn unsupported_and_non_finite_inputs_fail() {
        let err = to_wgs84(&Crs::Other("EPSG:2154".into()), [1.0, 2.0]).unwrap_err();
        assert!(matches!(err, ProjectionError::UnsupportedCrs(_)));

        let err = to_wgs84(&Crs::Wgs84, [f64::NAN, 2.0]).unwrap_err();
        assert!(matches!(err, ProjectionError::NonFiniteCoordinate { .. }));
    }

    #[test]
    fn altitude_is_carried_through_reprojection() {
        let projected =
            position_to_wgs84(&Crs::BritishNationalGrid, &[530_000.0, 180_000.0, 35.0]).unwrap();
        assert_eq!(projected.len(), 3);
        assert!((projected[1] - 51.503_990_8).abs() < 1e-5);
        assert_eq!(projected[2], 35.0);

        let err = position_to_wgs84(&Crs::WebMercator, &[1.0]).unwrap_err();
        assert!(matches!(err, ProjectionError::IncompletePosition { ordinates: 1 }));
    }
}
