use crimemap_core::store::{parse_geojson, GeoJsonFileSource};
use crimemap_core::{
    BoundaryError, BoundaryService, ObservationWindow, ProjectionError, RecordRepository,
    RecordStore, StoreSources,
};
use serde_json::Value;

const BNG_SQUARE: &str = r#"{
    "type": "FeatureCollection",
    "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::27700"}},
    "features": [{
        "type": "Feature",
        "properties": {"NAME": "city of westminster", "GSS_CODE": "E09000033"},
        "geometry": {"type": "Polygon", "coordinates": [[
            [530000.0, 180000.0], [531000.0, 180000.0], [531000.0, 181000.0],
            [530000.0, 181000.0], [530000.0, 180000.0]
        ]]}
    }]
}"#;

fn store_from(text: &str) -> RecordStore {
    let raw = parse_geojson(text).unwrap();
    let sources = StoreSources {
        boundaries: Some(&raw),
        ..StoreSources::default()
    };
    RecordStore::load(&sources, ObservationWindow::default())
}

fn first_position(collection: &Value) -> (f64, f64) {
    let position = &collection["features"][0]["geometry"]["coordinates"][0][0];
    (
        position[0].as_f64().unwrap(),
        position[1].as_f64().unwrap(),
    )
}

#[test]
fn national_grid_boundaries_are_reprojected_to_wgs84() {
    let store = store_from(BNG_SQUARE);
    let collection = BoundaryService::new(&store)
        .standard_projected_boundaries()
        .unwrap();

    assert_eq!(collection["type"], "FeatureCollection");
    assert!(collection.get("crs").is_none());
    let (lon, lat) = first_position(&collection);
    assert!((lon - -0.128_353_9).abs() < 1e-5, "lon={lon}");
    assert!((lat - 51.503_990_8).abs() < 1e-5, "lat={lat}");

    let properties = &collection["features"][0]["properties"];
    assert_eq!(properties["name"], "City Of Westminster");
    assert!(properties.get("NAME").is_none());
    assert_eq!(properties["GSS_CODE"], "E09000033");
}

#[test]
fn wgs84_boundaries_pass_through_unchanged() {
    let store = store_from(
        r#"{"type": "FeatureCollection", "features": [{
            "type": "Feature",
            "properties": {"borough_name": "Camden"},
            "geometry": {"type": "MultiPolygon", "coordinates": [[[
                [-0.15, 51.53], [-0.14, 51.53], [-0.14, 51.54], [-0.15, 51.53]
            ]]]}
        }]}"#,
    );
    assert_eq!(
        store.boundaries().unwrap().features[0].region.as_deref(),
        Some("Camden")
    );

    let collection = BoundaryService::new(&store)
        .standard_projected_boundaries()
        .unwrap();
    let geometry = &collection["features"][0]["geometry"];
    assert_eq!(geometry["type"], "MultiPolygon");
    assert_eq!(geometry["coordinates"][0][0][1][0].as_f64(), Some(-0.14));
    assert_eq!(geometry["coordinates"][0][0][1][1].as_f64(), Some(51.53));
}

#[test]
fn missing_boundary_file_is_not_loaded_rather_than_projection_failure() {
    let dir = tempfile::tempdir().unwrap();
    let source = GeoJsonFileSource::new(dir.path().join("london_boroughs.geojson"));
    let sources = StoreSources {
        boundaries: Some(&source),
        ..StoreSources::default()
    };
    let store = RecordStore::load(&sources, ObservationWindow::default());

    let err = BoundaryService::new(&store)
        .standard_projected_boundaries()
        .unwrap_err();
    assert!(matches!(err, BoundaryError::NotLoaded));
}

#[test]
fn unsupported_crs_is_a_projection_error() {
    let store = store_from(
        r#"{"type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "EPSG:2154"}},
            "features": [{"type": "Feature", "properties": {"name": "x"},
                "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}}]}"#,
    );

    let err = BoundaryService::new(&store)
        .standard_projected_boundaries()
        .unwrap_err();
    assert!(matches!(
        err,
        BoundaryError::Projection(ProjectionError::UnsupportedCrs(_))
    ));
}

#[test]
fn degenerate_ring_is_a_projection_error() {
    let store = store_from(
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"name": "ok"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0],[1,1],[0,0]]]}},
            {"type": "Feature", "properties": {"name": "broken"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1,0]]]}}
        ]}"#,
    );

    let err = BoundaryService::new(&store)
        .standard_projected_boundaries()
        .unwrap_err();
    match err {
        BoundaryError::Projection(ProjectionError::DegenerateRing {
            feature_index,
            positions,
        }) => {
            assert_eq!(feature_index, 1);
            assert_eq!(positions, 2);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn positions_with_altitude_load_and_keep_their_altitude() {
    let store = store_from(
        r#"{"type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "EPSG:27700"}},
            "features": [{"type": "Feature", "properties": {"name": "camden"},
                "geometry": {"type": "Polygon", "coordinates": [[
                    [530000.0, 180000.0, 21.5], [531000.0, 180000.0, 21.5],
                    [531000.0, 181000.0, 22.0], [530000.0, 180000.0, 21.5]
                ]]}}]}"#,
    );
    assert!(store.boundaries().is_some());

    let collection = BoundaryService::new(&store)
        .standard_projected_boundaries()
        .unwrap();
    let (lon, lat) = first_position(&collection);
    assert!((lon - -0.128_353_9).abs() < 1e-5, "lon={lon}");
    assert!((lat - 51.503_990_8).abs() < 1e-5, "lat={lat}");
    let position = &collection["features"][0]["geometry"]["coordinates"][0][0];
    assert_eq!(position[2].as_f64(), Some(21.5));
}

#[test]
fn position_missing_an_ordinate_is_a_projection_error() {
    let store = store_from(
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"name": "broken"},
             "geometry": {"type": "Polygon", "coordinates": [[[0,0],[1],[1,1],[0,0]]]}}
        ]}"#,
    );
    assert!(store.boundaries().is_some());

    let err = BoundaryService::new(&store)
        .standard_projected_boundaries()
        .unwrap_err();
    assert!(matches!(
        err,
        BoundaryError::Projection(ProjectionError::IncompletePosition { ordinates: 1 })
    ));
}
