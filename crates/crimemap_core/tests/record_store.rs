use crimemap_core::store::{
    CrimeFields, CsvFileSource, GeoJsonFileSource, PopulationFields, RawTable, SharedStore,
};
use crimemap_core::{
    ObservationWindow, RecordRepository, RecordStore, SourceKind, StoreSources,
};
use std::fs;
use std::sync::Arc;

fn window() -> ObservationWindow {
    ObservationWindow::from_years(2014, 2024).unwrap()
}

#[test]
fn invalid_calendar_dates_are_dropped_and_counted() {
    let crime = RawTable::from_rows(
        &["Borough", "Offence Group", "Count", "Month_Year"],
        &[
            &["Camden", "Burglary", "5", "01/01/2015"],
            &["Camden", "Burglary", "2", "31/02/2020"],
            &["Camden", "Theft", "1", "2019-05-01"],
        ],
    );
    let sources = StoreSources {
        crime: Some(&crime),
        ..StoreSources::default()
    };
    let store = RecordStore::load(&sources, window());

    assert_eq!(store.crime_records().len(), crime.rows.len() - 1);
    let report = store.load_report();
    assert_eq!(report.crime.rows_read, 3);
    assert_eq!(report.crime.date_failures, 1);
    assert_eq!(report.crime.parsed_strict, 1);
    assert_eq!(report.crime.parsed_fallback, 1);
    assert_eq!(report.crime.stored, 2);
}

#[test]
fn regions_are_canonicalized_on_load() {
    let crime = RawTable::from_rows(
        &["borough", "crime_type", "count", "date"],
        &[&["  kensington AND chelsea ", "Theft", "3", "01/01/2015"]],
    );
    let population = RawTable::from_rows(
        &["Borough", "Year", "Population"],
        &[&[" camden", "2024.0", "270000"]],
    );
    let sources = StoreSources {
        crime: Some(&crime),
        population: Some(&population),
        boundaries: None,
    };
    let store = RecordStore::load(&sources, window());

    assert_eq!(store.crime_records()[0].region, "Kensington And Chelsea");
    assert_eq!(store.population_records()[0].region, "Camden");
    assert_eq!(store.population_records()[0].year, 2024);
}

#[test]
fn population_outside_window_or_invalid_is_dropped() {
    let crime = RawTable::from_rows(&["Borough", "Count", "Month_Year"], &[]);
    let population = RawTable::from_rows(
        &["Borough", "Year", "Population"],
        &[
            &["Camden", "2013", "1"],
            &["Camden", "2014", "2"],
            &["Camden", "twenty", "3"],
            &["Camden", "2024", ""],
            &["Camden", "2030", "4"],
        ],
    );
    let sources = StoreSources {
        crime: Some(&crime),
        population: Some(&population),
        boundaries: None,
    };
    let store = RecordStore::load(&sources, window());

    assert_eq!(store.population_records().len(), 1);
    assert_eq!(store.population_records()[0].year, 2014);
    let stats = &store.load_report().population;
    assert_eq!(stats.invalid_rows, 2);
    assert_eq!(stats.outside_window, 2);
}

#[test]
fn missing_files_degrade_to_empty_collections() {
    let dir = tempfile::tempdir().unwrap();
    let crime = CsvFileSource::new(dir.path().join("Crime_Data.csv"));
    let population = CsvFileSource::new(dir.path().join("Population_Forecast.csv"));
    let boundaries = GeoJsonFileSource::new(dir.path().join("london_boroughs.geojson"));
    let sources = StoreSources {
        crime: Some(&crime),
        population: Some(&population),
        boundaries: Some(&boundaries),
    };
    let store = RecordStore::load(&sources, window());

    assert!(store.crime_records().is_empty());
    assert_eq!(store.crime_fields(), &CrimeFields::NotLoaded);
    assert_eq!(store.population_fields(), &PopulationFields::NotLoaded);
    assert!(store.boundaries().is_none());

    let unavailable = store
        .load_report()
        .unavailable
        .iter()
        .map(|entry| entry.source)
        .collect::<Vec<_>>();
    assert_eq!(
        unavailable,
        vec![SourceKind::Crime, SourceKind::Population, SourceKind::Boundaries]
    );
}

#[test]
fn csv_files_are_loaded_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let crime_path = dir.path().join("Crime_Data.csv");
    fs::write(
        &crime_path,
        "Month_Year,Borough,Offence Group,Count\n\
         01/03/2016,Camden,Burglary,4\n\
         not-a-date,Camden,Burglary,9\n\
         01/04/2016,Hackney,\"Theft, Other\",2\n",
    )
    .unwrap();
    let crime = CsvFileSource::new(&crime_path);
    let sources = StoreSources {
        crime: Some(&crime),
        ..StoreSources::default()
    };
    let store = RecordStore::load(&sources, window());

    assert_eq!(store.crime_records().len(), 2);
    assert_eq!(store.crime_records()[1].category, "Theft, Other");
    assert_eq!(store.load_report().crime.date_failures, 1);
    assert_eq!(store.crime_fields(), &CrimeFields::Complete { category: true });
}

#[test]
fn all_rows_failing_dates_is_not_fatal() {
    let crime = RawTable::from_rows(
        &["Borough", "Offence Group", "Count", "Month_Year"],
        &[&["Camden", "Burglary", "5", "13/13/2015"]],
    );
    let sources = StoreSources {
        crime: Some(&crime),
        ..StoreSources::default()
    };
    let store = RecordStore::load(&sources, window());

    assert!(store.crime_records().is_empty());
    assert!(store.crime_fields().is_queryable());
}

#[test]
fn shared_store_swaps_whole_snapshots() {
    let first = RecordStore::empty(window());
    let shared = SharedStore::new(first);
    let before = shared.snapshot();

    let crime = RawTable::from_rows(
        &["Borough", "Count", "Month_Year"],
        &[&["Camden", "1", "01/01/2015"]],
    );
    let sources = StoreSources {
        crime: Some(&crime),
        ..StoreSources::default()
    };
    let previous = shared.replace(RecordStore::load(&sources, window()));

    assert!(Arc::ptr_eq(&before, &previous));
    assert!(before.crime_records().is_empty());
    assert_eq!(shared.snapshot().crime_records().len(), 1);
}
