//! In-memory record store loaded once per process.
//!
//! # Responsibility
//! - Load crime, population and boundary sources exactly once.
//! - Own every normalized record for the process lifetime.
//! - Expose read-only views through `RecordRepository`.
//!
//! # Invariants
//! - A source that cannot be read yields an empty collection plus a
//!   `LoadUnavailable` diagnostic; loading itself never fails.
//! - Stored records are never mutated after `RecordStore::load` returns.
//! - Reloads replace the whole store reference (`SharedStore::replace`).

mod loader;
pub mod schema;
pub mod source;

pub use loader::{CrimeLoadStats, PopulationLoadStats};
pub use schema::{CrimeFields, PopulationFields};
pub use source::{
    parse_geojson, read_csv_table, BoundarySource, CsvFileSource, GeoJsonFileSource,
    RawBoundaries, RawFeature, RawTable, SourceError, TabularSource,
};

use crate::model::geometry::BoundaryCollection;
use crate::model::record::{CrimeRecord, PopulationRecord};
use crate::model::window::ObservationWindow;
use log::{error, info, warn};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

/// Which source collection a diagnostic refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Crime,
    Population,
    Boundaries,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Crime => "crime",
            Self::Population => "population",
            Self::Boundaries => "boundaries",
        }
    }
}

/// A source that could not be obtained at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadUnavailable {
    pub source: SourceKind,
    pub reason: String,
}

impl Display for LoadUnavailable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} source unavailable: {}", self.source.as_str(), self.reason)
    }
}

/// Load diagnostics kept for the lifetime of the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub crime: CrimeLoadStats,
    pub population: PopulationLoadStats,
    pub boundary_features: usize,
    pub unavailable: Vec<LoadUnavailable>,
}

/// Source readers for one load. `None` means the source is not configured.
#[derive(Default)]
pub struct StoreSources<'a> {
    pub crime: Option<&'a dyn TabularSource>,
    pub population: Option<&'a dyn TabularSource>,
    pub boundaries: Option<&'a dyn BoundarySource>,
}

/// Read-only view over loaded records.
pub trait RecordRepository {
    fn window(&self) -> &ObservationWindow;
    fn crime_records(&self) -> &[CrimeRecord];
    fn crime_fields(&self) -> &CrimeFields;
    fn population_records(&self) -> &[PopulationRecord];
    fn population_fields(&self) -> &PopulationFields;
    /// `None` when the boundary source was not loaded.
    fn boundaries(&self) -> Option<&BoundaryCollection>;
}

/// Immutable store of normalized records.
#[derive(Debug, Clone)]
pub struct RecordStore {
    window: ObservationWindow,
    crimes: Vec<CrimeRecord>,
    crime_fields: CrimeFields,
    population: Vec<PopulationRecord>,
    population_fields: PopulationFields,
    boundaries: Option<BoundaryCollection>,
    report: LoadReport,
}

impl RecordStore {
    /// Store with no data; every query against it yields an empty result.
    pub fn empty(window: ObservationWindow) -> Self {
        Self {
            window,
            crimes: Vec::new(),
            crime_fields: CrimeFields::NotLoaded,
            population: Vec::new(),
            population_fields: PopulationFields::NotLoaded,
            boundaries: None,
            report: LoadReport::default(),
        }
    }

    /// Loads every configured source.
    ///
    /// # Side effects
    /// - Reads each source once.
    /// - Emits `event=store_load` and per-source logging events.
    pub fn load(sources: &StoreSources<'_>, window: ObservationWindow) -> Self {
        let started_at = Instant::now();
        info!(
            "event=store_load module=store status=start window_start={} window_end={}",
            window.start(),
            window.end()
        );

        let mut store = Self::empty(window);
        store.load_crime(sources.crime);
        store.load_population(sources.population);
        store.load_boundaries(sources.boundaries);

        info!(
            "event=store_load module=store status=ok duration_ms={} crime_records={} population_records={} boundary_features={} unavailable={}",
            started_at.elapsed().as_millis(),
            store.crimes.len(),
            store.population.len(),
            store.report.boundary_features,
            store.report.unavailable.len()
        );
        store
    }

    pub fn load_report(&self) -> &LoadReport {
        &self.report
    }

    fn mark_unavailable(&mut self, source: SourceKind, reason: String) {
        warn!(
            "event=source_unavailable module=store status=warn source={} reason={}",
            source.as_str(),
            reason
        );
        self.report
            .unavailable
            .push(LoadUnavailable { source, reason });
    }

    fn load_crime(&mut self, source: Option<&dyn TabularSource>) {
        let Some(source) = source else {
            self.mark_unavailable(SourceKind::Crime, "not configured".to_string());
            return;
        };
        let table = match source.read_table() {
            Ok(table) => table,
            Err(err) => {
                self.mark_unavailable(SourceKind::Crime, err.to_string());
                return;
            }
        };
        let schema = match schema::resolve_crime_schema(&table.headers) {
            Ok(schema) => schema,
            Err(missing) => {
                self.mark_unavailable(
                    SourceKind::Crime,
                    format!("missing required fields: {}", missing.join(", ")),
                );
                self.crime_fields = CrimeFields::Missing { fields: missing };
                return;
            }
        };
        if schema.category.is_none() {
            warn!("event=crime_schema module=store status=warn reason=category_field_missing");
        }

        let (records, stats) = loader::convert_crime_rows(&table.rows, &schema);
        if stats.date_failures > 0 {
            warn!(
                "event=crime_dates module=store status=warn date_failures={} source={}",
                stats.date_failures,
                source.describe()
            );
        }
        if records.is_empty() && stats.date_failures > 0 {
            error!(
                "event=crime_dates module=store status=error reason=all_rows_dropped date_failures={}",
                stats.date_failures
            );
        }
        info!(
            "event=crime_load module=store status=ok rows_read={} missing_region={} parsed_strict={} parsed_fallback={} date_failures={} stored={}",
            stats.rows_read,
            stats.missing_region,
            stats.parsed_strict,
            stats.parsed_fallback,
            stats.date_failures,
            stats.stored
        );

        self.crime_fields = schema.fields();
        self.crimes = records;
        self.report.crime = stats;
    }

    fn load_population(&mut self, source: Option<&dyn TabularSource>) {
        let Some(source) = source else {
            self.mark_unavailable(SourceKind::Population, "not configured".to_string());
            return;
        };
        let table = match source.read_table() {
            Ok(table) => table,
            Err(err) => {
                self.mark_unavailable(SourceKind::Population, err.to_string());
                return;
            }
        };
        let schema = match schema::resolve_population_schema(&table.headers) {
            Ok(schema) => schema,
            Err(missing) => {
                self.mark_unavailable(
                    SourceKind::Population,
                    format!("missing required fields: {}", missing.join(", ")),
                );
                self.population_fields = PopulationFields::Missing { fields: missing };
                return;
            }
        };

        let (records, stats) = loader::convert_population_rows(&table.rows, &schema, &self.window);
        info!(
            "event=population_load module=store status=ok rows_read={} missing_region={} invalid_rows={} outside_window={} stored={}",
            stats.rows_read,
            stats.missing_region,
            stats.invalid_rows,
            stats.outside_window,
            stats.stored
        );

        self.population_fields = PopulationFields::Complete;
        self.population = records;
        self.report.population = stats;
    }

    fn load_boundaries(&mut self, source: Option<&dyn BoundarySource>) {
        let Some(source) = source else {
            self.mark_unavailable(SourceKind::Boundaries, "not configured".to_string());
            return;
        };
        let raw = match source.read_boundaries() {
            Ok(raw) => raw,
            Err(err) => {
                self.mark_unavailable(SourceKind::Boundaries, err.to_string());
                return;
            }
        };

        let collection = loader::convert_boundaries(raw);
        let unnamed = collection
            .features
            .iter()
            .filter(|feature| feature.region.is_none())
            .count();
        if unnamed > 0 {
            warn!(
                "event=boundary_load module=store status=warn reason=name_property_missing unnamed_features={unnamed}"
            );
        }
        info!(
            "event=boundary_load module=store status=ok features={} crs={}",
            collection.features.len(),
            collection.crs.label()
        );

        self.report.boundary_features = collection.features.len();
        self.boundaries = Some(collection);
    }
}

impl RecordRepository for RecordStore {
    fn window(&self) -> &ObservationWindow {
        &self.window
    }

    fn crime_records(&self) -> &[CrimeRecord] {
        &self.crimes
    }

    fn crime_fields(&self) -> &CrimeFields {
        &self.crime_fields
    }

    fn population_records(&self) -> &[PopulationRecord] {
        &self.population
    }

    fn population_fields(&self) -> &PopulationFields {
        &self.population_fields
    }

    fn boundaries(&self) -> Option<&BoundaryCollection> {
        self.boundaries.as_ref()
    }
}

impl<T: RecordRepository + ?Sized> RecordRepository for Arc<T> {
    fn window(&self) -> &ObservationWindow {
        (**self).window()
    }

    fn crime_records(&self) -> &[CrimeRecord] {
        (**self).crime_records()
    }

    fn crime_fields(&self) -> &CrimeFields {
        (**self).crime_fields()
    }

    fn population_records(&self) -> &[PopulationRecord] {
        (**self).population_records()
    }

    fn population_fields(&self) -> &PopulationFields {
        (**self).population_fields()
    }

    fn boundaries(&self) -> Option<&BoundaryCollection> {
        (**self).boundaries()
    }
}

impl<T: RecordRepository + ?Sized> RecordRepository for &T {
    fn window(&self) -> &ObservationWindow {
        (**self).window()
    }

    fn crime_records(&self) -> &[CrimeRecord] {
        (**self).crime_records()
    }

    fn crime_fields(&self) -> &CrimeFields {
        (**self).crime_fields()
    }

    fn population_records(&self) -> &[PopulationRecord] {
        (**self).population_records()
    }

    fn population_fields(&self) -> &PopulationFields {
        (**self).population_fields()
    }

    fn boundaries(&self) -> Option<&BoundaryCollection> {
        (**self).boundaries()
    }
}

/// Process-wide store handle supporting whole-snapshot reloads.
///
/// Queries take a `snapshot()` and run against it without further locking.
#[derive(Debug)]
pub struct SharedStore {
    current: RwLock<Arc<RecordStore>>,
}

impl SharedStore {
    pub fn new(store: RecordStore) -> Self {
        Self {
            current: RwLock::new(Arc::new(store)),
        }
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> Arc<RecordStore> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Swaps in a new store and returns the previous snapshot.
    pub fn replace(&self, store: RecordStore) -> Arc<RecordStore> {
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, Arc::new(store))
    }
}
