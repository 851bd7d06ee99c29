//! Engine facade used by request layers.
//!
//! # Responsibility
//! - Load the record store once from configuration.
//! - Expose every query operation behind one cloneable handle.
//!
//! # Invariants
//! - Query methods never fail on missing data; they return empty results.
//! - Only boundary projection and chart reads return errors.

use crate::config::EngineConfig;
use crate::model::window::ObservationWindow;
use crate::service::aggregation_service::{
    AggregationService, CategoryFilter, RegionTotals, TimeSeriesPoint,
};
use crate::service::boundary_service::{BoundaryError, BoundaryService};
use crate::service::category_service::CategoryService;
use crate::service::chart_service::{ChartData, ChartError, ChartService};
use crate::store::{
    CsvFileSource, GeoJsonFileSource, LoadReport, RecordRepository, RecordStore, StoreSources,
};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Cloneable handle over one loaded store snapshot.
#[derive(Debug, Clone)]
pub struct CrimeMapEngine {
    store: Arc<RecordStore>,
    aggregation: AggregationService<Arc<RecordStore>>,
    categories: CategoryService<Arc<RecordStore>>,
    boundaries: BoundaryService<Arc<RecordStore>>,
    charts: ChartService,
}

impl CrimeMapEngine {
    /// Reads every configured file and builds the engine.
    pub fn load(config: &EngineConfig) -> Self {
        let crime = CsvFileSource::new(config.crime_path());
        let population = CsvFileSource::new(config.population_path());
        let boundaries = GeoJsonFileSource::new(config.boundary_path());
        let sources = StoreSources {
            crime: Some(&crime),
            population: Some(&population),
            boundaries: Some(&boundaries),
        };
        let store = RecordStore::load(&sources, config.window);
        Self::from_store(
            Arc::new(store),
            ChartService::new(config.data_dir.clone(), config.charts.clone()),
        )
    }

    /// Builds the engine over an already loaded store.
    pub fn from_store(store: Arc<RecordStore>, charts: ChartService) -> Self {
        Self {
            aggregation: AggregationService::new(Arc::clone(&store)),
            categories: CategoryService::new(Arc::clone(&store)),
            boundaries: BoundaryService::new(Arc::clone(&store)),
            store,
            charts,
        }
    }

    pub fn window(&self) -> ObservationWindow {
        *self.store.window()
    }

    pub fn load_report(&self) -> &LoadReport {
        self.store.load_report()
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Region counts (and rates) for a category parameter (`None`/`All` for
    /// every category).
    pub fn region_totals(&self, category: Option<&str>) -> RegionTotals {
        self.aggregation
            .region_totals(&CategoryFilter::from_param(category))
    }

    /// Monthly counts for one region.
    pub fn time_series(&self, region: &str, category: Option<&str>) -> Vec<TimeSeriesPoint> {
        self.aggregation
            .time_series(region, &CategoryFilter::from_param(category))
    }

    /// `All` followed by the sorted in-window categories.
    pub fn categories(&self) -> Vec<String> {
        self.categories.categories()
    }

    /// Boundaries as a WGS84 GeoJSON `FeatureCollection`.
    pub fn standard_projected_boundaries(&self) -> Result<Value, BoundaryError> {
        self.boundaries.standard_projected_boundaries()
    }

    pub fn chart_titles(&self) -> BTreeMap<String, String> {
        self.charts.chart_titles()
    }

    pub fn chart_data(&self, key: &str) -> Result<ChartData, ChartError> {
        self.charts.chart_data(key)
    }
}
