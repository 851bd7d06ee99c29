//! Record normalization and aggregation engine for the crime map.
//! This crate owns the load-once record store and every query over it.

pub mod config;
pub mod engine;
pub mod logging;
pub mod model;
pub mod normalize;
pub mod projection;
pub mod service;
pub mod store;
pub mod temporal;

pub use config::{ConfigError, EngineConfig};
pub use engine::CrimeMapEngine;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::geometry::{BoundaryCollection, BoundaryFeature, Geometry};
pub use model::record::{CrimeRecord, PopulationRecord};
pub use model::window::{ObservationWindow, WindowError};
pub use normalize::{join_key, normalize_region};
pub use projection::{Crs, ProjectionError};
pub use service::aggregation_service::{
    AggregationService, CategoryFilter, RegionTotals, TimeSeriesPoint, ALL_CATEGORIES,
};
pub use service::boundary_service::{BoundaryError, BoundaryService};
pub use service::category_service::CategoryService;
pub use service::chart_service::{ChartData, ChartDefinition, ChartError, ChartKind, ChartService};
pub use store::{
    LoadReport, LoadUnavailable, RecordRepository, RecordStore, SharedStore, SourceKind,
    StoreSources,
};
pub use temporal::{parse_date, ParseFailure, ParseStage, ParsedDate};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
