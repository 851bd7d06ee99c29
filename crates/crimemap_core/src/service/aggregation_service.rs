//! Region totals and monthly time series.
//!
//! # Responsibility
//! - Aggregate in-window crime counts by region with an optional category.
//! - Join end-of-window population to derive per-region rates.
//! - Bucket one region's counts by calendar month.
//!
//! # Invariants
//! - Results are sparse: regions or months without matching records are
//!   absent, never zero-filled.
//! - A store without queryable crime fields yields empty results.
//! - Population misses only remove a region from `rates`, never from
//!   `counts`.

use crate::model::record::CrimeRecord;
use crate::normalize::{join_key, normalize_region};
use crate::store::RecordRepository;
use chrono::Datelike;
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Sentinel category meaning "no category filter".
pub const ALL_CATEGORIES: &str = "All";

/// Rates are expressed per this many residents.
pub const RATE_PER_RESIDENTS: f64 = 1_000.0;

/// Category filter shared by aggregation queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryFilter {
    All,
    /// Exact, case-sensitive category match.
    Only(String),
}

impl CategoryFilter {
    /// Maps a request parameter to a filter. `None`, blank and `All` select
    /// every category.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            None => Self::All,
            Some(value) if value.is_empty() || value == ALL_CATEGORIES => Self::All,
            Some(value) => Self::Only(value.to_string()),
        }
    }

    fn label(&self) -> &str {
        match self {
            Self::All => ALL_CATEGORIES,
            Self::Only(category) => category.as_str(),
        }
    }
}

/// Region totals with optional population rates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RegionTotals {
    /// Summed counts per canonical region.
    pub counts: BTreeMap<String, u64>,
    /// Incidents per 1,000 residents; `None` when no population exists for
    /// the window's end year.
    pub rates: Option<BTreeMap<String, f64>>,
}

impl RegionTotals {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.counts
            .values()
            .fold(0_u64, |acc, count| acc.saturating_add(*count))
    }
}

/// One monthly bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeSeriesPoint {
    /// `YYYY-MM`.
    pub date: String,
    pub count: u64,
}

/// Aggregation queries over a record repository.
#[derive(Debug, Clone)]
pub struct AggregationService<R: RecordRepository> {
    repo: R,
}

impl<R: RecordRepository> AggregationService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Sums in-window counts per region.
    ///
    /// # Contract
    /// - Window bounds are inclusive.
    /// - `rates` is `Some` only when population data exists for the end year.
    pub fn region_totals(&self, filter: &CategoryFilter) -> RegionTotals {
        if !self.repo.crime_fields().is_queryable() {
            warn!("event=region_totals module=aggregation status=warn reason=crime_data_unavailable");
            return RegionTotals::default();
        }

        let mut counts = BTreeMap::<String, u64>::new();
        for record in self.matching_records(filter) {
            let entry = counts.entry(record.region.clone()).or_insert(0);
            *entry = entry.saturating_add(record.count);
        }

        if counts.is_empty() {
            debug!(
                "event=region_totals module=aggregation status=ok category={} regions=0",
                filter.label()
            );
            return RegionTotals::default();
        }

        let rates = self.population_rates(&counts);
        info!(
            "event=region_totals module=aggregation status=ok category={} regions={} rated_regions={}",
            filter.label(),
            counts.len(),
            rates.as_ref().map_or(0, BTreeMap::len)
        );
        RegionTotals { counts, rates }
    }

    /// Monthly counts for one region, ascending by month.
    pub fn time_series(&self, region: &str, filter: &CategoryFilter) -> Vec<TimeSeriesPoint> {
        if !self.repo.crime_fields().is_queryable() {
            warn!("event=time_series module=aggregation status=warn reason=crime_data_unavailable");
            return Vec::new();
        }

        let region = normalize_region(region);
        let mut buckets = BTreeMap::<(i32, u32), u64>::new();
        for record in self
            .matching_records(filter)
            .filter(|record| record.region == region)
        {
            let key = (record.occurred_at.year(), record.occurred_at.month());
            let entry = buckets.entry(key).or_insert(0);
            *entry = entry.saturating_add(record.count);
        }

        debug!(
            "event=time_series module=aggregation status=ok region={} category={} months={}",
            region,
            filter.label(),
            buckets.len()
        );
        buckets
            .into_iter()
            .map(|((year, month), count)| TimeSeriesPoint {
                date: format!("{year:04}-{month:02}"),
                count,
            })
            .collect()
    }

    /// In-window records passing the category filter.
    fn matching_records<'a>(
        &'a self,
        filter: &'a CategoryFilter,
    ) -> impl Iterator<Item = &'a CrimeRecord> + 'a {
        let window = *self.repo.window();
        let category = match filter {
            CategoryFilter::Only(category) if self.repo.crime_fields().has_category() => {
                Some(category.as_str())
            }
            CategoryFilter::Only(category) => {
                warn!(
                    "event=category_filter module=aggregation status=warn reason=category_field_missing category={category}"
                );
                None
            }
            CategoryFilter::All => None,
        };

        self.repo
            .crime_records()
            .iter()
            .filter(move |record| window.contains(record.occurred_at))
            .filter(move |record| category.map_or(true, |wanted| record.category == wanted))
    }

    fn population_rates(&self, counts: &BTreeMap<String, u64>) -> Option<BTreeMap<String, f64>> {
        if !self.repo.population_fields().is_joinable() {
            debug!("event=population_join module=aggregation status=skip reason=population_unavailable");
            return None;
        }

        let end_year = self.repo.window().end_year();
        // Last row wins for duplicate (region, year) pairs.
        let population_by_key = self
            .repo
            .population_records()
            .iter()
            .filter(|record| record.year == end_year)
            .map(|record| (join_key(&record.region), record.population))
            .collect::<HashMap<_, _>>();

        if population_by_key.is_empty() {
            warn!(
                "event=population_join module=aggregation status=warn reason=no_population_for_year year={end_year}"
            );
            return None;
        }

        let mut rates = BTreeMap::new();
        for (region, count) in counts {
            match population_by_key.get(&join_key(region)) {
                Some(&population) if population > 0 => {
                    rates.insert(
                        region.clone(),
                        *count as f64 * RATE_PER_RESIDENTS / population as f64,
                    );
                }
                _ => debug!(
                    "event=population_join module=aggregation status=miss region={region} year={end_year}"
                ),
            }
        }
        Some(rates)
    }
}
