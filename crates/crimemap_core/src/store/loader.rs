//! Row conversion from raw sources into normalized records.
//!
//! # Invariants
//! - Crime rows with unparseable dates are dropped and counted.
//! - Rows with a blank region are dropped and counted; no record has an
//!   empty region key.
//! - Region names are canonicalized here, never at query time.
//! - Population rows are restricted to the observation window years.

use super::schema::{CrimeSchema, PopulationSchema};
use super::source::RawBoundaries;
use crate::model::geometry::{BoundaryCollection, BoundaryFeature};
use crate::model::record::{CrimeRecord, PopulationRecord};
use crate::model::window::ObservationWindow;
use crate::normalize::normalize_region;
use crate::projection::Crs;
use crate::temporal::{parse_date, ParseStage};
use log::debug;
use serde::Serialize;
use serde_json::{Map, Value};

const NAME_PROPERTY: &str = "name";

/// Per-load crime row diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrimeLoadStats {
    pub rows_read: usize,
    pub missing_region: usize,
    pub parsed_strict: usize,
    pub parsed_fallback: usize,
    pub date_failures: usize,
    pub stored: usize,
}

/// Per-load population row diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PopulationLoadStats {
    pub rows_read: usize,
    pub missing_region: usize,
    pub invalid_rows: usize,
    pub outside_window: usize,
    pub stored: usize,
}

pub(crate) fn convert_crime_rows(
    rows: &[Vec<String>],
    schema: &CrimeSchema,
) -> (Vec<CrimeRecord>, CrimeLoadStats) {
    let mut stats = CrimeLoadStats {
        rows_read: rows.len(),
        ..CrimeLoadStats::default()
    };
    let mut records = Vec::with_capacity(rows.len());

    for (index, row) in rows.iter().enumerate() {
        let region = normalize_region(cell(row, schema.region));
        if region.is_empty() {
            debug!(
                "event=crime_row_dropped module=store status=warn row={} reason=missing_region",
                index + 1
            );
            stats.missing_region += 1;
            continue;
        }
        let parsed = match parse_date(cell(row, schema.date)) {
            Ok(parsed) => parsed,
            Err(failure) => {
                debug!(
                    "event=crime_row_dropped module=store status=warn row={} reason={}",
                    index + 1,
                    failure
                );
                stats.date_failures += 1;
                continue;
            }
        };
        match parsed.stage {
            ParseStage::Strict => stats.parsed_strict += 1,
            ParseStage::Fallback => stats.parsed_fallback += 1,
        }

        records.push(CrimeRecord {
            region,
            category: schema
                .category
                .map(|column| cell(row, column).trim().to_string())
                .unwrap_or_default(),
            occurred_at: parsed.at,
            count: coerce_count(cell(row, schema.count)),
        });
    }

    stats.stored = records.len();
    (records, stats)
}

pub(crate) fn convert_population_rows(
    rows: &[Vec<String>],
    schema: &PopulationSchema,
    window: &ObservationWindow,
) -> (Vec<PopulationRecord>, PopulationLoadStats) {
    let mut stats = PopulationLoadStats {
        rows_read: rows.len(),
        ..PopulationLoadStats::default()
    };
    let mut records = Vec::new();

    for row in rows {
        let region = normalize_region(cell(row, schema.region));
        if region.is_empty() {
            stats.missing_region += 1;
            continue;
        }
        let (Some(year), Some(population)) = (
            parse_year(cell(row, schema.year)),
            parse_non_negative(cell(row, schema.population)),
        ) else {
            stats.invalid_rows += 1;
            continue;
        };
        if !window.contains_year(year) {
            stats.outside_window += 1;
            continue;
        }

        records.push(PopulationRecord {
            region,
            year,
            population,
        });
    }

    stats.stored = records.len();
    (records, stats)
}

pub(crate) fn convert_boundaries(raw: RawBoundaries) -> BoundaryCollection {
    let crs = raw
        .crs_name
        .as_deref()
        .map(Crs::from_name)
        .unwrap_or(Crs::Wgs84);

    let features = raw
        .features
        .into_iter()
        .map(|feature| {
            let mut properties = feature.properties;
            let region = canonicalize_name_property(&mut properties);
            BoundaryFeature {
                region,
                properties,
                geometry: feature.geometry,
            }
        })
        .collect();

    BoundaryCollection { crs, features }
}

/// Detects the name property, renames it to `name` and canonicalizes it.
fn canonicalize_name_property(properties: &mut Map<String, Value>) -> Option<String> {
    let key = if properties.contains_key(NAME_PROPERTY) {
        NAME_PROPERTY.to_string()
    } else {
        let detected = properties
            .keys()
            .find(|key| {
                let lower = key.to_lowercase();
                lower.contains(NAME_PROPERTY) || lower.contains("borough")
            })?
            .clone();
        let value = properties.remove(&detected)?;
        properties.insert(NAME_PROPERTY.to_string(), value);
        detected
    };

    let Some(Value::String(raw)) = properties.get(NAME_PROPERTY) else {
        debug!("event=boundary_name module=store status=warn source_key={key} reason=not_a_string");
        return None;
    };
    let canonical = normalize_region(raw);
    properties.insert(NAME_PROPERTY.to_string(), Value::String(canonical.clone()));
    Some(canonical)
}

/// Coerces a count cell to a non-negative integer; anything unusable is 0.
pub(crate) fn coerce_count(raw: &str) -> u64 {
    parse_non_negative(raw).unwrap_or(0)
}

fn parse_non_negative(raw: &str) -> Option<u64> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = value.parse::<u64>() {
        return Some(parsed);
    }
    if let Ok(parsed) = value.parse::<i64>() {
        return Some(u64::try_from(parsed).unwrap_or(0));
    }
    match value.parse::<f64>() {
        // Float-to-int `as` saturates, so huge values clamp to u64::MAX.
        Ok(parsed) if parsed.is_finite() => Some(parsed.max(0.0).trunc() as u64),
        _ => None,
    }
}

fn parse_year(raw: &str) -> Option<i32> {
    let value = raw.trim();
    if let Ok(year) = value.parse::<i32>() {
        return Some(year);
    }
    let parsed = value.parse::<f64>().ok()?;
    if parsed.is_finite() && parsed.fract() == 0.0 {
        i32::try_from(parsed as i64).ok()
    } else {
        None
    }
}

fn cell(row: &[String], column: usize) -> &str {
    row.get(column).map(String::as_str).unwrap_or("")
}
