//! Load-time schema validation.
//!
//! # Responsibility
//! - Resolve source header aliases to column indices once per load.
//! - Publish the typed field capability that query components branch on.
//!
//! # Invariants
//! - Header matching is trimmed and case-insensitive.
//! - Query code never inspects headers; it reads `CrimeFields` /
//!   `PopulationFields` only.

use serde::Serialize;

const REGION_ALIASES: &[&str] = &["borough", "region"];
const CATEGORY_ALIASES: &[&str] = &["offence group", "crime_type", "category"];
const COUNT_ALIASES: &[&str] = &["count"];
const DATE_ALIASES: &[&str] = &["month_year", "date"];
const YEAR_ALIASES: &[&str] = &["year"];
const POPULATION_ALIASES: &[&str] = &["population"];

/// Field capability of the crime source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CrimeFields {
    /// Region, count and date columns are present.
    Complete { category: bool },
    /// Source was read but required columns are absent.
    Missing { fields: Vec<&'static str> },
    /// Source could not be read at all.
    NotLoaded,
}

impl CrimeFields {
    /// Whether aggregation queries can run.
    pub fn is_queryable(&self) -> bool {
        matches!(self, Self::Complete { .. })
    }

    /// Whether category filtering and the category catalog are available.
    pub fn has_category(&self) -> bool {
        matches!(self, Self::Complete { category: true })
    }
}

/// Field capability of the population source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PopulationFields {
    Complete,
    Missing { fields: Vec<&'static str> },
    NotLoaded,
}

impl PopulationFields {
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

/// Resolved crime column indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrimeSchema {
    pub region: usize,
    pub category: Option<usize>,
    pub count: usize,
    pub date: usize,
}

impl CrimeSchema {
    pub fn fields(&self) -> CrimeFields {
        CrimeFields::Complete {
            category: self.category.is_some(),
        }
    }
}

/// Resolved population column indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulationSchema {
    pub region: usize,
    pub year: usize,
    pub population: usize,
}

/// Resolves crime columns, returning the missing required field names on
/// failure.
pub fn resolve_crime_schema(headers: &[String]) -> Result<CrimeSchema, Vec<&'static str>> {
    let region = find_column(headers, REGION_ALIASES);
    let count = find_column(headers, COUNT_ALIASES);
    let date = find_column(headers, DATE_ALIASES);

    match (region, count, date) {
        (Some(region), Some(count), Some(date)) => Ok(CrimeSchema {
            region,
            category: find_column(headers, CATEGORY_ALIASES),
            count,
            date,
        }),
        _ => Err(missing_fields(&[
            ("region", region),
            ("count", count),
            ("date", date),
        ])),
    }
}

/// Resolves population columns, returning the missing field names on
/// failure.
pub fn resolve_population_schema(
    headers: &[String],
) -> Result<PopulationSchema, Vec<&'static str>> {
    let region = find_column(headers, REGION_ALIASES);
    let year = find_column(headers, YEAR_ALIASES);
    let population = find_column(headers, POPULATION_ALIASES);

    match (region, year, population) {
        (Some(region), Some(year), Some(population)) => Ok(PopulationSchema {
            region,
            year,
            population,
        }),
        _ => Err(missing_fields(&[
            ("region", region),
            ("year", year),
            ("population", population),
        ])),
    }
}

fn find_column(headers: &[String], aliases: &[&str]) -> Option<usize> {
    headers.iter().position(|header| {
        let normalized = header.trim().to_lowercase();
        aliases.contains(&normalized.as_str())
    })
}

fn missing_fields(resolved: &[(&'static str, Option<usize>)]) -> Vec<&'static str> {
    resolved
        .iter()
        .filter(|(_, index)| index.is_none())
        .map(|(name, _)| *name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{resolve_crime_schema, resolve_population_schema, CrimeFields};

    fn headers(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_string()).collect()
    }

    #[test]
    fn crime_schema_accepts_source_and_renamed_headers() {
        let schema =
            resolve_crime_schema(&headers(&["Month_Year", "Borough", "Offence Group", "Count"]))
                .unwrap();
        assert_eq!((schema.date, schema.region, schema.count), (0, 1, 3));
        assert_eq!(schema.category, Some(2));

        let renamed =
            resolve_crime_schema(&headers(&[" borough ", "crime_type", "COUNT", "date"])).unwrap();
        assert_eq!(renamed.fields(), CrimeFields::Complete { category: true });
    }

    #[test]
    fn crime_schema_without_category_is_still_queryable() {
        let schema = resolve_crime_schema(&headers(&["Borough", "Count", "Month_Year"])).unwrap();
        let fields = schema.fields();
        assert!(fields.is_queryable());
        assert!(!fields.has_category());
    }

    #[test]
    fn crime_schema_reports_missing_required_fields() {
        let missing = resolve_crime_schema(&headers(&["Offence Group", "Count"])).unwrap_err();
        assert_eq!(missing, vec!["region", "date"]);
    }

    #[test]
    fn population_schema_requires_all_fields() {
        assert!(resolve_population_schema(&headers(&["Borough", "Year", "Population"])).is_ok());
        let missing = resolve_population_schema(&headers(&["Borough", "Population"])).unwrap_err();
        assert_eq!(missing, vec!["year"]);
    }
}
