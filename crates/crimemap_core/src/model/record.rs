//! Crime and population records.

use chrono::NaiveDateTime;
use serde::Serialize;

/// One normalized crime row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrimeRecord {
    /// Canonical region key.
    pub region: String,
    /// Category label, trimmed. Empty when the source has no category field.
    pub category: String,
    /// Parsed occurrence instant. Rows without one are never stored.
    pub occurred_at: NaiveDateTime,
    pub count: u64,
}

/// One normalized population row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopulationRecord {
    /// Canonical region key.
    pub region: String,
    pub year: i32,
    pub population: u64,
}
