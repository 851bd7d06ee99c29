//! Two-stage date parsing for crime rows.
//!
//! # Responsibility
//! - Parse the primary `day/month/year` format strictly.
//! - Fall back to a fixed list of unambiguous formats.
//! - Report failures as typed values, never panics.
//!
//! # Invariants
//! - Input shaped like `dd/mm/yyyy` never reaches the fallback stage; an
//!   invalid calendar date in that shape is a failure.
//! - Slash-separated input that does not match the strict shape is treated as
//!   ambiguous and fails.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

static STRICT_DMY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("valid strict date regex"));
static YEAR_FIRST_SLASH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}/\d{1,2}/\d{1,2}$").expect("valid year-first regex"));
static YEAR_MONTH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{1,2})$").expect("valid year-month regex"));

const FALLBACK_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"];
const FALLBACK_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d %B %Y", "%d %b %Y"];
const FALLBACK_MONTH_FORMATS: &[&str] = &["%d %B %Y", "%d %b %Y"];

/// Which parse stage produced a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    /// Primary `day/month/year` format.
    Strict,
    /// One of the explicit fallback formats.
    Fallback,
}

/// Successfully parsed date with the stage that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDate {
    pub at: NaiveDateTime,
    pub stage: ParseStage,
}

/// Reason a date string could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// Blank input.
    Empty,
    /// Strict shape matched but the calendar date does not exist.
    InvalidCalendarDate { day: u32, month: u32, year: i32 },
    /// No stage recognized the input.
    Unrecognized(String),
}

impl Display for ParseFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "date value is empty"),
            Self::InvalidCalendarDate { day, month, year } => {
                write!(f, "invalid calendar date {day:02}/{month:02}/{year:04}")
            }
            Self::Unrecognized(value) => write!(f, "unrecognized date `{value}`"),
        }
    }
}

impl Error for ParseFailure {}

/// Parses a crime-row date string.
///
/// Tries `day/month/year` first, then the fallback formats. Dates without a
/// time component resolve to midnight.
pub fn parse_date(raw: &str) -> Result<ParsedDate, ParseFailure> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ParseFailure::Empty);
    }

    if let Some(result) = parse_strict(value) {
        return result.map(|date| ParsedDate {
            at: date.and_time(NaiveTime::MIN),
            stage: ParseStage::Strict,
        });
    }

    parse_fallback(value)
        .map(|at| ParsedDate {
            at,
            stage: ParseStage::Fallback,
        })
        .ok_or_else(|| ParseFailure::Unrecognized(value.to_string()))
}

/// Returns `None` when the input does not have the strict shape at all.
fn parse_strict(value: &str) -> Option<Result<NaiveDate, ParseFailure>> {
    let captures = STRICT_DMY_RE.captures(value)?;
    let day = captures[1].parse::<u32>().ok()?;
    let month = captures[2].parse::<u32>().ok()?;
    let year = captures[3].parse::<i32>().ok()?;

    Some(
        NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(ParseFailure::InvalidCalendarDate { day, month, year }),
    )
}

fn parse_fallback(value: &str) -> Option<NaiveDateTime> {
    if value.contains('/') && !YEAR_FIRST_SLASH_RE.is_match(value) {
        return None;
    }

    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_utc());
    }

    for format in FALLBACK_DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed);
        }
    }

    for format in FALLBACK_DATE_FORMATS {
        if let Ok(parsed) = NaiveDate::parse_from_str(value, format) {
            return Some(parsed.and_time(NaiveTime::MIN));
        }
    }

    parse_month_only(value).map(|date| date.and_time(NaiveTime::MIN))
}

fn parse_month_only(value: &str) -> Option<NaiveDate> {
    if let Some(captures) = YEAR_MONTH_RE.captures(value) {
        let year = captures[1].parse::<i32>().ok()?;
        let month = captures[2].parse::<u32>().ok()?;
        return NaiveDate::from_ymd_opt(year, month, 1);
    }

    // `Month YYYY` has no day field, which chrono cannot resolve on its own.
    let padded = format!("1 {value}");
    FALLBACK_MONTH_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(&padded, format).ok())
}
