//! Observation window shared by every aggregation query.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Inclusive calendar-date range over which all queries operate.
///
/// Fixed once at startup. Comparison uses the calendar date of each
/// instant, so the whole `end` day is inside the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WindowBounds", into = "WindowBounds")]
pub struct ObservationWindow {
    start: NaiveDate,
    end: NaiveDate,
}

/// Window construction error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    /// `start` is after `end`.
    Reversed { start: NaiveDate, end: NaiveDate },
    /// A year bound does not form a valid calendar date.
    InvalidYear(i32),
}

impl Display for WindowError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reversed { start, end } => {
                write!(f, "observation window start {start} is after end {end}")
            }
            Self::InvalidYear(year) => write!(f, "year {year} is out of supported range"),
        }
    }
}

impl Error for WindowError {}

impl ObservationWindow {
    /// Creates a window from inclusive date bounds.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, WindowError> {
        if start > end {
            return Err(WindowError::Reversed { start, end });
        }
        Ok(Self { start, end })
    }

    /// Creates a window spanning 1 January of `start_year` to 31 December of
    /// `end_year`.
    pub fn from_years(start_year: i32, end_year: i32) -> Result<Self, WindowError> {
        let start = NaiveDate::from_ymd_opt(start_year, 1, 1)
            .ok_or(WindowError::InvalidYear(start_year))?;
        let end =
            NaiveDate::from_ymd_opt(end_year, 12, 31).ok_or(WindowError::InvalidYear(end_year))?;
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn start_year(&self) -> i32 {
        self.start.year()
    }

    /// Year whose population is used for rate joins.
    pub fn end_year(&self) -> i32 {
        self.end.year()
    }

    /// Returns whether `at` falls inside the window (both ends inclusive).
    pub fn contains(&self, at: NaiveDateTime) -> bool {
        let date = at.date();
        date >= self.start && date <= self.end
    }

    /// Returns whether `year` overlaps the window.
    pub fn contains_year(&self, year: i32) -> bool {
        year >= self.start_year() && year <= self.end_year()
    }
}

impl Default for ObservationWindow {
    /// 2014-01-01 to 2024-12-31.
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2014, 1, 1).unwrap_or(NaiveDate::MIN),
            end: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap_or(NaiveDate::MAX),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WindowBounds {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<WindowBounds> for ObservationWindow {
    type Error = WindowError;

    fn try_from(value: WindowBounds) -> Result<Self, Self::Error> {
        Self::new(value.start, value.end)
    }
}

impl From<ObservationWindow> for WindowBounds {
    fn from(value: ObservationWindow) -> Self {
        Self {
            start: value.start,
            end: value.end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ObservationWindow, WindowError};
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid test date")
    }

    #[test]
    fn default_window_covers_2014_to_2024() {
        let window = ObservationWindow::default();
        assert_eq!(window.start(), date(2014, 1, 1));
        assert_eq!(window.end(), date(2024, 12, 31));
        assert_eq!(window, ObservationWindow::from_years(2014, 2024).unwrap());
    }

    #[test]
    fn bounds_are_inclusive_for_whole_days() {
        let window = ObservationWindow::from_years(2014, 2024).unwrap();
        let first = date(2014, 1, 1).and_hms_opt(0, 0, 0).unwrap();
        let last = date(2024, 12, 31).and_hms_opt(23, 59, 59).unwrap();
        let before = date(2013, 12, 31).and_hms_opt(23, 59, 59).unwrap();
        let after = date(2025, 1, 1).and_hms_opt(0, 0, 0).unwrap();

        assert!(window.contains(first));
        assert!(window.contains(last));
        assert!(!window.contains(before));
        assert!(!window.contains(after));
    }

    #[test]
    fn reversed_window_is_rejected() {
        let err = ObservationWindow::new(date(2024, 1, 1), date(2014, 1, 1)).unwrap_err();
        assert!(matches!(err, WindowError::Reversed { .. }));
    }

    #[test]
    fn deserialize_validates_bounds() {
        let ok: ObservationWindow =
            serde_json::from_str(r#"{"start":"2015-01-01","end":"2015-12-31"}"#).unwrap();
        assert_eq!(ok.end_year(), 2015);

        let err = serde_json::from_str::<ObservationWindow>(
            r#"{"start":"2016-01-01","end":"2015-12-31"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("is after end"), "unexpected: {err}");
    }
}
