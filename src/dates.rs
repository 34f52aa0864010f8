//! Calendar-date handling shared by the masking and interpolation stages.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PipelineError, Result};

/// Label used for observations whose acquisition time is unknown.
pub const UNKNOWN_DATE: &str = "Unknown";

/// Acquisition date of an aligned observation.
///
/// Serializes to `YYYY-MM-DD`, or to the literal `"Unknown"` when the source
/// image carried no usable timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ObservationDate {
    Known(NaiveDate),
    Unknown,
}

impl ObservationDate {
    /// Convert a millisecond epoch timestamp (UTC) into a calendar date.
    /// Missing, zero and out-of-range timestamps map to `Unknown`.
    pub fn from_timestamp_ms(timestamp_ms: Option<i64>) -> Self {
        match timestamp_ms {
            Some(ms) if ms != 0 => DateTime::from_timestamp_millis(ms)
                .map(|dt| Self::Known(dt.date_naive()))
                .unwrap_or(Self::Unknown),
            _ => Self::Unknown,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Self::Known(date) => Some(*date),
            Self::Unknown => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for ObservationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Self::Unknown => f.write_str(UNKNOWN_DATE),
        }
    }
}

impl From<NaiveDate> for ObservationDate {
    fn from(date: NaiveDate) -> Self {
        Self::Known(date)
    }
}

impl From<ObservationDate> for String {
    fn from(date: ObservationDate) -> Self {
        date.to_string()
    }
}

impl TryFrom<String> for ObservationDate {
    type Error = PipelineError;

    fn try_from(value: String) -> Result<Self> {
        if value == UNKNOWN_DATE {
            return Ok(Self::Unknown);
        }
        parse_calendar_date(&value).map(Self::Known)
    }
}

/// Parse `YYYY-MM-DD`, falling back to an RFC 3339 date-time truncated to its
/// UTC calendar date.
pub fn parse_calendar_date(value: &str) -> Result<NaiveDate> {
    let trimmed = value.trim();
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(trimmed).map(|dt| dt.naive_utc().date()))
        .map_err(|_| PipelineError::InvalidDate(value.to_string()))
}

/// Anything that can be resolved to a calendar date for window comparisons
/// and the elapsed-day axis.
pub trait CalendarDate {
    fn to_calendar_date(&self) -> Result<NaiveDate>;
}

impl CalendarDate for NaiveDate {
    fn to_calendar_date(&self) -> Result<NaiveDate> {
        Ok(*self)
    }
}

impl CalendarDate for ObservationDate {
    fn to_calendar_date(&self) -> Result<NaiveDate> {
        self.as_date()
            .ok_or_else(|| PipelineError::InvalidDate(UNKNOWN_DATE.to_string()))
    }
}

impl CalendarDate for str {
    fn to_calendar_date(&self) -> Result<NaiveDate> {
        parse_calendar_date(self)
    }
}

impl CalendarDate for String {
    fn to_calendar_date(&self) -> Result<NaiveDate> {
        parse_calendar_date(self)
    }
}

impl<T: CalendarDate + ?Sized> CalendarDate for &T {
    fn to_calendar_date(&self) -> Result<NaiveDate> {
        (**self).to_calendar_date()
    }
}

/// Resolve every entry of a date slice, failing on the first bad one.
pub fn resolve_dates<D: CalendarDate>(dates: &[D]) -> Result<Vec<NaiveDate>> {
    dates.iter().map(|d| d.to_calendar_date()).collect()
}

/// Whole days elapsed since the first date. The first entry maps to 0.
pub fn elapsed_days(dates: &[NaiveDate]) -> Vec<f64> {
    match dates.first() {
        Some(first) => dates
            .iter()
            .map(|d| d.signed_duration_since(*first).num_days() as f64)
            .collect(),
        None => Vec::new(),
    }
}
