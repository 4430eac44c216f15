// src/types/date.rs

use crate::error::AlphaEarthError;
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Wire format for every date exchanged with the backend.
pub const API_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parses a `YYYY-MM-DD` string.
pub fn parse_date(s: &str) -> Result<NaiveDate, AlphaEarthError> {
    NaiveDate::parse_from_str(s.trim(), API_DATE_FORMAT).map_err(AlphaEarthError::from)
}

/// Formats a date as `YYYY-MM-DD`.
pub fn format_date(date: NaiveDate) -> String {
    date.format(API_DATE_FORMAT).to_string()
}

/// Serde adapter for `NaiveDate` fields carried as `YYYY-MM-DD`.
pub mod api_date {
    use super::*;

    pub fn serialize<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&format_date(*date))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NaiveDate::parse_from_str(&s, API_DATE_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// An inclusive-start, exclusive-end pair of calendar dates.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    #[serde(with = "api_date")]
    pub start: NaiveDate,
    #[serde(with = "api_date")]
    pub end: NaiveDate,
}

impl DateRange {
    /// Creates a range, rejecting `start >= end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AlphaEarthError> {
        if start >= end {
            return Err(AlphaEarthError::Validation(format!(
                "Start date {} must be before end date {}",
                format_date(start),
                format_date(end)
            )));
        }
        Ok(DateRange { start, end })
    }

    /// Parses both ends from `YYYY-MM-DD` strings and validates the ordering.
    pub fn parse(start: &str, end: &str) -> Result<Self, AlphaEarthError> {
        let start = parse_date(start).map_err(|e| {
            AlphaEarthError::Validation(format!("Invalid start date '{}': {}", start, e))
        })?;
        let end = parse_date(end).map_err(|e| {
            AlphaEarthError::Validation(format!("Invalid end date '{}': {}", end, e))
        })?;
        Self::new(start, end)
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// The "before" and "after" imagery windows of a damage comparison.
///
/// `pre.start` is the outer start and `post.end` the outer end. The two windows are not
/// guaranteed to be disjoint: short outer ranges yield touching or overlapping windows.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct EventWindows {
    pub pre: DateRange,
    pub post: DateRange,
}

impl EventWindows {
    /// Splits `range` into a leading and trailing window of a third of its length each,
    /// never shorter than one day.
    pub fn split(range: &DateRange) -> Self {
        let total_days = range.days();
        let window_days = (total_days / 3).max(1);
        let window = Duration::days(window_days);
        EventWindows {
            pre: DateRange {
                start: range.start,
                end: range.start + window,
            },
            post: DateRange {
                start: range.end - window,
                end: range.end,
            },
        }
    }

    pub fn overlaps(&self) -> bool {
        self.pre.end > self.post.start
    }
}

pub fn derive_event_windows(range: &DateRange) -> EventWindows {
    EventWindows::split(range)
}
