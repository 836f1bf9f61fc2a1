//! Measurement windows for the adherence measures.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::engine::types::AdherenceError;

pub use crate::enums::AdherenceMeasure;

/// The window a measure is evaluated over, both ends inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeasurementPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl MeasurementPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AdherenceError> {
        if start > end {
            return Err(AdherenceError::InvalidPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    /// January 1 through December 31 of `year`.
    pub fn calendar_year(year: i32) -> Result<Self, AdherenceError> {
        let start = NaiveDate::from_ymd_opt(year, 1, 1)
            .ok_or_else(|| AdherenceError::Config(format!("year out of range: {year}")))?;
        let end = NaiveDate::from_ymd_opt(year, 12, 31)
            .ok_or_else(|| AdherenceError::Config(format!("year out of range: {year}")))?;
        Self::new(start, end)
    }

    /// The calendar year containing `as_of`.
    pub fn containing(as_of: NaiveDate) -> Result<Self, AdherenceError> {
        Self::calendar_year(as_of.year())
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    pub fn length_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn calendar_year_bounds() {
        let period = MeasurementPeriod::calendar_year(2024).unwrap();
        assert_eq!(period.start, d(2024, 1, 1));
        assert_eq!(period.end, d(2024, 12, 31));
        assert_eq!(period.length_days(), 366);
    }

    #[test]
    fn inverted_period_rejected() {
        let err = MeasurementPeriod::new(d(2025, 6, 1), d(2025, 5, 1)).unwrap_err();
        assert!(matches!(err, AdherenceError::InvalidPeriod { .. }));
    }

    #[test]
    fn single_day_period_is_valid() {
        let period = MeasurementPeriod::new(d(2025, 3, 3), d(2025, 3, 3)).unwrap();
        assert_eq!(period.length_days(), 1);
        assert!(period.contains(d(2025, 3, 3)));
    }

    #[test]
    fn containing_uses_as_of_year() {
        let period = MeasurementPeriod::containing(d(2025, 10, 16)).unwrap();
        assert_eq!(period, MeasurementPeriod::calendar_year(2025).unwrap());
        assert!(!period.contains(d(2026, 1, 1)));
    }
}
