//! Fill normalization: raw dispense records in, canonical `FillRecord`s out.
//!
//! Records outside the measurement period or without a configured completed
//! status are excluded; records whose date or status cannot be read are
//! rejected and reported back with a reason. Neither kind contributes coverage.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::types::{AdherenceError, FillRecord};
use crate::config::EngineConfig;
use crate::enums::DispenseStatus;
use crate::measures::MeasurementPeriod;

/// A dispense-like record as delivered by the data-access layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawDispense {
    /// Calendar date or date-time string.
    pub fill_date: Option<String>,
    pub days_supply: Option<i64>,
    pub status: String,
}

impl RawDispense {
    pub fn completed(fill_date: &str, days_supply: i64) -> Self {
        Self {
            fill_date: Some(fill_date.into()),
            days_supply: Some(days_supply),
            status: DispenseStatus::Completed.as_str().into(),
        }
    }
}

/// A record the normalizer could not read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedDispense {
    /// Position in the caller's input.
    pub index: usize,
    pub reason: String,
}

/// Normalizer output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedFills {
    /// Sorted by fill date ascending; ties keep input order.
    pub fills: Vec<FillRecord>,
    pub rejected: Vec<RejectedDispense>,
    pub excluded_status: usize,
    pub out_of_period: usize,
}

impl NormalizedFills {
    pub fn has_sufficient_fills(&self, min_qualifying_fills: usize) -> bool {
        self.fills.len() >= min_qualifying_fills
    }
}

/// Read a calendar date from a date or date-time string.
pub fn parse_fill_date(raw: &str) -> Result<NaiveDate, AdherenceError> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.date_naive());
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.date());
    }
    Err(AdherenceError::MalformedRecord(format!(
        "unparseable fill date: {raw:?}"
    )))
}

/// Missing, zero or negative supply becomes the configured default.
fn effective_days_supply(raw: Option<i64>, default_days_supply: u32) -> u32 {
    match raw {
        Some(days) if days > 0 => u32::try_from(days).unwrap_or(u32::MAX),
        _ => default_days_supply,
    }
}

/// Normalize raw dispenses against a measurement period.
pub fn normalize_fills(
    records: &[RawDispense],
    period: &MeasurementPeriod,
    config: &EngineConfig,
) -> NormalizedFills {
    let mut out = NormalizedFills::default();

    for (index, record) in records.iter().enumerate() {
        // Configured statuses qualify even outside the dispense vocabulary
        if !config.is_completed_status(&record.status) {
            match DispenseStatus::parse(&record.status) {
                Ok(_) => out.excluded_status += 1,
                Err(e) => {
                    tracing::warn!(index, error = %e, "Rejected dispense record");
                    out.rejected.push(RejectedDispense {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
            continue;
        }

        let fill_date = match record.fill_date.as_deref().map(parse_fill_date) {
            Some(Ok(date)) => date,
            Some(Err(e)) => {
                tracing::warn!(index, error = %e, "Rejected dispense record");
                out.rejected.push(RejectedDispense {
                    index,
                    reason: e.to_string(),
                });
                continue;
            }
            None => {
                tracing::warn!(index, "Rejected dispense record without fill date");
                out.rejected.push(RejectedDispense {
                    index,
                    reason: "missing fill date".into(),
                });
                continue;
            }
        };

        if !period.contains(fill_date) {
            out.out_of_period += 1;
            continue;
        }

        out.fills.push(FillRecord::new(
            fill_date,
            effective_days_supply(record.days_supply, config.default_days_supply),
        ));
    }

    // Vec::sort_by_key is stable
    out.fills.sort_by_key(|f| f.fill_date);

    tracing::debug!(
        qualifying = out.fills.len(),
        rejected = out.rejected.len(),
        excluded_status = out.excluded_status,
        out_of_period = out.out_of_period,
        "Dispense records normalized"
    );

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn year_2025() -> MeasurementPeriod {
        MeasurementPeriod::calendar_year(2025).unwrap()
    }

    fn with_status(date: &str, supply: Option<i64>, status: &str) -> RawDispense {
        RawDispense {
            fill_date: Some(date.into()),
            days_supply: supply,
            status: status.into(),
        }
    }

    #[test]
    fn keeps_completed_fills_in_period_sorted() {
        let records = vec![
            RawDispense::completed("2025-03-01", 30),
            RawDispense::completed("2025-01-15", 30),
            RawDispense::completed("2025-02-10", 90),
        ];
        let out = normalize_fills(&records, &year_2025(), &EngineConfig::default());

        let dates: Vec<_> = out.fills.iter().map(|f| f.fill_date).collect();
        assert_eq!(dates, vec![d(2025, 1, 15), d(2025, 2, 10), d(2025, 3, 1)]);
        assert_eq!(out.fills[1].days_supply, 90);
        assert!(out.rejected.is_empty());
    }

    #[test]
    fn non_final_statuses_are_dropped() {
        let records = vec![
            with_status("2025-01-01", Some(30), "completed"),
            with_status("2025-02-01", Some(30), "cancelled"),
            with_status("2025-03-01", Some(30), "entered-in-error"),
            with_status("2025-04-01", Some(30), "in-progress"),
        ];
        let out = normalize_fills(&records, &year_2025(), &EngineConfig::default());
        assert_eq!(out.fills.len(), 1);
        assert_eq!(out.excluded_status, 3);
        assert!(out.rejected.is_empty());
    }

    #[test]
    fn configured_status_outside_vocabulary_qualifies() {
        let config = EngineConfig::from_json_str(r#"{"completed_statuses": ["final"]}"#).unwrap();
        let records = vec![
            with_status("2025-01-01", Some(30), "final"),
            with_status("2025-02-01", Some(30), " FINAL "),
            with_status("2025-03-01", Some(30), "completed"),
            with_status("2025-04-01", Some(30), "bogus"),
        ];
        let out = normalize_fills(&records, &year_2025(), &config);

        assert_eq!(out.fills.len(), 2);
        // "completed" is known but not configured as final here
        assert_eq!(out.excluded_status, 1);
        assert_eq!(out.rejected.len(), 1);
        assert_eq!(out.rejected[0].index, 3);
    }

    #[test]
    fn boundary_dates_are_inclusive() {
        let records = vec![
            RawDispense::completed("2024-12-31", 30),
            RawDispense::completed("2025-01-01", 30),
            RawDispense::completed("2025-12-31", 30),
            RawDispense::completed("2026-01-01", 30),
        ];
        let out = normalize_fills(&records, &year_2025(), &EngineConfig::default());
        assert_eq!(out.fills.len(), 2);
        assert_eq!(out.out_of_period, 2);
    }

    #[test]
    fn missing_or_non_positive_supply_defaults() {
        let records = vec![
            with_status("2025-01-01", None, "completed"),
            with_status("2025-02-01", Some(0), "completed"),
            with_status("2025-03-01", Some(-14), "completed"),
        ];
        let out = normalize_fills(&records, &year_2025(), &EngineConfig::default());
        assert!(out.fills.iter().all(|f| f.days_supply == 30));
    }

    #[test]
    fn malformed_records_are_rejected_with_reason() {
        let records = vec![
            with_status("not-a-date", Some(30), "completed"),
            RawDispense {
                fill_date: None,
                days_supply: Some(30),
                status: "completed".into(),
            },
            with_status("2025-05-01", Some(30), "bogus"),
            RawDispense::completed("2025-06-01", 30),
        ];
        let out = normalize_fills(&records, &year_2025(), &EngineConfig::default());

        assert_eq!(out.fills.len(), 1);
        let indices: Vec<_> = out.rejected.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert!(out.rejected[0].reason.contains("unparseable"));
        assert!(out.rejected[1].reason.contains("missing"));
    }

    #[test]
    fn accepts_date_time_formats() {
        assert_eq!(parse_fill_date("2025-04-02").unwrap(), d(2025, 4, 2));
        assert_eq!(parse_fill_date("2025-04-02T10:30:00Z").unwrap(), d(2025, 4, 2));
        assert_eq!(
            parse_fill_date("2025-04-02T23:15:00-05:00").unwrap(),
            d(2025, 4, 2)
        );
        assert_eq!(parse_fill_date("2025-04-02T08:00:00").unwrap(), d(2025, 4, 2));
        assert!(parse_fill_date("04/02/2025").is_err());
        assert!(parse_fill_date("2025-02-30").is_err());
    }

    #[test]
    fn same_day_fills_keep_input_order() {
        let records = vec![
            RawDispense::completed("2025-03-01", 60),
            RawDispense::completed("2025-01-01", 30),
            RawDispense::completed("2025-03-01", 7),
        ];
        let out = normalize_fills(&records, &year_2025(), &EngineConfig::default());
        assert_eq!(out.fills[1].days_supply, 60);
        assert_eq!(out.fills[2].days_supply, 7);
    }

    #[test]
    fn sufficiency_threshold() {
        let records = vec![RawDispense::completed("2025-03-01", 30)];
        let out = normalize_fills(&records, &year_2025(), &EngineConfig::default());
        assert!(!out.has_sufficient_fills(2));
        assert!(out.has_sufficient_fills(1));
    }
}
