//! Coverage calculation: merged fill windows → proportion of days covered.

use chrono::NaiveDate;

use super::projection::{days_to_period_end, days_until_runout, derive_projection, supply_on_hand};
use super::types::{CoverageInterval, FillRecord, PdcResult, TreatmentPeriod};
use crate::config::EngineConfig;
use crate::measures::MeasurementPeriod;

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Percentage of `treatment_days`, two decimals, never above 100.
fn ratio_pct(days: i64, treatment_days: i64) -> f64 {
    if treatment_days <= 0 {
        return 0.0;
    }
    round2(days as f64 / treatment_days as f64 * 100.0).min(100.0)
}

/// One coverage interval per fill.
pub fn build_intervals(fills: &[FillRecord]) -> Vec<CoverageInterval> {
    fills.iter().map(CoverageInterval::from_fill).collect()
}

/// Merge overlapping or touching intervals into an ordered, disjoint set.
///
/// Two intervals merge when the next start is at most one day past the
/// current end. A one-day gap keeps them apart.
pub fn merge_intervals(mut intervals: Vec<CoverageInterval>) -> Vec<CoverageInterval> {
    intervals.sort_by_key(|i| i.start);

    let mut merged: Vec<CoverageInterval> = Vec::with_capacity(intervals.len());
    for interval in intervals {
        if let Some(current) = merged.last_mut() {
            let touches = current
                .end
                .checked_add_signed(chrono::Duration::days(1))
                .map_or(true, |next_day| interval.start <= next_day);
            if touches {
                current.end = current.end.max(interval.end);
                continue;
            }
        }
        merged.push(interval);
    }
    merged
}

/// Cap merged intervals at `period_end`, dropping any that start after it.
pub fn cap_intervals(intervals: &[CoverageInterval], period_end: NaiveDate) -> Vec<CoverageInterval> {
    intervals
        .iter()
        .filter(|i| i.start <= period_end)
        .map(|i| CoverageInterval {
            start: i.start,
            end: i.end.min(period_end),
        })
        .collect()
}

/// Days covered by at least one fill, within the measurement period.
pub fn covered_days(fills: &[FillRecord], period_end: NaiveDate) -> i64 {
    let merged = merge_intervals(build_intervals(fills));
    cap_intervals(&merged, period_end)
        .iter()
        .map(CoverageInterval::days)
        .sum()
}

/// Compute the adherence snapshot for normalized fills.
///
/// Fewer than `config.min_qualifying_fills` fills yields `PdcResult::empty`.
pub fn calculate_pdc(
    fills: &[FillRecord],
    period: &MeasurementPeriod,
    as_of: NaiveDate,
    config: &EngineConfig,
) -> PdcResult {
    if fills.len() < config.min_qualifying_fills {
        tracing::debug!(
            fills = fills.len(),
            required = config.min_qualifying_fills,
            "Insufficient fills for PDC"
        );
        return PdcResult::empty(*period, as_of);
    }

    let Some(first_fill) = fills.iter().map(|f| f.fill_date).min() else {
        return PdcResult::empty(*period, as_of);
    };
    // max_by_key keeps the last of equal dates
    let last_fill = fills.iter().max_by_key(|f| f.fill_date);

    let treatment_period = TreatmentPeriod {
        start: first_fill,
        end: period.end,
    };
    let treatment_days = treatment_period.days().max(1);
    let covered = covered_days(fills, period.end);

    let gap_days_used = treatment_days - covered;
    let gap_days_allowed = (treatment_days as f64 * config.gap_allowance_ratio).floor() as i64;
    let gap_days_remaining = gap_days_allowed - gap_days_used;

    let days_remaining = days_to_period_end(as_of, period.end);
    let current_supply = supply_on_hand(last_fill, as_of);
    let runout = last_fill.map(|f| days_until_runout(f, as_of)).unwrap_or(0);

    let pdc = ratio_pct(covered, treatment_days);
    let pdc_status_quo = ratio_pct(covered + current_supply.min(days_remaining), treatment_days);
    let pdc_perfect = ratio_pct(covered + days_remaining, treatment_days);

    let refills_needed =
        derive_projection(days_remaining, current_supply, fills, config).remaining_refills;

    tracing::debug!(
        pdc,
        covered,
        treatment_days,
        gap_days_remaining,
        pdc_status_quo,
        pdc_perfect,
        "PDC calculated"
    );

    PdcResult {
        pdc,
        covered_days: covered,
        treatment_days,
        gap_days_used,
        gap_days_allowed,
        gap_days_remaining,
        pdc_status_quo,
        pdc_perfect,
        measurement_period: *period,
        treatment_period: Some(treatment_period),
        as_of,
        days_until_runout: runout,
        current_supply,
        refills_needed,
        last_fill_date: last_fill.map(|f| f.fill_date),
        fill_count: fills.len(),
        days_to_period_end: days_remaining,
    }
}
