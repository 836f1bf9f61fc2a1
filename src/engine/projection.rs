//! Supply on hand, days left in the period, and refills still needed.

use chrono::NaiveDate;

use super::types::{FillRecord, PdcResult, RefillProjection};
use crate::config::EngineConfig;

/// Days from `from` to `to`; negative when `to` precedes `from`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (to - from).num_days()
}

/// Signed supply left from `fill` at `as_of`. Zero or negative means run out.
///
/// A fill dated after `as_of` counts as untouched.
pub fn days_until_runout(fill: &FillRecord, as_of: NaiveDate) -> i64 {
    let elapsed = days_between(fill.fill_date, as_of).max(0);
    i64::from(fill.days_supply) - elapsed
}

/// Days of medication left from `fill` at `as_of`; 0 without a fill.
pub fn supply_on_hand(fill: Option<&FillRecord>, as_of: NaiveDate) -> i64 {
    fill.map(|f| days_until_runout(f, as_of).max(0)).unwrap_or(0)
}

/// Days strictly after `as_of` through `period_end`, inclusive of the end.
pub fn days_to_period_end(as_of: NaiveDate, period_end: NaiveDate) -> i64 {
    days_between(as_of, period_end).max(0)
}

/// Mean days supply of the `window` most recent fills with a positive supply.
pub fn estimated_days_per_refill(fills: &[FillRecord], window: usize, default_days: u32) -> f64 {
    let mut recent: Vec<&FillRecord> = fills.iter().filter(|f| f.days_supply > 0).collect();
    recent.sort_by_key(|f| f.fill_date);

    let take = window.min(recent.len());
    if take == 0 {
        return f64::from(default_days);
    }

    let total: u64 = recent[recent.len() - take..]
        .iter()
        .map(|f| u64::from(f.days_supply))
        .sum();
    total as f64 / take as f64
}

/// Project refills from raw inputs. Used while a `PdcResult` is being built.
pub fn derive_projection(
    days_to_period_end: i64,
    current_supply: i64,
    fills: &[FillRecord],
    config: &EngineConfig,
) -> RefillProjection {
    let coverage_shortfall = (days_to_period_end - current_supply).max(0);
    let estimated = estimated_days_per_refill(
        fills,
        config.recent_fill_window,
        config.default_days_supply,
    );

    let remaining_refills = if coverage_shortfall <= 0 {
        0
    } else {
        // Round up so the projection never under-covers the shortfall
        (coverage_shortfall as f64 / estimated).ceil() as u32
    };

    RefillProjection {
        coverage_shortfall,
        estimated_days_per_refill: estimated,
        remaining_refills,
    }
}

/// Refill projection for a finished adherence snapshot.
pub fn project_refills(
    pdc: &PdcResult,
    fills: &[FillRecord],
    config: &EngineConfig,
) -> RefillProjection {
    derive_projection(pdc.days_to_period_end, pdc.current_supply, fills, config)
}
