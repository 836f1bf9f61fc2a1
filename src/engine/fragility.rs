//! Fragility tier classification.
//!
//! Decision order is fixed:
//! 1. Status-quo PDC at or above threshold → `Compliant`.
//! 2. Perfect PDC below threshold, or gap allowance overdrawn → `T5Unsalvageable`.
//! 3. Otherwise the delay budget (gap days remaining per refill still needed)
//!    picks F1..F5.
//! 4. Late in the period with little slack, the F-tier moves one step up.

use serde::{Deserialize, Serialize};

use super::types::{FragilityTier, PdcResult, RefillProjection};
use crate::config::EngineConfig;

/// Everything the classifier looks at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassificationInput {
    pub pdc_status_quo: f64,
    pub pdc_perfect: f64,
    pub gap_days_remaining: i64,
    pub remaining_refills: u32,
    pub days_to_period_end: i64,
}

impl ClassificationInput {
    pub fn from_results(pdc: &PdcResult, projection: &RefillProjection) -> Self {
        Self {
            pdc_status_quo: pdc.pdc_status_quo,
            pdc_perfect: pdc.pdc_perfect,
            gap_days_remaining: pdc.gap_days_remaining,
            remaining_refills: projection.remaining_refills,
            days_to_period_end: pdc.days_to_period_end,
        }
    }
}

/// Classifier output, before scoring.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierDecision {
    pub tier: FragilityTier,
    pub delay_budget: Option<f64>,
    pub q4_tightened: bool,
}

/// Average days each remaining refill may slip; infinite with no refills left.
pub fn delay_budget(gap_days_remaining: i64, remaining_refills: u32) -> f64 {
    if remaining_refills == 0 {
        return f64::INFINITY;
    }
    gap_days_remaining as f64 / f64::from(remaining_refills)
}

/// Map a delay budget onto F1..F5.
pub fn tier_for_budget(budget: f64) -> FragilityTier {
    if budget <= 2.0 {
        FragilityTier::F1Imminent
    } else if budget <= 5.0 {
        FragilityTier::F2Fragile
    } else if budget <= 10.0 {
        FragilityTier::F3Moderate
    } else if budget <= 20.0 {
        FragilityTier::F4Comfortable
    } else {
        FragilityTier::F5Safe
    }
}

/// Late-period tightening. Returns the (possibly promoted) tier and whether it moved.
pub fn apply_q4_tightening(
    tier: FragilityTier,
    days_to_period_end: i64,
    gap_days_remaining: i64,
    config: &EngineConfig,
) -> (FragilityTier, bool) {
    let late = days_to_period_end < config.q4_days_threshold
        && gap_days_remaining <= config.q4_gap_days_threshold;
    if !late {
        return (tier, false);
    }
    let promoted = tier.promoted();
    (promoted, promoted != tier)
}

pub fn classify_fragility(input: &ClassificationInput, config: &EngineConfig) -> TierDecision {
    if input.pdc_status_quo >= config.pdc_threshold {
        return TierDecision {
            tier: FragilityTier::Compliant,
            delay_budget: None,
            q4_tightened: false,
        };
    }

    if input.pdc_perfect < config.pdc_threshold || input.gap_days_remaining < 0 {
        return TierDecision {
            tier: FragilityTier::T5Unsalvageable,
            delay_budget: None,
            q4_tightened: false,
        };
    }

    let budget = delay_budget(input.gap_days_remaining, input.remaining_refills);
    let base = tier_for_budget(budget);
    let (tier, q4_tightened) = apply_q4_tightening(
        base,
        input.days_to_period_end,
        input.gap_days_remaining,
        config,
    );

    if q4_tightened {
        tracing::debug!(from = %base, to = %tier, "Late-period tier tightening applied");
    }

    TierDecision {
        tier,
        delay_budget: Some(budget),
        q4_tightened,
    }
}
