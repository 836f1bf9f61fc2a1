//! Priority score and urgency bucket for queue ordering.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use super::fragility::TierDecision;
use super::types::{FragilityFlags, FragilityResult, FragilityTier, UrgencyLevel};

// ═══════════════════════════════════════════════════════════
// Constants
// ═══════════════════════════════════════════════════════════

const OUT_OF_MEDICATION_BONUS: u32 = 30;
const Q4_BONUS: u32 = 25;
const MULTIPLE_MEASURES_BONUS: u32 = 15;
const NEW_PATIENT_BONUS: u32 = 10;

const EXTREME_MIN_SCORE: u32 = 150;
const HIGH_MIN_SCORE: u32 = 100;
const MODERATE_MIN_SCORE: u32 = 50;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// Situational inputs to the score, supplied by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityContext {
    /// `None` when there is no fill history to judge supply from.
    pub days_until_runout: Option<i64>,
    pub as_of: NaiveDate,
    pub active_measure_count: u32,
    pub is_new_patient: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriorityScore {
    pub score: u32,
    pub urgency: UrgencyLevel,
    pub flags: FragilityFlags,
}

// ═══════════════════════════════════════════════════════════
// Scoring
// ═══════════════════════════════════════════════════════════

pub fn base_score(tier: FragilityTier) -> u32 {
    match tier {
        FragilityTier::F1Imminent => 100,
        FragilityTier::F2Fragile => 80,
        FragilityTier::F3Moderate => 60,
        FragilityTier::F4Comfortable => 40,
        FragilityTier::F5Safe => 20,
        FragilityTier::Compliant | FragilityTier::T5Unsalvageable => 0,
    }
}

/// October through December.
pub fn is_q4(date: NaiveDate) -> bool {
    date.month() >= 10
}

pub fn urgency_for_score(score: u32) -> UrgencyLevel {
    if score >= EXTREME_MIN_SCORE {
        UrgencyLevel::Extreme
    } else if score >= HIGH_MIN_SCORE {
        UrgencyLevel::High
    } else if score >= MODERATE_MIN_SCORE {
        UrgencyLevel::Moderate
    } else {
        UrgencyLevel::Low
    }
}

/// Tier base plus every bonus that applies. Bonuses apply to all tiers,
/// including the zero-base ones. The total is not capped.
pub fn score_priority(tier: FragilityTier, ctx: &PriorityContext) -> PriorityScore {
    let flags = FragilityFlags {
        out_of_medication: ctx.days_until_runout.is_some_and(|days| days <= 0),
        q4_evaluation: is_q4(ctx.as_of),
        multiple_measures: ctx.active_measure_count >= 2,
        new_patient: ctx.is_new_patient,
        q4_tightened: false,
    };

    let mut score = base_score(tier);
    if flags.out_of_medication {
        score += OUT_OF_MEDICATION_BONUS;
    }
    if flags.q4_evaluation {
        score += Q4_BONUS;
    }
    if flags.multiple_measures {
        score += MULTIPLE_MEASURES_BONUS;
    }
    if flags.new_patient {
        score += NEW_PATIENT_BONUS;
    }

    PriorityScore {
        score,
        urgency: urgency_for_score(score),
        flags,
    }
}

/// Combine a classifier decision with its priority score.
pub fn build_fragility_result(decision: &TierDecision, ctx: &PriorityContext) -> FragilityResult {
    let priority = score_priority(decision.tier, ctx);
    FragilityResult {
        tier: decision.tier,
        delay_budget_per_refill: decision.delay_budget,
        priority_score: priority.score,
        urgency_level: priority.urgency,
        flags: FragilityFlags {
            q4_tightened: decision.q4_tightened,
            ..priority.flags
        },
    }
}
