use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::measures::MeasurementPeriod;

// ---------------------------------------------------------------------------
// FillRecord & coverage
// ---------------------------------------------------------------------------

/// A canonical fill event produced by the normalizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillRecord {
    pub fill_date: NaiveDate,
    /// Always positive once normalized.
    pub days_supply: u32,
}

impl FillRecord {
    pub fn new(fill_date: NaiveDate, days_supply: u32) -> Self {
        Self {
            fill_date,
            days_supply,
        }
    }

    /// Last day covered by this fill (inclusive). Saturates at `NaiveDate::MAX`.
    pub fn coverage_end(&self) -> NaiveDate {
        self.fill_date
            .checked_add_signed(chrono::Duration::days(i64::from(self.days_supply.max(1)) - 1))
            .unwrap_or(NaiveDate::MAX)
    }
}

/// Inclusive span of covered days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageInterval {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl CoverageInterval {
    pub fn from_fill(fill: &FillRecord) -> Self {
        Self {
            start: fill.fill_date,
            end: fill.coverage_end(),
        }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// From the first qualifying fill to the end of the measurement window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreatmentPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TreatmentPeriod {
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

// ---------------------------------------------------------------------------
// PdcResult
// ---------------------------------------------------------------------------

/// Adherence snapshot for one patient and measure at one as-of date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdcResult {
    /// Proportion of days covered, 0–100, two decimals.
    pub pdc: f64,
    pub covered_days: i64,
    pub treatment_days: i64,
    pub gap_days_used: i64,
    pub gap_days_allowed: i64,
    /// Negative once the allowance is exhausted.
    pub gap_days_remaining: i64,
    /// PDC if nothing beyond the current supply is filled.
    pub pdc_status_quo: f64,
    /// PDC if every future refill is on time.
    pub pdc_perfect: f64,
    pub measurement_period: MeasurementPeriod,
    pub treatment_period: Option<TreatmentPeriod>,
    pub as_of: NaiveDate,
    /// Days of supply left from the most recent fill; zero or negative when out.
    pub days_until_runout: i64,
    pub current_supply: i64,
    pub refills_needed: u32,
    pub last_fill_date: Option<NaiveDate>,
    pub fill_count: usize,
    pub days_to_period_end: i64,
}

impl PdcResult {
    /// Zeroed result for patients with too few qualifying fills.
    pub fn empty(measurement_period: MeasurementPeriod, as_of: NaiveDate) -> Self {
        Self {
            pdc: 0.0,
            covered_days: 0,
            treatment_days: 0,
            gap_days_used: 0,
            gap_days_allowed: 0,
            gap_days_remaining: 0,
            pdc_status_quo: 0.0,
            pdc_perfect: 0.0,
            measurement_period,
            treatment_period: None,
            as_of,
            days_until_runout: 0,
            current_supply: 0,
            refills_needed: 0,
            last_fill_date: None,
            fill_count: 0,
            days_to_period_end: 0,
        }
    }

    /// False for the zeroed insufficient-data result.
    pub fn has_coverage_data(&self) -> bool {
        self.treatment_days > 0
    }

    pub fn is_out_of_medication(&self) -> bool {
        self.has_coverage_data() && self.days_until_runout <= 0
    }
}

/// Forward-looking refill estimate, an input to classification only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RefillProjection {
    pub coverage_shortfall: i64,
    pub estimated_days_per_refill: f64,
    pub remaining_refills: u32,
}

// ---------------------------------------------------------------------------
// Fragility
// ---------------------------------------------------------------------------

/// Urgency tiers, F1 most urgent through F5 least.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FragilityTier {
    #[serde(rename = "COMPLIANT")]
    Compliant,
    #[serde(rename = "F1_IMMINENT")]
    F1Imminent,
    #[serde(rename = "F2_FRAGILE")]
    F2Fragile,
    #[serde(rename = "F3_MODERATE")]
    F3Moderate,
    #[serde(rename = "F4_COMFORTABLE")]
    F4Comfortable,
    #[serde(rename = "F5_SAFE")]
    F5Safe,
    #[serde(rename = "T5_UNSALVAGEABLE")]
    T5Unsalvageable,
}

impl FragilityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compliant => "COMPLIANT",
            Self::F1Imminent => "F1_IMMINENT",
            Self::F2Fragile => "F2_FRAGILE",
            Self::F3Moderate => "F3_MODERATE",
            Self::F4Comfortable => "F4_COMFORTABLE",
            Self::F5Safe => "F5_SAFE",
            Self::T5Unsalvageable => "T5_UNSALVAGEABLE",
        }
    }

    /// One step more urgent. F1, COMPLIANT and T5 stay where they are.
    pub fn promoted(self) -> Self {
        match self {
            Self::F5Safe => Self::F4Comfortable,
            Self::F4Comfortable => Self::F3Moderate,
            Self::F3Moderate => Self::F2Fragile,
            Self::F2Fragile => Self::F1Imminent,
            other => other,
        }
    }

    /// True for the five delay-budget tiers.
    pub fn is_fragile(&self) -> bool {
        !matches!(self, Self::Compliant | Self::T5Unsalvageable)
    }

    pub fn all() -> &'static [FragilityTier] {
        &[
            Self::Compliant,
            Self::F1Imminent,
            Self::F2Fragile,
            Self::F3Moderate,
            Self::F4Comfortable,
            Self::F5Safe,
            Self::T5Unsalvageable,
        ]
    }
}

impl std::fmt::Display for FragilityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse bucket of the priority score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyLevel {
    Low,
    Moderate,
    High,
    Extreme,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Moderate => "MODERATE",
            Self::High => "HIGH",
            Self::Extreme => "EXTREME",
        }
    }
}

/// Which bonus conditions fired, and whether Q4 tightening promoted the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FragilityFlags {
    pub out_of_medication: bool,
    pub q4_evaluation: bool,
    pub multiple_measures: bool,
    pub new_patient: bool,
    pub q4_tightened: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FragilityResult {
    pub tier: FragilityTier,
    /// `None` when the tier was decided before any budget was computed;
    /// `Some(inf)` when no refills remain (serializes as `null`).
    pub delay_budget_per_refill: Option<f64>,
    pub priority_score: u32,
    pub urgency_level: UrgencyLevel,
    pub flags: FragilityFlags,
}

// ---------------------------------------------------------------------------
// AdherenceError
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum AdherenceError {
    #[error("Invalid measurement period: start {start} is after end {end}")]
    InvalidPeriod { start: NaiveDate, end: NaiveDate },

    #[error("Invalid value for {field}: {value}")]
    InvalidEnum { field: String, value: String },

    #[error("Malformed dispense record: {0}")]
    MalformedRecord(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Configuration load failed ({0}): {1}")]
    ConfigLoad(String, String),

    #[error("Configuration parse failed: {0}")]
    ConfigParse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
