//! Outreach worklist: evaluate many patient/measure cases and rank them.
//!
//! Cases are independent. With the `parallel` feature the evaluations run on
//! rayon's pool; ordering of the finished queue never depends on that.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::Instant;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::engine::normalize::{NormalizedFills, RawDispense};
use crate::engine::types::{AdherenceError, FragilityTier, UrgencyLevel};
use crate::engine::{AdherenceEngine, DefaultAdherenceEngine, Evaluation};
use crate::measures::{AdherenceMeasure, MeasurementPeriod};

/// One patient on one measure, as handed over by the data-access layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientMeasureCase {
    /// Caller's opaque patient identifier.
    pub patient_id: String,
    pub measure: AdherenceMeasure,
    pub dispenses: Vec<RawDispense>,
    pub is_new_patient: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorklistEntry {
    pub patient_id: String,
    pub measure: AdherenceMeasure,
    pub active_measure_count: u32,
    pub evaluation: Evaluation,
}

impl WorklistEntry {
    pub fn priority_score(&self) -> u32 {
        self.evaluation.fragility.priority_score
    }

    pub fn tier(&self) -> FragilityTier {
        self.evaluation.fragility.tier
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TierCounts {
    pub compliant: usize,
    pub f1_imminent: usize,
    pub f2_fragile: usize,
    pub f3_moderate: usize,
    pub f4_comfortable: usize,
    pub f5_safe: usize,
    pub t5_unsalvageable: usize,
}

impl TierCounts {
    fn record(&mut self, tier: FragilityTier) {
        match tier {
            FragilityTier::Compliant => self.compliant += 1,
            FragilityTier::F1Imminent => self.f1_imminent += 1,
            FragilityTier::F2Fragile => self.f2_fragile += 1,
            FragilityTier::F3Moderate => self.f3_moderate += 1,
            FragilityTier::F4Comfortable => self.f4_comfortable += 1,
            FragilityTier::F5Safe => self.f5_safe += 1,
            FragilityTier::T5Unsalvageable => self.t5_unsalvageable += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.compliant
            + self.f1_imminent
            + self.f2_fragile
            + self.f3_moderate
            + self.f4_comfortable
            + self.f5_safe
            + self.t5_unsalvageable
    }

    /// Patients in one of the F1..F5 tiers.
    pub fn fragile(&self) -> usize {
        self.f1_imminent + self.f2_fragile + self.f3_moderate + self.f4_comfortable + self.f5_safe
    }
}

/// Ranked queue, most urgent first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Worklist {
    pub as_of: NaiveDate,
    pub period: MeasurementPeriod,
    pub entries: Vec<WorklistEntry>,
    pub counts: TierCounts,
}

impl Worklist {
    pub fn by_urgency(&self, level: UrgencyLevel) -> impl Iterator<Item = &WorklistEntry> {
        self.entries
            .iter()
            .filter(move |e| e.evaluation.fragility.urgency_level == level)
    }

    pub fn for_patient<'a>(&'a self, patient_id: &'a str) -> impl Iterator<Item = &'a WorklistEntry> {
        self.entries.iter().filter(move |e| e.patient_id == patient_id)
    }

    pub fn to_json(&self) -> Result<String, AdherenceError> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Queue order: score desc, runout asc, then patient id and measure code.
/// Entries without coverage data have no real runout and go last in a tie.
pub fn compare_entries(a: &WorklistEntry, b: &WorklistEntry) -> Ordering {
    b.priority_score()
        .cmp(&a.priority_score())
        .then_with(|| {
            b.evaluation
                .pdc
                .has_coverage_data()
                .cmp(&a.evaluation.pdc.has_coverage_data())
        })
        .then_with(|| {
            a.evaluation
                .pdc
                .days_until_runout
                .cmp(&b.evaluation.pdc.days_until_runout)
        })
        .then_with(|| a.patient_id.cmp(&b.patient_id))
        .then_with(|| a.measure.as_str().cmp(b.measure.as_str()))
}

/// Count, per patient, the measures with enough qualifying fills to be active.
fn active_measure_counts(
    cases: &[PatientMeasureCase],
    normalized: &[NormalizedFills],
    min_qualifying_fills: usize,
) -> HashMap<String, u32> {
    let mut counts: HashMap<String, u32> = HashMap::new();
    for (case, fills) in cases.iter().zip(normalized) {
        let entry = counts.entry(case.patient_id.clone()).or_insert(0);
        if fills.has_sufficient_fills(min_qualifying_fills) {
            *entry += 1;
        }
    }
    counts
}

#[cfg(feature = "parallel")]
fn map_all<I, T, F>(items: &[I], f: F) -> Vec<T>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> T + Sync + Send,
{
    use rayon::prelude::*;

    items.par_iter().map(f).collect()
}

#[cfg(not(feature = "parallel"))]
fn map_all<I, T, F>(items: &[I], f: F) -> Vec<T>
where
    I: Sync,
    T: Send,
    F: Fn(&I) -> T + Sync + Send,
{
    items.iter().map(f).collect()
}

/// Evaluate every case against one period and as-of date and rank the results.
pub fn build_worklist(
    engine: &DefaultAdherenceEngine,
    cases: &[PatientMeasureCase],
    period: &MeasurementPeriod,
    as_of: NaiveDate,
) -> Result<Worklist, AdherenceError> {
    let start = Instant::now();
    let period = MeasurementPeriod::new(period.start, period.end)?;
    let min_fills = engine.config().min_qualifying_fills;

    let normalized: Vec<NormalizedFills> =
        map_all(cases, |case| engine.normalize(&case.dispenses, &period));
    let measure_counts = active_measure_counts(cases, &normalized, min_fills);

    let indexed: Vec<(usize, &PatientMeasureCase)> = cases.iter().enumerate().collect();
    let mut entries: Vec<WorklistEntry> = map_all(&indexed, |(idx, case)| {
        let active = measure_counts.get(&case.patient_id).copied().unwrap_or(0);
        WorklistEntry {
            patient_id: case.patient_id.clone(),
            measure: case.measure,
            active_measure_count: active,
            evaluation: engine.evaluate_fills(
                &normalized[*idx],
                &period,
                as_of,
                active,
                case.is_new_patient,
            ),
        }
    });

    entries.sort_by(compare_entries);

    let mut counts = TierCounts::default();
    for entry in &entries {
        counts.record(entry.tier());
    }

    tracing::info!(
        cases = cases.len(),
        fragile = counts.fragile(),
        unsalvageable = counts.t5_unsalvageable,
        processing_ms = start.elapsed().as_millis() as u64,
        "Adherence worklist built"
    );

    Ok(Worklist {
        as_of,
        period,
        entries,
        counts,
    })
}
