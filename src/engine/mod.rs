//! Adherence scoring pipeline.
//!
//! Normalizer → coverage → {refill projection, fragility tier} → priority.
//! Every stage is a pure function of its inputs and the caller's as-of date.

pub mod coverage;
pub mod fragility;
pub mod normalize;
pub mod priority;
pub mod projection;
pub mod types;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::measures::MeasurementPeriod;

use self::coverage::calculate_pdc;
use self::fragility::{classify_fragility, ClassificationInput, TierDecision};
use self::normalize::{normalize_fills, NormalizedFills, RawDispense, RejectedDispense};
use self::priority::{build_fragility_result, PriorityContext};
use self::projection::project_refills;
use self::types::{AdherenceError, FragilityResult, FragilityTier, PdcResult, RefillProjection};

/// Inputs for one patient and one measure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    pub dispenses: Vec<RawDispense>,
    pub period: MeasurementPeriod,
    pub as_of: NaiveDate,
    pub active_measure_count: u32,
    pub is_new_patient: bool,
}

/// Data-quality counters from normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizationSummary {
    pub qualifying_fills: usize,
    pub excluded_status: usize,
    pub out_of_period: usize,
    pub rejected: Vec<RejectedDispense>,
}

impl From<&NormalizedFills> for NormalizationSummary {
    fn from(n: &NormalizedFills) -> Self {
        Self {
            qualifying_fills: n.fills.len(),
            excluded_status: n.excluded_status,
            out_of_period: n.out_of_period,
            rejected: n.rejected.clone(),
        }
    }
}

/// Full pipeline output. `pdc` and `fragility` always belong together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub normalization: NormalizationSummary,
    pub pdc: PdcResult,
    pub refill_projection: RefillProjection,
    pub fragility: FragilityResult,
}

/// The scoring engine seam.
pub trait AdherenceEngine {
    fn config(&self) -> &EngineConfig;

    /// Run normalization only.
    fn normalize(&self, dispenses: &[RawDispense], period: &MeasurementPeriod) -> NormalizedFills;

    /// Run the whole pipeline for one patient and measure.
    fn evaluate(&self, request: &EvaluationRequest) -> Result<Evaluation, AdherenceError>;
}

/// Default implementation over `EngineConfig`.
#[derive(Debug, Clone, Default)]
pub struct DefaultAdherenceEngine {
    config: EngineConfig,
}

impl DefaultAdherenceEngine {
    pub fn new(config: EngineConfig) -> Result<Self, AdherenceError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Score already-normalized fills.
    pub fn evaluate_fills(
        &self,
        normalized: &NormalizedFills,
        period: &MeasurementPeriod,
        as_of: NaiveDate,
        active_measure_count: u32,
        is_new_patient: bool,
    ) -> Evaluation {
        let pdc = calculate_pdc(&normalized.fills, period, as_of, &self.config);
        let refill_projection = project_refills(&pdc, &normalized.fills, &self.config);

        // Outside the measure denominator: compliant by default
        let decision = if pdc.has_coverage_data() {
            classify_fragility(
                &ClassificationInput::from_results(&pdc, &refill_projection),
                &self.config,
            )
        } else {
            TierDecision {
                tier: FragilityTier::Compliant,
                delay_budget: None,
                q4_tightened: false,
            }
        };

        let ctx = PriorityContext {
            days_until_runout: pdc.has_coverage_data().then_some(pdc.days_until_runout),
            as_of,
            active_measure_count,
            is_new_patient,
        };
        let fragility = build_fragility_result(&decision, &ctx);

        tracing::debug!(
            pdc = pdc.pdc,
            tier = %fragility.tier,
            score = fragility.priority_score,
            "Adherence evaluation complete"
        );

        Evaluation {
            normalization: NormalizationSummary::from(normalized),
            pdc,
            refill_projection,
            fragility,
        }
    }
}

impl AdherenceEngine for DefaultAdherenceEngine {
    fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn normalize(&self, dispenses: &[RawDispense], period: &MeasurementPeriod) -> NormalizedFills {
        normalize_fills(dispenses, period, &self.config)
    }

    fn evaluate(&self, request: &EvaluationRequest) -> Result<Evaluation, AdherenceError> {
        // Re-check: the period may have been deserialized without validation
        let period = MeasurementPeriod::new(request.period.start, request.period.end)?;
        let normalized = self.normalize(&request.dispenses, &period);
        Ok(self.evaluate_fills(
            &normalized,
            &period,
            request.as_of,
            request.active_measure_count,
            request.is_new_patient,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::types::UrgencyLevel;
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn request(dispenses: Vec<RawDispense>, as_of: NaiveDate) -> EvaluationRequest {
        EvaluationRequest {
            dispenses,
            period: MeasurementPeriod::calendar_year(2025).unwrap(),
            as_of,
            active_measure_count: 1,
            is_new_patient: false,
        }
    }

    #[test]
    fn insufficient_fills_are_compliant_by_default() {
        let engine = DefaultAdherenceEngine::default();
        let eval = engine
            .evaluate(&request(vec![RawDispense::completed("2025-03-01", 30)], d(2025, 6, 1)))
            .unwrap();

        assert!(!eval.pdc.has_coverage_data());
        assert_eq!(eval.fragility.tier, FragilityTier::Compliant);
        assert_eq!(eval.fragility.priority_score, 0);
        assert!(!eval.fragility.flags.out_of_medication);
        assert_eq!(eval.normalization.qualifying_fills, 1);
    }

    #[test]
    fn insufficient_fills_still_score_q4() {
        let engine = DefaultAdherenceEngine::default();
        let eval = engine.evaluate(&request(vec![], d(2025, 12, 10))).unwrap();
        assert_eq!(eval.fragility.tier, FragilityTier::Compliant);
        assert_eq!(eval.fragility.priority_score, 25);
    }

    #[test]
    fn lapsed_patient_late_in_year() {
        let engine = DefaultAdherenceEngine::default();
        // Monthly fills Jan..Sep 2025, nothing since; evaluated Nov 15
        let dispenses: Vec<RawDispense> = (1..=9)
            .map(|m| RawDispense::completed(&format!("2025-{m:02}-01"), 30))
            .collect();
        let mut req = request(dispenses, d(2025, 11, 15));
        req.active_measure_count = 2;

        let eval = engine.evaluate(&req).unwrap();
        assert_eq!(eval.pdc.fill_count, 9);
        assert!(eval.pdc.is_out_of_medication());
        assert!(eval.fragility.flags.out_of_medication);
        assert!(eval.fragility.flags.q4_evaluation);
        assert!(eval.fragility.flags.multiple_measures);
        // Out of medication, no supply: status quo cannot reach 80%
        assert!(eval.pdc.pdc_status_quo < 80.0);
        assert_ne!(eval.fragility.tier, FragilityTier::Compliant);
        assert!(eval.fragility.priority_score >= 70);
    }

    #[test]
    fn adherent_patient_is_compliant() {
        let engine = DefaultAdherenceEngine::default();
        let dispenses = vec![
            RawDispense::completed("2025-01-01", 90),
            RawDispense::completed("2025-04-01", 90),
            RawDispense::completed("2025-06-29", 90),
            RawDispense::completed("2025-09-26", 90),
        ];
        let eval = engine.evaluate(&request(dispenses, d(2025, 12, 31))).unwrap();
        assert!(eval.pdc.pdc >= 80.0);
        assert_eq!(eval.fragility.tier, FragilityTier::Compliant);
        assert_eq!(eval.fragility.delay_budget_per_refill, None);
        assert_eq!(eval.fragility.urgency_level, UrgencyLevel::Low);
    }

    #[test]
    fn oversized_supply_does_not_abort_evaluation() {
        let engine = DefaultAdherenceEngine::default();
        let dispenses = vec![
            RawDispense::completed("2025-01-01", 30),
            RawDispense::completed("2025-02-01", 200_000_000),
        ];
        let eval = engine.evaluate(&request(dispenses, d(2025, 6, 1))).unwrap();
        assert_eq!(eval.pdc.fill_count, 2);
        assert!(eval.pdc.pdc >= 80.0);
        assert_eq!(eval.fragility.tier, FragilityTier::Compliant);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = EngineConfig {
            recent_fill_window: 0,
            ..EngineConfig::default()
        };
        assert!(matches!(
            DefaultAdherenceEngine::new(config),
            Err(AdherenceError::Config(_))
        ));
    }

    #[test]
    fn inverted_period_is_caller_error() {
        let engine = DefaultAdherenceEngine::default();
        let mut req = request(vec![], d(2025, 6, 1));
        req.period = MeasurementPeriod {
            start: d(2025, 12, 31),
            end: d(2025, 1, 1),
        };
        assert!(matches!(
            engine.evaluate(&req),
            Err(AdherenceError::InvalidPeriod { .. })
        ));
    }

    #[test]
    fn evaluation_is_reproducible() {
        let engine = DefaultAdherenceEngine::default();
        let req = request(
            vec![
                RawDispense::completed("2025-02-01", 30),
                RawDispense::completed("2025-03-10", 30),
                RawDispense::completed("2025-04-25", 30),
            ],
            d(2025, 10, 20),
        );
        let a = serde_json::to_vec(&engine.evaluate(&req).unwrap()).unwrap();
        let b = serde_json::to_vec(&engine.evaluate(&req).unwrap()).unwrap();
        assert_eq!(a, b);
    }
}
