//! Medication-adherence scoring engine.
//!
//! Turns raw dispense history into a PDC snapshot and a fragility tier with
//! an outreach priority score. All functions are pure and take the as-of
//! date explicitly.

pub mod config;
pub mod engine;
pub mod enums;
pub mod measures;
pub mod worklist;

pub use config::EngineConfig;
pub use engine::normalize::{normalize_fills, NormalizedFills, RawDispense};
pub use engine::types::{
    AdherenceError, FillRecord, FragilityResult, FragilityTier, PdcResult, RefillProjection,
    UrgencyLevel,
};
pub use engine::{AdherenceEngine, DefaultAdherenceEngine, Evaluation, EvaluationRequest};
pub use measures::{AdherenceMeasure, MeasurementPeriod};
pub use worklist::{build_worklist, PatientMeasureCase, Worklist};

use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber. `RUST_LOG` wins over the default filter.
/// Returns false if a global subscriber was already set.
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok()
}
