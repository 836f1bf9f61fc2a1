use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::types::AdherenceError;

/// Crate-level constants
pub const APP_NAME: &str = "adherence-engine";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "adherence_engine=info,warn"
}

// ═══════════════════════════════════════════════════════════
// Engine configuration
// ═══════════════════════════════════════════════════════════

/// Thresholds and defaults driving the scoring pipeline.
///
/// Defaults follow the chronic-medication adherence measures: a patient is
/// adherent at PDC ≥ 80%, which leaves a 20% allowance of uncovered days.
/// Every field is optional in JSON; missing fields take the default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// PDC percentage at or above which a patient counts as adherent.
    pub pdc_threshold: f64,
    /// Share of treatment days that may go uncovered.
    pub gap_allowance_ratio: f64,
    /// Days supply substituted when a dispense carries none (or a non-positive one).
    pub default_days_supply: u32,
    /// Fewer qualifying fills than this keeps the patient out of the denominator.
    pub min_qualifying_fills: usize,
    /// Number of most recent fills averaged to estimate days per refill.
    pub recent_fill_window: usize,
    /// Late-period tightening applies when fewer than this many days remain.
    pub q4_days_threshold: i64,
    /// ...and gap days remaining are at or below this.
    pub q4_gap_days_threshold: i64,
    /// Dispense statuses that denote a completed transaction.
    pub completed_statuses: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pdc_threshold: 80.0,
            gap_allowance_ratio: 0.20,
            default_days_supply: 30,
            min_qualifying_fills: 2,
            recent_fill_window: 3,
            q4_days_threshold: 60,
            q4_gap_days_threshold: 5,
            completed_statuses: vec!["completed".into()],
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, AdherenceError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| AdherenceError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file (JSON).
    pub fn load(path: &Path) -> Result<Self, AdherenceError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AdherenceError::ConfigLoad(path.display().to_string(), e.to_string())
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), "Engine configuration loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AdherenceError> {
        if !(self.pdc_threshold > 0.0 && self.pdc_threshold <= 100.0) {
            return Err(AdherenceError::Config(format!(
                "pdc_threshold must be within (0, 100], got {}",
                self.pdc_threshold
            )));
        }
        if !(0.0..1.0).contains(&self.gap_allowance_ratio) {
            return Err(AdherenceError::Config(format!(
                "gap_allowance_ratio must be within [0, 1), got {}",
                self.gap_allowance_ratio
            )));
        }
        if self.default_days_supply == 0 {
            return Err(AdherenceError::Config(
                "default_days_supply must be positive".into(),
            ));
        }
        if self.min_qualifying_fills == 0 {
            return Err(AdherenceError::Config(
                "min_qualifying_fills must be at least 1".into(),
            ));
        }
        if self.recent_fill_window == 0 {
            return Err(AdherenceError::Config(
                "recent_fill_window must be at least 1".into(),
            ));
        }
        if self.completed_statuses.is_empty() {
            return Err(AdherenceError::Config(
                "completed_statuses must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Whether a raw status string denotes a completed transaction.
    pub fn is_completed_status(&self, status: &str) -> bool {
        self.completed_statuses
            .iter()
            .any(|s| s.eq_ignore_ascii_case(status.trim()))
    }
}
