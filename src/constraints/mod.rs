//! Fairness constraint monitoring.
//!
//! Watches the distribution of selection rates across the active pool
//! and reports inequality measures, bound violations, and advisory
//! corrective actions. The monitor never blocks generation: everything
//! it emits is diagnostic or advisory.

mod inequality;
mod monitor;

pub use inequality::{coefficient_of_variation, gini, mean, theil, variance};
pub use monitor::{
    ActionKind, ConstraintMonitor, CorrectiveAction, ParticipantSnapshot, Violation,
    ViolationKind,
};

use crate::config::EngineConfig;

/// Aggregate fairness picture returned with every generated roster and
/// by the standalone fairness report.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct FairnessMetrics {
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    pub cv: f64,
    pub gini: f64,
    pub theil: f64,
    pub max_deficit: f64,
    pub min_deficit: f64,
    pub normalized_entropy: f64,
    pub convergence_rate: f64,
    pub violations: Vec<Violation>,
    pub corrective_actions: Vec<CorrectiveAction>,
}

impl FairnessMetrics {
    /// True iff the distribution sits inside the configured targets
    /// (Gini, CV, and every rate within the band around the mean is
    /// implied by the deficit extremes).
    pub fn within_targets(&self, config: &EngineConfig) -> bool {
        let (band_low, band_high) = config.rate_band;
        let rates_in_band = if self.mean > 0.0 {
            let lowest = self.mean - self.max_deficit;
            let highest = self.mean - self.min_deficit;
            lowest >= band_low * self.mean && highest <= band_high * self.mean
        } else {
            true
        };
        self.gini < config.gini_target && self.cv < config.cv_target && rates_in_band
    }
}

impl std::fmt::Display for FairnessMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Fairness Metrics ===")?;
        writeln!(f, "  Mean rate:           {:.4}", self.mean)?;
        writeln!(f, "  CV:                  {:.4}", self.cv)?;
        writeln!(f, "  Gini:                {:.4}", self.gini)?;
        writeln!(f, "  Theil:               {:.4}", self.theil)?;
        writeln!(f, "  Deficit range:       [{:.4}, {:.4}]", self.min_deficit, self.max_deficit)?;
        writeln!(f, "  Normalized entropy:  {:.4}", self.normalized_entropy)?;
        writeln!(f, "  Convergence rate:    {:.4}", self.convergence_rate)?;
        writeln!(f, "  Violations:          {}", self.violations.len())?;
        write!(f, "  Corrective actions:  {}", self.corrective_actions.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(mean: f64, cv: f64, gini: f64, max_deficit: f64, min_deficit: f64) -> FairnessMetrics {
        FairnessMetrics {
            mean,
            variance: 0.0,
            std_dev: 0.0,
            cv,
            gini,
            theil: 0.0,
            max_deficit,
            min_deficit,
            normalized_entropy: 1.0,
            convergence_rate: 0.0,
            violations: Vec::new(),
            corrective_actions: Vec::new(),
        }
    }

    #[test]
    fn within_targets_accepts_tight_distribution() {
        let cfg = EngineConfig::default();
        assert!(metrics(1.0, 0.05, 0.03, 0.05, -0.05).within_targets(&cfg));
    }

    #[test]
    fn within_targets_rejects_high_gini_or_band_breach() {
        let cfg = EngineConfig::default();
        assert!(!metrics(1.0, 0.05, 0.40, 0.05, -0.05).within_targets(&cfg));
        // Someone 40% below the mean breaches the [0.8, 1.2] band.
        assert!(!metrics(1.0, 0.05, 0.03, 0.40, -0.05).within_targets(&cfg));
    }
}
