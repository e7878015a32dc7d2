//! Violation detection and corrective actions.

use std::collections::VecDeque;

use chrono::NaiveDate;

use super::inequality::variance;
use crate::config::EngineConfig;
use crate::Id;

/// Per-participant view the monitor evaluates.
#[derive(Debug, Clone)]
pub struct ParticipantSnapshot {
    pub id: Id,
    pub rate: f64,
    pub deficit: f64,
    pub days_in_pool: i64,
}

/// What went out of bounds.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub enum ViolationKind {
    /// A participant's deficit magnitude exceeded their `β·√t` bound.
    CumulativeDeficit { participant: Id },
    /// The pool's rate variance exceeded the configured maximum.
    Variance,
}

/// A detected bound violation with its relative severity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Violation {
    pub kind: ViolationKind,
    /// `|value| / bound`; always > 1 for an emitted violation.
    pub severity: f64,
    pub week: NaiveDate,
}

/// How a corrective action biases future selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionKind {
    Boost,
    Penalty,
    Mandatory,
}

/// Advisory bias the generator may apply to a participant's priority
/// for a limited number of weeks.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct CorrectiveAction {
    pub target: Id,
    pub kind: ActionKind,
    pub magnitude: f64,
    pub duration_weeks: u32,
}

/// Watches rate dispersion and per-participant deficit bounds.
///
/// Keeps a bounded history of variance snapshots so callers can ask
/// whether the pool is converging over time.
#[derive(Debug, Clone)]
pub struct ConstraintMonitor {
    beta: f64,
    max_variance: f64,
    history_capacity: usize,
    variance_history: VecDeque<f64>,
}

impl ConstraintMonitor {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            beta: config.deficit_beta,
            max_variance: config.max_rate_variance,
            history_capacity: config.history_capacity,
            variance_history: VecDeque::new(),
        }
    }

    /// Evaluates the pool, records the variance snapshot, and returns
    /// violations (sorted by descending severity) plus the corrective
    /// actions they imply.
    pub fn check(
        &mut self,
        snapshots: &[ParticipantSnapshot],
        week: NaiveDate,
    ) -> (Vec<Violation>, Vec<CorrectiveAction>) {
        let rates: Vec<f64> = snapshots.iter().map(|s| s.rate).collect();
        let pool_variance = variance(&rates);
        self.record_variance(pool_variance);

        let mut violations = Vec::new();
        let mut actions = Vec::new();

        for snapshot in snapshots {
            let bound = self.beta * (snapshot.days_in_pool.max(0) as f64).sqrt();
            if bound <= 0.0 {
                continue;
            }
            let magnitude = snapshot.deficit.abs();
            if magnitude > bound {
                let severity = magnitude / bound;
                violations.push(Violation {
                    kind: ViolationKind::CumulativeDeficit {
                        participant: snapshot.id.clone(),
                    },
                    severity,
                    week,
                });
                actions.push(CorrectiveAction {
                    target: snapshot.id.clone(),
                    kind: if snapshot.deficit > 0.0 {
                        ActionKind::Boost
                    } else {
                        ActionKind::Penalty
                    },
                    magnitude: severity,
                    duration_weeks: (4.0 * severity).ceil() as u32,
                });
            }
        }

        if pool_variance > self.max_variance && self.max_variance > 0.0 {
            violations.push(Violation {
                kind: ViolationKind::Variance,
                severity: pool_variance / self.max_variance,
                week,
            });
        }

        violations.sort_by(|a, b| f64::total_cmp(&b.severity, &a.severity));
        (violations, actions)
    }

    fn record_variance(&mut self, value: f64) {
        if self.variance_history.len() == self.history_capacity {
            self.variance_history.pop_front();
        }
        self.variance_history.push_back(value);
    }

    /// True iff the mean of the last `window` variance snapshots is
    /// strictly below the mean of the `window` before them.
    pub fn is_converging(&self, window: usize) -> bool {
        self.convergence_rate(window) > 0.0
    }

    /// Relative decrease of mean variance between the previous window
    /// and the most recent one; 0 when there is not enough history.
    pub fn convergence_rate(&self, window: usize) -> f64 {
        if window == 0 || self.variance_history.len() < 2 * window {
            return 0.0;
        }
        let len = self.variance_history.len();
        let recent: f64 =
            self.variance_history.iter().skip(len - window).sum::<f64>() / window as f64;
        let prior: f64 = self
            .variance_history
            .iter()
            .skip(len - 2 * window)
            .take(window)
            .sum::<f64>()
            / window as f64;
        if prior <= 0.0 {
            return 0.0;
        }
        (prior - recent) / prior
    }
}
