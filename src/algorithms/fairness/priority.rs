//! Rate-deficit priority scoring.

use crate::config::EngineConfig;
use crate::rng::RandomSource;
use crate::Id;

/// Raw per-candidate facts the scorer needs.
#[derive(Debug, Clone)]
pub struct CandidateInput {
    pub id: Id,
    pub days_in_pool: i64,
    pub total_count: u32,
}

/// A candidate with computed fairness metrics and final priority.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub id: Id,
    pub days_in_pool: i64,
    /// Selections per week in pool.
    pub rate: f64,
    /// Pool-average rate minus own rate; positive means under-selected.
    pub deficit: f64,
    /// Reported selection priority (what lands in `priority_scores`).
    pub priority: f64,
    /// Priority plus the sub-epsilon PRNG jitter used for ordering.
    pub sort_key: f64,
}

impl ScoredCandidate {
    /// Total, deterministic descending-priority ordering.
    pub fn cmp_by_priority(a: &Self, b: &Self) -> std::cmp::Ordering {
        f64::total_cmp(&b.sort_key, &a.sort_key).then_with(|| a.id.cmp(&b.id))
    }
}

/// Scores every candidate against the set's average rate.
///
/// The deficit is a *rate* deficit: selections per week in pool versus
/// the pool average. It is never multiplied by time in pool; doing so
/// would hand recent joiners a priority that grows with their own
/// tenure and force over-selection until their absolute count catches
/// up, which is precisely the failure mode this engine exists to
/// prevent.
///
/// With `use_penalized` the base priority gains a cubic boost that is
/// near-zero for small deficits and aggressive for large ones, damped
/// for long-tenured members so their priority stays smooth:
///
/// ```text
/// base     = deficit / max(days_pool, 1)
/// boost    = λ · sign(base) · |base|³
/// tenure   = ln(max(days_pool, 1) + 1) / ln(365)
/// priority = base + boost / (tenure + 1)
/// ```
///
/// Candidates are evaluated in ascending id order and each consumes
/// exactly one uniform draw for its tie-break jitter, so the PRNG
/// stream is identical across runs with the same inputs and seed.
/// Ties closer than `tie_epsilon` are effectively broken by that
/// jitter; larger gaps cannot be flipped by it.
pub fn score_candidates<R: RandomSource>(
    inputs: &[CandidateInput],
    config: &EngineConfig,
    use_penalized: bool,
    rng: &mut R,
) -> Vec<ScoredCandidate> {
    let mut inputs: Vec<&CandidateInput> = inputs.iter().collect();
    inputs.sort_by(|a, b| a.id.cmp(&b.id));

    let rates: Vec<f64> = inputs
        .iter()
        .map(|c| {
            let weeks = c.days_in_pool as f64 / 7.0;
            if weeks > 0.0 {
                c.total_count as f64 / weeks
            } else {
                0.0
            }
        })
        .collect();
    let avg_rate = if rates.is_empty() {
        0.0
    } else {
        rates.iter().sum::<f64>() / rates.len() as f64
    };

    inputs
        .iter()
        .zip(rates)
        .map(|(c, rate)| {
            let deficit = avg_rate - rate;
            let days = c.days_in_pool.max(1) as f64;
            let priority = if use_penalized {
                let base = deficit / days;
                let boost = config.penalty_lambda * base.signum() * base.abs().powi(3);
                let tenure = (days + 1.0).ln() / 365.0_f64.ln();
                base + boost / (tenure + 1.0)
            } else {
                let weeks = c.days_in_pool as f64 / 7.0;
                deficit / (weeks + 1.0)
            };
            let priority = if priority.is_finite() { priority } else { 0.0 };
            let jitter = rng.next_f64() * config.tie_epsilon;
            ScoredCandidate {
                id: c.id.clone(),
                days_in_pool: c.days_in_pool,
                rate,
                deficit,
                priority,
                sort_key: priority + jitter,
            }
        })
        .collect()
}
