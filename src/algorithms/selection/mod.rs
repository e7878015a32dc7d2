//! Stochastic team selection.
//!
//! Converts a priority vector into a probability vector via a
//! temperature-scaled softmax and samples teams without replacement.
//! Every draw flows through [`RandomSource`], so selection is
//! reproducible from the seed. The greedy strategy keeps the same
//! scoring pipeline but takes the top-k deterministically (the
//! priority jitter remains the only randomness).

use std::collections::VecDeque;

use crate::config::EngineConfig;
use crate::rng::RandomSource;
use crate::Id;

/// How priorities become a team. Matched exhaustively at the call site.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionStrategy {
    /// Deterministic top-k by priority.
    Greedy,
    /// Inverse-CDF sampling from the softmax distribution.
    Softmax { temperature: f64 },
    /// Gumbel-Max perturbation, applied iteratively with removal.
    GumbelMax { temperature: f64 },
}

/// Result of one selection round.
#[derive(Debug, Clone)]
pub struct Selection {
    /// Chosen indices into the candidate slice, in pick order.
    pub picks: Vec<usize>,
    /// The probability vector the picks were drawn from.
    pub probabilities: Vec<f64>,
    /// True if non-finite values forced a uniform fallback.
    pub degraded: bool,
}

/// Temperature-scaled softmax with the log-sum-exp trick.
///
/// Returns the probability vector and whether a degenerate input
/// (empty sum or non-finite values) forced the uniform fallback.
pub fn softmax(scores: &[f64], temperature: f64) -> (Vec<f64>, bool) {
    let n = scores.len();
    if n == 0 {
        return (Vec::new(), false);
    }
    if n == 1 {
        return (vec![1.0], false);
    }

    let mut degraded = false;
    let t = temperature.max(0.01);
    let scaled: Vec<f64> = scores
        .iter()
        .map(|&s| {
            if s.is_finite() {
                s / t
            } else {
                degraded = true;
                0.0
            }
        })
        .collect();

    let max = scaled.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scaled.iter().map(|&s| (s - max).exp()).collect();
    let sum: f64 = exps.iter().sum();

    if sum <= 0.0 || !sum.is_finite() {
        return (vec![1.0 / n as f64; n], true);
    }
    (exps.into_iter().map(|e| e / sum).collect(), degraded)
}

/// Shannon entropy `−Σ p ln p` of a probability vector.
pub fn entropy(probabilities: &[f64]) -> f64 {
    probabilities
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.ln())
        .sum()
}

/// Entropy normalized to `[0, 1]` by the `ln n` maximum.
pub fn normalized_entropy(probabilities: &[f64]) -> f64 {
    if probabilities.len() < 2 {
        return 0.0;
    }
    entropy(probabilities) / (probabilities.len() as f64).ln()
}

/// Adaptive softmax temperature.
///
/// Cools as the pool's rate variance shrinks, reheats when convergence
/// stalls, and cools hard when the previous selection round was too
/// concentrated (low entropy):
///
/// ```text
/// T_var  = 1 / (1 + 10·max(v, 0))
/// T_conv = 1.2 if c < 0 else 1.0
/// T_ent  = 0.5 / max(h, 0.1) if h < 0.5 else 1.0
/// ```
///
/// The variance-only variant is the special case `c = 0, h = 1`.
pub fn adaptive_temperature(
    rate_variance: f64,
    convergence_rate: f64,
    last_entropy: f64,
    config: &EngineConfig,
) -> f64 {
    let t_var = 1.0 / (1.0 + 10.0 * rate_variance.max(0.0));
    let t_conv = if convergence_rate < 0.0 { 1.2 } else { 1.0 };
    let t_ent = if last_entropy < 0.5 {
        0.5 / last_entropy.max(0.1)
    } else {
        1.0
    };
    config.clamp_temperature(t_var * t_conv * t_ent)
}

/// Decrements scores of recently selected candidates.
///
/// The `recent` deque holds the last selection sets, most recent
/// first; the penalty decays linearly with age across the window.
pub fn apply_diversity_penalty(
    scores: &mut [f64],
    ids: &[Id],
    recent: &VecDeque<Vec<Id>>,
    config: &EngineConfig,
) {
    let window = config.diversity_window;
    if window == 0 {
        return;
    }
    for (score, id) in scores.iter_mut().zip(ids) {
        let mut penalty = 0.0;
        for (age, set) in recent.iter().take(window).enumerate() {
            if set.iter().any(|s| s == id) {
                penalty += config.diversity_weight * (1.0 - age as f64 / window as f64);
            }
        }
        *score -= penalty;
    }
}

/// Samples `k` distinct indices from `probabilities` by inverse-CDF
/// walk, renormalizing after each pick. One uniform draw per pick.
pub fn sample_without_replacement<R: RandomSource>(
    probabilities: &[f64],
    k: usize,
    rng: &mut R,
) -> Vec<usize> {
    let mut remaining: Vec<f64> = probabilities.to_vec();
    let mut total: f64 = remaining.iter().sum();
    let mut picks = Vec::with_capacity(k);

    for _ in 0..k.min(probabilities.len()) {
        if total <= 0.0 || !total.is_finite() {
            // Degenerate mass: fall back to the first unpicked index.
            if let Some(idx) = (0..remaining.len()).find(|i| !picks.contains(i)) {
                picks.push(idx);
            }
            continue;
        }
        let target = rng.next_f64() * total;
        let mut cumulative = 0.0;
        // Default to the last live index so floating-point fallthrough
        // can never re-pick a spent slot.
        let mut chosen = remaining.iter().rposition(|&p| p > 0.0).unwrap_or(0);
        for (idx, &p) in remaining.iter().enumerate() {
            if p <= 0.0 {
                continue;
            }
            cumulative += p;
            if target < cumulative {
                chosen = idx;
                break;
            }
        }
        picks.push(chosen);
        total -= remaining[chosen];
        remaining[chosen] = 0.0;
    }
    picks
}

/// Picks `k` candidates from `scores` according to `strategy`.
///
/// Pick order is significant: earlier picks had higher priority (or
/// were drawn earlier), and callers record them in that order.
pub fn select_k<R: RandomSource>(
    scores: &[f64],
    k: usize,
    strategy: SelectionStrategy,
    rng: &mut R,
) -> Selection {
    let k = k.min(scores.len());
    match strategy {
        SelectionStrategy::Greedy => {
            let (probabilities, degraded) = softmax(scores, 1.0);
            let mut order: Vec<usize> = (0..scores.len()).collect();
            order.sort_by(|&a, &b| f64::total_cmp(&scores[b], &scores[a]).then(a.cmp(&b)));
            order.truncate(k);
            Selection {
                picks: order,
                probabilities,
                degraded,
            }
        }
        SelectionStrategy::Softmax { temperature } => {
            let (probabilities, degraded) = softmax(scores, temperature);
            let picks = sample_without_replacement(&probabilities, k, rng);
            Selection {
                picks,
                probabilities,
                degraded,
            }
        }
        SelectionStrategy::GumbelMax { temperature } => {
            let (probabilities, degraded) = softmax(scores, temperature);
            let mut available: Vec<usize> = (0..probabilities.len()).collect();
            let mut picks = Vec::with_capacity(k);
            for _ in 0..k {
                // Fresh Gumbel noise per remaining candidate, index order.
                let winner = available
                    .iter()
                    .enumerate()
                    .map(|(pos, &idx)| {
                        let log_p = probabilities[idx].max(1e-300).ln();
                        (pos, log_p + rng.gumbel())
                    })
                    .max_by(|a, b| f64::total_cmp(&a.1, &b.1))
                    .map(|(pos, _)| pos);
                match winner {
                    Some(pos) => picks.push(available.remove(pos)),
                    None => break,
                }
            }
            Selection {
                picks,
                probabilities,
                degraded,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rng::Mulberry32;

    // ── softmax ───────────────────────────────────────────────────────

    #[test]
    fn softmax_normalizes_to_one() {
        let (p, degraded) = softmax(&[1.0, 2.0, 3.0, 4.0], 1.0);
        assert!(!degraded);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(p.iter().all(|&x| (0.0..=1.0).contains(&x)));
        // Monotone in the scores.
        assert!(p[3] > p[2] && p[2] > p[1] && p[1] > p[0]);
    }

    #[test]
    fn softmax_single_candidate_is_certain() {
        assert_eq!(softmax(&[0.7], 1.0), (vec![1.0], false));
    }

    #[test]
    fn softmax_low_temperature_sharpens() {
        let (hot, _) = softmax(&[0.0, 1.0], 5.0);
        let (cold, _) = softmax(&[0.0, 1.0], 0.1);
        assert!(cold[1] > hot[1]);
        assert!(cold[1] > 0.999);
    }

    #[test]
    fn softmax_survives_huge_scores() {
        let (p, _) = softmax(&[1e308, 1e308, 0.0], 1.0);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(p.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn softmax_non_finite_input_falls_back() {
        let (p, degraded) = softmax(&[f64::NAN, f64::INFINITY, 1.0], 1.0);
        assert!(degraded);
        assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }

    // ── entropy ───────────────────────────────────────────────────────

    #[test]
    fn entropy_of_uniform_is_maximal() {
        let uniform = vec![0.25; 4];
        assert!((entropy(&uniform) - 4.0_f64.ln() * 0.25 * 4.0).abs() < 1e-12);
        assert!((normalized_entropy(&uniform) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn entropy_of_certainty_is_zero() {
        assert_eq!(entropy(&[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(normalized_entropy(&[1.0]), 0.0);
    }

    // ── adaptive temperature ──────────────────────────────────────────

    #[test]
    fn temperature_cools_with_low_variance() {
        let cfg = EngineConfig::default();
        let calm = adaptive_temperature(0.0, 0.1, 1.0, &cfg);
        let noisy = adaptive_temperature(0.5, 0.1, 1.0, &cfg);
        assert!(calm > noisy);
        assert_eq!(calm, 1.0);
    }

    #[test]
    fn temperature_reheats_on_divergence_and_low_entropy() {
        let cfg = EngineConfig::default();
        let diverging = adaptive_temperature(0.0, -0.2, 1.0, &cfg);
        assert!((diverging - 1.2).abs() < 1e-12);
        let concentrated = adaptive_temperature(0.0, 0.1, 0.2, &cfg);
        assert!((concentrated - 2.5).abs() < 1e-12);
    }

    #[test]
    fn temperature_is_clamped() {
        let cfg = EngineConfig::default();
        let t = adaptive_temperature(10.0, 0.1, 1.0, &cfg);
        assert_eq!(t, cfg.temperature_floor);
    }

    // ── diversity penalty ─────────────────────────────────────────────

    #[test]
    fn diversity_penalty_decays_with_age() {
        let cfg = EngineConfig::default();
        let ids: Vec<Id> = vec!["a".into(), "b".into(), "c".into()];
        let mut recent = VecDeque::new();
        recent.push_back(vec![Id::from("a")]); // most recent
        recent.push_back(vec![Id::from("b")]);

        let mut scores = vec![0.0, 0.0, 0.0];
        apply_diversity_penalty(&mut scores, &ids, &recent, &cfg);
        assert!(scores[0] < scores[1]); // fresher selection penalized more
        assert!(scores[1] < scores[2]); // untouched candidate unpenalized
        assert_eq!(scores[2], 0.0);
        assert!((scores[0] - (-0.1)).abs() < 1e-12);
        assert!((scores[1] - (-0.08)).abs() < 1e-12);
    }

    // ── sampling ──────────────────────────────────────────────────────

    #[test]
    fn sample_without_replacement_distinct() {
        let mut rng = Mulberry32::new(42);
        let probs = vec![0.1, 0.4, 0.3, 0.2];
        for _ in 0..100 {
            let picks = sample_without_replacement(&probs, 3, &mut rng);
            let mut sorted = picks.clone();
            sorted.sort_unstable();
            sorted.dedup();
            assert_eq!(sorted.len(), 3);
        }
    }

    #[test]
    fn sampling_tracks_probability_mass() {
        let mut rng = Mulberry32::new(7);
        let probs = vec![0.05, 0.9, 0.05];
        let mut first_pick_counts = [0usize; 3];
        for _ in 0..2_000 {
            let picks = sample_without_replacement(&probs, 1, &mut rng);
            first_pick_counts[picks[0]] += 1;
        }
        assert!(first_pick_counts[1] > 1_600, "{first_pick_counts:?}");
    }

    // ── select_k ──────────────────────────────────────────────────────

    #[test]
    fn greedy_takes_top_k_in_order() {
        let mut rng = Mulberry32::new(1);
        let s = select_k(&[0.1, 0.9, 0.5], 2, SelectionStrategy::Greedy, &mut rng);
        assert_eq!(s.picks, vec![1, 2]);
        assert!(!s.degraded);
    }

    #[test]
    fn strategies_are_deterministic_per_seed() {
        let scores = [0.3, 0.2, 0.8, 0.1, 0.6];
        for strategy in [
            SelectionStrategy::Softmax { temperature: 1.0 },
            SelectionStrategy::GumbelMax { temperature: 1.0 },
        ] {
            let mut a = Mulberry32::new(1234);
            let mut b = Mulberry32::new(1234);
            assert_eq!(
                select_k(&scores, 3, strategy, &mut a).picks,
                select_k(&scores, 3, strategy, &mut b).picks,
            );
        }
    }

    #[test]
    fn select_k_clamps_to_candidate_count() {
        let mut rng = Mulberry32::new(3);
        let s = select_k(
            &[0.5, 0.6],
            5,
            SelectionStrategy::Softmax { temperature: 1.0 },
            &mut rng,
        );
        assert_eq!(s.picks.len(), 2);
    }
}
