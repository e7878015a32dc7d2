//! Deterministic randomness for the selection engine.
//!
//! Every stochastic decision the engine makes flows through the
//! [`RandomSource`] trait so a run is a pure function of its inputs and
//! seed. Implementations must be seedable and state-snapshotable;
//! anything that cannot restore its exact state is unusable here.

mod mulberry;

pub use mulberry::Mulberry32;

/// Source of uniform and Gaussian randomness with snapshotable state.
pub trait RandomSource {
    /// Next uniform sample in `[0, 1)`.
    fn next_f64(&mut self) -> f64;

    /// Snapshot of the generator state.
    fn state(&self) -> u32;

    /// Restores a previously snapshot state.
    fn restore(&mut self, state: u32);

    /// Gaussian sample via Box-Muller (two uniform draws per call).
    fn gaussian(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().clamp(f64::MIN_POSITIVE, 1.0);
        let u2 = self.next_f64();
        let r = (-2.0 * u1.ln()).sqrt();
        let theta = 2.0 * std::f64::consts::PI * u2;
        mean + std_dev * r * theta.cos()
    }

    /// Standard Gumbel sample, for Gumbel-Max selection.
    fn gumbel(&mut self) -> f64 {
        let u = self.next_f64().clamp(1e-20, 1.0 - 1e-20);
        -(-u.ln()).ln()
    }

    /// Uniform integer in `[low, high]` (inclusive).
    fn int_in_range(&mut self, low: i64, high: i64) -> i64 {
        debug_assert!(low <= high);
        let span = (high - low + 1) as f64;
        low + (self.next_f64() * span) as i64
    }

    /// In-place Fisher-Yates shuffle.
    fn shuffle<T>(&mut self, items: &mut [T])
    where
        Self: Sized,
    {
        for i in (1..items.len()).rev() {
            let j = self.int_in_range(0, i as i64) as usize;
            items.swap(i, j);
        }
    }

    /// Samples `k` distinct indices from `0..n` by partial shuffle.
    fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize>
    where
        Self: Sized,
    {
        let mut indices: Vec<usize> = (0..n).collect();
        self.shuffle(&mut indices);
        indices.truncate(k.min(n));
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gaussian_has_roughly_requested_moments() {
        let mut rng = Mulberry32::new(7);
        let samples: Vec<f64> = (0..20_000).map(|_| rng.gaussian(5.0, 2.0)).collect();
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>()
            / samples.len() as f64;
        assert!((mean - 5.0).abs() < 0.1, "mean {mean}");
        assert!((var.sqrt() - 2.0).abs() < 0.1, "std {}", var.sqrt());
    }

    #[test]
    fn gumbel_is_finite_and_centered_near_euler_gamma() {
        let mut rng = Mulberry32::new(11);
        let samples: Vec<f64> = (0..20_000).map(|_| rng.gumbel()).collect();
        assert!(samples.iter().all(|g| g.is_finite()));
        let mean = samples.iter().sum::<f64>() / samples.len() as f64;
        assert!((mean - 0.5772).abs() < 0.05, "mean {mean}");
    }

    #[test]
    fn int_in_range_stays_inclusive() {
        let mut rng = Mulberry32::new(3);
        let mut seen = [false; 6];
        for _ in 0..1_000 {
            let v = rng.int_in_range(0, 5);
            assert!((0..=5).contains(&v));
            seen[v as usize] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn shuffle_is_a_permutation() {
        let mut rng = Mulberry32::new(99);
        let mut items: Vec<u32> = (0..50).collect();
        rng.shuffle(&mut items);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn sample_indices_distinct_and_bounded() {
        let mut rng = Mulberry32::new(5);
        let sample = rng.sample_indices(10, 4);
        assert_eq!(sample.len(), 4);
        let mut sorted = sample.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 4);
        assert!(sample.iter().all(|&i| i < 10));
    }

    #[test]
    fn sample_indices_clamps_k_to_n() {
        let mut rng = Mulberry32::new(5);
        assert_eq!(rng.sample_indices(3, 10).len(), 3);
    }
}
