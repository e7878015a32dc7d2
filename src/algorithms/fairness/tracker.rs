//! Bayesian tracking of latent selection rates.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::Id;

/// Posterior state of one participant's latent weekly selection rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateEstimate {
    pub prior_mean: f64,
    pub prior_variance: f64,
    pub observed_rate: f64,
    pub posterior_mean: f64,
    pub posterior_variance: f64,
    pub last_update: NaiveDate,
}

/// Two-sided confidence interval around a posterior mean.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
    pub mean: f64,
}

fn z_score(level: f64) -> f64 {
    if level >= 0.99 {
        2.576
    } else {
        1.96
    }
}

/// Scalar Kalman filter per participant, with drift correction toward
/// the pool's ideal rate.
///
/// States are created the first time a participant is seen and live as
/// long as the tracker. Updates never fail: variances are clamped to a
/// floor and a non-finite result leaves the previous state in place.
#[derive(Debug, Clone)]
pub struct RateTracker {
    states: HashMap<Id, RateEstimate>,
    process_noise: f64,
    observation_noise: f64,
    drift_threshold: f64,
    drift_rate: f64,
    initial_variance: f64,
    joiner_variance: f64,
    min_variance: f64,
}

impl RateTracker {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            states: HashMap::new(),
            process_noise: config.process_noise,
            observation_noise: config.observation_noise,
            drift_threshold: config.drift_threshold,
            drift_rate: config.drift_rate,
            initial_variance: config.initial_variance,
            joiner_variance: config.joiner_variance,
            min_variance: config.min_variance,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.states.contains_key(id)
    }

    pub fn estimate(&self, id: &str) -> Option<&RateEstimate> {
        self.states.get(id)
    }

    /// Seeds a participant at their empirical rate.
    pub fn initialize(&mut self, id: impl Into<Id>, initial_rate: f64, date: NaiveDate) {
        self.seed(id.into(), initial_rate.max(0.0), self.initial_variance, date);
    }

    /// Seeds a joiner who arrives after rosters already exist: they
    /// start at the pool-average rate (equilibrium, not zero) with
    /// doubled variance to reflect the lack of observations.
    pub fn initialize_joiner(&mut self, id: impl Into<Id>, pool_rate: f64, date: NaiveDate) {
        self.seed(id.into(), pool_rate.max(0.0), self.joiner_variance, date);
    }

    fn seed(&mut self, id: Id, rate: f64, variance: f64, date: NaiveDate) {
        self.states.insert(
            id,
            RateEstimate {
                prior_mean: rate,
                prior_variance: variance,
                observed_rate: rate,
                posterior_mean: rate,
                posterior_variance: variance,
                last_update: date,
            },
        );
    }

    /// One predict-observe-update-drift cycle for `id`.
    ///
    /// Returns false if the participant was unseeded and had to be
    /// auto-initialized at the ideal rate first (callers surface this
    /// as a warning).
    pub fn update(
        &mut self,
        id: &str,
        assigned: bool,
        days_elapsed: i64,
        ideal_rate: f64,
        date: NaiveDate,
    ) -> bool {
        let was_seeded = self.contains(id);
        if !was_seeded {
            self.initialize_joiner(id.to_string(), ideal_rate, date);
        }
        let state = self
            .states
            .get_mut(id)
            .unwrap_or_else(|| unreachable!("state seeded above"));

        // Predict: inflate variance with elapsed process noise.
        let weeks = days_elapsed.max(0) as f64 / 7.0;
        let prior_variance = state.posterior_variance + self.process_noise * weeks;
        let prior_mean = state.posterior_mean;

        // Observe: rate implied by this week's outcome.
        let observed = if assigned && days_elapsed > 0 {
            1.0 / days_elapsed as f64
        } else {
            0.0
        };

        // Update.
        let gain = prior_variance / (prior_variance + self.observation_noise);
        let mut posterior_mean = prior_mean + gain * (observed - prior_mean);
        let posterior_variance = ((1.0 - gain) * prior_variance).max(self.min_variance);

        // Drift-correct toward the ideal rate.
        if (posterior_mean - ideal_rate).abs() > self.drift_threshold {
            posterior_mean -= self.drift_rate * (posterior_mean - ideal_rate);
        }
        posterior_mean = posterior_mean.max(0.0);

        if !posterior_mean.is_finite() || !posterior_variance.is_finite() {
            return was_seeded;
        }

        *state = RateEstimate {
            prior_mean,
            prior_variance,
            observed_rate: observed,
            posterior_mean,
            posterior_variance,
            last_update: date,
        };
        was_seeded
    }

    /// Posterior projected `days_ahead` into the future.
    pub fn predict(&self, id: &str, days_ahead: i64) -> Option<(f64, f64)> {
        let state = self.states.get(id)?;
        let variance =
            state.posterior_variance + self.process_noise * days_ahead.max(0) as f64 / 7.0;
        Some((state.posterior_mean, variance))
    }

    /// Confidence interval at `level` (0.95 and 0.99 supported), lower
    /// bound clamped to zero.
    pub fn confidence_interval(&self, id: &str, level: f64) -> Option<ConfidenceInterval> {
        let state = self.states.get(id)?;
        let half_width = z_score(level) * state.posterior_variance.sqrt();
        Some(ConfidenceInterval {
            lower: (state.posterior_mean - half_width).max(0.0),
            upper: state.posterior_mean + half_width,
            mean: state.posterior_mean,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn tracker() -> RateTracker {
        RateTracker::new(&EngineConfig::default())
    }

    #[test]
    fn update_moves_mean_toward_observation() {
        let mut t = tracker();
        t.initialize("a", 0.0, d("2025-01-06"));
        t.update("a", true, 7, 0.1, d("2025-01-13"));
        let s = t.estimate("a").unwrap();
        assert!(s.posterior_mean > 0.0);
        assert!(s.posterior_mean < 1.0 / 7.0);
        assert!((s.observed_rate - 1.0 / 7.0).abs() < 1e-12);
    }

    #[test]
    fn posterior_variance_never_exceeds_prior() {
        let mut t = tracker();
        t.initialize("a", 0.1, d("2025-01-06"));
        for week in 0..20 {
            t.update("a", week % 3 == 0, 7, 0.1, d("2025-01-06"));
            let s = t.estimate("a").unwrap();
            assert!(s.posterior_variance <= s.prior_variance);
            assert!(s.posterior_mean >= 0.0);
            assert!(s.posterior_variance.is_finite());
        }
    }

    #[test]
    fn variance_shrinks_with_observations() {
        let mut t = tracker();
        t.initialize("a", 0.1, d("2025-01-06"));
        let before = t.estimate("a").unwrap().posterior_variance;
        for _ in 0..10 {
            t.update("a", false, 7, 0.1, d("2025-01-06"));
        }
        assert!(t.estimate("a").unwrap().posterior_variance < before);
    }

    #[test]
    fn drift_pulls_large_excursions_back() {
        let mut t = tracker();
        t.initialize("a", 1.0, d("2025-01-06"));
        // No assignment, ideal far below: drift accelerates the return.
        t.update("a", false, 7, 0.1, d("2025-01-13"));
        // Without drift the posterior would land at 1 − K.
        let prior_variance: f64 = 0.1 + 0.005;
        let undrifted = 1.0 - prior_variance / (prior_variance + 0.05);
        assert!(t.estimate("a").unwrap().posterior_mean < undrifted - 1e-9);
    }

    #[test]
    fn unseeded_update_auto_initializes_with_flag() {
        let mut t = tracker();
        let seeded = t.update("ghost", false, 7, 0.12, d("2025-01-13"));
        assert!(!seeded);
        assert!(t.contains("ghost"));
        // Seeded at the ideal rate with the doubled joiner variance.
        let s = t.estimate("ghost").unwrap();
        assert!(s.posterior_mean < 0.12 + 1e-9);
    }

    #[test]
    fn joiner_starts_at_pool_average_with_doubled_variance() {
        let mut t = tracker();
        t.initialize_joiner("n", 0.25, d("2025-06-02"));
        let s = t.estimate("n").unwrap();
        assert_eq!(s.posterior_mean, 0.25);
        assert_eq!(s.posterior_variance, 0.2);
    }

    #[test]
    fn predict_inflates_variance_only() {
        let mut t = tracker();
        t.initialize("a", 0.1, d("2025-01-06"));
        let (mean, var) = t.predict("a", 14).unwrap();
        assert_eq!(mean, 0.1);
        assert!((var - (0.1 + 0.005 * 2.0)).abs() < 1e-12);
    }

    #[test]
    fn confidence_interval_clamps_lower_to_zero() {
        let mut t = tracker();
        t.initialize("a", 0.01, d("2025-01-06"));
        let ci95 = t.confidence_interval("a", 0.95).unwrap();
        assert_eq!(ci95.lower, 0.0);
        assert!(ci95.upper > ci95.mean);
        let ci99 = t.confidence_interval("a", 0.99).unwrap();
        assert!(ci99.upper > ci95.upper);
        assert!(t.confidence_interval("missing", 0.95).is_none());
    }
}
