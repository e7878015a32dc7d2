//! Configuration for the roster generation engine.

/// Tuneable constants for the fairness and selection engine.
///
/// All thresholds referenced by the scoring, tracking, and monitoring
/// components live here so hosts can tune them in one place. The
/// defaults are the calibrated production values.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    // --- Experience thresholds ---
    /// Days of total presence after which a participant counts as experienced.
    pub experience_min_days: i64,
    /// Historical main-selection count after which a participant counts as experienced.
    pub experience_min_assignments: u32,

    // --- Priority scoring ---
    /// Weight λ of the cubic penalty boost applied to large rate deficits.
    pub penalty_lambda: f64,
    /// Priorities closer than this are treated as tied and broken by the PRNG.
    pub tie_epsilon: f64,

    // --- Bayesian rate tracker ---
    /// Process noise σ²_process added per week of elapsed time.
    pub process_noise: f64,
    /// Observation noise σ²_obs of a single weekly selection observation.
    pub observation_noise: f64,
    /// Drift threshold τ: posterior means further than this from the ideal
    /// rate are pulled back toward it.
    pub drift_threshold: f64,
    /// Drift rate α: fraction of the excursion removed per correction.
    pub drift_rate: f64,
    /// Initial posterior variance for participants seeded from history.
    pub initial_variance: f64,
    /// Initial posterior variance for joiners arriving after rosters exist
    /// (doubled to reflect the lack of observations).
    pub joiner_variance: f64,
    /// Variance floor; posterior variances never drop below this.
    pub min_variance: f64,

    // --- Constraint monitoring ---
    /// β in the per-participant deficit bound `β·√t`.
    pub deficit_beta: f64,
    /// Rate variance above this raises a Variance violation.
    pub max_rate_variance: f64,
    /// Target upper bound for the Gini coefficient of selection rates.
    pub gini_target: f64,
    /// Target upper bound for the coefficient of variation of rates.
    pub cv_target: f64,
    /// Acceptable per-participant rate band as multiples of the pool mean.
    pub rate_band: (f64, f64),
    /// Capacity of the variance history used for convergence trending.
    pub history_capacity: usize,

    // --- Stochastic selection ---
    /// Number of recent selection sets considered by the diversity penalty.
    pub diversity_window: usize,
    /// Weight λ_div of the diversity penalty.
    pub diversity_weight: f64,
    /// Lower clamp for the adaptive softmax temperature.
    pub temperature_floor: f64,
    /// Upper clamp for the adaptive softmax temperature.
    pub temperature_ceiling: f64,

    // --- Generation limits ---
    /// Maximum number of weeks a single generation call may request.
    pub max_weeks: u32,
}

impl EngineConfig {
    /// Clamps a softmax temperature into the configured range.
    pub fn clamp_temperature(&self, t: f64) -> f64 {
        t.clamp(self.temperature_floor, self.temperature_ceiling)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            experience_min_days: 90,
            experience_min_assignments: 4,
            penalty_lambda: 0.1,
            tie_epsilon: 1e-6,
            process_noise: 0.005,
            observation_noise: 0.05,
            drift_threshold: 0.03,
            drift_rate: 0.2,
            initial_variance: 0.1,
            joiner_variance: 0.2,
            min_variance: 1e-9,
            deficit_beta: 2.0,
            max_rate_variance: 0.05,
            gini_target: 0.25,
            cv_target: 0.30,
            rate_band: (0.80, 1.20),
            history_capacity: 30,
            diversity_window: 5,
            diversity_weight: 0.1,
            temperature_floor: 0.1,
            temperature_ceiling: 5.0,
            max_weeks: 52,
        }
    }
}

/// Switches selecting between algorithm variants.
///
/// Flags default to the production configuration; hosts flip them to
/// compare variants against each other on the same snapshot and seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Apply the cubic penalty boost on top of the base rate-deficit priority.
    pub use_penalized_priority: bool,
    /// Maintain per-participant Kalman rate posteriors during generation.
    pub use_bayesian_updates: bool,
    /// Run the constraint monitor and feed corrective actions back into priorities.
    pub use_constraint_checking: bool,
    /// Sample teams from a temperature-scaled softmax instead of greedy top-k.
    pub use_softmax_selection: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            use_penalized_priority: true,
            use_bayesian_updates: true,
            use_constraint_checking: true,
            use_softmax_selection: false,
        }
    }
}
