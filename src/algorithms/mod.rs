//! Fairness scoring and stochastic selection.
//!
//! [`fairness`] turns membership history and assignment counts into
//! per-participant selection priorities; [`selection`] turns priorities
//! into teams. Both are pure over their inputs plus a
//! [`crate::rng::RandomSource`].

pub mod fairness;
pub mod selection;

pub use fairness::{AssignmentLedger, RateTracker, ScoredCandidate};
pub use selection::SelectionStrategy;
