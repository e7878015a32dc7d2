//! Fairness state and priority scoring.
//!
//! Three cooperating pieces:
//!
//! 1. [`AssignmentLedger`] merges historical roster assignments with
//!    the in-flight batch and owns first-eligible dates.
//! 2. [`RateTracker`] maintains a scalar Kalman posterior of each
//!    participant's latent selection rate with drift correction.
//! 3. [`score_candidates`] maps rate deficits to selection priorities.
//!
//! Convergence is on selection *rate* (selections per week in pool),
//! never on cumulative count: a newcomer with one selection over one
//! week is already at parity with a veteran at the same rate, so no
//! catch-up pressure ever builds up.

mod accumulator;
mod priority;
mod tracker;

pub use accumulator::AssignmentLedger;
pub use priority::{score_candidates, CandidateInput, ScoredCandidate};
pub use tracker::{ConfidenceInterval, RateEstimate, RateTracker};
