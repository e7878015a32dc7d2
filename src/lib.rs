//! fairrota - fairness-first generation of recurring team rosters
//!
//! A deterministic selection engine that decides which participants work
//! each week so that long-run selection *rates* converge across a pool
//! with frequent joins, leaves, and returns, without imposing a catch-up
//! burden on new joiners.

pub mod algorithms;
pub mod config;
pub mod constraints;
pub mod engine;
pub mod participant;
pub mod rng;
pub mod roster;

pub use config::{EngineConfig, FeatureFlags};
pub use engine::{Engine, GenerateOptions, GenerationOutcome};

/// Identifier type used for participants and rosters.
pub type Id = String;

/// Generates a new unique identifier (UUID v4).
pub fn generate_id() -> Id {
    uuid::Uuid::new_v4().to_string()
}
