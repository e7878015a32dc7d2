//! Edits to already-persisted rosters.

use std::collections::HashSet;

use chrono::NaiveDate;

use super::{Engine, Warning};
use crate::algorithms::fairness::{
    score_candidates, AssignmentLedger, CandidateInput, ScoredCandidate,
};
use crate::participant::{days_in_pool, Participant};
use crate::roster::Roster;
use crate::rng::Mulberry32;
use crate::Id;

/// Fixed seed for gap-fill scoring jitter: edits must be reproducible
/// from their arguments alone.
const FILL_GAP_SEED: u32 = 0;

impl Engine {
    /// Replaces `old_id` with `new_id` in the assignment for
    /// `week_start`, wherever it appears (main or substitutes).
    pub fn replace_in_week(
        &self,
        rosters: &[Roster],
        week_start: NaiveDate,
        old_id: &str,
        new_id: &str,
    ) -> Vec<Roster> {
        let mut rosters = rosters.to_vec();
        for roster in &mut rosters {
            for assignment in &mut roster.assignments {
                if assignment.week_start != week_start {
                    continue;
                }
                for slot in assignment
                    .main
                    .iter_mut()
                    .chain(assignment.substitutes.iter_mut())
                {
                    if slot == old_id {
                        *slot = new_id.to_string();
                    }
                }
            }
        }
        rosters
    }

    /// Swaps every occurrence of `id_a` and `id_b` across all rosters.
    pub fn swap_globally(&self, rosters: &[Roster], id_a: &str, id_b: &str) -> Vec<Roster> {
        let mut rosters = rosters.to_vec();
        for roster in &mut rosters {
            for assignment in &mut roster.assignments {
                for slot in assignment
                    .main
                    .iter_mut()
                    .chain(assignment.substitutes.iter_mut())
                {
                    if slot == id_a {
                        *slot = id_b.to_string();
                    } else if slot == id_b {
                        *slot = id_a.to_string();
                    }
                }
            }
        }
        rosters
    }

    /// Fills the holes a deleted participant leaves behind.
    ///
    /// Assignments are processed in chronological order so each
    /// replacement sees the counts produced by earlier ones. For every
    /// affected week the highest-priority active participant not
    /// already assigned that week stands in; when nobody is available
    /// the id is dropped (substitutes are not promoted). Idempotent:
    /// a second pass over the same id finds nothing to do.
    pub fn fill_gap(
        &self,
        rosters: &[Roster],
        deleted_id: &str,
        participants: &[Participant],
    ) -> (Vec<Roster>, Vec<Warning>) {
        let mut rosters = rosters.to_vec();
        let mut warnings = Vec::new();
        let mut rng = Mulberry32::new(FILL_GAP_SEED);

        let mut affected: Vec<(usize, usize, NaiveDate)> = rosters
            .iter()
            .enumerate()
            .flat_map(|(ri, roster)| {
                roster
                    .assignments
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| a.involves(deleted_id))
                    .map(move |(ai, a)| (ri, ai, a.week_start))
            })
            .collect();
        affected.sort_by_key(|&(_, _, week)| week);

        for (ri, ai, week) in affected {
            // Counts over the current state, including earlier fills.
            let ledger = AssignmentLedger::initialize(participants, &rosters);
            let assigned: HashSet<&str> = {
                let a = &rosters[ri].assignments[ai];
                a.main
                    .iter()
                    .chain(a.substitutes.iter())
                    .map(|id| id.as_str())
                    .collect::<HashSet<_>>()
            };
            let candidates: Vec<&Participant> = participants
                .iter()
                .filter(|p| {
                    p.id != deleted_id && p.is_active(week) && !assigned.contains(p.id.as_str())
                })
                .collect();

            let replacement = if candidates.is_empty() {
                None
            } else {
                let inputs: Vec<CandidateInput> = candidates
                    .iter()
                    .map(|p| CandidateInput {
                        id: p.id.clone(),
                        days_in_pool: days_in_pool(p, ledger.first_eligible(&p.id), week),
                        total_count: ledger.total_count(&p.id),
                    })
                    .collect();
                let scored = score_candidates(&inputs, &self.config, true, &mut rng);
                scored
                    .into_iter()
                    .min_by(|a, b| ScoredCandidate::cmp_by_priority(a, b))
            };

            let assignment = &mut rosters[ri].assignments[ai];
            match replacement {
                Some(best) => {
                    for (idx, slot) in assignment.main.iter_mut().enumerate() {
                        if slot == deleted_id {
                            *slot = best.id.clone();
                            if let Some(score) = assignment.priority_scores.get_mut(idx) {
                                *score = best.priority;
                            }
                        }
                    }
                    for slot in assignment.substitutes.iter_mut() {
                        if slot == deleted_id {
                            *slot = best.id.clone();
                        }
                    }
                }
                None => {
                    warnings.push(Warning::NoReplacementAvailable {
                        week,
                        id: Id::from(deleted_id),
                    });
                    let mut kept_main = Vec::with_capacity(assignment.main.len());
                    let mut kept_scores = Vec::with_capacity(assignment.priority_scores.len());
                    for (id, score) in assignment.main.iter().zip(&assignment.priority_scores) {
                        if id != deleted_id {
                            kept_main.push(id.clone());
                            kept_scores.push(*score);
                        }
                    }
                    assignment.main = kept_main;
                    assignment.priority_scores = kept_scores;
                    assignment.substitutes.retain(|id| id != deleted_id);
                }
            }
        }
        (rosters, warnings)
    }
}
