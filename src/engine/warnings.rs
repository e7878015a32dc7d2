use std::fmt;

use chrono::NaiveDate;

use crate::Id;

/// Soft degradations of a generation or edit request.
///
/// Warnings never abort a run; they accumulate in a per-call vector and
/// are returned with the roster so the caller can accept the result or
/// regenerate with different options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A requested Monday already appears in an existing roster.
    WeekAlreadyCovered(NaiveDate),
    /// Fewer candidates than team slots after the no-consecutive
    /// exclusion; the rule was relaxed for this week.
    InsufficientCandidates { week: NaiveDate, available: usize },
    /// No experienced participant could be placed on the main team.
    NoMentorAvailable(NaiveDate),
    /// Nobody was active this week; the week was skipped.
    NoEligibleParticipants(NaiveDate),
    /// A participant reached the rate tracker without prior state and
    /// was auto-initialized at the pool-average rate.
    UnseededParticipant { id: Id, week: NaiveDate },
    /// Gap filling found nobody to stand in for a deleted participant.
    NoReplacementAvailable { week: NaiveDate, id: Id },
    /// The constraint monitor reported violations at postflight.
    ConstraintViolations { count: usize },
    /// Non-finite priorities or probabilities were clamped during the run.
    NonFiniteValues { count: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::WeekAlreadyCovered(week) => {
                write!(f, "week {week} is already covered by an existing roster")
            }
            Warning::InsufficientCandidates { week, available } => write!(
                f,
                "week {week}: only {available} candidates after exclusion, no-consecutive rule relaxed"
            ),
            Warning::NoMentorAvailable(week) => {
                write!(f, "week {week}: no mentor available")
            }
            Warning::NoEligibleParticipants(week) => {
                write!(f, "week {week}: no eligible participants, week skipped")
            }
            Warning::UnseededParticipant { id, week } => write!(
                f,
                "week {week}: participant {id} auto-initialized at pool-average rate"
            ),
            Warning::NoReplacementAvailable { week, id } => {
                write!(f, "week {week}: no replacement available for {id}")
            }
            Warning::ConstraintViolations { count } => {
                write!(f, "{count} fairness constraint violation(s) detected")
            }
            Warning::NonFiniteValues { count } => {
                write!(f, "{count} non-finite value(s) clamped during generation")
            }
        }
    }
}
