//! Roster records: weekly assignments grouped into generation batches.

use chrono::{DateTime, NaiveDate, Utc};

use crate::Id;

mod week;

pub use week::{monday_of, mondays_from};

/// One row of a roster: the team working a given ISO week.
///
/// # Invariants
///
/// - `week_start` is the Monday of its ISO week
/// - `main` and `substitutes` are disjoint
/// - `priority_scores` is parallel to `main`
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct WeekAssignment {
    pub week_start: NaiveDate,
    pub main: Vec<Id>,
    pub substitutes: Vec<Id>,
    pub priority_scores: Vec<f64>,
    pub has_mentor: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub comment: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub emergency: bool,
    #[cfg_attr(feature = "serde", serde(default))]
    pub emergency_reason: Option<String>,
}

impl WeekAssignment {
    /// Creates an assignment with no collaborator annotations.
    pub fn new(
        week_start: NaiveDate,
        main: Vec<Id>,
        substitutes: Vec<Id>,
        priority_scores: Vec<f64>,
        has_mentor: bool,
    ) -> Self {
        Self {
            week_start,
            main,
            substitutes,
            priority_scores,
            has_mentor,
            comment: None,
            emergency: false,
            emergency_reason: None,
        }
    }

    /// True iff `id` appears in `main` or `substitutes`.
    pub fn involves(&self, id: &str) -> bool {
        self.main.iter().any(|m| m == id) || self.substitutes.iter().any(|s| s == id)
    }
}

/// A contiguous batch of week assignments produced by one generation call.
///
/// Multiple rosters may coexist; the generator skips Mondays already
/// covered by existing rosters so batches never overlap in weeks.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Roster {
    pub id: Id,
    pub start_date: NaiveDate,
    pub weeks: u32,
    pub created_at: DateTime<Utc>,
    pub assignments: Vec<WeekAssignment>,
}

impl Roster {
    /// True iff this roster has an assignment for the given Monday.
    pub fn covers_week(&self, week_start: NaiveDate) -> bool {
        self.assignments.iter().any(|a| a.week_start == week_start)
    }

    /// Iterates over the Mondays this roster covers, in order.
    pub fn covered_weeks(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.assignments.iter().map(|a| a.week_start)
    }

    /// Counts main-slot selections of `id` across all assignments.
    pub fn main_count(&self, id: &str) -> u32 {
        self.assignments
            .iter()
            .map(|a| a.main.iter().filter(|m| m.as_str() == id).count() as u32)
            .sum()
    }
}
