//! Assignment counting across historical and in-flight rosters.

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::participant::Participant;
use crate::roster::Roster;
use crate::Id;

/// Per-participant assignment counts and first-eligible dates.
///
/// `historical` holds counts from rosters that existed when the ledger
/// was built; `accumulated` holds assignments made by the in-flight
/// generation batch. Their sum is the participant's total across all
/// not-yet-discarded rosters.
///
/// The first-eligible date is the earliest date at which the engine
/// exposed the participant to a selection round. It is set once and
/// never moved forward by absences; only a wholesale roster deletion
/// recomputes it. Until it is set, the participant has zero pool days
/// and therefore zero priority, which is what spares new joiners a
/// fictitious deficit.
#[derive(Debug, Clone, Default)]
pub struct AssignmentLedger {
    historical: HashMap<Id, u32>,
    accumulated: HashMap<Id, u32>,
    first_eligible: HashMap<Id, NaiveDate>,
}

impl AssignmentLedger {
    /// Builds a ledger from the existing rosters.
    ///
    /// Participants with at least one historical main selection get
    /// `first_eligible = max(arrival, earliest week they appear in)`.
    /// Everyone else stays unset until [`Self::mark_eligible`].
    pub fn initialize(participants: &[Participant], rosters: &[Roster]) -> Self {
        let mut historical: HashMap<Id, u32> = HashMap::new();
        let mut earliest_week: HashMap<Id, NaiveDate> = HashMap::new();

        for roster in rosters {
            for assignment in &roster.assignments {
                for id in &assignment.main {
                    *historical.entry(id.clone()).or_insert(0) += 1;
                    earliest_week
                        .entry(id.clone())
                        .and_modify(|w| *w = (*w).min(assignment.week_start))
                        .or_insert(assignment.week_start);
                }
            }
        }

        let mut first_eligible = HashMap::new();
        for participant in participants {
            if let Some(&week) = earliest_week.get(&participant.id) {
                first_eligible.insert(participant.id.clone(), week.max(participant.arrival_date));
            }
        }

        Self {
            historical,
            accumulated: HashMap::new(),
            first_eligible,
        }
    }

    /// Sets the first-eligible date if it is still unset.
    pub fn mark_eligible(&mut self, id: &str, date: NaiveDate) {
        self.first_eligible.entry(id.to_string()).or_insert(date);
    }

    /// Records one in-flight main assignment for each id.
    pub fn record_assignment(&mut self, ids: &[Id]) {
        for id in ids {
            *self.accumulated.entry(id.clone()).or_insert(0) += 1;
        }
    }

    /// Count of assignments in rosters that predate this ledger.
    pub fn historical_count(&self, id: &str) -> u32 {
        self.historical.get(id).copied().unwrap_or(0)
    }

    /// Historical plus in-flight assignment count.
    pub fn total_count(&self, id: &str) -> u32 {
        self.historical_count(id) + self.accumulated.get(id).copied().unwrap_or(0)
    }

    /// The participant's first-eligible date, if set.
    pub fn first_eligible(&self, id: &str) -> Option<NaiveDate> {
        self.first_eligible.get(id).copied()
    }

    /// Rebuilds counts and first-eligible dates from the remaining
    /// rosters after a deletion. In-flight counts are discarded.
    pub fn recompute_after_deletion(&mut self, participants: &[Participant], rosters: &[Roster]) {
        *self = Self::initialize(participants, rosters);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::WeekAssignment;
    use chrono::{TimeZone, Utc};

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn roster(assignments: Vec<(&str, Vec<&str>)>) -> Roster {
        let assignments: Vec<WeekAssignment> = assignments
            .into_iter()
            .map(|(week, main)| {
                let main: Vec<Id> = main.into_iter().map(Id::from).collect();
                let scores = vec![0.0; main.len()];
                WeekAssignment::new(d(week), main, Vec::new(), scores, false)
            })
            .collect();
        Roster {
            id: "r".into(),
            start_date: assignments[0].week_start,
            weeks: assignments.len() as u32,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            assignments,
        }
    }

    #[test]
    fn initialize_counts_main_slots_only() {
        let participants = vec![Participant::new("a", "A", d("2025-01-01"))];
        let mut r = roster(vec![("2025-01-06", vec!["a", "b"])]);
        r.assignments[0].substitutes = vec!["c".into()];

        let ledger = AssignmentLedger::initialize(&participants, &[r]);
        assert_eq!(ledger.historical_count("a"), 1);
        assert_eq!(ledger.historical_count("b"), 1);
        assert_eq!(ledger.historical_count("c"), 0);
    }

    #[test]
    fn first_eligible_from_history_respects_arrival() {
        // Appears in a week that predates their (re-)arrival record.
        let participants = vec![
            Participant::new("a", "A", d("2025-01-01")),
            Participant::new("b", "B", d("2025-02-01")),
        ];
        let r = roster(vec![
            ("2025-01-06", vec!["a", "b"]),
            ("2025-02-03", vec!["a", "b"]),
        ]);
        let ledger = AssignmentLedger::initialize(&participants, &[r]);
        assert_eq!(ledger.first_eligible("a"), Some(d("2025-01-06")));
        assert_eq!(ledger.first_eligible("b"), Some(d("2025-02-01")));
    }

    #[test]
    fn unselected_participant_stays_unset_until_marked() {
        let participants = vec![Participant::new("new", "N", d("2025-01-01"))];
        let r = roster(vec![("2025-01-06", vec!["a", "b"])]);
        let mut ledger = AssignmentLedger::initialize(&participants, &[r]);

        assert_eq!(ledger.first_eligible("new"), None);
        ledger.mark_eligible("new", d("2025-03-03"));
        assert_eq!(ledger.first_eligible("new"), Some(d("2025-03-03")));
        // Never moved forward once set.
        ledger.mark_eligible("new", d("2025-04-07"));
        assert_eq!(ledger.first_eligible("new"), Some(d("2025-03-03")));
    }

    #[test]
    fn totals_merge_historical_and_accumulated() {
        let participants = vec![Participant::new("a", "A", d("2025-01-01"))];
        let r = roster(vec![("2025-01-06", vec!["a", "b"])]);
        let mut ledger = AssignmentLedger::initialize(&participants, &[r]);

        ledger.record_assignment(&["a".into(), "c".into()]);
        assert_eq!(ledger.total_count("a"), 2);
        assert_eq!(ledger.total_count("b"), 1);
        assert_eq!(ledger.total_count("c"), 1);
    }

    #[test]
    fn recompute_after_deletion_resets_everything() {
        let participants = vec![Participant::new("a", "A", d("2025-01-01"))];
        let r1 = roster(vec![("2025-01-06", vec!["a"])]);
        let r2 = roster(vec![("2025-02-03", vec!["a"])]);
        let mut ledger = AssignmentLedger::initialize(&participants, &[r1, r2.clone()]);
        ledger.record_assignment(&["a".into()]);
        assert_eq!(ledger.total_count("a"), 3);

        ledger.recompute_after_deletion(&participants, &[r2]);
        assert_eq!(ledger.total_count("a"), 1);
        assert_eq!(ledger.first_eligible("a"), Some(d("2025-02-03")));
    }
}
