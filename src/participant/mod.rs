//! Participant records and membership timeline.
//!
//! A participant's presence in the pool is an ordered sequence of
//! half-open program periods `[start, end)`; `end == None` means the
//! period is still open. The resolver functions in [`membership`]
//! answer the per-date questions the engine needs: active, days
//! present, days in pool, experienced.

use chrono::NaiveDate;
use thiserror::Error;

use crate::Id;

mod membership;

pub use membership::{days_in_pool, is_experienced};

/// A half-open membership interval `[start, end)`.
///
/// # Invariants
///
/// - `start <= end` when `end` is present
/// - at most one period per participant has `end == None`
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ProgramPeriod {
    pub start: NaiveDate,
    pub end: Option<NaiveDate>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub departure_reason: Option<String>,
}

impl ProgramPeriod {
    /// Creates an open-ended period starting at `start`.
    pub fn open(start: NaiveDate) -> Self {
        Self {
            start,
            end: None,
            departure_reason: None,
        }
    }

    /// Creates a closed period `[start, end)`.
    pub fn closed(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start,
            end: Some(end),
            departure_reason: None,
        }
    }

    /// Returns true if `date` falls inside `[start, end)`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && self.end.map_or(true, |end| date < end)
    }

    /// Returns true if this period has no end date yet.
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }
}

/// A member of the selection pool.
///
/// Records are created and mutated by the collaborator layer; the
/// engine reads them as immutable snapshots. `name` is round-tripped
/// but never used in computation.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Participant {
    pub id: Id,
    pub name: String,
    pub arrival_date: NaiveDate,
    pub program_periods: Vec<ProgramPeriod>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub mentorship_assignments: Vec<Id>,
}

/// Violations of the participant record invariants.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParticipantError {
    #[error("participant {0} has no program periods")]
    NoPeriods(Id),

    #[error("participant {0} has more than one open period")]
    MultipleOpenPeriods(Id),

    #[error("participant {0} has periods out of order or overlapping")]
    PeriodsNotSorted(Id),

    #[error("participant {0} has a period ending before it starts")]
    InvertedPeriod(Id),
}

impl Participant {
    /// Creates a participant with a single open period starting at `arrival_date`.
    pub fn new(id: impl Into<Id>, name: impl Into<String>, arrival_date: NaiveDate) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arrival_date,
            program_periods: vec![ProgramPeriod::open(arrival_date)],
            mentorship_assignments: Vec::new(),
        }
    }

    /// True iff some program period contains `date`.
    pub fn is_active(&self, date: NaiveDate) -> bool {
        self.program_periods.iter().any(|p| p.contains(date))
    }

    /// Total days of presence strictly before `date`, summed over all
    /// periods and clamped at zero.
    ///
    /// Returns 0 for dates before the first period.
    pub fn days_present(&self, date: NaiveDate) -> i64 {
        self.program_periods
            .iter()
            .filter(|p| p.start <= date)
            .map(|p| {
                let end = p.end.map_or(date, |e| e.min(date));
                (end - p.start).num_days().max(0)
            })
            .sum()
    }

    /// Checks the record invariants: periods non-empty, strictly
    /// increasing in start, non-overlapping, at most one open, and
    /// `start <= end` where both present.
    pub fn validate(&self) -> Result<(), ParticipantError> {
        if self.program_periods.is_empty() {
            return Err(ParticipantError::NoPeriods(self.id.clone()));
        }
        let open_count = self.program_periods.iter().filter(|p| p.is_open()).count();
        if open_count > 1 {
            return Err(ParticipantError::MultipleOpenPeriods(self.id.clone()));
        }
        for p in &self.program_periods {
            if let Some(end) = p.end {
                if end < p.start {
                    return Err(ParticipantError::InvertedPeriod(self.id.clone()));
                }
            }
        }
        for pair in self.program_periods.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            // An open period anywhere but last overlaps its successor.
            let a_end = match a.end {
                Some(end) => end,
                None => return Err(ParticipantError::PeriodsNotSorted(self.id.clone())),
            };
            if b.start < a_end || b.start <= a.start {
                return Err(ParticipantError::PeriodsNotSorted(self.id.clone()));
            }
        }
        Ok(())
    }

    /// Closes the currently open period at `end`, if one exists.
    pub fn close_period(&mut self, end: NaiveDate, reason: Option<String>) {
        if let Some(p) = self.program_periods.iter_mut().find(|p| p.is_open()) {
            p.end = Some(end);
            p.departure_reason = reason;
        }
    }

    /// Appends a new open period starting at `start` (a return to the pool).
    pub fn reopen(&mut self, start: NaiveDate) {
        self.program_periods.push(ProgramPeriod::open(start));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    // ── ProgramPeriod ─────────────────────────────────────────────────

    #[test]
    fn period_contains_is_half_open() {
        let p = ProgramPeriod::closed(d("2025-01-01"), d("2025-02-01"));
        assert!(p.contains(d("2025-01-01")));
        assert!(p.contains(d("2025-01-31")));
        assert!(!p.contains(d("2025-02-01")));
        assert!(!p.contains(d("2024-12-31")));
    }

    #[test]
    fn open_period_contains_any_later_date() {
        let p = ProgramPeriod::open(d("2025-01-01"));
        assert!(p.contains(d("2030-06-15")));
        assert!(!p.contains(d("2024-12-31")));
    }

    // ── is_active / days_present ──────────────────────────────────────

    #[test]
    fn active_only_inside_some_period() {
        let mut p = Participant::new("p1", "Pat", d("2025-01-01"));
        p.close_period(d("2025-03-01"), None);
        p.reopen(d("2025-06-01"));

        assert!(p.is_active(d("2025-02-15")));
        assert!(!p.is_active(d("2025-04-15")));
        assert!(p.is_active(d("2025-07-01")));
    }

    #[test]
    fn days_present_sums_over_periods() {
        let mut p = Participant::new("p1", "Pat", d("2025-01-01"));
        p.close_period(d("2025-01-31"), None); // 30 days
        p.reopen(d("2025-03-01"));

        assert_eq!(p.days_present(d("2025-03-11")), 40); // 30 + 10
    }

    #[test]
    fn days_present_zero_before_first_period() {
        let p = Participant::new("p1", "Pat", d("2025-01-01"));
        assert_eq!(p.days_present(d("2024-06-01")), 0);
        assert_eq!(p.days_present(d("2025-01-01")), 0);
    }

    #[test]
    fn days_present_caps_at_evaluation_date() {
        let p = Participant::new("p1", "Pat", d("2025-01-01"));
        assert_eq!(p.days_present(d("2025-01-11")), 10);
    }

    // ── validate ──────────────────────────────────────────────────────

    #[test]
    fn validate_accepts_well_formed_record() {
        let mut p = Participant::new("p1", "Pat", d("2025-01-01"));
        p.close_period(d("2025-02-01"), Some("sabbatical".into()));
        p.reopen(d("2025-04-01"));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_periods() {
        let mut p = Participant::new("p1", "Pat", d("2025-01-01"));
        p.program_periods.clear();
        assert_eq!(p.validate(), Err(ParticipantError::NoPeriods("p1".into())));
    }

    #[test]
    fn validate_rejects_two_open_periods() {
        let mut p = Participant::new("p1", "Pat", d("2025-01-01"));
        p.program_periods.push(ProgramPeriod::open(d("2025-05-01")));
        assert_eq!(
            p.validate(),
            Err(ParticipantError::MultipleOpenPeriods("p1".into()))
        );
    }

    #[test]
    fn validate_rejects_overlapping_periods() {
        let mut p = Participant::new("p1", "Pat", d("2025-01-01"));
        p.close_period(d("2025-03-01"), None);
        p.program_periods.push(ProgramPeriod::closed(d("2025-02-01"), d("2025-04-01")));
        assert_eq!(
            p.validate(),
            Err(ParticipantError::PeriodsNotSorted("p1".into()))
        );
    }

    #[test]
    fn validate_rejects_inverted_period() {
        let mut p = Participant::new("p1", "Pat", d("2025-01-01"));
        p.program_periods[0].end = Some(d("2024-12-01"));
        assert_eq!(
            p.validate(),
            Err(ParticipantError::InvertedPeriod("p1".into()))
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn participant_round_trips_through_json() {
        let mut p = Participant::new("p1", "Pat", d("2025-01-01"));
        p.close_period(d("2025-02-01"), Some("left".into()));
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("programPeriods"));
        assert!(json.contains("2025-01-01"));
        let back: Participant = serde_json::from_str(&json).unwrap();
        assert_eq!(back, p);
    }
}
