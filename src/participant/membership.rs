//! Per-date membership resolution.

use chrono::NaiveDate;

use super::Participant;
use crate::config::EngineConfig;

/// Days a participant has spent in the selection pool as of `date`.
///
/// Counted from `first_eligible` (the date the engine first exposed
/// the participant to a selection round) to `date`, reduced by any
/// absence inside that window. A leave-and-return therefore shrinks
/// the pool day count instead of inflating the participant's rate.
///
/// Returns 0 when `first_eligible` is unset or in the future.
pub fn days_in_pool(
    participant: &Participant,
    first_eligible: Option<NaiveDate>,
    date: NaiveDate,
) -> i64 {
    let Some(eligible) = first_eligible else {
        return 0;
    };
    if eligible > date {
        return 0;
    }
    let present = participant.days_present(date) - participant.days_present(eligible);
    present.max(0)
}

/// True iff the participant counts as experienced on `date`.
///
/// Experience is earned either by presence (total days present ≥ the
/// configured threshold) or by service (historical main selections ≥
/// the configured threshold). Mentorship assignments are not traversed.
pub fn is_experienced(
    participant: &Participant,
    date: NaiveDate,
    historical_count: u32,
    config: &EngineConfig,
) -> bool {
    participant.days_present(date) >= config.experience_min_days
        || historical_count >= config.experience_min_assignments
}
