use thiserror::Error;

use chrono::NaiveDate;

/// Hard failures of a generation request.
///
/// These abort generation with no partial roster. Everything softer is
/// a [`super::Warning`] returned alongside the result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GenerateError {
    #[error("start date {0:?} is not a valid YYYY-MM-DD date")]
    InvalidStartDate(String),

    #[error("weeks must be between 1 and {max}, got {requested}")]
    WeeksOutOfRange { requested: u32, max: u32 },

    #[error("no participants are active on {0}")]
    NoActiveParticipants(NaiveDate),

    #[error("all requested weeks are already covered by existing rosters")]
    AllWeeksCovered,

    #[error("numeric state degenerated to non-finite values")]
    InternalNonFinite,
}
