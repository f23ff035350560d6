//! Membership lifecycle rules
//!
//! Pure functions over a member's end date and freeze state. Nothing here
//! reads the clock; the caller passes `today` or `now`.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::{ExtendBy, FreezeState, ValidationError};

/// Length of a membership when registration gives no explicit expiry
pub const DEFAULT_MEMBERSHIP_DAYS: u64 = 30;

/// Result of checking a membership at the door
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AccessStatus {
    Frozen,
    Active {
        /// Whole days between today and the end date (0 on the last day)
        days_remaining: i64,
    },
    Expired,
}

impl AccessStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessStatus::Active { .. })
    }

    /// Days left as shown to members, counting the end date itself
    pub fn display_days(&self) -> Option<i64> {
        match self {
            AccessStatus::Active { days_remaining } => Some(days_remaining + 1),
            _ => None,
        }
    }
}

/// Expiry for a registration without an explicit end date
pub fn default_expiry(registration_date: NaiveDate) -> Result<NaiveDate, ValidationError> {
    registration_date
        .checked_add_days(Days::new(DEFAULT_MEMBERSHIP_DAYS))
        .ok_or(ValidationError::DateOutOfRange)
}

/// Classify a membership on `today`
///
/// A freeze always wins. Otherwise the membership is active through its end
/// date inclusive.
pub fn classify_access(today: NaiveDate, end_date: NaiveDate, freeze: &FreezeState) -> AccessStatus {
    if freeze.is_frozen() {
        return AccessStatus::Frozen;
    }
    if end_date >= today {
        AccessStatus::Active {
            days_remaining: (end_date - today).num_days(),
        }
    } else {
        AccessStatus::Expired
    }
}

/// Start a freeze on `today`
pub fn freeze(today: NaiveDate) -> FreezeState {
    FreezeState::Frozen { since: today }
}

/// End a freeze, crediting the frozen time back onto the end date
///
/// Elapsed time runs from midnight of `frozen_since` to `now`, sub-day part
/// included, and the shifted end date is truncated back to a calendar date.
/// A clock that went backwards credits nothing.
pub fn unfreeze(
    now: NaiveDateTime,
    frozen_since: NaiveDate,
    end_date: NaiveDate,
) -> Result<NaiveDate, ValidationError> {
    let elapsed = (now - frozen_since.and_time(NaiveTime::MIN)).max(TimeDelta::zero());
    end_date
        .and_time(NaiveTime::MIN)
        .checked_add_signed(elapsed)
        .map(|shifted| shifted.date())
        .ok_or(ValidationError::DateOutOfRange)
}

/// Flip the freeze state, returning the new end date and state
pub fn toggle_freeze(
    now: NaiveDateTime,
    end_date: NaiveDate,
    state: &FreezeState,
) -> Result<(NaiveDate, FreezeState), ValidationError> {
    match state {
        FreezeState::Frozen { since } => Ok((unfreeze(now, *since, end_date)?, FreezeState::Active)),
        FreezeState::Active => Ok((end_date, freeze(now.date()))),
    }
}

/// New end date after buying `period`
///
/// An expired membership restarts from today so the lapsed days are not
/// paid for twice.
pub fn extend(today: NaiveDate, end_date: NaiveDate, period: ExtendBy) -> Result<NaiveDate, ValidationError> {
    period
        .add_to(end_date.max(today))
        .ok_or(ValidationError::DateOutOfRange)
}

/// Manual override of the end date; always lifts a freeze
pub fn set_manual_expiry(new_date: NaiveDate) -> (NaiveDate, FreezeState) {
    (new_date, FreezeState::Active)
}
