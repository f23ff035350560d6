//! Member records

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::engine::{self, AccessStatus};
use crate::{ExtendBy, ValidationError};

/// Freeze state of a membership
///
/// A frozen membership always carries the date the freeze began, which is
/// needed to credit the frozen time back on unfreeze.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FreezeState {
    #[default]
    Active,
    Frozen {
        since: NaiveDate,
    },
}

impl FreezeState {
    pub fn is_frozen(&self) -> bool {
        matches!(self, FreezeState::Frozen { .. })
    }

    /// Date the freeze began, if frozen
    pub fn frozen_date(&self) -> Option<NaiveDate> {
        match self {
            FreezeState::Active => None,
            FreezeState::Frozen { since } => Some(*since),
        }
    }
}

/// Mutable descriptive attributes of a member
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberProfile {
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
}

impl MemberProfile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_age(mut self, age: u32) -> Self {
        self.age = Some(age);
        self
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = phone.into();
        self
    }

    /// Trim text fields and reject a blank name
    pub fn validate(mut self) -> Result<Self, ValidationError> {
        self.name = self.name.trim().to_string();
        self.address = self.address.trim().to_string();
        self.phone = self.phone.trim().to_string();
        if self.name.is_empty() {
            return Err(ValidationError::MissingField("name"));
        }
        Ok(self)
    }
}

/// A registration request
///
/// Missing dates are filled in by [`NewMember::into_member`]: registration
/// defaults to today and expiry to registration plus the default period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMember {
    pub id: String,
    pub profile: MemberProfile,
    pub registration_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
}

impl NewMember {
    pub fn new(id: impl Into<String>, profile: MemberProfile) -> Self {
        Self {
            id: id.into(),
            profile,
            registration_date: None,
            expiry_date: None,
        }
    }

    pub fn registered_on(mut self, date: NaiveDate) -> Self {
        self.registration_date = Some(date);
        self
    }

    pub fn expiring_on(mut self, date: NaiveDate) -> Self {
        self.expiry_date = Some(date);
        self
    }

    /// Validate and build the stored record
    pub fn into_member(self, today: NaiveDate) -> Result<Member, ValidationError> {
        let id = self.id.trim().to_string();
        if id.is_empty() {
            return Err(ValidationError::MissingField("id"));
        }
        let profile = self.profile.validate()?;

        let registration_date = self.registration_date.unwrap_or(today);
        let membership_end_date = match self.expiry_date {
            Some(date) => date,
            None => engine::default_expiry(registration_date)?,
        };

        Ok(Member {
            id,
            profile,
            registration_date,
            membership_end_date,
            freeze: FreezeState::Active,
        })
    }
}

/// A persisted member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    #[serde(flatten)]
    pub profile: MemberProfile,
    pub registration_date: NaiveDate,
    pub membership_end_date: NaiveDate,
    #[serde(default)]
    pub freeze: FreezeState,
}

impl Member {
    pub fn name(&self) -> &str {
        &self.profile.name
    }

    pub fn is_frozen(&self) -> bool {
        self.freeze.is_frozen()
    }

    pub fn frozen_date(&self) -> Option<NaiveDate> {
        self.freeze.frozen_date()
    }

    /// Classify this member for an access attempt on `today`
    pub fn access_status(&self, today: NaiveDate) -> AccessStatus {
        engine::classify_access(today, self.membership_end_date, &self.freeze)
    }

    /// Freeze an active membership or unfreeze a frozen one
    pub fn toggle_freeze(&mut self, now: NaiveDateTime) -> Result<(), ValidationError> {
        let (end_date, freeze) = engine::toggle_freeze(now, self.membership_end_date, &self.freeze)?;
        self.membership_end_date = end_date;
        self.freeze = freeze;
        Ok(())
    }

    /// Extend the membership by `period`
    ///
    /// Returns the new end date. The freeze state is left untouched; callers
    /// that persist through a manual override clear it there.
    pub fn extended_end_date(&self, today: NaiveDate, period: ExtendBy) -> Result<NaiveDate, ValidationError> {
        engine::extend(today, self.membership_end_date, period)
    }

    /// Override the end date, which also lifts any freeze
    pub fn set_expiry(&mut self, date: NaiveDate) {
        let (end_date, freeze) = engine::set_manual_expiry(date);
        self.membership_end_date = end_date;
        self.freeze = freeze;
    }
}
