//! Access Controller
//!
//! Turns a member identifier into an access decision. Lookups go through the
//! member store and the decision comes from the membership rules; a check
//! never mutates anything.

use std::fmt;
use std::sync::Arc;

use chrono::{Local, NaiveDate};
use membership::{AccessStatus, format_date};
use serde::Serialize;

use crate::store::MemberStore;
use crate::types::Result;

/// Outcome of an access check
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AccessOutcome {
    NotFound {
        id: String,
    },
    Member {
        id: String,
        name: String,
        end_date: NaiveDate,
        status: AccessStatus,
    },
}

impl AccessOutcome {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessOutcome::Member { status, .. } if status.is_granted())
    }
}

impl fmt::Display for AccessOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessOutcome::NotFound { .. } => write!(f, "MEMBER NOT FOUND"),
            AccessOutcome::Member { name, end_date, status, .. } => match status {
                AccessStatus::Frozen => write!(f, "MEMBERSHIP FROZEN\nMember: {}", name),
                AccessStatus::Active { .. } => write!(
                    f,
                    "ACCESS GRANTED\nWelcome, {}\nExpires in {} days ({})",
                    name,
                    status.display_days().unwrap_or_default(),
                    format_date(*end_date)
                ),
                AccessStatus::Expired => write!(
                    f,
                    "MEMBERSHIP EXPIRED\nMember: {}\nExpired on {}",
                    name,
                    format_date(*end_date)
                ),
            },
        }
    }
}

/// Access decisions backed by a member store
#[derive(Clone)]
pub struct AccessController {
    store: Arc<dyn MemberStore>,
}

impl AccessController {
    pub fn new(store: Arc<dyn MemberStore>) -> Self {
        Self { store }
    }

    /// Check access for `id` as of the local current date
    pub fn check_access(&self, id: &str) -> Result<AccessOutcome> {
        self.check_access_on(id, Local::now().date_naive())
    }

    /// Check access for `id` as of `today`
    pub fn check_access_on(&self, id: &str, today: NaiveDate) -> Result<AccessOutcome> {
        let id = id.trim();
        let member = if id.is_empty() {
            None
        } else {
            self.store.get_member(id)?
        };

        let Some(member) = member else {
            tracing::warn!("Access DENIED (NotFound) for ID: {}", id);
            return Ok(AccessOutcome::NotFound { id: id.to_string() });
        };

        let status = member.access_status(today);
        match status {
            AccessStatus::Active { .. } => {
                tracing::info!("Access GRANTED for user: {} ({})", member.id, member.name())
            }
            AccessStatus::Frozen => {
                tracing::info!("Access DENIED (Frozen) for user: {} ({})", member.id, member.name())
            }
            AccessStatus::Expired => {
                tracing::warn!("Access DENIED (Expired) for user: {} ({})", member.id, member.name())
            }
        }

        Ok(AccessOutcome::Member {
            end_date: member.membership_end_date,
            status,
            name: member.profile.name,
            id: member.id,
        })
    }
}
