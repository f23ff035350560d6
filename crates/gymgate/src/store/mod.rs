//! Member Store
//!
//! Persistence for member records and configuration entries. Business rules
//! live in the `membership` crate; the store only enforces identifier
//! uniqueness and runs each mutation as one atomic read-modify-write.

mod redb_store;

pub use redb_store::RedbStore;

use chrono::{NaiveDate, NaiveDateTime};
use membership::{ExtendBy, Member, MemberProfile, NewMember};

use crate::types::Result;

/// Storage interface consumed by the access controller and the CLI
pub trait MemberStore: Send + Sync {
    /// Look up a member by identifier
    fn get_member(&self, id: &str) -> Result<Option<Member>>;

    /// Register a member, applying date defaults relative to `today`
    ///
    /// Fails with `Error::DuplicateId` without touching the existing record.
    fn add_member(&self, new_member: NewMember, today: NaiveDate) -> Result<Member>;

    /// Replace the descriptive attributes of a member
    fn update_member(&self, id: &str, profile: MemberProfile) -> Result<Member>;

    /// Override the end date and lift any freeze
    fn set_expiry(&self, id: &str, date: NaiveDate) -> Result<Member>;

    /// Extend the membership by `period`, storing the result as an override
    fn extend_membership(&self, id: &str, today: NaiveDate, period: ExtendBy) -> Result<Member>;

    /// Freeze an active member or unfreeze a frozen one
    fn toggle_freeze(&self, id: &str, now: NaiveDateTime) -> Result<Member>;

    /// Delete a member; returns whether a record was removed
    fn delete_member(&self, id: &str) -> Result<bool>;

    /// All members ordered by identifier
    fn list_members(&self) -> Result<Vec<Member>>;

    /// Members whose name or identifier contains `query` (case-insensitive)
    fn search_members(&self, query: &str) -> Result<Vec<Member>>;

    /// Read a configuration value, falling back to `default`
    fn get_config(&self, key: &str, default: &str) -> Result<String>;

    /// Insert or replace a configuration value
    fn set_config(&self, key: &str, value: &str) -> Result<()>;
}
