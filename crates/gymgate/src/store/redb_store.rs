// Member store backed by an embedded redb database
//
// Members are stored as JSON under their identifier; config entries are plain
// string pairs. Every mutation runs inside a single write transaction, and
// redb allows one writer at a time, so read-modify-write cycles never
// interleave.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use membership::{ExtendBy, Member, MemberProfile, NewMember};
use redb::{Database, ReadableTable, TableDefinition};

use super::MemberStore;
use crate::types::{Error, Result};

// Table definition: key is the member id, value is the serialized record
const MEMBERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("members");

const CONFIG_TABLE: TableDefinition<&str, &str> = TableDefinition::new("config");

fn db_err(e: impl std::fmt::Display) -> Error {
    Error::Database(e.to_string())
}

/// redb-backed [`MemberStore`]
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open or create the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db = Database::create(path)
            .map_err(|e| Error::Database(format!("Failed to open database: {}", e)))?;

        // Ensure tables exist so read transactions never miss them
        let write_txn = db.begin_write().map_err(db_err)?;
        write_txn.open_table(MEMBERS_TABLE).map_err(db_err)?;
        write_txn.open_table(CONFIG_TABLE).map_err(db_err)?;
        write_txn.commit().map_err(db_err)?;

        tracing::info!("Member store opened at {}", path.display());

        Ok(Self { db })
    }

    /// Apply `change` to one member inside a single write transaction
    fn modify<F>(&self, id: &str, change: F) -> Result<Member>
    where
        F: FnOnce(&mut Member) -> Result<()>,
    {
        let id = id.trim();
        let write_txn = self.db.begin_write().map_err(db_err)?;
        let member = {
            let mut table = write_txn.open_table(MEMBERS_TABLE).map_err(db_err)?;
            let mut member: Member = match table.get(id).map_err(db_err)? {
                Some(value) => serde_json::from_slice(value.value())?,
                None => return Err(Error::NotFound(id.to_string())),
            };

            change(&mut member)?;

            let bytes = serde_json::to_vec(&member)?;
            table.insert(id, bytes.as_slice()).map_err(db_err)?;
            member
        };
        write_txn.commit().map_err(db_err)?;

        Ok(member)
    }

    fn scan<P>(&self, mut keep: P) -> Result<Vec<Member>>
    where
        P: FnMut(&Member) -> bool,
    {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(MEMBERS_TABLE).map_err(db_err)?;

        let mut members = Vec::new();
        for result in table.iter().map_err(db_err)? {
            let (_, value) = result.map_err(db_err)?;
            let member: Member = serde_json::from_slice(value.value())?;
            if keep(&member) {
                members.push(member);
            }
        }

        Ok(members)
    }
}

impl MemberStore for RedbStore {
    fn get_member(&self, id: &str) -> Result<Option<Member>> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(MEMBERS_TABLE).map_err(db_err)?;

        let member = match table.get(id.trim()).map_err(db_err)? {
            Some(value) => Some(serde_json::from_slice(value.value())?),
            None => None,
        };
        Ok(member)
    }

    fn add_member(&self, new_member: NewMember, today: NaiveDate) -> Result<Member> {
        let member = new_member.into_member(today)?;

        let write_txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = write_txn.open_table(MEMBERS_TABLE).map_err(db_err)?;
            if table.get(member.id.as_str()).map_err(db_err)?.is_some() {
                tracing::warn!("Failed to add member, ID exists: {}", member.id);
                return Err(Error::DuplicateId(member.id));
            }

            let bytes = serde_json::to_vec(&member)?;
            table.insert(member.id.as_str(), bytes.as_slice()).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;

        tracing::info!("New member registered: {} (ID: {})", member.name(), member.id);
        Ok(member)
    }

    fn update_member(&self, id: &str, profile: MemberProfile) -> Result<Member> {
        let profile = profile.validate()?;
        let member = self.modify(id, |member| {
            member.profile = profile;
            Ok(())
        })?;
        tracing::info!("Member {} updated", id);
        Ok(member)
    }

    fn set_expiry(&self, id: &str, date: NaiveDate) -> Result<Member> {
        let member = self.modify(id, |member| {
            member.set_expiry(date);
            Ok(())
        })?;
        tracing::info!("Member {} expiry set to {}", id, date);
        Ok(member)
    }

    fn extend_membership(&self, id: &str, today: NaiveDate, period: ExtendBy) -> Result<Member> {
        let member = self.modify(id, |member| {
            let end_date = member.extended_end_date(today, period)?;
            member.set_expiry(end_date);
            Ok(())
        })?;
        tracing::info!(
            "Member {} extended by {} until {}",
            id,
            period,
            member.membership_end_date
        );
        Ok(member)
    }

    fn toggle_freeze(&self, id: &str, now: NaiveDateTime) -> Result<Member> {
        let member = self.modify(id, |member| {
            member.toggle_freeze(now)?;
            Ok(())
        })?;
        if member.is_frozen() {
            tracing::info!("Member {} frozen", id);
        } else {
            tracing::info!(
                "Member {} unfrozen, membership now ends {}",
                id,
                member.membership_end_date
            );
        }
        Ok(member)
    }

    fn delete_member(&self, id: &str) -> Result<bool> {
        let write_txn = self.db.begin_write().map_err(db_err)?;
        let removed = {
            let mut table = write_txn.open_table(MEMBERS_TABLE).map_err(db_err)?;
            table.remove(id.trim()).map_err(db_err)?.is_some()
        };
        write_txn.commit().map_err(db_err)?;

        if removed {
            tracing::info!("Member {} deleted", id);
        }
        Ok(removed)
    }

    fn list_members(&self) -> Result<Vec<Member>> {
        self.scan(|_| true)
    }

    fn search_members(&self, query: &str) -> Result<Vec<Member>> {
        let needle = query.trim().to_lowercase();
        self.scan(|member| {
            member.id.to_lowercase().contains(&needle)
                || member.name().to_lowercase().contains(&needle)
        })
    }

    fn get_config(&self, key: &str, default: &str) -> Result<String> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(CONFIG_TABLE).map_err(db_err)?;

        let value = table
            .get(key)
            .map_err(db_err)?
            .map(|value| value.value().to_string());
        Ok(value.unwrap_or_else(|| default.to_string()))
    }

    fn set_config(&self, key: &str, value: &str) -> Result<()> {
        let write_txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = write_txn.open_table(CONFIG_TABLE).map_err(db_err)?;
            table.insert(key, value).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use membership::FreezeState;
    use tempfile::{TempDir, tempdir};

    fn open_store() -> (TempDir, RedbStore) {
        let dir = tempdir().unwrap();
        let store = RedbStore::open(dir.path().join("gym.redb")).unwrap();
        (dir, store)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn register(store: &RedbStore, id: &str, name: &str) -> Member {
        store
            .add_member(NewMember::new(id, MemberProfile::new(name)), date(2024, 3, 1))
            .unwrap()
    }

    #[test]
    fn test_add_get_member() {
        let (_dir, store) = open_store();
        let profile = MemberProfile::new("Test User")
            .with_age(25)
            .with_address("123 St")
            .with_phone("555-0101");
        store
            .add_member(NewMember::new("101", profile), date(2024, 3, 1))
            .unwrap();

        let member = store.get_member("101").unwrap().unwrap();
        assert_eq!(member.id, "101");
        assert_eq!(member.name(), "Test User");
        assert_eq!(member.profile.age, Some(25));
        assert_eq!(member.registration_date, date(2024, 3, 1));
        assert_eq!(member.membership_end_date, date(2024, 3, 31));
        assert!(!member.is_frozen());

        assert!(store.get_member("999").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let (_dir, store) = open_store();
        let original = register(&store, "101", "Original");

        let result = store.add_member(
            NewMember::new("101", MemberProfile::new("Copycat")).expiring_on(date(2030, 1, 1)),
            date(2024, 3, 1),
        );
        assert!(matches!(result, Err(Error::DuplicateId(id)) if id == "101"));
        assert_eq!(store.get_member("101").unwrap().unwrap(), original);
    }

    #[test]
    fn test_invalid_registration_is_rejected() {
        let (_dir, store) = open_store();
        let result = store.add_member(NewMember::new("", MemberProfile::new("No Id")), date(2024, 3, 1));
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(store.list_members().unwrap().is_empty());
    }

    #[test]
    fn test_update_member() {
        let (_dir, store) = open_store();
        let before = register(&store, "102", "Before");

        let after = store
            .update_member("102", MemberProfile::new("After").with_phone("555-0202"))
            .unwrap();
        assert_eq!(after.name(), "After");
        assert_eq!(after.profile.phone, "555-0202");
        assert_eq!(after.membership_end_date, before.membership_end_date);

        let missing = store.update_member("nope", MemberProfile::new("Ghost"));
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_set_expiry() {
        let (_dir, store) = open_store();
        register(&store, "301", "Expiry Test");

        store.set_expiry("301", date(2024, 2, 28)).unwrap();
        let member = store.get_member("301").unwrap().unwrap();
        assert_eq!(member.membership_end_date, date(2024, 2, 28));
    }

    #[test]
    fn test_freeze_and_unfreeze() {
        let (_dir, store) = open_store();
        register(&store, "401", "Freeze Test");

        let frozen = store
            .toggle_freeze("401", date(2024, 3, 5).and_hms_opt(10, 0, 0).unwrap())
            .unwrap();
        assert_eq!(frozen.freeze, FreezeState::Frozen { since: date(2024, 3, 5) });

        let stored = store.get_member("401").unwrap().unwrap();
        assert!(stored.is_frozen());
        assert_eq!(stored.frozen_date(), Some(date(2024, 3, 5)));

        let thawed = store
            .toggle_freeze("401", date(2024, 3, 15).and_hms_opt(16, 0, 0).unwrap())
            .unwrap();
        assert!(!thawed.is_frozen());
        assert_eq!(thawed.frozen_date(), None);
        assert_eq!(thawed.membership_end_date, date(2024, 4, 10));
    }

    #[test]
    fn test_set_expiry_unfreezes() {
        let (_dir, store) = open_store();
        register(&store, "402", "Frozen Override");
        store
            .toggle_freeze("402", date(2024, 3, 5).and_hms_opt(10, 0, 0).unwrap())
            .unwrap();

        let member = store.set_expiry("402", date(2024, 12, 31)).unwrap();
        assert!(!member.is_frozen());
        assert_eq!(member.membership_end_date, date(2024, 12, 31));
    }

    #[test]
    fn test_extend_membership() {
        let (_dir, store) = open_store();
        register(&store, "403", "Extender");

        // Still active: extends from the current end date
        let member = store
            .extend_membership("403", date(2024, 3, 10), ExtendBy::Months(1))
            .unwrap();
        assert_eq!(member.membership_end_date, date(2024, 4, 30));

        // Expired: extends from today
        let member = store
            .extend_membership("403", date(2024, 6, 1), ExtendBy::Weeks(1))
            .unwrap();
        assert_eq!(member.membership_end_date, date(2024, 6, 8));

        let missing = store.extend_membership("nope", date(2024, 6, 1), ExtendBy::Days(1));
        assert!(matches!(missing, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_toggle_freeze_missing_member() {
        let (_dir, store) = open_store();
        let result = store.toggle_freeze("nope", date(2024, 3, 5).and_hms_opt(0, 0, 0).unwrap());
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_search() {
        let (_dir, store) = open_store();
        register(&store, "201", "Alice Smith");
        register(&store, "202", "Bob Smith");
        register(&store, "303", "Carol Jones");

        assert_eq!(store.search_members("smith").unwrap().len(), 2);
        assert_eq!(store.search_members("201").unwrap().len(), 1);
        assert!(store.search_members("zed").unwrap().is_empty());

        let all = store.list_members().unwrap();
        let ids: Vec<_> = all.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["201", "202", "303"]);
    }

    #[test]
    fn test_delete() {
        let (_dir, store) = open_store();
        register(&store, "501", "Delete Me");

        assert!(store.delete_member("501").unwrap());
        assert!(store.get_member("501").unwrap().is_none());
        assert!(!store.delete_member("501").unwrap());
    }

    #[test]
    fn test_ids_are_trimmed_on_lookup() {
        let (_dir, store) = open_store();
        register(&store, " 42 ", "Padded");

        assert_eq!(store.get_member(" 42").unwrap().unwrap().id, "42");
        store.set_expiry("42 ", date(2024, 6, 1)).unwrap();
        let member = store.toggle_freeze("\t42", date(2024, 5, 1).and_hms_opt(9, 0, 0).unwrap()).unwrap();
        assert!(member.is_frozen());
        assert!(store.delete_member(" 42 ").unwrap());
        assert!(store.get_member("42").unwrap().is_none());
    }

    #[test]
    fn test_config() {
        let (_dir, store) = open_store();
        store.set_config("gym_name", "SuperGym").unwrap();
        assert_eq!(store.get_config("gym_name", "GymBase").unwrap(), "SuperGym");

        store.set_config("gym_name", "MegaGym").unwrap();
        assert_eq!(store.get_config("gym_name", "GymBase").unwrap(), "MegaGym");

        assert_eq!(store.get_config("non_existent", "Default").unwrap(), "Default");
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("gym.redb");
        {
            let store = RedbStore::open(&path).unwrap();
            register(&store, "601", "Persistent");
            store.set_config("serial_port", "/dev/ttyUSB0").unwrap();
        }

        let store = RedbStore::open(&path).unwrap();
        assert_eq!(store.get_member("601").unwrap().unwrap().name(), "Persistent");
        assert_eq!(store.get_config("serial_port", "").unwrap(), "/dev/ttyUSB0");
    }
}
