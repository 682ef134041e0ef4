use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::RwLock;

use super::HrStore;
use crate::model::attendance::{AttendanceKey, AttendanceRecord, WorkLocation};
use crate::model::policy::WorkspacePolicy;

/// Process-local store used when no database is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    attendance: RwLock<HashMap<AttendanceKey, AttendanceRecord>>,
    policies: RwLock<HashMap<String, WorkspacePolicy>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("memory store lock poisoned")
}

#[async_trait]
impl HrStore for MemoryStore {
    async fn find_attendance(&self, key: &AttendanceKey) -> anyhow::Result<Option<AttendanceRecord>> {
        let map = self.attendance.read().map_err(poisoned)?;
        Ok(map.get(key).cloned())
    }

    async fn list_attendance(
        &self,
        workspace_id: &str,
        user_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> anyhow::Result<Vec<AttendanceRecord>> {
        let map = self.attendance.read().map_err(poisoned)?;
        let mut records: Vec<AttendanceRecord> = map
            .values()
            .filter(|r| r.workspace_id == workspace_id && r.user_id == user_id)
            .filter(|r| r.date >= from && r.date <= to)
            .cloned()
            .collect();
        records.sort_by_key(|r| r.date);
        Ok(records)
    }

    async fn list_open_remote(
        &self,
        workspace_id: &str,
        date: NaiveDate,
    ) -> anyhow::Result<Vec<AttendanceRecord>> {
        let map = self.attendance.read().map_err(poisoned)?;
        Ok(map
            .values()
            .filter(|r| r.workspace_id == workspace_id && r.date == date)
            .filter(|r| r.work_location == WorkLocation::Remote && r.is_open())
            .cloned()
            .collect())
    }

    async fn upsert_check_in(&self, record: &AttendanceRecord) -> anyhow::Result<bool> {
        let mut map = self.attendance.write().map_err(poisoned)?;
        let key = record.key();
        if map.get(&key).is_some_and(|r| r.check_in.is_some()) {
            return Ok(false);
        }
        map.insert(key, record.clone());
        Ok(true)
    }

    async fn complete_check_out(&self, record: &AttendanceRecord) -> anyhow::Result<bool> {
        let mut map = self.attendance.write().map_err(poisoned)?;
        match map.get_mut(&record.key()) {
            Some(stored) if stored.is_open() && stored.id == record.id => {
                stored.check_out = record.check_out;
                stored.total_minutes = record.total_minutes;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn load_policy(&self, workspace_id: &str) -> anyhow::Result<Option<WorkspacePolicy>> {
        let map = self.policies.read().map_err(poisoned)?;
        Ok(map.get(workspace_id).cloned())
    }

    async fn save_policy(&self, workspace_id: &str, policy: &WorkspacePolicy) -> anyhow::Result<()> {
        let mut map = self.policies.write().map_err(poisoned)?;
        map.insert(workspace_id.to_string(), policy.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::{AttendanceStatus, WorkLocation};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn record(date: NaiveDate) -> AttendanceRecord {
        AttendanceRecord {
            id: Uuid::new_v4(),
            workspace_id: "ws".into(),
            user_id: "u1".into(),
            date,
            check_in: Some(Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()),
            check_out: None,
            work_location: WorkLocation::Office,
            status: AttendanceStatus::Present,
            total_minutes: 0,
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    #[actix_web::test]
    async fn second_check_in_loses() {
        let store = MemoryStore::new();
        let first = record(day(2));
        let second = record(day(2));

        assert!(store.upsert_check_in(&first).await.unwrap());
        assert!(!store.upsert_check_in(&second).await.unwrap());

        let stored = store.find_attendance(&first.key()).await.unwrap().unwrap();
        assert_eq!(stored.id, first.id);
    }

    #[actix_web::test]
    async fn check_out_lands_once() {
        let store = MemoryStore::new();
        let open = record(day(2));
        store.upsert_check_in(&open).await.unwrap();

        let mut closed = open.clone();
        closed.check_out = Some(Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap());
        closed.total_minutes = 480;

        assert!(store.complete_check_out(&closed).await.unwrap());
        assert!(!store.complete_check_out(&closed).await.unwrap());
        assert_eq!(
            store.find_attendance(&open.key()).await.unwrap().unwrap().total_minutes,
            480
        );
    }

    #[actix_web::test]
    async fn list_is_scoped_and_ordered() {
        let store = MemoryStore::new();
        for d in [4, 2, 3, 9] {
            store.upsert_check_in(&record(day(d))).await.unwrap();
        }
        let mut other = record(day(3));
        other.user_id = "u2".into();
        store.upsert_check_in(&other).await.unwrap();

        let listed = store.list_attendance("ws", "u1", day(2), day(4)).await.unwrap();
        let dates: Vec<NaiveDate> = listed.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![day(2), day(3), day(4)]);
    }

    #[actix_web::test]
    async fn open_remote_records_only() {
        let store = MemoryStore::new();
        let mut remote = record(day(2));
        remote.work_location = WorkLocation::Remote;
        store.upsert_check_in(&remote).await.unwrap();
        let mut office = record(day(2));
        office.user_id = "u2".into();
        store.upsert_check_in(&office).await.unwrap();

        let mut closed = record(day(2));
        closed.user_id = "u3".into();
        closed.work_location = WorkLocation::Remote;
        store.upsert_check_in(&closed).await.unwrap();
        closed.check_out = closed.check_in;
        store.complete_check_out(&closed).await.unwrap();

        let open = store.list_open_remote("ws", day(2)).await.unwrap();
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, remote.id);
        assert!(store.list_open_remote("ws", day(3)).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn policies_are_per_workspace() {
        let store = MemoryStore::new();
        let mut policy = WorkspacePolicy::default();
        policy.policy_version = "v7".into();
        store.save_policy("ws-a", &policy).await.unwrap();

        assert_eq!(store.load_policy("ws-a").await.unwrap().unwrap().policy_version, "v7");
        assert!(store.load_policy("ws-b").await.unwrap().is_none());
    }
}
