use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::attendance::model::{AttendanceRecord, NewRecord, RecordId, RecordPatch};
use crate::attendance::store::AttendanceStore;
use crate::auth::repo::{CredentialStore, DuplicateEmail};
use crate::auth::repo_types::User;

/// Everything the local backend keeps, laid out as one JSON document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot {
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    attendance_log: Vec<AttendanceRecord>,
    #[serde(default)]
    restaurant_names: HashMap<Uuid, String>,
}

/// Process-local store for identities and attendance records.
///
/// With a path, every successful mutation is written through to a JSON file
/// (write to a temp file, then rename) before it becomes visible; a failed
/// write leaves the in-memory state untouched.
pub struct LocalStore {
    inner: RwLock<Snapshot>,
    path: Option<PathBuf>,
}

impl LocalStore {
    pub fn in_memory() -> Self {
        Self {
            inner: RwLock::new(Snapshot::default()),
            path: None,
        }
    }

    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let snapshot = match tokio::fs::read_to_string(&path).await {
            Ok(text) => serde_json::from_str::<Snapshot>(&text)
                .with_context(|| format!("parse local store {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Snapshot::default(),
            Err(e) => {
                return Err(e).with_context(|| format!("read local store {}", path.display()))
            }
        };
        info!(
            path = %path.display(),
            users = snapshot.users.len(),
            records = snapshot.attendance_log.len(),
            "local store opened"
        );
        Ok(Self {
            inner: RwLock::new(snapshot),
            path: Some(path),
        })
    }

    async fn mutate<R>(
        &self,
        f: impl FnOnce(&mut Snapshot) -> anyhow::Result<R>,
    ) -> anyhow::Result<R> {
        let mut guard = self.inner.write().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        if let Some(path) = &self.path {
            write_snapshot(path, &next).await?;
        }
        *guard = next;
        Ok(out)
    }
}

async fn write_snapshot(path: &Path, snapshot: &Snapshot) -> anyhow::Result<()> {
    let body = serde_json::to_vec_pretty(snapshot).context("serialize local store")?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, body)
        .await
        .with_context(|| format!("write {}", tmp.display()))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    debug!(path = %path.display(), "local store flushed");
    Ok(())
}

#[async_trait]
impl CredentialStore for LocalStore {
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let snap = self.inner.read().await;
        Ok(snap.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let snap = self.inner.read().await;
        Ok(snap.users.iter().find(|u| u.id == id).cloned())
    }

    async fn create(&self, email: &str, password_hash: &str) -> anyhow::Result<User> {
        self.mutate(|snap| {
            if snap.users.iter().any(|u| u.email == email) {
                return Err(DuplicateEmail.into());
            }
            let user = User {
                id: Uuid::new_v4(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                created_at: OffsetDateTime::now_utc(),
            };
            snap.users.push(user.clone());
            Ok(user)
        })
        .await
    }
}

#[async_trait]
impl AttendanceStore for LocalStore {
    async fn create_record(&self, record: NewRecord) -> anyhow::Result<RecordId> {
        self.mutate(|snap| {
            let id = Uuid::new_v4();
            snap.attendance_log.push(record.into_record(id));
            Ok(id)
        })
        .await
    }

    async fn update_record(&self, id: RecordId, patch: RecordPatch) -> anyhow::Result<()> {
        self.mutate(|snap| {
            let rec = snap
                .attendance_log
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| anyhow::anyhow!("attendance record {id} not found"))?;
            rec.apply(&patch);
            Ok(())
        })
        .await
    }

    async fn query_by_owner(&self, user_id: Uuid) -> anyhow::Result<Vec<AttendanceRecord>> {
        let snap = self.inner.read().await;
        Ok(snap
            .attendance_log
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn query_open_by_owner(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Option<AttendanceRecord>> {
        let snap = self.inner.read().await;
        Ok(snap
            .attendance_log
            .iter()
            .rev()
            .find(|r| r.user_id == user_id && r.is_open())
            .cloned())
    }

    async fn save_location(&self, user_id: Uuid, label: &str) -> anyhow::Result<()> {
        self.mutate(|snap| {
            snap.restaurant_names.insert(user_id, label.to_string());
            Ok(())
        })
        .await
    }

    async fn load_location(&self, user_id: Uuid) -> anyhow::Result<Option<String>> {
        let snap = self.inner.read().await;
        Ok(snap.restaurant_names.get(&user_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::model::RecordStatus;
    use time::macros::datetime;

    fn new_record(user_id: Uuid, start: OffsetDateTime) -> NewRecord {
        NewRecord {
            user_id,
            email: "a@x.com".into(),
            start_time: start,
            restaurant_name: "Default".into(),
        }
    }

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("timeregister-{tag}-{}.json", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn create_update_query_roundtrip_has_no_duplicates() {
        let store = LocalStore::in_memory();
        let owner = Uuid::new_v4();
        let id = store
            .create_record(new_record(owner, datetime!(2024-03-04 09:00 UTC)))
            .await
            .unwrap();
        store
            .update_record(
                id,
                RecordPatch::complete(datetime!(2024-03-04 13:30 UTC), 4.5),
            )
            .await
            .unwrap();

        let recs = store.query_by_owner(owner).await.unwrap();
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].id, id);
        assert_eq!(recs[0].status, RecordStatus::Completed);
        assert_eq!(recs[0].end_time, Some(datetime!(2024-03-04 13:30 UTC)));
        assert_eq!(recs[0].hours_worked, 4.5);
        assert!(store.query_open_by_owner(owner).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn queries_are_scoped_to_owner_and_keep_insertion_order() {
        let store = LocalStore::in_memory();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let first = store
            .create_record(new_record(a, datetime!(2024-03-05 09:00 UTC)))
            .await
            .unwrap();
        store
            .create_record(new_record(b, datetime!(2024-03-05 10:00 UTC)))
            .await
            .unwrap();
        let second = store
            .create_record(new_record(a, datetime!(2024-03-04 09:00 UTC)))
            .await
            .unwrap();

        let ids: Vec<_> = store
            .query_by_owner(a)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(ids, vec![first, second]);

        let open = store.query_open_by_owner(a).await.unwrap().unwrap();
        assert_eq!(open.id, second);
    }

    #[tokio::test]
    async fn update_of_unknown_record_fails() {
        let store = LocalStore::in_memory();
        let err = store
            .update_record(Uuid::new_v4(), RecordPatch::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn duplicate_email_is_distinguishable() {
        let store = LocalStore::in_memory();
        store.create("a@x.com", "hash").await.unwrap();
        let err = store.create("a@x.com", "other").await.unwrap_err();
        assert!(err.is::<DuplicateEmail>());
        assert!(store.find_by_email("a@x.com").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn location_is_saved_per_user() {
        let store = LocalStore::in_memory();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        store.save_location(a, "Harbour Grill").await.unwrap();
        store.save_location(a, "Pier 9").await.unwrap();
        assert_eq!(store.load_location(a).await.unwrap().as_deref(), Some("Pier 9"));
        assert_eq!(store.load_location(b).await.unwrap(), None);
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let path = temp_path("reopen");
        let user = {
            let store = LocalStore::open(&path).await.unwrap();
            let user = store.create("a@x.com", "hash").await.unwrap();
            store
                .create_record(new_record(user.id, datetime!(2024-03-04 09:00 UTC)))
                .await
                .unwrap();
            store.save_location(user.id, "Pier 9").await.unwrap();
            user
        };

        let reopened = LocalStore::open(&path).await.unwrap();
        assert_eq!(reopened.find_by_id(user.id).await.unwrap().unwrap().email, "a@x.com");
        assert_eq!(reopened.query_by_owner(user.id).await.unwrap().len(), 1);
        assert_eq!(
            reopened.load_location(user.id).await.unwrap().as_deref(),
            Some("Pier 9")
        );
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn failed_flush_leaves_state_unchanged() {
        let dir = std::env::temp_dir().join(format!("timeregister-missing-{}", Uuid::new_v4()));
        let store = LocalStore {
            inner: RwLock::new(Snapshot::default()),
            path: Some(dir.join("store.json")),
        };
        let owner = Uuid::new_v4();
        assert!(store
            .create_record(new_record(owner, datetime!(2024-03-04 09:00 UTC)))
            .await
            .is_err());
        assert!(store.query_by_owner(owner).await.unwrap().is_empty());
    }
}
