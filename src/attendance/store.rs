use async_trait::async_trait;
use uuid::Uuid;

use super::model::{AttendanceRecord, NewRecord, RecordId, RecordPatch};

/// Persistence contract for attendance records.
///
/// Implementations only store what they are given: the at-most-one open
/// session rule is the controller's job. Every call can fail and callers
/// must propagate the failure.
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    async fn create_record(&self, record: NewRecord) -> anyhow::Result<RecordId>;

    /// Fails if `id` does not exist.
    async fn update_record(&self, id: RecordId, patch: RecordPatch) -> anyhow::Result<()>;

    /// All records of `user_id`, oldest first.
    async fn query_by_owner(&self, user_id: Uuid) -> anyhow::Result<Vec<AttendanceRecord>>;

    /// The most recent in-progress record of `user_id`.
    async fn query_open_by_owner(&self, user_id: Uuid)
        -> anyhow::Result<Option<AttendanceRecord>>;

    async fn save_location(&self, user_id: Uuid, label: &str) -> anyhow::Result<()>;

    async fn load_location(&self, user_id: Uuid) -> anyhow::Result<Option<String>>;
}
