use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::model::{AttendanceRecord, NewRecord, RecordId, RecordPatch, RecordStatus};
use super::repo_types::AttendanceRow;
use super::store::AttendanceStore;

/// Postgres-backed attendance store.
#[derive(Clone)]
pub struct PgAttendanceStore {
    db: PgPool,
}

impl PgAttendanceStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AttendanceStore for PgAttendanceStore {
    async fn create_record(&self, record: NewRecord) -> anyhow::Result<RecordId> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO attendance_records
                (id, user_id, email, start_time, end_time, hours_worked, restaurant_name, status)
            VALUES ($1, $2, $3, $4, NULL, 0, $5, $6)
            "#,
        )
        .bind(id)
        .bind(record.user_id)
        .bind(&record.email)
        .bind(record.start_time)
        .bind(&record.restaurant_name)
        .bind(RecordStatus::InProgress.as_str())
        .execute(&self.db)
        .await
        .context("insert attendance record")?;
        Ok(id)
    }

    async fn update_record(&self, id: RecordId, patch: RecordPatch) -> anyhow::Result<()> {
        let res = sqlx::query(
            r#"
            UPDATE attendance_records
               SET end_time     = COALESCE($2, end_time),
                   hours_worked = COALESCE($3, hours_worked),
                   status       = COALESCE($4, status)
             WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(patch.end_time)
        .bind(patch.hours_worked)
        .bind(patch.status.map(|s| s.as_str()))
        .execute(&self.db)
        .await
        .context("update attendance record")?;

        anyhow::ensure!(res.rows_affected() == 1, "attendance record {id} not found");
        Ok(())
    }

    async fn query_by_owner(&self, user_id: Uuid) -> anyhow::Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, user_id, email, start_time, end_time, hours_worked, restaurant_name, status
              FROM attendance_records
             WHERE user_id = $1
             ORDER BY seq ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .context("list attendance records by owner")?;

        rows.into_iter().map(AttendanceRecord::try_from).collect()
    }

    async fn query_open_by_owner(
        &self,
        user_id: Uuid,
    ) -> anyhow::Result<Option<AttendanceRecord>> {
        let row = sqlx::query_as::<_, AttendanceRow>(
            r#"
            SELECT id, user_id, email, start_time, end_time, hours_worked, restaurant_name, status
              FROM attendance_records
             WHERE user_id = $1 AND status = $2
             ORDER BY seq DESC
             LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(RecordStatus::InProgress.as_str())
        .fetch_optional(&self.db)
        .await
        .context("get open attendance record")?;

        row.map(AttendanceRecord::try_from).transpose()
    }

    async fn save_location(&self, user_id: Uuid, label: &str) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_locations (user_id, restaurant_name)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE
               SET restaurant_name = EXCLUDED.restaurant_name,
                   updated_at = now()
            "#,
        )
        .bind(user_id)
        .bind(label)
        .execute(&self.db)
        .await
        .context("upsert user location")?;
        Ok(())
    }

    async fn load_location(&self, user_id: Uuid) -> anyhow::Result<Option<String>> {
        let label = sqlx::query_scalar::<_, String>(
            r#"SELECT restaurant_name FROM user_locations WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .context("get user location")?;
        Ok(label)
    }
}
