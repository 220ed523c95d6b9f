use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use super::model::{AttendanceRecord, RecordStatus};

#[derive(Debug, FromRow)]
pub struct AttendanceRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub start_time: OffsetDateTime,
    pub end_time: Option<OffsetDateTime>,
    pub hours_worked: f64,
    pub restaurant_name: String,
    pub status: String,
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = anyhow::Error;

    fn try_from(r: AttendanceRow) -> Result<Self, Self::Error> {
        let status = RecordStatus::from_db_str(&r.status)
            .ok_or_else(|| anyhow::anyhow!("unknown status {:?} on record {}", r.status, r.id))?;
        Ok(Self {
            id: r.id,
            user_id: r.user_id,
            email: r.email,
            date: r.start_time.date(),
            start_time: r.start_time,
            end_time: r.end_time,
            hours_worked: r.hours_worked,
            restaurant_name: r.restaurant_name,
            status,
        })
    }
}
