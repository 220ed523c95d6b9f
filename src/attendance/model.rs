use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

pub type RecordId = Uuid;

/// Open vs. closed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordStatus {
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "Completed")]
    Completed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::InProgress => "In Progress",
            RecordStatus::Completed => "Completed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "In Progress" => Some(RecordStatus::InProgress),
            "Completed" => Some(RecordStatus::Completed),
            _ => None,
        }
    }
}

/// One work session, open or closed, in its persisted shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceRecord {
    pub id: RecordId,
    pub user_id: Uuid,
    pub email: String,
    #[serde(with = "iso_date")]
    pub date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
    pub hours_worked: f64,
    pub restaurant_name: String,
    pub status: RecordStatus,
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        self.status == RecordStatus::InProgress
    }

    pub(crate) fn apply(&mut self, patch: &RecordPatch) {
        if let Some(end) = patch.end_time {
            self.end_time = Some(end);
        }
        if let Some(hours) = patch.hours_worked {
            self.hours_worked = hours;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }
}

/// Fields supplied when a session starts; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewRecord {
    pub user_id: Uuid,
    pub email: String,
    pub start_time: OffsetDateTime,
    pub restaurant_name: String,
}

impl NewRecord {
    pub fn into_record(self, id: RecordId) -> AttendanceRecord {
        AttendanceRecord {
            id,
            user_id: self.user_id,
            email: self.email,
            date: self.start_time.date(),
            start_time: self.start_time,
            end_time: None,
            hours_worked: 0.0,
            restaurant_name: self.restaurant_name,
            status: RecordStatus::InProgress,
        }
    }
}

/// Partial update; `None` leaves the field as stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordPatch {
    pub end_time: Option<OffsetDateTime>,
    pub hours_worked: Option<f64>,
    pub status: Option<RecordStatus>,
}

impl RecordPatch {
    pub fn complete(end_time: OffsetDateTime, hours_worked: f64) -> Self {
        Self {
            end_time: Some(end_time),
            hours_worked: Some(hours_worked),
            status: Some(RecordStatus::Completed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn sample() -> AttendanceRecord {
        NewRecord {
            user_id: Uuid::nil(),
            email: "a@x.com".into(),
            start_time: datetime!(2024-03-04 09:00 UTC),
            restaurant_name: "Harbour Grill".into(),
        }
        .into_record(Uuid::nil())
    }

    #[test]
    fn wire_shape_uses_camel_case_and_status_labels() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["userId"], Uuid::nil().to_string());
        assert_eq!(json["date"], "2024-03-04");
        assert_eq!(json["startTime"], "2024-03-04T09:00:00Z");
        assert!(json["endTime"].is_null());
        assert_eq!(json["hoursWorked"], 0.0);
        assert_eq!(json["restaurantName"], "Harbour Grill");
        assert_eq!(json["status"], "In Progress");
    }

    #[test]
    fn completed_record_parses_back() {
        let mut rec = sample();
        rec.apply(&RecordPatch::complete(datetime!(2024-03-04 13:30 UTC), 4.5));
        let text = serde_json::to_string(&rec).unwrap();
        assert!(text.contains(r#""status":"Completed""#));
        let back: AttendanceRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let mut rec = sample();
        let before = rec.clone();
        rec.apply(&RecordPatch::default());
        assert_eq!(rec, before);
    }
}
