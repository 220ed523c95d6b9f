use serde::Serialize;
use time::Time;

use super::model::{AttendanceRecord, RecordId, RecordStatus};

/// Snapshot of one identity's records, oldest first. Iterating does not
/// consume it, so the same log can be walked any number of times.
#[derive(Debug, Clone, Default)]
pub struct AttendanceLog {
    records: Vec<AttendanceRecord>,
}

/// Display row of the attendance table.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub id: RecordId,
    pub date: String,
    pub start_time: String,
    pub end_time: Option<String>,
    pub hours_worked: f64,
    pub hours_label: String,
    pub location: String,
    pub status: RecordStatus,
}

impl AttendanceLog {
    pub fn new(records: Vec<AttendanceRecord>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AttendanceRecord> {
        self.records.iter()
    }

    pub fn entries(&self) -> impl Iterator<Item = LogEntry> + '_ {
        self.records.iter().map(LogEntry::from)
    }

    /// Sum over completed sessions.
    pub fn total_hours(&self) -> f64 {
        self.records
            .iter()
            .filter(|r| r.status == RecordStatus::Completed)
            .map(|r| r.hours_worked)
            .sum()
    }

    pub fn into_records(self) -> Vec<AttendanceRecord> {
        self.records
    }
}

impl<'a> IntoIterator for &'a AttendanceLog {
    type Item = &'a AttendanceRecord;
    type IntoIter = std::slice::Iter<'a, AttendanceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

fn clock_time(t: Time) -> String {
    format!("{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second())
}

impl From<&AttendanceRecord> for LogEntry {
    fn from(r: &AttendanceRecord) -> Self {
        Self {
            id: r.id,
            date: r.date.to_string(),
            start_time: clock_time(r.start_time.time()),
            end_time: r.end_time.map(|t| clock_time(t.time())),
            hours_worked: r.hours_worked,
            hours_label: format!("{}h", r.hours_worked),
            location: r.restaurant_name.clone(),
            status: r.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::model::{NewRecord, RecordPatch};
    use time::macros::datetime;
    use uuid::Uuid;

    fn log() -> AttendanceLog {
        let mut done = NewRecord {
            user_id: Uuid::nil(),
            email: "a@x.com".into(),
            start_time: datetime!(2024-03-04 09:00 UTC),
            restaurant_name: "Harbour Grill".into(),
        }
        .into_record(Uuid::new_v4());
        done.apply(&RecordPatch::complete(datetime!(2024-03-04 13:30 UTC), 4.5));

        let open = NewRecord {
            user_id: Uuid::nil(),
            email: "a@x.com".into(),
            start_time: datetime!(2024-03-05 08:05:09 UTC),
            restaurant_name: "Default".into(),
        }
        .into_record(Uuid::new_v4());

        AttendanceLog::new(vec![done, open])
    }

    #[test]
    fn entries_render_table_rows() {
        let rows: Vec<_> = log().entries().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].date, "2024-03-04");
        assert_eq!(rows[0].start_time, "09:00:00");
        assert_eq!(rows[0].end_time.as_deref(), Some("13:30:00"));
        assert_eq!(rows[0].hours_label, "4.5h");
        assert_eq!(rows[0].location, "Harbour Grill");
        assert_eq!(rows[1].start_time, "08:05:09");
        assert_eq!(rows[1].end_time, None);
        assert_eq!(rows[1].status, RecordStatus::InProgress);
    }

    #[test]
    fn log_can_be_walked_twice() {
        let log = log();
        let first: Vec<_> = log.iter().map(|r| r.id).collect();
        let second: Vec<_> = (&log).into_iter().map(|r| r.id).collect();
        assert_eq!(first, second);
        assert_eq!(log.entries().count(), log.len());
    }

    #[test]
    fn total_ignores_open_sessions() {
        assert_eq!(log().total_hours(), 4.5);
        assert_eq!(AttendanceLog::default().total_hours(), 0.0);
    }
}
