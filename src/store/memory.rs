use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use futures::lock::Mutex;
use uuid::Uuid;

use super::AttendanceStore;
use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, NewAttendance};

/// Process-local store, for running without a database and for tests.
pub struct InMemoryAttendanceStore {
    rows: Mutex<Vec<AttendanceRecord>>,
}

impl InMemoryAttendanceStore {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
        }
    }
}

impl Default for InMemoryAttendanceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AttendanceStore for InMemoryAttendanceStore {
    async fn find_for_day(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .iter()
            .find(|r| r.user_id == user_id && r.date == date)
            .cloned())
    }

    async fn insert(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError> {
        let mut rows = self.rows.lock().await;
        if rows
            .iter()
            .any(|r| r.user_id == new.user_id && r.date == new.date)
        {
            return Err(StoreError::Conflict);
        }

        let record = AttendanceRecord {
            id: Uuid::new_v4().to_string(),
            user_id: new.user_id,
            date: new.date,
            clock_in: new.clock_in,
            clock_out: None,
            total_hours: None,
            notes: None,
            created_at: Utc::now().trunc_subsecs(3),
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn close(
        &self,
        id: &str,
        clock_out: DateTime<Utc>,
        total_hours: f64,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let mut rows = self.rows.lock().await;
        let Some(row) = rows.iter_mut().find(|r| r.id == id && r.is_open()) else {
            return Ok(None);
        };

        row.clock_out = Some(clock_out);
        row.total_hours = Some(total_hours);
        Ok(Some(row.clone()))
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let rows = self.rows.lock().await;
        let mut matching: Vec<AttendanceRecord> = rows
            .iter()
            .filter(|r| r.user_id == user_id && date.is_none_or(|d| r.date == d))
            .cloned()
            .collect();

        matching.sort_by(|a, b| b.date.cmp(&a.date).then(b.clock_in.cmp(&a.clock_in)));
        Ok(matching)
    }
}
