use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use sqlx::MySqlPool;
use uuid::Uuid;

use super::AttendanceStore;
use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, NewAttendance};

const RECORD_COLUMNS: &str =
    "id, user_id, date, clock_in, clock_out, total_hours, notes, created_at";

/// `attendance` table access. The schema (sql/attendance.sql) carries the
/// UNIQUE (user_id, date) key that turns a racing duplicate insert into
/// [`StoreError::Conflict`].
#[derive(Clone)]
pub struct MySqlAttendanceStore {
    pool: MySqlPool,
}

impl MySqlAttendanceStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn fetch_by_id(&self, id: &str) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM attendance WHERE id = ?");

        let record = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }
}

#[async_trait]
impl AttendanceStore for MySqlAttendanceStore {
    async fn find_for_day(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM attendance WHERE user_id = ? AND date = ? LIMIT 1"
        );

        let record = sqlx::query_as::<_, AttendanceRecord>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    async fn insert(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError> {
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

        sqlx::query(
            r#"
            INSERT INTO attendance (id, user_id, date, clock_in, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.user_id)
        .bind(record.date)
        .bind(record.clock_in)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn close(
        &self,
        id: &str,
        clock_out: DateTime<Utc>,
        total_hours: f64,
    ) -> Result<Option<AttendanceRecord>, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE attendance
            SET clock_out = ?, total_hours = ?
            WHERE id = ?
            AND clock_out IS NULL
            "#,
        )
        .bind(clock_out)
        .bind(total_hours)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.fetch_by_id(id).await
    }

    async fn list_for_user(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, StoreError> {
        let mut sql = format!("SELECT {RECORD_COLUMNS} FROM attendance WHERE user_id = ?");
        if date.is_some() {
            sql.push_str(" AND date = ?");
        }
        sql.push_str(" ORDER BY date DESC, clock_in DESC");

        let mut query = sqlx::query_as::<_, AttendanceRecord>(&sql).bind(user_id);
        if let Some(date) = date {
            query = query.bind(date);
        }

        let records = query.fetch_all(&self.pool).await?;
        Ok(records)
    }
}
