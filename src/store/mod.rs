//! Persistence for attendance records.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::StoreError;
use crate::model::attendance::{AttendanceRecord, NewAttendance};

pub use memory::InMemoryAttendanceStore;
pub use mysql::MySqlAttendanceStore;

/// Record store capability the attendance service is built on.
///
/// Implementations must reject a second row for the same (user_id, date) with
/// [`StoreError::Conflict`].
#[async_trait]
pub trait AttendanceStore: Send + Sync {
    /// The user's row for `date`, if any.
    async fn find_for_day(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// Inserts an open session, assigning its id and creation time.
    async fn insert(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError>;

    /// Sets `clock_out` and `total_hours` on a still-open row.
    ///
    /// Returns `None` when the row is missing or was already closed.
    async fn close(
        &self,
        id: &str,
        clock_out: DateTime<Utc>,
        total_hours: f64,
    ) -> Result<Option<AttendanceRecord>, StoreError>;

    /// All rows of a user, newest date first, optionally restricted to one date.
    async fn list_for_user(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<AttendanceRecord>, StoreError>;
}
