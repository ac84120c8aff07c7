use std::sync::Arc;

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use tracing::{debug, info, instrument};

use crate::error::{AttendanceResult, ConflictError, StoreError, ValidationError};
use crate::model::attendance::{
    AttendanceAction, AttendanceRecord, NewAttendance, TodayStatus, worked_hours,
};
use crate::store::AttendanceStore;
use crate::utils::{calendar::CalendarPolicy, user_locks::UserLocks};

/// Daily clock-in / clock-out lifecycle.
///
/// Per user and calendar day: no row, then an open row after `clock_in`, then
/// a closed row after `clock_out`. A closed row is terminal for that day.
#[derive(Clone)]
pub struct AttendanceService {
    store: Arc<dyn AttendanceStore>,
    calendar: CalendarPolicy,
    locks: UserLocks,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn AttendanceStore>, calendar: CalendarPolicy, locks: UserLocks) -> Self {
        Self {
            store,
            calendar,
            locks,
        }
    }

    /// Opens today's session for `user_id`.
    #[instrument(name = "attendance_clock_in", skip(self))]
    pub async fn clock_in(&self, user_id: &str, now: DateTime<Utc>) -> AttendanceResult<AttendanceRecord> {
        let user_id = require_user_id(user_id)?;
        // stored instants keep millisecond precision
        let now = now.trunc_subsecs(3);
        let today = self.calendar.date_of(now);

        let lock = self.locks.for_user(user_id).await;
        let _guard = lock.lock().await;

        if let Some(existing) = self.store.find_for_day(user_id, today).await? {
            return Err(rejected_clock_in(&existing).into());
        }

        let new = NewAttendance {
            user_id: user_id.to_string(),
            date: today,
            clock_in: now,
        };

        match self.store.insert(new).await {
            Ok(record) => {
                info!(record_id = %record.id, %today, "Clocked in");
                Ok(record)
            }
            Err(StoreError::Conflict) => {
                // another writer got there first
                debug!(%today, "Clock-in insert hit the (user_id, date) key");
                let existing = self.store.find_for_day(user_id, today).await?;
                Err(existing
                    .as_ref()
                    .map_or(ConflictError::AlreadyOpen, rejected_clock_in)
                    .into())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Closes today's open session for `user_id` and records the worked hours.
    #[instrument(name = "attendance_clock_out", skip(self))]
    pub async fn clock_out(&self, user_id: &str, now: DateTime<Utc>) -> AttendanceResult<AttendanceRecord> {
        let user_id = require_user_id(user_id)?;
        // stored instants keep millisecond precision
        let now = now.trunc_subsecs(3);
        let today = self.calendar.date_of(now);

        let lock = self.locks.for_user(user_id).await;
        let _guard = lock.lock().await;

        let open = match self.store.find_for_day(user_id, today).await? {
            None => return Err(ConflictError::NoOpenSession.into()),
            Some(record) if !record.is_open() => return Err(already_clocked_out().into()),
            Some(record) => record,
        };

        if now <= open.clock_in {
            return Err(ValidationError::ClockOutBeforeClockIn.into());
        }

        let total_hours = worked_hours(open.clock_in, now);
        let closed = self
            .store
            .close(&open.id, now, total_hours)
            .await?
            .ok_or_else(already_clocked_out)?;

        info!(record_id = %closed.id, %today, total_hours, "Clocked out");
        Ok(closed)
    }

    /// All records of `user_id`, newest date first, optionally for one date.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        date: Option<NaiveDate>,
    ) -> AttendanceResult<Vec<AttendanceRecord>> {
        let user_id = require_user_id(user_id)?;
        let records = self.store.list_for_user(user_id, date).await?;
        Ok(records)
    }

    /// Session state of `user_id` for the day containing `now`.
    pub async fn today_status(&self, user_id: &str, now: DateTime<Utc>) -> AttendanceResult<TodayStatus> {
        let user_id = require_user_id(user_id)?;
        let today = self.calendar.date_of(now);
        let record = self.store.find_for_day(user_id, today).await?;
        Ok(TodayStatus::new(today, record))
    }
}

fn require_user_id(user_id: &str) -> Result<&str, ValidationError> {
    let trimmed = user_id.trim();
    if trimmed.is_empty() {
        Err(ValidationError::MissingUserId)
    } else {
        Ok(trimmed)
    }
}

fn rejected_clock_in(existing: &AttendanceRecord) -> ConflictError {
    if existing.is_open() {
        ConflictError::AlreadyOpen
    } else {
        ConflictError::AlreadyClosed {
            action: AttendanceAction::ClockIn,
        }
    }
}

fn already_clocked_out() -> ConflictError {
    ConflictError::AlreadyClosed {
        action: AttendanceAction::ClockOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AttendanceError;
    use crate::store::InMemoryAttendanceStore;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::time::Duration;

    fn service_with(store: Arc<dyn AttendanceStore>) -> AttendanceService {
        AttendanceService::new(
            store,
            CalendarPolicy::utc(),
            UserLocks::new(1_000, Duration::from_secs(60)),
        )
    }

    fn service() -> AttendanceService {
        service_with(Arc::new(InMemoryAttendanceStore::new()))
    }

    fn jan15(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, s).unwrap()
    }

    fn jan15_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    #[actix_web::test]
    async fn full_day_cycle() {
        let svc = service();

        let opened = svc.clock_in("u1", jan15(9, 0, 0)).await.unwrap();
        assert_eq!(opened.clock_in, jan15(9, 0, 0));
        assert_eq!(opened.date, jan15_date());
        assert!(opened.clock_out.is_none());
        assert!(opened.total_hours.is_none());

        let closed = svc.clock_out("u1", jan15(17, 30, 0)).await.unwrap();
        assert_eq!(closed.id, opened.id);
        assert_eq!(closed.clock_out, Some(jan15(17, 30, 0)));
        assert_eq!(closed.total_hours, Some(8.5));

        let listed = svc.list_for_user("u1", Some(jan15_date())).await.unwrap();
        assert_eq!(listed, vec![closed.clone()]);

        // stable across reads
        let again = svc.list_for_user("u1", Some(jan15_date())).await.unwrap();
        assert_eq!(again[0].total_hours, Some(8.5));
    }

    #[actix_web::test]
    async fn instants_keep_millisecond_precision_across_reads() {
        let svc = service();
        let clock_in = jan15(9, 0, 0) + chrono::Duration::nanoseconds(123_456_789);
        let clock_out = jan15(17, 0, 0) + chrono::Duration::nanoseconds(987_654_321);

        let opened = svc.clock_in("u1", clock_in).await.unwrap();
        assert_eq!(opened.clock_in, jan15(9, 0, 0) + chrono::Duration::milliseconds(123));

        let listed = svc.list_for_user("u1", None).await.unwrap();
        assert_eq!(listed[0].clock_in, opened.clock_in);

        let closed = svc.clock_out("u1", clock_out).await.unwrap();
        assert_eq!(closed.clock_in, opened.clock_in);
        assert_eq!(
            closed.clock_out,
            Some(jan15(17, 0, 0) + chrono::Duration::milliseconds(987))
        );
        let reread = svc.list_for_user("u1", Some(jan15_date())).await.unwrap();
        assert_eq!(reread[0].clock_out, closed.clock_out);
    }

    #[actix_web::test]
    async fn clock_out_without_clock_in_is_rejected() {
        let err = service().clock_out("u1", jan15(17, 0, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Conflict(ConflictError::NoOpenSession)));
    }

    #[actix_web::test]
    async fn double_clock_in_is_rejected() {
        let svc = service();
        svc.clock_in("u1", jan15(9, 0, 0)).await.unwrap();

        let err = svc.clock_in("u1", jan15(9, 5, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Conflict(ConflictError::AlreadyOpen)));
        assert_eq!(err.to_string(), "Already clocked in today");
    }

    #[actix_web::test]
    async fn closed_day_rejects_everything() {
        let svc = service();
        svc.clock_in("u1", jan15(9, 0, 0)).await.unwrap();
        svc.clock_out("u1", jan15(12, 0, 0)).await.unwrap();

        let err = svc.clock_in("u1", jan15(13, 0, 0)).await.unwrap_err();
        assert_eq!(err.to_string(), "Already completed attendance for today");
        assert!(matches!(
            err,
            AttendanceError::Conflict(ConflictError::AlreadyClosed {
                action: AttendanceAction::ClockIn
            })
        ));

        let err = svc.clock_out("u1", jan15(18, 0, 0)).await.unwrap_err();
        assert_eq!(err.to_string(), "Already clocked out today");

        let records = svc.list_for_user("u1", None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].total_hours, Some(3.0));
    }

    #[actix_web::test]
    async fn next_day_starts_fresh() {
        let svc = service();
        svc.clock_in("u1", jan15(9, 0, 0)).await.unwrap();
        svc.clock_out("u1", jan15(17, 0, 0)).await.unwrap();

        let next = Utc.with_ymd_and_hms(2024, 1, 16, 9, 0, 0).unwrap();
        let opened = svc.clock_in("u1", next).await.unwrap();
        assert_eq!(opened.date, NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());

        let dates: Vec<NaiveDate> = svc
            .list_for_user("u1", None)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.date)
            .collect();
        assert_eq!(dates, vec![opened.date, jan15_date()]);
    }

    #[actix_web::test]
    async fn clock_out_at_clock_in_instant_is_invalid() {
        let svc = service();
        svc.clock_in("u1", jan15(9, 0, 0)).await.unwrap();

        let err = svc.clock_out("u1", jan15(9, 0, 0)).await.unwrap_err();
        assert!(matches!(
            err,
            AttendanceError::Validation(ValidationError::ClockOutBeforeClockIn)
        ));

        // session stays open
        let status = svc.today_status("u1", jan15(9, 1, 0)).await.unwrap();
        assert_eq!(status.state, crate::model::attendance::SessionState::Open);
    }

    #[actix_web::test]
    async fn blank_user_id_is_a_validation_error() {
        let svc = service();
        for op in [
            svc.clock_in("  ", jan15(9, 0, 0)).await.unwrap_err(),
            svc.clock_out("", jan15(9, 0, 0)).await.unwrap_err(),
            svc.list_for_user("", None).await.unwrap_err(),
        ] {
            assert!(matches!(op, AttendanceError::Validation(ValidationError::MissingUserId)));
        }
    }

    #[actix_web::test]
    async fn unknown_user_lists_nothing() {
        let records = service().list_for_user("ghost", None).await.unwrap();
        assert!(records.is_empty());
    }

    #[actix_web::test]
    async fn calendar_policy_decides_the_day() {
        let svc = AttendanceService::new(
            Arc::new(InMemoryAttendanceStore::new()),
            "+09:00".parse().unwrap(),
            UserLocks::new(100, Duration::from_secs(60)),
        );

        // 16:00 UTC on the 15th is already the 16th at +09:00
        let opened = svc.clock_in("u1", jan15(16, 0, 0)).await.unwrap();
        assert_eq!(opened.date, NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
    }

    #[actix_web::test]
    async fn concurrent_clock_ins_create_one_row() {
        let svc = service();
        let attempts = (0..16).map(|i| {
            let svc = svc.clone();
            async move { svc.clock_in("u1", jan15(9, 0, i)).await }
        });

        let results = futures::future::join_all(attempts).await;
        let created = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(created, 1);
        assert!(results.iter().filter_map(|r| r.as_ref().err()).all(|e| matches!(
            e,
            AttendanceError::Conflict(ConflictError::AlreadyOpen)
        )));

        assert_eq!(svc.list_for_user("u1", None).await.unwrap().len(), 1);
    }

    /// Store whose lookups never see existing rows, so only the unique key
    /// stops a duplicate.
    struct BlindLookupStore(InMemoryAttendanceStore);

    #[async_trait]
    impl AttendanceStore for BlindLookupStore {
        async fn find_for_day(
            &self,
            _user_id: &str,
            _date: NaiveDate,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            Ok(None)
        }

        async fn insert(&self, new: NewAttendance) -> Result<AttendanceRecord, StoreError> {
            self.0.insert(new).await
        }

        async fn close(
            &self,
            id: &str,
            clock_out: DateTime<Utc>,
            total_hours: f64,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            self.0.close(id, clock_out, total_hours).await
        }

        async fn list_for_user(
            &self,
            user_id: &str,
            date: Option<NaiveDate>,
        ) -> Result<Vec<AttendanceRecord>, StoreError> {
            self.0.list_for_user(user_id, date).await
        }
    }

    #[actix_web::test]
    async fn unique_key_conflict_maps_to_already_open() {
        let svc = service_with(Arc::new(BlindLookupStore(InMemoryAttendanceStore::new())));
        svc.clock_in("u1", jan15(9, 0, 0)).await.unwrap();

        let err = svc.clock_in("u1", jan15(9, 1, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Conflict(ConflictError::AlreadyOpen)));
    }

    struct DownStore;

    #[async_trait]
    impl AttendanceStore for DownStore {
        async fn find_for_day(
            &self,
            _user_id: &str,
            _date: NaiveDate,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn insert(&self, _new: NewAttendance) -> Result<AttendanceRecord, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn close(
            &self,
            _id: &str,
            _clock_out: DateTime<Utc>,
            _total_hours: f64,
        ) -> Result<Option<AttendanceRecord>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }

        async fn list_for_user(
            &self,
            _user_id: &str,
            _date: Option<NaiveDate>,
        ) -> Result<Vec<AttendanceRecord>, StoreError> {
            Err(StoreError::Database(sqlx::Error::PoolTimedOut))
        }
    }

    #[actix_web::test]
    async fn store_failures_surface_as_store_errors() {
        let svc = service_with(Arc::new(DownStore));
        let err = svc.clock_in("u1", jan15(9, 0, 0)).await.unwrap_err();
        assert!(matches!(err, AttendanceError::Store(StoreError::Database(_))));
    }
}
