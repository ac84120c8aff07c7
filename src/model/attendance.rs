use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const MS_PER_HOUR: i64 = 3_600_000;

/// One work session of a user on a calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(example = json!({
    "id": "7c1b7c0e-52a4-4a5e-9a49-0e8f4f5b2d11",
    "user_id": "u1",
    "date": "2024-01-15",
    "clock_in": "2024-01-15T09:00:00Z",
    "clock_out": "2024-01-15T17:30:00Z",
    "total_hours": 8.5,
    "notes": null,
    "created_at": "2024-01-15T09:00:00Z"
}))]
pub struct AttendanceRecord {
    pub id: String,
    pub user_id: String,
    #[schema(example = "2024-01-15", format = "date", value_type = String)]
    pub date: NaiveDate,
    #[schema(example = "2024-01-15T09:00:00Z", format = "date-time", value_type = String)]
    pub clock_in: DateTime<Utc>,
    /// Absent while the session is open
    #[schema(example = "2024-01-15T17:30:00Z", format = "date-time", value_type = Option<String>)]
    pub clock_out: Option<DateTime<Utc>>,
    /// Worked hours, rounded to 2 decimals. Present only once clocked out.
    #[schema(example = 8.5)]
    pub total_hours: Option<f64>,
    pub notes: Option<String>,
    #[schema(example = "2024-01-15T09:00:00Z", format = "date-time", value_type = String)]
    pub created_at: DateTime<Utc>,
}

impl AttendanceRecord {
    pub fn is_open(&self) -> bool {
        self.clock_out.is_none()
    }

    pub fn state(&self) -> SessionState {
        if self.is_open() {
            SessionState::Open
        } else {
            SessionState::Closed
        }
    }
}

/// Fields supplied by the caller when opening a session. The store assigns
/// `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewAttendance {
    pub user_id: String,
    pub date: NaiveDate,
    pub clock_in: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema,
    strum::EnumString, strum::Display, strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceAction {
    ClockIn,
    ClockOut,
}

/// Where a user stands for the current day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NoSession,
    Open,
    Closed,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TodayStatus {
    pub state: SessionState,
    #[schema(example = "2024-01-15", format = "date", value_type = String)]
    pub date: NaiveDate,
    pub record: Option<AttendanceRecord>,
}

impl TodayStatus {
    pub fn new(date: NaiveDate, record: Option<AttendanceRecord>) -> Self {
        let state = record
            .as_ref()
            .map_or(SessionState::NoSession, AttendanceRecord::state);
        Self {
            state,
            date,
            record,
        }
    }
}

/// Hours between two instants, rounded half-up to 2 decimal places.
///
/// Works on whole milliseconds so the half-up boundary is exact rather than
/// subject to float representation.
pub fn worked_hours(clock_in: DateTime<Utc>, clock_out: DateTime<Utc>) -> f64 {
    let elapsed_ms = (clock_out - clock_in).num_milliseconds();
    let hundredths = (elapsed_ms * 100 + MS_PER_HOUR / 2).div_euclid(MS_PER_HOUR);
    hundredths as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, s).unwrap()
    }

    #[test]
    fn full_day_is_eight_and_a_half_hours() {
        assert_eq!(worked_hours(at(9, 0, 0), at(17, 30, 0)), 8.5);
    }

    #[test]
    fn rounds_half_up_at_the_hundredth_boundary() {
        let start = at(9, 0, 0);
        // 18 seconds is exactly 0.005 hours
        assert_eq!(worked_hours(start, start + Duration::seconds(18)), 0.01);
        assert_eq!(
            worked_hours(start, start + Duration::milliseconds(17_999)),
            0.0
        );
        // 20 minutes = 0.3333.. hours
        assert_eq!(worked_hours(start, at(9, 20, 0)), 0.33);
        // 40 minutes = 0.6666.. hours
        assert_eq!(worked_hours(start, at(9, 40, 0)), 0.67);
    }

    #[test]
    fn action_parses_from_wire_names() {
        assert_eq!("clock_in".parse::<AttendanceAction>().unwrap(), AttendanceAction::ClockIn);
        assert_eq!("clock_out".parse::<AttendanceAction>().unwrap(), AttendanceAction::ClockOut);
        assert!("clockin".parse::<AttendanceAction>().is_err());
        assert_eq!(AttendanceAction::ClockOut.as_ref(), "clock_out");
    }

    #[test]
    fn today_status_follows_record_state() {
        let date = at(0, 0, 0).date_naive();
        assert_eq!(TodayStatus::new(date, None).state, SessionState::NoSession);

        let mut record = AttendanceRecord {
            id: "a".into(),
            user_id: "u1".into(),
            date,
            clock_in: at(9, 0, 0),
            clock_out: None,
            total_hours: None,
            notes: None,
            created_at: at(9, 0, 0),
        };
        assert_eq!(TodayStatus::new(date, Some(record.clone())).state, SessionState::Open);

        record.clock_out = Some(at(10, 0, 0));
        record.total_hours = Some(1.0);
        assert_eq!(TodayStatus::new(date, Some(record)).state, SessionState::Closed);
    }
}
