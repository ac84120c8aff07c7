use std::fmt;

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::{Display, Error, From};
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::attendance::AttendanceAction;

/// Every failure an attendance operation can report.
#[derive(Debug, Display, Error, From)]
pub enum AttendanceError {
    #[display(fmt = "{}", _0)]
    Validation(ValidationError),
    #[display(fmt = "{}", _0)]
    Conflict(ConflictError),
    #[display(fmt = "{}", _0)]
    Store(StoreError),
}

pub type AttendanceResult<T> = Result<T, AttendanceError>;

/// Missing or malformed caller input.
#[derive(Debug, Display, Error, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ValidationError {
    #[display(fmt = "User ID required")]
    MissingUserId,
    #[display(fmt = "User ID and action required")]
    MissingUserIdOrAction,
    #[display(fmt = "Invalid action")]
    InvalidAction,
    #[display(fmt = "Invalid date '{}', expected YYYY-MM-DD", value)]
    InvalidDate { value: String },
    #[display(fmt = "Invalid request body: {}", reason)]
    InvalidBody { reason: String },
    #[display(fmt = "Clock-out time must be after clock-in time")]
    ClockOutBeforeClockIn,
}

/// A business rule of the daily session lifecycle was violated.
#[derive(Debug, Error, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ConflictError {
    AlreadyOpen,
    /// The day's session is already closed; `action` is what was attempted.
    AlreadyClosed { action: AttendanceAction },
    NoOpenSession,
}

impl fmt::Display for ConflictError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ConflictError::AlreadyOpen => "Already clocked in today",
            ConflictError::AlreadyClosed {
                action: AttendanceAction::ClockIn,
            } => "Already completed attendance for today",
            ConflictError::AlreadyClosed {
                action: AttendanceAction::ClockOut,
            } => "Already clocked out today",
            ConflictError::NoOpenSession => "No clock-in record found for today",
        };
        f.write_str(message)
    }
}

/// Failure reported by the record store.
#[derive(Debug, Display, Error)]
pub enum StoreError {
    /// A row already exists for the same (user_id, date).
    #[display(fmt = "attendance record already exists for this user and date")]
    Conflict,
    #[display(fmt = "database error: {}", _0)]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            // integrity constraint violation
            if db_err.code().as_deref() == Some("23000") {
                return StoreError::Conflict;
            }
        }
        StoreError::Database(e)
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorBody {
    #[schema(example = "Already clocked in today")]
    pub error: String,
    #[schema(example = "already_open")]
    pub code: String,
}

impl AttendanceError {
    /// Stable, machine-matchable identifier of the failure.
    pub fn code(&self) -> &'static str {
        match self {
            AttendanceError::Validation(e) => e.into(),
            AttendanceError::Conflict(e) => e.into(),
            AttendanceError::Store(_) => "internal_error",
        }
    }
}

impl ResponseError for AttendanceError {
    fn status_code(&self) -> StatusCode {
        match self {
            AttendanceError::Validation(_) | AttendanceError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            AttendanceError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let error = match self {
            AttendanceError::Store(_) => "Internal server error".to_string(),
            other => other.to_string(),
        };

        HttpResponse::build(self.status_code()).json(ErrorBody {
            error,
            code: self.code().to_string(),
        })
    }
}
