use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::error::{AttendanceError, ValidationError};
use crate::model::attendance::AttendanceAction;
use crate::service::attendance::AttendanceService;

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AttendanceQuery {
    /// Owner of the records
    #[param(example = "u1")]
    pub user_id: Option<String>,
    /// Only records of this day (YYYY-MM-DD)
    #[param(example = "2024-01-15")]
    pub date: Option<String>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct TodayQuery {
    #[param(example = "u1")]
    pub user_id: Option<String>,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceActionRequest {
    #[schema(example = "u1")]
    pub user_id: Option<String>,
    #[schema(example = "clock_in")]
    pub action: Option<String>,
}

impl AttendanceActionRequest {
    /// Presence is checked before the action name, so an empty body reports
    /// the missing fields rather than an unknown action.
    fn validate(&self) -> Result<(&str, AttendanceAction), ValidationError> {
        let user_id = self.user_id.as_deref().map(str::trim).unwrap_or_default();
        let action = self.action.as_deref().map(str::trim).unwrap_or_default();

        if user_id.is_empty() || action.is_empty() {
            return Err(ValidationError::MissingUserIdOrAction);
        }

        let action = action
            .parse::<AttendanceAction>()
            .map_err(|_| ValidationError::InvalidAction)?;

        Ok((user_id, action))
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ValidationError::InvalidDate {
        value: raw.to_string(),
    })
}

fn log_store_failure(err: &AttendanceError, user_id: &str, operation: &str) {
    if let AttendanceError::Store(e) = err {
        tracing::error!(error = %e, user_id, operation, "Attendance store failure");
    }
}

/// List attendance records
#[utoipa::path(
    get,
    path = "/api/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Records of the user, newest date first", body = [crate::model::attendance::AttendanceRecord]),
        (status = 400, description = "User ID missing or date malformed", body = crate::error::ErrorBody, example = json!({
            "error": "User ID required",
            "code": "missing_user_id"
        })),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody)
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    service: web::Data<AttendanceService>,
    query: web::Query<AttendanceQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let user_id = query.user_id.as_deref().unwrap_or_default();
    if user_id.trim().is_empty() {
        return Err(ValidationError::MissingUserId.into());
    }
    let date = query
        .date
        .as_deref()
        .filter(|d| !d.is_empty())
        .map(parse_date)
        .transpose()?;

    let records = service
        .list_for_user(user_id, date)
        .await
        .inspect_err(|e| log_store_failure(e, user_id, "list"))?;

    Ok(HttpResponse::Ok().json(records))
}

/// Clock in or clock out
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body(
        content = AttendanceActionRequest,
        description = "User and action to perform",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Clocked in; the opened record", body = crate::model::attendance::AttendanceRecord),
        (status = 200, description = "Clocked out; the closed record", body = crate::model::attendance::AttendanceRecord),
        (status = 400, description = "Invalid input or attendance rule violated", body = crate::error::ErrorBody, example = json!({
            "error": "Already clocked in today",
            "code": "already_open"
        })),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody, example = json!({
            "error": "Internal server error",
            "code": "internal_error"
        }))
    ),
    tag = "Attendance"
)]
pub async fn record_attendance(
    service: web::Data<AttendanceService>,
    payload: web::Json<AttendanceActionRequest>,
) -> Result<HttpResponse, AttendanceError> {
    let (user_id, action) = payload.validate()?;
    let now = Utc::now();

    match action {
        AttendanceAction::ClockIn => {
            let record = service
                .clock_in(user_id, now)
                .await
                .inspect_err(|e| log_store_failure(e, user_id, action.as_ref()))?;
            Ok(HttpResponse::Created().json(record))
        }
        AttendanceAction::ClockOut => {
            let record = service
                .clock_out(user_id, now)
                .await
                .inspect_err(|e| log_store_failure(e, user_id, action.as_ref()))?;
            Ok(HttpResponse::Ok().json(record))
        }
    }
}

/// Today's session state
#[utoipa::path(
    get,
    path = "/api/attendance/today",
    params(TodayQuery),
    responses(
        (status = 200, description = "State of the current day's session", body = crate::model::attendance::TodayStatus),
        (status = 400, description = "User ID missing", body = crate::error::ErrorBody),
        (status = 500, description = "Internal server error", body = crate::error::ErrorBody)
    ),
    tag = "Attendance"
)]
pub async fn today_status(
    service: web::Data<AttendanceService>,
    query: web::Query<TodayQuery>,
) -> Result<HttpResponse, AttendanceError> {
    let user_id = query.user_id.as_deref().unwrap_or_default();

    let status = service
        .today_status(user_id, Utc::now())
        .await
        .inspect_err(|e| log_store_failure(e, user_id, "today"))?;

    Ok(HttpResponse::Ok().json(status))
}
