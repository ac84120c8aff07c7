use crate::api::attendance::AttendanceActionRequest;
use crate::api::health::HealthResponse;
use crate::error::ErrorBody;
use crate::model::attendance::{AttendanceAction, AttendanceRecord, SessionState, TodayStatus};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Attendance Tracker API",
        version = "0.1.0",
        description = r#"
## Attendance Session Tracker

Daily clock-in / clock-out tracking for employees.

### Session lifecycle
- One session per user per calendar day
- `clock_in` opens it, `clock_out` closes it and records worked hours
- A closed session is final for the day

### Calendar day
The day an instant belongs to is decided by the server's configured UTC
offset (`ATTENDANCE_UTC_OFFSET`, UTC by default).

### Errors
Every error body is `{ "error": <message>, "code": <snake_case code> }`.
Rule violations and bad input return **400**; store failures return an opaque
**500**.
"#,
    ),
    paths(
        crate::api::attendance::list_attendance,
        crate::api::attendance::record_attendance,
        crate::api::attendance::today_status,

        crate::api::health::health_check
    ),
    components(
        schemas(
            AttendanceRecord,
            AttendanceAction,
            AttendanceActionRequest,
            SessionState,
            TodayStatus,
            ErrorBody,
            HealthResponse
        )
    ),
    tags(
        (name = "Attendance", description = "Attendance session APIs"),
        (name = "Health", description = "Service probes"),
    )
)]
pub struct ApiDoc;

/// Prefix the attendance paths are declared under.
const DOCUMENTED_PREFIX: &str = "/api";

/// The OpenAPI document with attendance paths moved under `api_prefix`,
/// so the published routes match what the server mounts.
pub fn openapi_for(api_prefix: &str) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    let api_prefix = api_prefix.trim_end_matches('/');

    doc.paths.paths = std::mem::take(&mut doc.paths.paths)
        .into_iter()
        .map(|(path, item)| match path.strip_prefix(DOCUMENTED_PREFIX) {
            Some(rest) if rest.is_empty() || rest.starts_with('/') => {
                (format!("{api_prefix}{rest}"), item)
            }
            _ => (path, item),
        })
        .collect();
    doc
}
