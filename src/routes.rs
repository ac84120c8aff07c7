use crate::{
    api::{attendance, health},
    config::Config,
    error::{AttendanceError, ValidationError},
};
use actix_governor::{
    Governor, GovernorConfig, GovernorConfigBuilder, PeerIpKeyExtractor,
    governor::middleware::NoOpMiddleware,
};
use actix_web::web;
use anyhow::{Result, anyhow};

pub type RateLimit = GovernorConfig<PeerIpKeyExtractor, NoOpMiddleware>;

/// Per-IP limiter allowing `requests_per_min` with an equal burst.
pub fn build_rate_limit(requests_per_min: u32) -> Result<RateLimit> {
    let per_ms = 60_000 / u64::from(requests_per_min.max(1));

    GovernorConfigBuilder::default()
        .milliseconds_per_request(per_ms.max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow!("invalid rate limit: {requests_per_min} requests per minute"))
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, rate_limit: &RateLimit) {
    cfg.service(health::health_check);

    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(Governor::new(rate_limit))
            .configure(attendance_routes),
    );
}

/// `/attendance` resources and the extractor configs that turn malformed
/// input into typed validation errors.
pub fn attendance_routes(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default().error_handler(|err, _req| {
        AttendanceError::from(ValidationError::InvalidBody {
            reason: err.to_string(),
        })
        .into()
    });
    let query_config = web::QueryConfig::default().error_handler(|err, _req| {
        AttendanceError::from(ValidationError::InvalidBody {
            reason: err.to_string(),
        })
        .into()
    });

    cfg.app_data(json_config).app_data(query_config).service(
        web::scope("/attendance")
            // /attendance
            .service(
                web::resource("")
                    .route(web::get().to(attendance::list_attendance))
                    .route(web::post().to(attendance::record_attendance)),
            )
            // /attendance/today
            .service(web::resource("/today").route(web::get().to(attendance::today_status))),
    );
}
