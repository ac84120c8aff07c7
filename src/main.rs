use std::sync::Arc;

use actix_web::middleware::{Logger, NormalizePath};
use actix_web::web::Data;
use actix_web::{App, HttpServer};
use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

mod api;
mod config;
mod db;
mod docs;
mod error;
mod model;
mod routes;
mod service;
mod store;
mod utils;

use config::{Config, StoreBackend};
use db::init_db;

use crate::service::attendance::AttendanceService;
use crate::store::{AttendanceStore, InMemoryAttendanceStore, MySqlAttendanceStore};
use crate::utils::user_locks::UserLocks;
use tracing::{info, warn};
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;
use utoipa_swagger_ui::SwaggerUi;

#[actix_web::main]
async fn main() -> Result<()> {
    dotenv().ok();

    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily(&config.log_dir, "attendance.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_ansi(false)
        .with_target(false)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    info!(
        store = %config.store_backend,
        utc_offset = %config.calendar.offset(),
        "Server starting..."
    );

    let store: Arc<dyn AttendanceStore> = match config.store_backend {
        StoreBackend::Mysql => {
            let url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow!("DATABASE_URL must be set"))?;
            Arc::new(MySqlAttendanceStore::new(init_db(url).await?))
        }
        StoreBackend::Memory => {
            warn!("Using in-memory attendance store; records are lost on restart");
            Arc::new(InMemoryAttendanceStore::new())
        }
    };

    let service = Data::new(AttendanceService::new(
        store,
        config.calendar,
        UserLocks::new(config.user_lock_capacity, config.user_lock_idle),
    ));
    let rate_limit = routes::build_rate_limit(config.rate_attendance_per_min)?;
    let server_addr = config.server_addr.clone();
    let openapi = docs::openapi_for(&config.api_prefix);

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}") // wildcard so JS/CSS assets resolve
                    .url("/api-doc/openapi.json", openapi.clone()),
            )
            .app_data(service.clone())
            .configure(|cfg| routes::configure(cfg, &config, &rate_limit))
    })
    .bind(&server_addr)
    .with_context(|| format!("Failed to bind {server_addr}"))?
    .run()
    .await?;

    Ok(())
}
