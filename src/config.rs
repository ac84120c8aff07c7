use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

use crate::utils::calendar::CalendarPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StoreBackend {
    Mysql,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_addr: String,
    pub database_url: Option<String>,
    pub store_backend: StoreBackend,
    pub api_prefix: String,

    /// Which calendar day an instant counts toward
    pub calendar: CalendarPolicy,

    // Rate limiting
    pub rate_attendance_per_min: u32,

    // Per-user lock table
    pub user_lock_capacity: u64,
    pub user_lock_idle: Duration,

    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let store_backend: StoreBackend = parse_var("ATTENDANCE_STORE", "mysql")?;
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());
        if store_backend == StoreBackend::Mysql && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL must be set when ATTENDANCE_STORE=mysql"));
        }

        let rate_attendance_per_min: u32 = parse_var("RATE_ATTENDANCE_PER_MIN", "120")?;
        if rate_attendance_per_min == 0 {
            return Err(anyhow!("RATE_ATTENDANCE_PER_MIN must be at least 1"));
        }

        Ok(Self {
            server_addr: env::var("SERVER_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string()),
            database_url,
            store_backend,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            calendar: parse_var("ATTENDANCE_UTC_OFFSET", "UTC")?,
            rate_attendance_per_min,
            user_lock_capacity: parse_var("USER_LOCK_CAPACITY", "100000")?,
            user_lock_idle: Duration::from_secs(parse_var("USER_LOCK_IDLE_SECS", "300")?),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }
}

/// Reads `key`, falling back to `default` when unset, and parses it.
fn parse_var<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse()
        .with_context(|| format!("{key} has an invalid value: '{raw}'"))
}
