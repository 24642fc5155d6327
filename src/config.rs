use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;

use crate::domain::aggregation::WorkPolicy;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,
    pub access_token_ttl: usize,
    pub refresh_token_ttl: usize,

    // Per-IP rate limiting
    pub rate_login_per_min: u32,
    pub rate_refresh_per_min: u32,
    pub rate_protected_per_min: u32,

    // Keyed login throttling
    pub login_max_attempts: u32,
    pub login_window_secs: u64,
    pub rate_limiter_capacity: u64,

    pub api_prefix: String,
    pub log_dir: String,

    // Work policy
    pub standard_shift_minutes: i32,
    pub night_start_hour: u32,
    pub night_end_hour: u32,
    pub work_utc_offset_minutes: i32,
    pub fiscal_year_start_month: u32,
    pub overtime_alert_minutes: i32,
}

/// Reads `key`, falling back to `default` when unset.
fn var_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        Err(_) => Ok(default),
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let config = Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            access_token_ttl: var_or("ACCESS_TOKEN_TTL", 900)?, // 15 min
            refresh_token_ttl: var_or("REFRESH_TOKEN_TTL", 604_800)?, // 7 days

            rate_login_per_min: var_or("RATE_LOGIN_PER_MIN", 60)?,
            rate_refresh_per_min: var_or("RATE_REFRESH_PER_MIN", 30)?,
            rate_protected_per_min: var_or("RATE_PROTECTED_PER_MIN", 1000)?,

            login_max_attempts: var_or("LOGIN_MAX_ATTEMPTS", 5)?,
            login_window_secs: var_or("LOGIN_WINDOW_SECS", 60)?,
            rate_limiter_capacity: var_or("RATE_LIMITER_CAPACITY", 10_000)?,

            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),

            standard_shift_minutes: var_or("STANDARD_SHIFT_MINUTES", 480)?,
            night_start_hour: var_or("NIGHT_START_HOUR", 22)?,
            night_end_hour: var_or("NIGHT_END_HOUR", 5)?,
            work_utc_offset_minutes: var_or("WORK_UTC_OFFSET_MINUTES", 540)?,
            fiscal_year_start_month: var_or("FISCAL_YEAR_START_MONTH", 4)?,
            overtime_alert_minutes: var_or("OVERTIME_ALERT_MINUTES", 2700)?,
        };

        if config.night_start_hour > 23 || config.night_end_hour > 23 {
            anyhow::bail!("NIGHT_START_HOUR and NIGHT_END_HOUR must be between 0 and 23");
        }
        if !(1..=12).contains(&config.fiscal_year_start_month) {
            anyhow::bail!("FISCAL_YEAR_START_MONTH must be between 1 and 12");
        }
        if config.work_utc_offset_minutes.abs() >= 24 * 60 {
            anyhow::bail!("WORK_UTC_OFFSET_MINUTES must be within one day");
        }

        Ok(config)
    }

    pub fn work_policy(&self) -> WorkPolicy {
        WorkPolicy {
            standard_shift_minutes: self.standard_shift_minutes,
            night_start_hour: self.night_start_hour,
            night_end_hour: self.night_end_hour,
            utc_offset_minutes: self.work_utc_offset_minutes,
        }
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        database_url: "mysql://localhost/kintai_test".to_string(),
        jwt_secret: "test-secret".to_string(),
        server_addr: "127.0.0.1:0".to_string(),
        access_token_ttl: 900,
        refresh_token_ttl: 3600,
        rate_login_per_min: 60,
        rate_refresh_per_min: 30,
        rate_protected_per_min: 1000,
        login_max_attempts: 5,
        login_window_secs: 60,
        rate_limiter_capacity: 100,
        api_prefix: "/api".to_string(),
        log_dir: "logs".to_string(),
        standard_shift_minutes: 480,
        night_start_hour: 22,
        night_end_hour: 5,
        work_utc_offset_minutes: 540,
        fiscal_year_start_month: 4,
        overtime_alert_minutes: 2700,
    }
}
