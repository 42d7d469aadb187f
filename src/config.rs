use std::env;
use std::str::FromStr;

use chrono::{FixedOffset, NaiveTime, Offset, Utc};
use rust_decimal::Decimal;

use crate::constants::{
    DEFAULT_INVITE_SUBSIDY_PERCENT, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MIN_WITHDRAWAL,
    DEFAULT_SESSION_TTL_SECS, DEFAULT_TASKS_PER_DAY, DEFAULT_UTC_OFFSET_MINUTES,
    DEFAULT_WELCOME_BONUS, DEFAULT_WITHDRAWAL_CLOSE_HOUR, DEFAULT_WITHDRAWAL_OPEN_HOUR,
};

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub database_path: String,
    pub media_root: String,
    pub public_base_url: String,
    pub allowed_origins: Vec<String>,
    pub environment: String,
    pub session_secret: String,
    pub session_ttl_secs: i64,
    /// Offset of the platform's local time zone from UTC, in minutes
    pub utc_offset_minutes: i32,
    pub welcome_bonus: Decimal,
    pub min_withdrawal: Decimal,
    pub withdrawal_open_hour: u32,
    pub withdrawal_close_hour: u32,
    pub invite_subsidy_percent: Decimal,
    pub tasks_per_day: u32,
    pub max_upload_bytes: usize,
    pub admin_phone: Option<String>,
    pub admin_password: Option<String>,
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        // Load .env file if it exists (development)
        dotenvy::dotenv().ok();

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let server_port = parse_var("SERVER_PORT", 8080)?;

        let database_path =
            env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/tier_rewards.db".to_string());
        let media_root = env::var("MEDIA_ROOT").unwrap_or_else(|_| "./media".to_string());
        let public_base_url = env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string())
            .trim_end_matches('/')
            .to_string();

        let allowed_origins = env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let session_secret = env::var("SESSION_SECRET")
            .map_err(|_| "SESSION_SECRET must be set for session token digests")?;
        let session_ttl_secs = parse_var("SESSION_TTL_SECS", DEFAULT_SESSION_TTL_SECS)?;

        let utc_offset_minutes = parse_var("UTC_OFFSET_MINUTES", DEFAULT_UTC_OFFSET_MINUTES)?;
        if FixedOffset::east_opt(utc_offset_minutes * 60).is_none() {
            return Err("Invalid UTC_OFFSET_MINUTES".to_string());
        }

        let welcome_bonus = parse_var("WELCOME_BONUS", Decimal::from(DEFAULT_WELCOME_BONUS))?;
        let min_withdrawal = parse_var("MIN_WITHDRAWAL", Decimal::from(DEFAULT_MIN_WITHDRAWAL))?;

        let withdrawal_open_hour =
            parse_var("WITHDRAWAL_OPEN_HOUR", DEFAULT_WITHDRAWAL_OPEN_HOUR)?;
        let withdrawal_close_hour =
            parse_var("WITHDRAWAL_CLOSE_HOUR", DEFAULT_WITHDRAWAL_CLOSE_HOUR)?;
        if withdrawal_open_hour > withdrawal_close_hour || withdrawal_close_hour > 23 {
            return Err("Invalid WITHDRAWAL_OPEN_HOUR/WITHDRAWAL_CLOSE_HOUR".to_string());
        }

        let invite_subsidy_percent = parse_var(
            "INVITE_SUBSIDY_PERCENT",
            Decimal::from(DEFAULT_INVITE_SUBSIDY_PERCENT),
        )?;
        let tasks_per_day = parse_var("TASKS_PER_DAY", DEFAULT_TASKS_PER_DAY)?;
        let max_upload_bytes = parse_var("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?;

        let admin_phone = env::var("ADMIN_PHONE").ok().filter(|s| !s.is_empty());
        let admin_password = env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty());

        Ok(Config {
            server_host,
            server_port,
            database_path,
            media_root,
            public_base_url,
            allowed_origins,
            environment,
            session_secret,
            session_ttl_secs,
            utc_offset_minutes,
            welcome_bonus,
            min_withdrawal,
            withdrawal_open_hour,
            withdrawal_close_hour,
            invite_subsidy_percent,
            tasks_per_day,
            max_upload_bytes,
            admin_phone,
            admin_password,
        })
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    /// The platform's local time zone
    pub fn local_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes * 60)
            .unwrap_or_else(|| Utc.fix())
    }

    pub fn withdrawal_window(&self) -> (NaiveTime, NaiveTime) {
        let open = NaiveTime::from_hms_opt(self.withdrawal_open_hour, 0, 0)
            .unwrap_or(NaiveTime::MIN);
        let close = NaiveTime::from_hms_opt(self.withdrawal_close_hour, 0, 0)
            .unwrap_or(NaiveTime::MIN);
        (open, close)
    }
}
