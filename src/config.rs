//! Typed application configuration, loaded from environment variables.
//!
//! Keys and defaults mirror `original_source/src/core/config.py`'s
//! `Settings`. Invalid configuration is fatal at startup.

use crate::errors::AppError;

#[derive(Debug, Clone)]
pub struct Config {
    pub project_name: String,
    pub debug: bool,
    pub data_dir: String,

    pub sec_user_agent: String,

    pub postgres_host: String,
    pub postgres_port: u16,
    pub postgres_db: String,
    pub postgres_user: String,
    pub postgres_password: String,
    pub postgres_pool_min: u32,
    pub postgres_pool_max: u32,

    pub insider_anomaly_threshold: f64,
    pub insider_lookback_days: i64,
    pub insider_cluster_window_days: i64,
    pub insider_ingest_rate_limit: u32,
    pub insider_atom_poll_interval_market: u64,
    pub insider_atom_poll_interval_off: u64,
    pub insider_batch_interval_minutes: u64,
    pub insider_batch_overlap_hours: i64,

    pub openai_api_key: Option<String>,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T, AppError> {
    match std::env::var(key) {
        Ok(v) => v.parse::<T>().map_err(|_| AppError::Validation(format!("invalid value for {key}"))),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        Ok(Self {
            project_name: env_or("PROJECT_NAME", "Insider Sentinel"),
            debug: parse_env("DEBUG", false)?,
            data_dir: env_or("DATA_DIR", "./data"),

            sec_user_agent: env_or("SEC_USER_AGENT", "Insider-Sentinel contact@example.com"),

            postgres_host: env_or("POSTGRES_HOST", "localhost"),
            postgres_port: parse_env("POSTGRES_PORT", 5432)?,
            postgres_db: env_or("POSTGRES_DB", "insider_sentinel"),
            postgres_user: env_or("POSTGRES_USER", "insider_sentinel"),
            postgres_password: env_or("POSTGRES_PASSWORD", ""),
            postgres_pool_min: parse_env("POSTGRES_POOL_MIN", 2)?,
            postgres_pool_max: parse_env("POSTGRES_POOL_MAX", 10)?,

            insider_anomaly_threshold: parse_env("INSIDER_ANOMALY_THRESHOLD", 0.6)?,
            insider_lookback_days: parse_env("INSIDER_LOOKBACK_DAYS", 730)?,
            insider_cluster_window_days: parse_env("INSIDER_CLUSTER_WINDOW_DAYS", 14)?,
            insider_ingest_rate_limit: parse_env("INSIDER_INGEST_RATE_LIMIT", 8)?,
            insider_atom_poll_interval_market: parse_env("INSIDER_ATOM_POLL_INTERVAL_MARKET", 300)?,
            insider_atom_poll_interval_off: parse_env("INSIDER_ATOM_POLL_INTERVAL_OFF", 1800)?,
            insider_batch_interval_minutes: parse_env("INSIDER_BATCH_INTERVAL_MINUTES", 60)?,
            insider_batch_overlap_hours: parse_env("INSIDER_BATCH_OVERLAP_HOURS", 2)?,

            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
        })
    }

    pub fn postgres_dsn(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.postgres_user, self.postgres_password, self.postgres_host, self.postgres_port, self.postgres_db
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_dsn_formats_url() {
        let cfg = Config {
            project_name: "x".into(),
            debug: false,
            data_dir: "./data".into(),
            sec_user_agent: "ua".into(),
            postgres_host: "db".into(),
            postgres_port: 5432,
            postgres_db: "insider".into(),
            postgres_user: "u".into(),
            postgres_password: "p".into(),
            postgres_pool_min: 2,
            postgres_pool_max: 10,
            insider_anomaly_threshold: 0.6,
            insider_lookback_days: 730,
            insider_cluster_window_days: 14,
            insider_ingest_rate_limit: 8,
            insider_atom_poll_interval_market: 300,
            insider_atom_poll_interval_off: 1800,
            insider_batch_interval_minutes: 60,
            insider_batch_overlap_hours: 2,
            openai_api_key: None,
        };
        assert_eq!(cfg.postgres_dsn(), "postgres://u:p@db:5432/insider");
    }
}
