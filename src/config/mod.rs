use anyhow::{anyhow, Result};
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub http_addr: String,
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_timeout_seconds: u64,
    pub db_idle_timeout_seconds: u64,
    pub db_max_lifetime_seconds: u64,
    pub like_window_ms: u64,
    pub limiter_retention_seconds: u64,
    pub limiter_sweep_interval_seconds: u64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let http_addr = env_or("HTTP_ADDR", "0.0.0.0:8080");
        let _parsed_http_addr = SocketAddr::from_str(&http_addr)
            .map_err(|err| anyhow!("invalid HTTP_ADDR: {}", err))?;

        let config = Self {
            http_addr,
            database_url: env_or_err("DATABASE_URL")?,
            db_max_connections: env_or_parse("DB_MAX_CONNECTIONS", "25")?,
            db_connect_timeout_seconds: env_or_parse("DB_CONNECT_TIMEOUT_SECONDS", "5")?,
            db_idle_timeout_seconds: env_or_parse("DB_IDLE_TIMEOUT_SECONDS", "300")?,
            db_max_lifetime_seconds: env_or_parse("DB_MAX_LIFETIME_SECONDS", "1800")?,
            like_window_ms: env_or_parse("LIKE_WINDOW_MS", "1000")?,
            limiter_retention_seconds: env_or_parse("LIMITER_RETENTION_SECONDS", "600")?,
            limiter_sweep_interval_seconds: env_or_parse("LIMITER_SWEEP_INTERVAL_SECONDS", "60")?,
        };

        // The sweep keeps entries long enough to outlive any open window.
        if config.limiter_retention_seconds * 1000 <= config.like_window_ms {
            return Err(anyhow!(
                "LIMITER_RETENTION_SECONDS must exceed LIKE_WINDOW_MS"
            ));
        }

        Ok(config)
    }

    pub fn like_window(&self) -> Duration {
        Duration::from_millis(self.like_window_ms)
    }

    pub fn limiter_retention(&self) -> Duration {
        Duration::from_secs(self.limiter_retention_seconds)
    }

    pub fn limiter_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.limiter_sweep_interval_seconds)
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_or_err(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| anyhow!("missing required env var: {}", key))
}

fn env_or_parse<T>(key: &str, default: &str) -> Result<T>
where
    T: FromStr,
    <T as FromStr>::Err: std::fmt::Display,
{
    let value = std::env::var(key).unwrap_or_else(|_| default.to_string());
    value
        .parse::<T>()
        .map_err(|err| anyhow!("invalid {}: {}", key, err))
}
