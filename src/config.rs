use anyhow::Context;
use chrono::FixedOffset;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: String,
    /// Unset means the in-memory store.
    pub database_url: Option<String>,
    pub api_prefix: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub workspace_utc_offset_minutes: i32,
    pub presence_sweep_secs: u64,
    pub presence_session_ttl_hours: u64,

    pub log_dir: String,
    pub log_level: String,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_var<T>(name: &str, default: &str) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = var_or(name, default);
    raw.trim()
        .parse()
        .with_context(|| format!("{name} has an invalid value: {raw:?}"))
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Self {
            server_addr: var_or("SERVER_ADDR", "127.0.0.1:8080"),
            database_url: env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty()),
            api_prefix: var_or("API_PREFIX", "/api"),

            rate_protected_per_min: parse_var("RATE_PROTECTED_PER_MIN", "1000")?,

            workspace_utc_offset_minutes: parse_var("WORKSPACE_UTC_OFFSET_MINUTES", "540")?,
            presence_sweep_secs: parse_var("PRESENCE_SWEEP_SECS", "30")?,
            presence_session_ttl_hours: parse_var("PRESENCE_SESSION_TTL_HOURS", "24")?,

            log_dir: var_or("LOG_DIR", "logs"),
            log_level: var_or("LOG_LEVEL", "debug"),
        };
        config.utc_offset()?;
        Ok(config)
    }

    pub fn utc_offset(&self) -> anyhow::Result<FixedOffset> {
        FixedOffset::east_opt(self.workspace_utc_offset_minutes * 60).with_context(|| {
            format!(
                "WORKSPACE_UTC_OFFSET_MINUTES out of range: {}",
                self.workspace_utc_offset_minutes
            )
        })
    }

    pub fn presence_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.presence_sweep_secs.max(1))
    }

    pub fn presence_session_ttl(&self) -> Duration {
        Duration::from_secs(self.presence_session_ttl_hours.max(1) * 3600)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:8080".into(),
            database_url: None,
            api_prefix: "/api".into(),
            rate_protected_per_min: 1000,
            workspace_utc_offset_minutes: 540,
            presence_sweep_secs: 30,
            presence_session_ttl_hours: 24,
            log_dir: "logs".into(),
            log_level: "debug".into(),
        }
    }
}
