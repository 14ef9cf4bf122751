use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

pub const DEFAULT_AUTO_CLOSE_DAYS: i64 = 7;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 5000;

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub host: String,
    pub port: u16,
    pub notification_webhook_url: Option<String>,
    pub workflow: WorkflowSettings,
}

#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub auto_close_after: chrono::Duration,
    pub sweep_interval: Duration,
    pub lock_timeout: Duration,
    /// Roles allowed to close a resolved bug; empty means anyone.
    pub close_roles: Vec<String>,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            auto_close_after: chrono::Duration::days(DEFAULT_AUTO_CLOSE_DAYS),
            sweep_interval: Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            lock_timeout: Duration::from_millis(DEFAULT_LOCK_TIMEOUT_MS),
            close_roles: Vec::new(),
        }
    }
}

/// Reads settings from the process environment. Call `dotenv()` first to pick up `.env`.
pub fn get_configuration() -> anyhow::Result<Settings> {
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET must be set")?;

    let workflow = WorkflowSettings {
        auto_close_after: auto_close_period(parse_var("AUTO_CLOSE_AFTER_DAYS", DEFAULT_AUTO_CLOSE_DAYS)?)?,
        sweep_interval: Duration::from_secs(
            parse_var("SWEEP_INTERVAL_SECS", DEFAULT_SWEEP_INTERVAL_SECS)?,
        ),
        lock_timeout: Duration::from_millis(
            parse_var("BUG_LOCK_TIMEOUT_MS", DEFAULT_LOCK_TIMEOUT_MS)?,
        ),
        close_roles: env::var("WORKFLOW_CLOSE_ROLES")
            .map(|raw| split_list(&raw))
            .unwrap_or_default(),
    };

    Ok(Settings {
        database_url,
        jwt_secret,
        host: env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
        port: parse_var("APP_PORT", 8080)?,
        notification_webhook_url: env::var("NOTIFICATION_WEBHOOK_URL")
            .ok()
            .filter(|url| !url.trim().is_empty()),
        workflow,
    })
}

fn parse_var<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{} has an invalid value: {}", key, raw)),
        Err(_) => Ok(default),
    }
}

fn auto_close_period(days: i64) -> anyhow::Result<chrono::Duration> {
    if days < 0 {
        anyhow::bail!("AUTO_CLOSE_AFTER_DAYS must not be negative: {}", days);
    }
    chrono::Duration::try_days(days)
        .with_context(|| format!("AUTO_CLOSE_AFTER_DAYS is out of range: {}", days))
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|role| !role.is_empty())
        .map(str::to_string)
        .collect()
}
