use std::env;
use std::time::Duration;

use crate::error::EngineError;

/// Platform-safe floor for the fetch rate gate (§4.1): never allow a deployment to
/// accidentally hammer the source site regardless of misconfiguration.
const MIN_RATE_LIMIT_SECONDS: u64 = 2;

/// Typed configuration loaded once at process start (C11, §4.11).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub scheduler_enabled: bool,
    pub scheduler_timezone: chrono_tz::Tz,
    pub rate_limit: Duration,
    pub fetch_max_retries: u32,
    pub fetch_timeout: Duration,
    pub notifier_webhook_url: Option<String>,
    pub notifier_webhook_token: Option<String>,
    pub http_port: u16,
}

impl Settings {
    /// Parses and validates the environment into `Settings`, failing fast with a
    /// `ConfigError` the way a missing `DATABASE_URL` should abort startup rather than
    /// surface as a confusing failure three layers down.
    pub fn from_env() -> Result<Self, EngineError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| EngineError::Config("DATABASE_URL is required".to_string()))?;

        let scheduler_enabled = env_bool("SCHEDULER_ENABLED", false)?;

        let scheduler_timezone = match env::var("SCHEDULER_TIMEZONE") {
            Ok(tz) => tz.parse::<chrono_tz::Tz>().map_err(|_| {
                EngineError::Config(format!("SCHEDULER_TIMEZONE '{tz}' is not a valid timezone"))
            })?,
            Err(_) => chrono_tz::Europe::Warsaw,
        };

        let configured_rate = env_u64("RATE_LIMIT_SECONDS", 12)?;
        if configured_rate < MIN_RATE_LIMIT_SECONDS {
            tracing::warn!(
                configured = configured_rate,
                floor = MIN_RATE_LIMIT_SECONDS,
                "RATE_LIMIT_SECONDS below platform-safe minimum, clamping up"
            );
        }
        let rate_limit = Duration::from_secs(configured_rate.max(MIN_RATE_LIMIT_SECONDS));

        let fetch_max_retries = env_u64("FETCH_MAX_RETRIES", 2)? as u32;
        let fetch_timeout = Duration::from_secs(env_u64("FETCH_TIMEOUT_SECONDS", 30)?);

        let notifier_webhook_url = env::var("NOTIFIER_WEBHOOK_URL").ok();
        let notifier_webhook_token = env::var("NOTIFIER_WEBHOOK_TOKEN").ok();

        let http_port = env_u64("HTTP_PORT", 3000)? as u16;

        Ok(Settings {
            database_url,
            scheduler_enabled,
            scheduler_timezone,
            rate_limit,
            fetch_max_retries,
            fetch_timeout,
            notifier_webhook_url,
            notifier_webhook_token,
            http_port,
        })
    }
}

fn env_bool(key: &str, default: bool) -> Result<bool, EngineError> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(v) => match v.to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "0" | "false" | "no" => Ok(false),
            other => Err(EngineError::Config(format!("{key} has invalid boolean value '{other}'"))),
        },
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64, EngineError> {
    match env::var(key) {
        Err(_) => Ok(default),
        Ok(v) => v
            .parse::<u64>()
            .map_err(|_| EngineError::Config(format!("{key} has invalid integer value '{v}'"))),
    }
}
