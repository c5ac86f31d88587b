use std::path::PathBuf;
use std::str::FromStr;

use propdesk_core::rate_limit::RateLimitPolicy;
use propdesk_core::uploads::MAX_UPLOAD_BYTES;

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// Defaults suit local development; production overrides via the
/// environment (or a `.env` file loaded by `dotenvy`).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// How long post-shutdown cleanup may take before tasks are abandoned.
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub rate_limit: RateLimitConfig,
    pub storage: StorageConfig,
    pub ai: AiConfig,
    pub billing: BillingConfig,
    pub housekeeping: HousekeepingConfig,
}

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Redis is optional; without it counters live in process memory.
    pub redis_url: Option<String>,
    pub api: RateLimitPolicy,
    pub auth: RateLimitPolicy,
    pub upload: RateLimitPolicy,
    pub ai: RateLimitPolicy,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redis_url: None,
            api: RateLimitPolicy::API,
            auth: RateLimitPolicy::AUTH,
            upload: RateLimitPolicy::UPLOAD,
            ai: RateLimitPolicy::AI,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub s3_bucket: Option<String>,
    pub s3_public_base_url: Option<String>,
    pub s3_endpoint: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    /// AI drafting is disabled when unset.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Default)]
pub struct BillingConfig {
    /// The webhook endpoint answers 503 when unset.
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HousekeepingConfig {
    pub interval_secs: u64,
    pub job_archive_after_days: i32,
    pub notification_retention_days: i32,
}

impl Default for HousekeepingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 3600,
            job_archive_after_days: 90,
            notification_retention_days: 30,
        }
    }
}

pub const DEFAULT_AI_MODEL: &str = "claude-sonnet-4-5";
pub const DEFAULT_AI_BASE_URL: &str = "https://api.anthropic.com";

/// Tracing filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "propdesk_api=debug,tower_http=debug";

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                      | Default                   |
    /// |------------------------------|---------------------------|
    /// | `HOST`                       | `0.0.0.0`                 |
    /// | `PORT`                       | `3000`                    |
    /// | `CORS_ORIGINS`               | `http://localhost:5173`   |
    /// | `REQUEST_TIMEOUT_SECS`       | `30`                      |
    /// | `SHUTDOWN_TIMEOUT_SECS`      | `30`                      |
    /// | `RATE_LIMIT_ENABLED`         | `true`                    |
    /// | `REDIS_URL`                  | unset                     |
    /// | `RATE_LIMIT_*_POINTS`        | policy presets            |
    /// | `UPLOAD_DIR`                 | `./uploads`               |
    /// | `UPLOAD_MAX_BYTES`           | `10485760`                |
    /// | `S3_BUCKET`                  | unset                     |
    /// | `S3_PUBLIC_BASE_URL`         | unset                     |
    /// | `S3_ENDPOINT`                | unset                     |
    /// | `ANTHROPIC_API_KEY`          | unset                     |
    /// | `ANTHROPIC_MODEL`            | `claude-sonnet-4-5`       |
    /// | `ANTHROPIC_BASE_URL`         | `https://api.anthropic.com` |
    /// | `BILLING_WEBHOOK_SECRET`     | unset                     |
    /// | `HOUSEKEEPING_INTERVAL_SECS` | `3600`                    |
    /// | `JOB_ARCHIVE_AFTER_DAYS`     | `90`                      |
    /// | `NOTIFICATION_RETENTION_DAYS`| `30`                      |
    ///
    /// # Panics
    ///
    /// Panics on unparseable values so misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let cors_origins: Vec<String> = env_string("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let rate_limit = RateLimitConfig {
            enabled: env_parse("RATE_LIMIT_ENABLED", true),
            redis_url: env_string("REDIS_URL"),
            api: RateLimitPolicy::API
                .with_points(env_parse("RATE_LIMIT_API_POINTS", RateLimitPolicy::API.points)),
            auth: RateLimitPolicy::AUTH
                .with_points(env_parse("RATE_LIMIT_AUTH_POINTS", RateLimitPolicy::AUTH.points)),
            upload: RateLimitPolicy::UPLOAD.with_points(env_parse(
                "RATE_LIMIT_UPLOAD_POINTS",
                RateLimitPolicy::UPLOAD.points,
            )),
            ai: RateLimitPolicy::AI
                .with_points(env_parse("RATE_LIMIT_AI_POINTS", RateLimitPolicy::AI.points)),
        };

        let storage = StorageConfig {
            upload_dir: env_string("UPLOAD_DIR")
                .unwrap_or_else(|| "./uploads".into())
                .into(),
            max_upload_bytes: env_parse("UPLOAD_MAX_BYTES", MAX_UPLOAD_BYTES),
            s3_bucket: env_string("S3_BUCKET"),
            s3_public_base_url: env_string("S3_PUBLIC_BASE_URL"),
            s3_endpoint: env_string("S3_ENDPOINT"),
        };

        let ai = AiConfig {
            api_key: env_string("ANTHROPIC_API_KEY"),
            model: env_string("ANTHROPIC_MODEL").unwrap_or_else(|| DEFAULT_AI_MODEL.into()),
            base_url: env_string("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_AI_BASE_URL.into()),
        };

        let defaults = HousekeepingConfig::default();
        let housekeeping = HousekeepingConfig {
            interval_secs: env_parse("HOUSEKEEPING_INTERVAL_SECS", defaults.interval_secs),
            job_archive_after_days: env_parse(
                "JOB_ARCHIVE_AFTER_DAYS",
                defaults.job_archive_after_days,
            ),
            notification_retention_days: env_parse(
                "NOTIFICATION_RETENTION_DAYS",
                defaults.notification_retention_days,
            ),
        };

        Self {
            host: env_string("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: env_parse("PORT", 3000),
            cors_origins,
            request_timeout_secs: env_parse("REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_parse("SHUTDOWN_TIMEOUT_SECS", 30),
            jwt: JwtConfig::from_env(),
            rate_limit,
            storage,
            ai,
            billing: BillingConfig {
                webhook_secret: env_string("BILLING_WEBHOOK_SECRET"),
            },
            housekeeping,
        }
    }
}

/// Non-empty value of `name`, if set.
fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(name: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(name) {
        Some(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{name} has an invalid value '{raw}': {e}")),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_log_filter_parses() {
        assert!(tracing_subscriber::EnvFilter::try_new(DEFAULT_LOG_FILTER).is_ok());
        assert!(DEFAULT_LOG_FILTER.contains("tower_http=debug"));
    }
}
