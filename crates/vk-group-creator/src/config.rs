//! Environment-derived service configuration.
//!
//! The embedding process calls [`Config::from_env`] once at startup.
//! Required variables fail fast with a [`ConfigError`]; everything else has
//! a production default.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default VK API version sent with every call.
pub const DEFAULT_API_VERSION: &str = "5.199";

/// OAuth scope required for the full provisioning sequence.
pub const DEFAULT_SCOPE: &str = "groups,photos,wall,market,docs";

#[derive(Debug, Clone)]
pub struct Config {
    pub vk: VkSettings,
    pub queue: QueueSettings,
    /// 64-char hex key for token encryption at rest.
    pub encryption_key: SecretString,
    pub database_path: PathBuf,
}

/// Settings for the VK API client and OAuth exchange.
#[derive(Debug, Clone)]
pub struct VkSettings {
    pub client_id: String,
    pub client_secret: SecretString,
    pub redirect_uri: String,
    pub api_version: String,
    pub base_url: String,
    pub oauth_base_url: String,
    pub scope: String,
    /// Per-request timeout; exceeding it counts as a transport failure.
    pub timeout: Duration,
    /// Attempt ceiling for the API client's retry loop.
    pub retry_attempts: u32,
    /// Base delay for exponential backoff between retries.
    pub retry_delay: Duration,
}

/// Settings for the job queue runtime.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// Concurrent group-creation jobs. Kept small on purpose: the VK API is
    /// rate-sensitive per account, so this is admission control.
    pub group_concurrency: usize,
    /// Concurrent post-scheduling jobs (single low-risk calls).
    pub post_concurrency: usize,
    /// Whole-job attempt cap before a job is terminally failed.
    pub job_attempts: u32,
    /// Base delay for exponential backoff between whole-job attempts.
    pub job_backoff: Duration,
    /// Bounded capacity of each queue channel.
    pub capacity: usize,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            group_concurrency: 2,
            post_concurrency: 5,
            job_attempts: 3,
            job_backoff: Duration::from_millis(2000),
            capacity: 64,
        }
    }
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// Required: `VK_CLIENT_ID`, `VK_CLIENT_SECRET`, `ENCRYPTION_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vk = VkSettings {
            client_id: require_env("VK_CLIENT_ID")?,
            client_secret: SecretString::from(require_env("VK_CLIENT_SECRET")?),
            redirect_uri: optional_env("VK_REDIRECT_URI")?
                .unwrap_or_else(|| "http://localhost:3001/api/v1/oauth/callback".to_string()),
            api_version: optional_env("VK_API_VERSION")?
                .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
            base_url: optional_env("VK_API_BASE_URL")?
                .unwrap_or_else(|| "https://api.vk.com".to_string()),
            oauth_base_url: optional_env("VK_OAUTH_BASE_URL")?
                .unwrap_or_else(|| "https://oauth.vk.com".to_string()),
            scope: optional_env("VK_SCOPE")?.unwrap_or_else(|| DEFAULT_SCOPE.to_string()),
            timeout: Duration::from_millis(parse_env("VK_TIMEOUT_MS", 30_000)?),
            retry_attempts: parse_env("VK_RETRY_ATTEMPTS", 3)? as u32,
            retry_delay: Duration::from_millis(parse_env("VK_RETRY_DELAY_MS", 1_000)?),
        };

        let queue = QueueSettings {
            group_concurrency: parse_env("QUEUE_GROUP_CONCURRENCY", 2)? as usize,
            post_concurrency: parse_env("QUEUE_POST_CONCURRENCY", 5)? as usize,
            job_attempts: parse_env("QUEUE_JOB_ATTEMPTS", 3)? as u32,
            job_backoff: Duration::from_millis(parse_env("QUEUE_JOB_BACKOFF_MS", 2_000)?),
            capacity: parse_env("QUEUE_CAPACITY", 64)? as usize,
        };

        let encryption_key = SecretString::from(require_env("ENCRYPTION_KEY")?);

        let database_path = match optional_env("DATABASE_PATH")? {
            Some(p) => PathBuf::from(p),
            None => default_database_path().ok_or(ConfigError::NoDatabasePath)?,
        };

        Ok(Self {
            vk,
            queue,
            encryption_key,
            database_path,
        })
    }
}

/// Canonical database location: `~/.vk-group-creator/data/groups.db`.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".vk-group-creator").join("data").join("groups.db"))
}

fn require_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        Ok(_) => Err(ConfigError::MissingEnv { name }),
        Err(std::env::VarError::NotPresent) => Err(ConfigError::MissingEnv { name }),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::EnvNotUnicode { name }),
    }
}

fn optional_env(name: &'static str) -> Result<Option<String>, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(Some(value)),
        Ok(_) => Ok(None),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(std::env::VarError::NotUnicode(_)) => Err(ConfigError::EnvNotUnicode { name }),
    }
}

fn parse_env(name: &'static str, default: u64) -> Result<u64, ConfigError> {
    match optional_env(name)? {
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            name,
            reason: format!("'{}' is not a non-negative integer", value),
        }),
        None => Ok(default),
    }
}
