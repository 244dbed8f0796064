//! Configuration for the orchestration core.
//!
//! Everything can be set via environment variables:
//! - `TASKDECK_BACKEND_URL` - Required. Base URL of the task-execution backend.
//! - `TASKDECK_HTTP_TIMEOUT_SECS` - Optional. Per-request timeout. Defaults to `10`.
//! - `TASKDECK_PROBE_INTERVAL_SECS` - Optional. Health probe interval. Defaults to `30`.
//! - `TASKDECK_CACHE_TTL_SECS` - Optional. Short cache TTL. Defaults to `15`.
//! - `TASKDECK_CACHE_HARD_TTL_SECS` - Optional. Hard staleness boundary. Defaults to `30`.
//! - `TASKDECK_PREFS_PATH` - Optional. Prefs file location. Defaults to `.taskdeck/prefs.json`.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::health::HealthConfig;
use crate::retry::RetryPolicy;
use crate::store::{CacheTtl, StoreConfig};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Core configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the task-execution backend
    pub backend_url: String,

    /// Per-request HTTP timeout
    pub http_timeout: Duration,

    /// Health monitor settings
    pub health: HealthConfig,

    /// Cache TTL tiers and retry policy for the store
    pub store: StoreConfig,

    /// Where the prefs blob lives
    pub prefs_path: PathBuf,
}

fn env_secs(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    /// Returns `ConfigError::MissingEnvVar` if `TASKDECK_BACKEND_URL` is
    /// not set, or `InvalidValue` for unparseable durations.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend_url = std::env::var("TASKDECK_BACKEND_URL")
            .map_err(|_| ConfigError::MissingEnvVar("TASKDECK_BACKEND_URL".to_string()))?;

        let http_timeout = Duration::from_secs(env_secs("TASKDECK_HTTP_TIMEOUT_SECS", 10)?);
        let probe_interval = Duration::from_secs(env_secs("TASKDECK_PROBE_INTERVAL_SECS", 30)?);
        let short_ttl = Duration::from_secs(env_secs("TASKDECK_CACHE_TTL_SECS", 15)?);
        let hard_ttl = Duration::from_secs(env_secs("TASKDECK_CACHE_HARD_TTL_SECS", 30)?);

        let prefs_path = std::env::var("TASKDECK_PREFS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".taskdeck/prefs.json"));

        Ok(Self {
            backend_url,
            http_timeout,
            health: HealthConfig::with_interval(probe_interval),
            store: StoreConfig {
                ttl: CacheTtl {
                    short: short_ttl,
                    long: hard_ttl.max(short_ttl),
                    ..CacheTtl::default()
                },
                retry: RetryPolicy::default(),
            },
            prefs_path,
        })
    }

    /// Create a config with custom values (useful for testing).
    pub fn new(backend_url: impl Into<String>) -> Self {
        Self {
            backend_url: backend_url.into(),
            http_timeout: Duration::from_secs(10),
            health: HealthConfig::default(),
            store: StoreConfig::default(),
            prefs_path: PathBuf::from(".taskdeck/prefs.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uses_sane_defaults() {
        let config = Config::new("http://localhost:8080");
        assert_eq!(config.backend_url, "http://localhost:8080");
        assert_eq!(config.store.ttl.short, Duration::from_secs(15));
        assert_eq!(config.store.ttl.long, Duration::from_secs(30));
        assert_eq!(config.health.interval, Duration::from_secs(30));
    }
}
