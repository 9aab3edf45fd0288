//! Application configuration. Store endpoint, write retry tuning and the
//! shutdown grace period.

use crate::usecases::RetryPolicy;
use crate::usecases::ledger_service::DEFAULT_SHUTDOWN_GRACE;
use config::builder::{ConfigBuilder, DefaultState};
use serde::Deserialize;
use std::time::Duration;

/// Default number of tries per store write (first attempt included).
pub const DEFAULT_WRITE_ATTEMPTS: u32 = 4;

/// Default delay before the first write retry; doubles per retry.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 250;

/// Upper bound for a single retry delay.
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize, Default)]
pub struct AppConfig {
    /// Realtime database endpoint, e.g. `https://<db>.firebaseio.com`. Read from ROAD_WALLET_DB.
    #[serde(default)]
    pub db: Option<String>,

    /// Tries per store write before giving up and showing a notice. Read from ROAD_WALLET_WRITE_ATTEMPTS.
    #[serde(default)]
    pub write_attempts: Option<u32>,

    /// First retry delay in ms. Read from ROAD_WALLET_RETRY_BACKOFF_MS.
    #[serde(default)]
    pub retry_backoff_ms: Option<u64>,

    /// How long quitting waits for unsaved writes, in ms. Read from ROAD_WALLET_SHUTDOWN_GRACE_MS.
    #[serde(default)]
    pub shutdown_grace_ms: Option<u64>,
}

impl AppConfig {
    /// Fails on unreadable files and on values of the wrong type; callers
    /// should not paper over that with defaults.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();
        let mut c = config::Config::builder();
        if let Ok(path) = std::env::var("ROAD_WALLET_CONFIG") {
            c = c.add_source(config::File::with_name(&path));
        }
        // Environment wins over the file.
        c = c.add_source(config::Environment::with_prefix("ROAD_WALLET").try_parsing(true));
        Self::from_builder(c)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, config::ConfigError> {
        builder.build()?.try_deserialize()
    }

    /// Store endpoint, if set and non-blank.
    pub fn database_url(&self) -> Option<String> {
        self.db
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Returns write attempts. Defaults to DEFAULT_WRITE_ATTEMPTS if unset; never below 1.
    pub fn write_attempts_or_default(&self) -> u32 {
        self.write_attempts.unwrap_or(DEFAULT_WRITE_ATTEMPTS).max(1)
    }

    /// Returns the first retry delay in milliseconds. Defaults to 250.
    pub fn retry_backoff_ms_or_default(&self) -> u64 {
        self.retry_backoff_ms.unwrap_or(DEFAULT_RETRY_BACKOFF_MS)
    }

    pub fn shutdown_grace(&self) -> Duration {
        self.shutdown_grace_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_SHUTDOWN_GRACE)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let base_delay = Duration::from_millis(self.retry_backoff_ms_or_default());
        RetryPolicy {
            max_attempts: self.write_attempts_or_default(),
            base_delay,
            max_delay: MAX_RETRY_BACKOFF.max(base_delay),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.database_url(), None);
        assert_eq!(cfg.write_attempts_or_default(), DEFAULT_WRITE_ATTEMPTS);
        assert_eq!(
            cfg.retry_policy().base_delay,
            Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS)
        );
    }

    #[test]
    fn test_blank_endpoint_is_unset() {
        let cfg = AppConfig {
            db: Some("   ".into()),
            ..Default::default()
        };
        assert_eq!(cfg.database_url(), None);

        let cfg = AppConfig {
            db: Some(" https://trip.firebaseio.com ".into()),
            ..Default::default()
        };
        assert_eq!(
            cfg.database_url().as_deref(),
            Some("https://trip.firebaseio.com")
        );
    }

    #[test]
    fn test_retry_policy_from_values() {
        let cfg = AppConfig {
            write_attempts: Some(0),
            retry_backoff_ms: Some(10_000),
            ..Default::default()
        };
        let policy = cfg.retry_policy();
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.base_delay, Duration::from_secs(10));
        assert_eq!(policy.max_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_deserializes_from_config_source() {
        let cfg = AppConfig::from_builder(
            config::Config::builder()
                .set_override("db", "https://trip.firebaseio.com")
                .unwrap()
                .set_override("write_attempts", 2i64)
                .unwrap(),
        )
        .unwrap();
        assert_eq!(cfg.database_url().as_deref(), Some("https://trip.firebaseio.com"));
        assert_eq!(cfg.write_attempts_or_default(), 2);
        assert_eq!(cfg.retry_backoff_ms_or_default(), DEFAULT_RETRY_BACKOFF_MS);
        assert_eq!(cfg.shutdown_grace(), DEFAULT_SHUTDOWN_GRACE);
    }

    #[test]
    fn test_bad_value_is_an_error_not_defaults() {
        let res = AppConfig::from_builder(
            config::Config::builder()
                .set_override("db", "https://trip.firebaseio.com")
                .unwrap()
                .set_override("write_attempts", "four")
                .unwrap(),
        );
        assert!(res.is_err());
    }

    #[test]
    fn test_shutdown_grace_from_value() {
        let cfg = AppConfig {
            shutdown_grace_ms: Some(1500),
            ..Default::default()
        };
        assert_eq!(cfg.shutdown_grace(), Duration::from_millis(1500));
    }
}
