//! Orchestrator configuration
//!
//! Everything the service needs is read once at start-up and passed down
//! explicitly; nothing below `main` looks at the environment.

use std::time::Duration;

use quarry_client::{DEFAULT_BASE_URL, ExplorerConfig};

use crate::scheduler::PollSettings;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string; the in-memory store is used when absent
    pub database_url: Option<String>,

    /// Address the HTTP API binds to
    pub bind_addr: String,

    /// Explorer connection and credentials
    pub explorer: ExplorerConfig,

    /// Timeout applied to every explorer request
    pub http_timeout: Duration,

    /// Poll scheduling parameters
    pub poll: PollSettings,

    /// Max polls executing at the same time
    pub max_concurrent_polls: usize,
}

impl Config {
    /// Creates a configuration with defaults and no credentials
    pub fn new() -> Self {
        Self {
            database_url: None,
            bind_addr: "0.0.0.0:8080".to_string(),
            explorer: ExplorerConfig::default(),
            http_timeout: Duration::from_secs(30),
            poll: PollSettings::default(),
            max_concurrent_polls: 16,
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - DATABASE_URL
    /// - QUARRY_BIND_ADDR (default: 0.0.0.0:8080)
    /// - EXPLORER_BASE_URL (default: https://api.allium.so/api/v1)
    /// - EXPLORER_API_KEY, EXPLORER_QUERY_ID (required to submit runs)
    /// - HTTP_TIMEOUT_SECS (default: 30)
    /// - POLL_INTERVAL_SECS (default: 3)
    /// - MAX_POLL_ATTEMPTS (default: 40)
    /// - TRANSPORT_RETRIES (default: 2)
    /// - TRANSPORT_RETRY_DELAY_MS (default: 500)
    /// - MAX_CONCURRENT_POLLS (default: 16)
    pub fn from_env() -> Self {
        let defaults = Self::new();

        let poll = PollSettings {
            poll_interval: env_parse("POLL_INTERVAL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.poll.poll_interval),
            max_attempts: env_parse("MAX_POLL_ATTEMPTS").unwrap_or(defaults.poll.max_attempts),
            transport_retries: env_parse("TRANSPORT_RETRIES")
                .unwrap_or(defaults.poll.transport_retries),
            transport_retry_delay: env_parse("TRANSPORT_RETRY_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll.transport_retry_delay),
        };

        Self {
            database_url: env_string("DATABASE_URL"),
            bind_addr: env_string("QUARRY_BIND_ADDR").unwrap_or(defaults.bind_addr),
            explorer: ExplorerConfig {
                base_url: env_string("EXPLORER_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
                api_key: env_string("EXPLORER_API_KEY"),
                query_id: env_string("EXPLORER_QUERY_ID"),
            },
            http_timeout: env_parse("HTTP_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.http_timeout),
            poll,
            max_concurrent_polls: env_parse("MAX_CONCURRENT_POLLS")
                .unwrap_or(defaults.max_concurrent_polls),
        }
    }

    /// Whether both explorer credentials are present
    pub fn has_credentials(&self) -> bool {
        self.explorer.api_key.is_some() && self.explorer.query_id.is_some()
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.is_empty() {
            anyhow::bail!("bind_addr cannot be empty");
        }

        if !self.explorer.base_url.starts_with("http://")
            && !self.explorer.base_url.starts_with("https://")
        {
            anyhow::bail!("explorer base url must start with http:// or https://");
        }

        if self.poll.poll_interval.is_zero() {
            anyhow::bail!("poll_interval must be greater than 0");
        }

        if self.poll.max_attempts == 0 {
            anyhow::bail!("max_attempts must be greater than 0");
        }

        if self.max_concurrent_polls == 0 {
            anyhow::bail!("max_concurrent_polls must be greater than 0");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|s| s.trim().parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.poll.poll_interval, Duration::from_secs(3));
        assert_eq!(config.poll.max_attempts, 40);
        assert_eq!(config.explorer.base_url, DEFAULT_BASE_URL);
        assert!(!config.has_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();

        config.explorer.base_url = "not-a-url".to_string();
        assert!(config.validate().is_err());
        config.explorer.base_url = "http://localhost:9000".to_string();
        assert!(config.validate().is_ok());

        config.poll.max_attempts = 0;
        assert!(config.validate().is_err());
        config.poll.max_attempts = 1;

        config.poll.poll_interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }
}
