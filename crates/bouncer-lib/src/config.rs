//! Bouncer configuration loading and validation
//!
//! Configuration is resolved from an optional file plus `BOUNCER_`-prefixed
//! environment overrides, then validated before any network I/O happens.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Polling interval substituted when `update_frequency` is not set.
pub const DEFAULT_UPDATE_FREQUENCY: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config does not contain the decision API url")]
    MissingApiUrl,
    #[error("config does not contain an API key or a client certificate")]
    MissingAuth,
    #[error("certificate auth requires both cert_path and key_path")]
    IncompleteCertPair,
    #[error("invalid duration '{value}': {source}")]
    InvalidDuration {
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error("update_frequency must be strictly positive")]
    NonPositiveInterval,
    #[error("unable to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Bouncer configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BouncerConfig {
    /// Base URL of the decision API
    #[serde(default)]
    pub api_url: String,

    /// API key credential; takes precedence over certificate auth
    #[serde(default)]
    pub api_key: Option<String>,

    /// Client certificate path for mutual TLS
    #[serde(default)]
    pub cert_path: Option<String>,

    /// Client private key path for mutual TLS
    #[serde(default)]
    pub key_path: Option<String>,

    /// CA bundle used to verify the decision API certificate
    #[serde(default)]
    pub ca_cert_path: Option<String>,

    /// Disable server certificate verification
    #[serde(default)]
    pub insecure_skip_verify: Option<bool>,

    /// Polling interval for the decision stream, e.g. "10s"
    #[serde(default)]
    pub update_frequency: Option<String>,

    /// Usage metrics reporting interval, e.g. "30m"; "0s" disables reporting
    #[serde(default)]
    pub metrics_interval: Option<String>,

    /// Keep retrying the initial fetch instead of failing fast
    #[serde(default)]
    pub retry_initial_connect: bool,

    /// Decision scopes to request ("ip", "range"...)
    #[serde(default)]
    pub scopes: Option<Vec<String>>,

    /// Only request decisions whose scenario contains one of these substrings
    #[serde(default)]
    pub scenarios_containing: Option<Vec<String>>,

    /// Exclude decisions whose scenario contains one of these substrings
    #[serde(default)]
    pub scenarios_not_containing: Option<Vec<String>>,

    /// Decision origins to request
    #[serde(default)]
    pub origins: Option<Vec<String>>,

    /// User-agent sent to the decision API
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_user_agent() -> String {
    format!("decision-bouncer/{}", env!("CARGO_PKG_VERSION"))
}

impl BouncerConfig {
    /// Load configuration from an optional file plus environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        let settings = builder
            .add_source(config::Environment::with_prefix("BOUNCER"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Validate credentials and the API url, normalizing the url to end with
    /// a path separator. Fails before any network I/O.
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.api_url.is_empty() {
            return Err(ConfigError::MissingApiUrl);
        }
        if !self.api_url.ends_with('/') {
            self.api_url.push('/');
        }

        let api_key = non_empty(&self.api_key);
        let cert = non_empty(&self.cert_path);
        let key = non_empty(&self.key_path);

        if api_key.is_none() {
            match (cert, key) {
                (Some(_), Some(_)) => {}
                (None, None) => return Err(ConfigError::MissingAuth),
                _ => return Err(ConfigError::IncompleteCertPair),
            }
        }

        Ok(())
    }

    /// Parse the polling interval, substituting the default when unset.
    /// A zero interval is a configuration error, not a runtime default.
    pub fn update_frequency(&self) -> Result<Duration, ConfigError> {
        let raw = match non_empty(&self.update_frequency) {
            Some(raw) => raw,
            None => {
                warn!(
                    default = %humantime::format_duration(DEFAULT_UPDATE_FREQUENCY),
                    "update_frequency is not set, using the default"
                );
                return Ok(DEFAULT_UPDATE_FREQUENCY);
            }
        };

        let interval = parse_duration(raw)?;
        if interval.is_zero() {
            return Err(ConfigError::NonPositiveInterval);
        }

        Ok(interval)
    }

    /// Parse the usage metrics interval when one is configured.
    pub fn metrics_interval(&self) -> Result<Option<Duration>, ConfigError> {
        non_empty(&self.metrics_interval)
            .map(parse_duration)
            .transpose()
    }
}

fn parse_duration(raw: &str) -> Result<Duration, ConfigError> {
    humantime::parse_duration(raw).map_err(|source| ConfigError::InvalidDuration {
        value: raw.to_string(),
        source,
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> BouncerConfig {
        BouncerConfig {
            api_url: "http://localhost:8080".to_string(),
            api_key: Some("deadbeef".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_normalizes_api_url() {
        let mut config = base_config();
        config.validate().unwrap();
        assert_eq!(config.api_url, "http://localhost:8080/");

        // Already normalized urls are left alone
        config.validate().unwrap();
        assert_eq!(config.api_url, "http://localhost:8080/");
    }

    #[test]
    fn test_validate_rejects_missing_api_url() {
        let mut config = BouncerConfig::default();
        assert!(matches!(config.validate(), Err(ConfigError::MissingApiUrl)));
    }

    #[test]
    fn test_validate_rejects_missing_credentials() {
        let mut config = base_config();
        config.api_key = None;
        assert!(matches!(config.validate(), Err(ConfigError::MissingAuth)));

        // An empty key counts as absent
        config.api_key = Some(String::new());
        assert!(matches!(config.validate(), Err(ConfigError::MissingAuth)));
    }

    #[test]
    fn test_validate_rejects_incomplete_cert_pair() {
        let mut config = base_config();
        config.api_key = None;
        config.cert_path = Some("/etc/bouncer/client.crt".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IncompleteCertPair)
        ));

        config.cert_path = None;
        config.key_path = Some("/etc/bouncer/client.key".to_string());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::IncompleteCertPair)
        ));
    }

    #[test]
    fn test_validate_accepts_cert_pair() {
        let mut config = base_config();
        config.api_key = None;
        config.cert_path = Some("/etc/bouncer/client.crt".to_string());
        config.key_path = Some("/etc/bouncer/client.key".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_update_frequency_default() {
        let config = base_config();
        assert_eq!(config.update_frequency().unwrap(), DEFAULT_UPDATE_FREQUENCY);
    }

    #[test]
    fn test_update_frequency_parses_duration_strings() {
        let mut config = base_config();
        config.update_frequency = Some("2m30s".to_string());
        assert_eq!(
            config.update_frequency().unwrap(),
            Duration::from_secs(150)
        );
    }

    #[test]
    fn test_update_frequency_rejects_zero() {
        let mut config = base_config();
        config.update_frequency = Some("0s".to_string());
        assert!(matches!(
            config.update_frequency(),
            Err(ConfigError::NonPositiveInterval)
        ));
    }

    #[test]
    fn test_update_frequency_rejects_garbage() {
        let mut config = base_config();
        config.update_frequency = Some("not-a-duration".to_string());
        assert!(matches!(
            config.update_frequency(),
            Err(ConfigError::InvalidDuration { .. })
        ));
    }

    #[test]
    fn test_metrics_interval_optional() {
        let mut config = base_config();
        assert_eq!(config.metrics_interval().unwrap(), None);

        config.metrics_interval = Some("30m".to_string());
        assert_eq!(
            config.metrics_interval().unwrap(),
            Some(Duration::from_secs(1800))
        );
    }
}
