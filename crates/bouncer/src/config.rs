//! Daemon configuration

use anyhow::Result;
use serde::Deserialize;

/// Daemon-level configuration; the bouncer configuration itself lives in
/// the file `config_file` points at.
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    /// Port for the health/metrics endpoints
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,

    /// Path to the bouncer configuration file
    #[serde(default)]
    pub config_file: Option<String>,
}

fn default_listen_port() -> u16 {
    6060
}

impl DaemonConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Environment::with_prefix("BOUNCER_DAEMON"))
            .build()?;

        Ok(settings.try_deserialize().unwrap_or_else(|_| DaemonConfig {
            listen_port: default_listen_port(),
            config_file: None,
        }))
    }
}
