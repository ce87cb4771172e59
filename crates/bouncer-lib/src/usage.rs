//! Periodic usage metrics reporting
//!
//! Pushes aggregate usage payloads to the decision API on a fixed cadence.
//! Reporting is best-effort: failures are logged and the tick is skipped,
//! the loop itself only stops on shutdown.

use crate::client::{ApiClient, ApiError};
use crate::models::{
    MetricsMeta, OsVersion, RemediationComponentMetrics, UsageMetricsPayload,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

/// Floor for the reporting interval; anything lower is clamped.
pub const MINIMUM_METRICS_INTERVAL: Duration = Duration::from_secs(15 * 60);
/// Interval used when none is configured.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(30 * 60);

const PUSH_TIMEOUT: Duration = Duration::from_secs(10);

/// Callback filling the dynamic portion of a usage payload.
pub type MetricsUpdater = Arc<dyn Fn(&mut RemediationComponentMetrics) + Send + Sync>;

/// Clamp the configured reporting interval.
///
/// `None` means the default; zero disables reporting entirely; anything
/// below the floor is raised to it.
pub fn effective_interval(configured: Option<Duration>) -> Option<Duration> {
    match configured {
        None => {
            debug!(
                default = %humantime::format_duration(DEFAULT_METRICS_INTERVAL),
                "metrics_interval is not set, using the default"
            );
            Some(DEFAULT_METRICS_INTERVAL)
        }
        Some(interval) if interval.is_zero() => {
            info!("metrics_interval is set to 0, disabling usage metrics");
            None
        }
        Some(interval) if interval < MINIMUM_METRICS_INTERVAL => {
            warn!(
                configured = %humantime::format_duration(interval),
                clamped = %humantime::format_duration(MINIMUM_METRICS_INTERVAL),
                "metrics_interval is too low, clamping"
            );
            Some(MINIMUM_METRICS_INTERVAL)
        }
        Some(interval) => Some(interval),
    }
}

/// Identity baked into every payload at startup.
struct StaticMeta {
    component_type: String,
    version: String,
    os: OsVersion,
    startup_timestamp: i64,
    feature_flags: Vec<String>,
}

fn detect_os() -> OsVersion {
    OsVersion {
        name: std::env::consts::OS.to_string(),
        version: String::new(),
    }
}

/// Periodic usage metrics reporter.
pub struct UsageReporter {
    client: ApiClient,
    interval: Option<Duration>,
    static_meta: StaticMeta,
    updater: Option<MetricsUpdater>,
}

impl UsageReporter {
    /// `interval` is the raw configured value; it is clamped here.
    pub fn new(
        client: ApiClient,
        component_type: impl Into<String>,
        version: impl Into<String>,
        interval: Option<Duration>,
        updater: Option<MetricsUpdater>,
    ) -> Self {
        Self {
            client,
            interval: effective_interval(interval),
            static_meta: StaticMeta {
                component_type: component_type.into(),
                version: version.into(),
                os: detect_os(),
                startup_timestamp: chrono::Utc::now().timestamp(),
                feature_flags: Vec::new(),
            },
            updater,
        }
    }

    /// Run the reporting loop until shutdown. Returns immediately when
    /// reporting is disabled.
    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) {
        let Some(interval) = self.interval else {
            info!("Usage metrics reporting disabled");
            return;
        };
        if self.updater.is_none() {
            warn!("No usage metrics updater provided, payloads will be static");
        }

        let mut ticker = interval_at(Instant::now() + interval, interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.push(interval).await,
                _ = shutdown.recv() => {
                    debug!("Shutting down usage metrics reporter");
                    return;
                }
            }
        }
    }

    async fn push(&self, window: Duration) {
        let payload = self.payload(window);

        match tokio::time::timeout(PUSH_TIMEOUT, self.client.push_usage_metrics(&payload)).await {
            Err(_) | Ok(Err(ApiError::Timeout)) => warn!("Timed out sending usage metrics"),
            Ok(Err(ApiError::EndpointNotFound)) => {
                warn!("Usage metrics endpoint not found, older decision engine?");
            }
            Ok(Err(err)) => warn!(error = %err, "Failed to send usage metrics"),
            Ok(Ok(())) => debug!("Usage metrics sent"),
        }
    }

    fn payload(&self, window: Duration) -> UsageMetricsPayload {
        let mut component = RemediationComponentMetrics {
            kind: self.static_meta.component_type.clone(),
            version: self.static_meta.version.clone(),
            os: self.static_meta.os.clone(),
            feature_flags: self.static_meta.feature_flags.clone(),
            meta: MetricsMeta {
                utc_now_timestamp: chrono::Utc::now().timestamp(),
                utc_startup_timestamp: self.static_meta.startup_timestamp,
                window_size_seconds: window.as_secs() as i64,
            },
            metrics: Vec::new(),
        };

        if let Some(updater) = &self.updater {
            updater(&mut component);
        }

        UsageMetricsPayload {
            remediation_components: vec![component],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetricsDetailItem;

    #[test]
    fn test_effective_interval_default() {
        assert_eq!(effective_interval(None), Some(DEFAULT_METRICS_INTERVAL));
    }

    #[test]
    fn test_effective_interval_zero_disables() {
        assert_eq!(effective_interval(Some(Duration::ZERO)), None);
    }

    #[test]
    fn test_effective_interval_clamps_low_values() {
        assert_eq!(
            effective_interval(Some(Duration::from_secs(60))),
            Some(MINIMUM_METRICS_INTERVAL)
        );
    }

    #[test]
    fn test_effective_interval_passes_valid_values() {
        let configured = Duration::from_secs(3600);
        assert_eq!(effective_interval(Some(configured)), Some(configured));
    }

    fn reporter(updater: Option<MetricsUpdater>) -> UsageReporter {
        let client = ApiClient::new(reqwest::Client::new(), "http://localhost:8080/").unwrap();
        UsageReporter::new(client, "decision-bouncer", "0.1.0", None, updater)
    }

    #[test]
    fn test_payload_carries_static_meta_and_window() {
        let reporter = reporter(None);
        let payload = reporter.payload(Duration::from_secs(1800));

        assert_eq!(payload.remediation_components.len(), 1);
        let component = &payload.remediation_components[0];
        assert_eq!(component.kind, "decision-bouncer");
        assert_eq!(component.version, "0.1.0");
        assert_eq!(component.meta.window_size_seconds, 1800);
        assert!(component.meta.utc_now_timestamp >= component.meta.utc_startup_timestamp);
        assert!(component.metrics.is_empty());
    }

    #[test]
    fn test_payload_applies_updater() {
        let updater: MetricsUpdater = Arc::new(|component| {
            component.metrics.push(MetricsDetailItem {
                name: "active_decisions".to_string(),
                value: 42.0,
                unit: "decision".to_string(),
            });
        });

        let reporter = reporter(Some(updater));
        let payload = reporter.payload(Duration::from_secs(1800));

        let component = &payload.remediation_components[0];
        assert_eq!(component.metrics.len(), 1);
        assert_eq!(component.metrics[0].name, "active_decisions");
        assert_eq!(component.metrics[0].value, 42.0);
    }

    #[tokio::test]
    async fn test_run_returns_immediately_when_disabled() {
        let client = ApiClient::new(reqwest::Client::new(), "http://localhost:8080/").unwrap();
        let reporter = UsageReporter::new(
            client,
            "decision-bouncer",
            "0.1.0",
            Some(Duration::ZERO),
            None,
        );

        let (shutdown_tx, _) = broadcast::channel(1);
        // Completes without the shutdown signal ever firing
        tokio::time::timeout(Duration::from_millis(100), reporter.run(shutdown_tx.subscribe()))
            .await
            .unwrap();
    }
}
