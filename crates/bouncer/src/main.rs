//! Decision bouncer daemon
//!
//! Synchronizes the remote decision set into local enforcement state and
//! exposes health and metrics endpoints.

use anyhow::{Context, Result};
use bouncer_lib::{
    config::BouncerConfig,
    health::HealthState,
    models::MetricsDetailItem,
    observability::SyncCounters,
    sync::{StreamSynchronizerBuilder, SyncError, SyncFilters},
    transport::{self, AuthMode},
    usage::{MetricsUpdater, UsageReporter},
    ApiClient,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;
mod decisions;

const BOUNCER_VERSION: &str = env!("CARGO_PKG_VERSION");
const COMPONENT_TYPE: &str = "decision-bouncer";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting decision-bouncer");

    let daemon_config = config::DaemonConfig::load()?;
    let mut bouncer_config = BouncerConfig::load(daemon_config.config_file.as_deref())
        .context("bouncer configuration")?;
    bouncer_config.validate().context("bouncer configuration")?;

    let interval = bouncer_config.update_frequency()?;
    let metrics_interval = bouncer_config.metrics_interval()?;

    // Authenticated transport, shared by every API collaborator
    let auth = AuthMode::resolve(
        bouncer_config.api_key.as_deref(),
        bouncer_config.cert_path.as_deref(),
        bouncer_config.key_path.as_deref(),
    )?;
    let http = transport::build_client(
        &auth,
        &bouncer_config.user_agent,
        bouncer_config.ca_cert_path.as_deref().map(Path::new),
        bouncer_config.insecure_skip_verify.unwrap_or(false),
    )?;
    let client = ApiClient::new(http, &bouncer_config.api_url)?;
    info!(api_url = %client.base_url(), "Decision API client ready");

    let counters = SyncCounters::new();
    let registry = prometheus::Registry::new();
    counters
        .register(&registry)
        .context("register sync counters")?;

    let (mut synchronizer, mut deltas) = StreamSynchronizerBuilder::new()
        .source(Arc::new(client.clone()))
        .filters(SyncFilters::from_config(&bouncer_config))
        .interval(interval)
        .retry_initial_connect(bouncer_config.retry_initial_connect)
        .counters(counters.clone())
        .build()?;

    let health = HealthState::new(interval * 3);
    let decisions = decisions::DecisionSet::new();

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

    // Synchronizer task
    let mut sync_handle = tokio::spawn({
        let shutdown = shutdown_tx.subscribe();
        async move { synchronizer.run(shutdown).await }
    });

    // Consumer task: drain deltas into the enforcement state
    let _consumer = tokio::spawn({
        let decisions = decisions.clone();
        let health = health.clone();
        async move {
            while let Some(delta) = deltas.recv().await {
                let (added, removed) = decisions.apply(&delta).await;
                health.record_delta().await;
                info!(added, removed, active = decisions.active(), "Applied decision delta");
            }
            // End-of-stream: the synchronizer closed the channel for good
            health.record_closed().await;
        }
    });

    // Usage metrics reporter
    let updater: MetricsUpdater = {
        let decisions = decisions.clone();
        Arc::new(move |component| {
            component.metrics.push(MetricsDetailItem {
                name: "active_decisions".to_string(),
                value: decisions.active() as f64,
                unit: "decision".to_string(),
            });
        })
    };
    let reporter = UsageReporter::new(
        client.clone(),
        COMPONENT_TYPE,
        BOUNCER_VERSION,
        metrics_interval,
        Some(updater),
    );
    let _usage = tokio::spawn({
        let shutdown = shutdown_tx.subscribe();
        async move { reporter.run(shutdown).await }
    });

    // Health and metrics endpoints
    let app_state = Arc::new(api::AppState::new(health.clone(), registry));
    let _api = tokio::spawn(api::serve(daemon_config.listen_port, app_state));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received");
            let _ = shutdown_tx.send(());
        }
        joined = &mut sync_handle => {
            match joined {
                Ok(Ok(())) | Ok(Err(SyncError::Cancelled)) => {}
                Ok(Err(err)) => {
                    error!(error = %err, "Decision stream synchronizer failed");
                    return Err(err.into());
                }
                Err(err) => return Err(err).context("synchronizer task failed"),
            }
        }
    }

    Ok(())
}
