//! Decision stream synchronizer
//!
//! Drives the fetch/deliver cycle against the decision API for the lifetime
//! of the process: one startup fetch returning the full decision snapshot,
//! then periodic incremental fetches. Deltas are handed to the consumer
//! through a single-slot channel, so a slow consumer throttles the fetch
//! cadence instead of queueing unbounded state.

use super::SyncFilters;
use crate::client::{ApiClient, ApiError};
use crate::config::DEFAULT_UPDATE_FREQUENCY;
use crate::models::DecisionDelta;
use crate::observability::SyncCounters;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Fixed delay between startup fetch attempts when `retry_initial_connect`
/// is enabled. Linear: the dominant startup failure is a decision engine
/// that is still booting, where a short fixed wait beats exponential
/// backoff.
pub const STARTUP_RETRY_DELAY: Duration = Duration::from_secs(10);

/// Source of decision deltas, the seam between the synchronizer and the
/// remote API client.
#[async_trait]
pub trait DecisionSource: Send + Sync {
    /// Fetch the current delta: the full decision set when `startup` is
    /// true, the changes since the previous call otherwise.
    async fn fetch_decisions(
        &self,
        filters: &SyncFilters,
        startup: bool,
    ) -> Result<DecisionDelta, ApiError>;
}

#[async_trait]
impl DecisionSource for ApiClient {
    async fn fetch_decisions(
        &self,
        filters: &SyncFilters,
        startup: bool,
    ) -> Result<DecisionDelta, ApiError> {
        self.decisions_stream(filters, startup).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The initial fetch failed and `retry_initial_connect` is disabled.
    /// The delivery channel is closed before this is returned.
    #[error("initial decision fetch failed: {0}")]
    Startup(#[source] ApiError),
    /// Shutdown was requested. A clean, expected termination path, not a
    /// failure; the delivery channel is left open.
    #[error("decision stream synchronizer shut down")]
    Cancelled,
    #[error("update interval must be strictly positive")]
    InvalidInterval,
    #[error("decision source is required")]
    MissingSource,
}

/// Synchronizes the local enforcement point with the remote decision set.
///
/// Built with [`StreamSynchronizerBuilder`]; [`StreamSynchronizer::run`] is
/// spawned by the embedder as a long-lived background task while the
/// consumer drains the paired receiver.
pub struct StreamSynchronizer {
    source: Arc<dyn DecisionSource>,
    filters: SyncFilters,
    interval: Duration,
    retry_initial_connect: bool,
    startup_retry_delay: Duration,
    delivery: Option<mpsc::Sender<DecisionDelta>>,
    counters: SyncCounters,
}

impl StreamSynchronizer {
    /// Counters tracking calls to the decision source.
    pub fn counters(&self) -> &SyncCounters {
        &self.counters
    }

    /// Drive the synchronization loop until shutdown.
    ///
    /// Returns [`SyncError::Startup`] when the initial fetch fails with
    /// startup retry disabled (the delivery channel is closed first, so the
    /// consumer sees end-of-stream), or [`SyncError::Cancelled`] once
    /// shutdown is requested. Steady-state fetch errors are logged, counted
    /// and absorbed; the next attempt is the next scheduled tick.
    pub async fn run(
        &mut self,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), SyncError> {
        let snapshot = self.startup_fetch(&mut shutdown).await?;
        info!(decisions = snapshot.new.len(), "Initial decision snapshot received");
        self.deliver(snapshot, &mut shutdown).await?;

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown.recv() => {
                    debug!("Shutting down decision stream synchronizer");
                    return Err(SyncError::Cancelled);
                }
            }

            match self.fetch(false).await {
                Ok(delta) => self.deliver(delta, &mut shutdown).await?,
                Err(err) => self.log_fetch_failure(&err),
            }
        }
    }

    /// Startup fetch with the startup retry policy applied.
    async fn startup_fetch(
        &mut self,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<DecisionDelta, SyncError> {
        loop {
            match self.fetch(true).await {
                Ok(snapshot) => return Ok(snapshot),
                Err(err) if self.retry_initial_connect => {
                    self.log_fetch_failure(&err);
                    warn!(
                        delay_secs = self.startup_retry_delay.as_secs(),
                        "Retrying initial decision fetch"
                    );
                    tokio::select! {
                        _ = tokio::time::sleep(self.startup_retry_delay) => {}
                        _ = shutdown.recv() => return Err(SyncError::Cancelled),
                    }
                }
                Err(err) => {
                    error!(error = %err, "Initial decision fetch failed, giving up");
                    // Closing the channel is the only signal the consumer
                    // gets that no data will ever arrive.
                    self.delivery = None;
                    return Err(SyncError::Startup(err));
                }
            }
        }
    }

    async fn fetch(&self, startup: bool) -> Result<DecisionDelta, ApiError> {
        self.counters.record_call();
        let result = self.source.fetch_decisions(&self.filters, startup).await;
        if result.is_err() {
            self.counters.record_failure();
        }
        result
    }

    /// Hand a delta to the consumer. Suspends until the single channel slot
    /// is free (backpressure) or shutdown is requested; a cancelled send
    /// drops the pending delta.
    async fn deliver(
        &self,
        delta: DecisionDelta,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> Result<(), SyncError> {
        let Some(delivery) = self.delivery.as_ref() else {
            debug!("Delivery channel already closed");
            return Err(SyncError::Cancelled);
        };

        tokio::select! {
            sent = delivery.send(delta) => match sent {
                Ok(()) => Ok(()),
                Err(_) => {
                    warn!("Delta consumer dropped the receiver, stopping");
                    Err(SyncError::Cancelled)
                }
            },
            _ = shutdown.recv() => Err(SyncError::Cancelled),
        }
    }

    fn log_fetch_failure(&self, err: &ApiError) {
        match err {
            ApiError::EndpointNotFound => {
                warn!("Decision stream endpoint not found, older decision engine?");
            }
            ApiError::Timeout => warn!("Timed out fetching the decision stream"),
            _ => warn!(error = %err, "Unable to fetch the decision stream"),
        }
    }
}

/// Builder for the stream synchronizer.
pub struct StreamSynchronizerBuilder {
    source: Option<Arc<dyn DecisionSource>>,
    filters: SyncFilters,
    interval: Duration,
    retry_initial_connect: bool,
    startup_retry_delay: Duration,
    counters: Option<SyncCounters>,
}

impl StreamSynchronizerBuilder {
    pub fn new() -> Self {
        Self {
            source: None,
            filters: SyncFilters::default(),
            interval: DEFAULT_UPDATE_FREQUENCY,
            retry_initial_connect: false,
            startup_retry_delay: STARTUP_RETRY_DELAY,
            counters: None,
        }
    }

    /// Set the decision source (required).
    pub fn source(mut self, source: Arc<dyn DecisionSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Set the stream filters.
    pub fn filters(mut self, filters: SyncFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Set the steady-state polling interval.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Keep retrying the startup fetch on a fixed cadence instead of
    /// failing fast. Off by default: process supervisors usually prefer
    /// restart-with-backoff over an internally looping process.
    pub fn retry_initial_connect(mut self, retry: bool) -> Self {
        self.retry_initial_connect = retry;
        self
    }

    /// Override the fixed startup retry delay.
    pub fn startup_retry_delay(mut self, delay: Duration) -> Self {
        self.startup_retry_delay = delay;
        self
    }

    /// Use existing counters instead of fresh ones, e.g. ones already
    /// registered with a metrics registry.
    pub fn counters(mut self, counters: SyncCounters) -> Self {
        self.counters = Some(counters);
        self
    }

    /// Build the synchronizer and its paired single-slot delivery channel.
    pub fn build(
        self,
    ) -> Result<(StreamSynchronizer, mpsc::Receiver<DecisionDelta>), SyncError> {
        let source = self.source.ok_or(SyncError::MissingSource)?;
        if self.interval.is_zero() {
            return Err(SyncError::InvalidInterval);
        }

        let (delivery, receiver) = mpsc::channel(1);

        let synchronizer = StreamSynchronizer {
            source,
            filters: self.filters,
            interval: self.interval,
            retry_initial_connect: self.retry_initial_connect,
            startup_retry_delay: self.startup_retry_delay,
            delivery: Some(delivery),
            counters: self.counters.unwrap_or_default(),
        };

        Ok((synchronizer, receiver))
    }
}

impl Default for StreamSynchronizerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
