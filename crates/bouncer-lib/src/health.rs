//! Bouncer health model
//!
//! Liveness and readiness derive from the state of the decision stream: the
//! bouncer is healthy while deltas keep arriving, degraded once the stream
//! goes stale and unhealthy after it has terminally closed.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Health of the decision stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStatus {
    /// Deltas are arriving on schedule
    Healthy,
    /// No delta within the staleness window (or none yet)
    Degraded,
    /// The stream has terminally closed
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: StreamStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_delta_timestamp: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    closed: bool,
    last_delta_timestamp: Option<i64>,
}

/// Shared health state, updated by the delta consumer and read by the
/// daemon's probe endpoints.
#[derive(Debug, Clone)]
pub struct HealthState {
    inner: Arc<RwLock<Inner>>,
    stale_after: Duration,
}

impl HealthState {
    /// `stale_after` is how long the stream may stay silent before health
    /// degrades; a few polling intervals is a sensible value.
    pub fn new(stale_after: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            stale_after,
        }
    }

    /// Record that a delta was applied.
    pub async fn record_delta(&self) {
        let mut inner = self.inner.write().await;
        inner.last_delta_timestamp = Some(chrono::Utc::now().timestamp());
    }

    /// Record that the delivery channel closed for good.
    pub async fn record_closed(&self) {
        let mut inner = self.inner.write().await;
        inner.closed = true;
    }

    pub async fn health(&self) -> HealthResponse {
        let inner = self.inner.read().await;

        let status = if inner.closed {
            StreamStatus::Unhealthy
        } else {
            match inner.last_delta_timestamp {
                Some(ts) => {
                    let age = chrono::Utc::now().timestamp() - ts;
                    if age > self.stale_after.as_secs() as i64 {
                        StreamStatus::Degraded
                    } else {
                        StreamStatus::Healthy
                    }
                }
                None => StreamStatus::Degraded,
            }
        };

        HealthResponse {
            status,
            last_delta_timestamp: inner.last_delta_timestamp,
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let inner = self.inner.read().await;

        if inner.closed {
            return ReadinessResponse {
                ready: false,
                reason: Some("decision stream closed".to_string()),
            };
        }
        if inner.last_delta_timestamp.is_none() {
            return ReadinessResponse {
                ready: false,
                reason: Some("no decision snapshot yet".to_string()),
            };
        }

        ReadinessResponse {
            ready: true,
            reason: None,
        }
    }
}
