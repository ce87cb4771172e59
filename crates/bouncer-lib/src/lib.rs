//! Bouncer SDK for the decision API
//!
//! This crate provides the building blocks of a remediation component:
//! - Decision stream synchronization with startup/steady retry policies
//! - Single-shot decision lookups
//! - Request forwarding to the appsec inspection endpoint
//! - Periodic usage metrics reporting
//! - Authenticated transport setup (API key or mutual TLS)

pub mod appsec;
pub mod client;
pub mod config;
pub mod health;
pub mod live;
pub mod models;
pub mod observability;
pub mod sync;
pub mod transport;
pub mod usage;

pub use client::{ApiClient, ApiError, DecisionFilter};
pub use config::{BouncerConfig, ConfigError};
pub use models::{Decision, DecisionDelta};
pub use observability::SyncCounters;
pub use sync::{
    DecisionSource, StreamSynchronizer, StreamSynchronizerBuilder, SyncError, SyncFilters,
};
