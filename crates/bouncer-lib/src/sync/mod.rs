//! Decision stream synchronization
//!
//! This module provides:
//! - The stream synchronizer driving the fetch/deliver cycle (the startup
//!   snapshot followed by periodic incremental fetches)
//! - The filter options narrowing which decisions the stream returns
//! - The `DecisionSource` seam separating the loop from the API client

mod filters;
mod stream;


pub use filters::SyncFilters;
pub use stream::{
    DecisionSource, StreamSynchronizer, StreamSynchronizerBuilder, SyncError, STARTUP_RETRY_DELAY,
};
