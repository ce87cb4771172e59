//! Single-shot decision lookups
//!
//! Answers "is this identity currently blocked?" with one stateless query
//! against the decision API; no caching, no retry policy.

use crate::client::{ApiClient, ApiError, DecisionFilter};
use crate::models::Decision;

/// One-shot lookup client sharing the authenticated transport with the
/// stream synchronizer.
#[derive(Debug, Clone)]
pub struct LiveLookup {
    client: ApiClient,
}

impl LiveLookup {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Fetch the decisions currently targeting an IP address.
    pub async fn get(&self, value: &str) -> Result<Vec<Decision>, ApiError> {
        self.client.decisions_list(&DecisionFilter::ip(value)).await
    }

    /// Fetch decisions with an explicit filter (scope/value/type).
    pub async fn get_with_filter(
        &self,
        filter: &DecisionFilter,
    ) -> Result<Vec<Decision>, ApiError> {
        self.client.decisions_list(filter).await
    }
}
