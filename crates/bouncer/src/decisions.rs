//! In-memory enforcement state
//!
//! The consumer side of the decision stream: deltas are folded into a set
//! of active decisions keyed by scope and value. Matching incoming traffic
//! against this set is the embedding application's concern; the daemon
//! keeps it as the reference enforcement state.

use bouncer_lib::models::{Decision, DecisionDelta};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DecisionKey {
    scope: String,
    value: String,
}

impl DecisionKey {
    fn of(decision: &Decision) -> Self {
        Self {
            scope: decision.scope.clone(),
            value: decision.value.clone(),
        }
    }
}

/// Active decision set maintained by the delta consumer.
#[derive(Debug, Clone, Default)]
pub struct DecisionSet {
    decisions: Arc<RwLock<HashMap<DecisionKey, Decision>>>,
    // Kept alongside the map so sync callers (the usage metrics updater)
    // can read the size without taking the async lock.
    active: Arc<AtomicUsize>,
}

impl DecisionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a delta into the set; returns (added, removed) counts.
    pub async fn apply(&self, delta: &DecisionDelta) -> (usize, usize) {
        let mut decisions = self.decisions.write().await;

        let mut added = 0;
        for decision in &delta.new {
            if decisions
                .insert(DecisionKey::of(decision), decision.clone())
                .is_none()
            {
                added += 1;
            }
        }

        let mut removed = 0;
        for decision in &delta.deleted {
            if decisions.remove(&DecisionKey::of(decision)).is_some() {
                removed += 1;
            }
        }

        self.active.store(decisions.len(), Ordering::Relaxed);
        debug!(added, removed, active = decisions.len(), "Decision set updated");

        (added, removed)
    }

    /// Look up the decision currently targeting an identity.
    pub async fn get(&self, scope: &str, value: &str) -> Option<Decision> {
        let key = DecisionKey {
            scope: scope.to_string(),
            value: value.to_string(),
        };
        self.decisions.read().await.get(&key).cloned()
    }

    pub async fn contains(&self, scope: &str, value: &str) -> bool {
        self.get(scope, value).await.is_some()
    }

    /// Number of active decisions, readable without the async lock.
    pub fn active(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }
}
