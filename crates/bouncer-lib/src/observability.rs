//! Prometheus instrumentation for the bouncer
//!
//! Counters are owned by the component instance and registered into a
//! caller-supplied registry, so embedders control exposition and tests can
//! read them in isolation.

use prometheus::{IntCounter, Registry};

/// Monotonic counters tracking calls to the decision API.
///
/// Cheap to clone; clones share the same underlying counters.
#[derive(Clone)]
pub struct SyncCounters {
    calls: IntCounter,
    failures: IntCounter,
}

impl SyncCounters {
    pub fn new() -> Self {
        Self {
            calls: IntCounter::new(
                "decision_api_calls_total",
                "The total number of calls to the decision API",
            )
            .expect("Failed to register counter"),
            failures: IntCounter::new(
                "decision_api_call_failures_total",
                "The total number of failed calls to the decision API",
            )
            .expect("Failed to register counter"),
        }
    }

    /// Expose the counters through `registry`, e.g. for a /metrics endpoint.
    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        registry.register(Box::new(self.calls.clone()))?;
        registry.register(Box::new(self.failures.clone()))?;
        Ok(())
    }

    pub fn record_call(&self) {
        self.calls.inc();
    }

    pub fn record_failure(&self) {
        self.failures.inc();
    }

    pub fn calls(&self) -> u64 {
        self.calls.get()
    }

    pub fn failures(&self) -> u64 {
        self.failures.get()
    }
}

impl Default for SyncCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_start_at_zero() {
        let counters = SyncCounters::new();
        assert_eq!(counters.calls(), 0);
        assert_eq!(counters.failures(), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let counters = SyncCounters::new();
        let clone = counters.clone();

        counters.record_call();
        counters.record_call();
        counters.record_failure();

        assert_eq!(clone.calls(), 2);
        assert_eq!(clone.failures(), 1);
    }

    #[test]
    fn test_register_exposes_both_counters() {
        let counters = SyncCounters::new();
        let registry = Registry::new();
        counters.register(&registry).unwrap();

        counters.record_call();

        let families = registry.gather();
        let names: Vec<&str> = families.iter().map(|f| f.get_name()).collect();
        assert!(names.contains(&"decision_api_calls_total"));
        assert!(names.contains(&"decision_api_call_failures_total"));
    }

    #[test]
    fn test_double_registration_fails() {
        let counters = SyncCounters::new();
        let registry = Registry::new();
        counters.register(&registry).unwrap();
        assert!(counters.register(&registry).is_err());
    }
}
