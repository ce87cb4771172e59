//! Wire types exchanged with the decision API

use serde::{Deserialize, Deserializer, Serialize};

/// A remediation decision issued by the decision engine.
///
/// The bouncer passes decisions through without interpreting them beyond the
/// scope/value pair used for enforcement lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Identity the decision applies to (IP address, range, username...)
    pub value: String,
    /// What kind of identity `value` is ("ip", "range", "username"...)
    pub scope: String,
    /// Scenario that triggered the decision
    pub scenario: String,
    /// Remaining validity, e.g. "1h22m3s"
    pub duration: String,
    /// Component that issued the decision
    pub origin: String,
    /// Remediation to apply ("ban", "captcha"...)
    #[serde(rename = "type")]
    pub kind: String,
    /// Absolute expiry timestamp, when the engine provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub until: Option<String>,
}

/// The decisions that became active or expired between two synchronization
/// cycles.
///
/// The first delta of a stream is a full snapshot: every active decision
/// appears under `new` and `deleted` is empty. Later deltas are incremental.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionDelta {
    #[serde(default, deserialize_with = "null_to_empty")]
    pub new: Vec<Decision>,
    #[serde(default, deserialize_with = "null_to_empty")]
    pub deleted: Vec<Decision>,
}

impl DecisionDelta {
    /// True when the cycle observed no changes.
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.deleted.is_empty()
    }
}

// The decision API sends `null` rather than `[]` for an empty set.
fn null_to_empty<'de, D>(deserializer: D) -> Result<Vec<Decision>, D::Error>
where
    D: Deserializer<'de>,
{
    let decisions: Option<Vec<Decision>> = Option::deserialize(deserializer)?;
    Ok(decisions.unwrap_or_default())
}

/// Usage metrics payload pushed to the decision API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageMetricsPayload {
    pub remediation_components: Vec<RemediationComponentMetrics>,
}

/// Usage metrics for one remediation component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemediationComponentMetrics {
    #[serde(rename = "type")]
    pub kind: String,
    pub version: String,
    pub os: OsVersion,
    pub feature_flags: Vec<String>,
    pub meta: MetricsMeta,
    pub metrics: Vec<MetricsDetailItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsMeta {
    pub utc_now_timestamp: i64,
    pub utc_startup_timestamp: i64,
    pub window_size_seconds: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OsVersion {
    pub name: String,
    pub version: String,
}

/// A single measured value in a usage payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsDetailItem {
    pub name: String,
    pub value: f64,
    pub unit: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delta_null_sets_deserialize_empty() {
        let delta: DecisionDelta = serde_json::from_str(r#"{"new": null, "deleted": null}"#).unwrap();
        assert!(delta.new.is_empty());
        assert!(delta.deleted.is_empty());
        assert!(delta.is_empty());
    }

    #[test]
    fn test_delta_missing_fields_deserialize_empty() {
        let delta: DecisionDelta = serde_json::from_str("{}").unwrap();
        assert!(delta.is_empty());
    }

    #[test]
    fn test_decision_type_field_rename() {
        let json = r#"{
            "value": "192.0.2.7",
            "scope": "ip",
            "scenario": "http/probing",
            "duration": "1h",
            "origin": "engine",
            "type": "ban"
        }"#;

        let decision: Decision = serde_json::from_str(json).unwrap();
        assert_eq!(decision.kind, "ban");
        assert_eq!(decision.id, None);

        let round_trip = serde_json::to_value(&decision).unwrap();
        assert_eq!(round_trip["type"], "ban");
        assert!(round_trip.get("id").is_none());
    }
}
