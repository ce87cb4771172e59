//! Decision stream filter options

use crate::config::BouncerConfig;

/// Immutable-after-init filters narrowing which decisions the stream
/// returns.
///
/// List-valued configuration is flattened into comma-joined strings, the
/// form the decision API consumes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncFilters {
    pub scopes: Option<String>,
    pub scenarios_containing: Option<String>,
    pub scenarios_not_containing: Option<String>,
    pub origins: Option<String>,
}

impl SyncFilters {
    /// Flatten the configured filter lists.
    pub fn from_config(config: &BouncerConfig) -> Self {
        Self {
            scopes: join(&config.scopes),
            scenarios_containing: join(&config.scenarios_containing),
            scenarios_not_containing: join(&config.scenarios_not_containing),
            origins: join(&config.origins),
        }
    }

    /// Query parameters for the stream endpoint, skipping unset filters.
    pub(crate) fn query_pairs(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        [
            ("scopes", self.scopes.as_deref()),
            ("scenarios_containing", self.scenarios_containing.as_deref()),
            (
                "scenarios_not_containing",
                self.scenarios_not_containing.as_deref(),
            ),
            ("origins", self.origins.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.map(|value| (name, value)))
    }
}

fn join(list: &Option<Vec<String>>) -> Option<String> {
    list.as_ref().map(|values| values.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_config_joins_lists() {
        let config = BouncerConfig {
            scopes: Some(vec!["ip".to_string(), "range".to_string()]),
            scenarios_containing: Some(vec!["ssh".to_string()]),
            origins: None,
            ..Default::default()
        };

        let filters = SyncFilters::from_config(&config);
        assert_eq!(filters.scopes.as_deref(), Some("ip,range"));
        assert_eq!(filters.scenarios_containing.as_deref(), Some("ssh"));
        assert_eq!(filters.scenarios_not_containing, None);
        assert_eq!(filters.origins, None);
    }

    #[test]
    fn test_query_pairs_skip_unset_filters() {
        let filters = SyncFilters {
            scopes: Some("ip".to_string()),
            ..Default::default()
        };

        let pairs: Vec<_> = filters.query_pairs().collect();
        assert_eq!(pairs, vec![("scopes", "ip")]);

        assert_eq!(SyncFilters::default().query_pairs().count(), 0);
    }
}
