//! One-shot decision lookups

use crate::output::{self, OutputFormat};
use anyhow::Result;
use bouncer_lib::live::LiveLookup;
use bouncer_lib::{ApiClient, DecisionFilter};

/// Look up the decisions currently affecting an identity.
pub async fn run(
    client: ApiClient,
    value: &str,
    scope: Option<String>,
    kind: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let lookup = LiveLookup::new(client);

    let decisions = if scope.is_none() && kind.is_none() {
        lookup.get(value).await?
    } else {
        let filter = DecisionFilter {
            scope,
            value: Some(value.to_string()),
            kind,
            ..Default::default()
        };
        lookup.get_with_filter(&filter).await?
    };

    output::print_decisions(&decisions, format)?;

    Ok(())
}
