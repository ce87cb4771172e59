//! Follow the decision stream from a terminal

use crate::output::{self, OutputFormat};
use anyhow::Result;
use bouncer_lib::sync::{StreamSynchronizerBuilder, SyncError};
use bouncer_lib::ApiClient;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Run the synchronizer and print every delta until interrupted.
pub async fn run(
    client: ApiClient,
    interval: Duration,
    startup_retry: bool,
    format: OutputFormat,
) -> Result<()> {
    let (mut synchronizer, mut deltas) = StreamSynchronizerBuilder::new()
        .source(Arc::new(client))
        .interval(interval)
        .retry_initial_connect(startup_retry)
        .build()?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let handle = tokio::spawn({
        let shutdown = shutdown_tx.subscribe();
        async move { synchronizer.run(shutdown).await }
    });

    loop {
        tokio::select! {
            maybe = deltas.recv() => match maybe {
                Some(delta) => output::print_delta(&delta, format)?,
                // End-of-stream: the synchronizer gave up at startup
                None => break,
            },
            _ = tokio::signal::ctrl_c() => {
                output::print_warning("Interrupted, stopping");
                let _ = shutdown_tx.send(());
                break;
            }
        }
    }

    match handle.await? {
        Ok(()) | Err(SyncError::Cancelled) => Ok(()),
        Err(err) => Err(err.into()),
    }
}
