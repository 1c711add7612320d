//! Bootstrap node resolution and periodic maintenance.
//!
//! Bootstrap nodes only aid discovery. Failures are logged and never fail a
//! session; the target handshake decides whether the node is reachable.

use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tracing::{debug, trace, warn};
use warpnet_transport::Transport;

/// Resolve every entry concurrently; returns how many yielded an address.
pub(crate) async fn resolve_all(transport: &dyn Transport, entries: &[String]) -> usize {
    let results = join_all(
        entries
            .iter()
            .map(|entry| async move { (entry, transport.resolve_bootstrap(entry).await) }),
    )
    .await;

    results
        .into_iter()
        .filter(|(entry, result)| match result {
            Ok(addrs) => {
                trace!(bootstrap = %entry, addrs = addrs.len(), "Resolved bootstrap node");
                !addrs.is_empty()
            }
            Err(e) => {
                warn!(bootstrap = %entry, error = %e, "Failed to resolve bootstrap node");
                false
            }
        })
        .count()
}

/// Re-resolve `entries` every `interval` until the handle is aborted.
///
/// Returns `None` when there is nothing to maintain.
pub(crate) fn spawn_maintenance(
    transport: Arc<dyn Transport>,
    entries: Vec<String>,
    interval: Duration,
) -> Option<JoinHandle<()>> {
    if entries.is_empty() || interval.is_zero() {
        return None;
    }

    Some(tokio::spawn(async move {
        debug!("Starting bootstrap maintenance (interval: {:?})", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Connect has just resolved everything.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let reachable = resolve_all(transport.as_ref(), &entries).await;
            debug!(reachable, total = entries.len(), "Refreshed bootstrap nodes");
        }
    }))
}
