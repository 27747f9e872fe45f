//! Background removal of expired cache entries.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::state::AppState;

/// Prune expired cache entries every `every` until `shutdown` flips to true
/// or its sender is dropped.
pub fn spawn_cache_sweeper(
    state: Arc<AppState>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        info!(interval_secs = every.as_secs(), "Cache sweeper started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let removed = state.cache().prune_expired();
                    if removed > 0 {
                        debug!(removed, "Pruned expired cache entries");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
    })
}
