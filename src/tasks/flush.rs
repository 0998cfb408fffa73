//! Periodic Flush Task
//!
//! Background task that persists the cache store at a fixed interval.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::CacheStore;

/// Spawns a background task that periodically persists the cache store.
///
/// Each flush applies the store's age and size rules, so a long-lived
/// process sheds expired entries even between memoized calls. Persist
/// failures are logged and retried on the next tick.
///
/// # Arguments
/// * `store` - Shared handle to the cache store
/// * `interval_secs` - Interval in seconds between flushes
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
pub fn spawn_flush_task(store: Arc<RwLock<CacheStore>>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(
            "Starting cache flush task with interval of {} seconds",
            interval_secs
        );

        loop {
            tokio::time::sleep(interval).await;

            let result = {
                let mut store_guard = store.write().await;
                store_guard.persist()
            };

            match result {
                Ok(()) => debug!("Periodic cache flush complete"),
                Err(err) => warn!("Periodic cache flush failed: {}", err),
            }
        }
    })
}
