//! Background sweep task.
//!
//! Walks every partition on a fixed interval to bound staleness between
//! requests. Purely an upper bound: each core operation sweeps its own
//! partition inline, so a delayed or missed tick never affects correctness.

use std::sync::Arc;
use std::time::Duration;

use jobpool_core::Pool;
use tokio::task::JoinHandle;

/// Spawns the periodic sweep task; aborted on shutdown via the handle.
pub fn spawn(pool: Arc<Pool>) -> JoinHandle<()> {
    let interval = Duration::from_secs(pool.config().sweep_interval_secs);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick fires immediately; skip straight to the cadence.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let swept = pool.sweep_all();
            tracing::trace!(partitions = swept, "background sweep");
        }
    })
}
