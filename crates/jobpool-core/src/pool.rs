//! The pool facade: the core-facing contract of the whole system.
//!
//! Routes every operation through the partition registry, locks the target
//! partition for the duration of the call, and supplies the current time
//! from the injected clock. `Pool` is `Send + Sync` and designed to sit in
//! an `Arc` shared by all transport handlers plus the background sweeper.

use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::PoolConfig;
use crate::error::ConfirmError;
use crate::outcome::{NextOutcome, PartitionStats, ReleaseOutcome, ReportOutcome};
use crate::partition::HandleReport;
use crate::registry::PartitionRegistry;

/// Partitioned lease pool over ephemeral job handles.
#[derive(Debug)]
pub struct Pool {
    registry: PartitionRegistry,
    config: PoolConfig,
    clock: Arc<dyn Clock>,
}

impl Pool {
    /// Creates a pool on the system clock.
    #[must_use]
    pub fn new(config: PoolConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a pool with an injected clock (tests use a manual clock).
    #[must_use]
    pub fn with_clock(config: PoolConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: PartitionRegistry::new(),
            config,
            clock,
        }
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Upserts one reported handle into the keyed partition.
    ///
    /// Always returns a structured outcome; policy rejections are not
    /// errors.
    pub fn report(&self, partition_key: &str, report: &HandleReport) -> ReportOutcome {
        let now_ms = self.clock.now_ms();
        let partition = self.registry.get_or_create(partition_key);
        let mut partition = partition.lock().expect("lock poisoned");
        let outcome = partition.report(report, now_ms, &self.config);
        if outcome.stored {
            tracing::debug!(
                partition = %partition_key,
                handle = %report.handle_id,
                pool_size = outcome.pool_size,
                "handle reported"
            );
        } else {
            tracing::debug!(
                partition = %partition_key,
                handle = %report.handle_id,
                reason = outcome.reason.map(|r| r.code()).unwrap_or(""),
                "report ignored"
            );
        }
        outcome
    }

    /// Grants a lease on the best eligible handle to `holder_id`.
    ///
    /// An empty pool is a normal outcome, expected under load.
    pub fn next(&self, partition_key: &str, holder_id: &str) -> NextOutcome {
        let now_ms = self.clock.now_ms();
        let partition = self.registry.get_or_create(partition_key);
        let mut partition = partition.lock().expect("lock poisoned");
        let outcome = partition.next(holder_id, now_ms, &self.config);
        match &outcome {
            NextOutcome::Granted(grant) => {
                tracing::info!(
                    partition = %partition_key,
                    handle = %grant.handle_id,
                    holder = %holder_id,
                    lease_secs = grant.lease_secs,
                    "lease granted"
                );
            },
            NextOutcome::EmptyPool => {
                tracing::debug!(partition = %partition_key, holder = %holder_id, "empty pool");
            },
        }
        outcome
    }

    /// Renews `holder_id`'s lease on `handle_id`.
    ///
    /// # Errors
    ///
    /// See [`ConfirmError`]; each variant is a distinct wire code.
    pub fn confirm(
        &self,
        partition_key: &str,
        handle_id: &str,
        holder_id: &str,
    ) -> Result<u64, ConfirmError> {
        let now_ms = self.clock.now_ms();
        let partition = self.registry.get_or_create(partition_key);
        let mut partition = partition.lock().expect("lock poisoned");
        let result = partition.confirm(handle_id, holder_id, now_ms, &self.config);
        if let Err(err) = &result {
            tracing::debug!(
                partition = %partition_key,
                handle = %handle_id,
                holder = %holder_id,
                code = err.code(),
                "confirm rejected"
            );
        }
        result
    }

    /// Releases `handle_id`, optionally quarantining it out of the pool.
    pub fn release(
        &self,
        partition_key: &str,
        handle_id: &str,
        quarantine: bool,
    ) -> ReleaseOutcome {
        let now_ms = self.clock.now_ms();
        let partition = self.registry.get_or_create(partition_key);
        let mut partition = partition.lock().expect("lock poisoned");
        let outcome = partition.release(handle_id, quarantine, now_ms, &self.config);
        if outcome.quarantined {
            tracing::info!(partition = %partition_key, handle = %handle_id, "handle quarantined");
        }
        outcome
    }

    /// Point-in-time stats for one partition, or for all known partitions.
    ///
    /// Read-only: never creates a partition and never mutates one.
    #[must_use]
    pub fn stats(&self, partition_key: Option<&str>) -> Vec<PartitionStats> {
        let now_ms = self.clock.now_ms();
        match partition_key {
            Some(key) => self
                .registry
                .get(key)
                .map(|partition| {
                    let partition = partition.lock().expect("lock poisoned");
                    vec![partition.stats(key, now_ms)]
                })
                .unwrap_or_default(),
            None => {
                let mut all: Vec<_> = self
                    .registry
                    .snapshot()
                    .into_iter()
                    .map(|(key, partition)| {
                        let partition = partition.lock().expect("lock poisoned");
                        partition.stats(&key, now_ms)
                    })
                    .collect();
                all.sort_by(|a, b| a.partition.cmp(&b.partition));
                all
            },
        }
    }

    /// Sweeps every known partition once; returns how many were swept.
    ///
    /// Driven by the background sweeper on an interval. Purely an upper
    /// bound on staleness: the inline sweep in each operation is the
    /// correctness backstop, so a skipped or delayed pass is harmless.
    pub fn sweep_all(&self) -> usize {
        let now_ms = self.clock.now_ms();
        let partitions = self.registry.snapshot();
        let swept = partitions.len();
        for (_, partition) in partitions {
            partition
                .lock()
                .expect("lock poisoned")
                .sweep(now_ms, &self.config);
        }
        swept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    const NOW: u64 = 1_700_000_000_000;

    fn pool() -> (Pool, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(NOW));
        let pool = Pool::with_clock(PoolConfig::default(), Arc::clone(&clock) as Arc<dyn Clock>);
        (pool, clock)
    }

    fn report(id: &str) -> HandleReport {
        HandleReport {
            handle_id: id.to_string(),
            occupancy: 2,
            capacity: 8,
            region: "eu".to_string(),
            latency_hint: "low".to_string(),
            restricted: false,
        }
    }

    #[test]
    fn operations_route_to_isolated_partitions() {
        let (pool, _clock) = pool();
        assert!(pool.report("P1", &report("A")).stored);
        assert!(pool.report("P2", &report("A")).stored);

        // Leasing "A" in P1 leaves P2's "A" untouched.
        assert!(matches!(pool.next("P1", "bot1"), NextOutcome::Granted(_)));
        assert!(matches!(pool.next("P2", "bot1"), NextOutcome::Granted(_)));
        assert_eq!(pool.next("P1", "bot2"), NextOutcome::EmptyPool);
    }

    #[test]
    fn stats_reports_known_partitions_only() {
        let (pool, _clock) = pool();
        pool.report("P1", &report("A"));
        assert_eq!(pool.stats(Some("P1")).len(), 1);
        assert!(pool.stats(Some("unknown")).is_empty());

        pool.report("P2", &report("B"));
        let all = pool.stats(None);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].partition, "P1");
        assert_eq!(all[1].partition, "P2");
    }

    #[test]
    fn stats_does_not_create_partitions() {
        let (pool, _clock) = pool();
        pool.stats(Some("phantom"));
        assert!(pool.stats(None).is_empty());
    }

    #[test]
    fn background_sweep_covers_every_partition() {
        let (pool, clock) = pool();
        pool.report("P1", &report("A"));
        pool.report("P2", &report("B"));
        assert!(matches!(pool.next("P1", "bot1"), NextOutcome::Granted(_)));

        clock.advance(pool.config().lease_duration_ms() + 1);
        assert_eq!(pool.sweep_all(), 2);

        let stats = pool.stats(Some("P1"));
        assert_eq!(stats[0].active_leases, 0);
    }
}
