//! One isolated pool partition: entry store, recent-use ledger, counters.
//!
//! Every mutating or selecting operation begins with an inline sweep, so a
//! caller always observes a view with no expired leases, stale entries, or
//! dead vetoes, regardless of when the background sweep last ran. All methods
//! take the current time explicitly; the owning [`Pool`](crate::pool::Pool)
//! reads it from the injected clock and serializes calls through the
//! partition mutex.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::admission::can_admit;
use crate::config::PoolConfig;
use crate::entry::{Entry, Lease};
use crate::error::ConfirmError;
use crate::metrics::{MetricsSnapshot, PartitionMetrics};
use crate::outcome::{
    GrantedLease, NextOutcome, PartitionStats, RejectReason, ReleaseOutcome, ReportOutcome,
};

/// A single reported handle, as supplied by the reporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HandleReport {
    /// Opaque handle identifier.
    pub handle_id: String,
    /// Current occupancy.
    #[serde(default)]
    pub occupancy: u32,
    /// Capacity.
    #[serde(default)]
    pub capacity: u32,
    /// Opaque region descriptor.
    #[serde(default)]
    pub region: String,
    /// Opaque latency descriptor.
    #[serde(default)]
    pub latency_hint: String,
    /// Whether the reporter flagged the handle as restricted.
    #[serde(default)]
    pub restricted: bool,
}

/// One partition's entries, recent-use vetoes, and counters.
///
/// Exclusively owned by the partition registry; all access is serialized
/// through the registry's per-partition mutex.
#[derive(Debug, Default)]
pub struct Partition {
    entries: HashMap<String, Entry>,
    recent_use: HashMap<String, u64>,
    metrics: PartitionMetrics,
}

impl Partition {
    /// Creates an empty partition.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the partition holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up an entry by handle id.
    #[must_use]
    pub fn entry(&self, handle_id: &str) -> Option<&Entry> {
        self.entries.get(handle_id)
    }

    /// Number of entries holding a lease live at `now_ms`.
    #[must_use]
    pub fn active_lease_count(&self, now_ms: u64) -> usize {
        self.entries
            .values()
            .filter(|e| e.has_active_lease(now_ms))
            .count()
    }

    /// Number of recent-use vetoes unexpired at `now_ms`.
    #[must_use]
    pub fn active_veto_count(&self, now_ms: u64) -> usize {
        self.recent_use.values().filter(|&&exp| exp > now_ms).count()
    }

    /// Copies the partition's counters.
    #[must_use]
    pub const fn metrics(&self) -> MetricsSnapshot {
        self.metrics
    }

    /// Builds the `stats` view for this partition.
    #[must_use]
    pub fn stats(&self, partition: &str, now_ms: u64) -> PartitionStats {
        PartitionStats {
            partition: partition.to_string(),
            pool_size: self.entries.len(),
            active_leases: self.active_lease_count(now_ms),
            active_vetoes: self.active_veto_count(now_ms),
            metrics: self.metrics,
        }
    }

    /// Purges expired state: dead vetoes, over-age entries, expired leases.
    ///
    /// Lease expiry clears the lease but keeps the entry, stamping
    /// `last_assigned_at` so the re-assignment delay prevents an immediate
    /// re-grant. Invoked inline by every operation and periodically by the
    /// background sweeper; running it twice in a row is a no-op.
    pub fn sweep(&mut self, now_ms: u64, config: &PoolConfig) {
        self.recent_use.retain(|_, exp| *exp > now_ms);

        let max_age_ms = config.max_entry_age_ms();
        self.entries.retain(|handle_id, entry| {
            let keep = entry.age_ms(now_ms) <= max_age_ms;
            if !keep {
                tracing::debug!(handle = %handle_id, "sweeping over-age entry");
            }
            keep
        });

        for entry in self.entries.values_mut() {
            if entry.lease.as_ref().is_some_and(|l| l.is_expired_at(now_ms)) {
                entry.lease = None;
                entry.last_assigned_at = now_ms;
            }
        }
    }

    /// Upserts a reported handle, subject to admission policy.
    ///
    /// A re-report of a known handle refreshes its mutable fields but never
    /// touches its lease or `last_assigned_at`; whether it refreshes
    /// `reported_at` is controlled by `refresh_reported_at_on_report`.
    pub fn report(
        &mut self,
        report: &HandleReport,
        now_ms: u64,
        config: &PoolConfig,
    ) -> ReportOutcome {
        self.sweep(now_ms, config);

        if report.restricted {
            return self.reject(RejectReason::Restricted);
        }
        if !can_admit(
            report.occupancy,
            report.capacity,
            config.occupancy_accept_threshold,
            config.min_free_slots,
        ) {
            return self.reject(RejectReason::PlayersFilter);
        }

        let is_new = !self.entries.contains_key(&report.handle_id);
        if is_new && self.entries.len() >= config.max_entries_per_partition {
            return self.reject(RejectReason::PoolFull);
        }

        match self.entries.get_mut(&report.handle_id) {
            Some(entry) => {
                entry.occupancy = report.occupancy;
                entry.capacity = report.capacity;
                entry.region.clone_from(&report.region);
                entry.latency_hint.clone_from(&report.latency_hint);
                if config.refresh_reported_at_on_report {
                    entry.reported_at = now_ms;
                }
            },
            None => {
                self.entries.insert(
                    report.handle_id.clone(),
                    Entry {
                        handle_id: report.handle_id.clone(),
                        occupancy: report.occupancy,
                        capacity: report.capacity,
                        region: report.region.clone(),
                        latency_hint: report.latency_hint.clone(),
                        reported_at: now_ms,
                        last_assigned_at: 0,
                        lease: None,
                    },
                );
                self.metrics.total_added += 1;
            },
        }

        ReportOutcome {
            stored: true,
            reason: None,
            pool_size: self.entries.len(),
        }
    }

    fn reject(&mut self, reason: RejectReason) -> ReportOutcome {
        self.metrics.total_ignored += 1;
        ReportOutcome {
            stored: false,
            reason: Some(reason),
            pool_size: self.entries.len(),
        }
    }

    /// Selects the best eligible entry and grants a lease to `holder_id`.
    ///
    /// Scan and grant happen in one call under the partition lock, so no two
    /// concurrent callers can observe the same entry as free.
    pub fn next(&mut self, holder_id: &str, now_ms: u64, config: &PoolConfig) -> NextOutcome {
        self.sweep(now_ms, config);

        let veto_applies = self.entries.len() >= config.min_pool_size_for_veto;
        let reassign_delay_ms = config.min_reassign_delay_ms();

        let mut best: Option<(&String, i64)> = None;
        for (handle_id, entry) in &self.entries {
            // Sweep just cleared expired leases; any remaining lease is live.
            if entry.lease.is_some() {
                continue;
            }
            if entry.last_assigned_at != 0
                && now_ms.saturating_sub(entry.last_assigned_at) < reassign_delay_ms
            {
                continue;
            }
            if !can_admit(
                entry.occupancy,
                entry.capacity,
                config.occupancy_accept_threshold,
                config.min_free_slots,
            ) {
                continue;
            }
            if veto_applies
                && self
                    .recent_use
                    .get(handle_id)
                    .is_some_and(|&exp| exp > now_ms)
            {
                continue;
            }

            let candidate_score = score(entry, now_ms, config);
            if best.map_or(true, |(_, b)| candidate_score > b) {
                best = Some((handle_id, candidate_score));
            }
        }

        let Some((winner, _)) = best else {
            return NextOutcome::EmptyPool;
        };
        let winner = winner.clone();

        let Some(entry) = self.entries.get_mut(&winner) else {
            return NextOutcome::EmptyPool;
        };
        entry.lease = Some(Lease::grant(
            holder_id.to_string(),
            now_ms,
            config.lease_duration_ms(),
        ));
        entry.last_assigned_at = now_ms;
        self.metrics.total_leases += 1;

        NextOutcome::Granted(GrantedLease {
            handle_id: entry.handle_id.clone(),
            occupancy: entry.occupancy,
            capacity: entry.capacity,
            region: entry.region.clone(),
            latency_hint: entry.latency_hint.clone(),
            lease_secs: config.lease_duration_secs,
        })
    }

    /// Renews the lease held by `holder_id` on `handle_id`.
    ///
    /// Fails without touching the lease when the holder does not match. A
    /// confirm past the heartbeat window terminates the lease outright: its
    /// total lifetime is capped from grant time, independent of renewals.
    ///
    /// # Errors
    ///
    /// `NoLockOrWrongBot` if the entry, its lease, or the holder identity is
    /// missing or mismatched; `HeartbeatWindowExpired` if the absolute window
    /// elapsed (the lease is cleared as a side effect).
    pub fn confirm(
        &mut self,
        handle_id: &str,
        holder_id: &str,
        now_ms: u64,
        config: &PoolConfig,
    ) -> Result<u64, ConfirmError> {
        self.sweep(now_ms, config);

        let Some(entry) = self.entries.get_mut(handle_id) else {
            return Err(ConfirmError::NoLockOrWrongBot);
        };
        let Some(lease) = entry.lease.as_mut() else {
            return Err(ConfirmError::NoLockOrWrongBot);
        };
        if lease.holder_id != holder_id {
            return Err(ConfirmError::NoLockOrWrongBot);
        }

        if now_ms.saturating_sub(lease.granted_at) > config.heartbeat_window_ms() {
            entry.lease = None;
            entry.last_assigned_at = now_ms;
            return Err(ConfirmError::HeartbeatWindowExpired);
        }

        lease.expires_at = now_ms.saturating_add(config.heartbeat_extend_ms());
        lease.renewal_count += 1;

        self.recent_use.insert(
            handle_id.to_string(),
            now_ms.saturating_add(config.recent_use_ttl_ms()),
        );
        self.metrics.total_confirms += 1;
        Ok(config.heartbeat_extend_secs)
    }

    /// Releases `handle_id`, either back into the pool or into quarantine.
    ///
    /// Quarantine deletes the entry outright; the normal path clears the
    /// lease and stamps `last_assigned_at` so the re-assignment delay
    /// applies. Releasing an unknown handle is not an error.
    pub fn release(
        &mut self,
        handle_id: &str,
        quarantine: bool,
        now_ms: u64,
        config: &PoolConfig,
    ) -> ReleaseOutcome {
        self.sweep(now_ms, config);

        if quarantine {
            let existed = self.entries.remove(handle_id).is_some();
            if existed {
                self.metrics.total_releases += 1;
                self.metrics.total_quarantined += 1;
            }
            return ReleaseOutcome {
                existed,
                quarantined: existed,
            };
        }

        match self.entries.get_mut(handle_id) {
            Some(entry) => {
                entry.lease = None;
                entry.last_assigned_at = now_ms;
                self.metrics.total_releases += 1;
                ReleaseOutcome {
                    existed: true,
                    quarantined: false,
                }
            },
            None => ReleaseOutcome {
                existed: false,
                quarantined: false,
            },
        }
    }
}

/// Candidate score; higher is better.
///
/// Strongly prefers low occupancy, with a decaying bonus for recently
/// discovered handles so a fresh scan beats a long-sitting entry at equal
/// occupancy. Ties may resolve to any maximal-score candidate.
#[allow(clippy::cast_possible_wrap)]
fn score(entry: &Entry, now_ms: u64, config: &PoolConfig) -> i64 {
    let age_secs = entry.age_ms(now_ms) / 1000;
    let freshness_bonus = config.freshness_window_secs.saturating_sub(age_secs);
    1000 - i64::from(entry.occupancy) * 10 + freshness_bonus as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    fn config() -> PoolConfig {
        PoolConfig::default()
    }

    fn handle(id: &str, occupancy: u32, capacity: u32) -> HandleReport {
        HandleReport {
            handle_id: id.to_string(),
            occupancy,
            capacity,
            region: "eu".to_string(),
            latency_hint: "low".to_string(),
            restricted: false,
        }
    }

    #[test]
    fn report_stores_and_is_idempotent_on_pool_size() {
        let cfg = config();
        let mut partition = Partition::new();

        let outcome = partition.report(&handle("A", 2, 8), NOW, &cfg);
        assert!(outcome.stored);
        assert_eq!(outcome.pool_size, 1);

        let outcome = partition.report(&handle("A", 3, 8), NOW + 1_000, &cfg);
        assert!(outcome.stored);
        assert_eq!(outcome.pool_size, 1);
        assert_eq!(partition.metrics().total_added, 1);
        assert_eq!(partition.entry("A").map(|e| e.occupancy), Some(3));
    }

    #[test]
    fn report_rejects_restricted_handles() {
        let cfg = config();
        let mut partition = Partition::new();
        let mut restricted = handle("A", 2, 8);
        restricted.restricted = true;

        let outcome = partition.report(&restricted, NOW, &cfg);
        assert!(!outcome.stored);
        assert_eq!(outcome.reason, Some(RejectReason::Restricted));
        assert_eq!(outcome.pool_size, 0);
        assert_eq!(partition.metrics().total_ignored, 1);
    }

    #[test]
    fn report_applies_admission_filter() {
        let cfg = config();
        let mut partition = Partition::new();

        let outcome = partition.report(&handle("A", cfg.occupancy_accept_threshold, 99), NOW, &cfg);
        assert_eq!(outcome.reason, Some(RejectReason::PlayersFilter));

        let outcome = partition.report(&handle("B", 8, 8), NOW, &cfg);
        assert_eq!(outcome.reason, Some(RejectReason::PlayersFilter));
    }

    #[test]
    fn report_rejects_new_handles_when_full_but_updates_known_ones() {
        let mut cfg = config();
        cfg.max_entries_per_partition = 2;
        let mut partition = Partition::new();

        assert!(partition.report(&handle("A", 1, 8), NOW, &cfg).stored);
        assert!(partition.report(&handle("B", 1, 8), NOW, &cfg).stored);

        let outcome = partition.report(&handle("C", 1, 8), NOW, &cfg);
        assert_eq!(outcome.reason, Some(RejectReason::PoolFull));
        assert_eq!(outcome.pool_size, 2);

        // Re-reporting a known handle is an update, not an insert.
        let outcome = partition.report(&handle("A", 4, 8), NOW, &cfg);
        assert!(outcome.stored);
        assert_eq!(outcome.pool_size, 2);
    }

    #[test]
    fn re_report_preserves_lease_and_last_assigned_at() {
        let cfg = config();
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);
        assert!(matches!(
            partition.next("bot1", NOW, &cfg),
            NextOutcome::Granted(_)
        ));

        partition.report(&handle("A", 3, 8), NOW + 1_000, &cfg);
        let entry = partition.entry("A").expect("entry");
        assert!(entry.lease.is_some());
        assert_eq!(entry.last_assigned_at, NOW);
    }

    #[test]
    fn reported_at_refresh_follows_config() {
        let mut cfg = config();
        cfg.refresh_reported_at_on_report = false;
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);
        partition.report(&handle("A", 2, 8), NOW + 5_000, &cfg);
        assert_eq!(partition.entry("A").map(|e| e.reported_at), Some(NOW));

        cfg.refresh_reported_at_on_report = true;
        partition.report(&handle("A", 2, 8), NOW + 9_000, &cfg);
        assert_eq!(
            partition.entry("A").map(|e| e.reported_at),
            Some(NOW + 9_000)
        );
    }

    #[test]
    fn next_prefers_lowest_occupancy() {
        let cfg = config();
        let mut partition = Partition::new();
        partition.report(&handle("busy", 9, 20), NOW, &cfg);
        partition.report(&handle("quiet", 1, 20), NOW, &cfg);

        match partition.next("bot1", NOW, &cfg) {
            NextOutcome::Granted(grant) => assert_eq!(grant.handle_id, "quiet"),
            NextOutcome::EmptyPool => panic!("expected a grant"),
        }
    }

    #[test]
    fn freshness_bonus_breaks_equal_occupancy() {
        let mut cfg = config();
        cfg.refresh_reported_at_on_report = false;
        let mut partition = Partition::new();
        // "old" was reported well outside the freshness window; "fresh" just now.
        partition.report(&handle("old", 2, 20), NOW - cfg.freshness_window_secs * 1000 - 60_000, &cfg);
        partition.report(&handle("fresh", 2, 20), NOW, &cfg);

        match partition.next("bot1", NOW, &cfg) {
            NextOutcome::Granted(grant) => assert_eq!(grant.handle_id, "fresh"),
            NextOutcome::EmptyPool => panic!("expected a grant"),
        }
    }

    #[test]
    fn next_excludes_leased_entries() {
        let cfg = config();
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);

        assert!(matches!(
            partition.next("bot1", NOW, &cfg),
            NextOutcome::Granted(_)
        ));
        assert_eq!(partition.next("bot2", NOW, &cfg), NextOutcome::EmptyPool);
        assert_eq!(partition.metrics().total_leases, 1);
    }

    #[test]
    fn next_applies_admission_under_current_thresholds() {
        let lenient = config();
        let mut strict = config();
        strict.occupancy_accept_threshold = 3;

        let mut partition = Partition::new();
        partition.report(&handle("A", 5, 20), NOW, &lenient);

        // Admitted under the lenient thresholds, but no longer admissible
        // under the thresholds in force at selection time.
        assert_eq!(partition.next("bot1", NOW, &strict), NextOutcome::EmptyPool);
        assert!(matches!(
            partition.next("bot1", NOW, &lenient),
            NextOutcome::Granted(_)
        ));
    }

    #[test]
    fn reassign_delay_blocks_immediate_re_pick() {
        let cfg = config();
        let delay_ms = cfg.min_reassign_delay_ms();
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);

        assert!(matches!(
            partition.next("bot1", NOW, &cfg),
            NextOutcome::Granted(_)
        ));
        let released = partition.release("A", false, NOW + 1_000, &cfg);
        assert!(released.existed);

        let before = NOW + 1_000 + delay_ms - 1;
        assert_eq!(partition.next("bot2", before, &cfg), NextOutcome::EmptyPool);

        let after = NOW + 1_000 + delay_ms;
        assert!(matches!(
            partition.next("bot2", after, &cfg),
            NextOutcome::Granted(_)
        ));
    }

    #[test]
    fn never_assigned_entries_ignore_reassign_delay() {
        let cfg = config();
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);
        // last_assigned_at is 0 (never assigned); the delay rule must not
        // interpret that as a recent assignment.
        assert!(matches!(
            partition.next("bot1", NOW, &cfg),
            NextOutcome::Granted(_)
        ));
    }

    #[test]
    fn confirm_extends_and_counts_renewals() {
        let cfg = config();
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);
        partition.next("bot1", NOW, &cfg);

        let extended = partition.confirm("A", "bot1", NOW + 2_000, &cfg);
        assert_eq!(extended, Ok(cfg.heartbeat_extend_secs));

        let entry = partition.entry("A").expect("entry");
        let lease = entry.lease.as_ref().expect("lease");
        assert_eq!(lease.renewal_count, 1);
        assert_eq!(lease.expires_at, NOW + 2_000 + cfg.heartbeat_extend_ms());
        assert_eq!(partition.metrics().total_confirms, 1);
    }

    #[test]
    fn confirm_rejects_wrong_holder_without_disturbing_the_lease() {
        let cfg = config();
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);
        partition.next("bot1", NOW, &cfg);
        let before = partition.entry("A").and_then(|e| e.lease.clone());

        let result = partition.confirm("A", "bot2", NOW + 1_000, &cfg);
        assert_eq!(result, Err(ConfirmError::NoLockOrWrongBot));
        assert_eq!(partition.entry("A").and_then(|e| e.lease.clone()), before);
    }

    #[test]
    fn confirm_on_unknown_handle_fails() {
        let cfg = config();
        let mut partition = Partition::new();
        assert_eq!(
            partition.confirm("ghost", "bot1", NOW, &cfg),
            Err(ConfirmError::NoLockOrWrongBot)
        );
    }

    #[test]
    fn heartbeat_window_caps_lease_lifetime() {
        let cfg = config();
        let window_ms = cfg.heartbeat_window_ms();
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);
        partition.next("bot1", NOW, &cfg);

        // Keep the lease warm all the way to the window edge, renewing often
        // enough that the lease itself never lapses between confirms.
        let mut t = NOW;
        loop {
            let next_t = t + 9_000;
            if next_t > NOW + window_ms {
                break;
            }
            t = next_t;
            assert!(partition.confirm("A", "bot1", t, &cfg).is_ok());
        }
        // The last renewal pushed expires_at past the window edge; the cap
        // must still terminate the lease.
        assert!(
            partition.entry("A").expect("entry").lease.as_ref().expect("lease").expires_at
                > NOW + window_ms + 1
        );

        let result = partition.confirm("A", "bot1", NOW + window_ms + 1, &cfg);
        assert_eq!(result, Err(ConfirmError::HeartbeatWindowExpired));
        assert!(partition.entry("A").expect("entry").lease.is_none());
    }

    #[test]
    fn confirm_at_exact_window_edge_still_succeeds() {
        let mut cfg = config();
        cfg.heartbeat_window_secs = 20;
        cfg.heartbeat_extend_secs = 30;
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);
        partition.next("bot1", NOW, &cfg);

        // Renew early so the lease is still live at the window edge; a
        // confirm exactly at grant + window is inside the cap.
        assert!(partition.confirm("A", "bot1", NOW + 5_000, &cfg).is_ok());
        assert!(partition
            .confirm("A", "bot1", NOW + cfg.heartbeat_window_ms(), &cfg)
            .is_ok());
    }

    #[test]
    fn confirm_records_recent_use_veto() {
        let mut cfg = config();
        cfg.min_pool_size_for_veto = 2;
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);
        partition.report(&handle("B", 2, 8), NOW, &cfg);
        let granted = match partition.next("bot1", NOW, &cfg) {
            NextOutcome::Granted(g) => g.handle_id,
            NextOutcome::EmptyPool => panic!("expected a grant"),
        };

        partition
            .confirm(&granted, "bot1", NOW + 1_000, &cfg)
            .expect("confirm");
        assert_eq!(partition.active_veto_count(NOW + 1_000), 1);

        // Release it; the veto must outlive both the lease and the
        // re-assignment delay.
        let release_at = NOW + 2_000;
        partition.release(&granted, false, release_at, &cfg);
        let eligible_at = release_at + cfg.min_reassign_delay_ms();
        assert!(eligible_at < NOW + 1_000 + cfg.recent_use_ttl_ms());

        // Only the other, never-vetoed handle may be granted.
        match partition.next("bot2", eligible_at, &cfg) {
            NextOutcome::Granted(g) => assert_ne!(g.handle_id, granted),
            NextOutcome::EmptyPool => panic!("expected the un-vetoed handle"),
        }
    }

    #[test]
    fn small_pools_ignore_the_veto() {
        let cfg = config();
        assert!(cfg.min_pool_size_for_veto > 1);
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);
        partition.next("bot1", NOW, &cfg);
        partition.confirm("A", "bot1", NOW + 1_000, &cfg).expect("confirm");
        partition.release("A", false, NOW + 2_000, &cfg);

        // Veto is still live, but the pool is below the veto threshold.
        let t = NOW + 2_000 + cfg.min_reassign_delay_ms();
        assert!(t < NOW + 1_000 + cfg.recent_use_ttl_ms());
        assert!(matches!(
            partition.next("bot2", t, &cfg),
            NextOutcome::Granted(_)
        ));
    }

    #[test]
    fn release_quarantine_deletes_the_entry() {
        let cfg = config();
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);
        partition.next("bot1", NOW, &cfg);

        let outcome = partition.release("A", true, NOW + 1_000, &cfg);
        assert!(outcome.existed);
        assert!(outcome.quarantined);
        assert!(partition.entry("A").is_none());
        assert_eq!(partition.metrics().total_quarantined, 1);
        assert_eq!(partition.metrics().total_releases, 1);

        // Gone for good: a later release reports it never existed.
        let outcome = partition.release("A", false, NOW + 2_000, &cfg);
        assert!(!outcome.existed);
        assert_eq!(partition.next("bot2", NOW + 60_000, &cfg), NextOutcome::EmptyPool);
    }

    #[test]
    fn release_unknown_handle_is_not_an_error() {
        let cfg = config();
        let mut partition = Partition::new();
        let outcome = partition.release("ghost", false, NOW, &cfg);
        assert!(!outcome.existed);
        assert!(!outcome.quarantined);
        assert_eq!(partition.metrics().total_releases, 0);
    }

    #[test]
    fn sweep_expires_leases_back_into_the_delay_window() {
        let cfg = config();
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);
        partition.next("bot1", NOW, &cfg);

        let expiry = NOW + cfg.lease_duration_ms();
        partition.sweep(expiry, &cfg);

        let entry = partition.entry("A").expect("entry");
        assert!(entry.lease.is_none());
        assert_eq!(entry.last_assigned_at, expiry);
    }

    #[test]
    fn sweep_purges_over_age_entries() {
        let mut cfg = config();
        cfg.refresh_reported_at_on_report = false;
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);

        partition.sweep(NOW + cfg.max_entry_age_ms(), &cfg);
        assert_eq!(partition.len(), 1);

        partition.sweep(NOW + cfg.max_entry_age_ms() + 1, &cfg);
        assert_eq!(partition.len(), 0);
    }

    #[test]
    fn sweep_drops_expired_vetoes() {
        let cfg = config();
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);
        partition.next("bot1", NOW, &cfg);
        partition.confirm("A", "bot1", NOW + 1_000, &cfg).expect("confirm");
        assert_eq!(partition.active_veto_count(NOW + 1_000), 1);

        partition.sweep(NOW + 1_000 + cfg.recent_use_ttl_ms(), &cfg);
        assert_eq!(partition.active_veto_count(NOW + 1_000 + cfg.recent_use_ttl_ms()), 0);
    }

    #[test]
    fn expired_lease_makes_handle_selectable_after_delay() {
        let cfg = config();
        let mut partition = Partition::new();
        partition.report(&handle("A", 2, 8), NOW, &cfg);
        partition.next("bot1", NOW, &cfg);

        // Lease expires passively; the entry must wait out the re-assignment
        // delay measured from when the sweep noticed the expiry.
        let expiry = NOW + cfg.lease_duration_ms();
        assert_eq!(partition.next("bot2", expiry, &cfg), NextOutcome::EmptyPool);
        assert!(matches!(
            partition.next("bot2", expiry + cfg.min_reassign_delay_ms(), &cfg),
            NextOutcome::Granted(_)
        ));
    }
}
